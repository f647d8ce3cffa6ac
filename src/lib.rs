//! # HR Service Library
//!
//! Employees, departments, attendance and leave management behind a
//! versioned REST API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repositories;
pub mod rules;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod tokens;
pub use migration;
