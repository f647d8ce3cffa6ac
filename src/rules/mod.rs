//! Domain rules shared by handlers and repositories.
//!
//! Nothing in here touches the database or the clock.

pub mod attendance;
pub mod leave;

pub use attendance::{AttendancePolicy, AttendanceStats};
