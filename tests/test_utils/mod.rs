//! Test utilities for driving the full router against SQLite.
//!
//! Every test gets its own in-memory database with migrations applied and
//! the default departments plus the `admin@hr.com` account seeded.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{NaiveDate, Utc};
use hr_service::{
    config::AppConfig,
    models::{EmployeeStatus, Role},
    password::hash_password,
    repositories::{
        DepartmentRepository, EmployeeRepository, UserRepository, employee::NewEmployee,
        user::NewUser,
    },
    seeds::seed_all,
    server::{AppState, create_app},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@hr.com";
pub const ADMIN_PASSWORD: &str = "password";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let config = test_config();
        let db = setup_test_db().await?;
        seed_all(&db, &config).await?;
        let state = AppState::new(config, db)?;
        Ok(Self {
            router: create_app(state.clone()),
            state,
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Sends one request through the router and decodes the JSON body
    /// (`Value::Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Logs in and returns the access token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Inserts an account directly and returns its id.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: Role,
        employee_id: Option<i32>,
    ) -> i32 {
        UserRepository::new(self.db())
            .create(
                NewUser {
                    email: email.to_string(),
                    password_hash: hash_password(password).unwrap(),
                    role,
                    employee_id,
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .id
    }

    pub async fn department_id(&self, name: &str) -> i32 {
        DepartmentRepository::new(self.db())
            .find_by_name(name)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Inserts an employee in Engineering and returns its id.
    pub async fn create_employee(&self, first_name: &str, email: &str) -> i32 {
        let department_id = self.department_id("Engineering").await;
        EmployeeRepository::new(self.db())
            .create(
                NewEmployee {
                    first_name: first_name.to_string(),
                    last_name: "Tester".to_string(),
                    email: email.to_string(),
                    phone: None,
                    date_of_birth: None,
                    gender: None,
                    address: None,
                    position: "Engineer".to_string(),
                    department_id,
                    manager_id: None,
                    hire_date: NaiveDate::from_ymd_opt(2023, 1, 9).unwrap(),
                    salary: 50_000.0,
                    status: EmployeeStatus::Active,
                    emergency_contact_name: None,
                    emergency_contact_phone: None,
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .id
    }
}
