//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document for the HR API.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::{AppConfig, ConfigError};
use crate::handlers::{self, attendance, auth, departments, employees, leaves, users};
use crate::rules::AttendancePolicy;
use crate::telemetry::trace_id_middleware;
use crate::tokens::TokenService;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: TokenService,
    pub policy: AttendancePolicy,
}

impl AppState {
    /// Derives the token service and attendance rules from `config`.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, ConfigError> {
        let tokens = TokenService::from_config(&config)?;
        let policy = config.attendance_policy()?;
        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            policy,
        })
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/refresh", post(auth::refresh));

    let protected = Router::new()
        .route("/api/v1/auth/profile", get(auth::profile))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route(
            "/api/v1/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/api/v1/employees/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route(
            "/api/v1/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/api/v1/departments/{id}",
            get(departments::get_department)
                .put(departments::update_department)
                .delete(departments::delete_department),
        )
        .route("/api/v1/attendance/checkin", post(attendance::check_in))
        .route("/api/v1/attendance/checkout", post(attendance::check_out))
        .route("/api/v1/attendance/today", get(attendance::today))
        .route("/api/v1/attendance/history", get(attendance::history))
        .route("/api/v1/attendance/stats", get(attendance::stats))
        .route(
            "/api/v1/leaves",
            get(leaves::list_leaves).post(leaves::create_leave),
        )
        .route("/api/v1/leaves/types", get(leaves::leave_types))
        .route("/api/v1/leaves/statuses", get(leaves::leave_statuses))
        .route(
            "/api/v1/leaves/{id}",
            get(leaves::get_leave)
                .put(leaves::update_leave)
                .delete(leaves::cancel_leave),
        )
        .route("/api/v1/leaves/{id}/approve", post(leaves::approve_leave))
        .route("/api/v1/admin/users", get(users::list_users))
        .route(
            "/api/v1/admin/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route("/api/v1/admin/attendance", get(attendance::list_all))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Starts the server with the given state
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::login,
        crate::handlers::auth::register,
        crate::handlers::auth::refresh,
        crate::handlers::auth::change_password,
        crate::handlers::auth::profile,
        crate::handlers::employees::list_employees,
        crate::handlers::employees::get_employee,
        crate::handlers::employees::create_employee,
        crate::handlers::employees::update_employee,
        crate::handlers::employees::delete_employee,
        crate::handlers::departments::list_departments,
        crate::handlers::departments::get_department,
        crate::handlers::departments::create_department,
        crate::handlers::departments::update_department,
        crate::handlers::departments::delete_department,
        crate::handlers::attendance::check_in,
        crate::handlers::attendance::check_out,
        crate::handlers::attendance::today,
        crate::handlers::attendance::history,
        crate::handlers::attendance::stats,
        crate::handlers::attendance::list_all,
        crate::handlers::leaves::list_leaves,
        crate::handlers::leaves::get_leave,
        crate::handlers::leaves::create_leave,
        crate::handlers::leaves::update_leave,
        crate::handlers::leaves::cancel_leave,
        crate::handlers::leaves::approve_leave,
        crate::handlers::leaves::leave_types,
        crate::handlers::leaves::leave_statuses,
        crate::handlers::users::list_users,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::types::Pagination,
            crate::handlers::types::MessageResponse,
            crate::rules::AttendanceStats,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "auth", description = "Login, registration and sessions"),
        (name = "employees", description = "Employee directory"),
        (name = "departments", description = "Departments"),
        (name = "attendance", description = "Daily check-in and check-out"),
        (name = "leaves", description = "Leave requests and approvals"),
        (name = "admin", description = "Administration"),
    ),
    info(
        title = "HR Service API",
        description = "Employees, departments, attendance and leave management",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
