//! # Common API Types
//!
//! Pagination, message bodies and the request extractors that turn axum
//! rejections into [`ApiError`] responses.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use regex::Regex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, validation_error};
use crate::repositories::PageRequest;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Page-number pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 10, max: 100)
    pub limit: Option<i64>,
}

impl PageParams {
    /// Clamps page to at least 1 and limit into `[1, 100]`.
    pub fn resolve(page: Option<i64>, limit: Option<i64>) -> PageRequest {
        let page = page.unwrap_or(1).max(1) as u64;
        let limit = limit
            .map(|l| l.clamp(1, MAX_PAGE_LIMIT as i64) as u64)
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        PageRequest { page, limit }
    }

    pub fn to_request(&self) -> PageRequest {
        Self::resolve(self.page, self.limit)
    }
}

/// Pagination envelope returned by every list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub limit: u64,
    #[schema(example = 42)]
    pub total: u64,
    #[schema(example = 5)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: PageRequest, total: u64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: total.div_ceil(page.limit),
        }
    }
}

/// Plain confirmation body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Employee deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}

/// Collects per-field validation failures into one 400 response.
#[derive(Debug, Default)]
pub struct FieldErrors(Map<String, Value>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok && !self.0.contains_key(field) {
            self.0.insert(field.to_string(), Value::String(message.to_string()));
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), "is required")
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, is_valid_email(value), "must be a valid email address")
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(validation_error(
                "Validation failed",
                Value::Object(std::mem::take(&mut self.0)),
            ))
        }
    }
}

/// `Json` whose rejection is an [`ApiError`]
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Query` whose rejection is an [`ApiError`]
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Path` whose rejection is an [`ApiError`]
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("admin@hr.com"));
        assert!(!is_valid_email("admin@hr"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn field_errors_report_first_failure_per_field() {
        let err = FieldErrors::new()
            .required("firstName", " ")
            .email("email", "nope")
            .check("email", false, "second message")
            .finish()
            .unwrap_err();
        let details = err.details.unwrap();
        assert_eq!(details["firstName"], "is required");
        assert_eq!(details["email"], "must be a valid email address");

        assert!(FieldErrors::new().required("name", "Ops").finish().is_ok());
    }

    #[test]
    fn defaults_apply_when_absent() {
        assert_eq!(
            PageParams::resolve(None, None),
            PageRequest { page: 1, limit: 10 }
        );
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(
            PageParams::resolve(Some(0), Some(0)),
            PageRequest { page: 1, limit: 1 }
        );
        assert_eq!(
            PageParams::resolve(Some(-3), Some(500)),
            PageRequest { page: 1, limit: 100 }
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PageRequest { page: 1, limit: 10 };
        assert_eq!(Pagination::new(page, 0).total_pages, 0);
        assert_eq!(Pagination::new(page, 10).total_pages, 1);
        assert_eq!(Pagination::new(page, 11).total_pages, 2);
        assert_eq!(Pagination::new(PageRequest { page: 2, limit: 3 }, 7).total_pages, 3);
    }

    #[test]
    fn pagination_serializes_snake_case_total_pages() {
        let json = serde_json::to_value(Pagination::new(PageRequest { page: 2, limit: 5 }, 12))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": 2, "limit": 5, "total": 12, "total_pages": 3})
        );
    }
}
