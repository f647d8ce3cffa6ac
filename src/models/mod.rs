//! # Data Models
//!
//! SeaORM entities for the HR service plus the shared service-info payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod attendance;
pub mod department;
pub mod employee;
pub mod leave;
pub mod user;

pub use attendance::{AttendanceStatus, Entity as Attendance};
pub use department::Entity as Department;
pub use employee::{EmployeeStatus, Entity as Employee, Gender};
pub use leave::{Entity as Leave, LeaveStatus, LeaveType};
pub use user::{Entity as User, Role};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "hr-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
