//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations for each entity. Every read
//! path excludes soft-deleted rows.

use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};

pub mod attendance;
pub mod department;
pub mod employee;
pub mod leave;
pub mod user;

pub use attendance::AttendanceRepository;
pub use department::DepartmentRepository;
pub use employee::EmployeeRepository;
pub use leave::LeaveRepository;
pub use user::UserRepository;

/// A resolved page window. Construct through `handlers::types::PageParams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Row offset of the page, capped at `i64::MAX` so drivers that bind
    /// signed integers still accept it.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

/// Case-insensitive substring match on any of `columns`.
pub(crate) fn search_condition<C>(columns: &[C], term: &str) -> Condition
where
    C: ColumnTrait,
{
    let pattern = format!("%{}%", term.trim().to_lowercase());
    columns.iter().fold(Condition::any(), |cond, column| {
        cond.add(lower_like(*column, &pattern))
    })
}

fn lower_like<C: ColumnTrait>(column: C, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_starts_at_zero() {
        assert_eq!(PageRequest { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 25 }.offset(), 50);
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let page = PageRequest {
            page: i64::MAX as u64,
            limit: 100,
        };
        assert_eq!(page.offset(), i64::MAX as u64);
        assert_eq!(PageRequest { page: 0, limit: 10 }.offset(), 0);
    }
}
