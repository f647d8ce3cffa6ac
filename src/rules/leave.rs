//! Leave date-range and status rules.

use chrono::NaiveDate;

use crate::error::RepositoryError;
use crate::models::LeaveStatus;

/// Inclusive number of days between `start` and `end`.
///
/// Fails when `end` precedes `start`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Result<i32, RepositoryError> {
    if end < start {
        return Err(RepositoryError::business_rule(
            "End date cannot be before start date",
        ));
    }
    let days = (end - start).num_days() + 1;
    i32::try_from(days)
        .map_err(|_| RepositoryError::validation_error("Leave period is too long"))
}

/// Two inclusive ranges share at least one day.
pub fn ranges_overlap(
    existing: (NaiveDate, NaiveDate),
    requested: (NaiveDate, NaiveDate),
) -> bool {
    existing.0 <= requested.1 && existing.1 >= requested.0
}

/// Only pending leaves may be edited, cancelled or decided.
pub fn ensure_pending(status: LeaveStatus, message: &str) -> Result<(), RepositoryError> {
    if status == LeaveStatus::Pending {
        Ok(())
    } else {
        Err(RepositoryError::business_rule(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(inclusive_days(d(6, 10), d(6, 12)).unwrap(), 3);
        assert_eq!(inclusive_days(d(6, 10), d(6, 10)).unwrap(), 1);
        assert_eq!(inclusive_days(d(2, 28), d(3, 1)).unwrap(), 3);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = inclusive_days(d(6, 12), d(6, 10)).unwrap_err();
        assert!(matches!(err, RepositoryError::BusinessRule(msg) if msg.contains("End date")));
    }

    #[test]
    fn overlap_detection() {
        assert!(ranges_overlap((d(6, 11), d(6, 13)), (d(6, 10), d(6, 12))));
        assert!(ranges_overlap((d(6, 10), d(6, 10)), (d(6, 10), d(6, 10))));
        assert!(ranges_overlap((d(6, 1), d(6, 30)), (d(6, 10), d(6, 12))));
        assert!(!ranges_overlap((d(6, 13), d(6, 14)), (d(6, 10), d(6, 12))));
        assert!(!ranges_overlap((d(6, 1), d(6, 9)), (d(6, 10), d(6, 12))));
    }

    #[test]
    fn only_pending_passes() {
        assert!(ensure_pending(LeaveStatus::Pending, "x").is_ok());
        for status in [
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            assert!(ensure_pending(status, "Leave is not pending approval").is_err());
        }
    }
}
