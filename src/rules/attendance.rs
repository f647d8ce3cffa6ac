//! Attendance status derivation.
//!
//! Everything here is pure: callers pass the current instant in, the
//! policy decides which local day it belongs to and which status applies.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc, Weekday,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::AttendanceStatus;
use crate::models::attendance;

/// Working-hours rules used to classify check-ins and check-outs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    /// Nominal start of the working day, in local time
    pub work_start: NaiveTime,
    /// Arrivals up to and including `work_start + late_grace` are on time
    pub late_grace: Duration,
    /// Sessions shorter than this are downgraded to half days
    pub half_day_threshold: Duration,
    /// The "local time" attendance is evaluated in
    pub offset: FixedOffset,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            late_grace: Duration::minutes(15),
            half_day_threshold: Duration::hours(4),
            offset: Utc.fix(),
        }
    }
}

impl AttendancePolicy {
    pub fn local_now(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    /// Calendar day an instant falls on in local time.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_now(now).date_naive()
    }

    /// Latest local time of day that still counts as on time.
    pub fn late_cutoff(&self) -> NaiveTime {
        self.work_start + self.late_grace
    }

    pub fn classify_check_in(&self, now: DateTime<Utc>) -> AttendanceStatus {
        if self.local_now(now).time() > self.late_cutoff() {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }

    /// Final status once the session is closed. Late days keep their status.
    pub fn status_after_check_out(
        &self,
        current: AttendanceStatus,
        worked: Duration,
    ) -> AttendanceStatus {
        if current != AttendanceStatus::Late && worked < self.half_day_threshold {
            AttendanceStatus::HalfDay
        } else {
            current
        }
    }

    /// First and last day of the local calendar month containing `now`.
    pub fn current_month(&self, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let today = self.local_date(now);
        let first = today.with_day(1).unwrap_or(today);
        let next_month = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        };
        let last = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(today);
        (first, last)
    }
}

/// Merges check-out notes into whatever was recorded at check-in.
pub fn append_checkout_notes(previous: Option<&str>, notes: Option<&str>) -> Option<String> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    let previous = previous.filter(|p| !p.is_empty());

    match (previous, notes) {
        (Some(prev), Some(notes)) => Some(format!("{prev} | Checkout: {notes}")),
        (None, Some(notes)) => Some(format!("Checkout: {notes}")),
        (prev, None) => prev.map(str::to_string),
    }
}

/// Number of Monday-to-Friday days in `[start, end]`.
pub fn count_weekdays(start: NaiveDate, end: NaiveDate) -> u32 {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}

/// Aggregate attendance over a date range
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    #[schema(example = "2024-06-01")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-30")]
    pub end_date: NaiveDate,
    /// Weekdays in the range
    #[schema(example = 20)]
    pub total_days: u32,
    #[schema(example = 15)]
    pub present_days: u32,
    #[schema(example = 2)]
    pub late_days: u32,
    #[schema(example = 1)]
    pub half_days: u32,
    #[schema(example = 2)]
    pub absent_days: u32,
    /// Percentage of weekdays with a check-in
    #[schema(example = 90.0)]
    pub attendance_rate: f64,
}

impl AttendanceStats {
    /// Summarizes `records`, which must already be limited to `[start, end]`.
    pub fn summarize(start: NaiveDate, end: NaiveDate, records: &[attendance::Model]) -> Self {
        let total_days = count_weekdays(start, end);
        let count = |status: AttendanceStatus| {
            records.iter().filter(|r| r.status == status).count() as u32
        };
        let checked_in = records.iter().filter(|r| r.check_in.is_some()).count() as u32;

        let attendance_rate = if total_days == 0 {
            0.0
        } else {
            f64::from(checked_in) / f64::from(total_days) * 100.0
        };

        Self {
            start_date: start,
            end_date: end,
            total_days,
            present_days: count(AttendanceStatus::Present),
            late_days: count(AttendanceStatus::Late),
            half_days: count(AttendanceStatus::HalfDay),
            absent_days: total_days.saturating_sub(checked_in),
            attendance_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, h, m, s).unwrap()
    }

    fn record(status: AttendanceStatus, checked_in: bool) -> attendance::Model {
        let ts = at(9, 0, 0).fixed_offset();
        attendance::Model {
            id: 1,
            user_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            check_in: checked_in.then_some(ts),
            check_out: None,
            status,
            notes: None,
            created_at: ts,
            updated_at: ts,
            deleted_at: None,
        }
    }

    #[test]
    fn check_in_within_grace_is_present() {
        let policy = AttendancePolicy::default();
        assert_eq!(policy.classify_check_in(at(8, 30, 0)), AttendanceStatus::Present);
        assert_eq!(policy.classify_check_in(at(9, 14, 0)), AttendanceStatus::Present);
        assert_eq!(policy.classify_check_in(at(9, 15, 0)), AttendanceStatus::Present);
    }

    #[test]
    fn check_in_after_grace_is_late() {
        let policy = AttendancePolicy::default();
        assert_eq!(policy.classify_check_in(at(9, 15, 1)), AttendanceStatus::Late);
        assert_eq!(policy.classify_check_in(at(9, 16, 0)), AttendanceStatus::Late);
        assert_eq!(policy.classify_check_in(at(14, 0, 0)), AttendanceStatus::Late);
    }

    #[test]
    fn classification_uses_configured_offset() {
        let policy = AttendancePolicy {
            offset: FixedOffset::east_opt(2 * 3600).unwrap(),
            ..AttendancePolicy::default()
        };
        // 07:16 UTC is 09:16 at UTC+2
        assert_eq!(policy.classify_check_in(at(7, 16, 0)), AttendanceStatus::Late);
        assert_eq!(policy.classify_check_in(at(9, 16, 0)), AttendanceStatus::Late);
        assert_eq!(policy.classify_check_in(at(7, 0, 0)), AttendanceStatus::Present);
    }

    #[test]
    fn local_date_rolls_over_with_offset() {
        let policy = AttendancePolicy {
            offset: FixedOffset::east_opt(5 * 3600).unwrap(),
            ..AttendancePolicy::default()
        };
        assert_eq!(
            policy.local_date(at(20, 0, 0)),
            NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()
        );
    }

    #[test]
    fn short_present_session_becomes_half_day() {
        let policy = AttendancePolicy::default();
        let worked = Duration::hours(3) + Duration::minutes(50);
        assert_eq!(
            policy.status_after_check_out(AttendanceStatus::Present, worked),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            policy.status_after_check_out(AttendanceStatus::Late, worked),
            AttendanceStatus::Late
        );
        assert_eq!(
            policy.status_after_check_out(AttendanceStatus::Present, Duration::hours(4)),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn checkout_notes_are_appended() {
        assert_eq!(
            append_checkout_notes(Some("WFH"), Some("done")).as_deref(),
            Some("WFH | Checkout: done")
        );
        assert_eq!(
            append_checkout_notes(None, Some("done")).as_deref(),
            Some("Checkout: done")
        );
        assert_eq!(
            append_checkout_notes(Some("WFH"), Some("  ")).as_deref(),
            Some("WFH")
        );
        assert_eq!(append_checkout_notes(None, None), None);
    }

    #[test]
    fn weekdays_exclude_weekends() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        // June 2024: 1st is a Saturday
        assert_eq!(count_weekdays(d(1), d(30)), 20);
        assert_eq!(count_weekdays(d(1), d(2)), 0);
        assert_eq!(count_weekdays(d(10), d(10)), 1);
        assert_eq!(count_weekdays(d(12), d(10)), 0);
    }

    #[test]
    fn current_month_spans_whole_month() {
        let policy = AttendancePolicy::default();
        let (first, last) = policy.current_month(Utc.with_ymd_and_hms(2024, 2, 14, 12, 0, 0).unwrap());
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (first, last) = policy.current_month(Utc.with_ymd_and_hms(2024, 12, 3, 0, 0, 0).unwrap());
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn stats_count_statuses_and_absences() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let records = vec![
            record(AttendanceStatus::Present, true),
            record(AttendanceStatus::Late, true),
            record(AttendanceStatus::HalfDay, true),
            record(AttendanceStatus::Absent, false),
        ];

        let stats = AttendanceStats::summarize(start, end, &records);

        assert_eq!(stats.total_days, 5);
        assert_eq!(stats.present_days, 1);
        assert_eq!(stats.late_days, 1);
        assert_eq!(stats.half_days, 1);
        assert_eq!(stats.absent_days, 2);
        assert!((stats.attendance_rate - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_over_weekend_only_range_do_not_underflow() {
        let sat = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let stats = AttendanceStats::summarize(sat, sat, &[record(AttendanceStatus::Present, true)]);
        assert_eq!(stats.total_days, 0);
        assert_eq!(stats.absent_days, 0);
        assert_eq!(stats.attendance_rate, 0.0);
    }
}
