use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Unpaid,
}

impl LeaveType {
    pub fn is_paid(self) -> bool {
        !matches!(self, LeaveType::Unpaid)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn can_become(self, next: LeaveStatus) -> bool {
        use LeaveStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    /// Always derived from the span, never taken from the caller.
    pub day_count: i64,
}

impl LeaveRecord {
    /// Dates of the span clipped to `[from, to]`.
    pub fn dates_within(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date.min(to);
        self.start_date
            .max(from)
            .iter_days()
            .take_while(move |d| *d <= end)
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }
}

/// Inclusive number of calendar days from `start` to `end`.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Validated leave span ready to persist.
#[derive(Debug, Clone)]
pub struct NewLeave {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub day_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveSummary {
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn clips_span_to_month() {
        let leave = LeaveRecord {
            id: 1,
            employee_id: 1,
            start_date: d(1, 29),
            end_date: d(2, 3),
            leave_type: LeaveType::Sick,
            status: LeaveStatus::Approved,
            day_count: 6,
        };
        assert_eq!(leave.dates_within(d(1, 1), d(1, 31)).count(), 3);
        assert_eq!(leave.dates_within(d(2, 1), d(2, 28)).last(), Some(d(2, 3)));
        assert_eq!(leave.dates_within(d(3, 1), d(3, 31)).count(), 0);

        assert!(leave.overlaps(d(2, 3), d(2, 9)));
        assert!(leave.overlaps(d(1, 1), d(1, 29)));
        assert!(!leave.overlaps(d(2, 4), d(2, 9)));
    }

    #[test]
    fn only_unpaid_type_is_unpaid() {
        assert!(LeaveType::Annual.is_paid());
        assert!(LeaveType::Casual.is_paid());
        assert!(!LeaveType::Unpaid.is_paid());
    }

    #[test]
    fn leave_status_transitions() {
        assert!(LeaveStatus::Pending.can_become(LeaveStatus::Approved));
        assert!(LeaveStatus::Approved.can_become(LeaveStatus::Cancelled));
        assert!(!LeaveStatus::Rejected.can_become(LeaveStatus::Approved));
        assert!(!LeaveStatus::Cancelled.can_become(LeaveStatus::Pending));
    }
}
