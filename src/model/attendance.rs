use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    HalfDay,
    Absent,
    Late,
    OnLeave,
}

impl AttendanceStatus {
    /// Counts toward present days in payroll.
    pub fn is_attended(self) -> bool {
        matches!(self, Self::Present | Self::HalfDay | Self::Late)
    }
}

/// Where a daily record sits in the check-in/check-out state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "date": "2026-01-05",
    "check_in": "2026-01-05T09:00:00",
    "check_out": "2026-01-05T18:00:00",
    "break_minutes": 30,
    "status": "PRESENT"
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    pub break_minutes: i64,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn state(&self) -> AttendanceState {
        match self.check_out {
            Some(_) => AttendanceState::Closed,
            None => AttendanceState::Open,
        }
    }

    /// Minutes between check-in and check-out less breaks, never negative.
    /// Zero until both timestamps are present.
    pub fn worked_minutes(&self) -> i64 {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => {
                ((check_out - check_in).num_minutes() - self.break_minutes).max(0)
            }
            _ => 0,
        }
    }
}

/// Attendance record about to be inserted on check-in.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayAttendance {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// `None` for non-working days without a record.
    pub status: Option<AttendanceStatus>,
    pub worked_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct MonthlyAttendanceSummary {
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub working_days: u32,
    /// Working days with PRESENT, LATE or HALF_DAY.
    pub present_days: u32,
    pub half_days: u32,
    pub late_days: u32,
    /// Working days on approved leave without an attended record.
    pub on_leave_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub absent_days: u32,
    pub worked_minutes: i64,
    pub overtime_minutes: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeeklyAttendanceSummary {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub week_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub week_end: NaiveDate,
    pub days: Vec<DayAttendance>,
    pub present_days: u32,
    pub worked_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record(check_in: Option<NaiveDateTime>, check_out: Option<NaiveDateTime>, break_minutes: i64) -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            employee_id: 7,
            date: at(0, 0).date(),
            check_in,
            check_out,
            break_minutes,
            status: AttendanceStatus::Present,
        }
    }

    #[test]
    fn worked_minutes_subtracts_breaks() {
        let r = record(Some(at(9, 0)), Some(at(17, 30)), 30);
        assert_eq!(r.worked_minutes(), 480);
        assert_eq!(r.state(), AttendanceState::Closed);
    }

    #[test]
    fn worked_minutes_floors_at_zero() {
        let r = record(Some(at(9, 0)), Some(at(9, 20)), 45);
        assert_eq!(r.worked_minutes(), 0);
    }

    #[test]
    fn open_record_has_no_worked_time() {
        let r = record(Some(at(9, 0)), None, 0);
        assert_eq!(r.worked_minutes(), 0);
        assert_eq!(r.state(), AttendanceState::Open);
    }

    #[test]
    fn status_round_trips_through_storage_literal() {
        assert_eq!(AttendanceStatus::HalfDay.as_ref(), "HALF_DAY");
        assert_eq!("ON_LEAVE".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::OnLeave);
        assert!("half-day".parse::<AttendanceStatus>().is_err());
    }
}
