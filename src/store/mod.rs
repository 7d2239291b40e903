//! Persistence seams of the engine.
//!
//! Services only see these traits. `mysql` is the production backend; the
//! in-memory backend gives tests the same uniqueness and compare-and-swap
//! guarantees without a database.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::EngineError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance},
    employee::Employee,
    leave_request::{LeaveRecord, LeaveStatus, LeaveType, NewLeave},
    payroll::{NewPayroll, PayPeriod, PayrollDeduction, PayrollFigures, PayrollRecord, StatusChange},
    salary::SalaryStructure,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub type StoreResult<T> = Result<T, EngineError>;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Fails with `AlreadyCheckedIn` when a record exists for the same
    /// employee and date.
    async fn insert_attendance(&self, new: NewAttendance) -> StoreResult<AttendanceRecord>;

    async fn find_attendance(&self, employee_id: u64, date: NaiveDate) -> StoreResult<Option<AttendanceRecord>>;

    /// Sets check-out and status on an open record. Returns `false` when the
    /// record was already closed.
    async fn close_attendance(
        &self,
        id: u64,
        check_out: NaiveDateTime,
        status: AttendanceStatus,
    ) -> StoreResult<bool>;

    /// Adds break minutes to an open record. Returns `false` when closed.
    async fn add_break_minutes(&self, id: u64, minutes: i64) -> StoreResult<bool>;

    async fn list_open_attendance(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>>;

    /// Open records dated strictly before `date`.
    async fn list_open_attendance_before(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>>;

    /// Records of one employee with `from <= date <= to`, ordered by date.
    async fn list_attendance(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn insert_leave(&self, new: NewLeave) -> StoreResult<LeaveRecord>;

    async fn find_leave(&self, id: u64) -> StoreResult<Option<LeaveRecord>>;

    /// Rewrites the span of a pending leave. Returns `false` when the leave is
    /// no longer pending.
    async fn update_leave_span(
        &self,
        id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: LeaveType,
        day_count: i64,
    ) -> StoreResult<bool>;

    /// Moves status only if it is still `from`.
    async fn set_leave_status(&self, id: u64, from: LeaveStatus, to: LeaveStatus) -> StoreResult<bool>;

    /// Leaves in `status` whose span intersects `[from, to]`.
    async fn list_leaves(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        status: LeaveStatus,
    ) -> StoreResult<Vec<LeaveRecord>>;
}

#[async_trait]
pub trait SalaryStore: Send + Sync {
    async fn find_salary(&self, employee_id: u64) -> StoreResult<Option<SalaryStructure>>;

    /// Replaces the employee's structure, never adds a second one.
    async fn upsert_salary(&self, salary: &SalaryStructure) -> StoreResult<()>;
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn find_payroll(&self, id: u64) -> StoreResult<Option<PayrollRecord>>;

    async fn find_payroll_for(&self, employee_id: u64, period: PayPeriod) -> StoreResult<Option<PayrollRecord>>;

    async fn payroll_deductions(&self, payroll_id: u64) -> StoreResult<Vec<PayrollDeduction>>;

    /// Writes the record and its deductions as one unit. A second record for
    /// the same employee and period fails with `DuplicatePayroll`.
    async fn insert_payroll(&self, new: NewPayroll) -> StoreResult<PayrollRecord>;

    /// Applies the change if the stored version still matches. `None` means
    /// somebody else won the race.
    async fn change_status(&self, change: StatusChange) -> StoreResult<Option<PayrollRecord>>;

    /// Overwrites figures and deductions of a record still at
    /// `expected_version`, putting it back to GENERATED.
    async fn replace_figures(
        &self,
        payroll_id: u64,
        expected_version: u32,
        figures: PayrollFigures,
        generated_at: NaiveDateTime,
    ) -> StoreResult<Option<PayrollRecord>>;
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>>;

    async fn require_employee(&self, id: u64) -> StoreResult<Employee> {
        self.find_employee(id)
            .await?
            .ok_or_else(|| EngineError::not_found("employee", id))
    }
}

#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    /// Holidays falling inside the given month.
    async fn holidays_in(&self, period: PayPeriod) -> StoreResult<Vec<NaiveDate>>;

    async fn is_holiday(&self, date: NaiveDate) -> StoreResult<bool> {
        let period = PayPeriod {
            year: chrono::Datelike::year(&date),
            month: chrono::Datelike::month(&date),
        };
        Ok(self.holidays_in(period).await?.contains(&date))
    }
}
