use crate::api::attendance::{BreakRequest, MonthQuery, WeekQuery};
use crate::api::leave_request::{CreateLeave, LeaveSummaryQuery};
use crate::api::payroll::{ApprovePayroll, GeneratePayroll};
use crate::api::salary::SalaryInput;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, DayAttendance, MonthlyAttendanceSummary, WeeklyAttendanceSummary,
};
use crate::model::leave_request::{LeaveRecord, LeaveStatus, LeaveSummary, LeaveType};
use crate::model::payroll::{
    DeductionType, PayPeriod, PayrollDeduction, PayrollRecord, PayrollSlip, PayrollStatus,
};
use crate::model::salary::SalaryStructure;
use crate::service::leave::LeaveApplication;
use crate::service::payroll::GenerateOutcome;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll Engine API",
        version = "1.0.0",
        description = r#"
## Attendance to Payroll Engine

Turns daily attendance, approved leave and salary structures into monthly
payroll records with itemized deductions.

### Key Features
- **Attendance**
  - Daily check-in, check-out and breaks, with HALF_DAY / LATE classification
  - Monthly and weekly summaries
- **Leave**
  - Apply, update, approve, reject and cancel leave requests
  - Paid and unpaid leave days per month
- **Payroll**
  - Generate one payroll per employee and month
  - GENERATED → PENDING_APPROVAL → APPROVED → PAID, with a terminal LOCKED state

### Errors
Failures return `{ "kind": ..., "message": ... }` where `kind` is one of
`not_found`, `conflict`, `invalid_transition`, `payroll_locked`,
`validation` or `fatal`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::record_break,
        crate::api::attendance::monthly_summary,
        crate::api::attendance::weekly_summary,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::leave_summary,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::get_payroll,
        crate::api::payroll::submit_payroll,
        crate::api::payroll::approve_payroll,
        crate::api::payroll::mark_paid,
        crate::api::payroll::lock_payroll,
        crate::api::payroll::recalculate_payroll,

        crate::api::salary::save_salary,
        crate::api::salary::get_salary
    ),
    components(
        schemas(
            BreakRequest,
            MonthQuery,
            WeekQuery,
            AttendanceRecord,
            AttendanceStatus,
            DayAttendance,
            MonthlyAttendanceSummary,
            WeeklyAttendanceSummary,
            CreateLeave,
            LeaveApplication,
            LeaveSummaryQuery,
            LeaveRecord,
            LeaveStatus,
            LeaveType,
            LeaveSummary,
            GeneratePayroll,
            ApprovePayroll,
            GenerateOutcome,
            PayPeriod,
            PayrollRecord,
            PayrollSlip,
            PayrollStatus,
            PayrollDeduction,
            DeductionType,
            SalaryInput,
            SalaryStructure
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance ledger APIs"),
        (name = "Leave", description = "Leave ledger APIs"),
        (name = "Payroll", description = "Payroll lifecycle APIs"),
        (name = "Salary", description = "Salary structure APIs"),
    )
)]
pub struct ApiDoc;
