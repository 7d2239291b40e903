//! Engine components and the facade the HTTP layer talks to.

pub mod attendance;
pub mod calculator;
pub mod calendar;
pub mod leave;
pub mod notify;
pub mod payroll;
pub mod scheduler;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::clock::Clock;
use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::model::attendance::{MonthlyAttendanceSummary, WeeklyAttendanceSummary};
use crate::model::leave_request::LeaveSummary;
use crate::model::payroll::PayPeriod;
use crate::model::salary::SalaryStructure;
use crate::store::{
    AttendanceStore, EmployeeDirectory, HolidayCalendar, LeaveStore, PayrollStore, SalaryStore,
};

use attendance::{AttendanceLedger, DayRules};
use calculator::{CalculatorSettings, check_structure};
use calendar::CalendarResolver;
use leave::LeaveLedger;
use notify::{DocumentRenderer, NotificationSink};
use payroll::{PayrollManager, PayrollManagerParts};
use scheduler::AutoCheckoutScheduler;

/// Collaborators the engine is assembled from.
pub struct EngineParts {
    pub attendance: Arc<dyn AttendanceStore>,
    pub leaves: Arc<dyn LeaveStore>,
    pub salaries: Arc<dyn SalaryStore>,
    pub payrolls: Arc<dyn PayrollStore>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub holidays: Arc<dyn HolidayCalendar>,
    pub notifier: Arc<dyn NotificationSink>,
    pub renderer: Option<Arc<dyn DocumentRenderer>>,
    pub clock: Arc<dyn Clock>,
}

impl EngineParts {
    /// Uses one backend for every store and collaborator lookup.
    pub fn from_store<S>(store: Arc<S>, notifier: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self
    where
        S: AttendanceStore
            + LeaveStore
            + SalaryStore
            + PayrollStore
            + EmployeeDirectory
            + HolidayCalendar
            + 'static,
    {
        Self {
            attendance: store.clone(),
            leaves: store.clone(),
            salaries: store.clone(),
            payrolls: store.clone(),
            employees: store.clone(),
            holidays: store,
            notifier,
            renderer: None,
            clock,
        }
    }
}

pub struct Engine {
    pub attendance: Arc<AttendanceLedger>,
    pub leave: Arc<LeaveLedger>,
    pub calendar: Arc<CalendarResolver>,
    pub payroll: PayrollManager,
    salaries: Arc<dyn SalaryStore>,
    employees: Arc<dyn EmployeeDirectory>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(parts: EngineParts, settings: EngineSettings) -> Self {
        let attendance = Arc::new(AttendanceLedger::new(
            parts.attendance,
            parts.employees.clone(),
            parts.clock.clone(),
            DayRules::from(&settings),
        ));
        let leave = Arc::new(LeaveLedger::new(parts.leaves, parts.employees.clone()));
        let calendar = Arc::new(CalendarResolver::new(parts.holidays, settings.weekend.clone()));

        let payroll = PayrollManager::new(PayrollManagerParts {
            payrolls: parts.payrolls,
            salaries: parts.salaries.clone(),
            employees: parts.employees.clone(),
            calendar: calendar.clone(),
            attendance: attendance.clone(),
            leave: leave.clone(),
            notifier: parts.notifier,
            renderer: parts.renderer,
            clock: parts.clock.clone(),
            settings: CalculatorSettings::from(&settings),
        });

        Self {
            attendance,
            leave,
            calendar,
            payroll,
            salaries: parts.salaries,
            employees: parts.employees,
            clock: parts.clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> AutoCheckoutScheduler {
        AutoCheckoutScheduler::new(
            self.attendance.clone(),
            self.clock.clone(),
            self.settings.auto_checkout_at,
        )
    }

    pub async fn monthly_attendance_summary(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> Result<MonthlyAttendanceSummary, EngineError> {
        let period = PayPeriod::new(year, month)?;
        self.employees.require_employee(employee_id).await?;

        let calendar = self.calendar.resolve(period).await?;
        let leave_days = self
            .leave
            .approved_days(employee_id, calendar.first, calendar.last)
            .await?;
        self.attendance
            .monthly_summary(employee_id, &calendar, &leave_days)
            .await
    }

    /// Working days of approved leave in the month, split paid and unpaid.
    pub async fn leave_summary(&self, employee_id: u64, month: u32, year: i32) -> Result<LeaveSummary, EngineError> {
        let period = PayPeriod::new(year, month)?;
        let calendar = self.calendar.resolve(period).await?;
        self.leave.monthly_summary(employee_id, &calendar).await
    }

    /// Seven days starting at `week_start`, which may cross a month edge.
    pub async fn weekly_summary(
        &self,
        employee_id: u64,
        week_start: NaiveDate,
    ) -> Result<WeeklyAttendanceSummary, EngineError> {
        self.employees.require_employee(employee_id).await?;
        let week_end = week_start
            .checked_add_days(chrono::Days::new(6))
            .ok_or_else(|| EngineError::Validation("week start out of range".into()))?;

        let working_dates = self.calendar.working_dates_between(week_start, week_end).await?;
        let leave_dates = self.leave.approved_dates(employee_id, week_start, week_end).await?;
        self.attendance
            .weekly_summary(employee_id, week_start, &working_dates, &leave_dates)
            .await
    }

    /// Replaces the employee's salary structure.
    pub async fn save_salary_structure(&self, structure: SalaryStructure) -> Result<SalaryStructure, EngineError> {
        check_structure(&structure)?;
        self.employees.require_employee(structure.employee_id).await?;
        self.salaries.upsert_salary(&structure).await?;
        info!(employee_id = structure.employee_id, "Salary structure saved");
        Ok(structure)
    }

    pub async fn salary_structure(&self, employee_id: u64) -> Result<SalaryStructure, EngineError> {
        self.salaries
            .find_salary(employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found("salary structure", employee_id))
    }
}
