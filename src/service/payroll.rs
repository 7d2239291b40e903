use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::error::EngineError;
use crate::model::payroll::{
    NewPayroll, PayPeriod, PayrollFigures, PayrollRecord, PayrollSlip, PayrollStatus, StatusChange,
    TransitionError,
};
use crate::model::salary::SalaryStructure;
use crate::store::{EmployeeDirectory, PayrollStore, SalaryStore};

use super::attendance::AttendanceLedger;
use super::calculator::{CalculatorSettings, PayrollInput, calculate};
use super::calendar::CalendarResolver;
use super::leave::LeaveLedger;
use super::notify::{DocumentRenderer, NotificationKind, NotificationSink};

/// Attempts at a compare-and-swap write before giving up.
const MAX_CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerateOutcome {
    pub slip: PayrollSlip,
    /// Handle of the rendered payslip, when a renderer is configured.
    pub payslip: Option<String>,
    /// Non-fatal problems after the payroll was saved.
    pub warnings: Vec<String>,
}

/// Everything the manager reads from or writes to.
pub struct PayrollManagerParts {
    pub payrolls: Arc<dyn PayrollStore>,
    pub salaries: Arc<dyn SalaryStore>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub calendar: Arc<CalendarResolver>,
    pub attendance: Arc<AttendanceLedger>,
    pub leave: Arc<LeaveLedger>,
    pub notifier: Arc<dyn NotificationSink>,
    pub renderer: Option<Arc<dyn DocumentRenderer>>,
    pub clock: Arc<dyn Clock>,
    pub settings: CalculatorSettings,
}

/// Only writer of payroll records and their deductions.
pub struct PayrollManager {
    parts: PayrollManagerParts,
}

impl PayrollManager {
    pub fn new(parts: PayrollManagerParts) -> Self {
        Self { parts }
    }

    pub async fn generate(&self, employee_id: u64, month: u32, year: i32) -> Result<GenerateOutcome, EngineError> {
        let period = PayPeriod::new(year, month)?;
        let p = &self.parts;

        let employee = p.employees.require_employee(employee_id).await?;
        if p.payrolls.find_payroll_for(employee_id, period).await?.is_some() {
            return Err(EngineError::DuplicatePayroll {
                employee_id,
                month,
                year,
            });
        }
        let salary = self.salary_of(employee_id).await?;
        let figures = self.compute(employee_id, period, &salary).await?;
        let deductions = figures.deductions.clone();

        // the unique key on (employee, month, year) settles concurrent runs
        let record = p
            .payrolls
            .insert_payroll(NewPayroll {
                employee_id,
                period,
                figures,
                generated_at: p.clock.now(),
            })
            .await?;

        info!(
            employee_id,
            payroll_id = record.id,
            month,
            year,
            net = %record.net_salary,
            "Payroll generated"
        );
        p.notifier.notify(
            employee_id,
            "Payroll generated",
            &format!(
                "Hi {}, your payroll for {month:02}/{year} is ready. Net salary: {}",
                employee.full_name(),
                record.net_salary
            ),
            NotificationKind::PayrollGenerated,
        );

        let mut warnings = Vec::new();
        let mut payslip = None;
        if let Some(renderer) = &p.renderer {
            match renderer.render_payslip(&record, &salary, &deductions).await {
                Ok(handle) => payslip = Some(handle),
                Err(e) => {
                    warn!(error = %e, payroll_id = record.id, "Payslip rendering failed");
                    warnings.push(format!("payslip rendering failed: {e}"));
                }
            }
        }

        Ok(GenerateOutcome {
            slip: PayrollSlip { record, deductions },
            payslip,
            warnings,
        })
    }

    pub async fn submit_for_approval(&self, payroll_id: u64) -> Result<PayrollRecord, EngineError> {
        self.transition(payroll_id, PayrollStatus::PendingApproval, None).await
    }

    pub async fn approve(&self, payroll_id: u64, approver_id: u64) -> Result<PayrollRecord, EngineError> {
        let record = self
            .transition(payroll_id, PayrollStatus::Approved, Some(approver_id))
            .await?;
        self.parts.notifier.notify(
            record.employee_id,
            "Payroll approved",
            &format!(
                "Your payroll for {:02}/{} has been approved. Net salary: {}",
                record.month, record.year, record.net_salary
            ),
            NotificationKind::PayrollApproved,
        );
        Ok(record)
    }

    pub async fn mark_paid(&self, payroll_id: u64) -> Result<PayrollRecord, EngineError> {
        self.transition(payroll_id, PayrollStatus::Paid, None).await
    }

    /// Locks the record for good. Locking an already locked record changes
    /// nothing and succeeds.
    pub async fn lock(&self, payroll_id: u64) -> Result<PayrollRecord, EngineError> {
        self.transition(payroll_id, PayrollStatus::Locked, None).await
    }

    /// Recomputes the figures of a record that is not yet approved and puts
    /// it back to GENERATED.
    pub async fn recalculate(&self, payroll_id: u64) -> Result<PayrollSlip, EngineError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.load(payroll_id).await?;
            if current.status.is_frozen() {
                return Err(EngineError::PayrollLocked(payroll_id, current.status));
            }

            let salary = self.salary_of(current.employee_id).await?;
            let figures = self.compute(current.employee_id, current.period(), &salary).await?;
            let deductions = figures.deductions.clone();

            if let Some(record) = self
                .parts
                .payrolls
                .replace_figures(payroll_id, current.version, figures, self.parts.clock.now())
                .await?
            {
                info!(payroll_id, net = %record.net_salary, "Payroll recalculated");
                return Ok(PayrollSlip { record, deductions });
            }
            debug!(payroll_id, "Payroll changed during recalculation, retrying");
        }
        Err(EngineError::ConcurrentUpdate(payroll_id))
    }

    pub async fn get(&self, payroll_id: u64) -> Result<PayrollSlip, EngineError> {
        let record = self.load(payroll_id).await?;
        let deductions = self.parts.payrolls.payroll_deductions(payroll_id).await?;
        Ok(PayrollSlip { record, deductions })
    }

    async fn load(&self, payroll_id: u64) -> Result<PayrollRecord, EngineError> {
        self.parts
            .payrolls
            .find_payroll(payroll_id)
            .await?
            .ok_or_else(|| EngineError::not_found("payroll", payroll_id))
    }

    async fn salary_of(&self, employee_id: u64) -> Result<SalaryStructure, EngineError> {
        self.parts
            .salaries
            .find_salary(employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found("salary structure", employee_id))
    }

    async fn compute(
        &self,
        employee_id: u64,
        period: PayPeriod,
        salary: &SalaryStructure,
    ) -> Result<PayrollFigures, EngineError> {
        let p = &self.parts;
        let calendar = p.calendar.resolve(period).await?;
        let leave_days = p.leave.approved_days(employee_id, calendar.first, calendar.last).await?;
        // leave on weekends, holidays and attended days is not counted
        let attendance = p
            .attendance
            .monthly_summary(employee_id, &calendar, &leave_days)
            .await?;

        let breakdown = calculate(
            &PayrollInput {
                salary,
                working_days: calendar.working_days(),
                present_days: attendance.present_days,
                paid_leave_days: attendance.paid_leave_days,
                unpaid_leave_days: attendance.unpaid_leave_days,
                overtime_minutes: attendance.overtime_minutes,
            },
            &p.settings,
        )?;
        Ok(breakdown.into_figures())
    }

    async fn transition(
        &self,
        payroll_id: u64,
        next: PayrollStatus,
        approver: Option<u64>,
    ) -> Result<PayrollRecord, EngineError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.load(payroll_id).await?;
            match current.status.transition(next) {
                Ok(_) => {}
                Err(TransitionError::Locked) if next == PayrollStatus::Locked => {
                    info!(payroll_id, "Payroll already locked");
                    return Ok(current);
                }
                Err(TransitionError::Locked) => {
                    return Err(EngineError::PayrollLocked(payroll_id, current.status));
                }
                Err(TransitionError::Invalid) => {
                    return Err(EngineError::InvalidTransition {
                        from: current.status,
                        to: next,
                    });
                }
            }

            let change = StatusChange {
                payroll_id,
                expected_version: current.version,
                status: next,
                approved_by: approver,
                approved_at: approver.map(|_| self.parts.clock.now()),
            };
            if let Some(updated) = self.parts.payrolls.change_status(change).await? {
                info!(payroll_id, from = %current.status, to = %next, "Payroll status changed");
                return Ok(updated);
            }
            debug!(payroll_id, "Payroll version moved, retrying transition");
        }
        Err(EngineError::ConcurrentUpdate(payroll_id))
    }
}
