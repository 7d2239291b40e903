use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::error::EngineError;
use crate::model::leave_request::{LeaveRecord, LeaveStatus, LeaveSummary, LeaveType, NewLeave, span_days};
use crate::store::{EmployeeDirectory, LeaveStore};

use super::calendar::MonthCalendar;

/// Leave request as submitted by a caller. Any day count the client might
/// compute is ignored; it is always derived from the span.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: String,
}

impl LeaveApplication {
    fn validate(&self) -> Result<(LeaveType, i64), EngineError> {
        if self.end_date < self.start_date {
            return Err(EngineError::Validation(
                "end_date cannot be before start_date".into(),
            ));
        }
        let leave_type = self
            .leave_type
            .trim()
            .to_ascii_uppercase()
            .parse::<LeaveType>()
            .map_err(|_| {
                EngineError::Validation(format!(
                    "invalid leave type `{}`. Allowed: annual, sick, casual, unpaid",
                    self.leave_type
                ))
            })?;
        Ok((leave_type, span_days(self.start_date, self.end_date)))
    }
}

pub struct LeaveLedger {
    store: Arc<dyn LeaveStore>,
    employees: Arc<dyn EmployeeDirectory>,
}

impl LeaveLedger {
    pub fn new(store: Arc<dyn LeaveStore>, employees: Arc<dyn EmployeeDirectory>) -> Self {
        Self { store, employees }
    }

    pub async fn apply(&self, employee_id: u64, application: LeaveApplication) -> Result<LeaveRecord, EngineError> {
        let (leave_type, day_count) = application.validate()?;
        self.employees.require_employee(employee_id).await?;
        self.ensure_free(
            employee_id,
            application.start_date,
            application.end_date,
            None,
            &[LeaveStatus::Pending, LeaveStatus::Approved],
        )
        .await?;

        let record = self
            .store
            .insert_leave(NewLeave {
                employee_id,
                start_date: application.start_date,
                end_date: application.end_date,
                leave_type,
                day_count,
            })
            .await?;

        info!(employee_id, leave_id = record.id, %leave_type, day_count, "Leave requested");
        Ok(record)
    }

    /// Rewrites a pending request; the day count is recomputed.
    pub async fn update(&self, leave_id: u64, application: LeaveApplication) -> Result<LeaveRecord, EngineError> {
        let (leave_type, day_count) = application.validate()?;
        let current = self.load(leave_id).await?;
        if current.status != LeaveStatus::Pending {
            return Err(EngineError::Validation(format!(
                "leave {leave_id} is {} and can no longer be edited",
                current.status
            )));
        }
        self.ensure_free(
            current.employee_id,
            application.start_date,
            application.end_date,
            Some(leave_id),
            &[LeaveStatus::Pending, LeaveStatus::Approved],
        )
        .await?;

        let updated = self
            .store
            .update_leave_span(
                leave_id,
                application.start_date,
                application.end_date,
                leave_type,
                day_count,
            )
            .await?;
        if !updated {
            return Err(EngineError::Validation(format!(
                "leave {leave_id} was processed while being edited"
            )));
        }

        Ok(LeaveRecord {
            start_date: application.start_date,
            end_date: application.end_date,
            leave_type,
            day_count,
            ..current
        })
    }

    pub async fn approve(&self, leave_id: u64) -> Result<LeaveRecord, EngineError> {
        self.move_to(leave_id, LeaveStatus::Approved).await
    }

    pub async fn reject(&self, leave_id: u64) -> Result<LeaveRecord, EngineError> {
        self.move_to(leave_id, LeaveStatus::Rejected).await
    }

    pub async fn cancel(&self, leave_id: u64) -> Result<LeaveRecord, EngineError> {
        self.move_to(leave_id, LeaveStatus::Cancelled).await
    }

    /// Paid and unpaid working days of approved leave inside the month.
    /// Weekends and holidays inside a span are not leave days.
    pub async fn monthly_summary(&self, employee_id: u64, calendar: &MonthCalendar) -> Result<LeaveSummary, EngineError> {
        let days = self.approved_days(employee_id, calendar.first, calendar.last).await?;

        let mut summary = LeaveSummary::default();
        for (date, leave_type) in &days {
            if !calendar.is_working_day(*date) {
                continue;
            }
            if leave_type.is_paid() {
                summary.paid_leave_days += 1;
            } else {
                summary.unpaid_leave_days += 1;
            }
        }
        Ok(summary)
    }

    /// Leave type of every date in `[from, to]` covered by approved leave.
    /// A date covered twice keeps the type of the earlier request.
    pub async fn approved_days(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, LeaveType>, EngineError> {
        let mut leaves = self
            .store
            .list_leaves(employee_id, from, to, LeaveStatus::Approved)
            .await?;
        leaves.sort_by_key(|leave| leave.id);

        let mut days = BTreeMap::new();
        for leave in &leaves {
            for date in leave.dates_within(from, to) {
                days.entry(date).or_insert(leave.leave_type);
            }
        }
        Ok(days)
    }

    /// Every date in `[from, to]` covered by approved leave.
    pub async fn approved_dates(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>, EngineError> {
        Ok(self.approved_days(employee_id, from, to).await?.into_keys().collect())
    }

    /// Fails when `[start, end]` intersects another request of the employee
    /// in one of `statuses`.
    async fn ensure_free(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        except: Option<u64>,
        statuses: &[LeaveStatus],
    ) -> Result<(), EngineError> {
        for status in statuses {
            let clash = self
                .store
                .list_leaves(employee_id, start, end, *status)
                .await?
                .into_iter()
                .find(|leave| Some(leave.id) != except && leave.overlaps(start, end));
            if let Some(other) = clash {
                return Err(EngineError::Validation(format!(
                    "leave overlaps {status} leave {} ({} to {})",
                    other.id, other.start_date, other.end_date
                )));
            }
        }
        Ok(())
    }

    async fn load(&self, leave_id: u64) -> Result<LeaveRecord, EngineError> {
        self.store
            .find_leave(leave_id)
            .await?
            .ok_or_else(|| EngineError::not_found("leave request", leave_id))
    }

    async fn move_to(&self, leave_id: u64, next: LeaveStatus) -> Result<LeaveRecord, EngineError> {
        let current = self.load(leave_id).await?;
        if !current.status.can_become(next) {
            return Err(EngineError::Validation(format!(
                "leave {leave_id} cannot move from {} to {next}",
                current.status
            )));
        }
        if next == LeaveStatus::Approved {
            self.ensure_free(
                current.employee_id,
                current.start_date,
                current.end_date,
                Some(leave_id),
                &[LeaveStatus::Approved],
            )
            .await?;
        }
        if !self.store.set_leave_status(leave_id, current.status, next).await? {
            return Err(EngineError::Validation(format!(
                "leave {leave_id} was processed concurrently"
            )));
        }

        info!(leave_id, status = %next, "Leave status changed");
        Ok(LeaveRecord { status: next, ..current })
    }
}
