use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::EngineError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollStatus {
    Generated,
    PendingApproval,
    Approved,
    Paid,
    Locked,
}

impl PayrollStatus {
    /// Financial fields are frozen from approval onwards.
    pub fn is_frozen(self) -> bool {
        matches!(self, Self::Approved | Self::Paid | Self::Locked)
    }

    /// Checks a lifecycle move. Locking is accepted from every state except
    /// `Locked` itself, which the caller treats as a no-op.
    pub fn transition(self, next: PayrollStatus) -> Result<PayrollStatus, TransitionError> {
        use PayrollStatus::*;
        match (self, next) {
            (Locked, _) => Err(TransitionError::Locked),
            (Generated, PendingApproval)
            | (PendingApproval, Approved)
            | (Approved, Paid)
            | (_, Locked) => Ok(next),
            _ => Err(TransitionError::Invalid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Locked,
    Invalid,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeductionType {
    #[strum(serialize = "PF")]
    #[serde(rename = "PF")]
    ProvidentFund,
    Tax,
    LossOfPay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollDeduction {
    pub deduction_type: DeductionType,
    #[schema(value_type = String, example = "2160.00")]
    pub amount: Decimal,
}

/// Year and month a payroll covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct PayPeriod {
    pub year: i32,
    pub month: u32,
}

impl PayPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, EngineError> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::Validation(format!("month must be 1-12, got {month}")));
        }
        if !(1970..=9999).contains(&year) {
            return Err(EngineError::Validation(format!("year out of range: {year}")));
        }
        Ok(Self { year, month })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollRecord {
    pub id: u64,
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub working_days: u32,
    pub present_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub overtime_minutes: i64,
    #[schema(value_type = String, example = "21000.00")]
    pub gross_salary: Decimal,
    #[schema(value_type = String, example = "4210.00")]
    pub total_deductions: Decimal,
    #[schema(value_type = String, example = "16790.00")]
    pub net_salary: Decimal,
    pub status: PayrollStatus,
    #[schema(value_type = String, format = "date-time")]
    pub generated_at: NaiveDateTime,
    pub approved_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<NaiveDateTime>,
    /// Bumped on every write; status changes compare-and-swap on it.
    pub version: u32,
}

impl PayrollRecord {
    pub fn period(&self) -> PayPeriod {
        PayPeriod {
            year: self.year,
            month: self.month,
        }
    }
}

/// Figures of a payroll before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollFigures {
    pub working_days: u32,
    pub present_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub overtime_minutes: i64,
    pub gross_salary: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    pub deductions: Vec<PayrollDeduction>,
}

#[derive(Debug, Clone)]
pub struct NewPayroll {
    pub employee_id: u64,
    pub period: PayPeriod,
    pub figures: PayrollFigures,
    pub generated_at: NaiveDateTime,
}

/// Status move persisted with compare-and-swap on `expected_version`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub payroll_id: u64,
    pub expected_version: u32,
    pub status: PayrollStatus,
    pub approved_by: Option<u64>,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayrollSlip {
    pub record: PayrollRecord,
    pub deductions: Vec<PayrollDeduction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use PayrollStatus::*;

    #[test]
    fn happy_path_is_linear() {
        assert_eq!(Generated.transition(PendingApproval), Ok(PendingApproval));
        assert_eq!(PendingApproval.transition(Approved), Ok(Approved));
        assert_eq!(Approved.transition(Paid), Ok(Paid));
    }

    #[test]
    fn skipping_steps_is_invalid() {
        assert_eq!(Generated.transition(Approved), Err(TransitionError::Invalid));
        assert_eq!(Approved.transition(PendingApproval), Err(TransitionError::Invalid));
        assert_eq!(Paid.transition(Generated), Err(TransitionError::Invalid));
    }

    #[test]
    fn lock_is_terminal() {
        for from in [Generated, PendingApproval, Approved, Paid] {
            assert_eq!(from.transition(Locked), Ok(Locked));
        }
        assert_eq!(Locked.transition(PendingApproval), Err(TransitionError::Locked));
        assert_eq!(Locked.transition(Locked), Err(TransitionError::Locked));
    }

    #[test]
    fn deduction_tags() {
        assert_eq!(DeductionType::ProvidentFund.as_ref(), "PF");
        assert_eq!("LOSS_OF_PAY".parse::<DeductionType>().unwrap(), DeductionType::LossOfPay);
        assert!("BONUS".parse::<DeductionType>().is_err());
    }

    #[test]
    fn period_rejects_bad_month() {
        assert!(PayPeriod::new(2026, 0).is_err());
        assert!(PayPeriod::new(2026, 13).is_err());
        assert_eq!(PayPeriod::new(2026, 2).unwrap().month, 2);
    }
}
