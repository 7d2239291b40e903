//! Salary arithmetic. Pure and deterministic: the same inputs always give
//! the same figures, cent for cent.
//!
//! Every derived monetary quantity is rounded half-up to two places as soon
//! as it is produced, and later steps work on the rounded value.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::model::payroll::{DeductionType, PayrollDeduction, PayrollFigures};
use crate::model::salary::SalaryStructure;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds to cents, half away from zero.
pub fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorSettings {
    pub hours_per_day: Decimal,
    pub overtime_multiplier: Decimal,
}

impl From<&EngineSettings> for CalculatorSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            hours_per_day: settings.hours_per_day,
            overtime_multiplier: settings.overtime_multiplier,
        }
    }
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        CalculatorSettings::from(&EngineSettings::default())
    }
}

#[derive(Debug, Clone)]
pub struct PayrollInput<'a> {
    pub salary: &'a SalaryStructure,
    pub working_days: u32,
    pub present_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub overtime_minutes: i64,
}

/// Full working of one payroll, intermediate values included.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollBreakdown {
    pub working_days: u32,
    pub present_days: u32,
    pub paid_leave_days: u32,
    pub unpaid_leave_days: u32,
    pub absent_days: u32,
    pub lop_days: u32,
    pub overtime_minutes: i64,
    pub monthly_salary: Decimal,
    pub per_day_salary: Decimal,
    pub lop_amount: Decimal,
    pub hourly_rate: Decimal,
    pub overtime_amount: Decimal,
    pub gross_salary: Decimal,
    pub pf: Decimal,
    pub tax: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
}

impl PayrollBreakdown {
    /// Itemized deductions in display order.
    pub fn deductions(&self) -> Vec<PayrollDeduction> {
        vec![
            PayrollDeduction {
                deduction_type: DeductionType::ProvidentFund,
                amount: self.pf,
            },
            PayrollDeduction {
                deduction_type: DeductionType::Tax,
                amount: self.tax,
            },
            PayrollDeduction {
                deduction_type: DeductionType::LossOfPay,
                amount: self.lop_amount,
            },
        ]
    }

    pub fn into_figures(self) -> PayrollFigures {
        PayrollFigures {
            deductions: self.deductions(),
            working_days: self.working_days,
            present_days: self.present_days,
            paid_leave_days: self.paid_leave_days,
            unpaid_leave_days: self.unpaid_leave_days,
            overtime_minutes: self.overtime_minutes,
            gross_salary: self.gross_salary,
            total_deductions: self.total_deductions,
            net_salary: self.net_salary,
        }
    }
}

fn validate(input: &PayrollInput<'_>) -> Result<(), EngineError> {
    if input.working_days == 0 {
        return Err(EngineError::Configuration(
            "month has no working days, cannot derive a per-day salary".into(),
        ));
    }

    let accounted = input.present_days as u64 + input.paid_leave_days as u64 + input.unpaid_leave_days as u64;
    if accounted > input.working_days as u64 {
        return Err(EngineError::Validation(format!(
            "present ({}) + paid leave ({}) + unpaid leave ({}) exceed {} working days",
            input.present_days, input.paid_leave_days, input.unpaid_leave_days, input.working_days
        )));
    }
    if input.overtime_minutes < 0 {
        return Err(EngineError::Validation("overtime minutes cannot be negative".into()));
    }

    check_structure(input.salary)
}

/// Amounts must be non-negative and percentages within 0-100.
pub fn check_structure(s: &SalaryStructure) -> Result<(), EngineError> {
    for (name, amount) in [("basic", s.basic), ("hra", s.hra), ("allowance", s.allowance)] {
        if amount < Decimal::ZERO {
            return Err(EngineError::Validation(format!("{name} cannot be negative")));
        }
    }
    for (name, percent) in [("pf_percent", s.pf_percent), ("tax_percent", s.tax_percent)] {
        if percent < Decimal::ZERO || percent > HUNDRED {
            return Err(EngineError::Validation(format!("{name} must be within 0-100")));
        }
    }
    Ok(())
}

pub fn calculate(input: &PayrollInput<'_>, settings: &CalculatorSettings) -> Result<PayrollBreakdown, EngineError> {
    validate(input)?;

    let s = input.salary;
    let working_days = Decimal::from(input.working_days);
    let absent_days = input.working_days - input.present_days - input.paid_leave_days - input.unpaid_leave_days;
    let lop_days = input.unpaid_leave_days + absent_days;

    let monthly_salary = money(s.monthly_salary());
    let per_day_salary = money(monthly_salary / working_days);
    let lop_amount = money(per_day_salary * Decimal::from(lop_days));

    let hours_in_month = working_days * settings.hours_per_day;
    if hours_in_month.is_zero() {
        return Err(EngineError::Configuration("HOURS_PER_DAY must be positive".into()));
    }
    let hourly_rate = money(monthly_salary / hours_in_month);
    let overtime_hours = Decimal::from(input.overtime_minutes) / Decimal::from(60);
    let overtime_amount = money(overtime_hours * hourly_rate * settings.overtime_multiplier);

    let gross_salary = money(monthly_salary - lop_amount + overtime_amount);
    let pf = money(s.basic * s.pf_percent / HUNDRED);
    let tax = money(gross_salary * s.tax_percent / HUNDRED);
    let total_deductions = money(pf + tax + lop_amount);
    let net_salary = gross_salary - total_deductions;

    Ok(PayrollBreakdown {
        working_days: input.working_days,
        present_days: input.present_days,
        paid_leave_days: input.paid_leave_days,
        unpaid_leave_days: input.unpaid_leave_days,
        absent_days,
        lop_days,
        overtime_minutes: input.overtime_minutes,
        monthly_salary,
        per_day_salary,
        lop_amount,
        hourly_rate,
        overtime_amount,
        gross_salary,
        pf,
        tax,
        total_deductions,
        net_salary,
    })
}
