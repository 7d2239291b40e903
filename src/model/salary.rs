use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Compensation basis of one employee. One active row per employee; updates
/// overwrite it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "basic": "18000.00",
    "hra": "3000.00",
    "allowance": "1000.00",
    "pf_percent": "12",
    "tax_percent": "5"
}))]
pub struct SalaryStructure {
    pub employee_id: u64,
    #[schema(value_type = String)]
    pub basic: Decimal,
    #[schema(value_type = String)]
    pub hra: Decimal,
    #[schema(value_type = String)]
    pub allowance: Decimal,
    #[schema(value_type = String)]
    pub pf_percent: Decimal,
    #[schema(value_type = String)]
    pub tax_percent: Decimal,
}

impl SalaryStructure {
    pub fn monthly_salary(&self) -> Decimal {
        self.basic + self.hra + self.allowance
    }
}
