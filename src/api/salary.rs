use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::model::salary::SalaryStructure;
use crate::service::Engine;

#[derive(Deserialize, ToSchema)]
pub struct SalaryInput {
    #[schema(value_type = String, example = "18000.00")]
    pub basic: Decimal,
    #[schema(value_type = String, example = "3000.00")]
    pub hra: Decimal,
    #[schema(value_type = String, example = "1000.00")]
    pub allowance: Decimal,
    #[schema(value_type = String, example = "12")]
    pub pf_percent: Decimal,
    #[schema(value_type = String, example = "5")]
    pub tax_percent: Decimal,
}

#[utoipa::path(
    put,
    path = "/api/salary/{employee_id}",
    request_body = SalaryInput,
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Salary structure replaced", body = SalaryStructure),
        (status = 400, description = "Negative amount or percentage outside 0-100"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Salary"
)]
pub async fn save_salary(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<SalaryInput>,
) -> actix_web::Result<impl Responder> {
    let body = body.into_inner();
    let structure = engine
        .save_salary_structure(SalaryStructure {
            employee_id: path.into_inner(),
            basic: body.basic,
            hra: body.hra,
            allowance: body.allowance,
            pf_percent: body.pf_percent,
            tax_percent: body.tax_percent,
        })
        .await?;
    Ok(HttpResponse::Ok().json(structure))
}

#[utoipa::path(
    get,
    path = "/api/salary/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Current salary structure", body = SalaryStructure),
        (status = 404, description = "No salary structure for the employee")
    ),
    tag = "Salary"
)]
pub async fn get_salary(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let structure = engine.salary_structure(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(structure))
}
