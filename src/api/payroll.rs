use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::model::payroll::{PayrollRecord, PayrollSlip};
use crate::service::Engine;
use crate::service::payroll::GenerateOutcome;

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct ApprovePayroll {
    #[schema(example = 7)]
    pub approver_id: u64,
}

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = GeneratePayroll,
    responses(
        (status = 201, description = "Payroll generated; rendering problems are listed as warnings", body = GenerateOutcome),
        (status = 404, description = "Employee or salary structure not found"),
        (status = 409, description = "Payroll already exists for the period", body = Object, example = json!({
            "kind": "conflict",
            "message": "payroll for employee 1001 in 01/2026 already exists"
        })),
        (status = 500, description = "Month without working days or storage failure")
    ),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    engine: web::Data<Engine>,
    payload: web::Json<GeneratePayroll>,
) -> actix_web::Result<impl Responder> {
    let outcome = engine
        .payroll
        .generate(payload.employee_id, payload.month, payload.year)
        .await?;
    Ok(HttpResponse::Created().json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll with itemized deductions", body = PayrollSlip),
        (status = 404, description = "Payroll not found")
    ),
    tag = "Payroll"
)]
pub async fn get_payroll(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let slip = engine.payroll.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(slip))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/submit",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll pending approval", body = PayrollRecord),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Not in GENERATED state or locked")
    ),
    tag = "Payroll"
)]
pub async fn submit_payroll(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.payroll.submit_for_approval(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/approve",
    request_body = ApprovePayroll,
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll approved", body = PayrollRecord),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Not pending approval or locked")
    ),
    tag = "Payroll"
)]
pub async fn approve_payroll(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<ApprovePayroll>,
) -> actix_web::Result<impl Responder> {
    let record = engine
        .payroll
        .approve(path.into_inner(), body.approver_id)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/pay",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll marked as paid", body = PayrollRecord),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Not approved or locked")
    ),
    tag = "Payroll"
)]
pub async fn mark_paid(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.payroll.mark_paid(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Locks a payroll for good. Locking a locked payroll returns it unchanged.
#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/lock",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll locked", body = PayrollRecord),
        (status = 404, description = "Payroll not found")
    ),
    tag = "Payroll"
)]
pub async fn lock_payroll(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.payroll.lock(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/recalculate",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Figures recomputed, status back to GENERATED", body = PayrollSlip),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Payroll approved, paid or locked")
    ),
    tag = "Payroll"
)]
pub async fn recalculate_payroll(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let slip = engine.payroll.recalculate(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(slip))
}
