use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::model::leave_request::{LeaveRecord, LeaveSummary};
use crate::service::Engine;
use crate::service::leave::LeaveApplication;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// One of annual, sick, casual, unpaid
    #[schema(example = "sick")]
    pub leave_type: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveSummaryQuery {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
}

#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRecord),
        (status = 400, description = "End before start, unknown leave type or overlapping leave", body = Object, example = json!({
            "kind": "validation",
            "message": "end_date cannot be before start_date"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    engine: web::Data<Engine>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let record = engine
        .leave
        .apply(
            payload.employee_id,
            LeaveApplication {
                start_date: payload.start_date,
                end_date: payload.end_date,
                leave_type: payload.leave_type,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(record))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}",
    request_body = LeaveApplication,
    params(
        ("leave_id" = u64, Path, description = "ID of the pending leave request")
    ),
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRecord),
        (status = 400, description = "Invalid or overlapping span, or leave no longer pending"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn update_leave(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<LeaveApplication>,
) -> actix_web::Result<impl Responder> {
    let record = engine
        .leave
        .update(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRecord),
        (status = 400, description = "Leave already processed or overlapping approved leave"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn approve_leave(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.leave.approve(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRecord),
        (status = 400, description = "Leave already processed"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn reject_leave(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.leave.reject(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRecord),
        (status = 400, description = "Leave already rejected or cancelled"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.leave.cancel(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Approved paid and unpaid leave days inside a month
#[utoipa::path(
    get,
    path = "/api/leave/summary",
    params(LeaveSummaryQuery),
    responses(
        (status = 200, description = "Leave days of the month", body = LeaveSummary),
        (status = 400, description = "Invalid month")
    ),
    tag = "Leave"
)]
pub async fn leave_summary(
    engine: web::Data<Engine>,
    query: web::Query<LeaveSummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let summary = engine
        .leave_summary(query.employee_id, query.month, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
