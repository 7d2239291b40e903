use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::model::attendance::{AttendanceRecord, MonthlyAttendanceSummary, WeeklyAttendanceSummary};
use crate::service::Engine;

#[derive(Deserialize, ToSchema)]
pub struct BreakRequest {
    #[schema(example = 30)]
    pub minutes: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    #[schema(example = 1)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct WeekQuery {
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub week_start: NaiveDate,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/{employee_id}/check-in",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 201, description = "Checked in", body = AttendanceRecord),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "kind": "conflict",
            "message": "already checked in for 2026-01-05"
        }))
    ),
    tag = "Attendance"
)]
pub async fn check_in(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.attendance.check_in(path.into_inner()).await?;
    Ok(HttpResponse::Created().json(record))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/{employee_id}/check-out",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Checked out, status recomputed", body = AttendanceRecord),
        (status = 404, description = "No check-in found for today"),
        (status = 409, description = "Already checked out today")
    ),
    tag = "Attendance"
)]
pub async fn check_out(engine: web::Data<Engine>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let record = engine.attendance.check_out(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    post,
    path = "/api/attendance/{employee_id}/break",
    request_body = BreakRequest,
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Break recorded on today's open record", body = AttendanceRecord),
        (status = 400, description = "Minutes must be positive"),
        (status = 404, description = "No check-in found for today"),
        (status = 409, description = "Already checked out today")
    ),
    tag = "Attendance"
)]
pub async fn record_break(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<BreakRequest>,
) -> actix_web::Result<impl Responder> {
    let record = engine
        .attendance
        .record_break(path.into_inner(), body.minutes)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance/{employee_id}/monthly",
    params(("employee_id" = u64, Path, description = "Employee ID"), MonthQuery),
    responses(
        (status = 200, description = "Monthly attendance summary", body = MonthlyAttendanceSummary),
        (status = 400, description = "Invalid month"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Attendance"
)]
pub async fn monthly_summary(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let summary = engine
        .monthly_attendance_summary(path.into_inner(), query.month, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/attendance/{employee_id}/weekly",
    params(("employee_id" = u64, Path, description = "Employee ID"), WeekQuery),
    responses(
        (status = 200, description = "Seven days from week_start", body = WeeklyAttendanceSummary),
        (status = 404, description = "Employee not found")
    ),
    tag = "Attendance"
)]
pub async fn weekly_summary(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    query: web::Query<WeekQuery>,
) -> actix_web::Result<impl Responder> {
    let summary = engine.weekly_summary(path.into_inner(), query.week_start).await?;
    Ok(HttpResponse::Ok().json(summary))
}
