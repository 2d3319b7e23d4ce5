use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        attendance::{AttendanceEvent, AttendanceStatus},
        employee::Employee,
        geo::{Coordinate, GeoFence},
        report::{
            AttendanceRow, AttendanceSummary, EmployeeAttendance, ReportFilter, ReportRange,
            attendance_rows, summarize,
        },
    },
    utils::qr_registry::QrRegistry,
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct VerifyLocationRequest {
    pub user: Coordinate,
    pub target: Coordinate,
    /// Defaults to the configured radius (100 m unless overridden).
    #[schema(example = 100.0)]
    pub radius_meters: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyLocationResponse {
    pub distance_meters: f64,
    pub radius_meters: f64,
    pub within_radius: bool,
}

/// Distance from the user to a target and whether it is inside the radius
#[utoipa::path(
    post,
    path = "/api/attendance/verify-location",
    request_body = VerifyLocationRequest,
    responses(
        (status = 200, description = "Distance computed", body = VerifyLocationResponse),
        (status = 400, description = "Coordinate or radius out of range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn verify_location(
    _auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<VerifyLocationRequest>,
) -> Result<HttpResponse, AppError> {
    let radius = payload.radius_meters.unwrap_or(config.default_radius_meters);
    let fence = GeoFence::new(payload.target, radius)?;
    let distance_meters = fence.distance_to(&payload.user);

    Ok(HttpResponse::Ok().json(VerifyLocationResponse {
        distance_meters,
        radius_meters: fence.radius_meters(),
        within_radius: fence.contains(&payload.user),
    }))
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: AttendanceStatus,
    /// Null until the day is checked out.
    pub work_hours: Option<f64>,
}

/// Status label and worked hours for one attendance event
#[utoipa::path(
    post,
    path = "/api/attendance/status",
    request_body = AttendanceEvent,
    responses(
        (status = 200, description = "Status derived", body = StatusResponse),
        (status = 400, description = "Malformed event, e.g. check-out before check-in"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn classify(
    _auth: AuthUser,
    config: web::Data<Config>,
    event: web::Json<AttendanceEvent>,
) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: event.status(&config.status_policy),
        work_hours: event.work_hours(),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    #[schema(example = "ATT-5b1d0d2e-4a55-4c0c-9f0b-3f7f4a7a2c11")]
    pub qr_code: String,
    pub location: Option<Coordinate>,
}

/// Verify a scanned QR code, and the scanner's position for site-bound codes
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Code accepted", body = ScanOutcome),
        (status = 400, description = "Location missing for a site-bound code"),
        (status = 403, description = "Outside the allowed radius"),
        (status = 404, description = "Unknown code"),
        (status = 410, description = "Code expired or deactivated")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_scan", skip_all, fields(user_id = auth.user_id))]
pub async fn scan(
    auth: AuthUser,
    registry: web::Data<QrRegistry>,
    payload: web::Json<ScanRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let outcome = registry
        .verify_scan(payload.qr_code.trim(), payload.location.as_ref(), Utc::now())
        .await?;

    info!(
        branch = %outcome.branch,
        kind = %outcome.kind,
        distance_meters = ?outcome.distance_meters,
        "QR scan accepted"
    );
    Ok(HttpResponse::Ok().json(outcome))
}

#[derive(Deserialize, ToSchema)]
pub struct HistoryRequest {
    #[serde(flatten)]
    pub range: ReportRange,
    /// Must be the employee linked to the caller's account.
    pub employee: Employee,
    #[serde(default)]
    pub events: Vec<AttendanceEvent>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub range: ReportRange,
    pub records: Vec<AttendanceRow>,
    pub summary: AttendanceSummary,
}

/// The caller's own attendance rows with present/late/total counts
#[utoipa::path(
    post,
    path = "/api/attendance/history",
    request_body = HistoryRequest,
    responses(
        (status = 200, description = "Own history for the range", body = HistoryResponse),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Account has no employee record, or it is someone else's")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_history", skip_all, fields(user_id = auth.user_id))]
pub async fn history(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<HistoryRequest>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.linked_employee()?;
    let HistoryRequest {
        range,
        employee,
        events,
    } = payload.into_inner();
    range
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let own = ReportFilter {
        employee_id: Some(employee_id),
        department: None,
    };
    let entry = [EmployeeAttendance { employee, events }];
    let summary = summarize(&entry, &range, &own, &config.status_policy)
        .pop()
        .ok_or_else(|| AppError::Forbidden("Only your own attendance is visible".to_string()))?;
    let records = attendance_rows(&entry, &range, &own, &config.status_policy);

    Ok(HttpResponse::Ok().json(HistoryResponse {
        range,
        records,
        summary,
    }))
}
