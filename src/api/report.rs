use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::report::{
        AttendanceRow, EmployeeAttendance, ReportFilter, ReportRange, attendance_rows,
        dashboard_stats, salary_report, summarize,
    },
};

#[derive(Deserialize, ToSchema)]
pub struct ReportRequest {
    #[serde(flatten)]
    pub range: ReportRange,
    #[serde(flatten)]
    pub filter: ReportFilter,
    pub roster: Vec<EmployeeAttendance>,
}

impl ReportRequest {
    fn validated_range(&self) -> Result<ReportRange, AppError> {
        self.range
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(self.range)
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportResponse {
    pub range: ReportRange,
    pub data: Vec<AttendanceRow>,
    pub total: usize,
}

/// Attendance rows with derived status
#[utoipa::path(
    post,
    path = "/api/reports/attendance",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Rows ordered by date", body = AttendanceReportResponse),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
#[instrument(name = "report_attendance", skip_all, fields(user_id = auth.user_id))]
pub async fn attendance_report(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<ReportRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager_or_admin()?;
    let range = payload.validated_range()?;

    let data = attendance_rows(&payload.roster, &range, &payload.filter, &config.status_policy);
    debug!(rows = data.len(), "Attendance report built");

    Ok(HttpResponse::Ok().json(AttendanceReportResponse {
        range,
        total: data.len(),
        data,
    }))
}

/// Per-employee attendance totals
#[utoipa::path(
    post,
    path = "/api/reports/summary",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "One summary per employee", body = [AttendanceSummary]),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
#[instrument(name = "report_summary", skip_all, fields(user_id = auth.user_id))]
pub async fn summary_report(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<ReportRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager_or_admin()?;
    let range = payload.validated_range()?;

    let summary = summarize(&payload.roster, &range, &payload.filter, &config.status_policy);
    Ok(HttpResponse::Ok().json(summary))
}

/// Salary report grouped by department
#[utoipa::path(
    post,
    path = "/api/reports/salary",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Salary report", body = SalaryReport),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
#[instrument(name = "report_salary", skip_all, fields(user_id = auth.user_id))]
pub async fn salary(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<ReportRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager_or_admin()?;
    let range = payload.validated_range()?;

    let report = salary_report(&payload.roster, &range, &payload.filter, &config.status_policy);
    debug!(
        departments = report.departments.len(),
        employees = report.overall.total_employees,
        "Salary report built"
    );
    Ok(HttpResponse::Ok().json(report))
}

#[derive(Deserialize, ToSchema)]
pub struct DashboardRequest {
    #[schema(value_type = String, format = Date, example = "2024-05-06")]
    pub date: NaiveDate,
    pub roster: Vec<EmployeeAttendance>,
}

/// Counters for the admin dashboard
#[utoipa::path(
    post,
    path = "/api/admin/dashboard/stats",
    request_body = DashboardRequest,
    responses(
        (status = 200, description = "Counters for the day", body = DashboardStats),
        (status = 403, description = "Manager/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn dashboard(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<DashboardRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager_or_admin()?;
    let stats = dashboard_stats(&payload.roster, payload.date, &config.status_policy);
    Ok(HttpResponse::Ok().json(stats))
}
