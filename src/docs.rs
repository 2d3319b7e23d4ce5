use crate::api::attendance::{
    HistoryRequest, HistoryResponse, ScanRequest, StatusResponse, VerifyLocationRequest,
    VerifyLocationResponse,
};
use crate::api::qr_code::CreateQrCode;
use crate::api::report::{AttendanceReportResponse, DashboardRequest, ReportRequest};
use crate::auth::{auth::AuthUser, session::Session};
use crate::model::{
    attendance::{AttendanceEvent, AttendanceStatus, TimeRecord},
    employee::{Employee, Shift},
    geo::{Coordinate, GeoFence},
    qr_code::{QrCode, QrKind},
    report::{
        AttendanceRow, AttendanceSummary, DashboardStats, DepartmentSalary, EmployeeAttendance,
        ReportFilter, ReportRange, SalaryLine, SalaryReport, SalaryTotals,
    },
    role::Role,
};
use crate::utils::qr_registry::ScanOutcome;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Evaluation API",
        version = "1.0.0",
        description = r#"
## Geofenced attendance evaluation

Stateless evaluation endpoints for an attendance-tracking dashboard.

### Key Features
- **Location checks**: haversine distance and radius decisions
- **Status classification**: late / pending / present / partial / half_day
- **History**: an employee's own attendance rows and counts
- **QR codes**: issue, list, deactivate and verify branch codes
- **Reports**: attendance rows, per-employee summaries, salary and dashboard counters

### Security
Every endpoint except `/auth/logout` requires a **JWT Bearer** access token.
Reports are limited to **Admin** and **Manager**; QR administration to **Admin**.

Attendance records are supplied by the caller; nothing is persisted.
"#,
    ),
    paths(
        crate::auth::handlers::me,
        crate::auth::handlers::logout,

        crate::api::attendance::verify_location,
        crate::api::attendance::classify,
        crate::api::attendance::scan,
        crate::api::attendance::history,

        crate::api::qr_code::list_qr_codes,
        crate::api::qr_code::create_qr_code,
        crate::api::qr_code::deactivate_qr_code,

        crate::api::report::attendance_report,
        crate::api::report::summary_report,
        crate::api::report::salary,
        crate::api::report::dashboard
    ),
    components(
        schemas(
            Coordinate,
            GeoFence,
            TimeRecord,
            AttendanceEvent,
            AttendanceStatus,
            Role,
            AuthUser,
            Session,
            Employee,
            Shift,
            QrKind,
            QrCode,
            ScanOutcome,
            ReportRange,
            ReportFilter,
            EmployeeAttendance,
            AttendanceRow,
            AttendanceSummary,
            SalaryLine,
            DepartmentSalary,
            SalaryTotals,
            SalaryReport,
            DashboardStats,
            VerifyLocationRequest,
            VerifyLocationResponse,
            StatusResponse,
            ScanRequest,
            HistoryRequest,
            HistoryResponse,
            CreateQrCode,
            ReportRequest,
            AttendanceReportResponse,
            DashboardRequest
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Session APIs"),
        (name = "Attendance", description = "Location and status evaluation APIs"),
        (name = "QR Code", description = "QR code administration APIs"),
        (name = "Reports", description = "Attendance, salary and dashboard reports"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
