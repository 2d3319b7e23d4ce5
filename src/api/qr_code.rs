use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        geo::GeoFence,
        qr_code::{MAX_VALIDITY_HOURS, QrKind},
    },
    utils::qr_registry::QrRegistry,
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateQrCode {
    #[schema(example = "Gulshan")]
    pub branch: String,
    pub kind: QrKind,
    #[schema(example = 24)]
    pub validity_hours: Option<u32>,
    pub site: Option<GeoFence>,
}

/// List QR codes
#[utoipa::path(
    get,
    path = "/api/admin/qr-codes",
    responses(
        (status = 200, description = "Codes, newest first", body = [QrCode]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
pub async fn list_qr_codes(
    auth: AuthUser,
    registry: web::Data<QrRegistry>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(registry.list()))
}

/// Issue a QR code for a branch
#[utoipa::path(
    post,
    path = "/api/admin/qr-codes",
    request_body = CreateQrCode,
    responses(
        (status = 201, description = "Code issued; older active codes for the branch and kind are deactivated", body = QrCode),
        (status = 400, description = "Missing branch or validity out of range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
#[instrument(name = "qr_issue", skip_all, fields(user_id = auth.user_id))]
pub async fn create_qr_code(
    auth: AuthUser,
    config: web::Data<Config>,
    registry: web::Data<QrRegistry>,
    payload: web::Json<CreateQrCode>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let branch = payload.branch.trim();
    if branch.is_empty() {
        return Err(AppError::BadRequest("Please enter a branch name".to_string()));
    }

    let validity_hours = payload
        .validity_hours
        .unwrap_or(config.qr_default_validity_hours);
    if !(1..=MAX_VALIDITY_HOURS).contains(&validity_hours) {
        return Err(AppError::BadRequest(format!(
            "validity_hours must be between 1 and {MAX_VALIDITY_HOURS}"
        )));
    }

    let qr = registry
        .issue(
            branch,
            payload.kind,
            validity_hours,
            payload.site,
            &auth.username,
            Utc::now(),
        )
        .await;

    info!(qr_id = %qr.id, branch = %qr.branch, kind = %qr.kind, "QR code issued");
    Ok(HttpResponse::Created().json(qr))
}

/// Deactivate a QR code
#[utoipa::path(
    delete,
    path = "/api/admin/qr-codes/{id}",
    params(
        ("id", description = "QR code id")
    ),
    responses(
        (status = 200, description = "Code deactivated", body = QrCode),
        (status = 403, description = "Admin only"),
        (status = 404, description = "QR code not found")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Code"
)]
pub async fn deactivate_qr_code(
    auth: AuthUser,
    registry: web::Data<QrRegistry>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let qr = registry.deactivate(&path.into_inner()).await?;
    info!(qr_id = %qr.id, "QR code deactivated");
    Ok(HttpResponse::Ok().json(qr))
}
