use crate::auth::jwt::{bearer_token, verify_token};
use crate::auth::session::{Session, SessionRegistry};
use crate::config::Config;
use crate::error::AppError;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web::Data,
};
use tracing::{debug, warn};

fn reject(req: ServiceRequest, error: AppError) -> Result<ServiceResponse<BoxBody>, Error> {
    debug!(path = %req.path(), code = error.error_code(), "Request rejected");
    let resp = error.error_response();
    Ok(req.into_response(resp))
}

/// Verifies the bearer token, opens a [`Session`] for the request and
/// revokes it again if the handler answers 401.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("App config missing")))?;
    let sessions = req
        .app_data::<Data<SessionRegistry>>()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Session registry missing")))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => {
                let err =
                    AppError::Unauthorized("Invalid Authorization header encoding".to_string());
                return reject(req, err);
            }
        },
        None => {
            let err = AppError::Unauthorized("Missing Authorization header".to_string());
            return reject(req, err);
        }
    };

    let Some(token) = bearer_token(&header_value) else {
        let err =
            AppError::Unauthorized("Authorization header must start with Bearer".to_string());
        return reject(req, err);
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Access => c,
        _ => return reject(req, AppError::InvalidToken),
    };

    if sessions.is_revoked(&claims.jti) {
        return reject(req, AppError::SessionRevoked);
    }

    let session = match Session::from_claims(claims) {
        Ok(s) => s,
        Err(e) => return reject(req, e),
    };
    let (token_id, expires_at) = (session.token_id.clone(), session.expires_at);
    req.extensions_mut().insert(session);

    let res = next.call(req).await?;

    if res.status() == StatusCode::UNAUTHORIZED {
        warn!(token_id = %token_id, "Handler answered 401, invalidating session");
        sessions.revoke(&token_id, expires_at).await;
    }

    Ok(res)
}
