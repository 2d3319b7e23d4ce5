use crate::{
    auth::{
        jwt::{bearer_token, verify_token},
        session::{Session, SessionRegistry, token_expiry},
    },
    config::Config,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::{debug, info, instrument};

/// Current session
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Session of the bearer token", body = Session),
        (status = 401, description = "Missing, invalid or revoked token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(session: Session) -> impl Responder {
    HttpResponse::Ok().json(session)
}

/// Sign out: revokes the presented token. Always 204, even for unknown tokens.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_logout", skip_all)]
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionRegistry>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(header) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    else {
        return HttpResponse::NoContent().finish();
    };

    let Some(token) = bearer_token(header) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => {
            debug!("Logout with unverifiable token ignored");
            return HttpResponse::NoContent().finish();
        }
    };

    // the middleware refuses tokens whose exp is unrepresentable
    let Some(expires_at) = token_expiry(&claims) else {
        return HttpResponse::NoContent().finish();
    };
    sessions.revoke(&claims.jti, expires_at).await;
    info!(user_id = claims.user_id, jti = %claims.jti, "Session revoked");

    HttpResponse::NoContent().finish()
}
