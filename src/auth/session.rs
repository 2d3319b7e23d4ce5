use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::{Expiry, future::Cache};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::auth::AuthUser, error::AppError, model::role::Role, models::Claims};

/// The verified identity behind one access token.
///
/// Built by the auth middleware for every protected request and handed to
/// handlers through request extensions; nothing about it is process-global.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    pub token_id: String,
    pub user: AuthUser,
    #[schema(value_type = String, format = DateTime)]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_claims(claims: Claims) -> Result<Self, AppError> {
        let role = Role::from_id(claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid role".to_string()))?;
        let expires_at = token_expiry(&claims).ok_or(AppError::InvalidToken)?;

        Ok(Self {
            token_id: claims.jti,
            user: AuthUser {
                user_id: claims.user_id,
                username: claims.sub,
                role,
                employee_id: claims.employee_id,
            },
            expires_at,
        })
    }
}

/// The `exp` claim as an instant, if representable.
pub fn token_expiry(claims: &Claims) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::try_from(claims.exp).ok()?, 0)
}

/// Matches the leeway `jsonwebtoken` grants past `exp` by default.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// Keeps a revoked id until its token can no longer pass verification.
struct UntilTokenExpires {
    leeway: Duration,
}

impl Expiry<String, DateTime<Utc>> for UntilTokenExpires {
    fn expire_after_create(
        &self,
        _key: &String,
        expires_at: &DateTime<Utc>,
        _created_at: Instant,
    ) -> Option<Duration> {
        let remaining = (*expires_at - Utc::now()).to_std().unwrap_or_default();
        Some(remaining + self.leeway)
    }
}

/// Token ids signed out before they expired.
///
/// No capacity bound: an id leaves only once its token has expired.
#[derive(Clone)]
pub struct SessionRegistry {
    revoked: Cache<String, DateTime<Utc>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_leeway(DEFAULT_LEEWAY)
    }

    /// `leeway` is how long past `exp` a token still verifies.
    pub fn with_leeway(leeway: Duration) -> Self {
        Self {
            revoked: Cache::builder()
                .expire_after(UntilTokenExpires { leeway })
                .build(),
        }
    }

    pub async fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) {
        self.revoked.insert(token_id.to_string(), expires_at).await;
    }

    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.revoked.contains_key(token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;

    fn claims(role: u8) -> Claims {
        Claims {
            user_id: 3,
            sub: "rafi".into(),
            role,
            exp: 1_893_456_000,
            jti: "jti-1".into(),
            token_type: TokenType::Access,
            employee_id: Some(9),
        }
    }

    #[test]
    fn session_carries_the_claims() {
        let session = Session::from_claims(claims(3)).unwrap();
        assert_eq!(session.token_id, "jti-1");
        assert_eq!(session.user.role, Role::Employee);
        assert_eq!(session.user.employee_id, Some(9));
        assert_eq!(session.expires_at.timestamp(), 1_893_456_000);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(matches!(
            Session::from_claims(claims(9)),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[actix_web::test]
    async fn revocation_is_per_token() {
        let registry = SessionRegistry::new();
        let exp = Utc::now() + chrono::Duration::minutes(15);
        assert!(!registry.is_revoked("a"));
        registry.revoke("a", exp).await;
        assert!(registry.is_revoked("a"));
        assert!(!registry.is_revoked("b"));
    }

    #[actix_web::test]
    async fn revocation_lasts_until_the_token_expires() {
        let registry = SessionRegistry::with_leeway(Duration::ZERO);
        let now = Utc::now();
        registry.revoke("long-lived", now + chrono::Duration::hours(1)).await;
        registry.revoke("expired", now - chrono::Duration::seconds(5)).await;

        actix_web::rt::time::sleep(Duration::from_millis(1500)).await;

        assert!(registry.is_revoked("long-lived"));
        assert!(!registry.is_revoked("expired"));
    }

    #[test]
    fn expiry_reads_the_exp_claim() {
        let exp = token_expiry(&claims(3)).unwrap();
        assert_eq!(exp.timestamp(), 1_893_456_000);
    }
}
