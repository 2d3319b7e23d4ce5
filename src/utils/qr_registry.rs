use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::lock::Mutex;
use moka::{Expiry, future::Cache};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    model::{
        geo::{Coordinate, GeoFence},
        qr_code::{MAX_VALIDITY_HOURS, QrCode, QrKind},
    },
};

/// How long an expired code stays listable before eviction.
const RETENTION: Duration = Duration::from_secs(24 * 3600);
const CAPACITY: u64 = 50_000;

/// Evicts a code `RETENTION` after its validity window closes.
struct UntilValidityEnds;

impl Expiry<String, QrCode> for UntilValidityEnds {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &QrCode,
        _created_at: Instant,
    ) -> Option<Duration> {
        let remaining = (value.valid_until - Utc::now()).to_std().unwrap_or_default();
        Some(remaining + RETENTION)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScanOutcome {
    pub qr_id: String,
    pub branch: String,
    pub kind: QrKind,
    /// Distance to the branch site, when the code is tied to one.
    pub distance_meters: Option<f64>,
}

/// In-memory store of issued QR codes.
pub struct QrRegistry {
    codes: Cache<String, QrCode>,
    by_payload: Cache<String, String>,
    issue_lock: Mutex<()>,
}

impl Default for QrRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl QrRegistry {
    pub fn new() -> Self {
        let max_lifetime = Duration::from_secs(u64::from(MAX_VALIDITY_HOURS) * 3600) + RETENTION;
        Self {
            codes: Cache::builder()
                .max_capacity(CAPACITY)
                .expire_after(UntilValidityEnds)
                .build(),
            by_payload: Cache::builder()
                .max_capacity(CAPACITY)
                .time_to_live(max_lifetime)
                .build(),
            issue_lock: Mutex::new(()),
        }
    }

    /// Stores a fresh code and deactivates every other active code for the
    /// same branch and kind.
    pub async fn issue(
        &self,
        branch: &str,
        kind: QrKind,
        validity_hours: u32,
        site: Option<GeoFence>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> QrCode {
        let qr = QrCode::issue(branch, kind, validity_hours, site, created_by, now);

        let _guard = self.issue_lock.lock().await;
        let superseded: Vec<QrCode> = self
            .codes
            .iter()
            .map(|(_, code)| code)
            .filter(|code| code.is_active && qr.supersedes(code))
            .collect();

        for mut old in superseded {
            info!(qr_id = %old.id, branch = %old.branch, "Deactivating superseded QR code");
            old.is_active = false;
            self.codes.insert(old.id.clone(), old).await;
        }

        self.by_payload.insert(qr.code.clone(), qr.id.clone()).await;
        self.codes.insert(qr.id.clone(), qr.clone()).await;
        qr
    }

    /// All retained codes, newest first.
    pub fn list(&self) -> Vec<QrCode> {
        let mut codes: Vec<QrCode> = self.codes.iter().map(|(_, code)| code).collect();
        codes.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then(b.id.cmp(&a.id)));
        codes
    }

    pub async fn deactivate(&self, id: &str) -> Result<QrCode, AppError> {
        let _guard = self.issue_lock.lock().await;
        let mut qr = self
            .codes
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("QR code {id} not found")))?;
        qr.is_active = false;
        self.codes.insert(qr.id.clone(), qr.clone()).await;
        Ok(qr)
    }

    /// Checks a scanned payload at `now` and, for codes bound to a site,
    /// that `location` falls inside the site's fence.
    pub async fn verify_scan(
        &self,
        payload: &str,
        location: Option<&Coordinate>,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, AppError> {
        let unknown = || AppError::NotFound("QR code not recognised".to_string());
        let id = self.by_payload.get(payload).await.ok_or_else(unknown)?;
        let qr = self.codes.get(&id).await.ok_or_else(unknown)?;

        if !qr.is_active {
            return Err(AppError::Gone("QR code has been deactivated".to_string()));
        }
        if qr.is_expired_at(now) {
            return Err(AppError::Gone("QR code has expired".to_string()));
        }

        let distance_meters = match &qr.site {
            None => None,
            Some(site) => {
                let location = location.ok_or_else(|| {
                    AppError::BadRequest("Location is required for this QR code".to_string())
                })?;
                let distance = site.distance_to(location);
                if !site.contains(location) {
                    return Err(AppError::Forbidden(format!(
                        "You are {:.0} m from {}; check-in is allowed within {:.0} m",
                        distance,
                        qr.branch,
                        site.radius_meters()
                    )));
                }
                Some(distance)
            }
        };

        Ok(ScanOutcome {
            qr_id: qr.id,
            branch: qr.branch,
            kind: qr.kind,
            distance_meters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn site() -> GeoFence {
        GeoFence::new(Coordinate::new(23.7925, 90.4078).unwrap(), 100.0).unwrap()
    }

    #[actix_web::test]
    async fn issuing_deactivates_previous_code_for_branch_and_kind() {
        let registry = QrRegistry::new();
        let now = Utc::now();
        let first = registry.issue("Gulshan", QrKind::CheckIn, 24, None, "admin", now).await;
        let other_kind = registry.issue("Gulshan", QrKind::CheckOut, 24, None, "admin", now).await;
        let second = registry
            .issue("Gulshan", QrKind::CheckIn, 24, None, "admin", now + ChronoDuration::seconds(1))
            .await;

        let listed = registry.list();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, second.id);
        let find = |id: &str| listed.iter().find(|c| c.id == id).unwrap().is_active;
        assert!(!find(&first.id));
        assert!(find(&other_kind.id));
        assert!(find(&second.id));
    }

    #[actix_web::test]
    async fn scan_checks_state_expiry_and_site() {
        let registry = QrRegistry::new();
        let now = Utc::now();
        let qr = registry
            .issue("Gulshan", QrKind::CheckIn, 2, Some(site()), "admin", now)
            .await;

        let inside = Coordinate::new(23.7929, 90.4078).unwrap(); // ~44 m
        let outside = Coordinate::new(23.7945, 90.4078).unwrap(); // ~222 m

        let ok = registry.verify_scan(&qr.code, Some(&inside), now).await.unwrap();
        assert_eq!(ok.kind, QrKind::CheckIn);
        assert!(ok.distance_meters.unwrap() < 100.0);

        assert!(matches!(
            registry.verify_scan(&qr.code, Some(&outside), now).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            registry.verify_scan(&qr.code, None, now).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            registry
                .verify_scan(&qr.code, Some(&inside), now + ChronoDuration::hours(3))
                .await,
            Err(AppError::Gone(_))
        ));
        assert!(matches!(
            registry.verify_scan("ATT-unknown", Some(&inside), now).await,
            Err(AppError::NotFound(_))
        ));

        registry.deactivate(&qr.id).await.unwrap();
        assert!(matches!(
            registry.verify_scan(&qr.code, Some(&inside), now).await,
            Err(AppError::Gone(_))
        ));
    }

    #[actix_web::test]
    async fn deactivating_unknown_code_is_not_found() {
        let registry = QrRegistry::new();
        assert!(matches!(
            registry.deactivate("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
