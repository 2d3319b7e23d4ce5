use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::geo::GeoFence;

pub const DEFAULT_VALIDITY_HOURS: u32 = 24;
pub const MAX_VALIDITY_HOURS: u32 = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QrKind {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QrCode {
    #[schema(example = "0b6f7a59-9a6a-4d57-a0d3-7b3a1a1f4e0e")]
    pub id: String,
    /// Payload encoded into the printed QR image.
    pub code: String,
    #[schema(example = "Gulshan")]
    pub branch: String,
    pub kind: QrKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<GeoFence>,
    #[schema(value_type = String, format = DateTime)]
    pub valid_from: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub created_by: String,
}

impl QrCode {
    pub fn issue(
        branch: &str,
        kind: QrKind,
        validity_hours: u32,
        site: Option<GeoFence>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            code: format!("ATT-{}", Uuid::new_v4()),
            branch: branch.to_string(),
            kind,
            site,
            valid_from: now,
            valid_until: now + Duration::hours(i64::from(validity_hours)),
            is_active: true,
            created_by: created_by.to_string(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_from || now >= self.valid_until
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    pub fn supersedes(&self, other: &QrCode) -> bool {
        self.id != other.id && self.branch == other.branch && self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_window_is_half_open() {
        let now = Utc::now();
        let qr = QrCode::issue("Gulshan", QrKind::CheckIn, 24, None, "admin", now);
        assert!(qr.is_valid_at(now));
        assert!(qr.is_valid_at(now + Duration::hours(23)));
        assert!(!qr.is_valid_at(now + Duration::hours(24)));
        assert!(!qr.is_valid_at(now - Duration::seconds(1)));

        let mut off = qr.clone();
        off.is_active = false;
        assert!(!off.is_valid_at(now));
    }

    #[test]
    fn issued_codes_are_unique_and_supersede_same_branch_and_kind() {
        let now = Utc::now();
        let a = QrCode::issue("Gulshan", QrKind::CheckIn, 1, None, "admin", now);
        let b = QrCode::issue("Gulshan", QrKind::CheckIn, 1, None, "admin", now);
        let c = QrCode::issue("Gulshan", QrKind::CheckOut, 1, None, "admin", now);
        assert_ne!(a.code, b.code);
        assert!(b.supersedes(&a));
        assert!(!c.supersedes(&a));
        assert!(!a.supersedes(&a));
    }
}
