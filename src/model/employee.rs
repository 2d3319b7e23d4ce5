use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::round2;

/// Daily working window in the attendance time zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    #[schema(value_type = String, example = "09:00:00")]
    pub start: NaiveTime,
    #[schema(value_type = String, example = "17:00:00")]
    pub end: NaiveTime,
}

impl Shift {
    /// Length of the shift in hours; overnight shifts wrap past midnight.
    pub fn hours(&self) -> f64 {
        let mut minutes = (self.end - self.start).num_minutes();
        if minutes < 0 {
            minutes += 24 * 60;
        }
        round2(minutes as f64 / 60.0)
    }
}

impl Default for Shift {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "name": "Nadia Rahman",
        "department": "Finance",
        "monthly_salary": 44000.0,
        "shift": { "start": "09:00:00", "end": "17:00:00" },
        "active": true
    })
)]
pub struct Employee {
    pub id: u64,
    pub name: String,
    pub department: String,
    pub monthly_salary: f64,
    #[serde(default)]
    pub shift: Shift,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
