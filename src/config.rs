use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveTime, TimeDelta};
use chrono_tz::Tz;
use dotenvy::dotenv;

use crate::model::{
    attendance::{StatusPolicy, StatusRules},
    geo::DEFAULT_RADIUS_METERS,
    qr_code::{DEFAULT_VALIDITY_HOURS, MAX_VALIDITY_HOURS},
};

/// A grace period longer than a day would push the start into the next shift.
const MAX_LATE_GRACE_MINUTES: i64 = 24 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_auth_per_min: u32,
    pub rate_protected_per_min: u32,

    pub status_policy: StatusPolicy,
    pub default_radius_meters: f64,
    pub qr_default_validity_hours: u32,

    pub log_dir: String,
}

impl Config {
    /// Defaults for everything except the two required values.
    pub fn new(server_addr: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            jwt_secret: jwt_secret.into(),
            api_prefix: "/api".to_string(),
            rate_auth_per_min: 30,
            rate_protected_per_min: 1000,
            status_policy: StatusPolicy::default(),
            default_radius_meters: DEFAULT_RADIUS_METERS,
            qr_default_validity_hours: DEFAULT_VALIDITY_HOURS,
            log_dir: "logs".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let mut config = Self::new(required("SERVER_ADDR")?, required("JWT_SECRET")?);

        if let Some(prefix) = lookup("API_PREFIX") {
            config.api_prefix = prefix;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            config.log_dir = dir;
        }
        config.rate_auth_per_min = parse_or(&lookup, "RATE_AUTH_PER_MIN", config.rate_auth_per_min)?;
        config.rate_protected_per_min =
            parse_or(&lookup, "RATE_PROTECTED_PER_MIN", config.rate_protected_per_min)?;

        config.default_radius_meters =
            parse_or(&lookup, "DEFAULT_RADIUS_METERS", config.default_radius_meters)?;
        if !config.default_radius_meters.is_finite() || config.default_radius_meters < 0.0 {
            bail!("DEFAULT_RADIUS_METERS must be a non-negative number");
        }

        config.qr_default_validity_hours =
            parse_or(&lookup, "QR_DEFAULT_VALIDITY_HOURS", config.qr_default_validity_hours)?;
        if !(1..=MAX_VALIDITY_HOURS).contains(&config.qr_default_validity_hours) {
            bail!("QR_DEFAULT_VALIDITY_HOURS must be between 1 and {MAX_VALIDITY_HOURS}");
        }

        let policy = &mut config.status_policy;
        policy.rules = parse_or::<StatusRules>(&lookup, "STATUS_RULES", policy.rules)?;
        policy.timezone = parse_or::<Tz>(&lookup, "ATTENDANCE_TZ", policy.timezone)?;
        let grace_minutes = parse_or::<i64>(&lookup, "LATE_GRACE_MINUTES", 0)?;
        if !(0..=MAX_LATE_GRACE_MINUTES).contains(&grace_minutes) {
            bail!("LATE_GRACE_MINUTES must be between 0 and {MAX_LATE_GRACE_MINUTES}");
        }
        policy.late_grace = TimeDelta::try_minutes(grace_minutes)
            .with_context(|| format!("LATE_GRACE_MINUTES {grace_minutes} out of range"))?;
        if let Some(start) = lookup("SHIFT_START") {
            policy.start_time = NaiveTime::parse_from_str(&start, "%H:%M")
                .with_context(|| format!("invalid SHIFT_START {start:?}, expected HH:MM"))?;
        }

        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} {raw:?}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_address_and_secret() {
        let err = Config::from_lookup(lookup(&[("SERVER_ADDR", "0.0.0.0:8080")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_ADDR", "0.0.0.0:8080"),
            ("JWT_SECRET", "s"),
        ]))
        .unwrap();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.status_policy.rules, StatusRules::Standard);
        assert_eq!(config.status_policy.timezone, Tz::UTC);
        assert_eq!(config.default_radius_meters, 100.0);
        assert_eq!(config.qr_default_validity_hours, 24);
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_ADDR", "0.0.0.0:8080"),
            ("JWT_SECRET", "s"),
            ("STATUS_RULES", "legacy"),
            ("ATTENDANCE_TZ", "Asia/Dhaka"),
            ("SHIFT_START", "08:30"),
            ("LATE_GRACE_MINUTES", "30"),
            ("DEFAULT_RADIUS_METERS", "250"),
        ]))
        .unwrap();
        let policy = &config.status_policy;
        assert_eq!(policy.rules, StatusRules::Legacy);
        assert_eq!(policy.timezone, chrono_tz::Asia::Dhaka);
        assert_eq!(policy.start_time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(policy.late_grace, TimeDelta::minutes(30));
        assert_eq!(config.default_radius_meters, 250.0);
    }

    #[test]
    fn rejects_bad_values() {
        let base = [("SERVER_ADDR", "a"), ("JWT_SECRET", "s")];
        for bad in [
            ("STATUS_RULES", "lenient"),
            ("ATTENDANCE_TZ", "Mars/Olympus"),
            ("SHIFT_START", "9am"),
            ("QR_DEFAULT_VALIDITY_HOURS", "0"),
            ("DEFAULT_RADIUS_METERS", "-5"),
            ("LATE_GRACE_MINUTES", "-1"),
            ("LATE_GRACE_MINUTES", "1441"),
            ("LATE_GRACE_MINUTES", "9223372036854775807"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push(bad);
            assert!(Config::from_lookup(lookup(&pairs)).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn day_long_grace_keeps_status_derivable() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_ADDR", "a"),
            ("JWT_SECRET", "s"),
            ("LATE_GRACE_MINUTES", "1440"),
        ]))
        .unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let start = config.status_policy.scheduled_start(date);
        assert_eq!(start.to_rfc3339(), "2024-05-07T09:00:00+00:00");
    }
}
