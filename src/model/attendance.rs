use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::geo::Coordinate;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum AttendanceError {
    #[error("check-out at {check_out} is before check-in at {check_in}")]
    CheckOutBeforeCheckIn {
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },

    #[error("attendance for {0} is already checked out")]
    AlreadyCheckedOut(NaiveDate),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Late,
    Pending,
    Present,
    Partial,
    HalfDay,
    Absent,
}

/// Which of the two historical decision tables to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatusRules {
    /// Open day is `pending`; under the full-day threshold is `partial`.
    #[default]
    Standard,
    /// Open day is `present`; under the half-day threshold is `half_day`.
    Legacy,
}

#[derive(Debug, Clone)]
pub struct StatusPolicy {
    pub rules: StatusRules,
    pub start_time: NaiveTime,
    pub late_grace: Duration,
    pub timezone: Tz,
    pub full_day_hours: f64,
    pub half_day_hours: f64,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            rules: StatusRules::Standard,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            late_grace: Duration::zero(),
            timezone: Tz::UTC,
            full_day_hours: 8.0,
            half_day_hours: 4.0,
        }
    }
}

impl StatusPolicy {
    pub fn with_rules(rules: StatusRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Instant after which a check-in on `date` counts as late.
    pub fn scheduled_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(self.start_time);
        let start = match self.timezone.from_local_datetime(&local).earliest() {
            Some(t) => t.with_timezone(&Utc),
            // wall-clock start skipped by a DST jump
            None => self.timezone.from_utc_datetime(&local).with_timezone(&Utc),
        };
        start
            .checked_add_signed(self.late_grace)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Hours between two instants, rounded to two decimals. Negative if `end < start`.
pub fn work_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let ms = (end - start).num_milliseconds() as f64;
    round2(ms / MS_PER_HOUR)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeRecord {
    #[schema(value_type = String, format = DateTime, example = "2024-05-06T08:55:00Z")]
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
}

impl TimeRecord {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            location: None,
        }
    }

    pub fn located(time: DateTime<Utc>, location: Coordinate) -> Self {
        Self {
            time,
            location: Some(location),
        }
    }
}

#[derive(Deserialize)]
struct RawAttendanceEvent {
    date: NaiveDate,
    check_in: TimeRecord,
    #[serde(default)]
    check_out: Option<TimeRecord>,
}

/// One employee-day: a check-in and, once recorded, a check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawAttendanceEvent")]
pub struct AttendanceEvent {
    #[schema(value_type = String, format = Date, example = "2024-05-06")]
    date: NaiveDate,
    check_in: TimeRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_out: Option<TimeRecord>,
}

impl AttendanceEvent {
    pub fn check_in(date: NaiveDate, check_in: TimeRecord) -> Self {
        Self {
            date,
            check_in,
            check_out: None,
        }
    }

    pub fn completed(
        date: NaiveDate,
        check_in: TimeRecord,
        check_out: TimeRecord,
    ) -> Result<Self, AttendanceError> {
        let mut event = Self::check_in(date, check_in);
        event.record_check_out(check_out)?;
        Ok(event)
    }

    /// Closes the day. Allowed once, and never before the check-in.
    pub fn record_check_out(&mut self, check_out: TimeRecord) -> Result<(), AttendanceError> {
        if self.check_out.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut(self.date));
        }
        if check_out.time < self.check_in.time {
            return Err(AttendanceError::CheckOutBeforeCheckIn {
                check_in: self.check_in.time,
                check_out: check_out.time,
            });
        }
        self.check_out = Some(check_out);
        Ok(())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn check_in_record(&self) -> &TimeRecord {
        &self.check_in
    }

    pub fn check_out_record(&self) -> Option<&TimeRecord> {
        self.check_out.as_ref()
    }

    pub fn work_hours(&self) -> Option<f64> {
        self.check_out
            .as_ref()
            .map(|out| work_hours(self.check_in.time, out.time))
    }

    pub fn status(&self, policy: &StatusPolicy) -> AttendanceStatus {
        attendance_status(self, policy)
    }
}

impl TryFrom<RawAttendanceEvent> for AttendanceEvent {
    type Error = AttendanceError;

    fn try_from(raw: RawAttendanceEvent) -> Result<Self, Self::Error> {
        let mut event = AttendanceEvent::check_in(raw.date, raw.check_in);
        if let Some(out) = raw.check_out {
            event.record_check_out(out)?;
        }
        Ok(event)
    }
}

/// Derives the status label for one event.
pub fn attendance_status(event: &AttendanceEvent, policy: &StatusPolicy) -> AttendanceStatus {
    if event.check_in.time > policy.scheduled_start(event.date) {
        return AttendanceStatus::Late;
    }

    let Some(check_out) = &event.check_out else {
        return match policy.rules {
            StatusRules::Standard => AttendanceStatus::Pending,
            StatusRules::Legacy => AttendanceStatus::Present,
        };
    };

    let hours = work_hours(event.check_in.time, check_out.time);
    match policy.rules {
        StatusRules::Standard if hours >= policy.full_day_hours => AttendanceStatus::Present,
        StatusRules::Standard => AttendanceStatus::Partial,
        StatusRules::Legacy if hours < policy.half_day_hours => AttendanceStatus::HalfDay,
        StatusRules::Legacy => AttendanceStatus::Present,
    }
}
