//! Manager configuration
//!
//! Options are plain data; applying them to a live manager goes through the
//! manager's setters so each change triggers its side effect.

use crate::environment::Clock;
use chrono::{NaiveDate, NaiveDateTime};
use date_units::DigitWidth;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serialized form of [`DateBound::Now`]
pub const NOW_SENTINEL: &str = "$NOW";

/// Options errors
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Invalid date bound: {0}")]
    InvalidBound(String),

    #[error("Invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A minimum or maximum date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateBound {
    /// Resolved through the clock at every validation
    Now,
    At(NaiveDateTime),
}

impl DateBound {
    pub fn resolve(&self, clock: &dyn Clock) -> NaiveDateTime {
        self.resolve_at(clock.now())
    }

    pub fn resolve_at(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            DateBound::Now => now,
            DateBound::At(date) => *date,
        }
    }

    /// Accepts `$NOW`, `YYYY-MM-DDTHH:MM:SS[.fff]` or a bare `YYYY-MM-DD`
    pub fn parse(raw: &str) -> Result<Self, OptionsError> {
        let raw = raw.trim();
        if raw == NOW_SENTINEL {
            return Ok(DateBound::Now);
        }
        if let Ok(date) = raw.parse::<NaiveDateTime>() {
            return Ok(DateBound::At(date));
        }
        raw.parse::<NaiveDate>()
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(DateBound::At)
            .ok_or_else(|| OptionsError::InvalidBound(raw.to_string()))
    }
}

impl From<NaiveDateTime> for DateBound {
    fn from(date: NaiveDateTime) -> Self {
        DateBound::At(date)
    }
}

impl TryFrom<String> for DateBound {
    type Error = OptionsError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        DateBound::parse(&raw)
    }
}

impl From<DateBound> for String {
    fn from(bound: DateBound) -> Self {
        match bound {
            DateBound::Now => NOW_SENTINEL.to_string(),
            DateBound::At(date) => date.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        }
    }
}

/// Manager options
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimescapeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_date: Option<DateBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<DateBound>,
    pub hour12: bool,
    pub digits: DigitWidth,
    /// Stepping cycles within the unit instead of carrying
    pub wrap_around: bool,
    /// Stepping lands on multiples of the step hint
    pub snap_to_step: bool,
    pub wheel_control: bool,
    /// Every segment always holds a value
    pub disallow_partial: bool,
}

impl TimescapeOptions {
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, OptionsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn with_min_date(mut self, bound: impl Into<DateBound>) -> Self {
        self.min_date = Some(bound.into());
        self
    }

    pub fn with_max_date(mut self, bound: impl Into<DateBound>) -> Self {
        self.max_date = Some(bound.into());
        self
    }

    pub fn with_hour12(mut self, hour12: bool) -> Self {
        self.hour12 = hour12;
        self
    }

    pub fn with_digits(mut self, digits: DigitWidth) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_wrap_around(mut self, wrap_around: bool) -> Self {
        self.wrap_around = wrap_around;
        self
    }

    pub fn with_snap_to_step(mut self, snap_to_step: bool) -> Self {
        self.snap_to_step = snap_to_step;
        self
    }

    pub fn with_wheel_control(mut self, wheel_control: bool) -> Self {
        self.wheel_control = wheel_control;
        self
    }

    pub fn with_disallow_partial(mut self, disallow_partial: bool) -> Self {
        self.disallow_partial = disallow_partial;
        self
    }
}
