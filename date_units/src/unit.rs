//! Units, display widths and half-days

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One editable component of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Meridiem,
}

impl DateUnit {
    /// All units, largest first
    pub const ALL: [DateUnit; 8] = [
        DateUnit::Years,
        DateUnit::Months,
        DateUnit::Days,
        DateUnit::Hours,
        DateUnit::Minutes,
        DateUnit::Seconds,
        DateUnit::Milliseconds,
        DateUnit::Meridiem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateUnit::Years => "years",
            DateUnit::Months => "months",
            DateUnit::Days => "days",
            DateUnit::Hours => "hours",
            DateUnit::Minutes => "minutes",
            DateUnit::Seconds => "seconds",
            DateUnit::Milliseconds => "milliseconds",
            DateUnit::Meridiem => "meridiem",
        }
    }

    /// Placeholder shown while the segment holds no value
    pub fn placeholder(&self) -> &'static str {
        match self {
            DateUnit::Years => "yyyy",
            DateUnit::Months => "mm",
            DateUnit::Days => "dd",
            DateUnit::Hours | DateUnit::Minutes | DateUnit::Seconds => "--",
            DateUnit::Milliseconds => "---",
            DateUnit::Meridiem => "am",
        }
    }

    /// Whether the segment is edited by typing digits
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DateUnit::Meridiem)
    }
}

impl fmt::Display for DateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display width for months, days and hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DigitWidth {
    /// Always two digits ("07")
    #[default]
    #[serde(rename = "2-digit")]
    TwoDigit,
    /// As few digits as needed ("7")
    #[serde(rename = "numeric")]
    Numeric,
}

impl DigitWidth {
    pub fn width(&self) -> usize {
        match self {
            DigitWidth::TwoDigit => 2,
            DigitWidth::Numeric => 1,
        }
    }
}

/// Half of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// The half-day `date` falls in
    pub fn of(date: NaiveDateTime) -> Self {
        if date.hour() < 12 {
            Meridiem::Am
        } else {
            Meridiem::Pm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
