//! Serializable view of a manager's state

use chrono::NaiveDateTime;
use date_units::DateUnit;
use serde::{Deserialize, Serialize};

/// One segment as the user sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub unit: DateUnit,
    /// Display text the control should hold
    pub value: String,
    pub pending: String,
    pub is_unset: bool,
}

/// Point-in-time manager state, for hosts that persist or inspect it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub timestamp: Option<NaiveDateTime>,
    pub previous_timestamp: Option<NaiveDateTime>,
    pub range_min: Option<NaiveDateTime>,
    pub range_max: Option<NaiveDateTime>,
    pub completed: bool,
    pub cursor_position: usize,
    pub active: Option<DateUnit>,
    pub segments: Vec<SegmentSnapshot>,
}

impl ManagerSnapshot {
    pub fn segment(&self, unit: DateUnit) -> Option<&SegmentSnapshot> {
        self.segments.iter().find(|s| s.unit == unit)
    }
}
