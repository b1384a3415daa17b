//! Unique identifiers for manager instances

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a manager
///
/// Written to the root control so a second manager sharing the same root
/// does not take it over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a new random instance ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an instance ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Value stored in the root's instance attribute
    pub fn attribute_value(&self) -> String {
        self.0.to_string()
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timescape({})", self.0)
    }
}
