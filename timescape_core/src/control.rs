//! Host control contracts
//!
//! The manager never owns a widget toolkit. Hosts hand it objects implementing
//! these traits and forward their native events to the manager's `handle_*`
//! methods. Getters (`value`, `placeholder`, `step`, `tree_position`,
//! `attribute`) must not call back into the manager.

use date_units::DateUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Host-assigned identity of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlId(u64);

impl ControlId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Control({})", self.0)
    }
}

/// Accessibility and behaviour attributes the manager writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    Role,
    Label,
    ValueNow,
    ValueMin,
    ValueMax,
    Selected,
    TabIndex,
    InputMode,
    EnterKeyHint,
    /// Instance id of the manager owning a root
    Instance,
}

impl Attribute {
    /// Conventional markup name
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Role => "role",
            Attribute::Label => "aria-label",
            Attribute::ValueNow => "aria-valuenow",
            Attribute::ValueMin => "aria-valuemin",
            Attribute::ValueMax => "aria-valuemax",
            Attribute::Selected => "aria-selected",
            Attribute::TabIndex => "tabindex",
            Attribute::InputMode => "inputmode",
            Attribute::EnterKeyHint => "enterkeyhint",
            Attribute::Instance => "data-timescape-instance",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One editable segment
pub trait SegmentControl {
    fn id(&self) -> ControlId;

    /// Text currently displayed
    fn value(&self) -> String;

    fn set_value(&self, value: &str);

    /// Step hint for arrow keys; `None` or non-positive means 1
    fn step(&self) -> Option<i64> {
        None
    }

    fn placeholder(&self) -> Option<String> {
        None
    }

    fn set_placeholder(&self, _placeholder: &str) {}

    fn set_attribute(&self, attribute: Attribute, value: &str);

    fn remove_attribute(&self, attribute: Attribute);

    /// Read-only controls suppress the native on-screen keyboard
    fn set_read_only(&self, _read_only: bool) {}

    /// Width in host units, as measured by the segment's measurement control
    fn set_width(&self, _width: f64) {}

    /// Moves native focus to the control.
    ///
    /// Hosts may report the resulting focus event through
    /// `TimescapeManager::handle_focus` synchronously; the manager tolerates it.
    fn focus(&self);

    /// Position in the host's traversal order
    fn tree_position(&self) -> usize;
}

/// Container grouping the segments of one manager
pub trait RootControl {
    fn id(&self) -> ControlId;

    fn attribute(&self, attribute: Attribute) -> Option<String>;

    fn set_attribute(&self, attribute: Attribute, value: &str);
}

/// Hidden element mirroring a segment's text so the host can size it
pub trait MeasurementControl {
    fn set_text(&self, text: &str);

    /// Copies typography from the measured segment
    fn copy_style_from(&self, _control: &dyn SegmentControl) {}

    fn detach(&self);
}

/// Creates measurement controls on registration
pub trait MeasurementFactory {
    fn create(
        &self,
        unit: DateUnit,
        control: &dyn SegmentControl,
    ) -> Option<Rc<dyn MeasurementControl>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id() {
        let id = ControlId::new(7);
        assert_eq!(id.as_u64(), 7);
        assert_eq!(id.to_string(), "Control(7)");
        assert!(ControlId::new(1) < ControlId::new(2));
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(Attribute::Label.as_str(), "aria-label");
        assert_eq!(Attribute::ValueMax.to_string(), "aria-valuemax");
        assert_eq!(Attribute::Instance.as_str(), "data-timescape-instance");
    }
}
