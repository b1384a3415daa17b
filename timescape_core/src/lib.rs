//! # Timescape Core
//!
//! Headless state machine behind segmented date/time inputs.
//!
//! ## Philosophy
//!
//! - **Headless**: Hosts own the widgets; the core talks to them through traits
//! - **Deterministic**: Clock and input mode are injected, never ambient
//! - **Re-entrant**: Listeners may call back into the manager that notified them
//! - **Mechanism over policy**: The core edits dates, hosts decide rendering
//!
//! ## Design
//!
//! The core provides:
//! - TimescapeManager: Segment registry, key protocol and commit protocol
//! - EventBus: `ChangeDate` / `FocusWrap` notifications with explicit propagation
//! - marry: Couples two managers into an ordered range
//! - ManagerSnapshot: Serializable state for inspection and parity testing

pub mod action;
pub mod control;
pub mod environment;
pub mod ids;
pub mod manager;
pub mod options;
pub mod pubsub;
pub mod range;
pub mod registry;
pub mod snapshot;

pub use action::{SegmentAction, StepDirection};
pub use control::{
    Attribute, ControlId, MeasurementControl, MeasurementFactory, RootControl, SegmentControl,
};
pub use environment::{Clock, Environment, FixedClock, InputMode, InputModeDetector, SystemClock};
pub use ids::InstanceId;
pub use manager::{FrameTask, KeyDisposition, TimescapeManager, WeakManager};
pub use options::{DateBound, OptionsError, TimescapeOptions, NOW_SENTINEL};
pub use pubsub::{EventBus, EventKind, Propagation, Subscription, TimescapeEvent, WrapDirection};
pub use range::{marry, RangeError};
pub use snapshot::{ManagerSnapshot, SegmentSnapshot};

pub use date_units::{DateUnit, DigitWidth, Meridiem};
