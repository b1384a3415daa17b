//! Injected host capabilities: clock, input mode and measurement

use crate::control::MeasurementFactory;
use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Source of "now" for `$NOW` bounds and the fallback working date
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: TimeDelta) {
        if let Some(next) = self.now.get().checked_add_signed(delta) {
            self.now.set(next);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// Primary input modality of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputMode {
    #[default]
    Keyboard,
    /// Touch devices keep segments writable so the on-screen keyboard opens
    Touch,
}

pub trait InputModeDetector {
    fn detect(&self) -> InputMode;
}

impl InputModeDetector for InputMode {
    fn detect(&self) -> InputMode {
        *self
    }
}

/// Everything the manager needs from the outside world
#[derive(Clone)]
pub struct Environment {
    pub clock: Rc<dyn Clock>,
    pub input_mode: Rc<dyn InputModeDetector>,
    pub measurement: Option<Rc<dyn MeasurementFactory>>,
}

impl Environment {
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_input_mode(mut self, input_mode: Rc<dyn InputModeDetector>) -> Self {
        self.input_mode = input_mode;
        self
    }

    pub fn with_measurement(mut self, factory: Rc<dyn MeasurementFactory>) -> Self {
        self.measurement = Some(factory);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            clock: Rc::new(SystemClock),
            input_mode: Rc::new(InputMode::Keyboard),
            measurement: None,
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("input_mode", &self.input_mode.detect())
            .field("measurement", &self.measurement.is_some())
            .finish_non_exhaustive()
    }
}
