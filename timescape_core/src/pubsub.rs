//! Per-instance publish/subscribe keyed by event kind
//!
//! Listeners return a [`Propagation`]; the first `Stop` ends delivery of that
//! emission. Emission iterates over a snapshot of the listener list and holds
//! no borrow while a listener runs, so listeners may subscribe, unsubscribe
//! or call back into whatever owns the bus.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Names of the events a manager emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    ChangeDate,
    FocusWrap,
}

/// Which end of the segment list focus wrapped past
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapDirection {
    /// Moved backwards past the first segment
    Backward,
    /// Moved forwards past the last segment
    Forward,
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimescapeEvent {
    /// The committed date changed (`None` when cleared)
    ChangeDate(Option<NaiveDateTime>),
    /// Keyboard navigation wrapped around the segment list
    FocusWrap(WrapDirection),
}

impl TimescapeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TimescapeEvent::ChangeDate(_) => EventKind::ChangeDate,
            TimescapeEvent::FocusWrap(_) => EventKind::FocusWrap,
        }
    }
}

/// Listener verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Deliver to the remaining listeners
    #[default]
    Continue,
    /// Halt delivery of this emission
    Stop,
}

type Listener = Rc<dyn Fn(&TimescapeEvent) -> Propagation>;

#[derive(Default)]
struct BusInner {
    listeners: RefCell<BTreeMap<EventKind, Vec<(u64, Listener)>>>,
    next_id: Cell<u64>,
}

/// Event bus owned by one manager
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to events of `kind`
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&TimescapeEvent) -> Propagation + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        self.inner
            .listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(callback)));

        Subscription {
            bus: Rc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Delivers `event` in subscription order until a listener stops it
    pub fn emit(&self, event: &TimescapeEvent) -> Propagation {
        let snapshot: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .get(&event.kind())
            .map(|listeners| listeners.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default();

        for listener in snapshot {
            if listener(event) == Propagation::Stop {
                return Propagation::Stop;
            }
        }
        Propagation::Continue
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(&kind)
            .map_or(0, |listeners| listeners.len())
    }

    /// Drops every listener
    pub fn clear(&self) {
        self.inner.listeners.borrow_mut().clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("change_date", &self.listener_count(EventKind::ChangeDate))
            .field("focus_wrap", &self.listener_count(EventKind::FocusWrap))
            .finish()
    }
}

/// Handle returned by [`EventBus::on`]
///
/// Dropping it keeps the listener alive; call [`Subscription::unsubscribe`]
/// to remove it. Unsubscribing twice, or after the bus is gone, is a no-op.
#[derive(Debug, Clone)]
pub struct Subscription {
    bus: Weak<BusInner>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn unsubscribe(&self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut listeners = bus.listeners.borrow_mut();
        if let Some(list) = listeners.get_mut(&self.kind) {
            list.retain(|(id, _)| *id != self.id);
        }
    }
}
