//! The segment editing state machine
//!
//! A [`TimescapeManager`] owns the composite date and drives every registered
//! segment control. Hosts forward native events to the `handle_*` methods and
//! act on the returned [`KeyDisposition`].
//!
//! Internal state lives behind a `RefCell`. No borrow is held while host code
//! or listeners run, so both may call back into the manager.

use crate::action::{SegmentAction, StepDirection};
use crate::control::{Attribute, ControlId, MeasurementControl, RootControl, SegmentControl};
use crate::environment::{Environment, InputMode};
use crate::ids::InstanceId;
use crate::options::{DateBound, TimescapeOptions};
use crate::pubsub::{
    EventBus, EventKind, Propagation, Subscription, TimescapeEvent, WrapDirection,
};
use crate::registry::{Registry, RegistryEntry};
use crate::snapshot::{ManagerSnapshot, SegmentSnapshot};
use chrono::{NaiveDateTime, Timelike};
use date_units::{DateUnit, DigitWidth, Meridiem};
use segment_input::{InputEvent, KeyEvent, WheelEvent};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// What the host should do with a native event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The manager acted on it; suppress the default
    Handled,
    /// Let the host perform its default behaviour
    Native,
}

/// Work deferred until the host's next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTask {
    Autofocus(DateUnit),
    CopyStyle(DateUnit),
}

struct RootBinding {
    control: Rc<dyn RootControl>,
    owned: bool,
}

struct ManagerState {
    timestamp: Option<NaiveDateTime>,
    previous_timestamp: Option<NaiveDateTime>,
    options: TimescapeOptions,
    range_min: Option<NaiveDateTime>,
    range_max: Option<NaiveDateTime>,
    cursor_position: usize,
    active: Option<DateUnit>,
    root: Option<RootBinding>,
    registry: Registry,
    frame_tasks: Vec<FrameTask>,
}

impl ManagerState {
    fn is_completed(&self) -> bool {
        self.options.disallow_partial || self.registry.all_committed()
    }

    /// Date edits apply to
    fn working_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.timestamp.or(self.previous_timestamp).unwrap_or(now)
    }

    fn bounds(&self, now: NaiveDateTime) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let min = self.options.min_date.map(|b| b.resolve_at(now));
        let max = self.options.max_date.map(|b| b.resolve_at(now));

        let lower = match (min, self.range_min) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let upper = match (max, self.range_max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        (lower, upper)
    }

    fn clamp(&self, date: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
        match self.bounds(now) {
            (Some(lower), _) if date < lower => lower,
            (_, Some(upper)) if date > upper => upper,
            _ => date,
        }
    }

    fn display_value(&self, entry: &RegistryEntry) -> String {
        if entry.is_unset {
            return String::new();
        }
        if !entry.pending.is_empty() {
            let width = match entry.unit {
                DateUnit::Years => 4,
                DateUnit::Milliseconds => 3,
                DateUnit::Minutes | DateUnit::Seconds => 2,
                _ => self.options.digits.width(),
            };
            return format!("{:0>width$}", entry.pending, width = width);
        }
        match self.timestamp.or(self.previous_timestamp) {
            Some(date) => {
                date_units::format(date, entry.unit, self.options.hour12, self.options.digits)
            }
            None => String::new(),
        }
    }

    fn value_max(&self, unit: DateUnit, now: NaiveDateTime) -> i64 {
        match unit {
            DateUnit::Days => date_units::days_in_month(self.working_date(now)) as i64,
            DateUnit::Months => 12,
            DateUnit::Years => 9999,
            DateUnit::Hours => 23,
            DateUnit::Minutes | DateUnit::Seconds => 59,
            DateUnit::Milliseconds => 999,
            DateUnit::Meridiem => 1,
        }
    }
}

struct ManagerInner {
    id: InstanceId,
    state: RefCell<ManagerState>,
    events: EventBus,
    environment: Environment,
    married: Cell<bool>,
}

/// Handle to a segmented date editor
///
/// Clones share the same manager.
#[derive(Clone)]
pub struct TimescapeManager {
    inner: Rc<ManagerInner>,
}

/// Non-owning handle, used by listeners to avoid reference cycles
#[derive(Clone)]
pub struct WeakManager {
    inner: Weak<ManagerInner>,
}

impl WeakManager {
    pub fn upgrade(&self) -> Option<TimescapeManager> {
        self.inner.upgrade().map(|inner| TimescapeManager { inner })
    }
}

impl TimescapeManager {
    pub fn new(initial: Option<NaiveDateTime>, options: TimescapeOptions) -> Self {
        Self::with_environment(initial, options, Environment::default())
    }

    pub fn with_environment(
        initial: Option<NaiveDateTime>,
        options: TimescapeOptions,
        environment: Environment,
    ) -> Self {
        let id = InstanceId::new();
        debug!(instance = %id, ?initial, "manager created");
        let seed_now = initial.is_none() && options.disallow_partial;

        let manager = Self {
            inner: Rc::new(ManagerInner {
                id,
                state: RefCell::new(ManagerState {
                    timestamp: initial,
                    previous_timestamp: None,
                    options,
                    range_min: None,
                    range_max: None,
                    cursor_position: 0,
                    active: None,
                    root: None,
                    registry: Registry::new(),
                    frame_tasks: Vec::new(),
                }),
                events: EventBus::new(),
                environment,
                married: Cell::new(false),
            }),
        };

        // Bounds apply to the initial value as well
        if let Some(date) = initial {
            manager.commit(Some(date));
        } else if seed_now {
            manager.commit(Some(manager.now()));
        }
        manager
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakManager {
        WeakManager {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True when both handles refer to the same manager
    pub fn ptr_eq(&self, other: &TimescapeManager) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_married(&self) -> bool {
        self.inner.married.get()
    }

    pub(crate) fn mark_married(&self) {
        self.inner.married.set(true);
    }

    fn state(&self) -> Ref<'_, ManagerState> {
        self.inner.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, ManagerState> {
        self.inner.state.borrow_mut()
    }

    fn now(&self) -> NaiveDateTime {
        self.inner.environment.now()
    }

    // ---- Date ----

    /// The committed date, or `None` while any segment is unset
    pub fn date(&self) -> Option<NaiveDateTime> {
        let state = self.state();
        state.timestamp.filter(|_| state.is_completed())
    }

    pub fn set_date(&self, date: Option<NaiveDateTime>) {
        {
            let mut state = self.state_mut();
            if date.is_none() && state.options.disallow_partial {
                debug!(instance = %self.inner.id, "clearing ignored, partial dates are disallowed");
                return;
            }
            let unset = date.is_none();
            for entry in state.registry.iter_mut() {
                entry.is_unset = unset;
                entry.pending.clear();
            }
            state.cursor_position = 0;
            state.previous_timestamp = None;
        }
        self.commit(date);
        self.sync_all();
    }

    /// Every registered segment holds a value
    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }

    /// Validates and stores `date`, emitting `ChangeDate` when complete
    fn commit(&self, date: Option<NaiveDateTime>) {
        let Some(date) = date else {
            self.state_mut().timestamp = None;
            debug!(instance = %self.inner.id, "date cleared");
            self.inner.events.emit(&TimescapeEvent::ChangeDate(None));
            return;
        };

        let now = self.now();
        let committed = {
            let mut state = self.state_mut();
            let validated = state.clamp(date, now);
            let completed = state.is_completed();

            if let Some(current) = state.timestamp {
                let same = date_units::is_same_seconds(
                    date_units::timestamp_millis(validated),
                    date_units::timestamp_millis(current),
                );
                if same && !completed {
                    return;
                }
            }

            state.timestamp = Some(validated);
            state.previous_timestamp = None;
            completed.then_some(validated)
        };

        if let Some(date) = committed {
            debug!(instance = %self.inner.id, timestamp = %date, "date committed");
            self.inner.events.emit(&TimescapeEvent::ChangeDate(Some(date)));
        }
    }

    /// Commits `date` unless validation leaves the timestamp where it is.
    ///
    /// Returns whether anything was committed.
    pub(crate) fn force_date(&self, date: NaiveDateTime) -> bool {
        let now = self.now();
        let unchanged = {
            let state = self.state();
            state.timestamp == Some(state.clamp(date, now))
        };
        if unchanged {
            return false;
        }
        self.commit(Some(date));
        self.sync_all();
        true
    }

    // ---- Options ----

    pub fn options(&self) -> TimescapeOptions {
        self.state().options.clone()
    }

    pub fn set_min_date(&self, bound: Option<DateBound>) {
        self.state_mut().options.min_date = bound;
        self.revalidate();
    }

    pub fn set_max_date(&self, bound: Option<DateBound>) {
        self.state_mut().options.max_date = bound;
        self.revalidate();
    }

    pub fn set_hour12(&self, hour12: bool) {
        self.state_mut().options.hour12 = hour12;
        self.sync_all();
    }

    pub fn set_digits(&self, digits: DigitWidth) {
        self.state_mut().options.digits = digits;
        self.sync_all();
    }

    pub fn set_wheel_control(&self, wheel_control: bool) {
        let changed = {
            let mut state = self.state_mut();
            let changed = state.options.wheel_control != wheel_control;
            state.options.wheel_control = wheel_control;
            changed
        };
        if changed {
            self.resync();
        }
    }

    pub fn set_disallow_partial(&self, disallow_partial: bool) {
        let (changed, empty) = {
            let mut state = self.state_mut();
            let changed = state.options.disallow_partial != disallow_partial;
            state.options.disallow_partial = disallow_partial;
            (changed, state.timestamp.is_none())
        };
        if !changed {
            return;
        }
        self.resync();
        if disallow_partial && empty {
            self.commit(Some(self.now()));
            self.sync_all();
        }
    }

    pub fn set_wrap_around(&self, wrap_around: bool) {
        self.state_mut().options.wrap_around = wrap_around;
    }

    pub fn set_snap_to_step(&self, snap_to_step: bool) {
        self.state_mut().options.snap_to_step = snap_to_step;
    }

    /// Applies every option through its setter
    pub fn apply_options(&self, options: TimescapeOptions) {
        self.set_wrap_around(options.wrap_around);
        self.set_snap_to_step(options.snap_to_step);
        self.set_hour12(options.hour12);
        self.set_digits(options.digits);
        self.set_wheel_control(options.wheel_control);
        self.set_disallow_partial(options.disallow_partial);
        self.set_min_date(options.min_date);
        self.set_max_date(options.max_date);
    }

    fn revalidate(&self) {
        let current = self.state().timestamp;
        if let Some(date) = current {
            self.commit(Some(date));
            self.sync_all();
        }
    }

    // ---- Range bounds ----

    /// Range bounds set by a married sibling
    pub fn range_bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let state = self.state();
        (state.range_min, state.range_max)
    }

    pub(crate) fn set_range_min(&self, bound: Option<NaiveDateTime>) {
        self.update_range_bound(bound, |state| &mut state.range_min);
    }

    pub(crate) fn set_range_max(&self, bound: Option<NaiveDateTime>) {
        self.update_range_bound(bound, |state| &mut state.range_max);
    }

    fn update_range_bound(
        &self,
        bound: Option<NaiveDateTime>,
        slot: impl FnOnce(&mut ManagerState) -> &mut Option<NaiveDateTime>,
    ) {
        let now = self.now();
        let moved = {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            let target = slot(state);
            if *target == bound {
                return;
            }
            *target = bound;
            state.timestamp.and_then(|current| {
                let clamped = state.clamp(current, now);
                (clamped != current).then_some(clamped)
            })
        };

        if let Some(date) = moved {
            trace!(instance = %self.inner.id, timestamp = %date, "range bound moved the date");
            self.commit(Some(date));
            self.sync_all();
        }
    }

    // ---- Events ----

    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&TimescapeEvent) -> Propagation + 'static,
    {
        self.inner.events.on(kind, callback)
    }

    pub fn on_change_date<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<NaiveDateTime>) -> Propagation + 'static,
    {
        self.on(EventKind::ChangeDate, move |event| match event {
            TimescapeEvent::ChangeDate(date) => callback(*date),
            _ => Propagation::Continue,
        })
    }

    pub fn on_focus_wrap<F>(&self, callback: F) -> Subscription
    where
        F: Fn(WrapDirection) -> Propagation + 'static,
    {
        self.on(EventKind::FocusWrap, move |event| match event {
            TimescapeEvent::FocusWrap(direction) => callback(*direction),
            _ => Propagation::Continue,
        })
    }

    // ---- Registration ----

    /// Binds the container that groups this manager's segments
    pub fn register_root(&self, root: Rc<dyn RootControl>) {
        root.set_attribute(Attribute::TabIndex, "-1");
        root.set_attribute(Attribute::Role, "group");

        let id = self.inner.id.attribute_value();
        let owned = match root.attribute(Attribute::Instance) {
            Some(owner) if !owner.is_empty() && owner != id => false,
            _ => {
                root.set_attribute(Attribute::Instance, &id);
                true
            }
        };
        if !owned {
            debug!(instance = %self.inner.id, root = %root.id(), "root owned by another manager");
        }

        self.state_mut().root = Some(RootBinding {
            control: root,
            owned,
        });
    }

    /// Focus landed on the root: forward it to a segment
    pub fn handle_root_focus(&self) {
        let (owned, active) = {
            let state = self.state();
            (state.root.as_ref().is_some_and(|r| r.owned), state.active)
        };
        if !owned {
            return;
        }
        match active {
            Some(unit) => self.focus_segment(unit),
            None => self.focus_field(0),
        }
    }

    /// Registers `control` as the segment for `unit`.
    ///
    /// Returns `None` without side effects when the control is already bound
    /// to `unit` and `redomount` is false.
    pub fn register_element(
        &self,
        control: Rc<dyn SegmentControl>,
        unit: DateUnit,
        autofocus: bool,
        redomount: bool,
    ) -> Option<Rc<dyn SegmentControl>> {
        let bound = self.state().registry.get(unit).map(|e| e.control.id());
        if !redomount && bound == Some(control.id()) {
            trace!(instance = %self.inner.id, %unit, "segment already registered");
            return None;
        }

        let touch = self.inner.environment.input_mode.detect() == InputMode::Touch;
        control.set_read_only(!touch);
        control.set_attribute(Attribute::TabIndex, "0");
        control.set_attribute(Attribute::Role, "spinbutton");
        control.set_attribute(Attribute::EnterKeyHint, "next");
        if unit.is_numeric() {
            control.set_attribute(Attribute::InputMode, "numeric");
        }
        let placeholder = match control.placeholder() {
            Some(p) if !p.is_empty() => p,
            _ => {
                control.set_placeholder(unit.placeholder());
                unit.placeholder().to_string()
            }
        };

        let previous = self.state_mut().registry.remove(unit);
        let mut reused = None;
        if let Some(mut old) = previous {
            if redomount {
                reused = old.measurement.take();
            }
            old.release();
        }

        let created = reused.is_none();
        let measurement = reused.or_else(|| {
            self.inner
                .environment
                .measurement
                .as_ref()
                .and_then(|factory| factory.create(unit, &*control))
        });
        if let Some(measurement) = &measurement {
            let text = control.value();
            measurement.set_text(if text.is_empty() { &placeholder } else { &text });
        }

        let weak = self.downgrade();
        let handle = self.on_change_date(move |_| {
            if let Some(manager) = weak.upgrade() {
                manager.sync_segment(unit);
            }
            Propagation::Continue
        });

        {
            let mut state = self.state_mut();
            let is_unset = state.timestamp.is_none() && !state.options.disallow_partial;
            let copy_style = created && measurement.is_some();

            let mut entry = RegistryEntry::new(unit, Rc::clone(&control));
            entry.measurement = measurement;
            entry.is_unset = is_unset;
            entry.autofocus = autofocus;
            entry.handles.push(handle);

            state.registry.insert(entry);
            state.registry.sort_by_position();

            if copy_style {
                state.frame_tasks.push(FrameTask::CopyStyle(unit));
            }
            if autofocus {
                state.frame_tasks.push(FrameTask::Autofocus(unit));
            }
        }

        debug!(instance = %self.inner.id, %unit, control = %control.id(), redomount, "segment registered");
        self.sync_segment(unit);
        Some(control)
    }

    /// Releases the segment bound to `control`
    pub fn unregister_element(&self, control: ControlId) -> bool {
        let removed = {
            let mut state = self.state_mut();
            let removed = state.registry.remove_control(control);
            if let Some(entry) = &removed {
                if state.active == Some(entry.unit) {
                    state.active = None;
                }
            }
            removed
        };

        match removed {
            Some(entry) => {
                debug!(instance = %self.inner.id, unit = %entry.unit, %control, "segment unregistered");
                entry.release();
                true
            }
            None => false,
        }
    }

    /// The host's tree changed: `added` controls appeared, `removed` are gone
    pub fn handle_structure_change(&self, added: usize, removed: &[ControlId]) {
        if added > 0 {
            self.state_mut().registry.sort_by_position();
        }
        for control in removed {
            self.unregister_element(*control);
        }
    }

    /// Re-applies the root binding and re-registers every segment
    pub fn resync(&self) {
        let root = self
            .state()
            .root
            .as_ref()
            .map(|binding| Rc::clone(&binding.control));
        if let Some(root) = root {
            self.register_root(root);
        }

        let segments: Vec<(DateUnit, Rc<dyn SegmentControl>, bool)> = self
            .state()
            .registry
            .iter()
            .map(|e| (e.unit, Rc::clone(&e.control), e.autofocus))
            .collect();
        for (unit, control, autofocus) in segments {
            self.register_element(control, unit, autofocus, true);
        }
    }

    /// Tears the manager down; safe to call more than once
    pub fn remove(&self) {
        let entries = {
            let mut state = self.state_mut();
            state.root = None;
            state.active = None;
            state.frame_tasks.clear();
            state.registry.drain()
        };
        for entry in entries {
            entry.release();
        }
        self.inner.events.clear();
        debug!(instance = %self.inner.id, "manager removed");
    }

    // ---- Queries ----

    /// Units in traversal order
    pub fn segments(&self) -> Vec<DateUnit> {
        self.state().registry.units()
    }

    pub fn active_segment(&self) -> Option<DateUnit> {
        self.state().active
    }

    pub fn cursor_position(&self) -> usize {
        self.state().cursor_position
    }

    /// Text the segment for `unit` displays
    pub fn segment_value(&self, unit: DateUnit) -> Option<String> {
        let state = self.state();
        state.registry.get(unit).map(|e| state.display_value(e))
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let state = self.state();
        ManagerSnapshot {
            timestamp: state.timestamp,
            previous_timestamp: state.previous_timestamp,
            range_min: state.range_min,
            range_max: state.range_max,
            completed: state.is_completed(),
            cursor_position: state.cursor_position,
            active: state.active,
            segments: state
                .registry
                .iter()
                .map(|e| SegmentSnapshot {
                    unit: e.unit,
                    value: state.display_value(e),
                    pending: e.pending.clone(),
                    is_unset: e.is_unset,
                })
                .collect(),
        }
    }

    // ---- Focus ----

    /// Focuses the segment at `index`; negative indexes count from the end
    pub fn focus_field(&self, index: isize) {
        let unit = self.state().registry.at(index).map(|e| e.unit);
        if let Some(unit) = unit {
            self.focus_segment(unit);
        }
    }

    pub fn focus_segment(&self, unit: DateUnit) {
        let (previous, control) = {
            let state = self.state();
            (
                state.active,
                state.registry.get(unit).map(|e| Rc::clone(&e.control)),
            )
        };
        let Some(control) = control else {
            return;
        };
        if let Some(previous) = previous.filter(|p| *p != unit) {
            self.release_focus(previous);
        }
        control.focus();
        self.enter_segment(unit);
    }

    /// Drops focus from the active segment, committing pending digits
    pub fn blur(&self) {
        let active = self.state().active;
        if let Some(unit) = active {
            self.release_focus(unit);
        }
    }

    pub fn handle_focus(&self, control: ControlId) {
        let (unit, previous) = {
            let state = self.state();
            (state.registry.unit_of(control), state.active)
        };
        let Some(unit) = unit else {
            return;
        };
        if let Some(previous) = previous.filter(|p| *p != unit) {
            self.release_focus(previous);
        }
        self.enter_segment(unit);
    }

    pub fn handle_blur(&self, control: ControlId) {
        let unit = self.state().registry.unit_of(control);
        if let Some(unit) = unit {
            self.release_focus(unit);
        }
    }

    pub fn handle_click(&self, control: ControlId) {
        let unit = self.state().registry.unit_of(control);
        if let Some(unit) = unit {
            self.focus_segment(unit);
        }
    }

    fn enter_segment(&self, unit: DateUnit) {
        let control = {
            let mut state = self.state_mut();
            if state.active == Some(unit) {
                return;
            }
            state.active = Some(unit);
            state.cursor_position = 0;
            state.registry.get(unit).map(|e| Rc::clone(&e.control))
        };
        trace!(instance = %self.inner.id, %unit, "segment focused");
        if let Some(control) = control {
            control.set_attribute(Attribute::Selected, "true");
        }
    }

    fn release_focus(&self, unit: DateUnit) {
        self.commit_pending(unit);
        let control = {
            let mut state = self.state_mut();
            if state.active == Some(unit) {
                state.active = None;
            }
            state.registry.get(unit).map(|e| Rc::clone(&e.control))
        };
        if let Some(control) = control {
            control.remove_attribute(Attribute::Selected);
        }
    }

    /// Moves focus `offset` segments away from `unit`.
    ///
    /// With `wrap`, focus cycles and crossing either end emits `FocusWrap`.
    /// Returns whether a segment received focus.
    fn focus_next(&self, unit: DateUnit, offset: isize, wrap: bool) -> bool {
        let units = self.segments();
        let Some(index) = units.iter().position(|u| *u == unit) else {
            return false;
        };
        let len = units.len() as isize;
        let index = index as isize;
        let target = index + offset;

        let next = if wrap {
            Some(units[target.rem_euclid(len) as usize])
        } else if (0..len).contains(&target) {
            Some(units[target as usize])
        } else {
            None
        };

        if let Some(next) = next {
            self.focus_segment(next);
        }

        if wrap {
            let direction = if index == 0 && offset < 0 {
                Some(WrapDirection::Backward)
            } else if index == len - 1 && offset > 0 {
                Some(WrapDirection::Forward)
            } else {
                None
            };
            if let Some(direction) = direction {
                trace!(instance = %self.inner.id, ?direction, "focus wrapped");
                self.inner.events.emit(&TimescapeEvent::FocusWrap(direction));
            }
        }

        next.is_some()
    }

    // ---- Frames and measurement ----

    /// Runs the work queued for the next frame
    pub fn run_frame(&self) {
        let tasks = std::mem::take(&mut self.state_mut().frame_tasks);
        for task in tasks {
            match task {
                FrameTask::Autofocus(unit) => self.focus_segment(unit),
                FrameTask::CopyStyle(unit) => {
                    let pair = self.measured(unit);
                    if let Some((control, measurement)) = pair {
                        measurement.copy_style_from(&*control);
                    }
                }
            }
        }
    }

    pub fn pending_frame_tasks(&self) -> Vec<FrameTask> {
        self.state().frame_tasks.clone()
    }

    /// The host measured the text of `unit`'s measurement control
    pub fn handle_measured_width(&self, unit: DateUnit, width: f64) {
        if width <= 0.0 {
            return;
        }
        let control = self.state().registry.get(unit).map(|e| Rc::clone(&e.control));
        if let Some(control) = control {
            control.set_width(width);
        }
    }

    fn measured(
        &self,
        unit: DateUnit,
    ) -> Option<(Rc<dyn SegmentControl>, Rc<dyn MeasurementControl>)> {
        let state = self.state();
        let entry = state.registry.get(unit)?;
        let measurement = entry.measurement.as_ref()?;
        Some((Rc::clone(&entry.control), Rc::clone(measurement)))
    }

    // ---- Input ----

    pub fn handle_input(&self, control: ControlId, event: &InputEvent) -> KeyDisposition {
        match event {
            InputEvent::Key(key) => self.handle_key(control, key),
            InputEvent::Wheel(wheel) => self.handle_wheel(control, wheel),
        }
    }

    pub fn handle_key(&self, control: ControlId, event: &KeyEvent) -> KeyDisposition {
        let unit = self.state().registry.unit_of(control);
        let Some(unit) = unit else {
            return KeyDisposition::Native;
        };

        let action = SegmentAction::from_key(event, unit);
        trace!(instance = %self.inner.id, %unit, ?action, "key");

        match action {
            SegmentAction::Step(direction) => {
                self.step(unit, direction);
                KeyDisposition::Handled
            }
            SegmentAction::Advance(offset) => {
                self.focus_next(unit, offset, true);
                KeyDisposition::Handled
            }
            SegmentAction::Jump(index) => {
                self.focus_field(index);
                KeyDisposition::Handled
            }
            SegmentAction::Tab { backward } => {
                let offset = if backward { -1 } else { 1 };
                if self.focus_next(unit, offset, false) {
                    KeyDisposition::Handled
                } else {
                    KeyDisposition::Native
                }
            }
            SegmentAction::SetMeridiem(half) => {
                self.force_meridiem(unit, half);
                KeyDisposition::Handled
            }
            SegmentAction::Clear => self.clear_segment(unit),
            SegmentAction::Backspace => self.backspace(unit),
            SegmentAction::Digit(digit) => {
                self.type_digit(unit, digit);
                KeyDisposition::Handled
            }
            SegmentAction::PassThrough => KeyDisposition::Native,
        }
    }

    pub fn handle_wheel(&self, control: ControlId, event: &WheelEvent) -> KeyDisposition {
        let (unit, enabled) = {
            let state = self.state();
            (state.registry.unit_of(control), state.options.wheel_control)
        };
        let Some(unit) = unit.filter(|_| enabled) else {
            return KeyDisposition::Native;
        };
        if let Some(direction) = StepDirection::from_wheel(event.direction()) {
            self.step(unit, direction);
        }
        KeyDisposition::Handled
    }

    fn step(&self, unit: DateUnit, direction: StepDirection) {
        self.commit_pending(unit);

        let control = self.state().registry.get(unit).map(|e| Rc::clone(&e.control));
        let Some(control) = control else {
            return;
        };
        let configured = control.step().filter(|s| *s > 0).unwrap_or(1);

        let now = self.now();
        let (date, hint, options, completed) = {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            let date = state.working_date(now);
            let Some(entry) = state.registry.get_mut(unit) else {
                return;
            };
            let hint = if !state.options.disallow_partial && entry.is_unset {
                0
            } else {
                configured
            };
            entry.is_unset = false;
            (date, hint, state.options.clone(), state.is_completed())
        };

        if unit == DateUnit::Meridiem {
            let next = if hint == 0 {
                date
            } else {
                date_units::toggle_meridiem(date, None)
            };
            self.commit(Some(next));
            self.sync_segment(unit);
            return;
        }

        let amount = if options.snap_to_step && hint > 0 {
            snap_amount(date_units::get(date, unit), hint, direction)
        } else {
            hint * direction.sign()
        };
        let next = if options.wrap_around || !completed {
            cycle(date, unit, amount, options.hour12)
        } else {
            date_units::add(date, unit, amount)
        };

        trace!(instance = %self.inner.id, %unit, amount, "step");
        self.commit(Some(next));
        self.sync_all();
    }

    fn force_meridiem(&self, unit: DateUnit, half: Meridiem) {
        let now = self.now();
        let date = {
            let mut state = self.state_mut();
            if let Some(entry) = state.registry.get_mut(unit) {
                entry.is_unset = false;
            }
            state.working_date(now)
        };
        self.commit(Some(date_units::toggle_meridiem(date, Some(half))));
        self.sync_segment(unit);
    }

    fn clear_segment(&self, unit: DateUnit) -> KeyDisposition {
        {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            if state.options.disallow_partial {
                return KeyDisposition::Native;
            }
            if let Some(entry) = state.registry.get_mut(unit) {
                entry.is_unset = true;
                entry.pending.clear();
            }
            if let Some(current) = state.timestamp {
                state.previous_timestamp = Some(current);
            }
        }
        self.commit(None);
        self.sync_segment(unit);
        KeyDisposition::Handled
    }

    fn backspace(&self, unit: DateUnit) -> KeyDisposition {
        let control = self.state().registry.get(unit).map(|e| Rc::clone(&e.control));
        let Some(control) = control else {
            return KeyDisposition::Native;
        };
        let shown = control.value();

        let emptied = {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            if state.options.disallow_partial {
                return KeyDisposition::Native;
            }
            let Some(entry) = state.registry.get_mut(unit) else {
                return KeyDisposition::Native;
            };

            let mut digits = if entry.pending.is_empty() {
                shown
            } else {
                entry.pending.clone()
            };
            digits.pop();
            entry.pending = digits.trim_start_matches('0').to_string();

            let emptied = entry.pending.is_empty();
            if emptied {
                entry.is_unset = true;
            }
            state.cursor_position = entry.pending.len();
            if emptied {
                if let Some(current) = state.timestamp {
                    state.previous_timestamp = Some(current);
                }
            }
            emptied
        };

        if emptied {
            self.commit(None);
        }
        self.sync_segment(unit);
        KeyDisposition::Handled
    }

    fn type_digit(&self, unit: DateUnit, digit: u8) {
        let now = self.now();
        let (cursor, pending, date, hour12) = {
            let state = self.state();
            let Some(entry) = state.registry.get(unit) else {
                return;
            };
            (
                state.cursor_position,
                entry.pending.clone(),
                state.working_date(now),
                state.options.hour12,
            )
        };

        let d = digit as i64;
        let typed = format!("{pending}{digit}");
        let combined: i64 = typed.parse().unwrap_or(d);

        match unit {
            DateUnit::Days => {
                if cursor == 0 && d <= 3 {
                    self.hold_digit(unit, typed, 1);
                } else {
                    let value = if cursor == 0 { d } else { combined };
                    let max = date_units::days_in_month(date) as i64;
                    self.finish_segment(unit, value.clamp(1, max));
                }
            }
            DateUnit::Months => {
                if cursor == 0 && d <= 1 {
                    self.hold_digit(unit, typed, 1);
                } else {
                    let value = if cursor == 0 { d } else { combined };
                    self.finish_segment(unit, value.clamp(1, 12) - 1);
                }
            }
            DateUnit::Years => {
                let count = cursor + 1;
                if count >= 4 {
                    self.finish_segment(unit, combined);
                } else {
                    self.hold_digit(unit, typed, count);
                }
            }
            DateUnit::Hours => {
                let is_pm = date.hour() >= 12;
                let first_max = if hour12 { 1 } else { 2 };
                if cursor == 0 && d <= first_max {
                    self.hold_digit(unit, typed, 1);
                    return;
                }

                let mut value = if cursor == 0 {
                    if hour12 && is_pm {
                        d + 12
                    } else {
                        d
                    }
                } else {
                    let max = if hour12 { 12 } else { 23 };
                    if combined > max {
                        d
                    } else {
                        combined
                    }
                };
                if hour12 && cursor > 0 {
                    let half = if is_pm { Meridiem::Pm } else { Meridiem::Am };
                    let set = date_units::set(date, DateUnit::Hours, value);
                    value = date_units::toggle_meridiem(set, Some(half)).hour() as i64;
                }
                self.finish_segment(unit, value);
            }
            DateUnit::Minutes | DateUnit::Seconds => {
                if cursor == 0 && d <= 5 {
                    self.hold_digit(unit, typed, 1);
                } else {
                    let value = if cursor == 0 { d } else { combined };
                    self.finish_segment(unit, value.min(59));
                }
            }
            DateUnit::Milliseconds => {
                let count = cursor + 1;
                if count >= 3 {
                    self.finish_segment(unit, combined);
                } else {
                    self.hold_digit(unit, typed, count);
                }
            }
            DateUnit::Meridiem => {}
        }
    }

    /// Stores typed digits without committing
    fn hold_digit(&self, unit: DateUnit, pending: String, cursor: usize) {
        {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            if let Some(entry) = state.registry.get_mut(unit) {
                entry.pending = pending;
                entry.is_unset = false;
            }
            state.cursor_position = cursor;
        }
        self.sync_segment(unit);
    }

    /// Commits `value` for `unit` and moves on to the next segment
    fn finish_segment(&self, unit: DateUnit, value: i64) {
        let now = self.now();
        let next = {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            let next = date_units::set(state.working_date(now), unit, value);
            if let Some(entry) = state.registry.get_mut(unit) {
                entry.pending.clear();
                entry.is_unset = false;
            }
            state.cursor_position = 0;
            next
        };
        self.commit(Some(next));
        self.sync_segment(unit);
        self.focus_next(unit, 1, false);
    }

    /// Commits digits still pending in `unit`
    fn commit_pending(&self, unit: DateUnit) {
        let now = self.now();
        let next = {
            let mut guard = self.state_mut();
            let state = &mut *guard;
            let date = state.working_date(now);
            let Some(entry) = state.registry.get_mut(unit) else {
                return;
            };
            if entry.pending.is_empty() {
                return;
            }
            let value: i64 = entry.pending.parse().unwrap_or(0);
            entry.pending.clear();
            state.cursor_position = 0;

            let value = if unit == DateUnit::Months { value - 1 } else { value };
            date_units::set(date, unit, value)
        };
        self.commit(Some(next));
        self.sync_segment(unit);
    }

    // ---- Sync ----

    fn sync_all(&self) {
        for unit in self.segments() {
            self.sync_segment(unit);
        }
    }

    /// Writes the display value and accessibility attributes to the control
    fn sync_segment(&self, unit: DateUnit) {
        let now = self.now();
        let update = {
            let state = self.state();
            let Some(entry) = state.registry.get(unit) else {
                return;
            };
            (
                Rc::clone(&entry.control),
                entry.measurement.clone(),
                state.display_value(entry),
                state.value_max(unit, now),
            )
        };
        let (control, measurement, value, max) = update;

        if control.value() == value {
            return;
        }
        control.set_value(&value);
        control.set_attribute(Attribute::Label, unit.as_str());

        if unit.is_numeric() {
            let value_now = value.strip_prefix('0').unwrap_or(&value);
            let min = match unit {
                DateUnit::Days | DateUnit::Months | DateUnit::Years => "1",
                _ => "0",
            };
            control.set_attribute(Attribute::ValueNow, value_now);
            control.set_attribute(Attribute::ValueMin, min);
            control.set_attribute(Attribute::ValueMax, &max.to_string());
        }

        if let Some(measurement) = measurement {
            if value.is_empty() {
                let placeholder = control
                    .placeholder()
                    .unwrap_or_else(|| unit.placeholder().to_string());
                measurement.set_text(&placeholder);
            } else {
                measurement.set_text(&value);
            }
        }
    }
}

impl fmt::Debug for TimescapeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("TimescapeManager")
            .field("id", &self.inner.id)
            .field("timestamp", &state.timestamp)
            .field("active", &state.active)
            .field("segments", &state.registry.units())
            .finish_non_exhaustive()
    }
}

/// Distance to the next (or previous) multiple of `step`
fn snap_amount(value: i64, step: i64, direction: StepDirection) -> i64 {
    match direction {
        StepDirection::Up => -(-(value + 1)).div_euclid(step) * step - value,
        StepDirection::Down => (value - 1).div_euclid(step) * step - value,
    }
}

/// Moves `unit` by `amount` within its own range, leaving larger units alone
fn cycle(date: NaiveDateTime, unit: DateUnit, amount: i64, hour12: bool) -> NaiveDateTime {
    let range = match unit {
        DateUnit::Years | DateUnit::Meridiem => return date_units::add(date, unit, amount),
        DateUnit::Days => {
            let length = date_units::days_in_month(date) as i64;
            let day = (date_units::get(date, unit) - 1 + amount).rem_euclid(length) + 1;
            return date_units::set(date, unit, day);
        }
        DateUnit::Hours if hour12 => 12,
        DateUnit::Hours => 24,
        DateUnit::Months => 12,
        DateUnit::Minutes | DateUnit::Seconds => 60,
        DateUnit::Milliseconds => 1000,
    };
    let value = (date_units::get(date, unit) + amount).rem_euclid(range);
    date_units::set(date, unit, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_snap_amount() {
        assert_eq!(snap_amount(13, 15, StepDirection::Up), 2);
        assert_eq!(snap_amount(15, 15, StepDirection::Up), 15);
        assert_eq!(snap_amount(1, 3, StepDirection::Down), -1);
        assert_eq!(snap_amount(0, 3, StepDirection::Down), -3);
        assert_eq!(snap_amount(43, 30, StepDirection::Up), 17);
    }

    #[test]
    fn test_cycle_stays_within_unit() {
        let date = at("2024-01-31T23:59:59");
        assert_eq!(cycle(date, DateUnit::Seconds, 1, false), at("2024-01-31T23:59:00"));
        assert_eq!(cycle(date, DateUnit::Minutes, 1, false), at("2024-01-31T23:00:59"));
        assert_eq!(cycle(date, DateUnit::Hours, 1, false), at("2024-01-31T00:59:59"));
        assert_eq!(cycle(date, DateUnit::Days, 1, false), at("2024-01-01T23:59:59"));
        assert_eq!(cycle(date, DateUnit::Years, 1, false), at("2025-01-31T23:59:59"));
    }

    #[test]
    fn test_cycle_backwards() {
        let date = at("2024-01-01T00:00:00");
        assert_eq!(cycle(date, DateUnit::Months, -1, false), at("2024-12-01T00:00:00"));
        assert_eq!(cycle(date, DateUnit::Days, -1, false), at("2024-01-31T00:00:00"));
        assert_eq!(cycle(date, DateUnit::Hours, -1, false), at("2024-01-01T23:00:00"));
    }

    #[test]
    fn test_cycle_hours_in_12h_mode() {
        let date = at("2024-03-31T23:00:00");
        assert_eq!(cycle(date, DateUnit::Hours, 1, true), at("2024-03-31T00:00:00"));
    }

    #[test]
    fn test_cycle_months_clamps_day() {
        let date = at("2024-01-31T00:00:00");
        assert_eq!(cycle(date, DateUnit::Months, 1, false), at("2024-02-29T00:00:00"));
    }
}
