//! Mock host shared by the integration tests

#![allow(dead_code)]

use chrono::NaiveDateTime;
use segment_input::{KeyCode, KeyEvent, Modifiers, WheelEvent};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use timescape_core::{
    Attribute, ControlId, DateUnit, Environment, FixedClock, KeyDisposition, MeasurementControl,
    MeasurementFactory, RootControl, SegmentControl, TimescapeManager, TimescapeOptions,
    WeakManager,
};

pub const BASE: &str = "2021-12-31T23:59:59";

pub const ALL_FIELDS: [DateUnit; 7] = [
    DateUnit::Years,
    DateUnit::Months,
    DateUnit::Days,
    DateUnit::Hours,
    DateUnit::Minutes,
    DateUnit::Seconds,
    DateUnit::Meridiem,
];

pub fn at(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

pub fn clock_at(now: &str) -> Rc<FixedClock> {
    Rc::new(FixedClock::new(at(now)))
}

pub fn env(clock: &Rc<FixedClock>) -> Environment {
    Environment::default().with_clock(clock.clone())
}

/// Focus shared by every control of one host, like a document's active element
type FocusCell = Rc<Cell<Option<ControlId>>>;

pub struct MockControl {
    id: ControlId,
    position: Cell<usize>,
    value: RefCell<String>,
    step: Option<i64>,
    placeholder: RefCell<Option<String>>,
    attributes: RefCell<BTreeMap<Attribute, String>>,
    read_only: Cell<bool>,
    width: Cell<Option<f64>>,
    focus: FocusCell,
    owner: RefCell<Option<WeakManager>>,
}

impl MockControl {
    pub fn attribute(&self, attribute: Attribute) -> Option<String> {
        self.attributes.borrow().get(&attribute).cloned()
    }

    pub fn placeholder_text(&self) -> Option<String> {
        self.placeholder.borrow().clone()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.get()
    }

    pub fn width(&self) -> Option<f64> {
        self.width.get()
    }

    pub fn has_focus(&self) -> bool {
        self.focus.get() == Some(self.id)
    }

    pub fn set_position(&self, position: usize) {
        self.position.set(position);
    }

    pub fn with_placeholder(self: Rc<Self>, placeholder: &str) -> Rc<Self> {
        *self.placeholder.borrow_mut() = Some(placeholder.to_string());
        self
    }

    fn owner(&self) -> Option<TimescapeManager> {
        self.owner.borrow().as_ref().and_then(|weak| weak.upgrade())
    }
}

impl SegmentControl for MockControl {
    fn id(&self) -> ControlId {
        self.id
    }

    fn value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_value(&self, value: &str) {
        *self.value.borrow_mut() = value.to_string();
    }

    fn step(&self) -> Option<i64> {
        self.step
    }

    fn placeholder(&self) -> Option<String> {
        self.placeholder.borrow().clone()
    }

    fn set_placeholder(&self, placeholder: &str) {
        *self.placeholder.borrow_mut() = Some(placeholder.to_string());
    }

    fn set_attribute(&self, attribute: Attribute, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(attribute, value.to_string());
    }

    fn remove_attribute(&self, attribute: Attribute) {
        self.attributes.borrow_mut().remove(&attribute);
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    fn set_width(&self, width: f64) {
        self.width.set(Some(width));
    }

    // Reports the focus event synchronously, as a browser does
    fn focus(&self) {
        self.focus.set(Some(self.id));
        if let Some(manager) = self.owner() {
            manager.handle_focus(self.id);
        }
    }

    fn tree_position(&self) -> usize {
        self.position.get()
    }
}

pub struct MockRoot {
    id: ControlId,
    attributes: RefCell<BTreeMap<Attribute, String>>,
}

impl MockRoot {
    pub fn get(&self, attribute: Attribute) -> Option<String> {
        self.attributes.borrow().get(&attribute).cloned()
    }
}

impl RootControl for MockRoot {
    fn id(&self) -> ControlId {
        self.id
    }

    fn attribute(&self, attribute: Attribute) -> Option<String> {
        self.get(attribute)
    }

    fn set_attribute(&self, attribute: Attribute, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(attribute, value.to_string());
    }
}

#[derive(Default)]
pub struct MockMeasurement {
    pub text: RefCell<String>,
    pub styled: Cell<bool>,
    pub detached: Cell<bool>,
}

impl MeasurementControl for MockMeasurement {
    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    fn copy_style_from(&self, _control: &dyn SegmentControl) {
        self.styled.set(true);
    }

    fn detach(&self) {
        self.detached.set(true);
    }
}

/// Records every measurement control it hands out
#[derive(Default)]
pub struct MockMeasurementFactory {
    pub created: RefCell<Vec<(DateUnit, Rc<MockMeasurement>)>>,
}

impl MockMeasurementFactory {
    pub fn count(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn last(&self, unit: DateUnit) -> Option<Rc<MockMeasurement>> {
        self.created
            .borrow()
            .iter()
            .rev()
            .find(|(u, _)| *u == unit)
            .map(|(_, m)| m.clone())
    }
}

impl MeasurementFactory for MockMeasurementFactory {
    fn create(
        &self,
        unit: DateUnit,
        _control: &dyn SegmentControl,
    ) -> Option<Rc<dyn MeasurementControl>> {
        let measurement = Rc::new(MockMeasurement::default());
        self.created.borrow_mut().push((unit, measurement.clone()));
        Some(measurement)
    }
}

/// A tree of controls with a single focus
pub struct Host {
    focus: FocusCell,
    next_id: Cell<u64>,
    controls: RefCell<Vec<Rc<MockControl>>>,
}

impl Host {
    pub fn new() -> Self {
        Self {
            focus: Rc::new(Cell::new(None)),
            next_id: Cell::new(1),
            controls: RefCell::new(Vec::new()),
        }
    }

    fn next_id(&self) -> ControlId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ControlId::new(id)
    }

    /// Creates a control placed after every existing one
    pub fn control(&self, step: Option<i64>) -> Rc<MockControl> {
        let id = self.next_id();
        let control = Rc::new(MockControl {
            id,
            position: Cell::new(id.as_u64() as usize * 10),
            value: RefCell::new(String::new()),
            step,
            placeholder: RefCell::new(None),
            attributes: RefCell::new(BTreeMap::new()),
            read_only: Cell::new(false),
            width: Cell::new(None),
            focus: self.focus.clone(),
            owner: RefCell::new(None),
        });
        self.controls.borrow_mut().push(control.clone());
        control
    }

    pub fn root(&self) -> Rc<MockRoot> {
        Rc::new(MockRoot {
            id: self.next_id(),
            attributes: RefCell::new(BTreeMap::new()),
        })
    }

    /// Registers `control` with `manager` and routes its events there
    pub fn attach(&self, manager: &TimescapeManager, control: &Rc<MockControl>, unit: DateUnit) {
        *control.owner.borrow_mut() = Some(manager.downgrade());
        manager.register_element(control.clone(), unit, false, false);
    }

    pub fn mount(
        &self,
        manager: &TimescapeManager,
        units: &[DateUnit],
    ) -> BTreeMap<DateUnit, Rc<MockControl>> {
        let steps: Vec<(DateUnit, Option<i64>)> = units.iter().map(|u| (*u, None)).collect();
        self.mount_with_steps(manager, &steps)
    }

    pub fn mount_with_steps(
        &self,
        manager: &TimescapeManager,
        units: &[(DateUnit, Option<i64>)],
    ) -> BTreeMap<DateUnit, Rc<MockControl>> {
        manager.register_root(self.root());
        units
            .iter()
            .map(|(unit, step)| {
                let control = self.control(*step);
                self.attach(manager, &control, *unit);
                (*unit, control)
            })
            .collect()
    }

    pub fn focused(&self) -> Option<ControlId> {
        self.focus.get()
    }

    fn focused_control(&self) -> Option<Rc<MockControl>> {
        let id = self.focus.get()?;
        self.controls.borrow().iter().find(|c| c.id == id).cloned()
    }

    /// User focuses `control` (click or programmatic)
    pub fn focus(&self, control: &Rc<MockControl>) {
        control.focus();
    }

    /// Sends a key to whichever manager owns the focused control
    pub fn key(&self, event: KeyEvent) -> KeyDisposition {
        let Some(control) = self.focused_control() else {
            return KeyDisposition::Native;
        };
        let Some(manager) = control.owner() else {
            return KeyDisposition::Native;
        };
        manager.handle_key(control.id, &event)
    }

    pub fn press(&self, code: KeyCode) -> KeyDisposition {
        self.key(KeyEvent::pressed(code, Modifiers::none()))
    }

    pub fn press_with(&self, code: KeyCode, modifiers: Modifiers) -> KeyDisposition {
        self.key(KeyEvent::pressed(code, modifiers))
    }

    /// Types ASCII text one key at a time
    pub fn type_text(&self, text: &str) {
        for byte in text.bytes() {
            if let Some(code) = KeyCode::from_ascii(byte) {
                self.press(code);
            }
        }
    }

    pub fn wheel(&self, delta_y: f64) -> KeyDisposition {
        let Some(control) = self.focused_control() else {
            return KeyDisposition::Native;
        };
        let Some(manager) = control.owner() else {
            return KeyDisposition::Native;
        };
        manager.handle_wheel(control.id, &WheelEvent::new(delta_y))
    }
}

/// A manager at the base date with every field but milliseconds mounted
pub fn setup(options: TimescapeOptions) -> (Host, TimescapeManager, BTreeMap<DateUnit, Rc<MockControl>>) {
    let clock = clock_at("2024-05-17T09:30:00");
    let manager = TimescapeManager::with_environment(Some(at(BASE)), options, env(&clock));
    let host = Host::new();
    let fields = host.mount(&manager, &ALL_FIELDS);
    (host, manager, fields)
}

/// Display values in field order
pub fn values(fields: &BTreeMap<DateUnit, Rc<MockControl>>) -> Vec<String> {
    ALL_FIELDS
        .iter()
        .filter_map(|unit| fields.get(unit))
        .map(|control| control.value())
        .collect()
}
