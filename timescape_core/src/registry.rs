//! Ordered registry of segment controls
//!
//! Entries are kept in host traversal order; at most one entry exists per unit.

use crate::control::{ControlId, MeasurementControl, SegmentControl};
use crate::pubsub::Subscription;
use date_units::DateUnit;
use std::fmt;
use std::rc::Rc;

/// A registered segment
pub struct RegistryEntry {
    pub unit: DateUnit,
    pub control: Rc<dyn SegmentControl>,
    pub measurement: Option<Rc<dyn MeasurementControl>>,
    /// Digits typed but not yet committed
    pub pending: String,
    /// Segment shows nothing and does not count towards completeness
    pub is_unset: bool,
    pub autofocus: bool,
    /// Bus subscriptions that keep the control in sync
    pub handles: Vec<Subscription>,
}

impl RegistryEntry {
    pub fn new(unit: DateUnit, control: Rc<dyn SegmentControl>) -> Self {
        Self {
            unit,
            control,
            measurement: None,
            pending: String::new(),
            is_unset: false,
            autofocus: false,
            handles: Vec::new(),
        }
    }

    /// Drops the bus subscriptions
    pub fn unsubscribe(&mut self) {
        for handle in self.handles.drain(..) {
            handle.unsubscribe();
        }
    }

    /// Unsubscribes and detaches the measurement control
    pub fn release(mut self) {
        self.unsubscribe();
        if let Some(measurement) = self.measurement.take() {
            measurement.detach();
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("unit", &self.unit)
            .field("control", &self.control.id())
            .field("pending", &self.pending)
            .field("is_unset", &self.is_unset)
            .field("autofocus", &self.autofocus)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, unit: DateUnit) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.unit == unit)
    }

    pub fn get_mut(&mut self, unit: DateUnit) -> Option<&mut RegistryEntry> {
        self.entries.iter_mut().find(|e| e.unit == unit)
    }

    pub fn unit_of(&self, control: ControlId) -> Option<DateUnit> {
        self.entries
            .iter()
            .find(|e| e.control.id() == control)
            .map(|e| e.unit)
    }

    pub fn index_of(&self, unit: DateUnit) -> Option<usize> {
        self.entries.iter().position(|e| e.unit == unit)
    }

    /// Entry at `index`; negative indexes count from the end
    pub fn at(&self, index: isize) -> Option<&RegistryEntry> {
        let len = self.entries.len() as isize;
        let index = if index < 0 { len + index } else { index };
        if (0..len).contains(&index) {
            self.entries.get(index as usize)
        } else {
            None
        }
    }

    /// Units in traversal order
    pub fn units(&self) -> Vec<DateUnit> {
        self.entries.iter().map(|e| e.unit).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegistryEntry> {
        self.entries.iter_mut()
    }

    /// Inserts `entry`, replacing (in place) any entry for the same unit
    pub fn insert(&mut self, entry: RegistryEntry) -> Option<RegistryEntry> {
        match self.index_of(entry.unit) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index], entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn remove(&mut self, unit: DateUnit) -> Option<RegistryEntry> {
        let index = self.index_of(unit)?;
        Some(self.entries.remove(index))
    }

    pub fn remove_control(&mut self, control: ControlId) -> Option<RegistryEntry> {
        let index = self.entries.iter().position(|e| e.control.id() == control)?;
        Some(self.entries.remove(index))
    }

    pub fn drain(&mut self) -> Vec<RegistryEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Stable sort by traversal position
    pub fn sort_by_position(&mut self) {
        self.entries.sort_by_key(|e| e.control.tree_position());
    }

    /// True when no entry is unset
    pub fn all_committed(&self) -> bool {
        self.entries.iter().all(|e| !e.is_unset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Attribute;
    use std::cell::Cell;

    struct Stub {
        id: ControlId,
        position: Cell<usize>,
    }

    impl SegmentControl for Stub {
        fn id(&self) -> ControlId {
            self.id
        }
        fn value(&self) -> String {
            String::new()
        }
        fn set_value(&self, _value: &str) {}
        fn set_attribute(&self, _attribute: Attribute, _value: &str) {}
        fn remove_attribute(&self, _attribute: Attribute) {}
        fn focus(&self) {}
        fn tree_position(&self) -> usize {
            self.position.get()
        }
    }

    fn stub(id: u64, position: usize) -> Rc<Stub> {
        Rc::new(Stub {
            id: ControlId::new(id),
            position: Cell::new(position),
        })
    }

    fn entry(unit: DateUnit, control: &Rc<Stub>) -> RegistryEntry {
        RegistryEntry::new(unit, control.clone())
    }

    #[test]
    fn test_sort_follows_tree_position() {
        let mut registry = Registry::new();
        let days = stub(1, 2);
        let years = stub(2, 0);
        let months = stub(3, 1);

        registry.insert(entry(DateUnit::Days, &days));
        registry.insert(entry(DateUnit::Years, &years));
        registry.insert(entry(DateUnit::Months, &months));
        registry.sort_by_position();

        assert_eq!(
            registry.units(),
            vec![DateUnit::Years, DateUnit::Months, DateUnit::Days]
        );

        days.position.set(0);
        years.position.set(5);
        registry.sort_by_position();
        assert_eq!(
            registry.units(),
            vec![DateUnit::Days, DateUnit::Months, DateUnit::Years]
        );
    }

    #[test]
    fn test_insert_replaces_same_unit() {
        let mut registry = Registry::new();
        let first = stub(1, 0);
        let second = stub(2, 0);

        assert!(registry.insert(entry(DateUnit::Years, &first)).is_none());
        let old = registry.insert(entry(DateUnit::Years, &second)).unwrap();

        assert_eq!(old.control.id(), ControlId::new(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unit_of(ControlId::new(2)), Some(DateUnit::Years));
        assert_eq!(registry.unit_of(ControlId::new(1)), None);
    }

    #[test]
    fn test_negative_index() {
        let mut registry = Registry::new();
        registry.insert(entry(DateUnit::Years, &stub(1, 0)));
        registry.insert(entry(DateUnit::Months, &stub(2, 1)));

        assert_eq!(registry.at(0).map(|e| e.unit), Some(DateUnit::Years));
        assert_eq!(registry.at(-1).map(|e| e.unit), Some(DateUnit::Months));
        assert_eq!(registry.at(-2).map(|e| e.unit), Some(DateUnit::Years));
        assert!(registry.at(2).is_none());
        assert!(registry.at(-3).is_none());
    }

    #[test]
    fn test_remove_and_completeness() {
        let mut registry = Registry::new();
        registry.insert(entry(DateUnit::Years, &stub(1, 0)));
        registry.insert(entry(DateUnit::Days, &stub(2, 1)));
        assert!(registry.all_committed());

        registry.get_mut(DateUnit::Days).unwrap().is_unset = true;
        assert!(!registry.all_committed());

        let removed = registry.remove_control(ControlId::new(2)).unwrap();
        assert_eq!(removed.unit, DateUnit::Days);
        assert!(registry.all_committed());

        assert!(registry.remove(DateUnit::Days).is_none());
        assert_eq!(registry.drain().len(), 1);
        assert!(registry.is_empty());
    }
}
