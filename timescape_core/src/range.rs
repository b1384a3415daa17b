//! Coupling two managers into a from/to range
//!
//! After [`marry`], `from.date() <= to.date()` holds whenever both are set,
//! and keyboard navigation flows from one editor into the other.

use crate::ids::InstanceId;
use crate::manager::{TimescapeManager, WeakManager};
use crate::pubsub::{Propagation, WrapDirection};
use thiserror::Error;
use tracing::{debug, warn};

/// Range errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("A manager cannot be married to itself")]
    SelfMarriage,

    #[error("Manager {0} is already married")]
    AlreadyMarried(InstanceId),
}

fn wrap_target(direction: WrapDirection) -> isize {
    match direction {
        WrapDirection::Forward => 0,
        WrapDirection::Backward => -1,
    }
}

fn both(a: &WeakManager, b: &WeakManager) -> Option<(TimescapeManager, TimescapeManager)> {
    Some((a.upgrade()?, b.upgrade()?))
}

/// Couples `from` and `to` so that `from` never ends up after `to`.
///
/// If `from` is already later than `to`, `to` is moved up to `from`. A
/// change that cannot be reverted because of the manager's own minimum or
/// maximum drags the other manager along instead.
pub fn marry(from: &TimescapeManager, to: &TimescapeManager) -> Result<(), RangeError> {
    if from.ptr_eq(to) {
        return Err(RangeError::SelfMarriage);
    }
    for manager in [from, to] {
        if manager.is_married() {
            return Err(RangeError::AlreadyMarried(manager.id()));
        }
    }
    from.mark_married();
    to.mark_married();

    let from_weak = from.downgrade();
    let to_weak = to.downgrade();

    {
        let (from_weak, to_weak) = (from_weak.clone(), to_weak.clone());
        from.on_focus_wrap(move |direction| {
            if let Some((from, to)) = both(&from_weak, &to_weak) {
                from.blur();
                to.focus_field(wrap_target(direction));
            }
            Propagation::Continue
        });
    }
    {
        let (from_weak, to_weak) = (from_weak.clone(), to_weak.clone());
        to.on_focus_wrap(move |direction| {
            if let Some((from, to)) = both(&from_weak, &to_weak) {
                to.blur();
                from.focus_field(wrap_target(direction));
            }
            Propagation::Continue
        });
    }

    {
        let (from_weak, to_weak) = (from_weak.clone(), to_weak.clone());
        from.on_change_date(move |date| {
            let (Some(date), Some((from, to))) = (date, both(&from_weak, &to_weak)) else {
                return Propagation::Continue;
            };
            if let Some(upper) = to.date().filter(|upper| date > *upper) {
                if from.force_date(upper) {
                    warn!(from = %from.id(), %date, %upper, "range start after end, reverting");
                    return Propagation::Stop;
                }
                // Held by its own bounds, so the end has to follow
                warn!(from = %from.id(), %date, %upper, "range start pinned past end, moving end");
            }
            to.set_range_min(Some(date));
            Propagation::Continue
        });
    }
    {
        let (from_weak, to_weak) = (from_weak.clone(), to_weak.clone());
        to.on_change_date(move |date| {
            let (Some(date), Some((from, to))) = (date, both(&from_weak, &to_weak)) else {
                return Propagation::Continue;
            };
            if let Some(lower) = from.date().filter(|lower| date < *lower) {
                if to.force_date(lower) {
                    warn!(to = %to.id(), %date, %lower, "range end before start, reverting");
                    return Propagation::Stop;
                }
                warn!(to = %to.id(), %date, %lower, "range end pinned before start, moving start");
            }
            from.set_range_max(Some(date));
            Propagation::Continue
        });
    }

    if let Some(date) = from.date() {
        to.set_range_min(Some(date));
    }
    if let Some(date) = to.date() {
        from.set_range_max(Some(date));
    }

    debug!(from = %from.id(), to = %to.id(), "managers married");
    Ok(())
}
