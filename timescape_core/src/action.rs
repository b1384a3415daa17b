//! Key classification for segments

use date_units::{DateUnit, Meridiem};
use segment_input::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

impl StepDirection {
    pub fn sign(&self) -> i64 {
        match self {
            StepDirection::Up => 1,
            StepDirection::Down => -1,
        }
    }

    /// Wheel deltas: negative scrolls down, positive up
    pub fn from_wheel(direction: i8) -> Option<Self> {
        match direction {
            d if d < 0 => Some(StepDirection::Down),
            d if d > 0 => Some(StepDirection::Up),
            _ => None,
        }
    }
}

/// What a key means for the focused segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAction {
    Step(StepDirection),
    /// Move focus, wrapping around the segment list
    Advance(isize),
    /// Move focus without wrapping
    Tab { backward: bool },
    /// Focus the segment at this index, negative from the end
    Jump(isize),
    SetMeridiem(Meridiem),
    Clear,
    Backspace,
    Digit(u8),
    /// Leave the key to the host
    PassThrough,
}

impl SegmentAction {
    pub fn from_key(event: &KeyEvent, unit: DateUnit) -> Self {
        if !event.is_down() {
            return SegmentAction::PassThrough;
        }

        let modifiers = event.modifiers;
        match event.code {
            KeyCode::Up => SegmentAction::Step(StepDirection::Up),
            KeyCode::Down => SegmentAction::Step(StepDirection::Down),
            KeyCode::Right | KeyCode::Enter | KeyCode::NumpadEnter => SegmentAction::Advance(1),
            KeyCode::Left => SegmentAction::Advance(-1),
            KeyCode::Home => SegmentAction::Jump(0),
            KeyCode::End => SegmentAction::Jump(-1),
            KeyCode::Tab => SegmentAction::Tab {
                backward: modifiers.is_shift(),
            },
            KeyCode::Delete => SegmentAction::Clear,
            KeyCode::Backspace if unit == DateUnit::Meridiem => SegmentAction::Clear,
            KeyCode::Backspace => SegmentAction::Backspace,
            _ if modifiers.is_shortcut() => SegmentAction::PassThrough,
            code => match (code.letter(), code.digit()) {
                (Some('a'), _) if unit == DateUnit::Meridiem => {
                    SegmentAction::SetMeridiem(Meridiem::Am)
                }
                (Some('p'), _) if unit == DateUnit::Meridiem => {
                    SegmentAction::SetMeridiem(Meridiem::Pm)
                }
                (_, Some(digit)) if !modifiers.is_shift() => SegmentAction::Digit(digit),
                _ => SegmentAction::PassThrough,
            },
        }
    }
}
