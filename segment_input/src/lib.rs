#![no_std]

//! # Segment Input
//!
//! Input event types delivered by a host to a segmented date editor.
//!
//! ## Philosophy
//!
//! - **Events, not bytes**: Input is structured events, not raw scan codes or DOM events
//! - **Host-neutral**: Any toolkit can translate its native events into these types
//! - **Testable**: Events are serializable and can be injected for testing
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - Raw hardware scan codes (PS/2, USB HID)
//! - Global keyboard state
//! - A text input method (no IME composition)

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Input event
///
/// Represents a single input event targeted at one segment control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Keyboard event
    Key(KeyEvent),
    /// Pointer wheel rotation
    Wheel(WheelEvent),
}

impl InputEvent {
    /// Creates a key event
    pub fn key(event: KeyEvent) -> Self {
        Self::Key(event)
    }

    /// Creates a wheel event
    pub fn wheel(delta_y: f64) -> Self {
        Self::Wheel(WheelEvent::new(delta_y))
    }

    /// Returns the key event if this is a key event
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(event) => Some(event),
            _ => None,
        }
    }

    /// Returns the wheel event if this is a wheel event
    pub fn as_wheel(&self) -> Option<&WheelEvent> {
        match self {
            Self::Wheel(event) => Some(event),
            _ => None,
        }
    }
}

/// Keyboard event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// The key that was pressed/released
    pub code: KeyCode,
    /// Modifier keys that were active
    pub modifiers: Modifiers,
    /// Event state (pressed, released, repeat)
    pub state: KeyState,
    /// Text the key produced, if the host knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl KeyEvent {
    /// Creates a new key event
    pub fn new(code: KeyCode, modifiers: Modifiers, state: KeyState) -> Self {
        Self {
            code,
            modifiers,
            state,
            text: None,
        }
    }

    /// Creates a key pressed event
    pub fn pressed(code: KeyCode, modifiers: Modifiers) -> Self {
        Self::new(code, modifiers, KeyState::Pressed)
    }

    /// Creates a key released event
    pub fn released(code: KeyCode, modifiers: Modifiers) -> Self {
        Self::new(code, modifiers, KeyState::Released)
    }

    /// Creates a key repeat event
    pub fn repeat(code: KeyCode, modifiers: Modifiers) -> Self {
        Self::new(code, modifiers, KeyState::Repeat)
    }

    /// Adds the produced text to this key event
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Returns true for presses and auto-repeats, the states editors act on
    pub fn is_down(&self) -> bool {
        matches!(self.state, KeyState::Pressed | KeyState::Repeat)
    }

    /// Returns true if this is a release event
    pub fn is_released(&self) -> bool {
        self.state == KeyState::Released
    }
}

/// Key state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// Key was pressed down
    Pressed,
    /// Key was released
    Released,
    /// Key is auto-repeating
    Repeat,
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pressed => write!(f, "pressed"),
            Self::Released => write!(f, "released"),
            Self::Repeat => write!(f, "repeat"),
        }
    }
}

/// Key code
///
/// Logical key codes, not hardware scan codes. Only the keys a segment
/// editor distinguishes get their own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    // Letters
    A,
    C,
    P,
    V,
    X,
    Z,

    // Numbers
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,

    // Numpad
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    NumpadEnter,

    // Editing and navigation
    Tab,
    Enter,
    Backspace,
    Delete,
    Home,
    End,

    // Arrow keys
    Up,
    Down,
    Left,
    Right,

    // Any other printable character
    Char(char),

    // Unknown/unmapped key
    Unknown,
}

impl KeyCode {
    /// Returns the decimal digit this key types, if any
    pub fn digit(&self) -> Option<u8> {
        match self {
            Self::Num0 | Self::Numpad0 => Some(0),
            Self::Num1 | Self::Numpad1 => Some(1),
            Self::Num2 | Self::Numpad2 => Some(2),
            Self::Num3 | Self::Numpad3 => Some(3),
            Self::Num4 | Self::Numpad4 => Some(4),
            Self::Num5 | Self::Numpad5 => Some(5),
            Self::Num6 | Self::Numpad6 => Some(6),
            Self::Num7 | Self::Numpad7 => Some(7),
            Self::Num8 | Self::Numpad8 => Some(8),
            Self::Num9 | Self::Numpad9 => Some(9),
            Self::Char(ch) => ch.to_digit(10).map(|d| d as u8),
            _ => None,
        }
    }

    /// Returns the key code for a top-row digit
    pub fn from_digit(digit: u8) -> Option<Self> {
        const DIGITS: [KeyCode; 10] = [
            KeyCode::Num0,
            KeyCode::Num1,
            KeyCode::Num2,
            KeyCode::Num3,
            KeyCode::Num4,
            KeyCode::Num5,
            KeyCode::Num6,
            KeyCode::Num7,
            KeyCode::Num8,
            KeyCode::Num9,
        ];
        DIGITS.get(digit as usize).copied()
    }

    /// Returns the lowercase letter of a letter key
    pub fn letter(&self) -> Option<char> {
        match self {
            Self::A => Some('a'),
            Self::C => Some('c'),
            Self::P => Some('p'),
            Self::V => Some('v'),
            Self::X => Some('x'),
            Self::Z => Some('z'),
            Self::Char(ch) if ch.is_ascii_alphabetic() => Some(ch.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Convert an ASCII byte to a key code (for terminal hosts)
    pub fn from_ascii(byte: u8) -> Option<Self> {
        match byte {
            0x08 | 0x7F => Some(Self::Backspace),
            b'\r' | b'\n' => Some(Self::Enter),
            b'\t' => Some(Self::Tab),
            b'0'..=b'9' => Self::from_digit(byte - b'0'),
            b'a' | b'A' => Some(Self::A),
            b'p' | b'P' => Some(Self::P),
            ch if (0x20..0x7F).contains(&ch) => Some(Self::Char(ch as char)),
            _ => None,
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Modifier keys
///
/// Bitflags representing modifier key states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    bits: u8,
}

impl Modifiers {
    /// No modifiers
    pub const NONE: Self = Self { bits: 0 };
    /// Control key
    pub const CTRL: Self = Self { bits: 1 << 0 };
    /// Alt key
    pub const ALT: Self = Self { bits: 1 << 1 };
    /// Shift key
    pub const SHIFT: Self = Self { bits: 1 << 2 };
    /// Meta/Super/Command key
    pub const META: Self = Self { bits: 1 << 3 };

    /// Creates a new modifier set with no modifiers
    pub fn none() -> Self {
        Self::NONE
    }

    /// Adds a modifier
    pub fn with(mut self, other: Modifiers) -> Self {
        self.bits |= other.bits;
        self
    }

    /// Checks if a modifier is present
    pub fn contains(&self, other: Modifiers) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if Ctrl is pressed
    pub fn is_ctrl(&self) -> bool {
        self.contains(Self::CTRL)
    }

    /// Checks if Alt is pressed
    pub fn is_alt(&self) -> bool {
        self.contains(Self::ALT)
    }

    /// Checks if Shift is pressed
    pub fn is_shift(&self) -> bool {
        self.contains(Self::SHIFT)
    }

    /// Checks if Meta is pressed
    pub fn is_meta(&self) -> bool {
        self.contains(Self::META)
    }

    /// True when a shortcut chord (Ctrl or Meta) is held
    pub fn is_shortcut(&self) -> bool {
        self.is_ctrl() || self.is_meta()
    }

    /// Returns true if no modifiers are pressed
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let mut parts = Vec::new();
        if self.is_ctrl() {
            parts.push("Ctrl");
        }
        if self.is_alt() {
            parts.push("Alt");
        }
        if self.is_shift() {
            parts.push("Shift");
        }
        if self.is_meta() {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Pointer wheel rotation over a control
///
/// Only the vertical axis matters; its sign picks the step direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub delta_y: f64,
}

impl WheelEvent {
    pub fn new(delta_y: f64) -> Self {
        Self { delta_y }
    }

    /// -1, 0 or 1 depending on the rotation direction
    pub fn direction(&self) -> i8 {
        if self.delta_y > 0.0 {
            1
        } else if self.delta_y < 0.0 {
            -1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_input_event_key() {
        let key_event = KeyEvent::pressed(KeyCode::A, Modifiers::none());
        let event = InputEvent::key(key_event.clone());

        assert_eq!(event.as_key(), Some(&key_event));
        assert!(event.as_wheel().is_none());
    }

    #[test]
    fn test_key_event_states() {
        assert!(KeyEvent::pressed(KeyCode::Up, Modifiers::none()).is_down());
        assert!(KeyEvent::repeat(KeyCode::Up, Modifiers::none()).is_down());

        let released = KeyEvent::released(KeyCode::Up, Modifiers::none());
        assert!(!released.is_down());
        assert!(released.is_released());
    }

    #[test]
    fn test_key_event_with_text() {
        let event = KeyEvent::pressed(KeyCode::P, Modifiers::SHIFT).with_text("P");
        assert_eq!(event.text, Some("P".to_string()));
    }

    #[test]
    fn test_key_state_display() {
        assert_eq!(KeyState::Pressed.to_string(), "pressed");
        assert_eq!(KeyState::Released.to_string(), "released");
        assert_eq!(KeyState::Repeat.to_string(), "repeat");
    }

    #[test]
    fn test_digits() {
        assert_eq!(KeyCode::Num0.digit(), Some(0));
        assert_eq!(KeyCode::Numpad7.digit(), Some(7));
        assert_eq!(KeyCode::Char('4').digit(), Some(4));
        assert_eq!(KeyCode::Char('x').digit(), None);
        assert_eq!(KeyCode::Enter.digit(), None);

        for d in 0..10 {
            assert_eq!(KeyCode::from_digit(d).and_then(|k| k.digit()), Some(d));
        }
        assert_eq!(KeyCode::from_digit(10), None);
    }

    #[test]
    fn test_letters() {
        assert_eq!(KeyCode::A.letter(), Some('a'));
        assert_eq!(KeyCode::Char('P').letter(), Some('p'));
        assert_eq!(KeyCode::Num1.letter(), None);
    }

    #[test]
    fn test_from_ascii() {
        assert_eq!(KeyCode::from_ascii(b'7'), Some(KeyCode::Num7));
        assert_eq!(KeyCode::from_ascii(b'a'), Some(KeyCode::A));
        assert_eq!(KeyCode::from_ascii(b'P'), Some(KeyCode::P));
        assert_eq!(KeyCode::from_ascii(b'\t'), Some(KeyCode::Tab));
        assert_eq!(KeyCode::from_ascii(0x7F), Some(KeyCode::Backspace));
        assert_eq!(KeyCode::from_ascii(b'-'), Some(KeyCode::Char('-')));
        assert_eq!(KeyCode::from_ascii(b' '), Some(KeyCode::Char(' ')));
        assert_eq!(KeyCode::from_ascii(0x1B), None);
        assert_eq!(KeyCode::from_ascii(0x01), None);
    }

    #[test]
    fn test_modifiers() {
        let mods = Modifiers::CTRL.with(Modifiers::SHIFT);
        assert!(mods.is_ctrl());
        assert!(mods.is_shift());
        assert!(!mods.is_alt());
        assert!(mods.is_shortcut());
        assert!(!Modifiers::SHIFT.is_shortcut());
        assert!(Modifiers::META.is_shortcut());
        assert!(Modifiers::default().is_empty());
    }

    #[test]
    fn test_modifiers_display() {
        assert_eq!(Modifiers::none().to_string(), "none");
        assert_eq!(Modifiers::CTRL.with(Modifiers::ALT).to_string(), "Ctrl+Alt");
        assert_eq!(Modifiers::SHIFT.with(Modifiers::META).to_string(), "Shift+Meta");
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(WheelEvent::new(-3.5).direction(), -1);
        assert_eq!(WheelEvent::new(0.0).direction(), 0);
        assert_eq!(WheelEvent::new(120.0).direction(), 1);
    }

    #[test]
    fn test_input_event_serialization() {
        let event = InputEvent::key(KeyEvent::pressed(KeyCode::Enter, Modifiers::SHIFT));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);

        let wheel = InputEvent::wheel(-1.0);
        let json = serde_json::to_string(&wheel).unwrap();
        let deserialized: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(wheel, deserialized);
    }
}
