//! Window-system independent input events.

use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Right,
    Left,
    Up,
    Down,
    PageUp,
    PageDown,
    Enter,
    Tab,
    Backspace,
    F,
    S,
    R,
    T,
    P,
    H,
    Plus,
    Equals,
    Minus,
    Period,
    Other,
}

impl Key {
    pub fn is_forward(self) -> bool {
        matches!(self, Key::Right | Key::PageDown)
    }

    pub fn is_back(self) -> bool {
        matches!(self, Key::Left | Key::PageUp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown {
        key: Key,
        /// Ctrl, or Cmd on macOS.
        ctrl: bool,
        /// Text the key produced, if any.
        text: Option<String>,
    },
    KeyUp {
        key: Key,
    },
    /// Text typed without a key press we know about (IME, dead keys).
    Text(String),
    MouseDown {
        button: MouseButton,
        pos: Point,
    },
    MouseUp {
        button: MouseButton,
        pos: Point,
    },
    MouseMove {
        pos: Point,
        left_down: bool,
    },
    /// One wheel notch.
    Wheel {
        up: bool,
        ctrl: bool,
        pos: Point,
    },
}

impl InputEvent {
    pub fn key(key: Key) -> Self {
        InputEvent::KeyDown {
            key,
            ctrl: false,
            text: None,
        }
    }

    pub fn ctrl_key(key: Key) -> Self {
        InputEvent::KeyDown {
            key,
            ctrl: true,
            text: None,
        }
    }
}
