//! Keyboard emission: key names, the device trait, pulses, and held movement.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::error::{BotError, Result};
use crate::geometry::Direction;

/// A key the bot can press.
///
/// Parsed from config names such as `"left"`, `"ctrl"`, `"f12"`, or a single
/// character like `"z"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Tab,
    Escape,
    Shift,
    Control,
    Alt,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F12.
    Function(u8),
    /// Printable character, stored lowercase.
    Char(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let key = match name.as_str() {
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            "space" => Key::Space,
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "esc" | "escape" => Key::Escape,
            "shift" => Key::Shift,
            "ctrl" | "control" => Key::Control,
            "alt" => Key::Alt,
            "del" | "delete" => Key::Delete,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "page_up" | "pgup" => Key::PageUp,
            "pagedown" | "page_down" | "pgdn" => Key::PageDown,
            _ => {
                if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok())
                    && (1..=12).contains(&n)
                {
                    Key::Function(n)
                } else {
                    let mut chars = name.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) if c.is_ascii_graphic() => Key::Char(c),
                        _ => return Err(UnknownKey(s.to_string())),
                    }
                }
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for Key {
    type Error = UnknownKey;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Space => f.write_str("space"),
            Key::Enter => f.write_str("enter"),
            Key::Tab => f.write_str("tab"),
            Key::Escape => f.write_str("escape"),
            Key::Shift => f.write_str("shift"),
            Key::Control => f.write_str("ctrl"),
            Key::Alt => f.write_str("alt"),
            Key::Delete => f.write_str("delete"),
            Key::Home => f.write_str("home"),
            Key::End => f.write_str("end"),
            Key::PageUp => f.write_str("pageup"),
            Key::PageDown => f.write_str("pagedown"),
            Key::Function(n) => write!(f, "f{n}"),
            Key::Char(c) => write!(f, "{c}"),
        }
    }
}

/// Failure reported by a keyboard backend.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("key '{0}' is not supported by this input backend")]
    Unsupported(Key),

    #[error("input backend failed: {0}")]
    Backend(String),
}

/// Synthetic keyboard.
pub trait InputDevice {
    fn press(&mut self, key: Key) -> std::result::Result<(), InputError>;
    fn release(&mut self, key: Key) -> std::result::Result<(), InputError>;
}

impl<D: InputDevice + ?Sized> InputDevice for Box<D> {
    fn press(&mut self, key: Key) -> std::result::Result<(), InputError> {
        (**self).press(key)
    }

    fn release(&mut self, key: Key) -> std::result::Result<(), InputError> {
        (**self).release(key)
    }
}

/// Press, hold for `width`, release.
pub fn pulse(
    device: &mut dyn InputDevice,
    clock: &dyn Clock,
    key: Key,
    width: Duration,
) -> Result<()> {
    device.press(key).map_err(BotError::input("press", key))?;
    clock.sleep(width);
    device.release(key).map_err(BotError::input("release", key))
}

/// Holds the LEFT or RIGHT movement key for the current direction.
///
/// Never holds both: the opposite key is released before the new one is
/// pressed. While a direction is held, the key is pressed again every
/// `reassert` interval (if set).
#[derive(Debug, Clone)]
pub struct MovementController {
    left: Key,
    right: Key,
    reassert: Option<Duration>,
    held: Option<Direction>,
    last_press: Option<Duration>,
}

impl MovementController {
    pub fn new(left: Key, right: Key) -> Self {
        Self {
            left,
            right,
            reassert: None,
            held: None,
            last_press: None,
        }
    }

    pub fn with_reassert(mut self, interval: Option<Duration>) -> Self {
        self.reassert = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn key_for(&self, direction: Direction) -> Key {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn held(&self) -> Option<Direction> {
        self.held
    }

    /// Make sure `direction` is the held direction. Returns true when a key
    /// event was emitted.
    pub fn steer(
        &mut self,
        device: &mut dyn InputDevice,
        direction: Direction,
        now: Duration,
    ) -> Result<bool> {
        if self.held != Some(direction) {
            let opposite = self.key_for(direction.flipped());
            device
                .release(opposite)
                .map_err(BotError::input("release", opposite))?;
            self.held = None;

            let key = self.key_for(direction);
            device.press(key).map_err(BotError::input("press", key))?;
            self.held = Some(direction);
            self.last_press = Some(now);
            return Ok(true);
        }

        let due = match (self.reassert, self.last_press) {
            (Some(interval), Some(last)) => now.saturating_sub(last) >= interval,
            _ => false,
        };
        if due {
            let key = self.key_for(direction);
            device.press(key).map_err(BotError::input("press", key))?;
            self.last_press = Some(now);
        }
        Ok(due)
    }

    /// Release both movement keys, whichever one is held.
    ///
    /// Both releases are attempted even if the first fails; the first error
    /// is returned.
    pub fn release_all(&mut self, device: &mut dyn InputDevice) -> Result<()> {
        self.held = None;
        let left = device
            .release(self.left)
            .map_err(BotError::input("release", self.left));
        let right = device
            .release(self.right)
            .map_err(BotError::input("release", self.right));
        left.and(right)
    }
}
