//! Screen-space points and the direction of travel.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel coordinate on the captured screen (origin top-left, y grows down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by a non-negative pixel offset.
    pub fn offset(self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx as i32, self.y + dy as i32)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Which point of a matched box stands for the entity's position.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Anchor {
    /// Top-left corner, as reported by the matcher.
    TopLeft,
    /// Top-left plus half the box size.
    #[default]
    Center,
}

impl Anchor {
    /// Position of a `width` x `height` box whose corner is `top_left`.
    pub fn locate(self, top_left: Point, width: u32, height: u32) -> Point {
        match self {
            Anchor::TopLeft => top_left,
            Anchor::Center => top_left.offset(width / 2, height / 2),
        }
    }
}

/// Horizontal direction of travel.
///
/// Exactly two states; the only transition is [`Direction::flipped`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    pub const fn flipped(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Whether `target_x` lies strictly ahead of `origin_x` when travelling this way.
    pub const fn is_ahead(self, origin_x: i32, target_x: i32) -> bool {
        match self {
            Direction::Left => target_x < origin_x,
            Direction::Right => target_x > origin_x,
        }
    }
}
