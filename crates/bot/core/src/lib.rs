//! Perception-and-control loop for a side-scrolling farming bot.
//!
//! Every tick the bot refreshes tracked positions from a screen frame (at a
//! bounded rate), lets the navigation policy decide whether to turn around,
//! holds the movement key for the current direction, and fires any attack,
//! skill, or pickup pulses that are due.
//!
//! # Architecture
//!
//! ```text
//! Bot (control loop, owns everything below)
//!   ├─→ PositionTracker   (FrameSource + TemplateMatcher → positions)
//!   ├─→ NavigationPolicy  (NavigationStrategy → Direction)
//!   ├─→ MovementController (held LEFT/RIGHT keys)
//!   └─→ ActionScheduler   (randomized pulse actions)
//! ```
//!
//! OS access (screen capture, synthetic keys, the stop hotkey, time) sits
//! behind the [`FrameSource`], [`InputDevice`], [`StopSignal`], and [`Clock`]
//! traits so the loop can run against scripted fakes.

pub mod bot;
pub mod capture;
pub mod clock;
pub mod config;
mod correlation;
pub mod debug;
pub mod error;
pub mod geometry;
pub mod input;
pub mod matcher;
pub mod navigation;
pub mod scheduler;
pub mod template;
pub mod tracker;

pub use bot::{Bot, BotBuilder, BotState, RunSummary, StopAfterTicks, StopSignal};
pub use capture::{CaptureError, Frame, FrameSource, PreparedFrame};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BotConfig, ConfigError, MonsterScope, StrategyKind};
pub use debug::{DebugError, DebugSink, Detection, DetectionKind};
pub use error::{BotError, Result};
pub use geometry::{Anchor, Direction, Point};
pub use input::{InputDevice, InputError, Key, MovementController};
pub use matcher::{Match, MatchResult, NccMatcher, TemplateMatcher};
pub use navigation::{NavigationPolicy, NavigationStrategy, NavigationView};
pub use scheduler::{ActionKind, ActionScheduler, IntervalSpec, ScheduledAction};
pub use template::{Template, TemplateSet};
pub use tracker::{
    EntityState, MonsterSighting, PositionTracker, RefreshReport, TrackedEntity, TrackedPosition,
    TrackerSettings,
};
