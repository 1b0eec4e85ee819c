//! Bot configuration as deserialized from the TOML config file.
//!
//! Every field has a default, so an empty file yields a usable boundary bot
//! (apart from the template images it points at). Durations are seconds.
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Anchor, Direction};
use crate::input::Key;
use crate::scheduler::IntervalSpec;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: String, value: f64 },

    #[error("{field}: min_interval {min} is greater than max_interval {max}")]
    InvertedInterval { field: String, min: f64, max: f64 },

    #[error("tracking.threshold must be in (0, 1] (got {0})")]
    Threshold(f32),

    #[error("tracking.refresh_interval must be greater than zero")]
    ZeroRefreshInterval,

    #[error("keys.left and keys.right are both bound to '{0}'")]
    SameMovementKey(Key),

    #[error("the boundary strategy needs templates.left_boundary and templates.right_boundary")]
    MissingBoundaryTemplates,

    #[error("the target-presence strategy needs templates.monsters or templates.monsters_dir")]
    MissingMonsterTemplates,
}

/// Which navigation strategy decides when to turn around.
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
pub enum StrategyKind {
    /// Turn around past the left/right boundary markers.
    #[default]
    Boundary,
    /// Turn around when no monster lies ahead.
    TargetPresence,
}

/// Which monster set the target-presence strategy inspects.
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
pub enum MonsterScope {
    /// Only monsters on the character's platform (with fallback).
    #[default]
    Platform,
    /// Every monster seen in the latest frame.
    All,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub keys: KeyBindings,
    pub skills: Vec<SkillConfig>,
    pub attack: ActionConfig,
    pub pickup: ActionConfig,
    pub templates: TemplatePaths,
    pub tracking: TrackingConfig,
    pub navigation: NavigationConfig,
    pub timing: TimingConfig,
    pub debug: DebugConfig,
    /// Seed for the interval/pulse random stream. Random when unset.
    pub seed: Option<u64>,
}

impl BotConfig {
    /// Check every cross-field constraint before the bot is assembled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.tracking.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Threshold(threshold));
        }
        if self.tracking.refresh_interval()?.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        if self.keys.left == self.keys.right {
            return Err(ConfigError::SameMovementKey(self.keys.left));
        }

        self.attack.interval("attack")?;
        self.pickup.interval("pickup")?;
        for (i, skill) in self.skills.iter().enumerate() {
            skill.interval(&format!("skills[{i}]"))?;
        }
        self.timing.pulse_width()?;
        self.timing.poll_interval()?;
        self.timing.movement_reassert()?;
        self.timing.start_delay()?;

        match self.navigation.strategy {
            StrategyKind::Boundary => {
                if self.templates.left_boundary.is_none() || self.templates.right_boundary.is_none()
                {
                    return Err(ConfigError::MissingBoundaryTemplates);
                }
            }
            StrategyKind::TargetPresence => {
                if self.templates.monsters.is_empty() && self.templates.monsters_dir.is_none() {
                    return Err(ConfigError::MissingMonsterTemplates);
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub left: Key,
    pub right: Key,
    pub attack: Key,
    pub pickup: Key,
    /// Hotkey that stops the loop.
    pub stop: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: Key::Left,
            right: Key::Right,
            attack: Key::Control,
            pickup: Key::Char('z'),
            stop: Key::Function(12),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    pub key: Key,
    pub min_interval: f64,
    pub max_interval: f64,
    /// Label used in logs; defaults to the key name.
    #[serde(default)]
    pub name: Option<String>,
}

impl SkillConfig {
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.key.to_string())
    }

    pub fn interval(&self, field: &str) -> Result<IntervalSpec, ConfigError> {
        uniform_interval(field, self.min_interval, self.max_interval)
    }
}

/// Randomized interval for the attack or pickup pulse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub enabled: bool,
    pub min_interval: f64,
    pub max_interval: f64,
}

impl ActionConfig {
    pub fn interval(&self, field: &str) -> Result<IntervalSpec, ConfigError> {
        uniform_interval(field, self.min_interval, self.max_interval)
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval: 0.15,
            max_interval: 0.25,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatePaths {
    pub character: PathBuf,
    pub left_boundary: Option<PathBuf>,
    pub right_boundary: Option<PathBuf>,
    pub monsters: Vec<PathBuf>,
    /// Every png/jpg/jpeg in this directory is a monster template.
    pub monsters_dir: Option<PathBuf>,
}

impl Default for TemplatePaths {
    fn default() -> Self {
        Self {
            character: PathBuf::from("resources/character.png"),
            left_boundary: Some(PathBuf::from("resources/left_boundary.png")),
            right_boundary: Some(PathBuf::from("resources/right_boundary.png")),
            monsters: Vec::new(),
            monsters_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub threshold: f32,
    pub refresh_interval: f64,
    /// Max vertical distance (px) between a monster and the character for the
    /// monster to count as on the same platform.
    pub vertical_tolerance: u32,
    /// Point of a matched box used as the entity's position. Unset follows
    /// the navigation strategy: top-left for boundary, center otherwise.
    pub anchor: Option<Anchor>,
}

impl TrackingConfig {
    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        seconds("tracking.refresh_interval", self.refresh_interval)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            refresh_interval: 0.25,
            vertical_tolerance: 120,
            anchor: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub strategy: StrategyKind,
    pub monster_scope: MonsterScope,
    pub initial_direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval: f64,
    pub pulse_min: f64,
    pub pulse_max: f64,
    /// Re-press the held movement key this often; 0 disables.
    pub movement_reassert: f64,
    /// Countdown before the loop starts, to focus the game window.
    pub start_delay: f64,
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        seconds("timing.poll_interval", self.poll_interval)
    }

    pub fn pulse_width(&self) -> Result<IntervalSpec, ConfigError> {
        uniform_interval("timing.pulse", self.pulse_min, self.pulse_max)
    }

    pub fn movement_reassert(&self) -> Result<Option<Duration>, ConfigError> {
        let interval = seconds("timing.movement_reassert", self.movement_reassert)?;
        Ok((!interval.is_zero()).then_some(interval))
    }

    pub fn start_delay(&self) -> Result<Duration, ConfigError> {
        seconds("timing.start_delay", self.start_delay)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: 0.01,
            pulse_min: 0.05,
            pulse_max: 0.08,
            movement_reassert: 1.0,
            start_delay: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: PathBuf::from("debug"),
        }
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration {
        field: field.to_string(),
        value,
    })
}

fn uniform_interval(field: &str, min: f64, max: f64) -> Result<IntervalSpec, ConfigError> {
    let lo = seconds(&format!("{field}.min_interval"), min)?;
    let hi = seconds(&format!("{field}.max_interval"), max)?;
    if lo > hi {
        return Err(ConfigError::InvertedInterval {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(IntervalSpec::uniform(lo, hi))
}
