//! Launch settings read from the process environment.
use std::env;
use std::path::PathBuf;

use bot_core::{BotConfig, StrategyKind};

const DEFAULT_CONFIG_PATH: &str = "farmbot.toml";
const DEFAULT_REPLAY_TICKS: u64 = 500;

/// Where to find the config file and which backend to run.
#[derive(Clone, Debug)]
pub struct LaunchConfig {
    pub config_path: PathBuf,
    pub session_id: Option<String>,
    pub log_dir: Option<PathBuf>,
    /// Run against screenshots in this directory instead of the desktop.
    pub replay_dir: Option<PathBuf>,
    pub replay_ticks: u64,
    pub overrides: ConfigOverrides,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            session_id: None,
            log_dir: None,
            replay_dir: None,
            replay_ticks: DEFAULT_REPLAY_TICKS,
            overrides: ConfigOverrides::default(),
        }
    }
}

impl LaunchConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `FARMBOT_CONFIG` - Path to the TOML config (default: `farmbot.toml`)
    /// - `FARMBOT_SESSION_ID` - Session identifier for log files (default: timestamp)
    /// - `FARMBOT_LOG_DIR` - Directory for log files (default: platform-specific)
    /// - `FARMBOT_REPLAY_DIR` - Replay screenshots from a directory instead of the desktop
    /// - `FARMBOT_REPLAY_TICKS` - Ticks before a replay run stops (default: 500)
    /// - `FARMBOT_DEBUG`, `FARMBOT_STRATEGY`, `FARMBOT_SEED`, `FARMBOT_START_DELAY`,
    ///   `FARMBOT_THRESHOLD` - Override the matching config file settings
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("FARMBOT_CONFIG") {
            config.config_path = PathBuf::from(path);
        }
        config.session_id = lookup("FARMBOT_SESSION_ID").filter(|id| !id.is_empty());
        config.log_dir = lookup("FARMBOT_LOG_DIR").map(PathBuf::from);
        config.replay_dir = lookup("FARMBOT_REPLAY_DIR").map(PathBuf::from);
        if let Some(ticks) = read_env::<u64>(&lookup, "FARMBOT_REPLAY_TICKS") {
            config.replay_ticks = ticks.max(1);
        }

        config.overrides = ConfigOverrides {
            debug: read_env_bool(&lookup, "FARMBOT_DEBUG"),
            strategy: read_env::<StrategyKind>(&lookup, "FARMBOT_STRATEGY"),
            seed: read_env::<u64>(&lookup, "FARMBOT_SEED"),
            start_delay: read_env::<f64>(&lookup, "FARMBOT_START_DELAY"),
            threshold: read_env::<f32>(&lookup, "FARMBOT_THRESHOLD"),
        };

        config
    }
}

/// Config-file settings replaced from the environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigOverrides {
    pub debug: Option<bool>,
    pub strategy: Option<StrategyKind>,
    pub seed: Option<u64>,
    pub start_delay: Option<f64>,
    pub threshold: Option<f32>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut BotConfig) {
        if let Some(debug) = self.debug {
            config.debug.enabled = debug;
        }
        if let Some(strategy) = self.strategy {
            config.navigation.strategy = strategy;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(delay) = self.start_delay {
            config.timing.start_delay = delay;
        }
        if let Some(threshold) = self.threshold {
            config.tracking.threshold = threshold;
        }
    }
}

fn read_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring {key}={value:?}: not a valid value");
            None
        }
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`; a set but empty variable
/// counts as true.
fn read_env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let value = lookup(key)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Ignoring {key}={value:?}: expected a boolean");
            None
        }
    }
}
