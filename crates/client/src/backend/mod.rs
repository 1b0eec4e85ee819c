//! Backend selection: replayed screenshots or the live desktop.

#[cfg(feature = "desktop")]
pub mod desktop;
pub mod replay;

use anyhow::Result;
use bot_core::BotConfig;
use client_bootstrap::{Backends, LaunchConfig};

/// Backends plus whether they drive a real keyboard.
pub struct Selection {
    pub backends: Backends,
    pub name: &'static str,
    /// True when keys go to the focused window, so the start delay applies.
    pub interactive: bool,
}

/// Replay when `FARMBOT_REPLAY_DIR` is set, the desktop otherwise.
pub fn select(launch: &LaunchConfig, config: &BotConfig) -> Result<Selection> {
    if let Some(dir) = &launch.replay_dir {
        return Ok(Selection {
            backends: replay::backends(dir, launch.replay_ticks)?,
            name: "replay",
            interactive: false,
        });
    }

    live(config)
}

#[cfg(feature = "desktop")]
fn live(config: &BotConfig) -> Result<Selection> {
    Ok(Selection {
        backends: desktop::backends(config.keys.stop)?,
        name: "desktop",
        interactive: true,
    })
}

#[cfg(not(feature = "desktop"))]
fn live(_config: &BotConfig) -> Result<Selection> {
    anyhow::bail!(
        "farmbot was built without the `desktop` feature; set FARMBOT_REPLAY_DIR to a \
         directory of screenshots or rebuild with `--features desktop`"
    )
}
