//! Farming bot binary.
//!
//! Composition root: reads launch settings from the environment (and `.env`),
//! sets up logging, loads the config file and templates, picks the replay or
//! desktop backend, waits out the start delay, and runs the control loop
//! until the stop hotkey (or tick limit) ends it.
//!
//! # Examples
//!
//! ```bash
//! # Calibrate against saved screenshots with debug output
//! FARMBOT_REPLAY_DIR=captures FARMBOT_DEBUG=1 cargo run -p farm-client
//!
//! # Drive the real game
//! cargo run -p farm-client --features desktop
//! ```

use anyhow::Result;
use bot_core::SystemClock;
use client_bootstrap::{BotAssembler, LaunchConfig, countdown};
use farm_client::{backend, logging};

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let launch = LaunchConfig::from_env();
    let _log_guard = logging::setup_logging(launch.session_id.as_deref(), launch.log_dir.as_deref())?;

    tracing::info!("Config file: {}", launch.config_path.display());
    let assembler = BotAssembler::new(launch);
    let config = assembler.load_config()?;

    let selection = backend::select(assembler.launch(), &config)?;
    tracing::info!("Backend: {}", selection.name);

    let setup = assembler.build(config, selection.backends)?;
    if selection.interactive {
        countdown(setup.start_delay, &SystemClock::new());
    }

    let mut bot = setup.bot;
    match bot.run() {
        Ok(summary) => {
            tracing::info!(
                "Finished heading {} after {} ticks",
                summary.final_direction,
                summary.ticks
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!("Bot stopped: {err}");
            Err(err.into())
        }
    }
}
