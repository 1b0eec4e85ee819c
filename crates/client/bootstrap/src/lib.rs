//! Shared bootstrap utilities for the bot client.
//!
//! Reads launch settings from the environment, loads the config file and
//! templates, and assembles a [`bot_core::Bot`] around whichever capture and
//! input backends the binary selected.
pub mod builder;
pub mod config;
pub mod countdown;

pub use builder::{Backends, BotAssembler, BotSetup};
pub use config::{ConfigOverrides, LaunchConfig};
pub use countdown::countdown;
