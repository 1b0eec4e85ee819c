//! File-backed content for the farming bot.
//!
//! Reads the TOML configuration and the template bitmaps it points at. Both
//! are loaded once at startup and handed to `bot-core` as plain values.

pub mod loaders;

pub use loaders::{ConfigLoader, LoadResult, TemplateLoader};
