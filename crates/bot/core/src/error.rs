//! Fatal errors that terminate the control loop.
//!
//! Per-tick misses (a boundary or monster not matched, an empty monster set
//! after platform filtering, a failed debug write) are absorbed where they
//! happen and only logged. Everything here ends the run.
use thiserror::Error;

use crate::capture::CaptureError;
use crate::input::{InputError, Key};

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("bot requires a {0} before building")]
    MissingComponent(&'static str),

    #[error("screen capture unavailable")]
    Capture(#[source] CaptureError),

    #[error("character template '{template}' was not found on screen and has no known position")]
    CharacterNotFound { template: String },

    #[error("input device failed to {action} key '{key}'")]
    Input {
        action: &'static str,
        key: Key,
        #[source]
        source: InputError,
    },
}

impl BotError {
    pub(crate) fn input(action: &'static str, key: Key) -> impl FnOnce(InputError) -> Self {
        move |source| BotError::Input {
            action,
            key,
            source,
        }
    }
}
