//! Built-in navigation strategies.

pub mod boundary;
pub mod target_presence;

pub use boundary::BoundaryStrategy;
pub use target_presence::TargetPresenceStrategy;
