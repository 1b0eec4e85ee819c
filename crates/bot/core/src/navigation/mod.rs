//! Direction decisions for the side-scrolling patrol.
//!
//! A [`NavigationPolicy`] owns the current [`Direction`] and consults one
//! [`NavigationStrategy`] per tick to decide whether to turn around.

mod policy;
mod strategy;
pub mod strategies;

pub use policy::NavigationPolicy;
pub use strategy::{NavigationStrategy, NavigationView};
