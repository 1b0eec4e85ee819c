//! Owner of the current heading.

use crate::config::StrategyKind;
use crate::geometry::{Anchor, Direction};
use crate::navigation::strategies::{BoundaryStrategy, TargetPresenceStrategy};
use crate::navigation::{NavigationStrategy, NavigationView};

/// Holds the heading and applies the active strategy once per tick.
///
/// The heading is always exactly one of LEFT or RIGHT and only changes here;
/// an evaluation flips it at most once.
pub struct NavigationPolicy {
    strategy: Box<dyn NavigationStrategy>,
    heading: Direction,
    flips: u64,
}

impl NavigationPolicy {
    pub fn new(strategy: Box<dyn NavigationStrategy>, initial: Direction) -> Self {
        Self {
            strategy,
            heading: initial,
            flips: 0,
        }
    }

    /// Policy running one of the built-in strategies.
    pub fn from_kind(kind: StrategyKind, initial: Direction) -> Self {
        let strategy: Box<dyn NavigationStrategy> = match kind {
            StrategyKind::Boundary => Box::new(BoundaryStrategy),
            StrategyKind::TargetPresence => Box::new(TargetPresenceStrategy),
        };
        Self::new(strategy, initial)
    }

    /// Consult the strategy and flip if asked. Returns the new heading when a
    /// flip happened.
    pub fn evaluate(&mut self, view: &NavigationView<'_>) -> Option<Direction> {
        if !self.strategy.should_reverse(view, self.heading) {
            return None;
        }

        let previous = self.heading;
        self.heading = previous.flipped();
        self.flips += 1;
        tracing::info!(
            "{} strategy: turning {} -> {} (character at {})",
            self.strategy.name(),
            previous,
            self.heading,
            view.character
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unknown".into())
        );
        Some(self.heading)
    }

    pub fn direction(&self) -> Direction {
        self.heading
    }

    /// Number of flips since construction.
    pub fn flips(&self) -> u64 {
        self.flips
    }

    pub fn anchor(&self) -> Anchor {
        self.strategy.anchor()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn strategy_description(&self) -> &'static str {
        self.strategy.description()
    }
}
