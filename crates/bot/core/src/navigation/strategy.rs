use crate::geometry::{Anchor, Direction, Point};
use crate::tracker::MonsterSighting;

/// Snapshot of tracked positions handed to a strategy.
///
/// Positions sit at the strategy's [`anchor`](NavigationStrategy::anchor)
/// unless the deployment overrides it. `None` means the entity has never been
/// located; a stale position is reported as its last known value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationView<'a> {
    pub character: Option<Point>,
    pub left_boundary: Option<Point>,
    pub right_boundary: Option<Point>,
    /// Monster set selected by the deployment's scope (platform or all).
    pub monsters: &'a [MonsterSighting],
}

/// Decides whether the character should turn around.
///
/// Implementations are stateless; the heading lives in the policy.
pub trait NavigationStrategy {
    /// True when the character should reverse `heading`.
    fn should_reverse(&self, view: &NavigationView<'_>, heading: Direction) -> bool;

    /// Point of a matched box the strategy's comparisons are written against.
    fn anchor(&self) -> Anchor;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;

    /// Short description for startup logs.
    fn description(&self) -> &'static str;
}
