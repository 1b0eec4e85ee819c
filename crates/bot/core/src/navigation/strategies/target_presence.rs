//! Keep walking while there is something to hit ahead.

use crate::geometry::{Anchor, Direction};
use crate::navigation::{NavigationStrategy, NavigationView};

/// Turn around when no tracked monster lies ahead of the character.
///
/// "Ahead" is strict: a monster at the character's own x does not count.
/// With the character never located there is nothing to compare against, so
/// the heading is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetPresenceStrategy;

impl NavigationStrategy for TargetPresenceStrategy {
    fn should_reverse(&self, view: &NavigationView<'_>, heading: Direction) -> bool {
        let Some(character) = view.character else {
            return false;
        };
        !view
            .monsters
            .iter()
            .any(|monster| heading.is_ahead(character.x, monster.point.x))
    }

    fn anchor(&self) -> Anchor {
        Anchor::Center
    }

    fn name(&self) -> &'static str {
        "target-presence"
    }

    fn description(&self) -> &'static str {
        "Turns around when no monster remains ahead"
    }
}
