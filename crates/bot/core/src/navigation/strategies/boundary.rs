//! Patrol between two boundary markers.

use crate::geometry::{Anchor, Direction};
use crate::navigation::{NavigationStrategy, NavigationView};

/// Turn around once the character passes the boundary it is heading toward.
///
/// Moving right, reverse when `character.x > right_boundary.x`; moving left,
/// reverse when `character.x < left_boundary.x`. Nothing happens until both
/// the character and that boundary have been located. Positions compare the
/// top-left corners of the matched boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryStrategy;

impl NavigationStrategy for BoundaryStrategy {
    fn should_reverse(&self, view: &NavigationView<'_>, heading: Direction) -> bool {
        let Some(character) = view.character else {
            return false;
        };
        match heading {
            Direction::Right => view.right_boundary.is_some_and(|b| character.x > b.x),
            Direction::Left => view.left_boundary.is_some_and(|b| character.x < b.x),
        }
    }

    fn anchor(&self) -> Anchor {
        Anchor::TopLeft
    }

    fn name(&self) -> &'static str {
        "boundary"
    }

    fn description(&self) -> &'static str {
        "Walks between the left and right boundary markers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn view(character: i32, left: Option<i32>, right: Option<i32>) -> NavigationView<'static> {
        NavigationView {
            character: Some(Point::new(character, 300)),
            left_boundary: left.map(|x| Point::new(x, 300)),
            right_boundary: right.map(|x| Point::new(x, 300)),
            monsters: &[],
        }
    }

    #[test]
    fn past_right_boundary_reverses() {
        assert!(BoundaryStrategy.should_reverse(&view(100, Some(10), Some(90)), Direction::Right));
    }

    #[test]
    fn short_of_right_boundary_keeps_heading() {
        assert!(!BoundaryStrategy.should_reverse(&view(100, Some(10), Some(110)), Direction::Right));
    }

    #[test]
    fn exactly_on_boundary_keeps_heading() {
        assert!(!BoundaryStrategy.should_reverse(&view(90, Some(10), Some(90)), Direction::Right));
        assert!(!BoundaryStrategy.should_reverse(&view(10, Some(10), Some(90)), Direction::Left));
    }

    #[test]
    fn past_left_boundary_reverses() {
        assert!(BoundaryStrategy.should_reverse(&view(5, Some(10), Some(90)), Direction::Left));
    }

    #[test]
    fn only_the_boundary_ahead_matters() {
        // heading left while beyond the right marker is fine
        assert!(!BoundaryStrategy.should_reverse(&view(100, Some(10), Some(90)), Direction::Left));
    }

    #[test]
    fn unknown_positions_never_reverse() {
        assert!(!BoundaryStrategy.should_reverse(&view(100, None, None), Direction::Right));
        let blind = NavigationView {
            character: None,
            ..view(0, Some(10), Some(90))
        };
        assert!(!BoundaryStrategy.should_reverse(&blind, Direction::Left));
    }
}
