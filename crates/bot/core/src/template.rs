//! Reference bitmaps located by the matcher.
use image::RgbImage;

use crate::geometry::{Anchor, Point};

/// A named reference bitmap, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    rgb: RgbImage,
}

impl Template {
    pub fn new(name: impl Into<String>, rgb: RgbImage) -> Self {
        Self {
            name: name.into(),
            rgb,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Position of a match whose top-left corner is `top_left`.
    pub fn anchored(&self, top_left: Point, anchor: Anchor) -> Point {
        anchor.locate(top_left, self.width(), self.height())
    }
}

/// Every template the tracker looks for.
///
/// Boundaries are optional: deployments navigating by target presence do not
/// need them. Monsters may be empty for boundary-only deployments.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub character: Template,
    pub left_boundary: Option<Template>,
    pub right_boundary: Option<Template>,
    pub monsters: Vec<Template>,
}

impl TemplateSet {
    pub fn new(character: Template) -> Self {
        Self {
            character,
            left_boundary: None,
            right_boundary: None,
            monsters: Vec::new(),
        }
    }

    pub fn with_boundaries(mut self, left: Template, right: Template) -> Self {
        self.left_boundary = Some(left);
        self.right_boundary = Some(right);
        self
    }

    pub fn with_monsters(mut self, monsters: Vec<Template>) -> Self {
        self.monsters = monsters;
        self
    }

    /// Number of templates matched per refresh.
    pub fn template_count(&self) -> usize {
        1 + usize::from(self.left_boundary.is_some())
            + usize::from(self.right_boundary.is_some())
            + self.monsters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_uses_half_template_size() {
        let template = Template::new("slime", RgbImage::new(10, 7));
        let at = Point::new(100, 50);
        assert_eq!(template.anchored(at, Anchor::Center), Point::new(105, 53));
        assert_eq!(template.anchored(at, Anchor::TopLeft), at);
    }

    #[test]
    fn set_counts_optional_members() {
        let set = TemplateSet::new(Template::new("character", RgbImage::new(2, 2)))
            .with_monsters(vec![
                Template::new("a", RgbImage::new(2, 2)),
                Template::new("b", RgbImage::new(2, 2)),
            ]);
        assert_eq!(set.template_count(), 3);
    }
}
