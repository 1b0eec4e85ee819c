//! Template matching by normalized cross-correlation.
//!
//! [`NccMatcher`] scores windows with the mean-subtracted coefficient over all
//! three color channels, so a confidence near 1 means the template's pattern
//! and colors are really there. Scores below zero (anti-correlated windows)
//! are reported as 0, keeping every confidence in `[0, 1]`. Locations are the
//! top-left pixel of the matched window.
use serde::Serialize;

use crate::capture::PreparedFrame;
use crate::correlation;
use crate::geometry::Point;
use crate::template::Template;

/// Outcome of a best-match lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    pub location: Option<Point>,
    /// Best score seen, reported even when below the threshold.
    pub confidence: f32,
}

impl MatchResult {
    /// Accept `confidence` only if it strictly exceeds `threshold`.
    pub fn from_score(location: Point, confidence: f32, threshold: f32) -> Self {
        if confidence > threshold {
            Self {
                found: true,
                location: Some(location),
                confidence,
            }
        } else {
            Self {
                found: false,
                location: None,
                confidence,
            }
        }
    }

    pub const fn not_found() -> Self {
        Self {
            found: false,
            location: None,
            confidence: 0.0,
        }
    }
}

/// One window scoring at or above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Match {
    pub location: Point,
    pub confidence: f32,
}

/// Locates templates inside a prepared frame.
pub trait TemplateMatcher {
    /// Best-scoring window; found iff its score is strictly above `threshold`.
    /// Ties keep the first window in row-major order.
    fn match_best(&self, frame: &PreparedFrame, template: &Template, threshold: f32)
    -> MatchResult;

    /// Every window scoring at or above `threshold`, in row-major order.
    /// Overlapping windows are not merged.
    fn match_all(&self, frame: &PreparedFrame, template: &Template, threshold: f32) -> Vec<Match>;
}

/// Default matcher: color NCC through a frequency-domain correlation, with
/// the frame transform cached on the [`PreparedFrame`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NccMatcher;

impl NccMatcher {
    /// Score every window position, row-major. Empty when the template does
    /// not fit inside the frame.
    fn scores(frame: &PreparedFrame, template: &Template) -> Vec<Match> {
        let (fw, fh) = frame.rgb().dimensions();
        let (tw, th) = template.rgb().dimensions();
        if tw == 0 || th == 0 || tw > fw || th > fh {
            return Vec::new();
        }

        let Some(scores) = correlation::match_color(frame.rgb(), frame.spectrum(), template.rgb())
        else {
            return Vec::new();
        };

        scores
            .enumerate_pixels()
            .map(|(x, y, score)| Match {
                location: Point::new(x as i32, y as i32),
                confidence: score.0[0].max(0.0),
            })
            .collect()
    }
}

impl TemplateMatcher for NccMatcher {
    fn match_best(
        &self,
        frame: &PreparedFrame,
        template: &Template,
        threshold: f32,
    ) -> MatchResult {
        let mut best: Option<Match> = None;
        for candidate in Self::scores(frame, template) {
            if best.is_none_or(|b| candidate.confidence > b.confidence) {
                best = Some(candidate);
            }
        }

        match best {
            Some(best) => MatchResult::from_score(best.location, best.confidence, threshold),
            None => MatchResult::not_found(),
        }
    }

    fn match_all(&self, frame: &PreparedFrame, template: &Template, threshold: f32) -> Vec<Match> {
        Self::scores(frame, template)
            .into_iter()
            .filter(|m| m.confidence >= threshold)
            .collect()
    }
}
