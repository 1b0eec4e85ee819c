//! Rate-limited position tracking from screen frames.
//!
//! One refresh captures exactly one frame and matches every template against
//! it. Lookups that miss keep the previous position; only a character that
//! has never been seen is fatal.
use std::time::Duration;

use serde::Serialize;

use crate::capture::{FrameSource, PreparedFrame};
use crate::config::MonsterScope;
use crate::debug::{Detection, DetectionKind};
use crate::error::{BotError, Result};
use crate::geometry::{Anchor, Point};
use crate::matcher::TemplateMatcher;
use crate::navigation::NavigationView;
use crate::template::{Template, TemplateSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Matching threshold shared by every template.
    pub threshold: f32,
    /// Minimum time between two refreshes.
    pub refresh_interval: Duration,
    /// Max `|monster.y - character.y|` for a monster on the same platform.
    pub vertical_tolerance: u32,
    /// Point of each matched box reported as the entity's position.
    pub anchor: Anchor,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            refresh_interval: Duration::from_millis(250),
            vertical_tolerance: 120,
            anchor: Anchor::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EntityState {
    /// Never located.
    Unknown,
    /// Located in the latest refresh.
    Found,
    /// Located before, missed since.
    Stale,
}

/// A confirmed position (at the tracker's anchor) and when it was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackedPosition {
    pub point: Point,
    pub cycle: u64,
    pub at: Duration,
    pub confidence: f32,
}

/// Last known position of one entity plus how many refreshes missed it.
#[derive(Debug, Clone, Default)]
pub struct TrackedEntity {
    last: Option<TrackedPosition>,
    misses: u32,
}

impl TrackedEntity {
    pub fn last(&self) -> Option<&TrackedPosition> {
        self.last.as_ref()
    }

    pub fn position(&self) -> Option<Point> {
        self.last.map(|p| p.point)
    }

    /// Consecutive refreshes without a match since the last confirmation.
    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn state(&self) -> EntityState {
        match (self.last, self.misses) {
            (None, _) => EntityState::Unknown,
            (Some(_), 0) => EntityState::Found,
            (Some(_), _) => EntityState::Stale,
        }
    }

    fn confirm(&mut self, position: TrackedPosition) {
        self.last = Some(position);
        self.misses = 0;
    }

    fn miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }
}

/// One monster instance, positioned at the tracker's anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonsterSighting {
    pub template: String,
    pub point: Point,
    pub confidence: f32,
}

/// What one refresh cycle saw.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub cycle: u64,
    pub at: Duration,
    pub detections: Vec<Detection>,
    /// The platform filter came up empty and the previous set was kept.
    pub monster_fallback: bool,
}

/// Keep sightings within `tolerance` pixels of `character_y` (inclusive).
pub fn filter_by_platform(
    sightings: &[MonsterSighting],
    character_y: i32,
    tolerance: u32,
) -> Vec<MonsterSighting> {
    sightings
        .iter()
        .filter(|s| s.point.y.abs_diff(character_y) <= tolerance)
        .cloned()
        .collect()
}

pub struct PositionTracker {
    source: Box<dyn FrameSource>,
    matcher: Box<dyn TemplateMatcher>,
    templates: TemplateSet,
    settings: TrackerSettings,

    character: TrackedEntity,
    left_boundary: TrackedEntity,
    right_boundary: TrackedEntity,
    /// Platform-filtered monsters, falling back to the prior set when empty.
    platform_monsters: Vec<MonsterSighting>,
    /// Every monster seen in the latest frame.
    raw_monsters: Vec<MonsterSighting>,

    cycle: u64,
    last_refresh: Option<Duration>,
    latest_frame: Option<PreparedFrame>,
}

impl PositionTracker {
    pub fn new(
        source: Box<dyn FrameSource>,
        matcher: Box<dyn TemplateMatcher>,
        templates: TemplateSet,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            source,
            matcher,
            templates,
            settings,
            character: TrackedEntity::default(),
            left_boundary: TrackedEntity::default(),
            right_boundary: TrackedEntity::default(),
            platform_monsters: Vec::new(),
            raw_monsters: Vec::new(),
            cycle: 0,
            last_refresh: None,
            latest_frame: None,
        }
    }

    /// Refresh if at least `refresh_interval` has passed since the last one.
    /// Between intervals this returns immediately with `None`.
    pub fn refresh_if_due(&mut self, now: Duration) -> Result<Option<RefreshReport>> {
        let due = self
            .last_refresh
            .is_none_or(|last| now.saturating_sub(last) >= self.settings.refresh_interval);
        if !due {
            return Ok(None);
        }
        self.refresh(now).map(Some)
    }

    /// Capture one frame and update every tracked entity from it.
    ///
    /// Fails with [`BotError::Capture`] if the frame source fails, and with
    /// [`BotError::CharacterNotFound`] if the character misses and has no
    /// previous position. The failing frame stays available through
    /// [`latest_frame`](Self::latest_frame).
    pub fn refresh(&mut self, now: Duration) -> Result<RefreshReport> {
        let frame = PreparedFrame::new(self.source.capture().map_err(BotError::Capture)?);
        self.cycle += 1;
        self.last_refresh = Some(now);

        let threshold = self.settings.threshold;
        let anchor = self.settings.anchor;
        let cycle = self.cycle;
        let mut detections = Vec::with_capacity(self.templates.template_count());

        let character = lookup(
            self.matcher.as_ref(),
            &frame,
            &self.templates.character,
            threshold,
            anchor,
            DetectionKind::Character,
            &mut detections,
        );
        update(&mut self.character, character, cycle, now);

        for (template, entity) in [
            (&self.templates.left_boundary, &mut self.left_boundary),
            (&self.templates.right_boundary, &mut self.right_boundary),
        ] {
            if let Some(template) = template {
                let found = lookup(
                    self.matcher.as_ref(),
                    &frame,
                    template,
                    threshold,
                    anchor,
                    DetectionKind::Boundary,
                    &mut detections,
                );
                update(entity, found, cycle, now);
            }
        }

        let mut raw = Vec::new();
        for template in &self.templates.monsters {
            for hit in self.matcher.match_all(&frame, template, threshold) {
                detections.push(Detection {
                    kind: DetectionKind::Monster,
                    template: template.name().to_string(),
                    top_left: Some(hit.location),
                    width: template.width(),
                    height: template.height(),
                    confidence: hit.confidence,
                });
                raw.push(MonsterSighting {
                    template: template.name().to_string(),
                    point: template.anchored(hit.location, anchor),
                    confidence: hit.confidence,
                });
            }
        }

        self.latest_frame = Some(frame);

        let Some(character) = self.character.position() else {
            tracing::error!(
                "character template '{}' not found (best confidence {:.3}, threshold {:.2})",
                self.templates.character.name(),
                detections.first().map_or(0.0, |d| d.confidence),
                threshold
            );
            return Err(BotError::CharacterNotFound {
                template: self.templates.character.name().to_string(),
            });
        };

        let platform = filter_by_platform(&raw, character.y, self.settings.vertical_tolerance);
        let monster_fallback = platform.is_empty() && !self.platform_monsters.is_empty();
        if monster_fallback {
            tracing::warn!(
                "no monsters on the character's platform ({} seen in total); keeping previous {}",
                raw.len(),
                self.platform_monsters.len()
            );
        } else {
            self.platform_monsters = platform;
        }
        self.raw_monsters = raw;

        tracing::debug!(
            "refresh #{cycle}: character {} ({}), {} monsters on platform",
            character,
            self.character.state(),
            self.platform_monsters.len()
        );

        Ok(RefreshReport {
            cycle,
            at: now,
            detections,
            monster_fallback,
        })
    }

    pub fn character(&self) -> &TrackedEntity {
        &self.character
    }

    pub fn left_boundary(&self) -> &TrackedEntity {
        &self.left_boundary
    }

    pub fn right_boundary(&self) -> &TrackedEntity {
        &self.right_boundary
    }

    /// Monsters on the character's platform.
    pub fn platform_monsters(&self) -> &[MonsterSighting] {
        &self.platform_monsters
    }

    /// Every monster in the latest frame, unfiltered.
    pub fn raw_monsters(&self) -> &[MonsterSighting] {
        &self.raw_monsters
    }

    /// Frame captured by the most recent refresh.
    pub fn latest_frame(&self) -> Option<&PreparedFrame> {
        self.latest_frame.as_ref()
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Completed refresh cycles.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Positions for the navigation strategies.
    pub fn view(&self, scope: MonsterScope) -> NavigationView<'_> {
        NavigationView {
            character: self.character.position(),
            left_boundary: self.left_boundary.position(),
            right_boundary: self.right_boundary.position(),
            monsters: match scope {
                MonsterScope::Platform => &self.platform_monsters,
                MonsterScope::All => &self.raw_monsters,
            },
        }
    }
}

/// Best match for one template, recorded as a detection. Returns the anchored
/// position and confidence when found.
fn lookup(
    matcher: &dyn TemplateMatcher,
    frame: &PreparedFrame,
    template: &Template,
    threshold: f32,
    anchor: Anchor,
    kind: DetectionKind,
    detections: &mut Vec<Detection>,
) -> Option<(Point, f32)> {
    let result = matcher.match_best(frame, template, threshold);
    detections.push(Detection {
        kind,
        template: template.name().to_string(),
        top_left: result.location,
        width: template.width(),
        height: template.height(),
        confidence: result.confidence,
    });
    result
        .location
        .filter(|_| result.found)
        .map(|at| (template.anchored(at, anchor), result.confidence))
}

fn update(entity: &mut TrackedEntity, found: Option<(Point, f32)>, cycle: u64, at: Duration) {
    match found {
        Some((point, confidence)) => entity.confirm(TrackedPosition {
            point,
            cycle,
            at,
            confidence,
        }),
        None => entity.miss(),
    }
}
