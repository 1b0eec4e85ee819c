//! Annotated screenshots and JSON sidecars for calibrating templates.
//!
//! Artifacts are write-only: the bot never reads them back. Write failures
//! are reported to the caller, which logs them and keeps running.
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontRef;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::Serialize;
use thiserror::Error;

use crate::capture::PreparedFrame;
use crate::geometry::Point;
use crate::template::Template;
use crate::tracker::RefreshReport;

const CHARACTER_COLOR: Rgb<u8> = Rgb([0, 220, 0]);
const BOUNDARY_COLOR: Rgb<u8> = Rgb([0, 160, 255]);
const MONSTER_COLOR: Rgb<u8> = Rgb([255, 60, 60]);
const BAR_BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
const BAR_HEIGHT: u32 = 4;
const LABEL_SCALE: f32 = 12.0;
const LABEL_LINE: i32 = 13;

static LABEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("failed to create debug directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to serialize refresh record")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectionKind {
    Character,
    Boundary,
    Monster,
}

/// One template lookup from a refresh cycle, as drawn on the screenshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub kind: DetectionKind,
    pub template: String,
    /// Top-left of the matched box; `None` when below the threshold.
    pub top_left: Option<Point>,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl Detection {
    pub fn found(&self) -> bool {
        self.top_left.is_some()
    }

    /// Position and confidence lines printed under the box.
    fn label(&self) -> Option<[String; 2]> {
        let at = self.top_left?;
        Some([
            format!("Pos: ({}, {}) Size: {}x{}", at.x, at.y, self.width, self.height),
            format!("Conf: {:.2}", self.confidence),
        ])
    }

    fn color(&self) -> Rgb<u8> {
        match self.kind {
            DetectionKind::Character => CHARACTER_COLOR,
            DetectionKind::Boundary => BOUNDARY_COLOR,
            DetectionKind::Monster => MONSTER_COLOR,
        }
    }
}

#[derive(Serialize)]
struct RefreshRecord<'a> {
    cycle: u64,
    at_secs: f64,
    monster_fallback: bool,
    detections: &'a [Detection],
}

/// Draw a box around every found detection, with a confidence bar above it
/// and its position and confidence printed below it.
pub fn annotate(frame: &RgbImage, detections: &[Detection]) -> RgbImage {
    let font = FontRef::try_from_slice(LABEL_FONT)
        .inspect_err(|err| tracing::warn!("label font unusable, drawing boxes only: {err}"))
        .ok();

    let mut canvas = frame.clone();
    for detection in detections {
        let Some(at) = detection.top_left else {
            continue;
        };
        if detection.width == 0 || detection.height == 0 {
            continue;
        }

        let color = detection.color();
        let bounds = Rect::at(at.x, at.y).of_size(detection.width, detection.height);
        draw_hollow_rect_mut(&mut canvas, bounds, color);

        let bar_y = at.y - BAR_HEIGHT as i32 - 1;
        let track = Rect::at(at.x, bar_y).of_size(detection.width, BAR_HEIGHT);
        draw_filled_rect_mut(&mut canvas, track, BAR_BACKGROUND);

        let filled = (detection.confidence.clamp(0.0, 1.0) * detection.width as f32).round() as u32;
        if filled > 0 {
            let bar = Rect::at(at.x, bar_y).of_size(filled, BAR_HEIGHT);
            draw_filled_rect_mut(&mut canvas, bar, color);
        }

        if let (Some(font), Some(lines)) = (font.as_ref(), detection.label()) {
            let mut y = at.y + detection.height as i32 + 2;
            for line in &lines {
                draw_text_mut(&mut canvas, color, at.x, y, LABEL_SCALE, font, line);
                y += LABEL_LINE;
            }
        }
    }
    canvas
}

/// Writes debug artifacts into one directory.
#[derive(Debug)]
pub struct DebugSink {
    dir: PathBuf,
    written: u64,
}

impl DebugSink {
    /// Create the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DebugError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| DebugError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of refresh screenshots written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write `refresh_NNNNNN.png` and its `.json` sidecar for one cycle.
    pub fn write_refresh(
        &mut self,
        frame: &PreparedFrame,
        report: &RefreshReport,
    ) -> Result<PathBuf, DebugError> {
        let stem = format!("refresh_{:06}", report.cycle);
        let image_path = self.dir.join(format!("{stem}.png"));
        save_png(&annotate(frame.rgb(), &report.detections), &image_path)?;

        let record = RefreshRecord {
            cycle: report.cycle,
            at_secs: report.at.as_secs_f64(),
            monster_fallback: report.monster_fallback,
            detections: &report.detections,
        };
        let json_path = self.dir.join(format!("{stem}.json"));
        let json = serde_json::to_vec_pretty(&record)?;
        fs::write(&json_path, json).map_err(|source| DebugError::Write {
            path: json_path,
            source,
        })?;

        self.written += 1;
        Ok(image_path)
    }

    /// Dump the frame in which a template could not be found, next to the
    /// template itself.
    pub fn write_lookup_failure(
        &self,
        frame: &PreparedFrame,
        template: &Template,
    ) -> Result<PathBuf, DebugError> {
        let frame_path = self
            .dir
            .join(format!("lookup_failure_{}_frame.png", template.name()));
        save_png(frame.rgb(), &frame_path)?;

        let template_path = self
            .dir
            .join(format!("lookup_failure_{}_template.png", template.name()));
        save_png(template.rgb(), &template_path)?;
        Ok(frame_path)
    }
}

fn save_png(image: &RgbImage, path: &Path) -> Result<(), DebugError> {
    image.save(path).map_err(|source| DebugError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn detection(kind: DetectionKind, top_left: Option<Point>) -> Detection {
        Detection {
            kind,
            template: kind.to_string(),
            top_left,
            width: 10,
            height: 8,
            confidence: 0.5,
        }
    }

    #[test]
    fn annotate_draws_found_boxes_only() {
        let frame = RgbImage::new(60, 60);
        let detections = [
            detection(DetectionKind::Character, Some(Point::new(20, 20))),
            detection(DetectionKind::Monster, None),
        ];

        let canvas = annotate(&frame, &detections);

        assert_eq!(*canvas.get_pixel(20, 20), CHARACTER_COLOR);
        assert_eq!(*canvas.get_pixel(29, 27), CHARACTER_COLOR);
        // half-confidence bar: first pixels filled, tail left as background
        assert_eq!(*canvas.get_pixel(20, 15), CHARACTER_COLOR);
        assert_eq!(*canvas.get_pixel(29, 15), BAR_BACKGROUND);
        assert!(canvas.pixels().all(|p| *p != MONSTER_COLOR));
    }

    #[test]
    fn labels_print_position_size_and_confidence_under_the_box() {
        let found = detection(DetectionKind::Character, Some(Point::new(20, 20)));
        assert_eq!(
            found.label(),
            Some([
                "Pos: (20, 20) Size: 10x8".to_string(),
                "Conf: 0.50".to_string()
            ])
        );
        assert_eq!(detection(DetectionKind::Monster, None).label(), None);

        let canvas = annotate(&RgbImage::new(200, 80), &[found]);

        // text rows start two pixels under the box (y 28)
        let inked = (30..60)
            .flat_map(|y| (20..200).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y).0[1] > 0)
            .count();
        assert!(inked > 20, "only {inked} label pixels drawn");
        assert!((0..200).all(|x| canvas.get_pixel(x, 79).0 == [0, 0, 0]));
    }

    #[test]
    fn labels_past_the_bottom_edge_are_clipped() {
        let detections = [detection(DetectionKind::Monster, Some(Point::new(2, 30)))];
        let canvas = annotate(&RgbImage::new(40, 40), &detections);
        assert_eq!(*canvas.get_pixel(2, 30), MONSTER_COLOR);
    }

    #[test]
    fn boxes_at_the_frame_edge_are_clipped() {
        let frame = RgbImage::new(12, 12);
        let detections = [detection(DetectionKind::Boundary, Some(Point::new(0, 0)))];

        let canvas = annotate(&frame, &detections);

        assert_eq!(*canvas.get_pixel(0, 0), BOUNDARY_COLOR);
    }

    #[test]
    fn refresh_writes_image_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DebugSink::new(dir.path().join("debug")).unwrap();
        let frame = PreparedFrame::new(RgbImage::new(40, 40));
        let report = RefreshReport {
            cycle: 3,
            at: Duration::from_millis(750),
            detections: vec![detection(DetectionKind::Character, Some(Point::new(5, 10)))],
            monster_fallback: false,
        };

        let path = sink.write_refresh(&frame, &report).unwrap();

        assert!(path.ends_with("refresh_000003.png"));
        assert!(path.exists());
        let json = fs::read_to_string(sink.dir().join("refresh_000003.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cycle"], 3);
        assert_eq!(value["detections"][0]["kind"], "character");
        assert_eq!(value["detections"][0]["top_left"]["x"], 5);
        assert_eq!(sink.written(), 1);
    }

    #[test]
    fn lookup_failure_dumps_frame_and_template() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DebugSink::new(dir.path()).unwrap();
        let frame = PreparedFrame::new(RgbImage::new(20, 20));
        let template = Template::new("character", RgbImage::new(4, 4));

        sink.write_lookup_failure(&frame, &template).unwrap();

        assert!(dir.path().join("lookup_failure_character_frame.png").exists());
        assert!(dir.path().join("lookup_failure_character_template.png").exists());
    }
}
