//! Offline backend for calibrating templates and thresholds.
//!
//! Frames come from a directory of screenshots, keys are only logged, and
//! the run ends after a fixed number of ticks.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bot_core::{
    CaptureError, Frame, FrameSource, InputDevice, InputError, Key, StopAfterTicks, SystemClock,
};
use client_bootstrap::Backends;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn backends(dir: &Path, ticks: u64) -> Result<Backends> {
    let frames = ReplayFrames::open(dir)?;
    tracing::info!(
        "Replaying {} screenshots from {} for {} ticks",
        frames.len(),
        dir.display(),
        ticks
    );
    Ok(Backends {
        frames: Box::new(frames),
        input: Box::new(DryRunInput::default()),
        stop: Box::new(StopAfterTicks::new(ticks)),
        clock: Box::new(SystemClock::new()),
    })
}

/// Screenshots in file-name order, cycling back to the first after the last.
pub struct ReplayFrames {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ReplayFrames {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read replay directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.iter().any(|k| ext.eq_ignore_ascii_case(k)));
            if is_frame && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            anyhow::bail!("No screenshots (png/jpg/jpeg) found in {}", dir.display());
        }
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ReplayFrames {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let path = &self.paths[self.next];
        self.next = (self.next + 1) % self.paths.len();

        let image = image::open(path)
            .map_err(|e| CaptureError::Backend(format!("{}: {e}", path.display())))?;
        tracing::trace!("Replaying {}", path.display());
        Ok(image.to_rgb8())
    }
}

/// Logs key events instead of sending them.
#[derive(Debug, Default)]
pub struct DryRunInput {
    presses: u64,
}

impl DryRunInput {
    pub fn presses(&self) -> u64 {
        self.presses
    }
}

impl InputDevice for DryRunInput {
    fn press(&mut self, key: Key) -> Result<(), InputError> {
        self.presses += 1;
        tracing::debug!("[dry-run] press {key}");
        Ok(())
    }

    fn release(&mut self, key: Key) -> Result<(), InputError> {
        tracing::debug!("[dry-run] release {key}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_frames_cycle_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "002.png", 20);
        write_frame(dir.path(), "001.png", 10);
        std::fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let mut frames = ReplayFrames::open(dir.path()).unwrap();
        assert_eq!(frames.len(), 2);

        let shades: Vec<u8> = (0..3)
            .map(|_| frames.capture().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 10]);
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReplayFrames::open(dir.path()).is_err());
    }

    #[test]
    fn test_deleted_frame_is_a_capture_error() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "001.png", 10);
        let mut frames = ReplayFrames::open(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join("001.png")).unwrap();

        assert!(matches!(frames.capture(), Err(CaptureError::Backend(_))));
    }

    #[test]
    fn test_dry_run_counts_presses() {
        let mut input = DryRunInput::default();
        input.press(Key::Left).unwrap();
        input.release(Key::Left).unwrap();
        assert_eq!(input.presses(), 1);
    }
}
