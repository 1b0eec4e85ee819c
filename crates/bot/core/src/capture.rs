//! Frame source abstraction.
use std::sync::OnceLock;

use image::RgbImage;
use thiserror::Error;

use crate::correlation::FrameSpectrum;

/// Full-screen RGB bitmap.
pub type Frame = RgbImage;

/// Errors raised by a frame source backend. Always fatal to the loop.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no display available for capture")]
    NoDisplay,

    #[error("capture backend failed: {0}")]
    Backend(String),
}

/// Captures a full-screen frame on demand.
///
/// Implementations never retry; a failure is surfaced as-is.
pub trait FrameSource {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}

/// A captured frame plus its spectrum, computed on first use and shared by
/// every template lookup in that refresh.
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    rgb: Frame,
    spectrum: OnceLock<FrameSpectrum>,
}

impl PreparedFrame {
    pub fn new(rgb: Frame) -> Self {
        Self {
            rgb,
            spectrum: OnceLock::new(),
        }
    }

    pub fn rgb(&self) -> &Frame {
        &self.rgb
    }

    pub(crate) fn spectrum(&self) -> &FrameSpectrum {
        self.spectrum.get_or_init(|| FrameSpectrum::new(&self.rgb))
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }
}
