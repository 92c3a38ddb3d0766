use crate::foundation::error::{CineError, CineResult};

/// Output surface size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Create a validated viewport with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> CineResult<Self> {
        if width == 0 || height == 0 {
            return Err(CineError::config("viewport width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Render quality hint forwarded to layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Cheapest path, e.g. while scrubbing.
    Low,
    /// Balanced default.
    #[default]
    Medium,
    /// Full fidelity.
    High,
}

/// Per-frame context handed to [`crate::Layer::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    /// Time since the active scene started, in milliseconds.
    pub time_ms: f64,
    /// Time since the previous frame, in milliseconds.
    pub delta_ms: f64,
    /// Quality hint.
    pub quality: Quality,
    /// Output surface size.
    pub viewport: Viewport,
    /// Physical pixels per CSS pixel.
    pub device_pixel_ratio: f64,
}

impl FrameContext {
    /// Context for the first frame of a scene.
    pub fn first(viewport: Viewport, quality: Quality, device_pixel_ratio: f64) -> Self {
        Self {
            time_ms: 0.0,
            delta_ms: 0.0,
            quality,
            viewport,
            device_pixel_ratio,
        }
    }

    /// Advance by `delta_ms`, returning the next frame's context.
    pub fn advanced(self, delta_ms: f64) -> Self {
        Self {
            time_ms: self.time_ms + delta_ms,
            delta_ms,
            ..self
        }
    }
}
