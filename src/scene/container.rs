use std::sync::{Arc, Mutex};

use crate::foundation::sync::lock;

/// Clip inset per edge, in percent of the container size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipInset {
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
    /// Left edge.
    pub left: f64,
}

/// Visual properties of a scene's container that transition effects animate.
///
/// Paint backends read this every frame; translation is in percent of the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerStyle {
    /// Whether the container is painted at all.
    pub visible: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Horizontal offset, percent of viewport width.
    pub translate_x: f64,
    /// Vertical offset, percent of viewport height.
    pub translate_y: f64,
    /// Uniform scale around the center.
    pub scale: f64,
    /// Clip rectangle inset.
    pub clip: ClipInset,
    /// Gaussian blur radius in pixels.
    pub blur_px: f64,
    /// Fraction of pixels shown by the dissolve mask, `1.0` = all.
    pub dissolve: f64,
}

impl Default for ContainerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
            clip: ClipInset::default(),
            blur_px: 0.0,
            dissolve: 1.0,
        }
    }
}

/// Shared handle to one scene's container.
///
/// Cloning yields another handle to the same style.
#[derive(Clone, Debug)]
pub struct SceneContainer {
    scene_id: Arc<str>,
    style: Arc<Mutex<ContainerStyle>>,
}

impl SceneContainer {
    /// Fresh, hidden container for `scene_id`.
    pub fn new(scene_id: &str) -> Self {
        Self {
            scene_id: Arc::from(scene_id),
            style: Arc::new(Mutex::new(ContainerStyle {
                visible: false,
                ..ContainerStyle::default()
            })),
        }
    }

    /// Owning scene id.
    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    /// Snapshot of the current style.
    pub fn style(&self) -> ContainerStyle {
        *lock(&self.style)
    }

    /// Mutate the style in place.
    pub fn update(&self, f: impl FnOnce(&mut ContainerStyle)) {
        f(&mut lock(&self.style));
    }

    /// Back to a visible identity style.
    pub fn reset(&self) {
        *lock(&self.style) = ContainerStyle::default();
    }

    /// Hide without touching other properties.
    pub fn hide(&self) {
        lock(&self.style).visible = false;
    }

    /// `true` when both handles share one style.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.style, &other.style)
    }
}
