use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::animation::ease::Ease;
use crate::foundation::error::{CineError, CineResult};
use crate::scene::container::SceneContainer;

/// Duration of the default handoff.
pub const DEFAULT_TRANSITION_MS: u64 = 500;

/// Blur radius used by the `blur` effect when `blurAmount` is not set.
pub const DEFAULT_BLUR_PX: f64 = 10.0;

/// Pseudo-type that skips the transition engine entirely.
pub const CUT: &str = "cut";

/// Travel direction for `slide` and `wipe`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward the left edge; the incoming scene enters from the right.
    #[default]
    Left,
    /// Toward the right edge.
    Right,
    /// Toward the top edge.
    Up,
    /// Toward the bottom edge.
    Down,
}

impl Direction {
    /// Unit vector of travel in screen space (y grows downward).
    pub fn unit(self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
        }
    }
}

/// How control is visually handed from one scene to the next.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionConfig {
    /// Effect type: one of the built-ins, a registered custom effect, or `"cut"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Effect length in milliseconds; must be > 0 for anything but `"cut"`.
    #[serde(rename = "duration", default = "default_duration")]
    pub duration_ms: u64,
    /// Curve applied to linear progress.
    #[serde(default)]
    pub easing: Ease,
    /// Travel direction for `slide` / `wipe`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Peak blur radius for `blur`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur_amount: Option<f64>,
}

fn default_duration() -> u64 {
    DEFAULT_TRANSITION_MS
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self::new("crossfade", DEFAULT_TRANSITION_MS)
    }
}

impl TransitionConfig {
    /// `kind` over `duration_ms` with the default ease-in-out curve.
    pub fn new(kind: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            kind: kind.into(),
            duration_ms,
            easing: Ease::EaseInOut,
            direction: None,
            blur_amount: None,
        }
    }

    /// Crossfade over `duration_ms`.
    pub fn crossfade(duration_ms: u64) -> Self {
        Self::new("crossfade", duration_ms)
    }

    /// Slide toward `direction`.
    pub fn slide(duration_ms: u64, direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            ..Self::new("slide", duration_ms)
        }
    }

    /// Wipe toward `direction`.
    pub fn wipe(duration_ms: u64, direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            ..Self::new("wipe", duration_ms)
        }
    }

    /// Blur through `amount` pixels at the midpoint.
    pub fn blur(duration_ms: u64, amount: f64) -> Self {
        Self {
            blur_amount: Some(amount),
            ..Self::new("blur", duration_ms)
        }
    }

    /// Instant handoff with no effect.
    pub fn cut() -> Self {
        Self::new(CUT, 0)
    }

    /// Replace the easing curve.
    pub fn with_easing(mut self, easing: Ease) -> Self {
        self.easing = easing;
        self
    }

    /// Normalized effect type used for registry lookups.
    pub fn kind_key(&self) -> String {
        normalize_kind(&self.kind)
    }

    /// `true` for the `"cut"` pseudo-type.
    pub fn is_cut(&self) -> bool {
        self.kind_key() == CUT
    }

    /// Structural checks that do not depend on which effects are registered.
    pub fn validate(&self) -> CineResult<()> {
        if self.kind_key().is_empty() {
            return Err(CineError::config("transition type must be non-empty"));
        }
        if !self.is_cut() && self.duration_ms == 0 {
            return Err(CineError::config(format!(
                "transition '{}' duration must be > 0 ms",
                self.kind
            )));
        }
        if let Some(b) = self.blur_amount
            && (!b.is_finite() || b < 0.0)
        {
            return Err(CineError::config("blurAmount must be finite and >= 0"));
        }
        Ok(())
    }
}

pub(crate) fn normalize_kind(kind: &str) -> String {
    kind.trim().to_ascii_lowercase()
}

/// One sampled instant of a running transition.
pub struct EffectFrame<'a> {
    /// Linear time progress in `[0, 1]`.
    pub progress: f64,
    /// `progress` mapped through the configured easing.
    pub eased: f64,
    /// The configuration being executed.
    pub config: &'a TransitionConfig,
    /// Outgoing container; `None` when nothing was on stage.
    pub from: Option<&'a SceneContainer>,
    /// Incoming container.
    pub to: &'a SceneContainer,
}

/// A visual handoff effect.
///
/// The engine owns timing, progress reporting and cancellation; an effect only maps one sampled
/// instant onto the two containers. `apply` at `eased == 1.0` must leave the incoming container
/// in its resting style.
pub trait TransitionEffect: Send + Sync {
    /// Write both containers' styles for this instant.
    fn apply(&self, frame: &EffectFrame<'_>);
}

impl<F> TransitionEffect for F
where
    F: Fn(&EffectFrame<'_>) + Send + Sync,
{
    fn apply(&self, frame: &EffectFrame<'_>) {
        self(frame)
    }
}

/// Opacity handoff; `from.opacity + to.opacity == 1` at every instant.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crossfade;

impl TransitionEffect for Crossfade {
    fn apply(&self, frame: &EffectFrame<'_>) {
        let e = frame.eased;
        if let Some(from) = frame.from {
            from.update(|s| s.opacity = 1.0 - e);
        }
        frame.to.update(|s| s.opacity = e);
    }
}

/// Incoming pushes the outgoing scene off-screen.
#[derive(Clone, Copy, Debug, Default)]
pub struct Slide;

impl TransitionEffect for Slide {
    fn apply(&self, frame: &EffectFrame<'_>) {
        let e = frame.eased;
        let (ux, uy) = frame.config.direction.unwrap_or_default().unit();
        if let Some(from) = frame.from {
            from.update(|s| {
                s.translate_x = ux * e * 100.0;
                s.translate_y = uy * e * 100.0;
            });
        }
        frame.to.update(|s| {
            s.opacity = 1.0;
            s.translate_x = -ux * (1.0 - e) * 100.0;
            s.translate_y = -uy * (1.0 - e) * 100.0;
        });
    }
}

/// Outgoing grows and fades while the incoming scene scales up from half size.
#[derive(Clone, Copy, Debug, Default)]
pub struct Zoom;

impl TransitionEffect for Zoom {
    fn apply(&self, frame: &EffectFrame<'_>) {
        let e = frame.eased;
        if let Some(from) = frame.from {
            from.update(|s| {
                s.scale = 1.0 + 0.5 * e;
                s.opacity = 1.0 - e;
            });
        }
        frame.to.update(|s| {
            s.scale = 0.5 + 0.5 * e;
            s.opacity = e;
        });
    }
}

/// Incoming scene revealed by a moving clip edge over the static outgoing scene.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wipe;

impl TransitionEffect for Wipe {
    fn apply(&self, frame: &EffectFrame<'_>) {
        let hidden = (1.0 - frame.eased) * 100.0;
        let dir = frame.config.direction.unwrap_or_default();
        frame.to.update(|s| {
            s.opacity = 1.0;
            s.clip = Default::default();
            match dir {
                Direction::Left => s.clip.left = hidden,
                Direction::Right => s.clip.right = hidden,
                Direction::Up => s.clip.top = hidden,
                Direction::Down => s.clip.bottom = hidden,
            }
        });
    }
}

/// Complementary dissolve masks on both containers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dissolve;

impl TransitionEffect for Dissolve {
    fn apply(&self, frame: &EffectFrame<'_>) {
        let e = frame.eased;
        if let Some(from) = frame.from {
            from.update(|s| s.dissolve = 1.0 - e);
        }
        frame.to.update(|s| {
            s.opacity = 1.0;
            s.dissolve = e;
        });
    }
}

/// Outgoing blurs out while the incoming scene sharpens in.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blur;

impl TransitionEffect for Blur {
    fn apply(&self, frame: &EffectFrame<'_>) {
        let e = frame.eased;
        let amount = frame.config.blur_amount.unwrap_or(DEFAULT_BLUR_PX);
        if let Some(from) = frame.from {
            from.update(|s| {
                s.blur_px = amount * e;
                s.opacity = 1.0 - e;
            });
        }
        frame.to.update(|s| {
            s.blur_px = amount * (1.0 - e);
            s.opacity = e;
        });
    }
}

/// The six built-in effects keyed by type name.
pub(crate) fn builtin_effects() -> [(&'static str, Arc<dyn TransitionEffect>); 6] {
    let effects: [(&'static str, Arc<dyn TransitionEffect>); 6] = [
        ("crossfade", Arc::new(Crossfade)),
        ("slide", Arc::new(Slide)),
        ("zoom", Arc::new(Zoom)),
        ("wipe", Arc::new(Wipe)),
        ("dissolve", Arc::new(Dissolve)),
        ("blur", Arc::new(Blur)),
    ];
    effects
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
