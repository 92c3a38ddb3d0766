use crate::foundation::error::{CineError, CineResult};

/// Easing functions used to map normalized transition progress.
///
/// Serialized names follow CSS where one exists (`"linear"`, `"ease-in-out"`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    /// Linear interpolation.
    Linear,
    /// Quadratic ease-in.
    #[serde(alias = "in-quad")]
    EaseIn,
    /// Quadratic ease-out.
    #[serde(alias = "out-quad")]
    EaseOut,
    /// Quadratic ease-in/out.
    #[default]
    #[serde(alias = "in-out-quad")]
    EaseInOut,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    InOutCubic,
}

impl Ease {
    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
        }
    }

    /// Parse an easing name such as `"ease-in-out"` or `"linear"`.
    pub fn parse(name: &str) -> CineResult<Self> {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        match name.as_str() {
            "linear" => Ok(Self::Linear),
            "ease-in" | "in-quad" => Ok(Self::EaseIn),
            "ease-out" | "out-quad" => Ok(Self::EaseOut),
            "ease-in-out" | "in-out-quad" | "ease" => Ok(Self::EaseInOut),
            "in-cubic" => Ok(Self::InCubic),
            "out-cubic" => Ok(Self::OutCubic),
            "in-out-cubic" => Ok(Self::InOutCubic),
            other => Err(CineError::config(format!("unknown easing '{other}'"))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
