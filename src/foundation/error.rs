use crate::lifecycle::phase::Phase;

/// Convenience result type used across cinestage.
pub type CineResult<T> = Result<T, CineError>;

/// Coarse error class surfaced to the renderer/application layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Invalid state edge or single-active-scene violation.
    State,
    /// A scene lifecycle phase failed.
    Lifecycle,
    /// Configuration, serialization and collaborator (asset/audio/layer) failures.
    Rendering,
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum CineError {
    /// Invalid state transition or invariant violation.
    #[error("state error: {0}")]
    State(String),

    /// A lifecycle phase failed; `source` is the underlying cause.
    #[error("Failed to execute {phase} phase: {source}")]
    Lifecycle {
        /// The phase that was running.
        phase: Phase,
        /// Underlying cause.
        source: Box<CineError>,
    },

    /// Invalid transition or presentation configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Failure reported by an external collaborator (layer, asset loader, audio).
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl CineError {
    /// Build a [`CineError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`CineError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`CineError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Wrap `cause` as a failure of `phase`.
    pub fn lifecycle(phase: Phase, cause: CineError) -> Self {
        Self::Lifecycle {
            phase,
            source: Box::new(cause),
        }
    }

    /// Discriminant exposed to callers for routing/reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::State(_) => ErrorCategory::State,
            Self::Lifecycle { .. } => ErrorCategory::Lifecycle,
            Self::Config(_) | Self::Serde(_) | Self::Collaborator(_) => ErrorCategory::Rendering,
        }
    }

    /// The phase this error was raised from, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Lifecycle { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
