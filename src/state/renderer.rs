use std::fmt;

use crate::state::machine::MachineState;

/// Playback state of a [`crate::Renderer`]. `Destroyed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererState {
    /// Constructed, presentation not yet validated.
    Idle,
    /// Presentation validated, nothing mounted.
    Ready,
    /// Timeline advancing.
    Playing,
    /// Timeline frozen, scene still mounted.
    Paused,
    /// Timeline reset, current scene torn down.
    Stopped,
    /// Terminal.
    Destroyed,
}

impl MachineState for RendererState {
    fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Idle,
            Self::Ready,
            Self::Playing,
            Self::Paused,
            Self::Stopped,
            Self::Destroyed,
        ]
    }

    // Idle has no direct edge to Destroyed: an un-initialized renderer only moves to Ready.
    fn default_edges() -> Vec<(Self, Self)> {
        use RendererState::*;
        vec![
            (Idle, Ready),
            (Ready, Playing),
            (Playing, Paused),
            (Paused, Playing),
            (Playing, Stopped),
            (Paused, Stopped),
            (Stopped, Playing),
            (Ready, Destroyed),
            (Playing, Destroyed),
            (Paused, Destroyed),
            (Stopped, Destroyed),
        ]
    }
}

impl fmt::Display for RendererState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/renderer.rs"]
mod tests;
