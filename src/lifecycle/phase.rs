use std::fmt;

use serde::Serialize;

/// The five phases a scene passes through on its way on and off stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Preload assets.
    Prepare,
    /// Create and mount layer instances.
    Mount,
    /// Activate layers and start audio.
    Play,
    /// Deactivate layers, destroy instances' resources, stop audio.
    Unmount,
    /// Drop layer instances.
    Destroy,
}

impl Phase {
    /// Lowercase phase name as used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Mount => "mount",
            Self::Play => "play",
            Self::Unmount => "unmount",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
