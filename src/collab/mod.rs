//! Collaborator contracts the lifecycle manager drives: layers, asset preloading and audio.

/// Asset preloading used by the prepare phase.
pub mod assets;
/// Scene audio playback.
pub mod audio;
/// Layer trait and factory registry.
pub mod layers;
