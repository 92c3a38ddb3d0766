//! Boundary scene model and the containers transition effects animate.

/// Per-scene visual container.
pub mod container;
/// Presentation, scene, layer and audio records.
pub mod model;
