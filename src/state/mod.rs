//! Finite state machines: the generic validator plus the renderer and scene state sets.

/// Generic table-driven state machine.
pub mod machine;
/// Renderer playback states.
pub mod renderer;
/// Per-scene lifecycle states and the single-active-scene tracker.
pub mod scene;
