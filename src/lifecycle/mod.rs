//! Scene lifecycle: phase sequencing, the single-active-scene invariant and interruption handling.

/// Scene lifecycle manager.
pub mod manager;
/// Lifecycle phase names.
pub mod phase;
