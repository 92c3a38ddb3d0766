//! Scene handoff effects and the engine that runs them.

/// Cooperative cancellation.
pub mod cancel;
/// Tick loop, registry and cancellation plumbing.
pub mod engine;
/// Transition configuration and the built-in effects.
pub mod transitions;
