/// Viewport, quality and per-frame context.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod sync;
