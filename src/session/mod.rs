/// Playback facade over a presentation.
pub mod renderer;
