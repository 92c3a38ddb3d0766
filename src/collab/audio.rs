use async_trait::async_trait;

use crate::scene::model::AudioTrackSpec;

/// Plays scene audio. Tracks start in the play phase and stop in the unmount phase.
#[async_trait]
pub trait AudioController: Send + Sync {
    /// Start `track` for `scene_id`.
    async fn start_track(&self, scene_id: &str, track: &AudioTrackSpec) -> anyhow::Result<()>;

    /// Stop track `track_id` of `scene_id`. Stopping a track that is not playing is not an error.
    async fn stop_track(&self, scene_id: &str, track_id: &str) -> anyhow::Result<()>;
}

/// Controller that produces no sound and only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

#[async_trait]
impl AudioController for SilentAudio {
    async fn start_track(&self, scene_id: &str, track: &AudioTrackSpec) -> anyhow::Result<()> {
        tracing::debug!(scene = scene_id, track = %track.id, volume = track.volume, "audio start");
        Ok(())
    }

    async fn stop_track(&self, scene_id: &str, track_id: &str) -> anyhow::Result<()> {
        tracing::debug!(scene = scene_id, track = track_id, "audio stop");
        Ok(())
    }
}
