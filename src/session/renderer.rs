use std::sync::Arc;

use crate::effects::transitions::TransitionConfig;
use crate::foundation::core::{FrameContext, Quality, Viewport};
use crate::foundation::error::{CineError, CineResult};
use crate::lifecycle::manager::{LifecycleDeps, LifecycleOpts, SceneLifecycleManager};
use crate::scene::model::{PresentationSpec, SceneHandle};
use crate::state::machine::{ListenerId, StateMachine};
use crate::state::renderer::RendererState;

/// Options controlling playback.
#[derive(Clone, Debug)]
pub struct RendererOpts {
    /// Quality hint forwarded to layers every frame.
    pub quality: Quality,
    /// Physical pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    /// Move to the next scene once the current one has played for its `duration`, and stop after
    /// the last one.
    pub auto_advance: bool,
    /// Lifecycle manager options. The viewport is taken from the presentation.
    pub lifecycle: LifecycleOpts,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            quality: Quality::Medium,
            device_pixel_ratio: 1.0,
            auto_advance: true,
            lifecycle: LifecycleOpts::default(),
        }
    }
}

/// Playback counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Frames forwarded to layers.
    pub frames: u64,
    /// Successful scene activations.
    pub scenes_entered: u64,
}

struct SceneEntry {
    handle: SceneHandle,
    duration_ms: f64,
    transition: Option<TransitionConfig>,
}

/// Playback facade over a presentation: renderer state machine plus scene lifecycle.
///
/// The renderer is driven by the host through [`Renderer::tick`]; it owns no clock of its own.
pub struct Renderer {
    machine: StateMachine<RendererState>,
    manager: Arc<SceneLifecycleManager>,
    opts: RendererOpts,
    viewport: Viewport,
    pending: Option<PresentationSpec>,
    default_transition: Option<TransitionConfig>,
    scenes: Vec<SceneEntry>,
    current: Option<usize>,
    frame: Option<FrameContext>,
    elapsed_ms: f64,
    stats: PlaybackStats,
}

impl Renderer {
    /// Renderer in `Idle` over `spec`. Nothing is validated until [`Self::initialize`].
    pub fn new(spec: PresentationSpec, deps: LifecycleDeps, opts: RendererOpts) -> Self {
        let lifecycle = LifecycleOpts {
            viewport: spec.viewport,
            ..opts.lifecycle
        };
        Self {
            machine: StateMachine::new(RendererState::Idle),
            manager: Arc::new(SceneLifecycleManager::new(deps, lifecycle)),
            opts,
            viewport: spec.viewport,
            pending: Some(spec),
            default_transition: None,
            scenes: Vec::new(),
            current: None,
            frame: None,
            elapsed_ms: 0.0,
            stats: PlaybackStats::default(),
        }
    }

    /// Parse `json` and build a renderer over it.
    pub fn from_json(json: &str, deps: LifecycleDeps, opts: RendererOpts) -> CineResult<Self> {
        Ok(Self::new(PresentationSpec::from_json(json)?, deps, opts))
    }

    /// Validate the presentation and move `Idle -> Ready`.
    pub async fn initialize(&mut self) -> CineResult<()> {
        self.machine.ensure_can_transition(RendererState::Ready)?;
        let spec = self
            .pending
            .take()
            .ok_or_else(|| CineError::state("presentation already consumed"))?;
        if let Err(e) = spec.validate() {
            self.pending = Some(spec);
            return Err(e);
        }

        self.default_transition = spec.default_transition;
        self.scenes = spec
            .scenes
            .into_iter()
            .map(|scene| SceneEntry {
                duration_ms: scene.duration,
                transition: scene.transition.clone(),
                handle: SceneHandle::new(scene),
            })
            .collect();
        self.machine.transition(RendererState::Ready).await?;
        tracing::info!(scenes = self.scenes.len(), "renderer ready");
        Ok(())
    }

    /// Start or resume playback. The first scene is activated on the first `play`.
    pub async fn play(&mut self) -> CineResult<()> {
        self.machine.ensure_can_transition(RendererState::Playing)?;
        if self.current.is_none() {
            self.elapsed_ms = 0.0;
            self.enter(0, None).await?;
        }
        self.machine.transition(RendererState::Playing).await
    }

    /// Freeze the timeline; the current scene stays mounted.
    pub async fn pause(&mut self) -> CineResult<()> {
        self.machine.transition(RendererState::Paused).await
    }

    /// Tear down the current scene; the next `play` starts over from the first scene.
    pub async fn stop(&mut self) -> CineResult<()> {
        self.machine.ensure_can_transition(RendererState::Stopped)?;
        self.leave().await?;
        self.machine.transition(RendererState::Stopped).await
    }

    /// Tear everything down. Terminal.
    pub async fn destroy(&mut self) -> CineResult<()> {
        self.machine.ensure_can_transition(RendererState::Destroyed)?;
        self.manager.cancel_transition();
        self.leave().await?;
        self.machine.transition(RendererState::Destroyed).await?;
        tracing::info!(
            frames = self.stats.frames,
            scenes_entered = self.stats.scenes_entered,
            "renderer destroyed"
        );
        Ok(())
    }

    /// Jump to `scene_id`, using `transition`, else the scene's own, else the presentation default.
    pub async fn go_to(
        &mut self,
        scene_id: &str,
        transition: Option<TransitionConfig>,
    ) -> CineResult<()> {
        self.ensure_live()?;
        let index = self
            .scenes
            .iter()
            .position(|s| s.handle.id() == scene_id)
            .ok_or_else(|| CineError::config(format!("unknown scene '{scene_id}'")))?;
        self.enter(index, transition).await
    }

    /// Advance to the next scene. Returns `false` when already on the last one.
    pub async fn next_scene(&mut self) -> CineResult<bool> {
        self.ensure_live()?;
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.scenes.len() {
            return Ok(false);
        }
        self.enter(next, None).await?;
        Ok(true)
    }

    /// Advance the timeline by `delta_ms` while playing and forward a frame to the active scene.
    pub async fn tick(&mut self, delta_ms: f64) -> CineResult<()> {
        if self.machine.get_state() != RendererState::Playing {
            return Ok(());
        }
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            return Err(CineError::config("tick delta must be finite and >= 0"));
        }

        let frame = self
            .frame
            .unwrap_or_else(|| {
                FrameContext::first(self.viewport, self.opts.quality, self.opts.device_pixel_ratio)
            })
            .advanced(delta_ms);
        self.frame = Some(frame);
        self.elapsed_ms += delta_ms;
        self.manager.update_frame(&frame).await?;
        self.stats.frames += 1;

        let Some(index) = self.current else {
            return Ok(());
        };
        if self.opts.auto_advance && frame.time_ms >= self.scenes[index].duration_ms {
            if index + 1 < self.scenes.len() {
                self.enter(index + 1, None).await?;
            } else {
                tracing::info!(elapsed_ms = self.elapsed_ms, "presentation finished");
                self.stop().await?;
            }
        }
        Ok(())
    }

    /// Subscribe to renderer state changes.
    pub fn on_state_change(
        &mut self,
        listener: impl Fn(RendererState, RendererState) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ListenerId {
        self.machine.on_change(listener)
    }

    /// Current renderer state.
    pub fn state(&self) -> RendererState {
        self.machine.get_state()
    }

    /// Id of the scene the timeline is on.
    pub fn current_scene_id(&self) -> Option<&str> {
        self.current.map(|i| self.scenes[i].handle.id())
    }

    /// Time into the current scene, in milliseconds.
    pub fn current_time(&self) -> f64 {
        self.frame.map_or(0.0, |f| f.time_ms)
    }

    /// Time played since the last start, in milliseconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed_ms
    }

    /// Scene ids in playback order (empty before `initialize`).
    pub fn scene_ids(&self) -> Vec<&str> {
        self.scenes.iter().map(|s| s.handle.id()).collect()
    }

    /// Playback counters.
    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    /// The underlying lifecycle manager.
    pub fn manager(&self) -> &Arc<SceneLifecycleManager> {
        &self.manager
    }

    fn ensure_live(&self) -> CineResult<()> {
        match self.machine.get_state() {
            RendererState::Idle | RendererState::Destroyed => Err(CineError::state(format!(
                "renderer is {}; cannot change scenes",
                self.machine.get_state()
            ))),
            _ => Ok(()),
        }
    }

    async fn enter(&mut self, index: usize, transition: Option<TransitionConfig>) -> CineResult<()> {
        let entry = &self.scenes[index];
        let config = transition
            .or_else(|| entry.transition.clone())
            .or_else(|| self.default_transition.clone());
        let handle = entry.handle.clone();
        self.manager.activate_scene(&handle, config).await?;
        self.current = Some(index);
        self.frame = None;
        self.stats.scenes_entered += 1;
        Ok(())
    }

    async fn leave(&mut self) -> CineResult<()> {
        if let Some(index) = self.current.take() {
            let handle = self.scenes[index].handle.clone();
            self.manager.deactivate_scene(&handle).await?;
        }
        self.frame = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/renderer.rs"]
mod tests;
