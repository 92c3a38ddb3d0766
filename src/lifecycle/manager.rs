use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::collab::assets::{AssetPreloader, NoopPreloader};
use crate::collab::audio::{AudioController, SilentAudio};
use crate::collab::layers::{LayerContext, LayerRegistry};
use crate::effects::cancel::CancelToken;
use crate::effects::engine::{TransitionContext, TransitionEngine, TransitionOutcome};
use crate::effects::transitions::TransitionConfig;
use crate::foundation::core::{FrameContext, Viewport};
use crate::foundation::error::{CineError, CineResult};
use crate::foundation::sync::lock;
use crate::lifecycle::phase::Phase;
use crate::scene::container::SceneContainer;
use crate::scene::model::{LayerRecord, SceneHandle};
use crate::state::scene::{SceneState, SceneStateMachine};

/// Collaborators injected into a [`SceneLifecycleManager`].
#[derive(Clone)]
pub struct LifecycleDeps {
    /// Layer factory used by the mount phase.
    pub layers: Arc<LayerRegistry>,
    /// Asset preloader used by the prepare phase.
    pub assets: Arc<dyn AssetPreloader>,
    /// Audio controller used by the play and unmount phases.
    pub audio: Arc<dyn AudioController>,
    /// Effect runner for scene handoffs.
    pub transitions: Arc<TransitionEngine>,
}

impl Default for LifecycleDeps {
    fn default() -> Self {
        Self::new(LayerRegistry::new())
    }
}

impl LifecycleDeps {
    /// `layers` plus no-op assets, silent audio and a default transition engine.
    pub fn new(layers: LayerRegistry) -> Self {
        Self {
            layers: Arc::new(layers),
            assets: Arc::new(NoopPreloader),
            audio: Arc::new(SilentAudio),
            transitions: Arc::new(TransitionEngine::default()),
        }
    }

    /// Replace the asset preloader.
    pub fn with_assets(mut self, assets: impl AssetPreloader + 'static) -> Self {
        self.assets = Arc::new(assets);
        self
    }

    /// Replace the audio controller.
    pub fn with_audio(mut self, audio: impl AudioController + 'static) -> Self {
        self.audio = Arc::new(audio);
        self
    }

    /// Share an existing transition engine.
    pub fn with_transitions(mut self, transitions: Arc<TransitionEngine>) -> Self {
        self.transitions = transitions;
        self
    }
}

impl fmt::Debug for LifecycleDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleDeps")
            .field("layers", &self.layers)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

/// Lifecycle manager tuning.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LifecycleOpts {
    /// Upper bound for each phase; `None` waits on collaborators indefinitely.
    pub phase_timeout: Option<Duration>,
    /// Viewport handed to layers on mount.
    pub viewport: Viewport,
}

/// The handoff currently animating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveTransition {
    /// Outgoing scene id, if a scene was on stage.
    pub from: Option<String>,
    /// Incoming scene id.
    pub to: String,
}

struct TransitionHandle {
    info: ActiveTransition,
    token: CancelToken,
    // Token of the activation that started this handoff.
    owner: CancelToken,
}

#[derive(Default)]
struct Shared {
    scenes: SceneStateMachine,
    active: Option<SceneHandle>,
    // Token of the newest activation request; cancelled when a newer one arrives.
    latest: Option<CancelToken>,
    transition: Option<TransitionHandle>,
    containers: HashMap<String, SceneContainer>,
}

/// Sole owner of which scene is on stage.
///
/// Activation runs `prepare`, `mount`, the visual handoff and `play` for the incoming scene after
/// the outgoing scene has completed `unmount` and `destroy`. Overlapping activations are resolved
/// as "last request wins": a newer request cancels the running one and waits until its partially
/// mounted target has been torn down before starting.
///
/// Scene-state listeners run while internal state is locked and must not call back into the
/// manager.
pub struct SceneLifecycleManager {
    deps: LifecycleDeps,
    opts: LifecycleOpts,
    shared: Mutex<Shared>,
    gate: tokio::sync::Mutex<()>,
}

impl SceneLifecycleManager {
    /// Manager over `deps`.
    pub fn new(deps: LifecycleDeps, opts: LifecycleOpts) -> Self {
        Self {
            deps,
            opts,
            shared: Mutex::new(Shared::default()),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Injected collaborators.
    pub fn deps(&self) -> &LifecycleDeps {
        &self.deps
    }

    /// Bring `scene` on stage, handing off from the current scene with `transition`
    /// (crossfade 500 ms when `None`, no effect for `"cut"`).
    ///
    /// Resolves `Ok(())` without activating `scene` when a newer activation supersedes this one.
    #[tracing::instrument(skip(self, scene, transition), fields(scene = scene.id()))]
    pub async fn activate_scene(
        &self,
        scene: &SceneHandle,
        transition: Option<TransitionConfig>,
    ) -> CineResult<()> {
        let config = transition.unwrap_or_default();
        config.validate()?;
        if !config.is_cut() && !self.deps.transitions.supports(&config.kind) {
            return Err(CineError::config(format!(
                "unsupported transition type '{}'",
                config.kind
            )));
        }

        let token = CancelToken::new();
        {
            let mut shared = lock(&self.shared);
            if let Some(prev) = shared.latest.replace(token.clone()) {
                prev.cancel();
            }
            if let Some(t) = &shared.transition {
                t.token.cancel();
            }
        }

        let _activation = ActivationGuard {
            shared: &self.shared,
            token: token.clone(),
        };
        let _gate = self.gate.lock().await;
        if token.is_cancelled() {
            tracing::debug!("activation superseded before it started");
            return Ok(());
        }
        self.run_activation(scene, &config, &token).await
    }

    async fn run_activation(
        &self,
        scene: &SceneHandle,
        config: &TransitionConfig,
        token: &CancelToken,
    ) -> CineResult<()> {
        let id = scene.id();
        let previous = lock(&self.shared).active.clone();
        if previous.as_ref().is_some_and(|p| p.id() == id) {
            tracing::debug!("scene already active");
            return Ok(());
        }

        let from = match &previous {
            Some(prev) => {
                self.teardown(prev).await?;
                Some(self.container_for(prev.id()))
            }
            None => None,
        };

        self.reclaim(scene).await?;
        let container = self.container_for(id);
        if token.is_cancelled() {
            return self.abandon(scene, &container, from.as_ref()).await;
        }

        self.run_phase(Phase::Prepare, self.prepare(scene)).await?;
        if token.is_cancelled() {
            return self.abandon(scene, &container, from.as_ref()).await;
        }
        self.run_phase(Phase::Mount, self.mount(scene, &container)).await?;
        if token.is_cancelled() {
            return self.abandon(scene, &container, from.as_ref()).await;
        }

        container.reset();
        if !config.is_cut() {
            let outcome = self
                .hand_off(config, from.clone(), &container, previous.as_ref(), id, token)
                .await?;
            if token.is_cancelled() {
                return self.abandon(scene, &container, from.as_ref()).await;
            }
            if outcome == TransitionOutcome::Cancelled {
                container.reset();
            }
        }
        if let Some(from) = &from {
            from.hide();
        }

        {
            let mut shared = lock(&self.shared);
            shared.scenes.set_scene_state(id, SceneState::Active)?;
            shared.active = Some(scene.clone());
        }
        self.run_phase(Phase::Play, self.play(scene)).await?;
        tracing::info!(from = ?previous.as_ref().map(|p| p.id()), "scene activated");
        Ok(())
    }

    async fn hand_off(
        &self,
        config: &TransitionConfig,
        from: Option<SceneContainer>,
        to: &SceneContainer,
        previous: Option<&SceneHandle>,
        id: &str,
        token: &CancelToken,
    ) -> CineResult<TransitionOutcome> {
        let effect_token = CancelToken::new();
        lock(&self.shared).transition = Some(TransitionHandle {
            info: ActiveTransition {
                from: previous.map(|p| p.id().to_string()),
                to: id.to_string(),
            },
            token: effect_token.clone(),
            owner: token.clone(),
        });
        if token.is_cancelled() {
            effect_token.cancel();
        }

        let ctx = TransitionContext::new(from, to.clone()).with_token(effect_token);
        let outcome = self.deps.transitions.execute_transition(config, ctx).await;
        lock(&self.shared).transition = None;
        outcome
    }

    /// Run `unmount` and `destroy` on `scene`. A scene that is not active is left alone.
    #[tracing::instrument(skip(self, scene), fields(scene = scene.id()))]
    pub async fn deactivate_scene(&self, scene: &SceneHandle) -> CineResult<()> {
        let _gate = self.gate.lock().await;
        if !lock(&self.shared).scenes.is_scene_active(scene.id()) {
            tracing::debug!("scene not active; nothing to deactivate");
            return Ok(());
        }
        self.teardown(scene).await?;
        self.container_for(scene.id()).hide();
        tracing::info!("scene deactivated");
        Ok(())
    }

    /// Forward a frame to every active layer of the active scene.
    pub async fn update_frame(&self, frame: &FrameContext) -> CineResult<()> {
        let Some(active) = self.get_active_scene() else {
            return Ok(());
        };
        let mut scene = active.lock().await;
        for layer in scene.layers.iter_mut().filter(|l| l.active) {
            if let Some(instance) = layer.instance.as_mut() {
                instance.update(frame)?;
            }
        }
        Ok(())
    }

    /// Handle of the scene currently on stage.
    pub fn get_active_scene(&self) -> Option<SceneHandle> {
        lock(&self.shared).active.clone()
    }

    /// Id of the scene currently on stage.
    pub fn get_active_scene_id(&self) -> Option<String> {
        lock(&self.shared).active.as_ref().map(|s| s.id().to_string())
    }

    /// Lifecycle state of `scene_id`; unknown ids are `Created`.
    pub fn get_scene_state(&self, scene_id: &str) -> SceneState {
        lock(&self.shared).scenes.get_scene_state(scene_id)
    }

    /// Snapshot of every tracked scene state.
    pub fn get_all_scene_states(&self) -> BTreeMap<String, SceneState> {
        lock(&self.shared).scenes.get_all_scene_states()
    }

    /// Fail if more than one scene is `Active` or the state table disagrees with the stage.
    pub fn ensure_single_active_scene(&self) -> CineResult<()> {
        let shared = lock(&self.shared);
        let ids = shared.scenes.active_ids();
        if ids.len() > 1 {
            return Err(CineError::state(format!(
                "multiple active scenes: {}",
                ids.join(", ")
            )));
        }
        let staged = shared.active.as_ref().map(SceneHandle::id);
        if ids.first().copied() != staged {
            return Err(CineError::state(format!(
                "active scene mismatch: state table has {:?}, stage has {:?}",
                ids.first(),
                staged
            )));
        }
        Ok(())
    }

    /// `true` while a scene handoff effect is running.
    pub fn is_transitioning(&self) -> bool {
        lock(&self.shared).transition.is_some()
    }

    /// The handoff currently running, if any.
    pub fn active_transition(&self) -> Option<ActiveTransition> {
        lock(&self.shared)
            .transition
            .as_ref()
            .map(|t| t.info.clone())
    }

    /// Stop the running handoff effect at its next tick. The incoming scene still activates, snapped
    /// to its resting style.
    pub fn cancel_transition(&self) {
        if let Some(t) = &lock(&self.shared).transition {
            t.token.cancel();
        }
    }

    /// Container of `scene_id`, once the scene has been activated at least once.
    pub fn container(&self, scene_id: &str) -> Option<SceneContainer> {
        lock(&self.shared).containers.get(scene_id).cloned()
    }

    /// Subscribe to per-scene state changes.
    pub fn on_scene_state_change(
        &self,
        listener: impl Fn(&str, SceneState, SceneState) + Send + Sync + 'static,
    ) {
        lock(&self.shared).scenes.on_change(listener);
    }

    fn container_for(&self, scene_id: &str) -> SceneContainer {
        lock(&self.shared)
            .containers
            .entry(scene_id.to_string())
            .or_insert_with(|| SceneContainer::new(scene_id))
            .clone()
    }

    fn set_state(&self, scene_id: &str, state: SceneState) -> CineResult<()> {
        lock(&self.shared).scenes.set_scene_state(scene_id, state)
    }

    async fn run_phase(
        &self,
        phase: Phase,
        fut: impl Future<Output = CineResult<()>>,
    ) -> CineResult<()> {
        let result = match self.opts.phase_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                Err(CineError::Collaborator(anyhow::anyhow!(
                    "timed out after {} ms",
                    limit.as_millis()
                )))
            }),
            None => fut.await,
        };
        result.map_err(|e| {
            tracing::warn!(%phase, error = %e, "lifecycle phase failed");
            CineError::lifecycle(phase, e)
        })
    }

    // Unmount and destroy; leaves the scene `Unmounted`.
    async fn teardown(&self, scene: &SceneHandle) -> CineResult<()> {
        {
            let mut shared = lock(&self.shared);
            shared.scenes.set_scene_state(scene.id(), SceneState::Exiting)?;
            if shared.active.as_ref().is_some_and(|a| a.id() == scene.id()) {
                shared.active = None;
            }
        }
        self.run_phase(Phase::Unmount, self.unmount(scene)).await?;
        self.run_phase(Phase::Destroy, self.destroy(scene)).await?;
        self.set_state(scene.id(), SceneState::Unmounted)
    }

    // Bring a previously used or half-mounted scene back to `Created`.
    async fn reclaim(&self, scene: &SceneHandle) -> CineResult<()> {
        let state = self.get_scene_state(scene.id());
        let leftovers = scene.lock().await.layers.iter().any(LayerRecord::is_mounted);
        if leftovers || matches!(state, SceneState::Mounted | SceneState::Exiting) {
            tracing::debug!(%state, "reclaiming half-mounted scene");
            self.teardown(scene).await?;
        }
        if self.get_scene_state(scene.id()) == SceneState::Unmounted {
            self.set_state(scene.id(), SceneState::Created)?;
        }
        Ok(())
    }

    async fn abandon(
        &self,
        scene: &SceneHandle,
        container: &SceneContainer,
        from: Option<&SceneContainer>,
    ) -> CineResult<()> {
        tracing::info!("activation superseded; tearing down");
        if self.get_scene_state(scene.id()) == SceneState::Mounted {
            self.teardown(scene).await?;
        }
        container.hide();
        if let Some(from) = from {
            from.hide();
        }
        Ok(())
    }

    async fn prepare(&self, scene: &SceneHandle) -> CineResult<()> {
        let scene = scene.lock().await;
        let report = self.deps.assets.preload_scene(&scene).await?;
        tracing::debug!(
            loaded = report.loaded,
            failed = report.failed,
            total = report.total,
            "assets ready"
        );
        Ok(())
    }

    async fn mount(&self, handle: &SceneHandle, container: &SceneContainer) -> CineResult<()> {
        let mut scene = handle.lock().await;
        let scene_id = scene.id.clone();
        for layer in scene.layers.iter_mut() {
            let instance = self
                .deps
                .layers
                .create_layer(&layer.kind, &layer.id, &layer.config)?;
            let ctx = LayerContext {
                scene_id: scene_id.clone(),
                layer_id: layer.id.clone(),
                container: container.clone(),
                viewport: self.opts.viewport,
            };
            layer.instance.insert(instance).mount(&ctx).await?;
        }
        drop(scene);
        self.set_state(handle.id(), SceneState::Mounted)
    }

    async fn play(&self, handle: &SceneHandle) -> CineResult<()> {
        self.set_state(handle.id(), SceneState::Active)?;
        let mut scene = handle.lock().await;
        for layer in scene.layers.iter_mut() {
            layer.active = true;
        }
        for track in &scene.audio_tracks {
            self.deps.audio.start_track(&scene.id, track).await?;
        }
        Ok(())
    }

    // Every layer and track is released even if an earlier one fails; the first error is kept.
    async fn unmount(&self, handle: &SceneHandle) -> CineResult<()> {
        let mut scene = handle.lock().await;
        let mut first_err: Option<CineError> = None;
        for layer in scene.layers.iter_mut() {
            layer.active = false;
            if let Some(instance) = layer.instance.as_mut()
                && let Err(e) = instance.destroy().await
            {
                tracing::warn!(layer = %layer.id, error = %e, "layer destroy failed");
                first_err.get_or_insert(CineError::from(e));
            }
        }
        for track in &scene.audio_tracks {
            if let Err(e) = self.deps.audio.stop_track(&scene.id, &track.id).await {
                tracing::warn!(track = %track.id, error = %e, "audio stop failed");
                first_err.get_or_insert(CineError::from(e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn destroy(&self, handle: &SceneHandle) -> CineResult<()> {
        let mut scene = handle.lock().await;
        for layer in scene.layers.iter_mut() {
            layer.instance = None;
        }
        Ok(())
    }
}

impl fmt::Debug for SceneLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = lock(&self.shared);
        f.debug_struct("SceneLifecycleManager")
            .field("active", &shared.active)
            .field("scenes", &shared.scenes)
            .field("transitioning", &shared.transition.is_some())
            .field("opts", &self.opts)
            .finish()
    }
}

// Releases the manager's bookkeeping for one activation, including when its future is dropped
// mid-flight (e.g. under `tokio::time::timeout`).
struct ActivationGuard<'a> {
    shared: &'a Mutex<Shared>,
    token: CancelToken,
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        let mut shared = lock(self.shared);
        if shared.latest.as_ref().is_some_and(|t| t.same(&self.token)) {
            shared.latest = None;
        }
        if shared
            .transition
            .as_ref()
            .is_some_and(|t| t.owner.same(&self.token))
        {
            shared.transition = None;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/lifecycle/manager.rs"]
mod tests;
