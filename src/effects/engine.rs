use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use crate::effects::cancel::CancelToken;
use crate::effects::transitions::{
    EffectFrame, TransitionConfig, TransitionEffect, builtin_effects, normalize_kind,
};
use crate::foundation::error::{CineError, CineResult};
use crate::foundation::sync::{lock, read, write};
use crate::scene::container::SceneContainer;

/// Engine tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineOpts {
    /// Tick cadence; the final tick is always aligned to the transition's deadline.
    pub frame_interval: Duration,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
        }
    }
}

/// How a transition ended. Cancellation is not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Ran to `progress == 1`.
    Completed,
    /// Stopped advancing after its token was cancelled.
    Cancelled,
}

type ProgressFn = Box<dyn FnMut(f64) + Send>;
type CompleteFn = Box<dyn FnOnce(TransitionOutcome) + Send>;

/// Everything one `execute_transition` call operates on.
pub struct TransitionContext {
    /// Outgoing container, if a scene was on stage.
    pub from: Option<SceneContainer>,
    /// Incoming container.
    pub to: SceneContainer,
    /// Checked at every tick boundary.
    pub token: CancelToken,
    on_progress: Option<ProgressFn>,
    on_complete: Option<CompleteFn>,
}

impl TransitionContext {
    /// Context with a fresh token and no callbacks.
    pub fn new(from: Option<SceneContainer>, to: SceneContainer) -> Self {
        Self {
            from,
            to,
            token: CancelToken::new(),
            on_progress: None,
            on_complete: None,
        }
    }

    /// Use `token` instead of a private one.
    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    /// Called with linear progress, monotonically from `0.0` to `1.0` (or until cancelled).
    pub fn on_progress(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called exactly once, after the last style mutation.
    pub fn on_complete(mut self, f: impl FnOnce(TransitionOutcome) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

/// Executes visual handoff effects between two scene containers on a cooperative tick loop.
pub struct TransitionEngine {
    opts: EngineOpts,
    effects: RwLock<HashMap<String, Arc<dyn TransitionEffect>>>,
    in_flight: Mutex<Vec<(u64, CancelToken)>>,
    next_id: AtomicU64,
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new(EngineOpts::default())
    }
}

impl TransitionEngine {
    /// Engine with the six built-in effects registered.
    pub fn new(opts: EngineOpts) -> Self {
        let effects = builtin_effects()
            .into_iter()
            .map(|(k, e)| (k.to_string(), e))
            .collect();
        Self {
            opts,
            effects: RwLock::new(effects),
            in_flight: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register `effect` under `kind`; an existing entry (built-in or not) is replaced.
    pub fn register_transition(&self, kind: &str, effect: impl TransitionEffect + 'static) {
        let key = normalize_kind(kind);
        if write(&self.effects)
            .insert(key.clone(), Arc::new(effect))
            .is_some()
        {
            tracing::debug!(kind = %key, "transition effect replaced");
        }
    }

    /// `true` if `kind` resolves to a registered effect.
    pub fn supports(&self, kind: &str) -> bool {
        read(&self.effects).contains_key(&normalize_kind(kind))
    }

    /// Registered effect names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = read(&self.effects).keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// `true` while any `execute_transition` call is unresolved.
    pub fn is_transitioning(&self) -> bool {
        !lock(&self.in_flight).is_empty()
    }

    /// Cancel every in-flight transition. Each stops at its next tick and still completes.
    pub fn cancel_transition(&self) {
        for (_, token) in lock(&self.in_flight).iter() {
            token.cancel();
        }
    }

    /// Run `config` between `ctx.from` and `ctx.to`.
    ///
    /// Resolves with [`TransitionOutcome::Cancelled`] rather than an error when the context's
    /// token is cancelled; `on_complete` runs in both cases.
    #[tracing::instrument(skip(self, ctx), fields(kind = %config.kind, duration_ms = config.duration_ms))]
    pub async fn execute_transition(
        &self,
        config: &TransitionConfig,
        mut ctx: TransitionContext,
    ) -> CineResult<TransitionOutcome> {
        config.validate()?;
        let effect = self.effect(&config.kind)?;
        let _in_flight = self.track(ctx.token.clone());

        let duration = Duration::from_millis(config.duration_ms);
        let start = Instant::now();
        let deadline = start + duration;
        let mut progress = 0.0_f64;

        let outcome = loop {
            if ctx.token.is_cancelled() {
                break TransitionOutcome::Cancelled;
            }

            effect.apply(&EffectFrame {
                progress,
                eased: config.easing.apply(progress),
                config,
                from: ctx.from.as_ref(),
                to: &ctx.to,
            });
            if let Some(f) = ctx.on_progress.as_mut() {
                f(progress);
            }
            if progress >= 1.0 {
                break TransitionOutcome::Completed;
            }

            let next_tick = (Instant::now() + self.opts.frame_interval).min(deadline);
            tokio::time::sleep_until(next_tick).await;

            progress = if Instant::now() >= deadline {
                1.0
            } else {
                (start.elapsed().as_secs_f64() / duration.as_secs_f64()).clamp(progress, 1.0)
            };
        };

        tracing::debug!(?outcome, progress, "transition finished");
        if let Some(f) = ctx.on_complete.take() {
            f(outcome);
        }
        Ok(outcome)
    }

    fn effect(&self, kind: &str) -> CineResult<Arc<dyn TransitionEffect>> {
        read(&self.effects)
            .get(&normalize_kind(kind))
            .cloned()
            .ok_or_else(|| CineError::config(format!("unsupported transition type '{kind}'")))
    }

    fn track(&self, token: CancelToken) -> InFlight<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.in_flight).push((id, token));
        InFlight { engine: self, id }
    }
}

impl fmt::Debug for TransitionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("opts", &self.opts)
            .field("kinds", &self.kinds())
            .field("in_flight", &lock(&self.in_flight).len())
            .finish()
    }
}

// Deregisters an execution even when its future is dropped mid-transition.
struct InFlight<'a> {
    engine: &'a TransitionEngine,
    id: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(&self.engine.in_flight).retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/engine.rs"]
mod tests;
