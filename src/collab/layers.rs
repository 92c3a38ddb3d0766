use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::foundation::core::{FrameContext, Viewport};
use crate::scene::container::SceneContainer;

/// What a layer receives when it is mounted.
#[derive(Clone, Debug)]
pub struct LayerContext {
    /// Owning scene.
    pub scene_id: String,
    /// This layer's id.
    pub layer_id: String,
    /// The scene's container; layers paint into it.
    pub container: SceneContainer,
    /// Output surface size.
    pub viewport: Viewport,
}

/// A mounted visual layer.
///
/// Instances are created by a [`LayerRegistry`] during the mount phase and owned by their
/// [`crate::LayerRecord`] until the destroy phase.
#[async_trait]
pub trait Layer: Send + Sync {
    /// Registry tag this instance was created from.
    fn kind(&self) -> &str;

    /// Attach to the scene container. Called once.
    async fn mount(&mut self, ctx: &LayerContext) -> anyhow::Result<()>;

    /// Per-frame update while the scene is active.
    fn update(&mut self, frame: &FrameContext) -> anyhow::Result<()>;

    /// Release resources. Called once, during unmount.
    async fn destroy(&mut self) -> anyhow::Result<()>;
}

type LayerCtor =
    Box<dyn Fn(&str, &serde_json::Value) -> anyhow::Result<Box<dyn Layer>> + Send + Sync>;

/// Factory keyed by layer type.
#[derive(Default)]
pub struct LayerRegistry {
    ctors: BTreeMap<String, LayerCtor>,
}

impl LayerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ctor` for `kind`, replacing any previous entry.
    pub fn register<F>(&mut self, kind: impl Into<String>, ctor: F)
    where
        F: Fn(&str, &serde_json::Value) -> anyhow::Result<Box<dyn Layer>> + Send + Sync + 'static,
    {
        self.ctors.insert(kind.into(), Box::new(ctor));
    }

    /// Builder-style [`Self::register`].
    pub fn with<F>(mut self, kind: impl Into<String>, ctor: F) -> Self
    where
        F: Fn(&str, &serde_json::Value) -> anyhow::Result<Box<dyn Layer>> + Send + Sync + 'static,
    {
        self.register(kind, ctor);
        self
    }

    /// `true` if a constructor is registered for `kind`.
    pub fn contains(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }

    /// Registered layer types, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }

    /// Instantiate layer `id` of type `kind`.
    pub fn create_layer(
        &self,
        kind: &str,
        id: &str,
        config: &serde_json::Value,
    ) -> anyhow::Result<Box<dyn Layer>> {
        let Some(ctor) = self.ctors.get(kind) else {
            anyhow::bail!(
                "unknown layer type '{kind}' for layer '{id}' (registered: {})",
                self.kinds().join(", ")
            );
        };
        ctor(id, config)
    }
}

impl fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Layer that only logs its lifecycle; used by the CLI for headless runs.
#[derive(Debug)]
pub struct ProbeLayer {
    kind: String,
    id: String,
    frames: u64,
}

impl ProbeLayer {
    /// Probe for layer `id` of type `kind`.
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
            frames: 0,
        }
    }

    /// Number of `update` calls received.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[async_trait]
impl Layer for ProbeLayer {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn mount(&mut self, ctx: &LayerContext) -> anyhow::Result<()> {
        tracing::debug!(
            scene = %ctx.scene_id,
            layer = %self.id,
            kind = %self.kind,
            "layer mounted"
        );
        Ok(())
    }

    fn update(&mut self, _frame: &FrameContext) -> anyhow::Result<()> {
        self.frames += 1;
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        tracing::debug!(layer = %self.id, frames = self.frames, "layer destroyed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/layers.rs"]
mod tests;
