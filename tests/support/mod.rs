#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cinestage::{
    AssetPreloader, FrameContext, Layer, LayerContext, LayerRecord, LayerRegistry, LifecycleDeps,
    PreloadReport, Scene, SceneHandle, SceneLifecycleManager, SceneState,
};

/// Ordered record of lifecycle events shared by test layers and listeners.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

pub struct JournalLayer {
    scene: String,
    id: String,
    journal: Journal,
    mount_delay: Duration,
    destroy_delay: Duration,
}

#[async_trait]
impl Layer for JournalLayer {
    fn kind(&self) -> &str {
        "journal"
    }

    async fn mount(&mut self, ctx: &LayerContext) -> anyhow::Result<()> {
        self.scene = ctx.scene_id.clone();
        if !self.mount_delay.is_zero() {
            tokio::time::sleep(self.mount_delay).await;
        }
        self.journal.push(format!("{}:{}:mount", self.scene, self.id));
        Ok(())
    }

    fn update(&mut self, _frame: &FrameContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        if !self.destroy_delay.is_zero() {
            tokio::time::sleep(self.destroy_delay).await;
        }
        self.journal.push(format!("{}:{}:destroy", self.scene, self.id));
        Ok(())
    }
}

pub fn journal_registry(journal: &Journal) -> LayerRegistry {
    let journal = journal.clone();
    LayerRegistry::new().with("journal", move |id, config| {
        let millis = |key: &str| {
            Duration::from_millis(config.get(key).and_then(|v| v.as_u64()).unwrap_or(0))
        };
        let layer: Box<dyn Layer> = Box::new(JournalLayer {
            scene: String::new(),
            id: id.to_string(),
            journal: journal.clone(),
            mount_delay: millis("mountMs"),
            destroy_delay: millis("destroyMs"),
        });
        Ok(layer)
    })
}

/// Preloader that takes `delay` for every scene and records when it finishes.
pub struct SlowAssets {
    pub delay: Duration,
    pub journal: Journal,
}

#[async_trait]
impl AssetPreloader for SlowAssets {
    async fn preload_scene(&self, scene: &Scene) -> anyhow::Result<PreloadReport> {
        tokio::time::sleep(self.delay).await;
        self.journal.push(format!("{}:prepared", scene.id));
        Ok(PreloadReport::new(0, 0, 0))
    }
}

pub fn journal_manager(journal: &Journal) -> SceneLifecycleManager {
    watch(
        SceneLifecycleManager::new(LifecycleDeps::new(journal_registry(journal)), Default::default()),
        journal,
    )
}

/// Record every scene-state change of `manager` into `journal`.
pub fn watch(manager: SceneLifecycleManager, journal: &Journal) -> SceneLifecycleManager {
    let sink = journal.clone();
    manager.on_scene_state_change(move |id, _, to| sink.push(format!("{id}={to}")));
    manager
}

pub fn one_layer_scene(id: &str) -> SceneHandle {
    SceneHandle::new(
        Scene::new(id, 1000.0).with_layer(LayerRecord::new("l0", "journal", serde_json::json!({}))),
    )
}

pub fn slow_mount_scene(id: &str, mount_ms: u64) -> SceneHandle {
    configured_scene(id, serde_json::json!({ "mountMs": mount_ms }))
}

pub fn slow_destroy_scene(id: &str, destroy_ms: u64) -> SceneHandle {
    configured_scene(id, serde_json::json!({ "destroyMs": destroy_ms }))
}

fn configured_scene(id: &str, config: serde_json::Value) -> SceneHandle {
    SceneHandle::new(Scene::new(id, 1000.0).with_layer(LayerRecord::new("l0", "journal", config)))
}

pub fn state_of(manager: &SceneLifecycleManager, id: &str) -> SceneState {
    manager.get_scene_state(id)
}
