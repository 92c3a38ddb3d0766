use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collab::layers::Layer;
use crate::effects::transitions::TransitionConfig;
use crate::foundation::core::Viewport;
use crate::foundation::error::{CineError, CineResult};

/// One visual layer of a scene.
///
/// `instance` and `active` are runtime fields written only by the lifecycle manager; they are
/// never serialized.
#[derive(Serialize, Deserialize)]
pub struct LayerRecord {
    /// Layer id, unique within its scene.
    pub id: String,
    /// Registry tag, e.g. `"image"` or `"text"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form layer configuration handed to the factory.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Extra asset references to preload besides `config.src`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<String>,
    #[serde(skip)]
    pub(crate) instance: Option<Box<dyn Layer>>,
    #[serde(skip)]
    pub(crate) active: bool,
}

impl LayerRecord {
    /// Unmounted layer record.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            config,
            assets: Vec::new(),
            instance: None,
            active: false,
        }
    }

    /// Mounted layer instance, if any.
    pub fn instance(&self) -> Option<&dyn Layer> {
        self.instance.as_deref()
    }

    /// `true` while an instance is owned by this record.
    pub fn is_mounted(&self) -> bool {
        self.instance.is_some()
    }

    /// `true` between the `play` and `unmount` phases.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl fmt::Debug for LayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("mounted", &self.is_mounted())
            .field("active", &self.active)
            .finish()
    }
}

/// Audio track started when a scene plays and stopped when it unmounts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrackSpec {
    /// Track id, unique within its scene.
    pub id: String,
    /// Source reference.
    pub src: String,
    /// Linear gain in `[0, 1]`.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Restart when the source ends.
    #[serde(default, rename = "loop")]
    pub looped: bool,
    /// Fade-in length in milliseconds.
    #[serde(default)]
    pub fade_in_ms: f64,
}

fn default_volume() -> f32 {
    1.0
}

/// A timed collection of layers and audio tracks.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Unique scene id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Scene length in milliseconds.
    pub duration: f64,
    /// Layers, bottom to top.
    #[serde(default)]
    pub layers: Vec<LayerRecord>,
    /// Audio tracks.
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrackSpec>,
    /// Start on the presentation timeline, in milliseconds.
    #[serde(default)]
    pub start_time: f64,
    /// End on the presentation timeline, in milliseconds.
    #[serde(default)]
    pub end_time: f64,
    /// Handoff used when this scene is entered; falls back to the presentation default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionConfig>,
}

impl Scene {
    /// Empty scene of `duration` ms starting at timeline zero.
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            duration,
            layers: Vec::new(),
            audio_tracks: Vec::new(),
            start_time: 0.0,
            end_time: duration,
            transition: None,
        }
    }

    /// Append a layer (builder style).
    pub fn with_layer(mut self, layer: LayerRecord) -> Self {
        self.layers.push(layer);
        self
    }

    /// Append an audio track (builder style).
    pub fn with_audio(mut self, track: AudioTrackSpec) -> Self {
        self.audio_tracks.push(track);
        self
    }

    /// Every asset reference of the scene: `config.src` and `assets[]` of each layer plus audio
    /// sources, deduplicated and sorted.
    pub fn asset_refs(&self) -> Vec<String> {
        let mut out = BTreeSet::new();
        for layer in &self.layers {
            if let Some(src) = layer.config.get("src").and_then(|v| v.as_str()) {
                out.insert(src.to_string());
            }
            out.extend(layer.assets.iter().cloned());
        }
        out.extend(self.audio_tracks.iter().map(|t| t.src.clone()));
        out.into_iter().collect()
    }

    /// Check timing fields and id uniqueness of layers/tracks.
    pub fn validate(&self) -> CineResult<()> {
        if self.id.trim().is_empty() {
            return Err(CineError::config("scene id must be non-empty"));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(CineError::config(format!(
                "scene '{}': duration must be finite and >= 0",
                self.id
            )));
        }
        if self.end_time < self.start_time {
            return Err(CineError::config(format!(
                "scene '{}': endTime must be >= startTime",
                self.id
            )));
        }
        let mut seen = BTreeSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.id.as_str()) {
                return Err(CineError::config(format!(
                    "scene '{}': duplicate layer id '{}'",
                    self.id, layer.id
                )));
            }
        }
        seen.clear();
        for track in &self.audio_tracks {
            if !seen.insert(track.id.as_str()) {
                return Err(CineError::config(format!(
                    "scene '{}': duplicate audio track id '{}'",
                    self.id, track.id
                )));
            }
        }
        if let Some(t) = &self.transition {
            t.validate()?;
        }
        Ok(())
    }
}

/// Shared, lockable reference to a [`Scene`].
///
/// The id is captured at construction and is what the lifecycle manager keys state on. Two
/// handles are equal when they point at the same scene.
#[derive(Clone)]
pub struct SceneHandle {
    id: Arc<str>,
    inner: Arc<tokio::sync::Mutex<Scene>>,
}

impl SceneHandle {
    /// Wrap `scene`.
    pub fn new(scene: Scene) -> Self {
        Self {
            id: Arc::from(scene.id.as_str()),
            inner: Arc::new(tokio::sync::Mutex::new(scene)),
        }
    }

    /// Scene id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lock the scene for reading or inspection.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Scene> {
        self.inner.lock().await
    }
}

impl PartialEq for SceneHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SceneHandle {}

impl fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SceneHandle").field(&self.id).finish()
    }
}

/// Declarative presentation document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSpec {
    /// Document version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Output surface size.
    #[serde(default)]
    pub viewport: Viewport,
    /// Handoff used for scenes that do not declare one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_transition: Option<TransitionConfig>,
    /// Scenes in playback order.
    pub scenes: Vec<Scene>,
}

fn default_version() -> String {
    "1".to_string()
}

impl PresentationSpec {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> CineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> CineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CineError::config(format!("read '{}': {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Layer types referenced anywhere in the presentation, sorted.
    pub fn layer_kinds(&self) -> Vec<String> {
        self.scenes
            .iter()
            .flat_map(|s| s.layers.iter().map(|l| l.kind.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Validate every scene plus presentation-level constraints.
    pub fn validate(&self) -> CineResult<()> {
        if self.scenes.is_empty() {
            return Err(CineError::config("presentation must contain at least one scene"));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(CineError::config("viewport width/height must be > 0"));
        }
        let mut ids = BTreeSet::new();
        for scene in &self.scenes {
            scene.validate()?;
            if !ids.insert(scene.id.as_str()) {
                return Err(CineError::config(format!("duplicate scene id '{}'", scene.id)));
            }
        }
        if let Some(t) = &self.default_transition {
            t.validate()?;
        }
        Ok(())
    }

    /// Total timeline length: the latest scene `endTime`.
    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.end_time).fold(0.0, f64::max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
