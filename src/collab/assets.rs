use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::scene::model::Scene;

/// Outcome of preloading one scene's assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PreloadReport {
    /// Distinct asset references found.
    pub total: usize,
    /// Resolved successfully.
    pub loaded: usize,
    /// Could not be resolved.
    pub failed: usize,
    /// `loaded / total` in percent; 100 for a scene without assets.
    pub percentage: f64,
}

impl PreloadReport {
    /// Build a report from counts.
    pub fn new(total: usize, loaded: usize, failed: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            loaded as f64 * 100.0 / total as f64
        };
        Self {
            total,
            loaded,
            failed,
            percentage,
        }
    }
}

/// Loads everything a scene references before it is mounted.
#[async_trait]
pub trait AssetPreloader: Send + Sync {
    /// Preload every asset of `scene`. Returning an error fails the prepare phase.
    async fn preload_scene(&self, scene: &Scene) -> anyhow::Result<PreloadReport>;
}

/// Preloader that accepts everything without doing any I/O.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPreloader;

#[async_trait]
impl AssetPreloader for NoopPreloader {
    async fn preload_scene(&self, scene: &Scene) -> anyhow::Result<PreloadReport> {
        let n = scene.asset_refs().len();
        Ok(PreloadReport::new(n, n, 0))
    }
}

type Resolver = Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// Resolves each referenced asset through a caller-supplied closure.
pub struct ManifestPreloader {
    resolve: Resolver,
    fail_on_missing: bool,
}

impl ManifestPreloader {
    /// Preloader backed by `resolve`; unresolved assets are counted, not fatal.
    pub fn new(resolve: impl Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        Self {
            resolve: Box::new(resolve),
            fail_on_missing: false,
        }
    }

    /// Resolve asset references as files relative to `root`.
    pub fn files(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::new(move |src| {
            let path = asset_path(&root, src);
            if path.is_file() {
                Ok(())
            } else {
                anyhow::bail!("asset not found: {}", path.display())
            }
        })
    }

    /// Fail the whole preload when any asset is unresolved.
    pub fn fail_on_missing(mut self, yes: bool) -> Self {
        self.fail_on_missing = yes;
        self
    }
}

fn asset_path(root: &Path, src: &str) -> PathBuf {
    let p = Path::new(src);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[async_trait]
impl AssetPreloader for ManifestPreloader {
    async fn preload_scene(&self, scene: &Scene) -> anyhow::Result<PreloadReport> {
        let refs = scene.asset_refs();
        let mut failed = Vec::new();
        for src in &refs {
            if let Err(e) = (self.resolve)(src) {
                tracing::warn!(scene = %scene.id, asset = %src, error = %e, "asset unavailable");
                failed.push(src.as_str());
            }
        }
        if self.fail_on_missing && !failed.is_empty() {
            anyhow::bail!(
                "scene '{}': {} of {} assets missing: {}",
                scene.id,
                failed.len(),
                refs.len(),
                failed.join(", ")
            );
        }
        let report = PreloadReport::new(refs.len(), refs.len() - failed.len(), failed.len());
        tracing::debug!(
            scene = %scene.id,
            loaded = report.loaded,
            total = report.total,
            "scene assets preloaded"
        );
        Ok(report)
    }
}

impl fmt::Debug for ManifestPreloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestPreloader")
            .field("fail_on_missing", &self.fail_on_missing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/assets.rs"]
mod tests;
