use super::*;
use crate::collab::layers::Layer;
use crate::effects::transitions::Direction;
use crate::scene::model::Scene;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

struct CountingLayer {
    frames: Arc<AtomicU64>,
    stall_mount: bool,
}

#[async_trait]
impl Layer for CountingLayer {
    fn kind(&self) -> &str {
        "counting"
    }

    async fn mount(&mut self, _ctx: &LayerContext) -> anyhow::Result<()> {
        if self.stall_mount {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn update(&mut self, _frame: &FrameContext) -> anyhow::Result<()> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

fn manager_with(frames: Arc<AtomicU64>, opts: LifecycleOpts) -> SceneLifecycleManager {
    let registry = LayerRegistry::new().with("counting", move |_, config| {
        let layer: Box<dyn Layer> = Box::new(CountingLayer {
            frames: Arc::clone(&frames),
            stall_mount: config.get("stall").is_some(),
        });
        Ok(layer)
    });
    SceneLifecycleManager::new(LifecycleDeps::new(registry), opts)
}

fn manager() -> SceneLifecycleManager {
    manager_with(Arc::new(AtomicU64::new(0)), LifecycleOpts::default())
}

fn scene(id: &str) -> SceneHandle {
    SceneHandle::new(
        Scene::new(id, 1000.0).with_layer(LayerRecord::new("l0", "counting", json!({}))),
    )
}

#[tokio::test(start_paused = true)]
async fn first_activation_fades_in_from_nothing() {
    let m = manager();
    let s1 = scene("s1");
    m.activate_scene(&s1, Some(TransitionConfig::crossfade(100)))
        .await
        .unwrap();

    assert_eq!(m.get_active_scene_id().as_deref(), Some("s1"));
    assert_eq!(m.get_scene_state("s1"), SceneState::Active);
    let style = m.container("s1").unwrap().style();
    assert!(style.visible);
    assert_eq!(style.opacity, 1.0);
    let scene = s1.lock().await;
    assert!(scene.layers[0].is_mounted() && scene.layers[0].is_active());
    drop(scene);
    m.ensure_single_active_scene().unwrap();
}

#[tokio::test(start_paused = true)]
async fn outgoing_container_is_hidden_after_handoff() {
    let m = manager();
    let (s1, s2) = (scene("s1"), scene("s2"));
    m.activate_scene(&s1, Some(TransitionConfig::cut())).await.unwrap();
    m.activate_scene(&s2, Some(TransitionConfig::slide(120, Direction::Right)))
        .await
        .unwrap();

    assert!(!m.container("s1").unwrap().style().visible);
    let incoming = m.container("s2").unwrap().style();
    assert!(incoming.visible);
    assert_eq!(incoming.translate_x, 0.0);
    assert_eq!(m.get_scene_state("s1"), SceneState::Unmounted);
}

#[tokio::test(start_paused = true)]
async fn reactivating_the_active_scene_is_a_no_op() {
    let m = manager();
    let s1 = scene("s1");
    m.activate_scene(&s1, Some(TransitionConfig::cut())).await.unwrap();
    m.activate_scene(&s1, None).await.unwrap();
    assert_eq!(m.get_scene_state("s1"), SceneState::Active);
    assert!(s1.lock().await.layers[0].is_mounted());
}

#[tokio::test(start_paused = true)]
async fn cancel_transition_snaps_to_the_incoming_scene() {
    let m = manager();
    let (s1, s2) = (scene("s1"), scene("s2"));
    m.activate_scene(&s1, Some(TransitionConfig::cut())).await.unwrap();

    let ((), result) = tokio::join!(
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(m.is_transitioning());
            assert_eq!(
                m.active_transition(),
                Some(ActiveTransition {
                    from: Some("s1".into()),
                    to: "s2".into()
                })
            );
            m.cancel_transition();
        },
        m.activate_scene(&s2, Some(TransitionConfig::crossfade(1000)))
    );

    result.unwrap();
    assert!(!m.is_transitioning());
    assert_eq!(m.get_active_scene_id().as_deref(), Some("s2"));
    assert_eq!(m.container("s2").unwrap().style().opacity, 1.0);
}

#[tokio::test(start_paused = true)]
async fn dropped_activation_releases_transition_bookkeeping() {
    let m = manager();
    let (s1, s2) = (scene("s1"), scene("s2"));
    m.activate_scene(&s1, Some(TransitionConfig::cut())).await.unwrap();

    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        m.activate_scene(&s2, Some(TransitionConfig::crossfade(1000))),
    )
    .await;
    assert!(dropped.is_err());

    assert!(!m.is_transitioning());
    assert_eq!(m.active_transition(), None);
    assert!(!m.deps().transitions.is_transitioning());
    {
        let shared = lock(&m.shared);
        assert!(shared.latest.is_none());
        assert!(shared.transition.is_none());
    }

    m.activate_scene(&s2, Some(TransitionConfig::cut())).await.unwrap();
    assert_eq!(m.get_active_scene_id().as_deref(), Some("s2"));
    m.ensure_single_active_scene().unwrap();
}

#[tokio::test(start_paused = true)]
async fn stalled_phase_times_out() {
    let m = manager_with(
        Arc::new(AtomicU64::new(0)),
        LifecycleOpts {
            phase_timeout: Some(Duration::from_millis(250)),
            ..LifecycleOpts::default()
        },
    );
    let stuck = SceneHandle::new(
        Scene::new("stuck", 10.0)
            .with_layer(LayerRecord::new("l0", "counting", json!({"stall": true}))),
    );

    let err = m.activate_scene(&stuck, None).await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Mount));
    let msg = err.to_string();
    assert!(msg.starts_with("Failed to execute mount phase"), "{msg}");
    assert!(msg.contains("timed out after 250 ms"), "{msg}");
    assert_eq!(m.get_active_scene_id(), None);
}

#[tokio::test(start_paused = true)]
async fn half_mounted_scene_is_reclaimed_on_retry() {
    let m = manager();
    let s1 = SceneHandle::new(
        Scene::new("s1", 10.0)
            .with_layer(LayerRecord::new("ok", "counting", json!({})))
            .with_layer(LayerRecord::new("bad", "missing", json!({}))),
    );

    assert!(m.activate_scene(&s1, None).await.is_err());
    assert!(s1.lock().await.layers[0].is_mounted());
    assert_eq!(m.get_scene_state("s1"), SceneState::Created);

    s1.lock().await.layers.pop();
    m.activate_scene(&s1, Some(TransitionConfig::cut())).await.unwrap();
    assert_eq!(m.get_scene_state("s1"), SceneState::Active);
}

#[tokio::test(start_paused = true)]
async fn update_frame_reaches_active_layers_only() {
    let frames = Arc::new(AtomicU64::new(0));
    let m = manager_with(Arc::clone(&frames), LifecycleOpts::default());
    let frame = FrameContext::first(Viewport::default(), Default::default(), 1.0);

    m.update_frame(&frame).await.unwrap();
    assert_eq!(frames.load(Ordering::SeqCst), 0);

    let s1 = scene("s1");
    m.activate_scene(&s1, Some(TransitionConfig::cut())).await.unwrap();
    m.update_frame(&frame).await.unwrap();
    m.update_frame(&frame.advanced(16.0)).await.unwrap();
    assert_eq!(frames.load(Ordering::SeqCst), 2);

    m.deactivate_scene(&s1).await.unwrap();
    m.update_frame(&frame).await.unwrap();
    assert_eq!(frames.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unsupported_transition_fails_before_touching_scenes() {
    let m = manager();
    let s1 = scene("s1");
    let err = m
        .activate_scene(&s1, Some(TransitionConfig::new("spiral", 100)))
        .await
        .unwrap_err();
    assert!(matches!(err, CineError::Config(_)));
    assert!(m.get_all_scene_states().is_empty());
}

#[test]
fn ensure_single_active_scene_detects_corruption() {
    let m = manager();
    m.ensure_single_active_scene().unwrap();
    lock(&m.shared)
        .scenes
        .set_scene_state("ghost", SceneState::Active)
        .unwrap();
    let err = m.ensure_single_active_scene().unwrap_err();
    assert!(err.to_string().contains("mismatch"), "{err}");
}
