use super::*;
use serde_json::json;

fn probe_registry() -> LayerRegistry {
    LayerRegistry::new()
        .with("image", |id, _| {
            let layer: Box<dyn Layer> = Box::new(ProbeLayer::new("image", id));
            Ok(layer)
        })
        .with("text", |id, config| {
            anyhow::ensure!(config.get("text").is_some(), "text layer '{id}' needs `text`");
            let layer: Box<dyn Layer> = Box::new(ProbeLayer::new("text", id));
            Ok(layer)
        })
}

#[test]
fn creates_registered_kinds() {
    let registry = probe_registry();
    assert!(registry.contains("image"));
    assert_eq!(registry.kinds(), vec!["image", "text"]);

    let layer = registry.create_layer("image", "bg", &json!({})).unwrap();
    assert_eq!(layer.kind(), "image");
}

#[test]
fn unknown_kind_names_the_registered_ones() {
    let err = probe_registry()
        .create_layer("video", "clip", &json!({}))
        .err()
        .unwrap();
    let msg = err.to_string();
    assert!(msg.contains("unknown layer type 'video'"), "{msg}");
    assert!(msg.contains("image, text"), "{msg}");
}

#[test]
fn constructor_errors_propagate() {
    let err = probe_registry()
        .create_layer("text", "title", &json!({}))
        .err()
        .unwrap();
    assert!(err.to_string().contains("needs `text`"));
}

#[test]
fn later_registration_wins() {
    let mut registry = probe_registry();
    registry.register("image", |_, _| anyhow::bail!("disabled"));
    assert!(registry.create_layer("image", "bg", &json!({})).is_err());
}

#[tokio::test]
async fn probe_counts_frames() {
    let mut probe = ProbeLayer::new("image", "bg");
    let ctx = LayerContext {
        scene_id: "s".into(),
        layer_id: "bg".into(),
        container: SceneContainer::new("s"),
        viewport: Viewport::default(),
    };
    probe.mount(&ctx).await.unwrap();
    let frame = FrameContext::first(Viewport::default(), Default::default(), 1.0);
    probe.update(&frame).unwrap();
    probe.update(&frame.advanced(16.0)).unwrap();
    assert_eq!(probe.frames(), 2);
    probe.destroy().await.unwrap();
}
