use super::*;
use crate::animation::ease::Ease;
use crate::effects::transitions::Direction;

fn containers() -> (SceneContainer, SceneContainer) {
    let from = SceneContainer::new("a");
    from.reset();
    let to = SceneContainer::new("b");
    to.reset();
    (from, to)
}

fn recorder() -> (Arc<Mutex<Vec<f64>>>, impl FnMut(f64) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |p| sink.lock().unwrap().push(p))
}

#[tokio::test(start_paused = true)]
async fn crossfade_runs_for_its_duration() {
    let engine = TransitionEngine::default();
    let (from, to) = containers();
    let (seen, on_progress) = recorder();
    let completions = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::clone(&completions);

    let start = Instant::now();
    let outcome = engine
        .execute_transition(
            &TransitionConfig::crossfade(100),
            TransitionContext::new(Some(from.clone()), to.clone())
                .on_progress(on_progress)
                .on_complete(move |o| done.lock().unwrap().push(o)),
        )
        .await
        .unwrap();

    assert_eq!(outcome, TransitionOutcome::Completed);
    assert_eq!(start.elapsed(), Duration::from_millis(100));
    assert_eq!(*completions.lock().unwrap(), vec![TransitionOutcome::Completed]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&0.0));
    assert_eq!(seen.last(), Some(&1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert!(seen.len() >= 3);

    assert_eq!(from.style().opacity, 0.0);
    assert_eq!(to.style().opacity, 1.0);
    assert!(!engine.is_transitioning());
}

#[tokio::test(start_paused = true)]
async fn last_tick_lands_on_the_deadline() {
    let engine = TransitionEngine::new(EngineOpts {
        frame_interval: Duration::from_millis(30),
    });
    let (from, to) = containers();
    let (seen, on_progress) = recorder();

    let start = Instant::now();
    engine
        .execute_transition(
            &TransitionConfig::crossfade(100).with_easing(Ease::Linear),
            TransitionContext::new(Some(from), to).on_progress(on_progress),
        )
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(100));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5, "{seen:?}");
    assert!((seen[1] - 0.3).abs() < 1e-9);
    assert_eq!(seen[4], 1.0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_stops_progress_and_still_completes() {
    let engine = TransitionEngine::default();
    let (from, to) = containers();
    let (seen, on_progress) = recorder();
    let token = CancelToken::new();
    let completions = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::clone(&completions);

    let ctx = TransitionContext::new(Some(from), to)
        .with_token(token.clone())
        .on_progress(on_progress)
        .on_complete(move |o| done.lock().unwrap().push(o));

    let config = TransitionConfig::crossfade(500);
    let (outcome, ()) = tokio::join!(
        engine.execute_transition(&config, ctx),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert!(engine.is_transitioning());
            token.cancel();
        }
    );

    assert_eq!(outcome.unwrap(), TransitionOutcome::Cancelled);
    assert_eq!(*completions.lock().unwrap(), vec![TransitionOutcome::Cancelled]);
    let last = *seen.lock().unwrap().last().unwrap();
    assert!(last < 1.0, "{last}");
    assert!(!engine.is_transitioning());
}

#[tokio::test(start_paused = true)]
async fn cancel_transition_reaches_every_in_flight_execution() {
    let engine = TransitionEngine::default();
    let (a, b) = containers();
    let (c, d) = containers();

    let crossfade = TransitionConfig::crossfade(400);
    let slide = TransitionConfig::slide(400, Direction::Up);
    let (first, second, ()) = tokio::join!(
        engine.execute_transition(
            &crossfade,
            TransitionContext::new(Some(a), b)
        ),
        engine.execute_transition(
            &slide,
            TransitionContext::new(Some(c), d)
        ),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.cancel_transition();
        }
    );

    assert_eq!(first.unwrap(), TransitionOutcome::Cancelled);
    assert_eq!(second.unwrap(), TransitionOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_token_never_touches_styles() {
    let engine = TransitionEngine::default();
    let (from, to) = containers();
    let token = CancelToken::new();
    token.cancel();

    let outcome = engine
        .execute_transition(
            &TransitionConfig::crossfade(100),
            TransitionContext::new(Some(from.clone()), to.clone()).with_token(token),
        )
        .await
        .unwrap();

    assert_eq!(outcome, TransitionOutcome::Cancelled);
    assert_eq!(from.style().opacity, 1.0);
    assert_eq!(to.style().opacity, 1.0);
}

#[tokio::test]
async fn unknown_type_is_a_config_error() {
    let engine = TransitionEngine::default();
    let (from, to) = containers();
    let err = engine
        .execute_transition(
            &TransitionConfig::new("spiral", 100),
            TransitionContext::new(Some(from), to),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CineError::Config(_)));
    assert!(err.to_string().contains("spiral"));
    assert!(!engine.is_transitioning());
}

#[tokio::test]
async fn zero_duration_is_rejected() {
    let engine = TransitionEngine::default();
    let (from, to) = containers();
    let err = engine
        .execute_transition(&TransitionConfig::crossfade(0), TransitionContext::new(Some(from), to))
        .await
        .unwrap_err();
    assert!(matches!(err, CineError::Config(_)));
}

fn spin(f: &EffectFrame<'_>) {
    f.to.update(|s| s.scale = 0.25 + 0.75 * f.eased);
}

fn darken(f: &EffectFrame<'_>) {
    f.to.update(|s| s.opacity = 0.5 * f.eased + 0.5);
}

#[tokio::test(start_paused = true)]
async fn custom_effects_register_and_override() {
    let engine = TransitionEngine::default();
    assert!(!engine.supports("spin"));
    engine.register_transition("Spin", spin);
    assert!(engine.supports("spin"));

    let (_, to) = containers();
    engine
        .execute_transition(
            &TransitionConfig::new("spin", 50).with_easing(Ease::Linear),
            TransitionContext::new(None, to.clone()),
        )
        .await
        .unwrap();
    assert_eq!(to.style().scale, 1.0);

    engine.register_transition("crossfade", darken);
    let (from, to) = containers();
    engine
        .execute_transition(
            &TransitionConfig::crossfade(50),
            TransitionContext::new(Some(from.clone()), to.clone()),
        )
        .await
        .unwrap();
    assert_eq!(from.style().opacity, 1.0);
    assert_eq!(to.style().opacity, 1.0);
    assert!(engine.kinds().contains(&"spin".to_string()));
}

#[test]
fn builtins_are_registered() {
    let engine = TransitionEngine::default();
    assert_eq!(
        engine.kinds(),
        vec!["blur", "crossfade", "dissolve", "slide", "wipe", "zoom"]
    );
    assert!(!engine.supports("cut"));
}
