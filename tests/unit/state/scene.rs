use super::*;
use std::sync::{Arc, Mutex};

#[test]
fn unknown_ids_default_to_created() {
    let sm = SceneStateMachine::new();
    assert_eq!(sm.get_scene_state("nope"), SceneState::Created);
    assert_eq!(sm.get_active_scene_id(), None);
}

#[test]
fn second_activation_is_rejected_without_mutation() {
    let mut sm = SceneStateMachine::new();
    sm.set_scene_state("s1", SceneState::Active).unwrap();
    sm.set_scene_state("s2", SceneState::Mounted).unwrap();

    let err = sm.set_scene_state("s2", SceneState::Active).unwrap_err();
    assert!(err.to_string().contains("already active"), "{err}");
    assert!(err.to_string().contains("s1"));
    assert_eq!(sm.get_active_scene_id(), Some("s1"));
    assert_eq!(sm.get_scene_state("s1"), SceneState::Active);
    assert_eq!(sm.get_scene_state("s2"), SceneState::Mounted);
}

#[test]
fn reasserting_active_is_idempotent() {
    let mut sm = SceneStateMachine::new();
    sm.set_scene_state("s1", SceneState::Active).unwrap();
    sm.set_scene_state("s1", SceneState::Active).unwrap();
    assert!(sm.is_scene_active("s1"));
}

#[test]
fn leaving_active_clears_pointer() {
    let mut sm = SceneStateMachine::new();
    sm.set_scene_state("s1", SceneState::Active).unwrap();
    sm.set_scene_state("s1", SceneState::Exiting).unwrap();
    assert_eq!(sm.get_active_scene_id(), None);
    sm.set_scene_state("s2", SceneState::Active).unwrap();
    assert_eq!(sm.get_active_scene_id(), Some("s2"));
}

#[test]
fn at_most_one_active_over_arbitrary_sequences() {
    let ids = ["a", "b", "c"];
    let mut sm = SceneStateMachine::new();
    let mut seed = 0x2545_f491_u32;
    for _ in 0..500 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let id = ids[(seed % 3) as usize];
        let state = SceneState::all()[((seed >> 8) % 5) as usize];
        let _ = sm.set_scene_state(id, state);
        assert!(sm.active_ids().len() <= 1);
        assert_eq!(sm.active_ids().first().copied(), sm.get_active_scene_id());
    }
}

#[test]
fn listeners_see_changes_only() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut sm = SceneStateMachine::new();
    let s = seen.clone();
    sm.on_change(move |id, from, to| s.lock().unwrap().push(format!("{id}:{from}->{to}")));

    sm.set_scene_state("s1", SceneState::Mounted).unwrap();
    sm.set_scene_state("s1", SceneState::Mounted).unwrap();
    sm.set_scene_state("s1", SceneState::Active).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["s1:created->mounted", "s1:mounted->active"]
    );
}

#[tokio::test]
async fn inner_machine_follows_scene_table() {
    let mut sm = SceneStateMachine::new();
    let m = sm.machine_mut();
    m.transition(SceneState::Mounted).await.unwrap();
    m.transition(SceneState::Active).await.unwrap();
    m.transition(SceneState::Exiting).await.unwrap();
    m.transition(SceneState::Unmounted).await.unwrap();
    m.transition(SceneState::Created).await.unwrap();
    assert!(m.transition(SceneState::Active).await.is_err());
    assert_eq!(sm.get_all_scene_states().len(), 0);
}
