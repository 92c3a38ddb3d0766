use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::foundation::error::{CineError, CineResult};
use crate::state::machine::{MachineState, StateMachine};

/// Lifecycle state tracked per scene id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneState {
    /// Known but not mounted (also the state of unknown ids).
    Created,
    /// Layers instantiated and mounted.
    Mounted,
    /// The single scene currently on stage.
    Active,
    /// Teardown in progress.
    Exiting,
    /// Teardown complete; may return to `Created` for reuse.
    Unmounted,
}

impl MachineState for SceneState {
    fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Mounted => "mounted",
            Self::Active => "active",
            Self::Exiting => "exiting",
            Self::Unmounted => "unmounted",
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Created,
            Self::Mounted,
            Self::Active,
            Self::Exiting,
            Self::Unmounted,
        ]
    }

    fn default_edges() -> Vec<(Self, Self)> {
        use SceneState::*;
        vec![
            (Created, Mounted),
            (Mounted, Active),
            (Active, Exiting),
            (Exiting, Unmounted),
            (Unmounted, Created),
        ]
    }
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type SceneListener = Box<dyn Fn(&str, SceneState, SceneState) + Send + Sync>;

/// Scene-typed [`StateMachine`] extended with per-id tracking and the single-active-scene
/// invariant.
///
/// Scene ids are not driven through the transition table: many ids share one instance, so
/// [`SceneStateMachine::set_scene_state`] writes the per-id map directly and only enforces that at
/// most one id is `Active`.
pub struct SceneStateMachine {
    machine: StateMachine<SceneState>,
    states: BTreeMap<String, SceneState>,
    active: Option<String>,
    listeners: Vec<SceneListener>,
}

impl Default for SceneStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStateMachine {
    /// Empty tracker with the default scene table registered on the inner machine.
    pub fn new() -> Self {
        Self {
            machine: StateMachine::new(SceneState::Created),
            states: BTreeMap::new(),
            active: None,
            listeners: Vec::new(),
        }
    }

    /// The table-driven machine (default scene edges).
    pub fn machine(&self) -> &StateMachine<SceneState> {
        &self.machine
    }

    /// Mutable access to the table-driven machine.
    pub fn machine_mut(&mut self) -> &mut StateMachine<SceneState> {
        &mut self.machine
    }

    /// Record `state` for `scene_id`.
    ///
    /// Fails without mutating anything if `state` is `Active` while a different id is active.
    /// Re-asserting `Active` on the active id is a no-op.
    pub fn set_scene_state(&mut self, scene_id: &str, state: SceneState) -> CineResult<()> {
        if state == SceneState::Active {
            match self.active.as_deref() {
                Some(current) if current == scene_id => return Ok(()),
                Some(current) => {
                    return Err(CineError::state(format!(
                        "Scene '{current}' is already active; cannot activate '{scene_id}'"
                    )));
                }
                None => self.active = Some(scene_id.to_string()),
            }
        } else if self.active.as_deref() == Some(scene_id) {
            self.active = None;
        }

        let from = self
            .states
            .insert(scene_id.to_string(), state)
            .unwrap_or(SceneState::Created);
        if from != state {
            tracing::debug!(
                scene = scene_id,
                from = from.label(),
                to = state.label(),
                "scene state"
            );
            self.notify(scene_id, from, state);
        }
        Ok(())
    }

    /// State of `scene_id`; unknown ids are `Created`.
    pub fn get_scene_state(&self, scene_id: &str) -> SceneState {
        self.states
            .get(scene_id)
            .copied()
            .unwrap_or(SceneState::Created)
    }

    /// Id of the scene currently `Active`, if any.
    pub fn get_active_scene_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// `true` iff `scene_id` is the active scene.
    pub fn is_scene_active(&self, scene_id: &str) -> bool {
        self.active.as_deref() == Some(scene_id)
    }

    /// Snapshot of every tracked id.
    pub fn get_all_scene_states(&self) -> BTreeMap<String, SceneState> {
        self.states.clone()
    }

    /// Ids currently mapped to `Active`. Never more than one while the invariant holds.
    pub fn active_ids(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, s)| **s == SceneState::Active)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Subscribe to per-scene `(id, from, to)` changes.
    pub fn on_change(
        &mut self,
        listener: impl Fn(&str, SceneState, SceneState) + Send + Sync + 'static,
    ) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, scene_id: &str, from: SceneState, to: SceneState) {
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(scene_id, from, to))).is_err() {
                tracing::warn!(scene = scene_id, "scene state listener panicked");
            }
        }
    }
}

impl fmt::Debug for SceneStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneStateMachine")
            .field("states", &self.states)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/scene.rs"]
mod tests;
