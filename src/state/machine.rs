use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::foundation::error::{CineError, CineResult};

/// A finite state usable with [`StateMachine`].
///
/// Implementors provide a stable label (used in error messages), the full set of states (used to
/// enumerate legal targets in a deterministic order) and the edges pre-registered at construction.
pub trait MachineState: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Lowercase human-readable label.
    fn label(self) -> &'static str;

    /// Every state, in declaration order.
    fn all() -> &'static [Self];

    /// Edges registered by [`StateMachine::new`].
    fn default_edges() -> Vec<(Self, Self)>;
}

/// Predicate consulted by [`StateMachine::can_transition`].
pub type Guard = Arc<dyn Fn() -> bool + Send + Sync>;

/// Side effect awaited before the state is mutated.
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, CineResult<()>> + Send + Sync>;

type Listener<S> = Box<dyn Fn(S, S) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`StateMachine::on_change`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One legal `(from, to)` edge, optionally guarded and paired with an action.
#[derive(Clone)]
pub struct StateTransition<S> {
    /// Source state.
    pub from: S,
    /// Target state.
    pub to: S,
    guard: Option<Guard>,
    action: Option<Action>,
}

impl<S: MachineState> StateTransition<S> {
    /// Unguarded edge without an action.
    pub fn new(from: S, to: S) -> Self {
        Self {
            from,
            to,
            guard: None,
            action: None,
        }
    }

    /// Only allow this edge while `guard` returns `true`.
    pub fn with_guard(mut self, guard: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Await `action` before the state changes. A failing action aborts the transition.
    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CineResult<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(move || Box::pin(action())));
        self
    }

    fn allowed(&self) -> bool {
        self.guard.as_ref().is_none_or(|g| g())
    }
}

impl<S: MachineState> fmt::Debug for StateTransition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTransition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guarded", &self.guard.is_some())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Table-driven finite state validator with change listeners.
pub struct StateMachine<S: MachineState> {
    current: S,
    transitions: HashMap<(S, S), StateTransition<S>>,
    listeners: Vec<(ListenerId, Listener<S>)>,
    next_listener: u64,
}

impl<S: MachineState> StateMachine<S> {
    /// Create a machine in `initial` with the state type's default edges registered.
    pub fn new(initial: S) -> Self {
        let mut machine = Self::empty(initial);
        for (from, to) in S::default_edges() {
            machine.register_transition(StateTransition::new(from, to));
        }
        machine
    }

    /// Create a machine in `initial` with no edges at all.
    pub fn empty(initial: S) -> Self {
        Self {
            current: initial,
            transitions: HashMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Insert or overwrite the row for `(t.from, t.to)`.
    pub fn register_transition(&mut self, t: StateTransition<S>) {
        self.transitions.insert((t.from, t.to), t);
    }

    /// Current state.
    pub fn get_state(&self) -> S {
        self.current
    }

    /// `true` iff a row exists for `(current, to)` and its guard (if any) passes.
    pub fn can_transition(&self, to: S) -> bool {
        self.transitions
            .get(&(self.current, to))
            .is_some_and(StateTransition::allowed)
    }

    /// Same check as [`Self::can_transition`], failing with the invalid-edge error instead.
    pub fn ensure_can_transition(&self, to: S) -> CineResult<()> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(self.invalid_edge(to))
        }
    }

    /// Targets reachable from the current state with one [`Self::transition`] call.
    pub fn valid_targets(&self) -> Vec<S> {
        S::all()
            .iter()
            .copied()
            .filter(|&to| self.can_transition(to))
            .collect()
    }

    /// Move to `to`, running the edge's action first and notifying listeners afterwards.
    pub async fn transition(&mut self, to: S) -> CineResult<()> {
        let from = self.current;
        let Some(row) = self
            .transitions
            .get(&(from, to))
            .filter(|row| row.allowed())
        else {
            return Err(self.invalid_edge(to));
        };

        if let Some(action) = row.action.clone() {
            action().await?;
        }

        self.current = to;
        tracing::debug!(from = from.label(), to = to.label(), "state changed");
        self.notify(from, to);
        Ok(())
    }

    /// Subscribe to `(from, to)` changes. A listener error or panic is logged and isolated.
    pub fn on_change(
        &mut self,
        listener: impl Fn(S, S) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unsubscribe; returns `false` if `id` was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&self, from: S, to: S) {
        for (id, listener) in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(from, to))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(listener = id.0, error = %e, "state listener failed");
                }
                Err(_) => {
                    tracing::warn!(listener = id.0, "state listener panicked");
                }
            }
        }
    }

    fn invalid_edge(&self, to: S) -> CineError {
        let from = self.current.label();
        let targets = self
            .valid_targets()
            .into_iter()
            .map(MachineState::label)
            .collect::<Vec<_>>();
        let list = if targets.is_empty() {
            "none".to_string()
        } else {
            targets.join(", ")
        };
        CineError::state(format!(
            "Invalid state transition: {from} -> {}. Valid transitions from {from}: {list}",
            to.label()
        ))
    }
}

impl<S: MachineState> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("transitions", &self.transitions.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/machine.rs"]
mod tests;
