//! Cinestage is the scene orchestration core of a declarative cinematic presentation renderer.
//!
//! It decides when a scene's resources come into existence, when they become active, and how
//! control hands off to the next scene, including when that handoff is interrupted:
//!
//! - [`StateMachine`] validates renderer and scene state changes
//! - [`TransitionEngine`] runs cancellable visual handoff effects between scene containers
//! - [`SceneLifecycleManager`] sequences `prepare → mount → play` and `unmount → destroy` and
//!   keeps at most one scene active
//! - [`Renderer`] drives a whole [`PresentationSpec`] from host ticks
//!
//! Layers, asset loading and audio are collaborators behind the [`Layer`], [`AssetPreloader`] and
//! [`AudioController`] traits.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animation;
mod collab;
mod effects;
mod foundation;
mod lifecycle;
mod scene;
mod session;
mod state;

pub use crate::foundation::core::{FrameContext, Quality, Viewport};
pub use crate::foundation::error::{CineError, CineResult, ErrorCategory};

pub use crate::animation::ease::Ease;
pub use crate::collab::assets::{AssetPreloader, ManifestPreloader, NoopPreloader, PreloadReport};
pub use crate::collab::audio::{AudioController, SilentAudio};
pub use crate::collab::layers::{Layer, LayerContext, LayerRegistry, ProbeLayer};
pub use crate::effects::cancel::CancelToken;
pub use crate::effects::engine::{
    EngineOpts, TransitionContext, TransitionEngine, TransitionOutcome,
};
pub use crate::effects::transitions::{
    Blur, CUT, Crossfade, DEFAULT_BLUR_PX, DEFAULT_TRANSITION_MS, Direction, Dissolve, EffectFrame,
    Slide, TransitionConfig, TransitionEffect, Wipe, Zoom,
};
pub use crate::lifecycle::manager::{
    ActiveTransition, LifecycleDeps, LifecycleOpts, SceneLifecycleManager,
};
pub use crate::lifecycle::phase::Phase;
pub use crate::scene::container::{ClipInset, ContainerStyle, SceneContainer};
pub use crate::scene::model::{AudioTrackSpec, LayerRecord, PresentationSpec, Scene, SceneHandle};
pub use crate::session::renderer::{PlaybackStats, Renderer, RendererOpts};
pub use crate::state::machine::{
    Action, Guard, ListenerId, MachineState, StateMachine, StateTransition,
};
pub use crate::state::renderer::RendererState;
pub use crate::state::scene::{SceneState, SceneStateMachine};
