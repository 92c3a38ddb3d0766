/// Easing curves sampled by transition effects.
pub mod ease;
