//! Core primitives.
//!
//! Geometry and randomness shared by the simulator, the player models and
//! the planner.

pub mod vec2;
pub mod rng;

// Re-export core types
pub use vec2::Vec2;
pub use rng::{DeterministicRng, derive_player_seed};
