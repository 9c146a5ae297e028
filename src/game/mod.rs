//! Game Model Module
//!
//! Everything needed to replay a match locally. Deterministic for a given
//! player seed.
//!
//! ## Module Structure
//!
//! - `state`: Sheet geometry, teams, stone grid, match snapshot
//! - `moves`: Shots, rotation, concede
//! - `simulator`: Stone dynamics stepper (fcv1)
//! - `collision`: Stone contact detection and resolution
//! - `player`: Execution noise applied to requested shots
//! - `rules`: Applying a move to a match state

pub mod state;
pub mod moves;
pub mod simulator;
pub mod collision;
pub mod player;
pub mod rules;

// Re-export key types
pub use state::{
    GameResult, GameResultReason, GameSetting, GameState, PerTeam, StoneIndex, Stones, Team,
    Transform, TEE,
};
pub use moves::{Move, Rotation, Shot};
pub use simulator::{AllStones, Fcv1Simulator, Fcv1Snapshot, Simulator, SimulatorSpec, StoneState};
pub use player::{IdenticalPlayer, NormalDistPlayer, Player, PlayerSpec};
pub use rules::{apply_move, RuleError};
