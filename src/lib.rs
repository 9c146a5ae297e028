//! # Curling Engine
//!
//! Turn-planning client for digital curling matches, speaking the
//! line-delimited JSON match protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CURLING ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── vec2.rs     - 2D vector                                 │
//! │  └── rng.rs      - Xorshift128+ PRNG, player seed derivation │
//! │                                                              │
//! │  game/           - Local match model                         │
//! │  ├── state.rs    - Sheet geometry, stones, match snapshot    │
//! │  ├── moves.rs    - Shot / concede                            │
//! │  ├── simulator.rs- fcv1 stone dynamics                       │
//! │  ├── collision.rs- Stone contacts                            │
//! │  ├── player.rs   - Execution noise                           │
//! │  └── rules.rs    - apply_move (ruleset "normal")             │
//! │                                                              │
//! │  network/        - Match server connection                   │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── session.rs  - Match-lifetime context                    │
//! │  └── client.rs   - Protocol state machine                    │
//! │                                                              │
//! │  planner/        - Move selection                            │
//! │  ├── ordering.rs - Stones by distance to the tee             │
//! │  ├── estimator.rs- Launch velocity inversion                 │
//! │  └── mod.rs      - Rollout scoring                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! The [`network::ProtocolClient`] reads one message per line. On each
//! `update` where this side is to throw, the [`planner::TurnPlanner`] plays
//! candidate shots forward on the session simulator and the chosen
//! [`game::Move`] is written back.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod planner;

// Re-export commonly used types
pub use crate::core::vec2::Vec2;
pub use game::moves::{Move, Rotation, Shot};
pub use game::state::{GameSetting, GameState, Team};
pub use network::client::{ClientConfig, ClientError, ProtocolClient};
pub use network::session::GameSession;
pub use planner::{PlannerConfig, TurnPlanner};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol major version this client speaks
pub const PROTOCOL_VERSION_MAJOR: u32 = 1;

/// The only ruleset this client plays
pub const SUPPORTED_RULE: &str = "normal";
