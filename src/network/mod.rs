//! Network Layer
//!
//! Line-delimited JSON client for the match server.
//! This layer sequences the protocol; decisions come from a [`MatchHandler`].

pub mod protocol;
pub mod session;
pub mod client;

pub use protocol::{ClientMessage, Inbound, ProtocolError};
pub use session::{GameSession, SessionInit, DEFAULT_PLAYER_ORDER};
pub use client::{ClientConfig, ClientError, ClientState, ConfigError, MatchHandler, ProtocolClient};
