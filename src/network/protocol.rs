//! Protocol Messages
//!
//! Wire format for the match server connection: one JSON object per
//! newline-terminated line, discriminated by the `cmd` field.

use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::game::moves::Move;
use crate::game::state::{GameSetting, GameState, PerTeam, Team};

// =============================================================================
// COMMAND TAGS
// =============================================================================

/// Handshake from the server.
pub const CMD_DC: &str = "dc";
/// Handshake reply.
pub const CMD_DC_OK: &str = "dc_ok";
/// Match configuration from the server.
pub const CMD_IS_READY: &str = "is_ready";
/// Configuration reply.
pub const CMD_READY_OK: &str = "ready_ok";
/// Team names, sent once before the first update.
pub const CMD_NEW_GAME: &str = "new_game";
/// Match snapshot.
pub const CMD_UPDATE: &str = "update";
/// Move reply.
pub const CMD_MOVE: &str = "move";
/// Final message of the match.
pub const CMD_GAME_OVER: &str = "game_over";

/// Protocol violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The message tag does not match the current protocol state.
    #[error("Unexpected command: expected \"{expected}\", got \"{actual}\"")]
    UnexpectedCommand {
        /// Tag the current state accepts
        expected: &'static str,
        /// Tag that arrived
        actual: String,
    },

    /// The server speaks an incompatible protocol version.
    #[error("Unsupported protocol version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version sent by the server
        major: u32,
        /// Minor version sent by the server
        minor: u32,
    },

    /// The match uses a ruleset this client cannot play.
    #[error("Unsupported rule: \"{0}\"")]
    UnsupportedRule(String),

    /// An `update` names a shot past the last stone of the end.
    #[error("Shot {0} out of range in update")]
    ShotOutOfRange(u8),
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// An inbound line split into its command tag and body.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Value of the `cmd` field (empty when missing)
    pub cmd: String,
    body: Value,
}

impl Inbound {
    /// Parse one line.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        let body: Value = serde_json::from_str(line.trim_end())?;
        let cmd = body.get("cmd")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self { cmd, body })
    }

    /// Check the command tag against the one the caller expects.
    pub fn check(&self, expected: &'static str) -> Result<(), ProtocolError> {
        if self.cmd == expected {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedCommand {
                expected,
                actual: self.cmd.clone(),
            })
        }
    }

    /// Decode the body as `T`. Fails on missing or mistyped fields.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body)
    }
}

/// Protocol version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Major version (must match exactly)
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

/// `dc`: connection handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcMessage {
    /// Protocol version of the server
    pub version: Version,
    /// Unique match identifier
    pub game_id: String,
    /// Server timestamp
    #[serde(default)]
    pub date_time: String,
}

/// Match configuration carried by `is_ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Ruleset name
    pub rule: String,
    /// Match settings
    pub setting: GameSetting,
    /// Simulator description (decoded by the session)
    #[serde(default)]
    pub simulator: Option<Value>,
    /// Player descriptions per team (decoded by the session)
    #[serde(default)]
    pub players: PerTeam<Vec<Value>>,
}

/// `is_ready`: side assignment and match configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsReadyMessage {
    /// This side's team
    pub team: Team,
    /// Match configuration
    pub game: GameConfig,
}

/// `new_game`: team names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGameMessage {
    /// Display name per team
    pub name: PerTeam<String>,
}

/// `update`: the current match snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// Match snapshot
    pub state: GameState,
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from this client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Handshake reply.
    DcOk {
        /// Engine name shown by the server
        name: String,
    },

    /// Configuration reply.
    ReadyOk {
        /// Permutation of `0..4` mapping turn slots to player descriptions
        player_order: [usize; 4],
    },

    /// The chosen move.
    Move {
        /// Shot or concede
        #[serde(rename = "move")]
        mv: Move,
    },
}

impl ClientMessage {
    /// Command tag of this message.
    pub fn cmd(&self) -> &'static str {
        match self {
            ClientMessage::DcOk { .. } => CMD_DC_OK,
            ClientMessage::ReadyOk { .. } => CMD_READY_OK,
            ClientMessage::Move { .. } => CMD_MOVE,
        }
    }

    /// Serialize to one JSON line (without the trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
