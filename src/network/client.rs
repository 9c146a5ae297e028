//! Protocol Client
//!
//! Drives one match over a line-delimited JSON connection. The client owns
//! the protocol state machine; decisions are delegated to a
//! [`MatchHandler`].
//!
//! ```text
//! AwaitHandshake -> AwaitReady -> AwaitNewGame -> AwaitUpdate -> AwaitGameOver -> Done
//!                                                   ^      |
//!                                                   +------+  (move / opponent turn)
//! ```

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::game::moves::Move;
use crate::game::state::{GameSetting, GameState, Team, SHOTS_PER_END};
use crate::network::protocol::{
    ClientMessage, DcMessage, Inbound, IsReadyMessage, NewGameMessage, ProtocolError,
    UpdateMessage, CMD_DC, CMD_GAME_OVER, CMD_IS_READY, CMD_NEW_GAME, CMD_UPDATE,
};
use crate::network::session::{
    is_valid_player_order, GameSession, SessionInit, DEFAULT_PLAYER_ORDER, PLAYERS_PER_TEAM,
};
use crate::{PROTOCOL_VERSION_MAJOR, SUPPORTED_RULE};

/// Environment variable overriding the engine name sent in `dc_ok`.
pub const NAME_ENV: &str = "CURLING_ENGINE_NAME";

/// Engine name sent in `dc_ok` when [`NAME_ENV`] is unset.
pub const DEFAULT_NAME: &str = "stone-planner";

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Engine name reported to the server.
    pub name: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            host: "localhost".to_string(),
            port: 10000,
        }
    }
}

/// Command-line errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Wrong number of arguments.
    #[error("usage: {program} <host> <port>")]
    Usage {
        /// Program name for the usage line
        program: String,
    },

    /// The port is not a number in range.
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

impl ClientConfig {
    /// Build from the process arguments (`<program> <host> <port>`).
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let [_, host, port] = args else {
            let program = args.first().cloned().unwrap_or_else(|| "curling-engine".to_string());
            return Err(ConfigError::Usage { program });
        };

        let port = port.parse()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        let name = std::env::var(NAME_ENV)
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string());

        Ok(Self {
            name,
            host: host.clone(),
            port,
        })
    }

    /// `host:port` for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Fatal client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server broke the protocol.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or incomplete message.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server closed the connection mid-match.
    #[error("Connection closed by server")]
    ConnectionClosed,
}

// =============================================================================
// HANDLER
// =============================================================================

/// Decision callbacks invoked by the protocol client.
pub trait MatchHandler {
    /// Adjust the turn order before `ready_ok` is sent.
    ///
    /// `order[i]` names the player description used for slot `i`.
    fn player_order(
        &mut self,
        _team: Team,
        _setting: &GameSetting,
        _order: &mut [usize; PLAYERS_PER_TEAM],
    ) {
    }

    /// Choose the move for this side's turn.
    fn on_my_turn(&mut self, session: &mut GameSession, state: &GameState) -> Move;

    /// Observe a snapshot where the opponent is to throw.
    fn on_opponent_turn(&mut self, _session: &mut GameSession, _state: &GameState) {}

    /// Observe the final snapshot.
    fn on_game_over(&mut self, _session: &GameSession, _state: &GameState) {}
}

// =============================================================================
// CLIENT
// =============================================================================

/// Protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for `dc`.
    AwaitHandshake,
    /// Waiting for `is_ready`.
    AwaitReady,
    /// Waiting for `new_game`.
    AwaitNewGame,
    /// Waiting for the next `update`.
    AwaitUpdate,
    /// Result seen, waiting for `game_over`.
    AwaitGameOver,
    /// Match finished.
    Done,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::AwaitHandshake => "await_handshake",
            ClientState::AwaitReady => "await_ready",
            ClientState::AwaitNewGame => "await_new_game",
            ClientState::AwaitUpdate => "await_update",
            ClientState::AwaitGameOver => "await_game_over",
            ClientState::Done => "done",
        };
        f.write_str(name)
    }
}

/// One match over one connection.
pub struct ProtocolClient<R, W, H> {
    reader: R,
    writer: W,
    handler: H,
    name: String,
    state: ClientState,
    line: String,
}

impl<R, W, H> ProtocolClient<R, W, H>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    H: MatchHandler,
{
    /// Create a client that reports itself as `name`.
    pub fn new(reader: R, writer: W, handler: H, name: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            handler,
            name: name.into(),
            state: ClientState::AwaitHandshake,
            line: String::new(),
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The decision handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Take the transport halves and handler back.
    pub fn into_inner(self) -> (R, W, H) {
        (self.reader, self.writer, self.handler)
    }

    /// Play the match to completion.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        let dc = self.handshake().await?;
        let mut session = self.ready(&dc).await?;
        self.new_game().await?;
        let final_state = self.play(&mut session).await?;
        self.game_over(&session, &final_state).await
    }

    async fn handshake(&mut self) -> Result<DcMessage, ClientError> {
        let dc: DcMessage = self.expect(CMD_DC).await?;
        info!(
            "[in] dc: version={}.{} game_id={} date_time={}",
            dc.version.major, dc.version.minor, dc.game_id, dc.date_time
        );

        if dc.version.major != PROTOCOL_VERSION_MAJOR {
            return Err(ProtocolError::UnsupportedVersion {
                major: dc.version.major,
                minor: dc.version.minor,
            }
            .into());
        }

        let reply = ClientMessage::DcOk { name: self.name.clone() };
        self.send(&reply).await?;
        info!("[out] dc_ok: name={}", self.name);

        self.state = ClientState::AwaitReady;
        Ok(dc)
    }

    async fn ready(&mut self, dc: &DcMessage) -> Result<GameSession, ClientError> {
        let msg: IsReadyMessage = self.expect(CMD_IS_READY).await?;
        info!("[in] is_ready: team={} rule={}", msg.team.as_str(), msg.game.rule);

        if msg.game.rule != SUPPORTED_RULE {
            return Err(ProtocolError::UnsupportedRule(msg.game.rule).into());
        }

        let team = msg.team;
        if team.index().is_none() {
            warn!("Server assigned no team; this side will never be asked to move");
        }

        let mut order = DEFAULT_PLAYER_ORDER;
        self.handler.player_order(team, &msg.game.setting, &mut order);
        if !is_valid_player_order(&order) {
            warn!("Player order {:?} is not a permutation, using {:?}", order, DEFAULT_PLAYER_ORDER);
            order = DEFAULT_PLAYER_ORDER;
        }

        let players = msg.game.players.get(team).map(Vec::as_slice).unwrap_or(&[]);
        let session = GameSession::new(
            SessionInit {
                team,
                setting: msg.game.setting.clone(),
                simulator: msg.game.simulator.as_ref(),
                players,
                game_id: &dc.game_id,
            },
            order,
        );

        self.send(&ClientMessage::ReadyOk { player_order: order }).await?;
        info!("[out] ready_ok: player_order={:?}", order);

        self.state = ClientState::AwaitNewGame;
        Ok(session)
    }

    async fn new_game(&mut self) -> Result<(), ClientError> {
        let msg: NewGameMessage = self.expect(CMD_NEW_GAME).await?;
        info!("[in] new_game: team0={} team1={}", msg.name.team0, msg.name.team1);

        self.state = ClientState::AwaitUpdate;
        Ok(())
    }

    /// Exchange updates and moves until a snapshot carries a result.
    async fn play(&mut self, session: &mut GameSession) -> Result<GameState, ClientError> {
        loop {
            let UpdateMessage { state } = self.expect(CMD_UPDATE).await?;
            info!(
                "[in] update: end={} shot={} hammer={} next={} stones={}",
                state.end,
                state.shot,
                state.hammer.as_str(),
                state.next_team().as_str(),
                state.stones_in_play()
            );

            if let Some(result) = &state.game_result {
                debug!("Result received: winner={} reason={:?}", result.winner.as_str(), result.reason);
                self.state = ClientState::AwaitGameOver;
                return Ok(state);
            }

            if state.shot >= SHOTS_PER_END {
                return Err(ProtocolError::ShotOutOfRange(state.shot).into());
            }

            if state.next_team() == session.team() {
                let mv = self.handler.on_my_turn(session, &state);
                self.send(&ClientMessage::Move { mv }).await?;
                info!("[out] move: {:?}", mv);
            } else {
                self.handler.on_opponent_turn(session, &state);
            }
        }
    }

    async fn game_over(&mut self, session: &GameSession, state: &GameState) -> Result<(), ClientError> {
        self.expect::<serde_json::Value>(CMD_GAME_OVER).await?;
        info!("[in] game_over");

        self.handler.on_game_over(session, state);
        self.state = ClientState::Done;
        Ok(())
    }

    /// Read the next message and decode it as `T`, requiring tag `cmd`.
    async fn expect<T: serde::de::DeserializeOwned>(&mut self, cmd: &'static str) -> Result<T, ClientError> {
        let msg = self.read_message().await?;
        if let Err(e) = msg.check(cmd) {
            warn!("Out-of-order message in state {}: {}", self.state, e);
            return Err(e.into());
        }
        Ok(msg.decode()?)
    }

    /// Read one non-empty line.
    async fn read_message(&mut self) -> Result<Inbound, ClientError> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            if self.line.trim().is_empty() {
                continue;
            }
            return Ok(Inbound::from_json(&self.line)?);
        }
    }

    async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let mut line = msg.to_json()?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::io::BufReader;
    use crate::core::vec2::Vec2;
    use crate::game::moves::{Rotation, Shot};
    use crate::game::state::{GameResult, GameResultReason, Transform, TEE};
    use crate::planner::{PlannerConfig, TurnPlanner};

    /// Fixed-shot handler that records what it saw.
    #[derive(Default)]
    struct StubHandler {
        my_turns: usize,
        opponent_turns: usize,
        game_over: bool,
        order: Option<[usize; 4]>,
    }

    impl MatchHandler for StubHandler {
        fn player_order(&mut self, _team: Team, _setting: &GameSetting, order: &mut [usize; 4]) {
            if let Some(custom) = self.order {
                *order = custom;
            }
        }

        fn on_my_turn(&mut self, _session: &mut GameSession, _state: &GameState) -> Move {
            self.my_turns += 1;
            Move::Shot(Shot::new(Vec2::new(0.1, 2.4), Rotation::Ccw))
        }

        fn on_opponent_turn(&mut self, _session: &mut GameSession, _state: &GameState) {
            self.opponent_turns += 1;
        }

        fn on_game_over(&mut self, _session: &GameSession, _state: &GameState) {
            self.game_over = true;
        }
    }

    fn dc_line(major: u32) -> String {
        json!({
            "cmd": "dc",
            "version": {"major": major, "minor": 0},
            "game_id": "00000000-test",
            "date_time": "2026-01-01T00:00:00"
        })
        .to_string()
    }

    fn is_ready_line(rule: &str) -> String {
        json!({
            "cmd": "is_ready",
            "team": "team0",
            "game": {
                "rule": rule,
                "setting": {},
                "simulator": {"type": "fcv1", "seconds_per_frame": 0.001},
                "players": {
                    "team0": [{"type": "identical"}, {"type": "identical"}, {"type": "identical"}, {"type": "identical"}],
                    "team1": [{"type": "identical"}, {"type": "identical"}, {"type": "identical"}, {"type": "identical"}]
                }
            }
        })
        .to_string()
    }

    fn new_game_line() -> String {
        json!({"cmd": "new_game", "name": {"team0": "us", "team1": "them"}}).to_string()
    }

    fn update_line(state: &GameState) -> String {
        json!({"cmd": "update", "state": state}).to_string()
    }

    fn transcript(lines: &[String]) -> String {
        lines.iter().map(|l| format!("{l}\n")).collect()
    }

    async fn run_transcript(
        input: &str,
        handler: StubHandler,
    ) -> (Result<(), ClientError>, ClientState, Vec<Value>, StubHandler) {
        let reader = BufReader::new(input.as_bytes());
        let mut client = ProtocolClient::new(reader, Vec::new(), handler, "test-engine");
        let result = client.run().await;
        let state = client.state();
        let (_, written, handler) = client.into_inner();

        let output = String::from_utf8(written).unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (result, state, output, handler)
    }

    #[tokio::test]
    async fn test_handshake_replies_with_name() {
        let input = transcript(&[dc_line(1)]);
        let (result, state, output, _) = run_transcript(&input, StubHandler::default()).await;

        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
        assert_eq!(state, ClientState::AwaitReady);
        assert_eq!(output, vec![json!({"cmd": "dc_ok", "name": "test-engine"})]);
    }

    #[tokio::test]
    async fn test_unsupported_major_version() {
        let input = transcript(&[dc_line(2), is_ready_line("normal")]);
        let (result, _, output, _) = run_transcript(&input, StubHandler::default()).await;

        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::UnsupportedVersion { major: 2, .. }))
        ));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_rule_aborts_before_ready_ok() {
        let input = transcript(&[dc_line(1), is_ready_line("mixed_doubles"), new_game_line()]);
        let (result, state, output, _) = run_transcript(&input, StubHandler::default()).await;

        match result {
            Err(ClientError::Protocol(ProtocolError::UnsupportedRule(rule))) => {
                assert_eq!(rule, "mixed_doubles");
            }
            other => panic!("expected rule rejection, got {other:?}"),
        }
        assert_eq!(state, ClientState::AwaitReady);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0]["cmd"], "dc_ok");
    }

    #[tokio::test]
    async fn test_out_of_order_command_aborts() {
        let state = GameState::new(&GameSetting::default());
        let input = transcript(&[dc_line(1), update_line(&state)]);
        let (result, _, output, handler) = run_transcript(&input, StubHandler::default()).await;

        match result {
            Err(ClientError::Protocol(ProtocolError::UnexpectedCommand { expected, actual })) => {
                assert_eq!(expected, "is_ready");
                assert_eq!(actual, "update");
            }
            other => panic!("expected out-of-order abort, got {other:?}"),
        }
        assert_eq!(handler.my_turns, 0);
        assert!(output.iter().all(|m| m["cmd"] != "move"));
    }

    #[tokio::test]
    async fn test_malformed_line_is_fatal() {
        let input = transcript(&[dc_line(1), "{not json".to_string()]);
        let (result, _, _, _) = run_transcript(&input, StubHandler::default()).await;
        assert!(matches!(result, Err(ClientError::Json(_))));
    }

    #[tokio::test]
    async fn test_full_game() {
        let setting = GameSetting::default();
        let mut first = GameState::new(&setting);
        let mut second = first.clone();
        second.shot = 1;
        first.shot = 0;
        let mut last = second.clone();
        last.game_result = Some(GameResult { winner: Team::Team1, reason: GameResultReason::Concede });

        let input = transcript(&[
            dc_line(1),
            String::new(),
            is_ready_line("normal"),
            new_game_line(),
            update_line(&first),
            update_line(&second),
            update_line(&last),
            json!({"cmd": "game_over"}).to_string(),
        ]);
        let handler = StubHandler { order: Some([3, 2, 1, 0]), ..StubHandler::default() };
        let (result, state, output, handler) = run_transcript(&input, handler).await;

        result.unwrap();
        assert_eq!(state, ClientState::Done);
        assert_eq!(handler.my_turns, 1);
        assert_eq!(handler.opponent_turns, 1);
        assert!(handler.game_over);

        let cmds: Vec<&str> = output.iter().map(|m| m["cmd"].as_str().unwrap()).collect();
        assert_eq!(cmds, vec!["dc_ok", "ready_ok", "move"]);
        assert_eq!(output[1]["player_order"], json!([3, 2, 1, 0]));
        assert_eq!(output[2]["move"]["type"], "shot");
        assert_eq!(output[2]["move"]["rotation"], "ccw");
    }

    #[tokio::test]
    async fn test_update_with_shot_past_end_is_fatal() {
        let mut state = GameState::new(&GameSetting::default());
        state.hammer = Team::Team0;
        state.shot = 17;
        state.stones.team1[0] = Some(Transform::new(TEE, 0.0));

        let input = transcript(&[dc_line(1), is_ready_line("normal"), new_game_line(), update_line(&state)]);
        let reader = BufReader::new(input.as_bytes());
        let planner = TurnPlanner::new(PlannerConfig::default());
        let mut client = ProtocolClient::new(reader, Vec::new(), planner, "test-engine");

        let result = client.run().await;
        assert!(matches!(result, Err(ClientError::Protocol(ProtocolError::ShotOutOfRange(17)))));
        assert_eq!(client.state(), ClientState::AwaitUpdate);

        let (_, written, _) = client.into_inner();
        let written = String::from_utf8(written).unwrap();
        assert!(!written.contains("\"move\""));
    }

    #[tokio::test]
    async fn test_invalid_player_order_falls_back() {
        let input = transcript(&[dc_line(1), is_ready_line("normal")]);
        let handler = StubHandler { order: Some([0, 0, 1, 1]), ..StubHandler::default() };
        let (_, _, output, _) = run_transcript(&input, handler).await;

        assert_eq!(output[1]["player_order"], json!([0, 1, 2, 3]));
    }

    #[test]
    fn test_config_from_args() {
        let args: Vec<String> = ["curling-engine", "127.0.0.1", "10000"].iter().map(|s| s.to_string()).collect();
        let config = ClientConfig::from_args(&args).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 10000);
        assert_eq!(config.address(), "127.0.0.1:10000");
        assert!(!config.name.is_empty());

        let short = vec!["curling-engine".to_string()];
        assert!(matches!(ClientConfig::from_args(&short), Err(ConfigError::Usage { .. })));

        let bad_port: Vec<String> = ["x", "host", "port"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ClientConfig::from_args(&bad_port), Err(ConfigError::InvalidPort("port".into())));
    }
}
