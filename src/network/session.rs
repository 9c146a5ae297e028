//! Game Session
//!
//! Match-lifetime context built at `is_ready`: which side we are, the match
//! settings, the simulator with its saved snapshot, and the four throwers.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::core::rng::derive_player_seed;
use crate::game::moves::Move;
use crate::game::player::{Player, PlayerSpec};
use crate::game::rules::{apply_move, RuleError};
use crate::game::simulator::{Fcv1Simulator, Fcv1Snapshot, Simulator, SimulatorSpec};
use crate::game::state::{GameSetting, GameState, Team};

/// Throwers per team.
pub const PLAYERS_PER_TEAM: usize = 4;

/// Turn order used when the handler does not change it.
pub const DEFAULT_PLAYER_ORDER: [usize; PLAYERS_PER_TEAM] = [0, 1, 2, 3];

/// Whether `order` is a permutation of `0..4`.
pub fn is_valid_player_order(order: &[usize; PLAYERS_PER_TEAM]) -> bool {
    let mut seen = [false; PLAYERS_PER_TEAM];
    for &slot in order {
        match seen.get_mut(slot) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}

/// Everything `is_ready` provides for building a session.
#[derive(Debug, Clone)]
pub struct SessionInit<'a> {
    /// This side's team
    pub team: Team,
    /// Match settings
    pub setting: GameSetting,
    /// Simulator description, if any
    pub simulator: Option<&'a Value>,
    /// This side's player descriptions
    pub players: &'a [Value],
    /// Match identifier (seeds the throwers' noise)
    pub game_id: &'a str,
}

/// Match-lifetime context shared by the protocol client and the planner.
pub struct GameSession {
    team: Team,
    setting: GameSetting,
    simulator: Fcv1Simulator,
    snapshot: Fcv1Snapshot,
    players: Vec<Box<dyn Player>>,
}

impl GameSession {
    /// Build the session. Slot `i` is built from description `order[i]`.
    ///
    /// Missing or unsupported descriptions fall back to the defaults with a
    /// warning; construction itself never fails.
    pub fn new(init: SessionInit<'_>, order: [usize; PLAYERS_PER_TEAM]) -> Self {
        let spec = match init.simulator.map(SimulatorSpec::from_json) {
            Some(Ok(spec)) => spec,
            Some(Err(e)) => {
                warn!("Unsupported simulator ({}), falling back to {}", e, Fcv1Simulator::ID);
                SimulatorSpec::default()
            }
            None => {
                warn!("No simulator given, falling back to {}", Fcv1Simulator::ID);
                SimulatorSpec::default()
            }
        };
        let simulator = spec.build();

        let players = order.iter()
            .enumerate()
            .map(|(slot, &description)| {
                let spec = match init.players.get(description).map(PlayerSpec::from_json) {
                    Some(Ok(spec)) => spec,
                    Some(Err(e)) => {
                        warn!("Unsupported player {} ({}), using the default", description, e);
                        PlayerSpec::default()
                    }
                    None => {
                        warn!("No player description {}, using the default", description);
                        PlayerSpec::default()
                    }
                };
                let seed = derive_player_seed(init.game_id, init.team.as_str(), slot);
                spec.build(seed)
            })
            .collect::<Vec<_>>();

        info!(
            "Session ready: team={} simulator={} players=[{}]",
            init.team.as_str(),
            simulator.id(),
            players.iter().map(|p| p.id()).collect::<Vec<_>>().join(", "),
        );

        let snapshot = simulator.snapshot();
        Self {
            team: init.team,
            setting: init.setting,
            simulator,
            snapshot,
            players,
        }
    }

    /// This side's team.
    pub fn team(&self) -> Team {
        self.team
    }

    /// Match settings.
    pub fn setting(&self) -> &GameSetting {
        &self.setting
    }

    /// Session simulator.
    pub fn simulator(&self) -> &Fcv1Simulator {
        &self.simulator
    }

    /// Capture the simulator into the session snapshot.
    pub fn save_snapshot(&mut self) {
        self.simulator.save(&mut self.snapshot);
    }

    /// Return the simulator to the session snapshot.
    pub fn restore_snapshot(&mut self) {
        self.simulator.load(&self.snapshot);
    }

    /// Thrower for a shot number (`shot / 4`).
    pub fn player_for_shot(&mut self, shot: u8) -> &mut dyn Player {
        let slot = Self::slot_for_shot(shot, self.players.len());
        self.players[slot].as_mut()
    }

    fn slot_for_shot(shot: u8, count: usize) -> usize {
        (shot as usize / 4).min(count.saturating_sub(1))
    }

    /// Play `mv` from `state` with zero thinking time and return the result.
    ///
    /// The simulator is restored to the snapshot first; the input state is
    /// left untouched.
    pub fn rollout(&mut self, state: &GameState, mv: &Move) -> Result<GameState, RuleError> {
        self.simulator.load(&self.snapshot);

        let mut next = state.clone();
        let slot = Self::slot_for_shot(state.shot, self.players.len());
        apply_move(
            &self.setting,
            &mut self.simulator,
            self.players[slot].as_mut(),
            &mut next,
            mv,
            Duration::ZERO,
        )?;
        Ok(next)
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("team", &self.team)
            .field("setting", &self.setting)
            .field("simulator", &self.simulator.id())
            .field("players", &self.players.iter().map(|p| p.id()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::core::vec2::Vec2;
    use crate::game::moves::{Rotation, Shot};
    use crate::game::player::{IdenticalPlayer, NormalDistPlayer};
    use crate::game::state::{Transform, TEE};

    fn identical_players() -> Vec<Value> {
        vec![json!({"type": "identical", "max_speed": 4.0, "min_speed": 0.0, "rotation_speed": 1.57}); 4]
    }

    fn create_test_session(players: &[Value]) -> GameSession {
        let simulator = json!({"type": "fcv1", "seconds_per_frame": 0.001});
        GameSession::new(
            SessionInit {
                team: Team::Team0,
                setting: GameSetting::default(),
                simulator: Some(&simulator),
                players,
                game_id: "test-game",
            },
            DEFAULT_PLAYER_ORDER,
        )
    }

    #[test]
    fn test_player_order_validation() {
        assert!(is_valid_player_order(&[0, 1, 2, 3]));
        assert!(is_valid_player_order(&[3, 1, 0, 2]));
        assert!(!is_valid_player_order(&[0, 0, 2, 3]));
        assert!(!is_valid_player_order(&[0, 1, 2, 4]));
    }

    #[test]
    fn test_fallbacks() {
        let simulator = json!({"type": "fcv9"});
        let players = vec![json!({"type": "robot"}), json!({"type": "identical"})];
        let mut session = GameSession::new(
            SessionInit {
                team: Team::Team1,
                setting: GameSetting::default(),
                simulator: Some(&simulator),
                players: &players,
                game_id: "g",
            },
            [1, 0, 2, 3],
        );

        assert_eq!(session.team(), Team::Team1);
        assert_eq!(session.simulator().id(), Fcv1Simulator::ID);
        // Slot 0 comes from description 1
        assert_eq!(session.player_for_shot(0).id(), IdenticalPlayer::ID);
        assert_eq!(session.player_for_shot(4).id(), NormalDistPlayer::ID);
        assert_eq!(session.player_for_shot(15).id(), NormalDistPlayer::ID);
    }

    #[test]
    fn test_player_for_shot_slots() {
        let mut players = identical_players();
        players[2] = json!({"type": "normal_dist", "max_speed": 4.0, "min_speed": 0.0,
                            "rotation_speed": 1.57, "stddev_speed": 0.01, "stddev_angle": 0.002});
        let mut session = create_test_session(&players);

        for shot in 0..16u8 {
            let expected = if shot / 4 == 2 { NormalDistPlayer::ID } else { IdenticalPlayer::ID };
            assert_eq!(session.player_for_shot(shot).id(), expected, "shot {shot}");
        }
    }

    #[test]
    fn test_rollout_leaves_input_untouched() {
        let mut session = create_test_session(&identical_players());
        let state = GameState::new(session.setting());
        let mv = Move::Shot(Shot::new(Vec2::new(0.1, 2.4), Rotation::Ccw));

        session.save_snapshot();
        let next = session.rollout(&state, &mv).unwrap();

        assert_eq!(state.shot, 0);
        assert_eq!(next.shot, 1);
        assert!(next.stones.team0[0].is_some());

        // Identical players make rollouts repeatable
        let again = session.rollout(&state, &mv).unwrap();
        assert_eq!(again, next);
    }

    #[test]
    fn test_restore_snapshot() {
        let mut session = create_test_session(&identical_players());
        session.save_snapshot();
        let before = *session.simulator().stones();

        let mut state = GameState::new(session.setting());
        state.stones.team1[0] = Some(Transform::new(TEE, 0.0));
        session.rollout(&state, &Move::Shot(Shot::new(Vec2::new(-0.1, 2.4), Rotation::Cw)))
            .unwrap();
        assert_ne!(*session.simulator().stones(), before);

        session.restore_snapshot();
        assert_eq!(*session.simulator().stones(), before);
    }

    #[test]
    fn test_rollout_after_game_over() {
        let mut session = create_test_session(&identical_players());
        let mut state = GameState::new(session.setting());
        state = session.rollout(&state, &Move::Concede).unwrap();
        assert!(state.is_game_over());
        assert_eq!(session.rollout(&state, &Move::Concede), Err(RuleError::GameAlreadyOver));
    }
}
