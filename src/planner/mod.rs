//! Turn Planner
//!
//! Chooses this side's move from a match snapshot:
//!
//! 1. Order the stones by distance to the tee.
//! 2. Target the closest opponent stone; if there is none, draw to the tee.
//! 3. Search arrival speeds for a hit that removes the target and keeps the
//!    thrown stone in play.
//! 4. Score both rotations at that speed over several noisy rollouts and
//!    keep the better one.
//!
//! All rollouts run on the session simulator, which is returned to its
//! entry state before the move is handed back.

pub mod estimator;
pub mod ordering;

use tracing::{debug, info};

use crate::game::moves::{Move, Rotation, Shot};
use crate::game::state::{GameResultReason, GameState, StoneIndex, Team, TEE};
use crate::network::client::MatchHandler;
use crate::network::session::GameSession;

pub use estimator::{launch_speed, VelocityEstimator};
pub use ordering::sort_stones;

/// Rotations compared for a hit, in tie-break order.
const CANDIDATE_ROTATIONS: [Rotation; 2] = [Rotation::Ccw, Rotation::Cw];

/// Planner tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// First arrival speed tried for a hit (m/s).
    pub min_speed: f32,
    /// Speeds at or above this are not tried (m/s).
    pub max_speed: f32,
    /// Increment between tried speeds (m/s).
    pub speed_step: f32,
    /// Rollouts per rotation candidate.
    pub trials: u32,
    /// Rotation used while searching for the speed.
    pub search_rotation: Rotation,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_speed: 0.5,
            max_speed: 3.5,
            speed_step: 0.5,
            trials: 3,
            search_rotation: Rotation::Ccw,
        }
    }
}

impl PlannerConfig {
    /// Arrival speeds tried during the search, in order.
    pub fn speeds(&self) -> Vec<f32> {
        let min = self.min_speed.clamp(0.0, estimator::MAX_ARRIVAL_SPEED);
        let max = self.max_speed.min(estimator::MAX_ARRIVAL_SPEED + f32::EPSILON);
        if self.speed_step <= 0.0 || !self.speed_step.is_finite() {
            return vec![min];
        }

        (0u32..)
            .map(|i| min + self.speed_step * i as f32)
            .take_while(|speed| *speed < max)
            .collect()
    }
}

/// Rollout-based move selection.
#[derive(Debug, Default)]
pub struct TurnPlanner {
    config: PlannerConfig,
    estimator: VelocityEstimator,
}

impl TurnPlanner {
    /// Create a planner with the given tuning.
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            estimator: VelocityEstimator::new(),
        }
    }

    /// Planner tuning.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Choose the move for the team to throw in `state`.
    pub fn plan(&mut self, session: &mut GameSession, state: &GameState) -> Move {
        let order = sort_stones(&state.stones);
        session.save_snapshot();

        let my_team = session.team();
        let mv = match Self::find_target(&order, state, my_team) {
            Some(target) => self.hit(session, state, target),
            None => {
                debug!("No opponent stone in play, drawing to the tee");
                self.draw_to_tee()
            }
        };

        session.restore_snapshot();
        mv
    }

    /// Closest opponent stone still in play.
    fn find_target(order: &[StoneIndex], state: &GameState, my_team: Team) -> Option<StoneIndex> {
        let opponent = my_team.opponent().index()?;
        order.iter()
            .copied()
            .find(|index| index.team == opponent && state.stone(*index).is_some())
    }

    fn draw_to_tee(&mut self) -> Move {
        let rotation = Rotation::Ccw;
        Move::Shot(Shot::new(self.estimator.estimate(TEE, 0.0, rotation), rotation))
    }

    fn hit(&mut self, session: &mut GameSession, state: &GameState, target: StoneIndex) -> Move {
        let Some(position) = state.stone(target).map(|t| t.position) else {
            return self.draw_to_tee();
        };
        let own = state.shot_stone_index(session.team());
        debug!(
            "Target: team{} stone {} at ({:.3}, {:.3})",
            target.team, target.stone, position.x, position.y
        );

        // a. arrival speed
        let rotation = self.config.search_rotation;
        let mut chosen = self.config.min_speed;
        for speed in self.config.speeds() {
            chosen = speed;
            let shot = Shot::new(self.estimator.estimate(position, speed, rotation), rotation);
            if Self::trial(session, state, &Move::Shot(shot), own, target) == 2 {
                break;
            }
        }
        debug!("Arrival speed: {:.2}", chosen);

        // b-d. rotation candidates
        let candidates = CANDIDATE_ROTATIONS.map(|rotation| {
            Shot::new(self.estimator.estimate(position, chosen, rotation), rotation)
        });

        let mut points = [0u32; CANDIDATE_ROTATIONS.len()];
        for _trial in 0..self.config.trials {
            for (shot, score) in candidates.iter().zip(points.iter_mut()) {
                let result = Self::trial(session, state, &Move::Shot(*shot), own, target);
                #[cfg(feature = "debug-tracing")]
                tracing::trace!("Trial {} {}: {}", _trial, shot.rotation, result);
                *score += result;
            }
        }
        debug!("Candidate points: ccw={} cw={}", points[0], points[1]);

        let best = if points[1] > points[0] { 1 } else { 0 };
        Move::Shot(candidates[best])
    }

    /// One rollout: +1 if our stone stays in play, +1 if the target is gone.
    ///
    /// A rollout the rules reject scores nothing.
    fn trial(
        session: &mut GameSession,
        state: &GameState,
        mv: &Move,
        own: Option<StoneIndex>,
        target: StoneIndex,
    ) -> u32 {
        let Ok(next) = session.rollout(state, mv) else {
            return 0;
        };

        let kept = own.is_some_and(|index| next.stone(index).is_some());
        let removed = next.stone(target).is_none();
        u32::from(kept) + u32::from(removed)
    }
}

impl MatchHandler for TurnPlanner {
    fn on_my_turn(&mut self, session: &mut GameSession, state: &GameState) -> Move {
        self.plan(session, state)
    }

    fn on_game_over(&mut self, session: &GameSession, state: &GameState) {
        let team = session.team();
        let ours = state.total_score(team);
        let theirs = state.total_score(team.opponent());

        match &state.game_result {
            Some(result) if result.winner == team => info!("won the game"),
            Some(result) if result.winner == Team::Invalid => info!("drew the game"),
            Some(_) => info!("lost the game"),
            None => info!("game over without a result"),
        }

        let reason = state.game_result.as_ref().map(|r| match r.reason {
            GameResultReason::Score => "score",
            GameResultReason::Concede => "concede",
            GameResultReason::TimeLimit => "time_limit",
        });
        info!("Final score {}-{} (reason: {})", ours, theirs, reason.unwrap_or("none"));
    }
}
