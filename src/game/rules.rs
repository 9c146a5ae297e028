//! Move Application ("normal" ruleset)
//!
//! Advances a [`GameState`] by one move: thinking-time accounting, running
//! the thrown stone to rest in the simulator, out-of-play removal, the
//! five-rock rule, end scoring and match termination.

use std::time::Duration;

use crate::core::vec2::Vec2;
use crate::game::moves::{Move, Shot};
use crate::game::player::Player;
use crate::game::simulator::{AllStones, Simulator, StoneState, STONE_COUNT};
use crate::game::state::{
    GameResult, GameResultReason, GameSetting, GameState, StoneIndex, Stones, Team,
    Transform, BACK_LINE_Y, HOG_LINE_Y, SHOTS_PER_END, STONE_RADIUS, TEE,
    is_in_free_guard_zone, is_in_house,
};

/// Number of opening shots protected by the five-rock rule.
const FIVE_ROCK_SHOTS: u8 = 5;

/// Errors from applying a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The match already has a result.
    #[error("Game is already over")]
    GameAlreadyOver,

    /// The state does not name a team to throw.
    #[error("No valid team to move (hammer: {0:?})")]
    InvalidTeam(Team),

    /// The shot counter is past the last stone of the end.
    #[error("Shot {0} is out of range")]
    InvalidShot(u8),
}

/// Apply `mv` for the team due to throw.
///
/// # Arguments
///
/// * `setting` - Match configuration
/// * `simulator` - Stepper used to run the shot (its state is overwritten)
/// * `player` - Execution model of the thrower
/// * `state` - Match state (will be mutated)
/// * `mv` - The move
/// * `thinking_time` - Time the team spent choosing the move
pub fn apply_move<S: Simulator + ?Sized>(
    setting: &GameSetting,
    simulator: &mut S,
    player: &mut dyn Player,
    state: &mut GameState,
    mv: &Move,
    thinking_time: Duration,
) -> Result<(), RuleError> {
    if state.is_game_over() {
        return Err(RuleError::GameAlreadyOver);
    }

    if state.shot >= SHOTS_PER_END {
        return Err(RuleError::InvalidShot(state.shot));
    }

    let team = state.next_team();
    let team_index = team.index().ok_or(RuleError::InvalidTeam(state.hammer))?;

    // 1. Thinking time
    let remaining = &mut state.thinking_time_remaining[team_index];
    *remaining -= thinking_time.as_secs_f64();
    if *remaining < 0.0 {
        state.game_result = Some(GameResult {
            winner: team.opponent(),
            reason: GameResultReason::TimeLimit,
        });
        return Ok(());
    }

    // 2. The move itself
    match mv {
        Move::Concede => {
            state.game_result = Some(GameResult {
                winner: team.opponent(),
                reason: GameResultReason::Concede,
            });
            return Ok(());
        }
        Move::Shot(shot) => {
            play_shot(setting, simulator, player, state, team_index, shot);
        }
    }

    // 3. Advance the shot counter, closing the end after the last stone
    state.shot += 1;
    if state.shot >= SHOTS_PER_END {
        finish_end(setting, state);
    }

    Ok(())
}

/// Whether a stone at `position` has left the playing area.
pub fn is_out_of_play(position: Vec2, sheet_width: f32) -> bool {
    !position.is_finite()
        || position.x.abs() + STONE_RADIUS > sheet_width * 0.5
        || position.y - STONE_RADIUS > BACK_LINE_Y
}

/// Convert the resting grid into simulator input.
pub fn to_simulator_stones(stones: &Stones) -> AllStones {
    let mut all: AllStones = [None; STONE_COUNT];
    for (flat, slot) in all.iter_mut().enumerate() {
        let index = StoneIndex::from_flat(flat);
        *slot = stones[index.team][index.stone]
            .map(|t| StoneState::at_rest(t.position, t.angle));
    }
    all
}

/// Convert simulator output back into the resting grid.
pub fn from_simulator_stones(all: &AllStones) -> Stones {
    let mut stones = Stones::default();
    for (flat, slot) in all.iter().enumerate() {
        let index = StoneIndex::from_flat(flat);
        stones[index.team][index.stone] = slot.map(|s| Transform::new(s.position, s.angle));
    }
    stones
}

/// Run one delivered stone to rest and update the layout.
fn play_shot<S: Simulator + ?Sized>(
    setting: &GameSetting,
    simulator: &mut S,
    player: &mut dyn Player,
    state: &mut GameState,
    team_index: usize,
    shot: &Shot,
) {
    let before = state.stones.clone();
    let thrown = StoneIndex::new(team_index, (state.shot / 2) as usize);

    let mut stones = to_simulator_stones(&state.stones);
    stones[thrown.flat()] = Some(player.play(shot));
    simulator.set_stones(&stones);

    while !simulator.are_all_stones_stopped() {
        simulator.step();
        remove_out_of_play(simulator, setting.sheet_width);
    }

    let mut after = from_simulator_stones(simulator.stones());

    // The delivered stone must come to rest beyond the hog line
    if let Some(t) = after[thrown.team][thrown.stone] {
        if t.position.y + STONE_RADIUS < HOG_LINE_Y {
            after[thrown.team][thrown.stone] = None;
        }
    }

    if setting.five_rock_rule
        && state.shot < FIVE_ROCK_SHOTS
        && removed_protected_guard(&before, &after, 1 - team_index)
    {
        // Guards restored, offending stone out of play
        after = before;
        after[thrown.team][thrown.stone] = None;
    }

    state.stones = after;
}

/// Drop stones that crossed a side line or the back line.
fn remove_out_of_play<S: Simulator + ?Sized>(simulator: &mut S, sheet_width: f32) {
    let out = simulator.stones()
        .iter()
        .any(|s| s.is_some_and(|s| is_out_of_play(s.position, sheet_width)));

    if out {
        let mut stones = *simulator.stones();
        for slot in stones.iter_mut() {
            if slot.is_some_and(|s| is_out_of_play(s.position, sheet_width)) {
                *slot = None;
            }
        }
        simulator.set_stones(&stones);
    }
}

/// Whether a free-guard-zone stone of `guarded_team` was knocked out of play.
fn removed_protected_guard(before: &Stones, after: &Stones, guarded_team: usize) -> bool {
    before[guarded_team]
        .iter()
        .zip(after[guarded_team].iter())
        .any(|(b, a)| is_in_free_guard_zone(b.as_ref()) && a.is_none())
}

/// Score of the current layout: the scoring team and its points,
/// or `None` for a blank end.
pub fn score_end(stones: &Stones) -> Option<(Team, u8)> {
    let mut in_house: Vec<(f32, usize)> = Vec::with_capacity(STONE_COUNT);
    for team in 0..2 {
        for stone in stones[team].iter().flatten() {
            if is_in_house(Some(stone)) {
                in_house.push((stone.position.distance(TEE), team));
            }
        }
    }

    in_house.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (_, scoring_team) = *in_house.first()?;
    let points = in_house.iter()
        .take_while(|(_, team)| *team == scoring_team)
        .count();

    Some((Team::from_index(scoring_team), points as u8))
}

/// Record the end score, pass the hammer and check for the end of the match.
fn finish_end(setting: &GameSetting, state: &mut GameState) {
    let score = score_end(&state.stones);
    let (scorer, points) = match score {
        Some((team, points)) => (team.index(), points),
        None => (None, 0),
    };

    let end = state.end as usize;
    for team in 0..2 {
        let value = if Some(team) == scorer { points } else { 0 };
        if end < setting.max_end as usize {
            if let Some(slot) = state.scores[team].get_mut(end) {
                *slot = Some(value);
            }
        } else {
            state.extra_end_score[team] = Some(value);
        }
    }

    // The scoring team gives up the hammer; a blank end keeps it
    if let Some(team) = scorer {
        state.hammer = Team::from_index(team).opponent();
    }

    state.stones = Stones::default();
    state.shot = 0;
    state.end = state.end.saturating_add(1);

    if state.end >= setting.max_end {
        let total0 = state.total_score(Team::Team0);
        let total1 = state.total_score(Team::Team1);
        if total0 != total1 {
            state.game_result = Some(GameResult {
                winner: if total0 > total1 { Team::Team0 } else { Team::Team1 },
                reason: GameResultReason::Score,
            });
        } else {
            // Tied: play an extra end
            for team in 0..2 {
                state.thinking_time_remaining[team] += setting.extra_end_thinking_time[team];
            }
        }
    }
}
