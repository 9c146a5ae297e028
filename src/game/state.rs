//! Game State Definitions
//!
//! Match snapshot types exchanged with the server, plus the sheet geometry
//! the rules and the planner measure against.

use std::ops::{Index, IndexMut};
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

// =============================================================================
// SHEET GEOMETRY
// =============================================================================

/// Y coordinate of the far tee line.
pub const TEE_LINE_Y: f32 = 38.405;

/// Center of the far house. Aiming reference for draws and hits.
pub const TEE: Vec2 = Vec2::new(0.0, TEE_LINE_Y);

/// Radius of the house (12-foot circle).
pub const HOUSE_RADIUS: f32 = 1.829;

/// Y coordinate of the far hog line.
pub const HOG_LINE_Y: f32 = 32.004;

/// Y coordinate of the far back line.
pub const BACK_LINE_Y: f32 = 40.234;

/// Stone radius.
pub const STONE_RADIUS: f32 = 0.145;

/// Stones thrown by each team per end.
pub const STONES_PER_TEAM: usize = 8;

/// Shots per end (both teams).
pub const SHOTS_PER_END: u8 = 16;

/// Whether a resting stone counts as being in the house.
pub fn is_in_house(stone: Option<&Transform>) -> bool {
    match stone {
        Some(t) => t.position.distance(TEE) < HOUSE_RADIUS + STONE_RADIUS,
        None => false,
    }
}

/// Whether a resting stone sits in the free guard zone: past the hog line,
/// short of the tee line and outside the house.
pub fn is_in_free_guard_zone(stone: Option<&Transform>) -> bool {
    match stone {
        Some(t) => {
            t.position.y + STONE_RADIUS >= HOG_LINE_Y
                && t.position.y < TEE_LINE_Y
                && !is_in_house(Some(t))
        }
        None => false,
    }
}

// =============================================================================
// TEAM
// =============================================================================

/// Team identity.
///
/// `Team0` throws first in the first end. `Invalid` is the sentinel used
/// before the server assigns a side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Team {
    /// First team
    #[serde(rename = "team0")]
    Team0,
    /// Second team
    #[serde(rename = "team1")]
    Team1,
    /// Unassigned
    #[default]
    #[serde(rename = "invalid")]
    Invalid,
}

impl Team {
    /// Index into per-team arrays (`None` for `Invalid`).
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            Team::Team0 => Some(0),
            Team::Team1 => Some(1),
            Team::Invalid => None,
        }
    }

    /// Team for a per-team array index.
    pub fn from_index(index: usize) -> Team {
        match index {
            0 => Team::Team0,
            1 => Team::Team1,
            _ => Team::Invalid,
        }
    }

    /// The other team (`Invalid` stays `Invalid`).
    #[inline]
    pub fn opponent(self) -> Team {
        match self {
            Team::Team0 => Team::Team1,
            Team::Team1 => Team::Team0,
            Team::Invalid => Team::Invalid,
        }
    }

    /// Wire name of this team.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Team0 => "team0",
            Team::Team1 => "team1",
            Team::Invalid => "invalid",
        }
    }
}

/// A value per team, serialized as `{"team0": .., "team1": ..}`.
///
/// Indexable by `0`/`1` like a two-element array.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PerTeam<T> {
    /// Value for team 0
    pub team0: T,
    /// Value for team 1
    pub team1: T,
}

impl<T> PerTeam<T> {
    /// Create from both values.
    pub const fn new(team0: T, team1: T) -> Self {
        Self { team0, team1 }
    }

    /// Value for `team` (`None` for `Invalid`).
    pub fn get(&self, team: Team) -> Option<&T> {
        team.index().map(|i| &self[i])
    }

    /// Mutable value for `team` (`None` for `Invalid`).
    pub fn get_mut(&mut self, team: Team) -> Option<&mut T> {
        team.index().map(move |i| &mut self[i])
    }
}

impl<T> Index<usize> for PerTeam<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match index {
            0 => &self.team0,
            1 => &self.team1,
            _ => panic!("team index out of range: {index}"),
        }
    }
}

impl<T> IndexMut<usize> for PerTeam<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match index {
            0 => &mut self.team0,
            1 => &mut self.team1,
            _ => panic!("team index out of range: {index}"),
        }
    }
}

// =============================================================================
// STONES
// =============================================================================

/// Resting pose of a stone on the sheet.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Position of the stone center
    pub position: Vec2,
    /// Orientation (radians)
    pub angle: f32,
}

impl Transform {
    /// Create a transform.
    pub const fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }
}

/// The 2x8 stone grid. `None` means the stone is not on the sheet.
pub type Stones = PerTeam<[Option<Transform>; STONES_PER_TEAM]>;

/// A `(team, stone-number)` position in the stone grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoneIndex {
    /// Team index (0 or 1)
    pub team: usize,
    /// Stone number within the team (0..8)
    pub stone: usize,
}

impl StoneIndex {
    /// Create an index.
    pub const fn new(team: usize, stone: usize) -> Self {
        Self { team, stone }
    }

    /// Flat index `team * 8 + stone` used by the simulator.
    #[inline]
    pub const fn flat(self) -> usize {
        self.team * STONES_PER_TEAM + self.stone
    }

    /// Inverse of [`StoneIndex::flat`].
    #[inline]
    pub const fn from_flat(flat: usize) -> Self {
        Self {
            team: flat / STONES_PER_TEAM,
            stone: flat % STONES_PER_TEAM,
        }
    }
}

// =============================================================================
// SETTINGS AND RESULT
// =============================================================================

/// Immutable match configuration received in `is_ready`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSetting {
    /// Number of regular ends
    pub max_end: u8,
    /// Sheet width in meters
    pub sheet_width: f32,
    /// Free guard zone rule for the first five shots of an end
    pub five_rock_rule: bool,
    /// Thinking time budget per team (seconds)
    pub thinking_time: PerTeam<f64>,
    /// Thinking time added per extra end (seconds)
    pub extra_end_thinking_time: PerTeam<f64>,
}

impl Default for GameSetting {
    fn default() -> Self {
        Self {
            max_end: 10,
            sheet_width: 4.75,
            five_rock_rule: true,
            thinking_time: PerTeam::new(219.0, 219.0),
            extra_end_thinking_time: PerTeam::new(40.0, 40.0),
        }
    }
}

/// Why the match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResultReason {
    /// Higher total after the last end
    Score,
    /// The other team conceded
    Concede,
    /// The other team ran out of thinking time
    TimeLimit,
}

/// Final result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// Winning team (`Invalid` for a draw)
    pub winner: Team,
    /// Why the match ended
    pub reason: GameResultReason,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Full match snapshot as carried by `update` messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Current end (0-based; `>= max_end` means an extra end)
    pub end: u8,

    /// Shot within the end (0..16)
    pub shot: u8,

    /// Team throwing last in this end
    pub hammer: Team,

    /// Stone layout
    pub stones: Stones,

    /// Per-end scores (`None` for ends not yet played)
    #[serde(default)]
    pub scores: PerTeam<Vec<Option<u8>>>,

    /// Score of the latest extra end
    #[serde(default)]
    pub extra_end_score: PerTeam<Option<u8>>,

    /// Remaining thinking time per team (seconds)
    #[serde(default)]
    pub thinking_time_remaining: PerTeam<f64>,

    /// Present once the match has concluded
    #[serde(default)]
    pub game_result: Option<GameResult>,
}

impl GameState {
    /// Initial state for a match with the given setting.
    pub fn new(setting: &GameSetting) -> Self {
        let ends = setting.max_end as usize;
        Self {
            end: 0,
            shot: 0,
            hammer: Team::Team1,
            stones: Stones::default(),
            scores: PerTeam::new(vec![None; ends], vec![None; ends]),
            extra_end_score: PerTeam::default(),
            thinking_time_remaining: setting.thinking_time.clone(),
            game_result: None,
        }
    }

    /// Team to throw the current shot.
    ///
    /// The team without the hammer throws the even shots.
    pub fn next_team(&self) -> Team {
        if self.shot % 2 == 0 {
            self.hammer.opponent()
        } else {
            self.hammer
        }
    }

    /// Whether the match has concluded.
    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_result.is_some()
    }

    /// Resting pose of a stone, if it is on the sheet.
    #[inline]
    pub fn stone(&self, index: StoneIndex) -> Option<&Transform> {
        self.stones[index.team][index.stone].as_ref()
    }

    /// Grid slot of the stone thrown by `team` on the current shot.
    ///
    /// `None` for the invalid team or a shot past the end.
    pub fn shot_stone_index(&self, team: Team) -> Option<StoneIndex> {
        if self.shot >= SHOTS_PER_END {
            return None;
        }
        team.index()
            .map(|t| StoneIndex::new(t, (self.shot / 2) as usize))
    }

    /// Total score of a team including the extra end.
    pub fn total_score(&self, team: Team) -> u32 {
        let regular = self.scores.get(team)
            .map(|s| s.iter().flatten().map(|&p| p as u32).sum())
            .unwrap_or(0);
        let extra = self.extra_end_score.get(team)
            .and_then(|s| *s)
            .map(|p| p as u32)
            .unwrap_or(0);
        regular + extra
    }

    /// Number of stones currently on the sheet.
    pub fn stones_in_play(&self) -> usize {
        (0..2)
            .map(|t| self.stones[t].iter().filter(|s| s.is_some()).count())
            .sum()
    }
}
