//! Stone Dynamics Simulator
//!
//! Discrete-time stepper for the 16 stones on the sheet. The [`Simulator`]
//! trait is the seam the rules and the planner drive; [`Fcv1Simulator`] is
//! the friction/curl model the velocity estimator was regressed against.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::collision::resolve_all_contacts;

/// Total stones tracked by the simulator (2 teams x 8).
pub const STONE_COUNT: usize = 16;

/// Standard gravity (m/s^2).
const GRAVITY: f32 = 9.80665;

/// Below this speed a stone is considered at rest (m/s).
const STOP_EPSILON: f32 = 1e-6;

/// Full dynamic state of one stone.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct StoneState {
    /// Center position
    pub position: Vec2,
    /// Orientation (radians)
    pub angle: f32,
    /// Linear velocity (m/s)
    pub linear_velocity: Vec2,
    /// Angular velocity (rad/s, positive = counter-clockwise)
    pub angular_velocity: f32,
}

impl StoneState {
    /// A stone resting at `position`.
    pub fn at_rest(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            angle,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
        }
    }

    /// Whether the stone has come to rest.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.linear_velocity.length_squared() <= STOP_EPSILON * STOP_EPSILON
    }

    /// Current speed (m/s).
    #[inline]
    pub fn speed(&self) -> f32 {
        self.linear_velocity.length()
    }
}

/// All stones, flat-indexed `team * 8 + stone`. `None` = off the sheet.
pub type AllStones = [Option<StoneState>; STONE_COUNT];

/// A discrete stone-dynamics stepper.
///
/// Implementations are single-writer: one caller drives `step` at a time.
pub trait Simulator {
    /// Opaque saved state.
    type Snapshot: Clone;

    /// Identifier of this simulator variant (e.g. `"fcv1"`).
    fn id(&self) -> &'static str;

    /// Replace the full 16-stone state.
    fn set_stones(&mut self, stones: &AllStones);

    /// Current 16-stone state.
    fn stones(&self) -> &AllStones;

    /// Advance exactly one tick.
    fn step(&mut self);

    /// Whether every stone on the sheet is at rest.
    fn are_all_stones_stopped(&self) -> bool;

    /// Duration of one tick (seconds).
    fn seconds_per_frame(&self) -> f32;

    /// Capture the current state into a fresh snapshot.
    fn snapshot(&self) -> Self::Snapshot;

    /// Capture the current state into an existing snapshot.
    fn save(&self, snapshot: &mut Self::Snapshot);

    /// Restore a previously captured state.
    fn load(&mut self, snapshot: &Self::Snapshot);
}

// =============================================================================
// FCV1
// =============================================================================

/// Longitudinal deceleration at `speed` (negative, m/s^2).
#[inline]
fn longitudinal_acceleration(speed: f32) -> f32 {
    -(0.00200985 / (speed + 0.06385782) + 0.00626286) * GRAVITY
}

/// Rate at which the direction of travel turns (rad/s).
#[inline]
fn yaw_rate(speed: f32, angular_velocity: f32) -> f32 {
    if angular_velocity.abs() <= f32::EPSILON || speed <= STOP_EPSILON {
        return 0.0;
    }
    angular_velocity.signum() * 0.00820 * speed.powf(-0.8)
}

/// Angular deceleration magnitude at `speed` (rad/s^2).
#[inline]
fn angular_deceleration(speed: f32) -> f32 {
    0.025 / speed.max(0.001)
}

/// Saved state of an [`Fcv1Simulator`].
#[derive(Clone, Debug, PartialEq)]
pub struct Fcv1Snapshot {
    stones: AllStones,
    frame: u64,
}

/// Friction-and-curl stepper ("fcv1").
#[derive(Clone, Debug)]
pub struct Fcv1Simulator {
    seconds_per_frame: f32,
    stones: AllStones,
    frame: u64,
}

impl Default for Fcv1Simulator {
    fn default() -> Self {
        Self::new(Fcv1Simulator::DEFAULT_SECONDS_PER_FRAME)
    }
}

impl Fcv1Simulator {
    /// Identifier on the wire.
    pub const ID: &'static str = "fcv1";

    /// Default tick length (seconds).
    pub const DEFAULT_SECONDS_PER_FRAME: f32 = 0.001;

    /// Create an empty simulator with the given tick length.
    pub fn new(seconds_per_frame: f32) -> Self {
        Self {
            seconds_per_frame,
            stones: [None; STONE_COUNT],
            frame: 0,
        }
    }

    /// Ticks advanced since the last `set_stones`.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance one stone by `dt` ignoring contacts.
    fn integrate(stone: &mut StoneState, dt: f32) {
        let speed = stone.speed();
        if speed > STOP_EPSILON {
            let new_speed = (speed + longitudinal_acceleration(speed) * dt).max(0.0);
            let direction = stone.linear_velocity
                .scale(1.0 / speed)
                .rotate(yaw_rate(speed, stone.angular_velocity) * dt);
            stone.linear_velocity = direction * new_speed;

            let spin_loss = angular_deceleration(speed) * dt;
            stone.angular_velocity = if stone.angular_velocity.abs() <= spin_loss {
                0.0
            } else {
                stone.angular_velocity - stone.angular_velocity.signum() * spin_loss
            };

            if new_speed <= STOP_EPSILON {
                stone.linear_velocity = Vec2::ZERO;
                stone.angular_velocity = 0.0;
            }
        } else {
            stone.linear_velocity = Vec2::ZERO;
            stone.angular_velocity = 0.0;
        }

        stone.position += stone.linear_velocity * dt;
        stone.angle += stone.angular_velocity * dt;
    }
}

impl Simulator for Fcv1Simulator {
    type Snapshot = Fcv1Snapshot;

    fn id(&self) -> &'static str {
        Self::ID
    }

    fn set_stones(&mut self, stones: &AllStones) {
        self.stones = *stones;
        self.frame = 0;
    }

    fn stones(&self) -> &AllStones {
        &self.stones
    }

    fn step(&mut self) {
        let dt = self.seconds_per_frame;
        for stone in self.stones.iter_mut().flatten() {
            Self::integrate(stone, dt);
        }
        resolve_all_contacts(&mut self.stones);
        self.frame += 1;
    }

    fn are_all_stones_stopped(&self) -> bool {
        self.stones.iter().flatten().all(StoneState::is_stopped)
    }

    fn seconds_per_frame(&self) -> f32 {
        self.seconds_per_frame
    }

    fn snapshot(&self) -> Fcv1Snapshot {
        Fcv1Snapshot {
            stones: self.stones,
            frame: self.frame,
        }
    }

    fn save(&self, snapshot: &mut Fcv1Snapshot) {
        snapshot.stones = self.stones;
        snapshot.frame = self.frame;
    }

    fn load(&mut self, snapshot: &Fcv1Snapshot) {
        self.stones = snapshot.stones;
        self.frame = snapshot.frame;
    }
}

// =============================================================================
// SIMULATOR DESCRIPTION
// =============================================================================

/// Simulator description carried in `is_ready` (`game.simulator`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulatorSpec {
    /// The friction/curl stepper
    Fcv1 {
        /// Tick length (seconds)
        #[serde(default = "default_seconds_per_frame")]
        seconds_per_frame: f32,
    },
}

fn default_seconds_per_frame() -> f32 {
    Fcv1Simulator::DEFAULT_SECONDS_PER_FRAME
}

impl Default for SimulatorSpec {
    fn default() -> Self {
        SimulatorSpec::Fcv1 {
            seconds_per_frame: Fcv1Simulator::DEFAULT_SECONDS_PER_FRAME,
        }
    }
}

impl SimulatorSpec {
    /// Decode a description. Fails for absent or unsupported simulators.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Build the simulator this description names.
    pub fn build(&self) -> Fcv1Simulator {
        match self {
            SimulatorSpec::Fcv1 { seconds_per_frame } => Fcv1Simulator::new(*seconds_per_frame),
        }
    }
}
