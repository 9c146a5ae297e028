//! Player Models
//!
//! A player turns the requested shot into what actually leaves the hack:
//! speed is clamped to the player's range and execution noise is applied.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::moves::Shot;
use crate::game::simulator::StoneState;

/// Execution model for one thrower.
pub trait Player {
    /// Identifier of this player variant (e.g. `"normal_dist"`).
    fn id(&self) -> &'static str;

    /// Launch state of the thrown stone at the delivery origin.
    fn play(&mut self, shot: &Shot) -> StoneState;
}

/// Speed range and spin shared by every player variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerLimits {
    /// Fastest deliverable speed (m/s)
    pub max_speed: f32,
    /// Slowest deliverable speed (m/s)
    pub min_speed: f32,
    /// Magnitude of the imparted angular velocity (rad/s)
    pub rotation_speed: f32,
}

impl Default for PlayerLimits {
    fn default() -> Self {
        Self {
            max_speed: 4.0,
            min_speed: 0.0,
            rotation_speed: 1.57,
        }
    }
}

impl PlayerLimits {
    fn launch(&self, speed: f32, angle: f32, shot: &Shot) -> StoneState {
        StoneState {
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::from_polar(speed, angle),
            angular_velocity: shot.rotation.factor() * self.rotation_speed,
        }
    }

    fn clamp_speed(&self, speed: f32) -> f32 {
        speed.clamp(self.min_speed, self.max_speed)
    }
}

/// Executes every shot exactly as requested (after clamping).
#[derive(Clone, Debug, Default)]
pub struct IdenticalPlayer {
    limits: PlayerLimits,
}

impl IdenticalPlayer {
    /// Identifier on the wire.
    pub const ID: &'static str = "identical";

    /// Create with the given limits.
    pub fn new(limits: PlayerLimits) -> Self {
        Self { limits }
    }
}

impl Player for IdenticalPlayer {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn play(&mut self, shot: &Shot) -> StoneState {
        let speed = self.limits.clamp_speed(shot.velocity.length());
        self.limits.launch(speed, shot.velocity.angle(), shot)
    }
}

/// Adds normally distributed error to speed and direction.
#[derive(Clone, Debug)]
pub struct NormalDistPlayer {
    limits: PlayerLimits,
    stddev_speed: f32,
    stddev_angle: f32,
    rng: DeterministicRng,
}

impl NormalDistPlayer {
    /// Identifier on the wire.
    pub const ID: &'static str = "normal_dist";

    /// Default speed error (m/s).
    pub const DEFAULT_STDDEV_SPEED: f32 = 0.0076;

    /// Default direction error (rad).
    pub const DEFAULT_STDDEV_ANGLE: f32 = 0.0018;

    /// Create a player drawing noise from `seed`.
    pub fn new(limits: PlayerLimits, stddev_speed: f32, stddev_angle: f32, seed: u64) -> Self {
        Self {
            limits,
            stddev_speed,
            stddev_angle,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Default player drawing noise from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(
            PlayerLimits::default(),
            Self::DEFAULT_STDDEV_SPEED,
            Self::DEFAULT_STDDEV_ANGLE,
            seed,
        )
    }
}

impl Player for NormalDistPlayer {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn play(&mut self, shot: &Shot) -> StoneState {
        let requested = self.limits.clamp_speed(shot.velocity.length());
        let speed = self.rng.next_normal(requested, self.stddev_speed).max(0.0);
        let angle = self.rng.next_normal(shot.velocity.angle(), self.stddev_angle);
        self.limits.launch(speed, angle, shot)
    }
}

// =============================================================================
// PLAYER DESCRIPTION
// =============================================================================

/// Player description carried in `is_ready` (`game.players.<team>[i]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerSpec {
    /// Gaussian execution error
    NormalDist {
        /// Speed range and spin
        #[serde(flatten)]
        limits: PlayerLimits,
        /// Speed error (m/s)
        #[serde(default = "default_stddev_speed")]
        stddev_speed: f32,
        /// Direction error (rad)
        #[serde(default = "default_stddev_angle")]
        stddev_angle: f32,
    },
    /// No execution error
    Identical {
        /// Speed range and spin
        #[serde(flatten)]
        limits: PlayerLimits,
    },
}

fn default_stddev_speed() -> f32 {
    NormalDistPlayer::DEFAULT_STDDEV_SPEED
}

fn default_stddev_angle() -> f32 {
    NormalDistPlayer::DEFAULT_STDDEV_ANGLE
}

impl Default for PlayerSpec {
    fn default() -> Self {
        PlayerSpec::NormalDist {
            limits: PlayerLimits::default(),
            stddev_speed: NormalDistPlayer::DEFAULT_STDDEV_SPEED,
            stddev_angle: NormalDistPlayer::DEFAULT_STDDEV_ANGLE,
        }
    }
}

impl PlayerSpec {
    /// Decode a description. Fails for absent or unsupported players.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Build the player this description names.
    pub fn build(&self, seed: u64) -> Box<dyn Player> {
        match self {
            PlayerSpec::NormalDist { limits, stddev_speed, stddev_angle } => {
                Box::new(NormalDistPlayer::new(*limits, *stddev_speed, *stddev_angle, seed))
            }
            PlayerSpec::Identical { limits } => Box::new(IdenticalPlayer::new(*limits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::Rotation;

    #[test]
    fn test_identical_player_is_exact() {
        let mut player = IdenticalPlayer::default();
        let shot = Shot::new(Vec2::new(0.1, 2.4), Rotation::Cw);
        let launch = player.play(&shot);

        assert!((launch.linear_velocity - shot.velocity).length() < 1e-5);
        assert_eq!(launch.angular_velocity, -1.57);
        assert_eq!(launch.position, Vec2::ZERO);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut player = IdenticalPlayer::default();
        let launch = player.play(&Shot::new(Vec2::new(0.0, 9.0), Rotation::Ccw));
        assert!((launch.speed() - 4.0).abs() < 1e-5);
        assert_eq!(launch.angular_velocity, 1.57);
    }

    #[test]
    fn test_normal_dist_player_varies_but_stays_close() {
        let mut player = NormalDistPlayer::with_seed(99);
        let shot = Shot::new(Vec2::new(0.0, 2.4), Rotation::Ccw);

        let a = player.play(&shot);
        let b = player.play(&shot);
        assert_ne!(a.linear_velocity, b.linear_velocity);

        for launch in [a, b] {
            assert!((launch.speed() - 2.4).abs() < 0.1);
            assert!((launch.linear_velocity.angle() - shot.velocity.angle()).abs() < 0.02);
        }
    }

    #[test]
    fn test_same_seed_same_noise() {
        let shot = Shot::new(Vec2::new(0.2, 3.0), Rotation::Cw);
        let mut p1 = NormalDistPlayer::with_seed(5);
        let mut p2 = NormalDistPlayer::with_seed(5);
        for _ in 0..10 {
            assert_eq!(p1.play(&shot), p2.play(&shot));
        }
    }

    #[test]
    fn test_player_spec_decoding() {
        let spec = PlayerSpec::from_json(&serde_json::json!({
            "type": "normal_dist",
            "max_speed": 4.0,
            "min_speed": 0.0,
            "rotation_speed": 1.57,
            "stddev_speed": 0.0076,
            "stddev_angle": 0.0018
        }))
        .unwrap();
        assert_eq!(spec, PlayerSpec::default());
        assert_eq!(spec.build(1).id(), NormalDistPlayer::ID);

        let identical = PlayerSpec::from_json(&serde_json::json!({
            "type": "identical",
            "max_speed": 3.5,
            "min_speed": 0.5,
            "rotation_speed": 1.0
        }))
        .unwrap();
        assert_eq!(identical.build(1).id(), IdenticalPlayer::ID);

        // Omitted parameters take the defaults
        let bare = PlayerSpec::from_json(&serde_json::json!({"type": "normal_dist"})).unwrap();
        assert_eq!(bare, PlayerSpec::default());

        assert!(PlayerSpec::from_json(&serde_json::json!({"type": "robot"})).is_err());
    }
}
