//! Moves
//!
//! The action a team submits on its turn.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

/// Spin imparted to a thrown stone. Determines the curl direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// Counter-clockwise (curls left, toward -X)
    Ccw,
    /// Clockwise (curls right, toward +X)
    Cw,
}

impl Rotation {
    /// Sign of the angular velocity for this rotation.
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            Rotation::Ccw => 1.0,
            Rotation::Cw => -1.0,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rotation::Ccw => f.write_str("ccw"),
            Rotation::Cw => f.write_str("cw"),
        }
    }
}

/// Launch a stone from the delivery origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Launch velocity (m/s)
    pub velocity: Vec2,
    /// Spin direction
    pub rotation: Rotation,
}

impl Shot {
    /// Create a shot.
    pub const fn new(velocity: Vec2, rotation: Rotation) -> Self {
        Self { velocity, rotation }
    }
}

/// A team's action for one turn.
///
/// Wire form: `{"type":"shot","velocity":{..},"rotation":"ccw"}` or
/// `{"type":"concede"}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    /// Throw a stone
    Shot(Shot),
    /// Give up the match
    Concede,
}

impl From<Shot> for Move {
    fn from(shot: Shot) -> Self {
        Move::Shot(shot)
    }
}

impl Move {
    /// The shot, if this move is one.
    pub fn as_shot(&self) -> Option<&Shot> {
        match self {
            Move::Shot(shot) => Some(shot),
            Move::Concede => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shot_wire_form() {
        let mv = Move::Shot(Shot::new(Vec2::new(0.25, 2.5), Rotation::Ccw));
        let json = serde_json::to_value(mv).unwrap();
        assert_eq!(json["type"], "shot");
        assert_eq!(json["rotation"], "ccw");
        assert_eq!(json["velocity"]["x"], 0.25);
        assert_eq!(json["velocity"]["y"], 2.5);
    }

    #[test]
    fn test_concede_wire_form() {
        let json = serde_json::to_string(&Move::Concede).unwrap();
        assert_eq!(json, r#"{"type":"concede"}"#);
    }

    #[test]
    fn test_move_roundtrip() {
        let moves = [
            Move::Shot(Shot::new(Vec2::new(-0.0831, 2.3172), Rotation::Cw)),
            Move::Shot(Shot::new(Vec2::new(0.1, 3.9), Rotation::Ccw)),
            Move::Concede,
        ];

        for mv in moves {
            let json = serde_json::to_string(&mv).unwrap();
            let parsed: Move = serde_json::from_str(&json).unwrap();
            match (mv, parsed) {
                (Move::Shot(a), Move::Shot(b)) => {
                    assert_eq!(a.rotation, b.rotation);
                    assert!((a.velocity.x - b.velocity.x).abs() < 1e-6);
                    assert!((a.velocity.y - b.velocity.y).abs() < 1e-6);
                }
                (Move::Concede, Move::Concede) => {}
                other => panic!("variant changed in round-trip: {other:?}"),
            }
        }
    }

    #[test]
    fn test_rotation_factor() {
        assert_eq!(Rotation::Ccw.factor(), 1.0);
        assert_eq!(Rotation::Cw.factor(), -1.0);
    }
}
