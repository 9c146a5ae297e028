//! Velocity Estimator
//!
//! Inverts the fcv1 stone dynamics: given where a stone should be and how
//! fast it should be moving when it gets there, produce the launch velocity.
//!
//! The launch speed comes from regression fits over the target distance;
//! the launch direction is corrected by running one unobstructed trial shot
//! and measuring how far it curls.

use crate::core::vec2::Vec2;
use crate::game::moves::Rotation;
use crate::game::simulator::{AllStones, Fcv1Simulator, Simulator, StoneState, STONE_COUNT};

/// Angular speed imparted to the trial shot (rad/s).
pub const TRIAL_ANGULAR_SPEED: f32 = 1.57;

/// Highest arrival speed the fits cover (m/s).
pub const MAX_ARRIVAL_SPEED: f32 = 4.0;

/// Regression coefficients for one arrival-speed band.
///
/// `c0` is a polynomial in `r` (highest power first), `c1 = -k1[0] ln(r + k1[1]) + k1[2]`,
/// `c2 = k2[0] r + k2[1]`.
struct Band {
    k0: &'static [f32],
    k1: [f32; 3],
    k2: [f32; 2],
}

/// Arrival speed `<= 0.05`.
static DRAW_BAND: Band = Band {
    k0: &[0.0005048122574925176, 0.2756242531609261],
    k1: [0.00046669575066030805, -29.898958358378636, -0.0014030973174948508],
    k2: [0.13968687866736632, 0.41120940058777616],
};

/// Arrival speed `<= 1.0`.
static SOFT_BAND: Band = Band {
    k0: &[-0.0014309170115803444, 0.9858457898438147],
    k1: [-0.0008339331735471273, -29.86751291726946, -0.19811799977982522],
    k2: [0.13967323742978, 0.42816312110477517],
};

/// Arrival speed `> 1.0`.
static HIT_BAND: Band = Band {
    k0: &[
        1.0833113118071224e-06,
        -0.00012132851917870833,
        0.004578093297561233,
        0.9767006869364527,
    ],
    k1: [0.07950648211492622, -8.228225657195706, -0.05601306077702578],
    k2: [0.14140440186382008, 0.3875782508767419],
};

impl Band {
    fn for_speed(speed: f32) -> &'static Band {
        if speed <= 0.05 {
            &DRAW_BAND
        } else if speed <= 1.0 {
            &SOFT_BAND
        } else {
            &HIT_BAND
        }
    }

    fn launch_speed(&self, r: f32, speed: f32) -> f32 {
        let c0 = self.k0.iter().fold(0.0, |acc, k| acc * r + k);
        let c1 = -self.k1[0] * (r + self.k1[1]).ln() + self.k1[2];
        let c2 = self.k2[0] * r + self.k2[1];
        (c0 * speed * speed + c1 * speed + c2).sqrt()
    }
}

/// Launch speed that brings a stone `distance` meters from the delivery
/// origin at `speed` m/s.
pub fn launch_speed(distance: f32, speed: f32) -> f32 {
    debug_assert!((0.0..=MAX_ARRIVAL_SPEED).contains(&speed), "arrival speed out of range: {speed}");
    debug_assert!(distance > 0.0, "target at the delivery origin");

    Band::for_speed(speed).launch_speed(distance, speed)
}

/// Launch-velocity estimator owning its trial simulator.
#[derive(Debug, Default)]
pub struct VelocityEstimator {
    simulator: Option<Fcv1Simulator>,
}

impl VelocityEstimator {
    /// Create an estimator; the trial simulator is built on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch velocity reaching `target` at `speed` with `rotation`.
    ///
    /// `speed == 0` is a draw; higher speeds are hits.
    pub fn estimate(&mut self, target: Vec2, speed: f32, rotation: Rotation) -> Vec2 {
        let v0 = launch_speed(target.length(), speed);
        debug_assert!(speed < v0, "launch speed {v0} not above arrival speed {speed}");

        let delta = self.curl_offset(v0, speed, rotation);
        let angle = target.angle() + delta.x.atan2(delta.y);
        Vec2::from_polar(v0, angle)
    }

    /// Where a straight-up shot at `v0` is when it has slowed to `speed`.
    fn curl_offset(&mut self, v0: f32, speed: f32, rotation: Rotation) -> Vec2 {
        let simulator = self.simulator.get_or_insert_with(Fcv1Simulator::default);

        let mut stones: AllStones = [None; STONE_COUNT];
        stones[0] = Some(StoneState {
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::new(0.0, v0),
            angular_velocity: TRIAL_ANGULAR_SPEED * rotation.factor(),
        });
        simulator.set_stones(&stones);

        while !simulator.are_all_stones_stopped() {
            match simulator.stones()[0] {
                Some(stone) if stone.speed() <= speed => return stone.position,
                Some(_) => simulator.step(),
                None => break,
            }
        }

        simulator.stones()[0]
            .map(|stone| stone.position)
            .unwrap_or(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::game::state::TEE;

    /// Run `velocity` to rest (or to `speed`) on an empty sheet.
    fn landing(velocity: Vec2, rotation: Rotation, speed: f32) -> Vec2 {
        let mut sim = Fcv1Simulator::default();
        let mut stones: AllStones = [None; STONE_COUNT];
        stones[0] = Some(StoneState {
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: velocity,
            angular_velocity: TRIAL_ANGULAR_SPEED * rotation.factor(),
        });
        sim.set_stones(&stones);
        while !sim.are_all_stones_stopped() && sim.stones()[0].unwrap().speed() > speed {
            sim.step();
        }
        sim.stones()[0].unwrap().position
    }

    #[test]
    fn test_band_boundaries() {
        let r = TEE.length();
        assert!(std::ptr::eq(Band::for_speed(0.0), &DRAW_BAND));
        assert!(std::ptr::eq(Band::for_speed(0.05), &DRAW_BAND));
        assert!(std::ptr::eq(Band::for_speed(1.0), &SOFT_BAND));
        assert!(std::ptr::eq(Band::for_speed(1.5), &HIT_BAND));
        assert!(launch_speed(r, 0.0) > 2.0 && launch_speed(r, 0.0) < 3.0);
    }

    #[test]
    fn test_draw_reaches_tee() {
        let mut estimator = VelocityEstimator::new();
        for rotation in [Rotation::Ccw, Rotation::Cw] {
            let v = estimator.estimate(TEE, 0.0, rotation);
            let rest = landing(v, rotation, 0.0);
            assert!(rest.distance(TEE) < 0.5, "{rotation} draw stopped at {rest:?}");
        }
    }

    #[test]
    fn test_aim_opposes_curl() {
        let mut estimator = VelocityEstimator::new();
        let ccw = estimator.estimate(TEE, 0.0, Rotation::Ccw);
        let cw = estimator.estimate(TEE, 0.0, Rotation::Cw);

        // Counter-clockwise curls left, so it is aimed right
        assert!(ccw.x > 0.0);
        assert!(cw.x < 0.0);
        assert!((ccw.length() - cw.length()).abs() < 1e-4);
    }

    #[test]
    fn test_hit_passes_target_moving() {
        let mut estimator = VelocityEstimator::new();
        let target = Vec2::new(0.3, 37.0);
        let v = estimator.estimate(target, 2.0, Rotation::Ccw);
        let at = landing(v, Rotation::Ccw, 2.0);
        assert!(at.distance(target) < 1.0, "hit reached {at:?}");
    }

    #[test]
    fn test_simulator_is_built_lazily() {
        let mut estimator = VelocityEstimator::new();
        assert!(estimator.simulator.is_none());
        estimator.estimate(TEE, 0.0, Rotation::Ccw);
        assert!(estimator.simulator.is_some());
    }

    proptest! {
        #[test]
        fn prop_launch_faster_than_arrival(
            x in -2.0f32..2.0,
            y in 32.0f32..41.0,
            speed in 0.0f32..=4.0,
        ) {
            let r = Vec2::new(x, y).length();
            prop_assert!(launch_speed(r, speed) > speed);
        }
    }
}
