//! Collision Detection
//!
//! Stone-vs-stone contacts for the stepper. Stones are equal-mass discs;
//! contacts are resolved with a normal impulse.

use crate::core::vec2::Vec2;
use crate::game::simulator::AllStones;
use crate::game::state::STONE_RADIUS;

/// Coefficient of restitution for stone-on-stone impacts.
pub const RESTITUTION: f32 = 0.95;

/// Check if two circles overlap.
#[inline]
pub fn circles_overlap(
    pos_a: Vec2,
    radius_a: f32,
    pos_b: Vec2,
    radius_b: f32,
) -> bool {
    let combined_radius = radius_a + radius_b;
    pos_a.distance_squared(pos_b) <= combined_radius * combined_radius
}

/// A pair of overlapping, approaching stones (flat indices, `a < b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoneContact {
    /// First stone
    pub a: usize,
    /// Second stone
    pub b: usize,
}

/// Find all contacts in deterministic (index) order.
///
/// Pairs where neither stone is moving are skipped; resting stones that
/// touch are left alone.
pub fn find_contacts(stones: &AllStones) -> Vec<StoneContact> {
    let mut contacts = Vec::new();

    for i in 0..stones.len() {
        let Some(a) = &stones[i] else { continue };
        for j in (i + 1)..stones.len() {
            let Some(b) = &stones[j] else { continue };

            if a.is_stopped() && b.is_stopped() {
                continue;
            }

            if !circles_overlap(a.position, STONE_RADIUS, b.position, STONE_RADIUS) {
                continue;
            }

            let normal = b.position - a.position;
            let closing = (b.linear_velocity - a.linear_velocity).dot(normal);
            if closing < 0.0 {
                contacts.push(StoneContact { a: i, b: j });
            }
        }
    }

    contacts
}

/// Apply the impulse and positional separation for one contact.
pub fn resolve_contact(stones: &mut AllStones, contact: StoneContact) {
    let (Some(a), Some(b)) = (stones[contact.a], stones[contact.b]) else {
        return;
    };

    let normal = (b.position - a.position).normalize();
    if normal == Vec2::ZERO {
        return;
    }

    let closing = (b.linear_velocity - a.linear_velocity).dot(normal);
    if closing >= 0.0 {
        return;
    }

    // Equal masses: each stone takes half the impulse
    let impulse = -(1.0 + RESTITUTION) * closing * 0.5;
    let overlap = (2.0 * STONE_RADIUS - a.position.distance(b.position)).max(0.0);

    if let Some(sa) = stones[contact.a].as_mut() {
        sa.linear_velocity -= normal * impulse;
        sa.position -= normal * (overlap * 0.5);
    }
    if let Some(sb) = stones[contact.b].as_mut() {
        sb.linear_velocity += normal * impulse;
        sb.position += normal * (overlap * 0.5);
    }
}

/// Resolve every current contact. Returns how many were resolved.
pub fn resolve_all_contacts(stones: &mut AllStones) -> usize {
    let contacts = find_contacts(stones);
    for contact in &contacts {
        resolve_contact(stones, *contact);
    }
    contacts.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::simulator::StoneState;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn moving(position: Vec2, velocity: Vec2) -> Option<StoneState> {
        Some(StoneState {
            position,
            angle: 0.0,
            linear_velocity: velocity,
            angular_velocity: 0.0,
        })
    }

    #[test]
    fn test_circles_overlap() {
        let radius = 0.145;
        assert!(circles_overlap(Vec2::ZERO, radius, Vec2::new(0.28, 0.0), radius));
        assert!(!circles_overlap(Vec2::ZERO, radius, Vec2::new(0.3, 0.0), radius));
    }

    #[test]
    fn test_head_on_transfers_momentum() {
        let mut stones: AllStones = [None; 16];
        stones[0] = moving(Vec2::new(0.0, 10.0), Vec2::new(0.0, 2.0));
        stones[9] = moving(Vec2::new(0.0, 10.28), Vec2::ZERO);

        assert_eq!(resolve_all_contacts(&mut stones), 1);

        let shooter = stones[0].unwrap();
        let target = stones[9].unwrap();
        assert!(target.linear_velocity.y > 1.8);
        assert!(shooter.linear_velocity.y.abs() < 0.1);
        // Separated after resolution
        assert!(shooter.position.distance(target.position) >= 2.0 * STONE_RADIUS - 1e-4);
    }

    #[test]
    fn test_resting_stones_are_not_contacts() {
        let mut stones: AllStones = [None; 16];
        stones[0] = moving(Vec2::new(0.0, 38.0), Vec2::ZERO);
        stones[1] = moving(Vec2::new(0.0, 38.2), Vec2::ZERO);
        assert!(find_contacts(&stones).is_empty());
    }

    #[test]
    fn test_separating_stones_are_not_contacts() {
        let mut stones: AllStones = [None; 16];
        stones[0] = moving(Vec2::new(0.0, 10.0), Vec2::new(0.0, -1.0));
        stones[1] = moving(Vec2::new(0.0, 10.2), Vec2::new(0.0, 1.0));
        assert!(find_contacts(&stones).is_empty());
    }

    #[test]
    fn test_random_impacts_conserve_momentum() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let offset = Vec2::new(rng.gen_range(-0.28..0.28), rng.gen_range(0.05..0.28));
            let va = Vec2::new(rng.gen_range(-0.5..0.5), rng.gen_range(0.5..3.0));

            let mut stones: AllStones = [None; 16];
            stones[3] = moving(Vec2::new(0.0, 20.0), va);
            stones[12] = moving(Vec2::new(0.0, 20.0) + offset, Vec2::ZERO);

            let before = va;
            resolve_all_contacts(&mut stones);
            let after = stones[3].unwrap().linear_velocity + stones[12].unwrap().linear_velocity;

            assert!((before - after).length() < 1e-4, "momentum changed: {before:?} -> {after:?}");
        }
    }
}
