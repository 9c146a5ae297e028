//! Stone ordering by distance to the tee.

use crate::game::state::{StoneIndex, Stones, TEE};
use crate::game::simulator::STONE_COUNT;

/// Distance of a grid slot to the tee; absent stones are infinitely far.
fn tee_distance(stones: &Stones, index: StoneIndex) -> f32 {
    stones[index.team][index.stone]
        .map(|t| t.position.distance(TEE))
        .unwrap_or(f32::INFINITY)
}

/// All 16 grid slots, closest to the tee first.
///
/// The sort is stable: equal distances (including every absent stone) keep
/// `(team, stone)` order.
pub fn sort_stones(stones: &Stones) -> [StoneIndex; STONE_COUNT] {
    let mut order: [StoneIndex; STONE_COUNT] = std::array::from_fn(StoneIndex::from_flat);
    order.sort_by(|a, b| tee_distance(stones, *a).total_cmp(&tee_distance(stones, *b)));
    order
}
