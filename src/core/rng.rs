//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for fast, reproducible randomness. The player models
//! draw their execution noise from here, so a match replayed with the same
//! `game_id` produces the same trial outcomes.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use curling_engine::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
    /// Second Box-Muller output, kept for the next normal draw.
    spare_normal: Option<f32>,
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state, spare_normal: None }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a uniform `f32` in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // 24 high bits fill the f32 mantissa exactly
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Generate a normally distributed `f32` with the given mean and
    /// standard deviation (Box-Muller).
    pub fn next_normal(&mut self, mean: f32, stddev: f32) -> f32 {
        if let Some(z) = self.spare_normal.take() {
            return mean + stddev * z;
        }

        // u1 in (0, 1] so ln(u1) is finite
        let u1 = 1.0 - self.next_f32();
        let u2 = self.next_f32();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = std::f32::consts::TAU * u2;

        self.spare_normal = Some(radius * theta.sin());
        mean + stddev * radius * theta.cos()
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the noise seed for one player slot.
///
/// Mixes the server-assigned `game_id`, the team name and the slot index so
/// that each of the four players draws an independent stream.
pub fn derive_player_seed(game_id: &str, team: &str, slot: usize) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"CURLING_ENGINE_PLAYER_V1");
    hasher.update(game_id.as_bytes());
    hasher.update(team.as_bytes());
    hasher.update((slot as u64).to_le_bytes());

    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================
