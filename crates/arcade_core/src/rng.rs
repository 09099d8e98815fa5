//! Seeded randomness.
//!
//! The only source of randomness in the simulation is a [`SimRng`] owned by
//! the simulation context and seeded from configuration. Samples are
//! produced as integers and converted to fixed-point so no float ever
//! touches simulation state.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math::Fixed;

/// Deterministic simulation RNG.
pub type SimRng = ChaCha8Rng;

/// Resolution of [`signed_unit`] samples.
const UNIT_STEPS: i32 = 1 << 16;

/// Create an RNG from a seed.
#[must_use]
pub fn seeded(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform sample in `[-1, 1]`.
pub fn signed_unit(rng: &mut impl Rng) -> Fixed {
    let step = rng.random_range(-UNIT_STEPS..=UNIT_STEPS);
    Fixed::from_num(step) / Fixed::from_num(UNIT_STEPS)
}

/// Multiplier in `[1 - range, 1 + range]`.
pub fn variance(rng: &mut impl Rng, range: Fixed) -> Fixed {
    Fixed::ONE + signed_unit(rng) * range
}

/// Either `1` or `-1`.
pub fn random_sign(rng: &mut impl Rng) -> i8 {
    if rng.random_bool(0.5) {
        1
    } else {
        -1
    }
}
