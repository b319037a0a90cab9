use rand::SeedableRng as _;
use rand_chacha::ChaChaRng;

/// The pseudo random generator owned by every randomised component.
///
/// Each component owns its own instance so that, for instance, the delay
/// stream of the network and the loss decisions of a probe simulator can
/// be varied independently.
pub type SimRng = ChaChaRng;

/// Create a [`SimRng`] from an optional seed.
///
/// The same seed always yields the same stream. `None` seeds from the
/// operating system and is not reproducible.
///
/// ```
/// # use probesim_core::seeded_rng;
/// use rand::Rng as _;
///
/// let a: u64 = seeded_rng(Some(42)).gen_range(0..u64::MAX);
/// let b: u64 = seeded_rng(Some(42)).gen_range(0..u64::MAX);
/// assert_eq!(a, b);
/// ```
pub fn seeded_rng(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => ChaChaRng::seed_from_u64(seed),
        None => ChaChaRng::from_entropy(),
    }
}
