use rand::Rng;
use rand::distributions::{Distribution as _, Standard};
use std::{fmt, str::FromStr};

/// Probability that a packet is lost before it is measured.
///
/// A validated rate in `[0.0, 1.0]`: `0.0` never drops, `1.0` drops
/// everything.
///
/// # Example
///
/// ```
/// use probesim_core::DropProbability;
///
/// let lossy = DropProbability::new(0.05).unwrap();
/// assert_eq!(lossy.to_string(), "5%");
///
/// // percentages and plain fractions are both accepted
/// assert_eq!("5%".parse::<DropProbability>().unwrap(), lossy);
/// assert_eq!("0.05".parse::<DropProbability>().unwrap(), lossy);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct DropProbability(f64);

impl DropProbability {
    /// Never drop.
    pub const ZERO: Self = Self(0.0);

    /// Create a validated drop probability.
    ///
    /// # Errors
    ///
    /// Returns [`DropProbabilityError`] if `rate` is NaN, negative, or
    /// greater than `1.0`.
    pub fn new(rate: f64) -> Result<Self, DropProbabilityError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(DropProbabilityError(rate));
        }
        Ok(Self(rate))
    }

    /// Build one of the literal defaults.
    pub(crate) const fn from_rate(rate: f64) -> Self {
        Self(rate)
    }

    /// Returns the inner `f64` value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Roll the dice: returns `true` if this packet should be dropped.
    ///
    /// Exactly one uniform `[0, 1)` value is drawn from `rng` on every
    /// call, whatever the rate, so the stream position of the caller's
    /// generator only depends on how many decisions were taken.
    pub fn should_drop<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let sample: f64 = Standard.sample(rng);
        sample < self.0
    }
}

impl fmt::Display for DropProbability {
    /// Formats as a percentage with up to 2 decimal places.
    ///
    /// - `0.0` → `"0%"`
    /// - `0.05` → `"5%"`
    /// - `0.123` → `"12.30%"`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        // If the percentage is a whole number, skip decimal places.
        if pct.fract() == 0.0 {
            write!(f, "{}%", pct as u64)
        } else {
            write!(f, "{:.2}%", pct)
        }
    }
}

impl FromStr for DropProbability {
    type Err = DropProbabilityParseError;

    /// Parses either a percentage (`"10%"`, `"12.5%"`) or a plain fraction
    /// (`"0.1"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let rate = match s.strip_suffix('%') {
            Some(num) => {
                let pct: f64 = num
                    .trim()
                    .parse()
                    .map_err(|_| DropProbabilityParseError::InvalidNumber)?;
                pct / 100.0
            }
            None => s
                .parse()
                .map_err(|_| DropProbabilityParseError::InvalidNumber)?,
        };
        Ok(DropProbability::new(rate)?)
    }
}

/// Error returned when constructing a [`DropProbability`] with a value
/// outside `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("drop probability must be in [0.0, 1.0], got {0}")]
pub struct DropProbabilityError(f64);

/// Error returned when parsing a [`DropProbability`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DropProbabilityParseError {
    /// The numeric part could not be parsed as a float.
    #[error("invalid drop probability number")]
    InvalidNumber,
    /// The parsed value is outside `[0, 1]` (or `[0%, 100%]`).
    #[error("{0}")]
    OutOfRange(#[from] DropProbabilityError),
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_chacha::ChaChaRng;

    use super::*;

    fn rng() -> ChaChaRng {
        ChaChaRng::seed_from_u64(42)
    }

    #[test]
    fn zero_never_drops() {
        let mut rng = rng();
        for _ in 0..1000 {
            assert!(!DropProbability::ZERO.should_drop(&mut rng));
        }
    }

    #[test]
    fn one_always_drops() {
        let mut rng = rng();
        let loss = DropProbability::new(1.0).unwrap();
        for _ in 0..1000 {
            assert!(loss.should_drop(&mut rng));
        }
    }

    #[test]
    fn tenth_approximately() {
        let loss = DropProbability::new(0.1).unwrap();
        let mut rng = rng();
        let drops: usize = (0..10_000).filter(|_| loss.should_drop(&mut rng)).count();
        assert!(drops > 800 && drops < 1200, "drop rate was {}/10000", drops);
    }

    #[test]
    fn reproducible_with_same_seed() {
        let loss = DropProbability::new(0.3).unwrap();
        let results_a: Vec<bool> = {
            let mut rng = ChaChaRng::seed_from_u64(99);
            (0..100).map(|_| loss.should_drop(&mut rng)).collect()
        };
        let results_b: Vec<bool> = {
            let mut rng = ChaChaRng::seed_from_u64(99);
            (0..100).map(|_| loss.should_drop(&mut rng)).collect()
        };
        assert_eq!(results_a, results_b);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(DropProbability::new(f64::NAN).is_err());
        assert!(DropProbability::new(-0.1).is_err());
        assert!(DropProbability::new(1.5).is_err());
    }

    #[test]
    fn error_display() {
        let err = DropProbability::new(2.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "drop probability must be in [0.0, 1.0], got 2"
        );
    }

    #[test]
    fn display() {
        assert_eq!(DropProbability::ZERO.to_string(), "0%");
        assert_eq!(DropProbability::new(0.1).unwrap().to_string(), "10%");
        assert_eq!(DropProbability::new(0.123).unwrap().to_string(), "12.30%");
    }

    #[test]
    fn parse() {
        assert_eq!(
            "10%".parse::<DropProbability>().unwrap(),
            DropProbability::new(0.1).unwrap()
        );
        assert_eq!(
            "1".parse::<DropProbability>().unwrap(),
            DropProbability::new(1.0).unwrap()
        );
        assert_eq!(
            "0%".parse::<DropProbability>().unwrap(),
            DropProbability::ZERO
        );
    }

    #[test]
    fn parse_errors() {
        assert!("abc%".parse::<DropProbability>().is_err());
        assert!("150%".parse::<DropProbability>().is_err());
        assert!("-1%".parse::<DropProbability>().is_err());
        assert!("".parse::<DropProbability>().is_err());
    }
}
