use rand::Rng;
use rand_distr::{Distribution as _, StandardNormal};
use std::fmt;

/// Parameters of a normal delay distribution, in milliseconds.
///
/// Both the mean and the standard deviation are finite and non negative.
/// A zero standard deviation describes a perfectly stable edge whose
/// delay is always its mean.
///
/// # Example
///
/// ```
/// use probesim_core::NormalParams;
///
/// let params = NormalParams::new(10.0, 2.0).unwrap();
/// assert_eq!(params.to_string(), "N(10ms, 2ms)");
///
/// assert!(NormalParams::new(-1.0, 2.0).is_err());
/// assert!(NormalParams::new(1.0, f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalParams {
    mean: f64,
    std: f64,
}

/// Error returned when constructing [`NormalParams`] from invalid values.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("mean delay must be finite and >= 0, got {0}")]
    InvalidMean(f64),
    #[error("delay standard deviation must be finite and >= 0, got {0}")]
    InvalidStd(f64),
}

impl NormalParams {
    /// Create validated distribution parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError`] if either value is negative, NaN or infinite.
    pub fn new(mean: f64, std: f64) -> Result<Self, ParamsError> {
        if !(mean.is_finite() && mean >= 0.0) {
            return Err(ParamsError::InvalidMean(mean));
        }
        if !(std.is_finite() && std >= 0.0) {
            return Err(ParamsError::InvalidStd(std));
        }
        Ok(Self { mean, std })
    }

    /// Build the parameters of the built-in path tables.
    ///
    /// Only used with literal, valid values.
    pub(crate) const fn from_ms(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// mean delay in milliseconds
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// standard deviation of the delay in milliseconds
    pub fn std(&self) -> f64 {
        self.std
    }

    pub fn variance(&self) -> f64 {
        self.std * self.std
    }

    /// Draw one delay, clamped to zero.
    ///
    /// Uses exactly one standard normal draw from `rng`, scaled by the
    /// standard deviation and shifted by the mean.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        (self.mean + self.std * z).max(0.0)
    }
}

impl fmt::Display for NormalParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N({}ms, {}ms)", self.mean, self.std)
    }
}
