//! Annealer configuration and temperature schedules.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Exponent above which `exp` is treated as saturated.
///
/// `f64::exp` overflows a little above 709.
pub(crate) const MAX_EXPONENT: f64 = 700.0;

/// Maps normalized progress `u ∈ [0, 1)` to a temperature.
///
/// Temperatures are relative: the acceptance test divides by
/// `E0 * k * T`, so `T` near 1 at the start and near 0 at the end is the
/// intended range.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TemperatureSchedule {
    /// Exponential decay `T(u) = base^u`.
    ///
    /// `base` is the temperature reached at the end of the run.
    Exponential {
        /// End temperature in (0, 1).
        base: f64,
    },

    /// Linear decay `T(u) = 1 - u`.
    Linear,

    /// User supplied schedule. Must return a non-negative value.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(fn(f64) -> f64),
}

impl Default for TemperatureSchedule {
    fn default() -> Self {
        TemperatureSchedule::Exponential { base: 0.006 }
    }
}

impl TemperatureSchedule {
    /// Temperature at progress `u`.
    #[inline]
    pub fn temperature(&self, u: f64) -> f64 {
        match *self {
            TemperatureSchedule::Exponential { base } => base.powf(u),
            TemperatureSchedule::Linear => 1.0 - u,
            TemperatureSchedule::Custom(f) => f(u),
        }
    }
}

/// Configuration for the path annealer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_penpath::anneal::{AnnealConfig, TemperatureSchedule};
///
/// let config = AnnealConfig::default()
///     .with_timeout(Duration::from_secs(5))
///     .with_schedule(TemperatureSchedule::Exponential { base: 0.01 })
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnealConfig {
    /// Step budget for the first attempt.
    ///
    /// `None` uses `steps_per_stroke * N`.
    pub max_steps: Option<usize>,

    /// Default budget multiplier when `max_steps` is `None`.
    pub steps_per_stroke: usize,

    /// Acceptance sensitivity. Smaller values make the search greedier.
    pub k: f64,

    /// Cooling schedule.
    pub schedule: TemperatureSchedule,

    /// Wall-clock budget per attempt.
    pub timeout: Duration,

    /// Extra attempts allowed after an attempt times out.
    pub retries: usize,

    /// Fraction of the completed steps used as the next attempt's budget.
    pub shrink_factor: f64,

    /// Steps between clock, cancellation and progress polls.
    pub poll_interval: usize,

    /// Suppresses progress callbacks and summary logging.
    pub quiet: bool,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            steps_per_stroke: 250,
            k: 1e-4,
            schedule: TemperatureSchedule::default(),
            timeout: Duration::from_secs(30),
            retries: 2,
            shrink_factor: 0.95,
            poll_interval: 100,
            quiet: false,
            seed: None,
        }
    }
}

impl AnnealConfig {
    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    pub fn with_steps_per_stroke(mut self, n: usize) -> Self {
        self.steps_per_stroke = n;
        self
    }

    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_schedule(mut self, schedule: TemperatureSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-attempt timeout in (fractional) seconds.
    ///
    /// Negative or non-finite values are clamped to zero.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        self.timeout = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_shrink_factor(mut self, factor: f64) -> Self {
        self.shrink_factor = factor;
        self
    }

    pub fn with_poll_interval(mut self, steps: usize) -> Self {
        self.poll_interval = steps;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Step budget for the first attempt over `n` strokes.
    pub fn initial_steps(&self, n: usize) -> usize {
        self.max_steps
            .unwrap_or_else(|| self.steps_per_stroke.saturating_mul(n))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.k.is_finite() && self.k > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "k must be positive and finite, got {}",
                self.k
            )));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "shrink_factor must be in (0, 1], got {}",
                self.shrink_factor
            )));
        }
        if self.poll_interval == 0 {
            return Err(Error::InvalidConfig("poll_interval must be at least 1".into()));
        }
        if let TemperatureSchedule::Exponential { base } = self.schedule {
            if !(base > 0.0 && base < 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "exponential base must be in (0, 1), got {base}"
                )));
            }
        }
        Ok(())
    }
}
