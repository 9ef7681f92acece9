//! Synthetic sample generation.
//!
//! The generator draws every value from an injected [`RandomSource`] and
//! stamps it with an injected [`Clock`], so a fixed source and a fixed clock
//! reproduce the exact same readings.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{FeedError, GeneratorError};
use crate::models::Sample;

/// Number of simulated stations in the default configuration.
const DEFAULT_STATION_COUNT: usize = 5;

/// Source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Adapter exposing any `rand` generator as a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// Seeded source for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

/// Anything the feed controller can pull samples from.
///
/// A failed call costs one tick; the controller keeps going.
pub trait SampleSource {
    /// Produce the next sample.
    ///
    /// # Errors
    ///
    /// Returns a [`GeneratorError`] if no sample could be produced this tick.
    fn generate(&mut self) -> Result<Sample, GeneratorError>;
}

/// Value ranges and station set for synthetic readings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub sources: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_magnitude: 1.0,
            max_magnitude: 4.0,
            min_frequency: 10.0,
            max_frequency: 60.0,
            sources: (1..=DEFAULT_STATION_COUNT)
                .map(|n| format!("Station-{n}"))
                .collect(),
        }
    }
}

impl GeneratorConfig {
    /// Validate ranges and the station set.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] for inverted or non-finite ranges and for
    /// an empty or blank station set.
    pub fn validate(&self) -> Result<(), FeedError> {
        check_range("magnitude", self.min_magnitude, self.max_magnitude)?;
        check_range("frequency", self.min_frequency, self.max_frequency)?;

        if self.sources.is_empty() {
            return Err(FeedError::Config("at least one source id is required".into()));
        }
        if self.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(FeedError::Config("source ids must not be blank".into()));
        }
        Ok(())
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), FeedError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(FeedError::Config(format!(
            "{name} range must be finite, got [{min}, {max}]"
        )));
    }
    if min > max {
        return Err(FeedError::Config(format!(
            "{name} min {min} must be <= max {max}"
        )));
    }
    Ok(())
}

/// Random sample generator over a validated [`GeneratorConfig`].
#[derive(Debug, Clone)]
pub struct SampleGenerator<R, C> {
    config: GeneratorConfig,
    random: R,
    clock: C,
}

impl<R: RandomSource, C: Clock> SampleGenerator<R, C> {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] if the configuration is invalid.
    pub fn new(config: GeneratorConfig, random: R, clock: C) -> Result<Self, FeedError> {
        config.validate()?;
        Ok(Self {
            config,
            random,
            clock,
        })
    }

    /// Draw one reading: magnitude, then frequency, then station.
    pub fn next_sample(&mut self) -> Sample {
        let magnitude = lerp(
            self.config.min_magnitude,
            self.config.max_magnitude,
            self.random.next_unit(),
        );
        let frequency = lerp(
            self.config.min_frequency,
            self.config.max_frequency,
            self.random.next_unit(),
        );

        let n = self.config.sources.len();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let index = ((self.random.next_unit() * n as f64).floor() as usize).min(n - 1);

        Sample::new(
            self.clock.now(),
            magnitude,
            frequency,
            self.config.sources[index].clone(),
        )
    }
}

impl<R: RandomSource, C: Clock> SampleSource for SampleGenerator<R, C> {
    fn generate(&mut self) -> Result<Sample, GeneratorError> {
        Ok(self.next_sample())
    }
}

/// Map `t` in `[0, 1)` onto `[min, max]`, clamped against out-of-range input.
fn lerp(min: f64, max: f64, t: f64) -> f64 {
    (min + t.clamp(0.0, 1.0) * (max - min)).clamp(min, max)
}
