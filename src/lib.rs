//! SeismoFeed - simulated live seismic telemetry.
//!
//! A bounded sliding window of synthetic station readings, filled by a
//! cancellable periodic schedule with pause/resume control. Consumers pull
//! the window with [`FeedController::snapshot`].

pub mod controller;
pub mod errors;
pub mod filters;
pub mod generator;
pub mod models;
pub mod output;
pub mod server;
pub mod stats;
pub mod window;

use rand::rngs::StdRng;

pub use controller::{FeedConfig, FeedController, FeedState, FeedStats, FeedView};
pub use errors::{FeedError, GeneratorError};
pub use generator::{GeneratorConfig, RngSource, SampleGenerator, SystemClock};
pub use models::Sample;
pub use window::SlidingWindow;

/// The feed driven by the CLI and HTTP API: random readings on the wall clock.
pub type LiveFeed = FeedController<SampleGenerator<RngSource<StdRng>, SystemClock>>;

/// Build a [`LiveFeed`], seeding the RNG when `seed` is given.
///
/// # Errors
///
/// Returns [`FeedError::Config`] if either configuration is invalid.
pub fn build_feed(
    feed: FeedConfig,
    generator: GeneratorConfig,
    seed: Option<u64>,
) -> Result<LiveFeed, FeedError> {
    let random = seed.map_or_else(RngSource::from_entropy, RngSource::seeded);
    let generator = SampleGenerator::new(generator, random, SystemClock)?;
    FeedController::new(generator, feed)
}
