//! Live feed controller.
//!
//! Owns the sliding window, the sample source and a cancellable periodic
//! schedule. Consumers pull the current window with [`FeedController::snapshot`];
//! nothing is pushed to them.
//!
//! ```text
//!            start()            pause()
//!  Stopped ──────────▶ Running ─────────▶ Paused
//!                        ▲   ◀───────────   │
//!                        │      resume()    │
//!                        └──── stop() ──────┴──▶ Stopped (sealed)
//! ```
//!
//! Transition policy: `start` on an already started feed, `pause` outside
//! `Running` and `resume` outside `Paused` are no-ops. A stopped feed is
//! sealed and refuses to start again.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::errors::FeedError;
use crate::generator::SampleSource;
use crate::models::Sample;
use crate::window::{DEFAULT_CAPACITY, SlidingWindow};

/// Default time between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of samples generated at construction.
pub const DEFAULT_SEED_SAMPLES: usize = 10;

/// Lifecycle state of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedState {
    Stopped,
    Running,
    Paused,
}

impl FeedState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters for a [`FeedController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Window capacity (must be >= 1)
    pub capacity: usize,
    /// Time between ticks (must be non-zero)
    pub tick_interval: Duration,
    /// Samples generated synchronously at construction
    pub seed_samples: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tick_interval: DEFAULT_TICK_INTERVAL,
            seed_samples: DEFAULT_SEED_SAMPLES,
        }
    }
}

impl FeedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] for a zero capacity or a zero interval.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.capacity == 0 {
            return Err(FeedError::Config("window capacity must be at least 1".into()));
        }
        if self.tick_interval.is_zero() {
            return Err(FeedError::Config("tick interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Running counters for a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    /// Scheduled ticks delivered while running
    pub ticks: u64,
    /// Samples appended to the window, seeding included
    pub appended: u64,
    /// Sample generation failures, seeding included
    pub failures: u64,
}

/// Consistent view of a feed taken under a single lock.
#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub state: FeedState,
    pub stats: FeedStats,
    pub samples: Vec<Sample>,
}

impl FeedView {
    /// Samples appended after an earlier view whose `stats.appended` was `seen`.
    ///
    /// If more samples arrived than the window holds, the older ones are gone
    /// and the whole window is returned.
    #[must_use]
    pub fn since(&self, seen: u64) -> &[Sample] {
        let fresh = usize::try_from(self.stats.appended.saturating_sub(seen)).unwrap_or(usize::MAX);
        let start = self.samples.len().saturating_sub(fresh);
        &self.samples[start..]
    }
}

/// Everything a tick touches, guarded by one mutex.
struct Inner<G> {
    state: FeedState,
    /// Set by `stop()`; a sealed feed never starts again
    sealed: bool,
    window: SlidingWindow<Sample>,
    source: G,
    stats: FeedStats,
}

impl<G: SampleSource> Inner<G> {
    /// Generate one sample and append it. Failures are logged and counted.
    fn pull(&mut self) {
        match self.source.generate() {
            Ok(sample) => {
                self.window.append(sample);
                self.stats.appended += 1;
                if let Some(latest) = self.window.latest() {
                    trace!(
                        source = %latest.source_id,
                        magnitude = latest.magnitude,
                        len = self.window.len(),
                        "sample appended"
                    );
                }
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!(tick = self.stats.ticks, error = %e, "sample generation failed, feed continues");
            }
        }
    }

    fn tick(&mut self) {
        // A transition may have landed between the timer firing and this lock.
        if self.state != FeedState::Running {
            return;
        }
        self.stats.ticks += 1;
        self.pull();
    }
}

/// Periodic sample feed over a bounded window.
pub struct FeedController<G> {
    inner: Arc<Mutex<Inner<G>>>,
    control: watch::Sender<FeedState>,
    task: Mutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
    capacity: usize,
}

impl<G: SampleSource + Send + 'static> FeedController<G> {
    /// Create a stopped feed, seeding the window with `config.seed_samples`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] if the configuration is invalid.
    pub fn new(source: G, config: FeedConfig) -> Result<Self, FeedError> {
        config.validate()?;

        let mut inner = Inner {
            state: FeedState::Stopped,
            sealed: false,
            window: SlidingWindow::new(config.capacity)?,
            source,
            stats: FeedStats::default(),
        };

        for _ in 0..config.seed_samples {
            inner.pull();
        }
        if config.seed_samples > 0 {
            debug!(
                seeded = inner.window.len(),
                failures = inner.stats.failures,
                "feed window seeded"
            );
        }

        let (control, _) = watch::channel(FeedState::Stopped);

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            control,
            task: Mutex::new(None),
            tick_interval: config.tick_interval,
            capacity: config.capacity,
        })
    }

    /// Begin ticking. No-op if the feed is already running or paused.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidStateTransition`] if the feed was stopped,
    /// or [`FeedError::NoRuntime`] if called outside a tokio runtime.
    pub fn start(&self) -> Result<(), FeedError> {
        let runtime = Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        let mut inner = lock(&self.inner);
        match inner.state {
            FeedState::Running | FeedState::Paused => {
                debug!(state = %inner.state, "start ignored, feed already started");
                return Ok(());
            }
            FeedState::Stopped if inner.sealed => {
                return Err(FeedError::InvalidStateTransition {
                    from: FeedState::Stopped,
                    action: "start",
                });
            }
            FeedState::Stopped => {}
        }

        inner.state = FeedState::Running;
        self.control.send_replace(FeedState::Running);

        let first_tick = Instant::now() + self.tick_interval;
        let task = runtime.spawn(run_schedule(
            Arc::clone(&self.inner),
            self.control.subscribe(),
            first_tick,
            self.tick_interval,
        ));
        *lock(&self.task) = Some(task);
        drop(inner);

        info!(
            interval = ?self.tick_interval,
            capacity = self.capacity,
            "live feed started"
        );
        Ok(())
    }
}

impl<G> FeedController<G> {
    /// Suspend ticking. Returns `true` if the feed went from running to paused.
    pub fn pause(&self) -> bool {
        self.transition(FeedState::Running, FeedState::Paused, "pause")
    }

    /// Resume ticking one full interval from now. Missed ticks are not replayed.
    ///
    /// Returns `true` if the feed went from paused to running.
    pub fn resume(&self) -> bool {
        self.transition(FeedState::Paused, FeedState::Running, "resume")
    }

    fn transition(&self, from: FeedState, to: FeedState, action: &'static str) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state != from {
            debug!(state = %inner.state, action, "transition ignored");
            return false;
        }
        inner.state = to;
        self.control.send_replace(to);
        info!(%from, %to, "live feed {action}");
        true
    }

    /// Cancel the schedule and wait for the tick task to exit.
    ///
    /// After this returns no further tick will touch the window. The feed is
    /// sealed even if it was never started. Returns `true` if a running or
    /// paused feed was stopped.
    pub async fn stop(&self) -> bool {
        let was = {
            let mut inner = lock(&self.inner);
            let was = inner.state;
            inner.state = FeedState::Stopped;
            inner.sealed = true;
            self.control.send_replace(FeedState::Stopped);
            was
        };

        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "feed schedule task ended abnormally");
            }
        }

        if was != FeedState::Stopped {
            info!(from = %was, "live feed stopped");
        }
        was != FeedState::Stopped
    }

    /// Owned copy of the window, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Sample> {
        lock(&self.inner).window.snapshot()
    }

    /// State, counters and samples read atomically.
    #[must_use]
    pub fn view(&self) -> FeedView {
        let inner = lock(&self.inner);
        FeedView {
            state: inner.state,
            stats: inner.stats,
            samples: inner.window.snapshot(),
        }
    }

    #[must_use]
    pub fn state(&self) -> FeedState {
        lock(&self.inner).state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == FeedState::Running
    }

    #[must_use]
    pub fn stats(&self) -> FeedStats {
        lock(&self.inner).stats
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

impl<G> Drop for FeedController<G> {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl<G> fmt::Debug for FeedController<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedController")
            .field("state", &self.state())
            .field("capacity", &self.capacity)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

/// Lock ignoring poisoning; the guarded data stays consistent per tick.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tick loop. Waits on the control channel while paused and exits on stop.
async fn run_schedule<G: SampleSource>(
    inner: Arc<Mutex<Inner<G>>>,
    mut control: watch::Receiver<FeedState>,
    first_tick: Instant,
    period: Duration,
) {
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let state = *control.borrow_and_update();
        match state {
            FeedState::Running => {
                tokio::select! {
                    _ = ticker.tick() => {
                        lock(&inner).tick();
                    }
                    changed = control.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            FeedState::Paused => {
                if control.changed().await.is_err() {
                    break;
                }
                ticker.reset();
            }
            FeedState::Stopped => break,
        }
    }

    debug!("feed schedule exited");
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::errors::GeneratorError;

    const TICK: Duration = Duration::from_millis(10);

    /// Emits magnitude == call number, failing on the listed calls.
    struct Scripted {
        calls: u32,
        fail_on: Vec<u32>,
    }

    impl SampleSource for Scripted {
        fn generate(&mut self) -> Result<Sample, GeneratorError> {
            self.calls += 1;
            if self.fail_on.contains(&self.calls) {
                return Err(GeneratorError(format!("sensor glitch on call {}", self.calls)));
            }
            Ok(Sample::new(
                DateTime::<Utc>::UNIX_EPOCH,
                f64::from(self.calls),
                25.0,
                "Station-1",
            ))
        }
    }

    fn feed(capacity: usize, fail_on: &[u32]) -> FeedController<Scripted> {
        let source = Scripted {
            calls: 0,
            fail_on: fail_on.to_vec(),
        };
        let config = FeedConfig {
            capacity,
            tick_interval: TICK,
            seed_samples: 0,
        };
        FeedController::new(source, config).unwrap()
    }

    fn magnitudes(feed: &FeedController<Scripted>) -> Vec<f64> {
        feed.snapshot().iter().map(|s| s.magnitude).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_keeps_latest_after_five_ticks() {
        let feed = feed(3, &[]);
        feed.start().unwrap();

        time::sleep(TICK * 5 + TICK / 2).await;

        assert_eq!(magnitudes(&feed), vec![3.0, 4.0, 5.0]);
        assert_eq!(feed.stats().ticks, 5);
        assert!(feed.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_failure_does_not_halt_feed() {
        let feed = feed(10, &[2]);
        feed.start().unwrap();

        time::sleep(TICK * 5 + TICK / 2).await;

        assert_eq!(magnitudes(&feed), vec![1.0, 3.0, 4.0, 5.0]);
        assert_eq!(feed.state(), FeedState::Running);
        assert_eq!(
            feed.stats(),
            FeedStats {
                ticks: 5,
                appended: 4,
                failures: 1
            }
        );
        feed.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_suspends_and_resume_does_not_replay() {
        let feed = feed(20, &[]);
        feed.start().unwrap();

        time::sleep(TICK * 2 + TICK / 2).await;
        assert_eq!(feed.snapshot().len(), 2);

        assert!(feed.pause());
        time::sleep(TICK * 5).await;
        assert_eq!(feed.snapshot().len(), 2);
        assert_eq!(feed.stats().ticks, 2);

        assert!(feed.resume());
        time::sleep(TICK / 2).await;
        assert_eq!(feed.snapshot().len(), 2);

        time::sleep(TICK).await;
        assert_eq!(feed.snapshot().len(), 3);
        feed.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_is_idempotent() {
        let feed = feed(5, &[]);
        feed.start().unwrap();

        assert!(feed.pause());
        assert!(!feed.pause());
        assert_eq!(feed.state(), FeedState::Paused);

        time::sleep(TICK * 3).await;
        assert!(feed.snapshot().is_empty());

        assert!(feed.resume());
        assert!(!feed.resume());
        assert!(feed.is_running());
        feed.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let feed = feed(20, &[]);
        feed.start().unwrap();

        time::sleep(TICK * 2 + TICK / 2).await;
        assert!(feed.stop().await);
        assert_eq!(feed.state(), FeedState::Stopped);

        time::sleep(TICK * 10).await;
        assert_eq!(feed.snapshot().len(), 2);
        assert_eq!(feed.stats().ticks, 2);

        // Stopped feeds are sealed
        assert_eq!(
            feed.start(),
            Err(FeedError::InvalidStateTransition {
                from: FeedState::Stopped,
                action: "start",
            })
        );
        assert!(!feed.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_paused() {
        let feed = feed(20, &[]);
        feed.start().unwrap();
        feed.pause();

        assert!(feed.stop().await);
        assert!(!feed.resume());
        time::sleep(TICK * 5).await;
        assert!(feed.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_noop() {
        let feed = feed(20, &[]);
        feed.start().unwrap();
        feed.start().unwrap();

        time::sleep(TICK * 5 + TICK / 2).await;
        assert_eq!(feed.stats().ticks, 5);
        feed.stop().await;
    }

    #[test]
    fn test_pause_from_stopped_is_noop() {
        let feed = feed(3, &[]);
        assert!(!feed.pause());
        assert!(!feed.resume());
        assert_eq!(feed.state(), FeedState::Stopped);
    }

    #[test]
    fn test_start_outside_runtime() {
        let feed = feed(3, &[]);
        assert_eq!(feed.start(), Err(FeedError::NoRuntime));
        assert_eq!(feed.state(), FeedState::Stopped);
    }

    #[test]
    fn test_seed_burst_fills_window() {
        let source = Scripted {
            calls: 0,
            fail_on: vec![],
        };
        let config = FeedConfig {
            capacity: 3,
            tick_interval: TICK,
            seed_samples: 4,
        };
        let feed = FeedController::new(source, config).unwrap();

        assert_eq!(magnitudes(&feed), vec![2.0, 3.0, 4.0]);
        let view = feed.view();
        assert_eq!(view.state, FeedState::Stopped);
        assert_eq!(view.stats.appended, 4);
        assert_eq!(view.stats.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_since_returns_new_samples() {
        let feed = feed(4, &[]);
        feed.start().unwrap();

        time::sleep(TICK + TICK / 2).await;
        let first = feed.view();
        assert_eq!(first.since(0).len(), 1);

        time::sleep(TICK * 2).await;
        let second = feed.view();
        let fresh: Vec<f64> = second.since(first.stats.appended).iter().map(|s| s.magnitude).collect();
        assert_eq!(fresh, vec![2.0, 3.0]);

        // More arrivals than capacity: whole window
        time::sleep(TICK * 6).await;
        assert_eq!(feed.view().since(second.stats.appended).len(), 4);
        feed.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_views_stay_consistent_while_ticking() {
        let source = Scripted {
            calls: 0,
            fail_on: vec![],
        };
        let config = FeedConfig {
            capacity: 4,
            tick_interval: Duration::from_millis(1),
            seed_samples: 0,
        };
        let feed = FeedController::new(source, config).unwrap();
        feed.start().unwrap();

        let give_up = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let view = feed.view();
            assert!(view.samples.len() <= 4);

            let seen: Vec<f64> = view.samples.iter().map(|s| s.magnitude).collect();
            assert!(seen.windows(2).all(|w| (w[1] - w[0] - 1.0).abs() < f64::EPSILON));
            if let Some(last) = seen.last() {
                #[allow(clippy::cast_precision_loss)]
                let appended = view.stats.appended as f64;
                assert!((last - appended).abs() < f64::EPSILON);
            }

            if view.stats.appended >= 12 || std::time::Instant::now() > give_up {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(feed.stop().await);
        assert!(feed.stats().appended >= 12);
        assert_eq!(feed.snapshot().len(), 4);
    }

    #[test]
    fn test_invalid_config() {
        let source = || Scripted {
            calls: 0,
            fail_on: vec![],
        };

        let zero_capacity = FeedConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            FeedController::new(source(), zero_capacity),
            Err(FeedError::Config(_))
        ));

        let zero_interval = FeedConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            FeedController::new(source(), zero_interval),
            Err(FeedError::Config(_))
        ));
    }
}
