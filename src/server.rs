//! HTTP dashboard API for a live feed.
//!
//! Provides a pull-based view of the feed using:
//! - Axum for the HTTP server
//! - SSE (Server-Sent Events) re-reading the window once per tick interval
//! - JSON endpoints for the window, its statistics and pause/resume control

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::Serialize;
use tokio::time;
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::IntervalStream;

use crate::LiveFeed;
use crate::controller::{FeedState, FeedStats};
use crate::models::Sample;
use crate::stats::WindowStats;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Pause the feed right after starting it
    pub start_paused: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            start_paused: false,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    feed: Arc<LiveFeed>,
}

impl AppState {
    #[must_use]
    pub fn new(feed: Arc<LiveFeed>) -> Self {
        Self { feed }
    }
}

/// Response body for status and control endpoints.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: FeedState,
    pub running: bool,
    pub capacity: usize,
    pub interval_ms: u64,
}

/// Response body for `/feed/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub feed: FeedStats,
    pub window: WindowStats,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/feed/snapshot", get(snapshot_handler))
        .route("/feed/stats", get(stats_handler))
        .route("/feed/status", get(status_handler))
        .route("/feed/pause", post(pause_handler))
        .route("/feed/resume", post(resume_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the feed and serve the API until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the feed cannot start or the listener cannot bind.
pub async fn run_server(config: ServerConfig, feed: LiveFeed) -> anyhow::Result<()> {
    let feed = Arc::new(feed);
    feed.start()?;
    if config.start_paused {
        feed.pause();
    }

    let app = create_router(AppState::new(Arc::clone(&feed)));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 SeismoFeed API listening at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // SSE streams end once the feed is stopped.
    let shutdown_feed = Arc::clone(&feed);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_feed.stop().await;
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

fn status_of(feed: &LiveFeed) -> StatusResponse {
    let state = feed.state();
    StatusResponse {
        state,
        running: state == FeedState::Running,
        capacity: feed.capacity(),
        interval_ms: u64::try_from(feed.tick_interval().as_millis()).unwrap_or(u64::MAX),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// SSE stream: one `snapshot` event per tick interval until the feed stops.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    Sse::new(snapshot_events(state.feed)).keep_alive(KeepAlive::default())
}

/// Feed views as SSE events, one per tick interval, ending once the feed stops.
fn snapshot_events(feed: Arc<LiveFeed>) -> impl Stream<Item = Result<Event, axum::Error>> {
    let read_feed = Arc::clone(&feed);

    IntervalStream::new(time::interval(feed.tick_interval()))
        .take_while(move |_| feed.state() != FeedState::Stopped)
        .map(move |_| Event::default().event("snapshot").json_data(read_feed.view()))
}

async fn snapshot_handler(State(state): State<AppState>) -> Json<Vec<Sample>> {
    Json(state.feed.snapshot())
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let view = state.feed.view();
    Json(StatsResponse {
        feed: view.stats,
        window: WindowStats::from_samples(&view.samples),
    })
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(status_of(&state.feed))
}

async fn pause_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    if state.feed.pause() {
        tracing::info!("feed paused via API");
    }
    Json(status_of(&state.feed))
}

async fn resume_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    if state.feed.resume() {
        tracing::info!("feed resumed via API");
    }
    Json(status_of(&state.feed))
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>SeismoFeed - Live Monitoring</title>
    <style>
        body { font-family: system-ui, sans-serif; background: #111827; color: #e5e7eb; margin: 2rem; }
        button { padding: .5rem 1rem; border: 0; border-radius: .5rem; color: #fff; cursor: pointer; }
        .pause { background: #dc2626; } .resume { background: #16a34a; }
        table { border-collapse: collapse; margin-top: 1rem; }
        td, th { padding: .25rem .75rem; text-align: right; }
        .low { color: #10b981; } .elevated { color: #f59e0b; } .high { color: #f97316; } .critical { color: #ef4444; }
    </style>
</head>
<body>
    <h1>Real-time Monitoring</h1>
    <p><span id="state">connecting</span> · <span id="count">0</span> readings</p>
    <button class="pause" onclick="control('pause')">Pause</button>
    <button class="resume" onclick="control('resume')">Resume</button>
    <table>
        <thead><tr><th>Time</th><th>Station</th><th>Magnitude</th><th>Frequency</th></tr></thead>
        <tbody id="rows"></tbody>
    </table>
    <script>
        const severity = m => m >= 7 ? 'critical' : m >= 6 ? 'high' : m >= 5 ? 'elevated' : 'low';
        function control(action) { fetch('/feed/' + action, { method: 'POST' }); }
        const source = new EventSource('/stream');
        source.addEventListener('snapshot', e => {
            const view = JSON.parse(e.data);
            document.getElementById('state').textContent = view.state;
            document.getElementById('count').textContent = view.samples.length;
            document.getElementById('rows').innerHTML = view.samples.slice().reverse().map(s =>
                `<tr><td>${new Date(s.timestamp).toLocaleTimeString()}</td><td>${s.source_id}</td>` +
                `<td class="${severity(s.magnitude)}">${s.magnitude.toFixed(2)}</td>` +
                `<td>${s.frequency.toFixed(1)} Hz</td></tr>`).join('');
        });
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::controller::FeedConfig;
    use crate::generator::GeneratorConfig;

    fn state(seed_samples: usize) -> AppState {
        let config = FeedConfig {
            capacity: 5,
            tick_interval: Duration::from_millis(10),
            seed_samples,
        };
        let feed = crate::build_feed(config, GeneratorConfig::default(), Some(3)).unwrap();
        AppState::new(Arc::new(feed))
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health_handler().await, "OK");
    }

    #[tokio::test]
    async fn test_snapshot_and_stats_reflect_seed() {
        let state = state(3);

        let Json(samples) = snapshot_handler(State(state.clone())).await;
        assert_eq!(samples.len(), 3);

        let Json(stats) = stats_handler(State(state)).await;
        assert_eq!(stats.window.count, 3);
        assert_eq!(stats.feed.appended, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_events_end_when_feed_stops() {
        let state = state(2);
        state.feed.start().unwrap();

        let events = snapshot_events(Arc::clone(&state.feed));
        tokio::pin!(events);

        assert!(matches!(events.next().await, Some(Ok(_))));
        assert!(matches!(events.next().await, Some(Ok(_))));

        state.feed.stop().await;
        assert!(events.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_endpoints() {
        let state = state(0);
        state.feed.start().unwrap();

        let Json(status) = pause_handler(State(state.clone())).await;
        assert_eq!(status.state, FeedState::Paused);
        assert!(!status.running);

        // Second pause is a no-op
        let Json(status) = pause_handler(State(state.clone())).await;
        assert_eq!(status.state, FeedState::Paused);

        let Json(status) = resume_handler(State(state.clone())).await;
        assert!(status.running);
        assert_eq!(status.capacity, 5);
        assert_eq!(status.interval_ms, 10);

        state.feed.stop().await;
        let Json(status) = status_handler(State(state)).await;
        assert_eq!(status.state, FeedState::Stopped);
    }
}
