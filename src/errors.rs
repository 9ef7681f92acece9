//! Error types for seismofeed.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

use crate::controller::FeedState;

/// Errors that can occur while building or driving a feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Invalid construction parameters (capacity, ranges, sources)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A lifecycle call that the controller refuses in its current state
    #[error("cannot {action} a feed that is {from}")]
    InvalidStateTransition {
        from: FeedState,
        action: &'static str,
    },

    /// `start()` was called outside a tokio runtime
    #[error("no tokio runtime available to drive the feed schedule")]
    NoRuntime,
}

/// Failure to produce a single sample on one tick.
///
/// The controller logs and counts these; they never stop the feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("sample generation failed: {0}")]
pub struct GeneratorError(pub String);
