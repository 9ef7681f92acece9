//! Data models for the simulated telemetry feed.
//!
//! A [`Sample`] is one synthetic station reading. Samples are immutable once
//! generated; the sliding window owns them and hands out clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One synthetic seismic reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was generated
    pub timestamp: DateTime<Utc>,

    /// Reading magnitude
    pub magnitude: f64,

    /// Dominant frequency in Hz
    pub frequency: f64,

    /// Station that produced the reading
    pub source_id: String,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        magnitude: f64,
        frequency: f64,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            magnitude,
            frequency,
            source_id: source_id.into(),
        }
    }

    /// Severity bucket for this reading's magnitude.
    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_magnitude(self.magnitude)
    }
}

/// Magnitude severity buckets used by the dashboard renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// < 5.0
    Low,
    /// 5.0 - 6.0
    Elevated,
    /// 6.0 - 7.0
    High,
    /// >= 7.0
    Critical,
}

impl Severity {
    #[must_use]
    pub fn from_magnitude(magnitude: f64) -> Self {
        match magnitude {
            m if m >= 7.0 => Self::Critical,
            m if m >= 6.0 => Self::High,
            m if m >= 5.0 => Self::Elevated,
            _ => Self::Low,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Elevated => "ELEVATED",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}
