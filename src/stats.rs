//! Derived aggregates over a window snapshot.
//!
//! These back the dashboard's summary cards: averages, peak reading and the
//! per-station breakdown.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Sample, Severity};

/// Summary of the samples currently in the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub count: usize,
    pub mean_magnitude: Option<f64>,
    pub peak_magnitude: Option<f64>,
    pub min_magnitude: Option<f64>,
    pub mean_frequency: Option<f64>,
    /// Severity of the peak reading
    pub peak_severity: Option<Severity>,
    pub latest: Option<DateTime<Utc>>,
    /// Readings per station, sorted by station id
    pub per_source: BTreeMap<String, usize>,
}

impl WindowStats {
    /// Compute aggregates over samples in window order.
    #[must_use]
    pub fn from_samples(samples: &[Sample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        #[allow(clippy::cast_precision_loss)]
        let n = samples.len() as f64;

        let mut mag_sum = 0.0;
        let mut freq_sum = 0.0;
        let mut peak = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        let mut per_source = BTreeMap::new();

        for sample in samples {
            mag_sum += sample.magnitude;
            freq_sum += sample.frequency;
            peak = peak.max(sample.magnitude);
            min = min.min(sample.magnitude);
            *per_source.entry(sample.source_id.clone()).or_insert(0) += 1;
        }

        Self {
            count: samples.len(),
            mean_magnitude: Some(mag_sum / n),
            peak_magnitude: Some(peak),
            min_magnitude: Some(min),
            mean_frequency: Some(freq_sum / n),
            peak_severity: Some(Severity::from_magnitude(peak)),
            latest: samples.iter().map(|s| s.timestamp).max(),
            per_source,
        }
    }

    /// Number of distinct stations reporting in the window.
    #[must_use]
    pub fn active_sources(&self) -> usize {
        self.per_source.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample(secs: i64, mag: f64, freq: f64, source: &str) -> Sample {
        Sample::new(Utc.timestamp_opt(secs, 0).unwrap(), mag, freq, source)
    }

    #[test]
    fn test_empty_window() {
        let stats = WindowStats::from_samples(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_magnitude, None);
        assert_eq!(stats.peak_severity, None);
        assert_eq!(stats.active_sources(), 0);
    }

    #[test]
    fn test_aggregates() {
        let samples = [
            sample(10, 1.0, 10.0, "Station-1"),
            sample(30, 6.5, 30.0, "Station-2"),
            sample(20, 2.5, 20.0, "Station-1"),
        ];
        let stats = WindowStats::from_samples(&samples);

        assert_eq!(stats.count, 3);
        assert!((stats.mean_magnitude.unwrap() - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.peak_magnitude, Some(6.5));
        assert_eq!(stats.min_magnitude, Some(1.0));
        assert!((stats.mean_frequency.unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(stats.peak_severity, Some(Severity::High));
        assert_eq!(stats.latest, Utc.timestamp_opt(30, 0).single());
        assert_eq!(stats.per_source.get("Station-1"), Some(&2));
        assert_eq!(stats.active_sources(), 2);
    }
}
