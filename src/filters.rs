//! Sample filtering for display.
//!
//! Filters only affect what a consumer prints; the window always holds every
//! generated sample.

use crate::models::Sample;

/// Combined filter criteria.
#[derive(Debug, Default, Clone)]
pub struct SampleFilter {
    pub min_magnitude: Option<f64>,
    pub max_frequency: Option<f64>,
    /// Only show these stations (empty = all)
    pub sources: Vec<String>,
}

impl SampleFilter {
    /// Check if a sample passes all filter criteria.
    #[must_use]
    pub fn matches(&self, sample: &Sample) -> bool {
        self.check_magnitude(sample) && self.check_frequency(sample) && self.check_source(sample)
    }

    /// Keep matching samples, preserving order.
    #[must_use]
    pub fn apply(&self, samples: Vec<Sample>) -> Vec<Sample> {
        samples.into_iter().filter(|s| self.matches(s)).collect()
    }

    fn check_magnitude(&self, sample: &Sample) -> bool {
        self.min_magnitude.is_none_or(|min| sample.magnitude >= min)
    }

    fn check_frequency(&self, sample: &Sample) -> bool {
        self.max_frequency.is_none_or(|max| sample.frequency <= max)
    }

    fn check_source(&self, sample: &Sample) -> bool {
        self.sources.is_empty() || self.sources.iter().any(|s| *s == sample.source_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample(mag: f64, freq: f64, source: &str) -> Sample {
        Sample::new(Utc::now(), mag, freq, source)
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = SampleFilter::default();
        assert!(filter.matches(&sample(0.1, 99.0, "anything")));
    }

    #[test]
    fn test_min_magnitude() {
        let filter = SampleFilter {
            min_magnitude: Some(2.5),
            ..Default::default()
        };
        assert!(filter.matches(&sample(2.5, 10.0, "Station-1")));
        assert!(!filter.matches(&sample(2.4, 10.0, "Station-1")));
    }

    #[test]
    fn test_sources_and_order() {
        let filter = SampleFilter {
            max_frequency: Some(40.0),
            sources: vec!["Station-2".into(), "Station-4".into()],
            ..Default::default()
        };
        let kept = filter.apply(vec![
            sample(1.0, 20.0, "Station-2"),
            sample(2.0, 20.0, "Station-3"),
            sample(3.0, 50.0, "Station-4"),
            sample(4.0, 30.0, "Station-4"),
        ]);

        let mags: Vec<f64> = kept.iter().map(|s| s.magnitude).collect();
        assert_eq!(mags, vec![1.0, 4.0]);
    }
}
