// Synthetic sensor window for the single-location prediction endpoint
use super::snapshot::FeatureStats;
use chrono::{DateTime, Utc};

/// Number of time steps the forecasting model is trained on.
pub const EXPECTED_TIME_STEPS: usize = 50;

const BASELINE_LEVEL: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    values: Vec<f64>,
}

impl FeatureWindow {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Water-level-like series around the baseline. The phase is derived
    /// from the minute of `at`, so two windows taken within the same minute
    /// are identical.
    pub fn synthetic(at: DateTime<Utc>) -> Self {
        let phase = (at.timestamp() / 60) as f64 * 0.1;
        let values = (0..EXPECTED_TIME_STEPS)
            .map(|i| {
                let step = i as f64;
                let tide = 1.5 * (phase + step * 0.3).sin();
                let surge = 0.6 * (phase * 0.7 + step * 1.1).sin();
                (BASELINE_LEVEL + tide + surge).max(0.0)
            })
            .collect();
        Self::new(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn stats(&self) -> FeatureStats {
        if self.values.is_empty() {
            return FeatureStats::default();
        }
        let sum: f64 = self.values.iter().sum();
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        FeatureStats {
            average: Some(sum / self.values.len() as f64),
            min: Some(min),
            max: Some(max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_synthetic_window_shape() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let window = FeatureWindow::synthetic(at);
        assert_eq!(window.values().len(), EXPECTED_TIME_STEPS);
        assert!(window.values().iter().all(|v| *v >= 0.0 && v.is_finite()));
    }

    #[test]
    fn test_synthetic_window_is_stable_within_a_minute() {
        let a = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 55).unwrap();
        assert_eq!(FeatureWindow::synthetic(a), FeatureWindow::synthetic(b));
    }

    #[test]
    fn test_stats() {
        let window = FeatureWindow::new(vec![2.0, 4.0, 9.0]);
        let stats = window.stats();
        assert_eq!(stats.average, Some(5.0));
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(9.0));

        assert_eq!(FeatureWindow::new(Vec::new()).stats(), FeatureStats::default());
    }
}
