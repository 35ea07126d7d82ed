use std::time::Duration;

use serde::Serialize;

/// Elapsed times of the timed iterations for one configuration.
#[derive(Debug, Clone, Default)]
pub struct SampleDurations {
    pub durations: Vec<Duration>,
}

impl SampleDurations {
    pub fn push(&mut self, duration: Duration) {
        self.durations.push(duration);
    }
}

/// Statistics over one set of timed iterations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingStats {
    /// Mean iteration time.
    pub mean: f64,
    /// Standard deviation over the iterations.
    pub std_dev: f64,
    /// Coefficient of variation, the deviation relative to the mean.
    pub variation: f64,
}

impl TimingStats {
    pub fn new(samples: &SampleDurations) -> Self {
        let count = samples.durations.len().max(1) as f64;
        let mean = samples
            .durations
            .iter()
            .map(Duration::as_secs_f64)
            .sum::<f64>()
            / count;
        let variance = samples
            .durations
            .iter()
            .map(|duration| {
                let diff = duration.as_secs_f64() - mean;
                diff * diff
            })
            .sum::<f64>()
            / count;
        let std_dev = variance.sqrt();
        let variation = if mean == 0.0 { 0.0 } else { std_dev / mean };

        Self {
            mean,
            std_dev,
            variation,
        }
    }
}

/// Normalize a raw operation or byte count to units of 10^9.
pub fn giga(value: u64) -> f64 {
    value as f64 / 1.0e9
}
