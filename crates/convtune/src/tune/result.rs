use std::fmt::{self, Display};

use derive_new::new;
use serde::Serialize;

use crate::benchmark::TimingStats;
use crate::config::KernelConfig;

/// Header line of the textual report, matching the row format of
/// [`TuningResult`]'s `Display`.
pub const REPORT_HEADER: &str = "# width height filterWidth filterHeight local columnsPerBlock rowsPerBlock columnsPerThread rowsPerThread GFLOP/s GB/s time stdDeviation COV";

/// One row of the tuning report: a configuration that compiled, ran and
/// was timed. Nothing is mutated after a result is appended.
#[derive(new, Debug, Clone, Serialize)]
pub struct TuningResult {
    pub config: KernelConfig,
    /// Normalized compute throughput, GFLOP/s.
    pub gflops: f64,
    /// Normalized memory throughput, GB/s.
    pub gbs: f64,
    pub timing: TimingStats,
}

impl Display for TuningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geometry = &self.config.geometry;
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {:.3} {:.3} {:.6} {:.6} {:.6}",
            geometry.width,
            geometry.height,
            geometry.filter_width,
            geometry.filter_height,
            self.config.strategy.as_flag(),
            self.config.columns_per_block,
            self.config.rows_per_block,
            self.config.columns_per_thread,
            self.config.rows_per_thread,
            self.gflops,
            self.gbs,
            self.timing.mean,
            self.timing.std_dev,
            self.timing.variation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ElemType, MemoryStrategy};
    use crate::geometry::Geometry;

    #[test]
    fn report_row_matches_the_header_order() {
        let config = KernelConfig::new(
            Geometry::new(64, 64, 3, 3, 1),
            16,
            8,
            2,
            1,
            MemoryStrategy::SharedStaging,
            ElemType::F32,
        );
        let timing = TimingStats {
            mean: 0.00125,
            std_dev: 0.000002,
            variation: 0.0016,
        };
        let row = TuningResult::new(config, 120.5, 80.25, timing).to_string();
        assert_eq!(
            row,
            "64 64 3 3 1 16 8 2 1 120.500 80.250 0.001250 0.000002 0.001600"
        );
        assert_eq!(row.split_whitespace().count(), REPORT_HEADER.split_whitespace().count() - 1);
    }
}
