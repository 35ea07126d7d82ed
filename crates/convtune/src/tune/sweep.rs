use std::io::{self, Write};

use crate::benchmark::{giga, SampleDurations, TimingStats};
use crate::config::{ClScalar, KernelConfig, MemoryStrategy};
use crate::generate::generate;
use crate::runtime::{Executor, LaunchError};

use super::TuningResult;

/// Bytes moved by one kernel execution under the config's memory
/// strategy.
///
/// The direct variant reads every input element once per filter tap; the
/// staged variant reads it once per work-group stage, with the filter
/// still read per tap.
pub fn bytes_moved(config: &KernelConfig) -> u64 {
    let geometry = &config.geometry;
    let cells = geometry.width as u64 * geometry.height as u64;
    let taps = geometry.filter_area() as u64;
    let elem = config.elem.size() as u64;

    match config.strategy {
        MemoryStrategy::Direct => (cells * taps * 2 + cells) * elem,
        MemoryStrategy::SharedStaging => {
            let groups = (geometry.width / config.group_columns()) as u64
                * (geometry.height / config.group_rows()) as u64;
            (groups * config.stage_len() as u64 + cells + cells * taps) * elem
        }
    }
}

/// Sweep the given configurations: generate, compile, warm up, time
/// `iterations` runs each, and append one result row per survivor to
/// `out` as it is produced.
///
/// A configuration that fails to compile or execute is logged and
/// skipped; the sweep always runs to the end of the enumeration.
pub fn sweep<E, X>(
    executor: &mut X,
    configs: &[KernelConfig],
    iterations: u32,
    out: &mut dyn Write,
) -> io::Result<Vec<TuningResult>>
where
    E: ClScalar,
    X: Executor<E>,
{
    writeln!(out, "{}", super::REPORT_HEADER)?;
    writeln!(out)?;

    let mut results = Vec::with_capacity(configs.len());
    for config in configs {
        match time_config(executor, config, iterations) {
            Ok(result) => {
                writeln!(out, "{result}")?;
                results.push(result);
            }
            Err(err) => log::warn!("skipping {config}: {err}"),
        }
    }

    log::info!(
        "swept {} configurations, {} skipped",
        configs.len(),
        configs.len() - results.len()
    );
    if let Some(fastest) = results
        .iter()
        .min_by(|a, b| a.timing.mean.total_cmp(&b.timing.mean))
    {
        log::info!("fastest: {}", fastest.config);
    }

    Ok(results)
}

/// Time one configuration: an untimed warm-up, then `iterations` timed
/// launches, each blocking on completion before the next starts.
fn time_config<E, X>(
    executor: &mut X,
    config: &KernelConfig,
    iterations: u32,
) -> Result<TuningResult, LaunchError>
where
    E: ClScalar,
    X: Executor<E>,
{
    let source = generate(config);
    let kernel = executor.compile(&source)?;
    let grid = config.launch_grid();

    executor.run(&kernel, &grid)?;

    let mut samples = SampleDurations::default();
    for _ in 0..iterations {
        samples.push(executor.run(&kernel, &grid)?);
    }

    let timing = TimingStats::new(&samples);
    let gflops = giga(config.geometry.flop()) / timing.mean;
    let gbs = giga(bytes_moved(config)) / timing.mean;

    Ok(TuningResult::new(*config, gflops, gbs, timing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElemType;
    use crate::geometry::Geometry;

    fn config(strategy: MemoryStrategy) -> KernelConfig {
        KernelConfig::new(Geometry::new(64, 64, 3, 3, 0), 16, 16, 2, 2, strategy, ElemType::F32)
    }

    #[test]
    fn direct_traffic_counts_every_tap() {
        let bytes = bytes_moved(&config(MemoryStrategy::Direct));
        assert_eq!(bytes, (64 * 64 * 9 * 2 + 64 * 64) * 4);
    }

    #[test]
    fn staged_traffic_stages_each_tile_once_per_group() {
        let config = config(MemoryStrategy::SharedStaging);
        // 2x2 groups of 32x32 outputs, staged tiles of 34x34.
        let expected = (4 * 34 * 34 + 64 * 64 + 64 * 64 * 9) * 4;
        assert_eq!(bytes_moved(&config), expected);
    }
}
