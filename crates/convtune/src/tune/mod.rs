//! The autotuning search driver.
//!
//! [`enumerate`] walks the cross-product of work-group and per-thread
//! tile extents and keeps only the configurations a device can legally
//! run; [`sweep`] generates, compiles and times each survivor, skipping
//! over per-configuration failures so a single bad candidate never stops
//! the run.

mod result;
mod sweep;

pub use result::*;
pub use sweep::*;

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::config::{ElemType, KernelConfig, MemoryStrategy};
use crate::geometry::Geometry;

/// Device and search-space limits driving the enumeration.
#[derive(new, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TuneLimits {
    /// Smallest number of columns per work-group to try.
    pub min_threads: u32,
    /// Device ceiling on work-items per work-group.
    pub max_threads: u32,
    /// Largest number of rows per work-group to try.
    pub max_rows: u32,
    /// Largest number of columns per work-group to try.
    pub max_columns: u32,
    /// Work-group sizes must be a multiple of this scheduling unit.
    pub thread_unit: u32,
    /// Step between successive column counts.
    pub thread_increment: u32,
    /// Budget of tile elements per work-item, register reserve included.
    pub max_items: u32,
    /// Local memory budget for the staged variant, when known.
    pub max_local_bytes: Option<u64>,
}

impl KernelConfig {
    /// Whether this config satisfies every constraint of `limits`.
    /// [`enumerate`] only ever proposes configs for which this holds.
    pub fn satisfies(&self, limits: &TuneLimits) -> bool {
        self.geometry.width % self.group_columns() == 0
            && self.geometry.height % self.group_rows() == 0
            && self.threads_per_group() <= limits.max_threads
            && self.threads_per_group() % limits.thread_unit.max(1) == 0
            && self.thread_tile() + self.strategy.register_reserve() <= limits.max_items
            && limits
                .max_local_bytes
                .map_or(true, |budget| self.local_bytes() <= budget)
    }
}

/// Enumerate every legal configuration for the geometry, limits and
/// memory strategies.
///
/// Work-group and tile extents that fail a divisibility, group-size or
/// budget constraint are filtered here; the generator downstream trusts
/// whatever it is handed.
pub fn enumerate(
    geometry: &Geometry,
    limits: &TuneLimits,
    strategies: &[MemoryStrategy],
    elem: ElemType,
) -> Vec<KernelConfig> {
    let thread_unit = limits.thread_unit.max(1);
    let thread_increment = limits.thread_increment.max(1);

    let mut columns_per_block = Vec::new();
    let mut columns = limits.min_threads.max(1);
    while columns <= limits.max_columns {
        columns_per_block.push(columns);
        columns += thread_increment;
    }

    let mut configs = Vec::new();
    for &columns in &columns_per_block {
        for rows in 1..=limits.max_rows {
            let threads = columns * rows;
            if threads > limits.max_threads {
                break;
            }
            if threads % thread_unit != 0 {
                continue;
            }

            for columns_per_thread in 1..=limits.max_items {
                if geometry.width % (columns * columns_per_thread) != 0 {
                    continue;
                }

                for rows_per_thread in 1..=limits.max_items {
                    if geometry.height % (rows * rows_per_thread) != 0 {
                        continue;
                    }

                    for &strategy in strategies {
                        let tile = columns_per_thread * rows_per_thread;
                        if tile + strategy.register_reserve() > limits.max_items {
                            continue;
                        }

                        let config = KernelConfig::new(
                            *geometry,
                            columns,
                            rows,
                            columns_per_thread,
                            rows_per_thread,
                            strategy,
                            elem,
                        );
                        if limits
                            .max_local_bytes
                            .is_some_and(|budget| config.local_bytes() > budget)
                        {
                            continue;
                        }

                        log::debug!("candidate {config}");
                        configs.push(config);
                    }
                }
            }
        }
    }

    configs
}
