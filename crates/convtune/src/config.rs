use std::fmt::{self, Display};

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Memory strategy of a generated kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryStrategy {
    /// Every filter tap reads the bulk input buffer directly.
    Direct,
    /// The work-group cooperatively stages the halo-extended input tile
    /// and the filter through local memory before computing.
    SharedStaging,
}

impl MemoryStrategy {
    /// Registers held back from the per-thread tile budget. The staged
    /// variant needs more headroom for its load bookkeeping.
    pub fn register_reserve(&self) -> u32 {
        match self {
            MemoryStrategy::Direct => 2,
            MemoryStrategy::SharedStaging => 5,
        }
    }

    /// The strategy column of the report table.
    pub fn as_flag(&self) -> u32 {
        match self {
            MemoryStrategy::Direct => 0,
            MemoryStrategy::SharedStaging => 1,
        }
    }
}

impl Display for MemoryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryStrategy::Direct => f.write_str("direct"),
            MemoryStrategy::SharedStaging => f.write_str("staged"),
        }
    }
}

/// Scalar element type of the buffers and the generated kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElemType {
    F32,
    F64,
}

impl ElemType {
    /// OpenCL C spelling of the type.
    pub fn cl_name(&self) -> &'static str {
        match self {
            ElemType::F32 => "float",
            ElemType::F64 => "double",
        }
    }

    pub fn size(&self) -> usize {
        match self {
            ElemType::F32 => 4,
            ElemType::F64 => 8,
        }
    }

    /// An OpenCL literal of this type holding an integral value.
    pub fn literal(&self, value: u32) -> String {
        match self {
            ElemType::F32 => format!("{value}.0f"),
            ElemType::F64 => format!("{value}.0"),
        }
    }
}

/// Host scalars that can back a generated kernel.
pub trait ClScalar: num_traits::Float + Send + Sync + 'static {
    const ELEM: ElemType;
}

impl ClScalar for f32 {
    const ELEM: ElemType = ElemType::F32;
}

impl ClScalar for f64 {
    const ELEM: ElemType = ElemType::F64;
}

/// Global and local dispatch sizes of one kernel launch.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGrid {
    pub global: [u32; 2],
    pub local: [u32; 2],
}

/// Complete description of one kernel variant.
///
/// Immutable once constructed; the generator maps a config to exactly one
/// source text. Tile elements are block-cyclic: element `(tx, ty)` of a
/// work-item lands at `(x + tx * columns_per_block, y + ty * rows_per_block)`.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelConfig {
    pub geometry: Geometry,
    pub columns_per_block: u32,
    pub rows_per_block: u32,
    pub columns_per_thread: u32,
    pub rows_per_thread: u32,
    pub strategy: MemoryStrategy,
    pub elem: ElemType,
}

impl KernelConfig {
    /// Work-items per work-group.
    pub fn threads_per_group(&self) -> u32 {
        self.columns_per_block * self.rows_per_block
    }

    /// Output tile elements computed by one work-item.
    pub fn thread_tile(&self) -> u32 {
        self.columns_per_thread * self.rows_per_thread
    }

    /// Output columns covered by one work-group.
    pub fn group_columns(&self) -> u32 {
        self.columns_per_block * self.columns_per_thread
    }

    /// Output rows covered by one work-group.
    pub fn group_rows(&self) -> u32 {
        self.rows_per_block * self.rows_per_thread
    }

    /// Columns of the halo-extended staged tile.
    pub fn stage_width(&self) -> u32 {
        self.group_columns() + (self.geometry.filter_width - 1)
    }

    /// Rows of the halo-extended staged tile.
    pub fn stage_height(&self) -> u32 {
        self.group_rows() + (self.geometry.filter_height - 1)
    }

    pub fn stage_len(&self) -> u32 {
        self.stage_width() * self.stage_height()
    }

    /// Local memory footprint: the staged tile plus the staged filter,
    /// zero for the direct variant.
    pub fn local_bytes(&self) -> u64 {
        match self.strategy {
            MemoryStrategy::Direct => 0,
            MemoryStrategy::SharedStaging => {
                (self.stage_len() as u64 + self.geometry.filter_len() as u64)
                    * self.elem.size() as u64
            }
        }
    }

    /// Dispatch sizes for this config: one work-item per output tile
    /// element column/row, grouped into blocks.
    pub fn launch_grid(&self) -> LaunchGrid {
        LaunchGrid::new(
            [
                self.geometry.width / self.columns_per_thread,
                self.geometry.height / self.rows_per_thread,
            ],
            [self.columns_per_block, self.rows_per_block],
        )
    }
}

impl Display for KernelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} f{}x{} {} {} cb={} rb={} ct={} rt={}",
            self.geometry.width,
            self.geometry.height,
            self.geometry.filter_width,
            self.geometry.filter_height,
            self.elem.cl_name(),
            self.strategy,
            self.columns_per_block,
            self.rows_per_block,
            self.columns_per_thread,
            self.rows_per_thread,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: MemoryStrategy) -> KernelConfig {
        KernelConfig::new(Geometry::new(64, 64, 3, 3, 1), 16, 8, 2, 4, strategy, ElemType::F32)
    }

    #[test]
    fn tile_and_group_arithmetic() {
        let config = config(MemoryStrategy::SharedStaging);
        assert_eq!(config.threads_per_group(), 128);
        assert_eq!(config.thread_tile(), 8);
        assert_eq!(config.group_columns(), 32);
        assert_eq!(config.group_rows(), 32);
        assert_eq!(config.stage_width(), 34);
        assert_eq!(config.stage_height(), 34);
        assert_eq!(config.stage_len(), 34 * 34);
    }

    #[test]
    fn local_bytes_covers_tile_and_filter() {
        let staged = config(MemoryStrategy::SharedStaging);
        assert_eq!(staged.local_bytes(), (34 * 34 + 9) * 4);
        assert_eq!(config(MemoryStrategy::Direct).local_bytes(), 0);
    }

    #[test]
    fn launch_grid_scales_by_thread_tile() {
        let grid = config(MemoryStrategy::Direct).launch_grid();
        assert_eq!(grid.global, [32, 16]);
        assert_eq!(grid.local, [16, 8]);
    }

    #[test]
    fn literals_carry_the_type_suffix() {
        assert_eq!(ElemType::F32.literal(9), "9.0f");
        assert_eq!(ElemType::F64.literal(25), "25.0");
    }

    #[test]
    fn display_is_a_compact_key() {
        let line = config(MemoryStrategy::Direct).to_string();
        assert_eq!(line, "64x64 f3x3 float direct cb=16 rb=8 ct=2 rt=4");
    }
}
