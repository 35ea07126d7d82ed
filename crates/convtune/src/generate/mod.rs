//! Kernel source generation.
//!
//! One pipeline drives the whole expansion: the strategy selected by the
//! config provides the body sections through [`FragmentBuilder`], each
//! section is assembled from small per-tile-element templates, and a
//! final substitution pass splices everything into the kernel skeleton
//! and resolves the run-wide values (type name, strides, filter extents).

mod direct;
mod staged;

use std::fmt::{self, Display};

use derive_new::new;

use crate::config::{ElemType, KernelConfig, MemoryStrategy};
use crate::template::Template;

use direct::DirectAccess;
use staged::SharedStaging;

/// Entry point name declared by every generated kernel.
pub const KERNEL_NAME: &str = "convolution";

/// Generated kernel text plus the entry point it declares.
///
/// Self-contained; one instance per config, regenerated on demand since
/// generation is cheap relative to compilation.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    pub entry_point: &'static str,
    pub source: String,
}

impl KernelSource {
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Display for KernelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

const SKELETON: &str = "\
<%PRAGMAS%>__kernel void convolution(__global const <%TYPE%> * const restrict input, __global <%TYPE%> * const restrict output, __global const <%TYPE%> * const restrict filter) {
<%DECLARATIONS%><%PROLOGUE%>  for ( unsigned int fY = 0; fY < <%FILTER_HEIGHT%>; fY++ ) {
    for ( unsigned int fX = 0; fX < <%FILTER_WIDTH%>; fX++ ) {
<%UPDATES%>    }
  }
<%EPILOGUE%>}
";

const FP64_PRAGMA: &str = "#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n\n";

/// One accumulator declaration per output tile element, shared by both
/// strategies.
const SUM_DECL: &str = "  <%TYPE%> sum_<%TX%>_<%TY%> = 0;\n";

/// Builds the strategy-dependent sections of the kernel body.
trait FragmentBuilder {
    /// Declarations at the top of the body: index variables, local
    /// storage, accumulators.
    fn declarations(&self, config: &KernelConfig) -> String;

    /// Statements executed before the tap loops (cooperative staging and
    /// the load/compute barrier; empty for the direct variant).
    fn prologue(&self, config: &KernelConfig) -> String;

    /// One accumulation statement per tile element, emitted inside the
    /// `fY`/`fX` tap loops.
    fn updates(&self, config: &KernelConfig) -> String;

    /// Averaging and stores after the tap loops.
    fn epilogue(&self, config: &KernelConfig) -> String;
}

/// One cell of a work-item's output tile, with its block-cyclic offsets.
struct TileElement {
    tx: u32,
    ty: u32,
    col_offset: u32,
    row_offset: u32,
}

impl TileElement {
    /// Substitute this element's name and offsets into a fragment,
    /// leaving run-wide placeholders for the final pass.
    fn expand(&self, fragment: &str) -> String {
        Template::new(fragment)
            .bind("TX", &self.tx.to_string())
            .bind("TY", &self.ty.to_string())
            .bind("COL_OFFSET", &self.col_offset.to_string())
            .bind("ROW_OFFSET", &self.row_offset.to_string())
            .into_text()
    }
}

/// Visit the thread tile in row-major order.
fn for_each_tile(config: &KernelConfig, mut visit: impl FnMut(&TileElement)) {
    for ty in 0..config.rows_per_thread {
        for tx in 0..config.columns_per_thread {
            visit(&TileElement {
                tx,
                ty,
                col_offset: tx * config.columns_per_block,
                row_offset: ty * config.rows_per_block,
            });
        }
    }
}

/// Map a config to its kernel source text.
///
/// Pure and deterministic: identical configs yield byte-identical text.
/// The config is trusted here; the enumeration filters are responsible
/// for never proposing one that violates the tiling invariants.
pub fn generate(config: &KernelConfig) -> KernelSource {
    let geometry = &config.geometry;
    let builder: &dyn FragmentBuilder = match config.strategy {
        MemoryStrategy::Direct => &DirectAccess,
        MemoryStrategy::SharedStaging => &SharedStaging,
    };
    let pragmas = match config.elem {
        ElemType::F32 => "",
        ElemType::F64 => FP64_PRAGMA,
    };

    let source = Template::new(SKELETON)
        .bind("PRAGMAS", pragmas)
        .bind("DECLARATIONS", &builder.declarations(config))
        .bind("PROLOGUE", &builder.prologue(config))
        .bind("UPDATES", &builder.updates(config))
        .bind("EPILOGUE", &builder.epilogue(config))
        // Run-wide values, resolved across every spliced fragment at once.
        .bind("TYPE", config.elem.cl_name())
        .bind("FILTER_WIDTH", &geometry.filter_width.to_string())
        .bind("FILTER_HEIGHT", &geometry.filter_height.to_string())
        .bind("FILTER_AREA", &config.elem.literal(geometry.filter_area()))
        .bind("FILTER_LEN", &geometry.filter_len().to_string())
        .bind("INPUT_STRIDE", &geometry.input_stride().to_string())
        .bind("OUTPUT_STRIDE", &geometry.output_stride().to_string())
        .bind("GROUP_COLUMNS", &config.group_columns().to_string())
        .bind("GROUP_ROWS", &config.group_rows().to_string())
        .bind("COLUMNS_PER_BLOCK", &config.columns_per_block.to_string())
        .bind("THREADS_PER_GROUP", &config.threads_per_group().to_string())
        .bind("STAGE_WIDTH", &config.stage_width().to_string())
        .bind("STAGE_LEN", &config.stage_len().to_string())
        .into_source()
        .expect("kernel skeleton fully substituted");

    KernelSource::new(KERNEL_NAME, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn config(strategy: MemoryStrategy) -> KernelConfig {
        KernelConfig::new(Geometry::new(64, 64, 3, 3, 1), 16, 16, 1, 1, strategy, ElemType::F32)
    }

    #[test]
    fn direct_variant_matches_expected_text() {
        let expected = "\
__kernel void convolution(__global const float * const restrict input, __global float * const restrict output, __global const float * const restrict filter) {
  const unsigned int x = (get_group_id(0) * 16) + get_local_id(0);
  const unsigned int y = (get_group_id(1) * 16) + get_local_id(1);
  float sum_0_0 = 0;
  for ( unsigned int fY = 0; fY < 3; fY++ ) {
    for ( unsigned int fX = 0; fX < 3; fX++ ) {
      sum_0_0 += input[((y + 0 + fY) * 66) + (x + 0 + fX)] * filter[(fY * 3) + fX];
    }
  }
  output[((y + 0) * 64) + (x + 0)] = sum_0_0 / 9.0f;
}
";
        let source = generate(&config(MemoryStrategy::Direct));
        assert_eq!(source.entry_point, KERNEL_NAME);
        assert_eq!(source.as_str(), expected);
    }

    #[test]
    fn staged_variant_matches_expected_text() {
        let expected = "\
__kernel void convolution(__global const float * const restrict input, __global float * const restrict output, __global const float * const restrict filter) {
  __local float stage[324];
  __local float filterCache[9];
  const unsigned int lX = get_local_id(0);
  const unsigned int lY = get_local_id(1);
  const unsigned int gX = get_group_id(0) * 16;
  const unsigned int gY = get_group_id(1) * 16;
  float sum_0_0 = 0;
  stage[((lY + 0) * 18) + (lX + 0)] = input[((gY + lY + 0) * 66) + (gX + lX + 0)];
  if ( lX < 2 ) {
    stage[((lY + 0) * 18) + (lX + 16)] = input[((gY + lY + 0) * 66) + (gX + lX + 16)];
  }
  if ( lY < 2 ) {
    stage[((lY + 16) * 18) + (lX + 0)] = input[((gY + lY + 16) * 66) + (gX + lX + 0)];
  }
  if ( (lX < 2) && (lY < 2) ) {
    stage[((lY + 16) * 18) + (lX + 16)] = input[((gY + lY + 16) * 66) + (gX + lX + 16)];
  }
  for ( unsigned int item = (lY * 16) + lX; item < 9; item += 256 ) {
    filterCache[item] = filter[item];
  }
  barrier(CLK_LOCAL_MEM_FENCE);
  for ( unsigned int fY = 0; fY < 3; fY++ ) {
    for ( unsigned int fX = 0; fX < 3; fX++ ) {
      sum_0_0 += stage[((lY + 0 + fY) * 18) + (lX + 0 + fX)] * filterCache[(fY * 3) + fX];
    }
  }
  output[((gY + lY + 0) * 64) + (gX + lX + 0)] = sum_0_0 / 9.0f;
}
";
        let source = generate(&config(MemoryStrategy::SharedStaging));
        assert_eq!(source.as_str(), expected);
    }

    #[test]
    fn generation_is_idempotent() {
        for strategy in [MemoryStrategy::Direct, MemoryStrategy::SharedStaging] {
            let config = config(strategy);
            assert_eq!(generate(&config), generate(&config));
        }
    }

    #[test]
    fn no_placeholder_survives_any_config() {
        let geometry = Geometry::new(256, 128, 5, 7, 32);
        for strategy in [MemoryStrategy::Direct, MemoryStrategy::SharedStaging] {
            for elem in [ElemType::F32, ElemType::F64] {
                for (ct, rt) in [(1, 1), (2, 1), (1, 3), (4, 2)] {
                    let config =
                        KernelConfig::new(geometry, 8, 4, ct, rt, strategy, elem);
                    let source = generate(&config);
                    assert!(
                        !source.as_str().contains("<%"),
                        "unresolved placeholder in:\n{source}"
                    );
                }
            }
        }
    }

    #[test]
    fn tile_elements_unroll_into_statement_sets() {
        let geometry = Geometry::new(96, 64, 3, 3, 0);
        for strategy in [MemoryStrategy::Direct, MemoryStrategy::SharedStaging] {
            let config = KernelConfig::new(geometry, 8, 8, 3, 2, strategy, ElemType::F32);
            let source = generate(&config);
            let text = source.as_str();
            assert_eq!(text.matches(" = 0;").count(), 6, "{strategy}");
            assert_eq!(text.matches("sum_").count(), 18, "{strategy}");
            assert_eq!(text.matches("output[").count(), 6, "{strategy}");
        }
    }

    #[test]
    fn strides_agree_with_the_geometry() {
        let geometry = Geometry::new(96, 64, 5, 5, 32);
        for strategy in [MemoryStrategy::Direct, MemoryStrategy::SharedStaging] {
            let config = KernelConfig::new(geometry, 8, 8, 2, 2, strategy, ElemType::F32);
            let text = generate(&config).source;
            assert!(text.contains(&format!("* {})", geometry.input_stride())));
            assert!(text.contains(&format!("* {})", geometry.output_stride())));
        }
    }

    #[test]
    fn direct_variant_stays_out_of_local_memory() {
        let text = generate(&config(MemoryStrategy::Direct)).source;
        assert!(!text.contains("__local"));
        assert!(!text.contains("barrier"));
        assert!(!text.contains("if ("));
    }

    #[test]
    fn staged_variant_synchronizes_once_between_load_and_compute() {
        let text = generate(&config(MemoryStrategy::SharedStaging)).source;
        assert_eq!(text.matches("barrier(CLK_LOCAL_MEM_FENCE);").count(), 1);
        let barrier = text.find("barrier").unwrap();
        let last_load = text.rfind("] = input[").unwrap();
        let first_read = text.find("+= stage[").unwrap();
        assert!(last_load < barrier && barrier < first_read);
    }

    #[test]
    fn boundary_guards_appear_only_for_partial_passes() {
        // 17x17 filter pads the 16-wide tile to exactly two full passes.
        let aligned = KernelConfig::new(
            Geometry::new(64, 64, 17, 17, 1),
            16,
            16,
            1,
            1,
            MemoryStrategy::SharedStaging,
            ElemType::F32,
        );
        let text = generate(&aligned).source;
        assert_eq!(text.matches("stage[(").count(), 4 + 1);
        assert!(!text.contains("if ("));

        let partial = generate(&config(MemoryStrategy::SharedStaging)).source;
        assert_eq!(partial.matches("if (").count(), 3);
    }

    #[test]
    fn f64_configs_enable_the_extension_and_literal() {
        let mut config = config(MemoryStrategy::Direct);
        config.elem = ElemType::F64;
        let text = generate(&config).source;
        assert!(text.starts_with("#pragma OPENCL EXTENSION cl_khr_fp64 : enable"));
        assert!(text.contains("double sum_0_0 = 0;"));
        assert!(text.contains("/ 9.0;"));
    }
}
