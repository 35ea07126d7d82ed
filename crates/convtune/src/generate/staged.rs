use crate::config::KernelConfig;
use crate::template::Template;

use super::{for_each_tile, FragmentBuilder, SUM_DECL};

const LOCAL_DECLS: &str = "\
  __local <%TYPE%> stage[<%STAGE_LEN%>];
  __local <%TYPE%> filterCache[<%FILTER_LEN%>];
";

const INDEX_DECLS: &str = "\
  const unsigned int lX = get_local_id(0);
  const unsigned int lY = get_local_id(1);
  const unsigned int gX = get_group_id(0) * <%GROUP_COLUMNS%>;
  const unsigned int gY = get_group_id(1) * <%GROUP_ROWS%>;
";

const LOAD: &str = "stage[((lY + <%PASS_ROW%>) * <%STAGE_WIDTH%>) + (lX + <%PASS_COL%>)] = input[((gY + lY + <%PASS_ROW%>) * <%INPUT_STRIDE%>) + (gX + lX + <%PASS_COL%>)];";

const UNGUARDED_LOAD: &str = "  <%LOAD%>\n";

const GUARDED_LOAD: &str = "  if ( <%GUARD%> ) {\n    <%LOAD%>\n  }\n";

const FILTER_STAGE: &str = "\
  for ( unsigned int item = (lY * <%COLUMNS_PER_BLOCK%>) + lX; item < <%FILTER_LEN%>; item += <%THREADS_PER_GROUP%> ) {
    filterCache[item] = filter[item];
  }
  barrier(CLK_LOCAL_MEM_FENCE);
";

const UPDATE: &str = "      sum_<%TX%>_<%TY%> += stage[((lY + <%ROW_OFFSET%> + fY) * <%STAGE_WIDTH%>) + (lX + <%COL_OFFSET%> + fX)] * filterCache[(fY * <%FILTER_WIDTH%>) + fX];\n";

const STORE: &str = "  output[((gY + lY + <%ROW_OFFSET%>) * <%OUTPUT_STRIDE%>) + (gX + lX + <%COL_OFFSET%>)] = sum_<%TX%>_<%TY%> / <%FILTER_AREA%>;\n";

/// Shared-staging strategy: the work-group cooperatively copies the
/// halo-extended input tile and the filter into local memory, then
/// computes from the staged copies.
pub(super) struct SharedStaging;

impl FragmentBuilder for SharedStaging {
    fn declarations(&self, config: &KernelConfig) -> String {
        let mut decls = String::from(LOCAL_DECLS);
        decls.push_str(INDEX_DECLS);
        for_each_tile(config, |element| decls.push_str(&element.expand(SUM_DECL)));
        decls
    }

    fn prologue(&self, config: &KernelConfig) -> String {
        let mut loads = cooperative_loads(config);
        loads.push_str(FILTER_STAGE);
        loads
    }

    fn updates(&self, config: &KernelConfig) -> String {
        let mut updates = String::new();
        for_each_tile(config, |element| updates.push_str(&element.expand(UPDATE)));
        updates
    }

    fn epilogue(&self, config: &KernelConfig) -> String {
        let mut stores = String::new();
        for_each_tile(config, |element| stores.push_str(&element.expand(STORE)));
        stores
    }
}

/// Emit the cooperative load of the staged input tile.
///
/// The tile is covered in passes stepped by the work-group extents: one
/// statement when a single pass suffices, an unrolled statement per pass
/// otherwise. Interior passes load unconditionally; a final pass that
/// covers only part of a work-group extent is wrapped in a boundary
/// guard so no thread writes past the staged tile.
fn cooperative_loads(config: &KernelConfig) -> String {
    let mut loads = String::new();
    for (row_offset, row_bound) in passes(config.stage_height(), config.rows_per_block) {
        for (col_offset, col_bound) in passes(config.stage_width(), config.columns_per_block) {
            let load = Template::new(LOAD)
                .bind("PASS_ROW", &row_offset.to_string())
                .bind("PASS_COL", &col_offset.to_string())
                .into_text();
            let statement = match guard(col_bound, row_bound) {
                None => Template::new(UNGUARDED_LOAD),
                Some(condition) => Template::new(GUARDED_LOAD).bind("GUARD", &condition),
            };
            loads.push_str(&statement.bind("LOAD", &load).into_text());
        }
    }
    loads
}

/// Pass offsets along one staged-tile axis. A pass covering less than a
/// full work-group extent carries the bound its threads must stay under.
fn passes(extent: u32, step: u32) -> Vec<(u32, Option<u32>)> {
    let mut passes = Vec::new();
    let mut offset = 0;
    while offset < extent {
        let remaining = extent - offset;
        passes.push((offset, (remaining < step).then_some(remaining)));
        offset += step;
    }
    passes
}

fn guard(col_bound: Option<u32>, row_bound: Option<u32>) -> Option<String> {
    match (col_bound, row_bound) {
        (None, None) => None,
        (Some(columns), None) => Some(format!("lX < {columns}")),
        (None, Some(rows)) => Some(format!("lY < {rows}")),
        (Some(columns), Some(rows)) => Some(format!("(lX < {columns}) && (lY < {rows})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_cover_the_extent_exactly() {
        assert_eq!(passes(16, 16), vec![(0, None)]);
        assert_eq!(passes(18, 16), vec![(0, None), (16, Some(2))]);
        assert_eq!(passes(32, 16), vec![(0, None), (16, None)]);
        assert_eq!(passes(40, 16), vec![(0, None), (16, None), (32, Some(8))]);
        assert_eq!(passes(6, 8), vec![(0, Some(6))]);
    }

    #[test]
    fn guards_cover_both_axes() {
        assert_eq!(guard(None, None), None);
        assert_eq!(guard(Some(2), None).unwrap(), "lX < 2");
        assert_eq!(guard(None, Some(3)).unwrap(), "lY < 3");
        assert_eq!(guard(Some(2), Some(3)).unwrap(), "(lX < 2) && (lY < 3)");
    }
}
