use crate::config::KernelConfig;

use super::{for_each_tile, FragmentBuilder, SUM_DECL};

const INDEX_DECLS: &str = "\
  const unsigned int x = (get_group_id(0) * <%GROUP_COLUMNS%>) + get_local_id(0);
  const unsigned int y = (get_group_id(1) * <%GROUP_ROWS%>) + get_local_id(1);
";

const UPDATE: &str = "      sum_<%TX%>_<%TY%> += input[((y + <%ROW_OFFSET%> + fY) * <%INPUT_STRIDE%>) + (x + <%COL_OFFSET%> + fX)] * filter[(fY * <%FILTER_WIDTH%>) + fX];\n";

const STORE: &str = "  output[((y + <%ROW_OFFSET%>) * <%OUTPUT_STRIDE%>) + (x + <%COL_OFFSET%>)] = sum_<%TX%>_<%TY%> / <%FILTER_AREA%>;\n";

/// Direct-access strategy: every filter tap reads the bulk input buffer
/// with the padded input stride.
pub(super) struct DirectAccess;

impl FragmentBuilder for DirectAccess {
    fn declarations(&self, config: &KernelConfig) -> String {
        let mut decls = String::from(INDEX_DECLS);
        for_each_tile(config, |element| decls.push_str(&element.expand(SUM_DECL)));
        decls
    }

    fn prologue(&self, _config: &KernelConfig) -> String {
        String::new()
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
