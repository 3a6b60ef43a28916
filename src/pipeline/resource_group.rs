pub const DEFAULT_RESOURCE_GROUPS: usize = 5;

/// Resource group for the unit at `index` in selection order.
///
/// `groups` must be non-zero; the configuration layer rejects zero.
pub fn assign_resource_group(index: usize, groups: usize) -> String {
    format!("group_{}", index % groups + 1)
}
