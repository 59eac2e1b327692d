use std::collections::BTreeMap;

/// Map key for one shelf in a device's OOS configuration.
pub(crate) fn shelf_key(shelf_number: u32) -> String {
    format!("shelf{shelf_number}")
}

/// Whether a shelf participates in OOS accuracy for a device.
///
/// An empty configuration map enables every shelf. Once the map has any
/// entry, only shelves explicitly mapped to `true` participate; a missing
/// key disables the shelf. Existing device documents depend on this
/// asymmetry, so it is preserved as-is. Per-shelf and overall aggregation
/// both go through this one function.
pub fn shelf_enabled(config: &BTreeMap<String, bool>, shelf_number: u32) -> bool {
    if config.is_empty() {
        return true;
    }
    config.get(&shelf_key(shelf_number)).copied().unwrap_or(false)
}
