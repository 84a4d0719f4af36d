//! Deep JSON merge with last-source-wins precedence
//!
//! Used in two places: composing the store's initial state from several
//! sources, and accumulating partial field sets onto normalized entity
//! records across repeated loads of the same entity.

use serde_json::Value;

/// Merge `overlay` into `base` in place.
///
/// Objects merge recursively; any other overlay value (including arrays and
/// `null`) replaces the base value at that key.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merge a sequence of sources into one value; later sources win on
/// overlapping keys, including nested ones.
pub fn merge_all<I>(sources: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut merged = Value::Object(serde_json::Map::new());
    for source in sources {
        deep_merge(&mut merged, source);
    }
    merged
}
