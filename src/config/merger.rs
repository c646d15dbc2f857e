//! Layering of manifest documents.
//!
//! A project manifest can be overlaid by a local, uncommitted one
//! (`.passflow/config.local.yml`). Merge rules:
//!
//! - Mappings merge key by key, recursively
//! - Sequences (`units`, `jobs`, `after`, ...) are replaced whole
//! - A `null` in the overlay removes the key
//! - Any other overlay value replaces the base value

use serde_yaml::Value;

/// Overlay `overlay` onto `base`.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                if value.is_null() {
                    merged.remove(key);
                } else if let Some(existing) = base_map.get(key) {
                    merged.insert(key.clone(), deep_merge(existing, value));
                } else {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Merge documents in order, later ones winning.
///
/// Empty documents parse to `null` and are skipped.
pub fn merge_configs(configs: &[Value]) -> Value {
    configs
        .iter()
        .filter(|config| !config.is_null())
        .fold(Value::Mapping(Default::default()), |acc, config| {
            deep_merge(&acc, config)
        })
}
