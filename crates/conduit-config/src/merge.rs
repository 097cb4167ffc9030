//! Recursive merge of YAML layers; later values win.

use serde_yaml::Value;

/// Merge `overlay` into `base` in place. Mappings are merged key-by-key;
/// any other value kind in `overlay` replaces the corresponding value in
/// `base` wholesale.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn overlay_keys_win_but_unset_base_keys_survive() {
        let mut base = yaml("log_level: info\nruntime:\n  preferred: auto\n");
        let overlay = yaml("runtime:\n  preferred: podman\n");
        deep_merge(&mut base, &overlay);
        assert_eq!(base["log_level"], Value::String("info".to_string()));
        assert_eq!(base["runtime"]["preferred"], Value::String("podman".to_string()));
    }
}
