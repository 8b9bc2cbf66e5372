//! Forward-compatible structural merge of a saved record onto defaults

use serde_json::Value;

/// Merge `saved` onto `defaults`.
///
/// Objects merge key by key. A saved leaf replaces the default only when both
/// have the same JSON shape, so a mistyped field falls back to its default
/// instead of poisoning the whole record. Keys unknown to the defaults are
/// carried over (struct decoding ignores them, maps keep them).
pub fn merge_with_defaults(defaults: Value, saved: &Value) -> Value {
    match (defaults, saved) {
        (Value::Object(mut target), Value::Object(source)) => {
            for (key, value) in source {
                let merged = match target.remove(key) {
                    Some(existing) => merge_with_defaults(existing, value),
                    None => value.clone(),
                };
                target.insert(key.clone(), merged);
            }
            Value::Object(target)
        }
        (default, source) => {
            if same_shape(&default, source) {
                source.clone()
            } else {
                default
            }
        }
    }
}

fn same_shape(default: &Value, source: &Value) -> bool {
    match (default, source) {
        (Value::Number(d), Value::Number(s)) => !d.is_u64() || s.is_u64(),
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::String(_), Value::String(_)) => true,
        (Value::Array(_), Value::Array(_)) => true,
        (Value::Null, _) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_take_defaults() {
        let defaults = json!({"coins": 0, "upgrades": {"damage": 0, "speed": 0}});
        let saved = json!({"upgrades": {"damage": 3}});
        let merged = merge_with_defaults(defaults, &saved);
        assert_eq!(merged, json!({"coins": 0, "upgrades": {"damage": 3, "speed": 0}}));
    }

    #[test]
    fn mistyped_leaves_are_rejected() {
        let defaults = json!({"coins": 0, "totalKills": 0, "flag": true});
        let saved = json!({"coins": -5, "totalKills": "lots", "flag": 1});
        let merged = merge_with_defaults(defaults.clone(), &saved);
        assert_eq!(merged, defaults);
    }

    #[test]
    fn unknown_map_keys_are_kept() {
        let defaults = json!({"weapons": {"pistol": {"unlocked": true}}});
        let saved = json!({"weapons": {"rifle": {"unlocked": false}}, "extra": 1});
        let merged = merge_with_defaults(defaults, &saved);
        assert_eq!(merged["weapons"]["pistol"]["unlocked"], json!(true));
        assert_eq!(merged["weapons"]["rifle"]["unlocked"], json!(false));
        assert_eq!(merged["extra"], json!(1));
    }

    #[test]
    fn non_object_record_keeps_defaults() {
        let defaults = json!({"coins": 0});
        assert_eq!(merge_with_defaults(defaults.clone(), &json!([1, 2])), defaults);
    }
}
