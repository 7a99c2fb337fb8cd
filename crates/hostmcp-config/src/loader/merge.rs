//! JSON merge for layered configuration.

use serde_json::Value;

/// Merge `layer` into `base`. Objects merge recursively; anything else is
/// replaced. A key present in `constraints` as a non-object is locked and the
/// overlay value is dropped.
pub(super) fn overlay(base: &mut Value, layer: &Value, constraints: Option<&Value>) {
    if !(base.is_object() && layer.is_object()) {
        if constraints.is_none() {
            *base = layer.clone();
        }
        return;
    }
    let (Some(base_map), Some(overlay_map)) = (base.as_object_mut(), layer.as_object()) else {
        return;
    };
    let locked = match constraints {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return,
    };

    for (key, value) in overlay_map {
        let constraint = locked.and_then(|map| map.get(key));
        if matches!(constraint, Some(c) if !c.is_object()) {
            continue;
        }
        match base_map.get_mut(key) {
            Some(existing) => self::overlay(existing, value, constraint),
            None => {
                let mut slot = Value::Object(serde_json::Map::new());
                if constraint.is_none() {
                    slot = value.clone();
                } else {
                    self::overlay(&mut slot, value, constraint);
                }
                base_map.insert(key.clone(), slot);
            }
        }
    }
}
