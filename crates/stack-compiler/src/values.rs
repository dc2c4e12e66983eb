//! Deep merge for chart values.

use serde_json::Value;
use stack_platform::Values;

/// Merge `overlay` into `base`. Objects merge key by key; any other value
/// in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut Values, overlay: Values) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
