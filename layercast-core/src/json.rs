//! Canonical JSON serialisation.

use serde::Serialize;

/// Serialise `value` to canonical JSON text.
///
/// Canonical means byte-deterministic for equal input: object keys are
/// sorted and separators are compact, so the publisher's change detection
/// can compare raw bytes. Sorting is achieved by round-tripping through
/// [`serde_json::Value`], whose object representation is an ordered map.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] when the value cannot be represented as
/// JSON (for example a non-finite float).
///
/// # Examples
/// ```
/// use std::collections::HashMap;
/// use layercast_core::to_canonical_json;
///
/// let map = HashMap::from([("b", 2), ("a", 1)]);
/// assert_eq!(to_canonical_json(&map).unwrap(), r#"{"a":1,"b":2}"#);
/// ```
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let tree = serde_json::to_value(value)?;
    serde_json::to_string(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_are_sorted_regardless_of_input_order() {
        let map = HashMap::from([("zebra", 1), ("aardvark", 2), ("mule", 3)]);
        assert_eq!(
            to_canonical_json(&map).expect("serialises"),
            r#"{"aardvark":2,"mule":3,"zebra":1}"#
        );
    }

    #[test]
    fn output_is_compact() {
        let nested = HashMap::from([("outer", HashMap::from([("inner", vec![1, 2])]))]);
        let json = to_canonical_json(&nested).expect("serialises");
        assert!(!json.contains(' '));
        assert_eq!(json, r#"{"outer":{"inner":[1,2]}}"#);
    }

    #[test]
    fn equal_values_produce_identical_bytes() {
        let first = HashMap::from([("k", 1.5)]);
        let second = HashMap::from([("k", 1.5)]);
        assert_eq!(
            to_canonical_json(&first).expect("serialises"),
            to_canonical_json(&second).expect("serialises")
        );
    }
}
