//! Order-preserving encoding of indexed values.
//!
//! Every indexed value is kept in two forms:
//! - a sort key, whose byte order matches the value order used by the
//!   comparison operators (type tag first, then the value), and
//! - the raw JSON text, used for pattern matching and for decoding.
//!
//! Type order: no value < booleans < numbers < strings < containers.
//! Numbers compare numerically regardless of integer/float representation.
//! Integers are exact over the whole `i64`/`u64` range: the nearest `f64`
//! orders them first, then the remainder lost by that rounding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const TAG_NONE: char = '0';
const TAG_BOOL: char = '1';
const TAG_NUMBER: char = '2';
const TAG_STRING: char = '3';
const TAG_CONTAINER: char = '4';

/// An encoded index value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexValue {
    sort_key: String,
    raw: String,
}

impl IndexValue {
    /// Encodes a resolved path value. `None` (absent path) and JSON `null`
    /// share the "no value" encoding.
    #[must_use]
    pub fn encode(value: Option<&Value>) -> Self {
        let value = value.unwrap_or(&Value::Null);
        let raw = value.to_string();
        let sort_key = match value {
            Value::Null => TAG_NONE.to_string(),
            Value::Bool(b) => format!("{TAG_BOOL}{}", u8::from(*b)),
            Value::Number(n) => {
                let f = n.as_f64().unwrap_or(0.0);
                let exact = n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from));
                let remainder = exact.map_or(0, |i| i - f as i128);
                format!("{TAG_NUMBER}{:016x}{:04x}", ordered_bits(f), biased(remainder))
            }
            Value::String(s) => format!("{TAG_STRING}{s}"),
            Value::Array(_) | Value::Object(_) => format!("{TAG_CONTAINER}{raw}"),
        };
        Self { sort_key, raw }
    }

    /// Rebuilds a value from its stored columns.
    #[must_use]
    pub fn from_parts(sort_key: String, raw: String) -> Self {
        Self { sort_key, raw }
    }

    /// The order-preserving key.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    /// The JSON text of the value.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The raw text with leading and trailing `"` removed, so string values
    /// can be matched against wildcard patterns.
    #[must_use]
    pub fn dequoted(&self) -> &str {
        self.raw.trim_matches('"')
    }

    /// True when the path did not resolve or resolved to `null`.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.sort_key.starts_with(TAG_NONE)
    }

    /// Decodes back to JSON. Undecodable text yields `null`.
    #[must_use]
    pub fn decode(&self) -> Value {
        serde_json::from_str(&self.raw).unwrap_or(Value::Null)
    }
}

/// Maps an `f64` onto a `u64` whose unsigned order matches numeric order.
fn ordered_bits(f: f64) -> u64 {
    // -0.0 and 0.0 must encode identically.
    let f = if f == 0.0 { 0.0 } else { f };
    let bits = f.to_bits();
    if bits & (1 << 63) != 0 { !bits } else { bits | (1 << 63) }
}

/// Rounding an integer to `f64` loses at most 2^11, so a biased `u16`
/// holds the remainder.
fn biased(remainder: i128) -> u16 {
    u16::try_from(remainder + 0x8000).unwrap_or(0x8000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(v: Value) -> String {
        IndexValue::encode(Some(&v)).sort_key().to_string()
    }

    #[test]
    fn numbers_order_numerically() {
        let values = [
            json!(-1e9),
            json!(-2.5),
            json!(-1),
            json!(0),
            json!(0.5),
            json!(2),
            json!(10),
            json!(1e12),
        ];
        for pair in values.windows(2) {
            assert!(key(pair[0].clone()) < key(pair[1].clone()), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn integer_and_float_forms_are_equal() {
        assert_eq!(key(json!(3)), key(json!(3.0)));
        assert_eq!(key(json!(0.0)), key(json!(-0.0)));
    }

    #[test]
    fn large_integers_stay_distinct() {
        assert_ne!(key(json!(9_007_199_254_740_993_i64)), key(json!(9_007_199_254_740_992_i64)));
        assert!(key(json!(9_007_199_254_740_992_i64)) < key(json!(9_007_199_254_740_993_i64)));
        assert!(key(json!(-9_007_199_254_740_993_i64)) < key(json!(-9_007_199_254_740_992_i64)));
        assert!(key(json!(i64::MAX)) < key(json!(u64::MAX)));
        assert!(key(json!(u64::MAX - 1)) < key(json!(u64::MAX)));
        assert_eq!(key(json!(9_007_199_254_740_992_i64)), key(json!(9_007_199_254_740_992.0)));
        assert!(key(json!(9_007_199_254_740_993_i64)) > key(json!(9_007_199_254_740_992.0)));
    }

    #[test]
    fn type_order() {
        assert!(key(Value::Null) < key(json!(false)));
        assert!(key(json!(false)) < key(json!(true)));
        assert!(key(json!(true)) < key(json!(-5)));
        assert!(key(json!(1e300)) < key(json!("")));
        assert!(key(json!("zzz")) < key(json!([])));
    }

    #[test]
    fn absent_equals_null() {
        assert_eq!(IndexValue::encode(None), IndexValue::encode(Some(&Value::Null)));
        assert!(IndexValue::encode(None).is_none());
    }

    #[test]
    fn dequoted_strips_string_quotes() {
        let v = IndexValue::encode(Some(&json!("hello")));
        assert_eq!(v.raw(), "\"hello\"");
        assert_eq!(v.dequoted(), "hello");
        assert_eq!(IndexValue::encode(Some(&json!(42))).dequoted(), "42");
    }

    #[test]
    fn decode_returns_original_value() {
        for v in [json!("a"), json!(1.5), json!({"x": [1, 2]}), json!(true)] {
            assert_eq!(IndexValue::encode(Some(&v)).decode(), v);
        }
    }
}
