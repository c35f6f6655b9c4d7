//! Exact decimal semantics for numeric keywords
//!
//! `multipleOf` and the bound keywords compare using the decimal value of the
//! JSON literal, not its nearest binary double, so boundary values such as
//! `0.1 + 0.2` against `multipleOf: 0.1` are not misclassified. Numbers are
//! re-read from their shortest serialized form into a mantissa/exponent pair;
//! when a mantissa overflows `i128` the comparison falls back to `f64`.

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// A decimal value `mantissa * 10^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    mantissa: i128,
    exponent: i32,
}

impl Decimal {
    /// Parse the serialized form of a JSON number
    ///
    /// Accepts the grammar serde_json emits: optional sign, digits, optional
    /// fraction, optional exponent. Returns `None` when the mantissa does not
    /// fit in `i128`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Decimal> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (digits, exp_part) = match rest.split_once(['e', 'E']) {
            Some((digits, exp)) => (digits, Some(exp)),
            None => (rest, None),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (digits, ""),
        };

        let mut mantissa: i128 = 0;
        for ch in int_part.chars().chain(frac_part.chars()) {
            let digit = ch.to_digit(10)?;
            mantissa = mantissa.checked_mul(10)?.checked_add(i128::from(digit))?;
        }
        if negative {
            mantissa = -mantissa;
        }

        let frac_len = i32::try_from(frac_part.len()).ok()?;
        let explicit: i32 = match exp_part {
            Some(exp) => exp.parse().ok()?,
            None => 0,
        };
        let exponent = explicit.checked_sub(frac_len)?;

        Some(Decimal { mantissa, exponent }.normalized())
    }

    /// Parse a `serde_json::Number`
    #[must_use]
    pub fn from_number(number: &Number) -> Option<Decimal> {
        Decimal::parse(&number.to_string())
    }

    /// Strip trailing zeros from the mantissa so equal values compare equal
    fn normalized(mut self) -> Decimal {
        while self.mantissa != 0 && self.mantissa % 10 == 0 {
            self.mantissa /= 10;
            self.exponent += 1;
        }
        self
    }

    /// Scale two decimals to a common exponent, returning aligned mantissas
    fn aligned(self, other: Decimal) -> Option<(i128, i128)> {
        let exponent = self.exponent.min(other.exponent);
        Some((
            scale(self.mantissa, self.exponent.checked_sub(exponent)?)?,
            scale(other.mantissa, other.exponent.checked_sub(exponent)?)?,
        ))
    }

    /// Exact comparison, when both mantissas stay in range after alignment
    #[must_use]
    pub fn compare(self, other: Decimal) -> Option<Ordering> {
        let (a, b) = self.aligned(other)?;
        Some(a.cmp(&b))
    }

    /// Whether `self` is an integer multiple of `other`
    #[must_use]
    pub fn is_multiple_of(self, other: Decimal) -> Option<bool> {
        if other.mantissa == 0 {
            return Some(false);
        }
        let (a, b) = self.aligned(other)?;
        Some(a % b == 0)
    }

    /// Whether the value has no fractional part
    #[must_use]
    pub fn is_integer(self) -> bool {
        self.exponent >= 0
    }
}

fn scale(mantissa: i128, shift: i32) -> Option<i128> {
    let mut scaled = mantissa;
    for _ in 0..shift {
        scaled = scaled.checked_mul(10)?;
    }
    Some(scaled)
}

/// Compare two JSON numbers exactly, falling back to `f64` on overflow
#[must_use]
pub fn compare(a: &Number, b: &Number) -> Ordering {
    if let (Some(da), Some(db)) = (Decimal::from_number(a), Decimal::from_number(b)) {
        if let Some(ordering) = da.compare(db) {
            return ordering;
        }
    }
    let fa = a.as_f64().unwrap_or(f64::NAN);
    let fb = b.as_f64().unwrap_or(f64::NAN);
    fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
}

/// Whether JSON number `a` is an integer multiple of `b`
#[must_use]
pub fn is_multiple_of(a: &Number, b: &Number) -> bool {
    if let (Some(da), Some(db)) = (Decimal::from_number(a), Decimal::from_number(b)) {
        if let Some(result) = da.is_multiple_of(db) {
            return result;
        }
    }
    let fa = a.as_f64().unwrap_or(f64::NAN);
    let fb = b.as_f64().unwrap_or(f64::NAN);
    if fb == 0.0 || !fa.is_finite() || !fb.is_finite() {
        return false;
    }
    (fa / fb).fract() == 0.0
}

/// Deep JSON equality with numeric comparison for numbers, so `1` and `1.0`
/// are the same value for `enum`, `const`, and `uniqueItems`
#[must_use]
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => compare(a, b) == Ordering::Equal,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Whether a JSON number holds an integral value (`1.0` counts)
#[must_use]
pub fn is_integer(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    Decimal::from_number(number).is_some_and(Decimal::is_integer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn num(value: f64) -> Number {
        Number::from_f64(value).expect("finite")
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(Decimal::parse("1.50"), Decimal::parse("1.5"));
        assert_eq!(Decimal::parse("100"), Decimal::parse("1e2"));
        assert_eq!(Decimal::parse("-0.001"), Decimal::parse("-1e-3"));
    }

    #[test]
    fn test_multiple_of_boundary_values() {
        // 0.1 + 0.2 computed in binary is 0.30000000000000004
        let sum = num(0.1 + 0.2);
        assert!(!is_multiple_of(&sum, &num(0.1)));
        assert!(is_multiple_of(&num(0.3), &num(0.1)));
        assert!(is_multiple_of(&num(1.0e8), &num(0.0001)));
        assert!(is_multiple_of(&num(0.0075), &num(0.0001)));
    }

    #[test]
    fn test_exact_comparison() {
        assert_eq!(compare(&num(0.1), &num(0.1)), Ordering::Equal);
        assert_eq!(
            compare(&Number::from(1), &num(1.0000000000000002)),
            Ordering::Less
        );
        assert_eq!(compare(&Number::from(-3), &Number::from(2)), Ordering::Less);
    }

    #[test]
    fn test_is_integer() {
        assert!(is_integer(&Number::from(7)));
        assert!(is_integer(&num(1.0)));
        assert!(!is_integer(&num(1.5)));
        assert!(is_integer(&num(1.0e3)));
    }

    #[test]
    fn test_json_equal_is_numeric_aware() {
        assert!(json_equal(&json!([1, {"a": 2.0}]), &json!([1.0, {"a": 2}])));
        assert!(!json_equal(&json!("1"), &json!(1)));
        assert!(!json_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_mixed_integer_and_float_representations() {
        let schema_bound = json!(1);
        let instance = json!(1.0);
        assert_eq!(
            compare(
                instance.as_number().expect("number"),
                schema_bound.as_number().expect("number")
            ),
            Ordering::Equal
        );
    }
}
