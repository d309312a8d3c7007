//! Centralized numeric coercion for front-matter values.
//!
//! YAML authors write `max: 5`, `max: "5"`, and occasionally `max: 5.0`;
//! every numeric field funnels through these helpers so the accepted
//! forms stay uniform.

use serde_yaml::Value;

/// Coerce to `u64`. Accepts non-negative integers, whole floats, and
/// decimal strings.
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else {
                n.as_f64().and_then(whole_to_u64)
            }
        }
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Coerce to `i64`.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64().and_then(|f| {
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                        Some(f as i64)
                    } else {
                        None
                    }
                })
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Coerce to `f64`.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn whole_to_u64(f: f64) -> Option<u64> {
    if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_as_u64_forms() {
        assert_eq!(as_u64(&yaml("5")), Some(5));
        assert_eq!(as_u64(&yaml("\"5\"")), Some(5));
        assert_eq!(as_u64(&yaml("5.0")), Some(5));
        assert_eq!(as_u64(&yaml("-1")), None);
        assert_eq!(as_u64(&yaml("5.5")), None);
        assert_eq!(as_u64(&yaml("true")), None);
    }

    #[test]
    fn test_as_i64_forms() {
        assert_eq!(as_i64(&yaml("-1")), Some(-1));
        assert_eq!(as_i64(&yaml("\"-3\"")), Some(-3));
        assert_eq!(as_i64(&yaml("2.0")), Some(2));
    }

    #[test]
    fn test_as_f64_forms() {
        assert_eq!(as_f64(&yaml("1.5")), Some(1.5));
        assert_eq!(as_f64(&yaml("\"1.5\"")), Some(1.5));
        assert_eq!(as_f64(&yaml("[]")), None);
    }
}
