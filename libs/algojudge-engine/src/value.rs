//! JavaScript value semantics over `serde_json::Value`.
//!
//! Submitted solutions run in a JavaScript runtime, so every place where the
//! engine coerces text to numbers or prints values back must agree with what
//! `Number(text)`, `String(value)` and `JSON.stringify(value)` would produce
//! on the other side of the process boundary.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Number, Value};

/// Largest integer a JavaScript number represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

lazy_static! {
    static ref DECIMAL_LITERAL: Regex =
        Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("decimal literal pattern");
}

/// Coerces text the way `Number(text)` does, returning `None` for anything
/// that is not a finite number.
pub fn to_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix_literal = |prefix_lower: &str, radix: u32| {
        let lower = trimmed.get(..2)?.to_ascii_lowercase();
        if lower != prefix_lower || trimmed.len() == 2 {
            return None;
        }
        trimmed[2..].chars().try_fold(0f64, |acc, ch| {
            ch.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
        })
    };

    let value = if let Some(v) = radix_literal("0x", 16) {
        v
    } else if let Some(v) = radix_literal("0o", 8) {
        v
    } else if let Some(v) = radix_literal("0b", 2) {
        v
    } else if DECIMAL_LITERAL.is_match(trimmed) {
        trimmed.parse::<f64>().ok()?
    } else {
        return None;
    };

    value.is_finite().then_some(value)
}

/// Wraps a finite number as a JSON value, preferring the integer form so it
/// serializes the way JavaScript prints it.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// `String(n)` for a JavaScript number.
pub fn number_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        };
    }
    format!("{}", n)
}

fn json_number_string(n: &Number) -> String {
    if n.is_f64() {
        n.as_f64().map(number_string).unwrap_or_else(|| "null".to_string())
    } else {
        n.to_string()
    }
}

/// `JSON.stringify(value)` without indentation.
pub fn stringify(value: &Value) -> String {
    let mut out = String::new();
    write_json(value, &mut out);
    out
}

fn write_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&json_number_string(n)),
        Value::String(_) => out.push_str(&value.to_string()),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (idx, (key, item)) in map.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_json(item, out);
            }
            out.push('}');
        }
    }
}

/// `String(value)`: arrays join their elements with commas, plain objects
/// collapse to `[object Object]`.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => json_number_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
