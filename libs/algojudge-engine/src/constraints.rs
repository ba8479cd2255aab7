//! Constraint extraction and validation.
//!
//! Exercises state their limits in prose, e.g. `2 <= nums.length <= 10^4` or
//! `-10^9 <= nums[i] <= 10^9`. Only `<=` comparison chains are understood;
//! anything else is ignored rather than rejected.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;

use crate::input::{parse_input, ParsedInput};
use crate::value;

const VAR: &str = r"[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)?(?:\[[A-Za-z0-9_]+\])?";

lazy_static! {
    static ref POWER_OF_TEN: Regex = Regex::new(r"10\^(\d+)").expect("power pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace pattern");
    static ref RANGE: Regex =
        Regex::new(&format!(r"(-?\d+)\s*<=\s*({VAR})\s*<=\s*(-?\d+)")).expect("range pattern");
    static ref LOWER_BOUND: Regex =
        Regex::new(&format!(r"(-?\d+)\s*<=\s*({VAR})")).expect("lower bound pattern");
    static ref UPPER_BOUND: Regex =
        Regex::new(&format!(r"({VAR})\s*<=\s*(-?\d+)")).expect("upper bound pattern");
    static ref ELEMENT_RANGE: Regex =
        Regex::new(r"(-?\d+)\s*<=\s*([A-Za-z0-9_]+)\[[ij]\]\s*<=\s*(-?\d+)")
            .expect("element range pattern");
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintRule {
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Rewrites every `10^k` into its decimal form.
pub fn expand_powers(constraint: &str) -> String {
    POWER_OF_TEN
        .replace_all(constraint, |caps: &Captures| power_of_ten(&caps[1]))
        .into_owned()
}

fn power_of_ten(exponent: &str) -> String {
    match exponent.parse::<usize>() {
        // Past 1e21 JavaScript switches to exponent notation, which the
        // bound patterns then only partially match. Mirror that.
        Ok(k) if k < 21 => format!("1{}", "0".repeat(k)),
        Ok(k) => format!("1e+{}", k),
        Err(_) => "Infinity".to_string(),
    }
}

fn bound(text: &str) -> f64 {
    text.parse::<f64>().unwrap_or(f64::NAN)
}

/// Extracts a range rule from one constraint, trying the double bound first,
/// then a lone lower bound, then a lone upper bound.
pub fn parse_constraint(constraint: &str) -> Option<ConstraintRule> {
    let expanded = expand_powers(constraint);
    let normalized = WHITESPACE.replace_all(&expanded, " ");
    let normalized = normalized.trim();

    if let Some(caps) = RANGE.captures(normalized) {
        return Some(ConstraintRule {
            variable: caps[2].to_string(),
            min: Some(bound(&caps[1])),
            max: Some(bound(&caps[3])),
        });
    }

    if let Some(caps) = LOWER_BOUND.captures(normalized) {
        return Some(ConstraintRule {
            variable: caps[2].to_string(),
            min: Some(bound(&caps[1])),
            max: None,
        });
    }

    UPPER_BOUND.captures(normalized).map(|caps| ConstraintRule {
        variable: caps[1].to_string(),
        min: None,
        max: Some(bound(&caps[2])),
    })
}

fn is_element_constraint(text: &str) -> bool {
    text.contains("[i]") || text.contains("[j]")
}

/// Property access the way JavaScript would resolve `a.b.c`.
fn property<'a>(value: &'a Value, key: &str) -> Option<Resolved<'a>> {
    match value {
        Value::Object(map) => map.get(key).map(Resolved::Value),
        Value::Array(items) if key == "length" => Some(Resolved::Length(items.len())),
        Value::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx))
            .map(Resolved::Value),
        Value::String(s) if key == "length" => Some(Resolved::Length(s.encode_utf16().count())),
        _ => None,
    }
}

enum Resolved<'a> {
    Value(&'a Value),
    Length(usize),
}

/// Resolves a constraint variable to a number. Dotted paths walk nested
/// values, a bare array resolves to its length, and element forms such as
/// `nums[i]` or anything unresolvable give `None`.
pub fn get_variable_value(input: &ParsedInput, variable: &str) -> Option<f64> {
    if is_element_constraint(variable) {
        return None;
    }

    let mut parts = variable.split('.');
    let mut current = Resolved::Value(input.get(parts.next()?)?);

    for part in parts {
        current = match current {
            Resolved::Value(inner) => property(inner, part)?,
            // a length is a plain number with no properties of its own
            Resolved::Length(_) => return None,
        };
    }

    match current {
        Resolved::Length(len) => Some(len as f64),
        Resolved::Value(Value::Array(items)) => Some(items.len() as f64),
        Resolved::Value(number @ Value::Number(_)) => value::as_f64(number),
        Resolved::Value(_) => None,
    }
}

/// Checks every element of the named array against `min <= arr[i] <= max`,
/// reporting the first element out of range.
pub fn validate_array_elements(input: &ParsedInput, constraint: &str) -> Option<String> {
    let expanded = expand_powers(constraint);
    let caps = ELEMENT_RANGE.captures(&expanded)?;

    let min = bound(&caps[1]);
    let max = bound(&caps[3]);
    let array_name = &caps[2];
    let items = input.get(array_name)?.as_array()?;

    items.iter().enumerate().find_map(|(idx, item)| {
        let n = item.as_f64()?;
        (n < min || n > max).then(|| {
            format!(
                "Element {}[{}] = {} violates constraint: {}",
                array_name,
                idx,
                value::number_string(n),
                constraint
            )
        })
    })
}

/// Validates a raw test-case input against the exercise constraints.
///
/// Fails only when the input cannot be parsed at all or a resolvable rule is
/// violated; constraints that do not apply to this input are skipped.
pub fn validate(input_text: &str, constraints: &[String]) -> ValidationResult {
    let input = parse_input(input_text);

    if input.is_empty() {
        return ValidationResult {
            valid: false,
            errors: vec!["Could not parse input".to_string()],
        };
    }

    let mut errors = Vec::new();

    for constraint in constraints {
        if !constraint.contains("<=") && !constraint.contains(">=") {
            continue;
        }

        if is_element_constraint(constraint) {
            if let Some(err) = validate_array_elements(&input, constraint) {
                errors.push(err);
            }
            continue;
        }

        let Some(rule) = parse_constraint(constraint) else {
            continue;
        };
        let Some(actual) = get_variable_value(&input, &rule.variable) else {
            continue;
        };

        if let Some(min) = rule.min.filter(|min| actual < *min) {
            errors.push(format!(
                "{} = {} violates constraint: {} (minimum is {})",
                rule.variable,
                value::number_string(actual),
                constraint,
                value::number_string(min)
            ));
        }

        if let Some(max) = rule.max.filter(|max| actual > *max) {
            errors.push(format!(
                "{} = {} violates constraint: {} (maximum is {})",
                rule.variable,
                value::number_string(actual),
                constraint,
                value::number_string(max)
            ));
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}
