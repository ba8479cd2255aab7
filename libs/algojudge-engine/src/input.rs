//! Test-case input parsing.
//!
//! An input such as `nums = [2,7,11,15], target = 9` becomes an ordered
//! mapping of variable name to value. Order is significant: it is the
//! positional argument order handed to the submitted callable.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value;

lazy_static! {
    static ref ASSIGNMENT: Regex =
        Regex::new(r"^([A-Za-z0-9_]+)\s*=\s*(.+)$").expect("assignment pattern");
}

/// Variables parsed from one test-case input, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedInput(Map<String, Value>);

impl ParsedInput {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Re-binds positional values to `names`; used to read arguments back
    /// after the callable has had a chance to mutate them.
    pub fn from_parts<'a, I>(names: I, values: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut map = Map::new();
        for (name, value) in names.into_iter().zip(values) {
            map.insert(name.clone(), value);
        }
        Self(map)
    }

    /// Inserting an existing name replaces its value but keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Positional arguments in declaration order.
    pub fn args(&self) -> Vec<Value> {
        self.0.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Parses a test-case input. Never fails: text that yields no assignments
/// comes back as an empty mapping, which callers treat as unparseable.
pub fn parse_input(text: &str) -> ParsedInput {
    let mut parsed = ParsedInput::new();

    for assignment in split_assignments(text) {
        if let Some(caps) = ASSIGNMENT.captures(assignment.trim()) {
            parsed.insert(caps[1].trim(), parse_value(&caps[2]));
        }
    }

    parsed
}

/// Splits on commas that sit outside brackets and quoted literals.
pub fn split_assignments(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i64 = 0;
    let mut in_quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        match in_quote {
            Some(quote) => {
                if ch == quote && prev != Some('\\') {
                    in_quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => in_quote = Some(ch),
                '[' | '{' | '(' => depth += 1,
                ']' | '}' | ')' => depth -= 1,
                _ => {}
            },
        }

        if ch == ',' && depth == 0 && in_quote.is_none() {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
        prev = Some(ch);
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Coerces one literal. Rules are tried in order: JSON array, quoted
/// string, number, boolean/null keywords, and finally the raw text.
pub fn parse_value(text: &str) -> Value {
    let trimmed = text.trim();

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()));
    }

    if let Some(inner) = unquote(trimmed) {
        return Value::String(inner.to_string());
    }

    if let Some(n) = value::to_number(trimmed) {
        return value::number_value(n);
    }

    match trimmed {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        "null" | "None" => Value::Null,
        _ => Value::String(trimmed.to_string()),
    }
}

fn unquote(text: &str) -> Option<&str> {
    let quote = match text.chars().next()? {
        q @ ('"' | '\'') => q,
        _ => return None,
    };
    if !text.ends_with(quote) {
        return None;
    }
    // A lone quote character is both the opening and closing quote.
    Some(text.get(1..text.len() - 1).unwrap_or(""))
}
