/// Output Judge - Decides Whether One Invocation Passed
///
/// **Core Responsibility:**
/// Compare what the sandbox returned against a test case's expected text.
///
/// **Critical Properties:**
/// - Knows nothing about processes or runtimes
/// - Pure function: (run output, expected text) → pass/fail
///
/// **Normalization Rules:**
/// - Trim, then remove ALL whitespace
/// - Single quotes compare equal to double quotes
/// - Case sensitive
///
/// **Mutation Judge:**
/// Some exercises are graded on a returned count `k` plus the first `k`
/// slots of an argument the callable rewrote in place. Expected text of the
/// form `2, nums = [2,2,_,_]` (underscores are "don't care") triggers it when
/// the plain comparison fails.
use algojudge_common::types::{MutationOrder, TestCase, TestResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::engine::RunOutput;
use crate::input::ParsedInput;
use crate::value;

lazy_static! {
    static ref MUTATION_EXPECTATION: Regex =
        Regex::new(r"^(\d+),\s*(\w+)\s*=\s*(.*)$").expect("mutation expectation pattern");
}

/// Function-name fragment that selects unordered comparison when a test
/// case does not say which order it wants.
const UNORDERED_NAME_HINT: &str = "removeelement";

/// Renders a returned value the way it is shown and compared.
pub fn format_output(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value::stringify(value),
        other => value::display(other),
    }
}

/// Rendered form of one invocation's result. Values with no JSON form come
/// back from the runtime already rendered.
pub fn format_result(output: &RunOutput) -> String {
    match &output.display {
        Some(display) => display.clone(),
        None => format_output(&output.result),
    }
}

pub fn normalize(output: &str) -> String {
    output
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '"' } else { c })
        .collect()
}

pub fn compare_outputs(actual: &str, expected: &str) -> bool {
    normalize(actual) == normalize(expected)
}

/// Parsed form of `<k>, <name> = <array>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationExpectation {
    pub k: u64,
    pub var_name: String,
    pub expected: Vec<Value>,
}

pub fn parse_mutation_expectation(expected: &str) -> Option<MutationExpectation> {
    let caps = MUTATION_EXPECTATION.captures(expected)?;
    let k = caps[1].parse().ok()?;
    let array_text = caps[3].replace('_', "null");

    let parsed: Value = serde_json::from_str(&array_text)
        .or_else(|_| serde_json::from_str(&array_text.replace('\'', "\"")))
        .ok()?;

    match parsed {
        Value::Array(expected) => Some(MutationExpectation {
            k,
            var_name: caps[2].to_string(),
            expected,
        }),
        _ => None,
    }
}

/// Explicit judge mode wins; otherwise fall back to the function name.
pub fn resolve_order(func_name: &str, judge: Option<MutationOrder>) -> MutationOrder {
    judge.unwrap_or_else(|| {
        if func_name.to_lowercase().contains(UNORDERED_NAME_HINT) {
            MutationOrder::Unordered
        } else {
            MutationOrder::Ordered
        }
    })
}

fn sort_for_comparison(items: &mut [Value]) {
    items.sort_by(|a, b| {
        value::display(a)
            .cmp(&value::display(b))
            .then_with(|| value::stringify(a).cmp(&value::stringify(b)))
    });
}

pub fn mutation_judge(
    actual: &Value,
    expectation: &MutationExpectation,
    args: &ParsedInput,
    order: MutationOrder,
) -> bool {
    let returned_k = match value::as_f64(actual) {
        Some(n) if n == expectation.k as f64 => expectation.k as usize,
        _ => return false,
    };
    let Some(Value::Array(mutated)) = args.get(&expectation.var_name) else {
        return false;
    };

    let mut actual_prefix: Vec<Value> = mutated.iter().take(returned_k).cloned().collect();
    let mut expected_prefix: Vec<Value> =
        expectation.expected.iter().take(returned_k).cloned().collect();

    if order == MutationOrder::Unordered {
        sort_for_comparison(&mut actual_prefix);
        sort_for_comparison(&mut expected_prefix);
    }

    value::stringify(&Value::Array(actual_prefix))
        == value::stringify(&Value::Array(expected_prefix))
}

/// Full verdict for one invocation: plain comparison first, the mutation
/// judge only when that fails.
pub fn judge(
    actual: &Value,
    expected: &str,
    args: &ParsedInput,
    func_name: &str,
    judge_mode: Option<MutationOrder>,
) -> bool {
    verdict(&format_output(actual), actual, expected, args, func_name, judge_mode)
}

fn verdict(
    rendered: &str,
    actual: &Value,
    expected: &str,
    args: &ParsedInput,
    func_name: &str,
    judge_mode: Option<MutationOrder>,
) -> bool {
    if compare_outputs(rendered, expected) {
        return true;
    }

    match parse_mutation_expectation(expected) {
        Some(expectation) => {
            mutation_judge(actual, &expectation, args, resolve_order(func_name, judge_mode))
        }
        None => false,
    }
}

pub fn evaluate_test(output: &RunOutput, test_case: &TestCase) -> TestResult {
    let actual = format_result(output);
    let passed = verdict(
        &actual,
        &output.result,
        &test_case.output,
        &output.args,
        &output.func_name,
        test_case.judge,
    );

    TestResult {
        passed,
        input: test_case.input.clone(),
        expected: test_case.output.clone(),
        actual,
        error: None,
    }
}
