use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the mutation judge compares the first `k` slots of an in-place array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOrder {
    /// Slots must appear in exactly the expected order (e.g. removeDuplicates).
    Ordered,
    /// Slots may appear in any order (e.g. removeElement).
    Unordered,
}

/// One test case as authored by the exercise.
///
/// `input` is a list of `name = value` assignments. `output` is the literal
/// expected value, empty when it should be computed from the reference
/// solution, or a mutation pattern such as `2, nums = [2,2,_,_]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge: Option<MutationOrder>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            judge: None,
        }
    }

    /// A blank expected output asks for enrichment from the reference solution.
    pub fn needs_expected(&self) -> bool {
        self.output.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub expected: String,
    pub actual: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    pub fn failure(input: &str, expected: &str, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            input: input.to_string(),
            expected: expected.to_string(),
            actual: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Outcome of one grading invocation.
///
/// `success == false` means the pipeline itself did not complete (compilation
/// failure or cancellation). `success == true` with `passed == Some(false)`
/// means the tests ran and at least one failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TestResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn all_passed(&self) -> bool {
        self.success && self.passed == Some(true)
    }
}

fn default_language() -> String {
    "javascript".to_string()
}

/// A grading request as submitted by the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    /// Caller-chosen id; lets a client cancel the run while it is in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    pub code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_code: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Wall-clock limit per invocation; falls back to the runtime default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl GradeRequest {
    pub fn new(code: impl Into<String>, test_cases: Vec<TestCase>) -> Self {
        Self {
            run_id: None,
            code: code.into(),
            test_cases,
            language: default_language(),
            reference_code: None,
            constraints: Vec::new(),
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_request_defaults() {
        let request: GradeRequest = serde_json::from_str(
            r#"{"code":"function f(){}","testCases":[{"input":"x = 1"}]}"#,
        )
        .unwrap();

        assert_eq!(request.language, "javascript");
        assert!(request.reference_code.is_none());
        assert!(request.constraints.is_empty());
        assert_eq!(request.test_cases[0].output, "");
        assert!(request.test_cases[0].needs_expected());
    }

    #[test]
    fn test_judge_mode_wire_format() {
        let tc: TestCase = serde_json::from_str(
            r#"{"input":"nums = [3,2,2,3], val = 3","output":"2, nums = [2,2,_,_]","judge":"unordered"}"#,
        )
        .unwrap();
        assert_eq!(tc.judge, Some(MutationOrder::Unordered));
        assert!(!tc.needs_expected());
    }

    #[test]
    fn test_execution_result_skips_empty_fields() {
        let result = ExecutionResult {
            success: false,
            passed: None,
            results: None,
            logs: Some(String::new()),
            error: Some("Compilation Error: boom".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("passed").is_none());
        assert!(json.get("results").is_none());
        assert_eq!(json["error"], "Compilation Error: boom");
        assert!(!result.all_passed());
    }

    #[test]
    fn test_failure_result_has_no_actual() {
        let result = TestResult::failure("x = 1", "1", "Execution error: boom");
        assert!(!result.passed);
        assert_eq!(result.actual, "");
        assert_eq!(result.error.as_deref(), Some("Execution error: boom"));
    }
}
