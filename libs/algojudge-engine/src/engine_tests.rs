/// End-to-end tests against a real Node.js runtime
///
/// These tests verify that the process-isolated execution path works:
/// 1. Function and class-method entry points are invoked with bound arguments
/// 2. In-place mutations are visible to the judge
/// 3. Runtime errors and timeouts fail only their own test case
/// 4. No state leaks between invocations
/// 5. Cancellation stops a run that is stuck inside user code
///
/// Each test returns early when `node` is not on PATH.

#[cfg(test)]
mod node_sandbox_tests {
    use crate::config::{LanguageConfigManager, RuntimeConfig};
    use crate::context::RunContext;
    use crate::engine::{NodeSandbox, Sandbox};
    use crate::error::ExecutionError;
    use crate::executor::Grader;
    use algojudge_common::types::{GradeRequest, TestCase};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    async fn node_available() -> bool {
        NodeSandbox::new(&RuntimeConfig::default()).probe().await.is_ok()
    }

    macro_rules! require_node {
        () => {
            if !node_available().await {
                eprintln!("skipping: node not found on PATH");
                return;
            }
        };
    }

    fn grader() -> Grader {
        Grader::from_config(Arc::new(LanguageConfigManager::builtin()))
    }

    fn context() -> RunContext {
        RunContext::new(Uuid::new_v4(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_two_sum_function() {
        require_node!();

        let code = r#"
            function twoSum(nums, target) {
                const seen = new Map();
                for (let i = 0; i < nums.length; i++) {
                    if (seen.has(target - nums[i])) return [seen.get(target - nums[i]), i];
                    seen.set(nums[i], i);
                }
                return [];
            }
        "#;
        let cases = vec![
            TestCase::new("nums = [2,7,11,15], target = 9", "[0,1]"),
            TestCase::new("nums = [3,2,4], target = 6", "[1, 2]"),
            TestCase::new("nums = [3,3], target = 6", "[0,0]"),
        ];

        let result = grader()
            .execute(&mut context(), code, &cases, "javascript", None, &[])
            .await;

        assert!(result.success);
        let results = result.results.unwrap();
        assert!(results[0].passed);
        assert_eq!(results[0].actual, "[0,1]");
        assert!(results[1].passed);
        assert!(!results[2].passed);
        assert_eq!(results[2].actual, "[0,1]");
    }

    #[tokio::test]
    async fn test_class_solution_and_console_capture() {
        require_node!();

        let code = r#"
            class Solution {
                constructor() { this.calls = 0; }
                climbStairs(n) {
                    console.log("n is", n, { n });
                    let [a, b] = [1, 1];
                    for (let i = 1; i < n; i++) [a, b] = [b, a + b];
                    return b;
                }
            }
        "#;
        let cases = vec![TestCase::new("n = 5", "8")];

        let result = grader()
            .execute(&mut context(), code, &cases, "js", None, &[])
            .await;

        assert_eq!(result.passed, Some(true));
        assert!(result.logs.unwrap().contains(r#"n is 5 {"n":5}"#));
    }

    #[tokio::test]
    async fn test_in_place_mutation_reaches_the_judge() {
        require_node!();

        let code = r#"
            var removeElement = function (nums, val) {
                let k = 0;
                for (const n of nums) if (n !== val) nums[k++] = n;
                return k;
            };
        "#;
        let cases = vec![
            TestCase::new("nums = [3,2,2,3], val = 3", "2, nums = [2,2,_,_]"),
            TestCase::new("nums = [0,1,2,2,3,0,4,2], val = 2", "5, nums = [0,1,4,0,3,_,_,_]"),
        ];

        let result = grader()
            .execute(&mut context(), code, &cases, "javascript", None, &[])
            .await;

        assert_eq!(result.passed, Some(true), "{:?}", result.results);
    }

    #[tokio::test]
    async fn test_sandbox_returns_post_call_arguments() {
        require_node!();

        let sandbox = NodeSandbox::new(&RuntimeConfig::default());
        let output = sandbox
            .run_code(
                "function fill(grid, v) { grid[0][0] = v; grid.push([v]); }",
                "grid = [[0,0],[0,0]], v = 7",
                &mut context(),
            )
            .await
            .unwrap();

        assert_eq!(output.result, json!(null));
        assert_eq!(output.func_name, "fill");
        assert_eq!(output.args.get("grid"), Some(&json!([[7, 0], [0, 0], [7]])));
        assert_eq!(output.args.get("v"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_non_json_results_keep_their_string_form() {
        require_node!();

        let sandbox = NodeSandbox::new(&RuntimeConfig::default());
        let output = sandbox
            .run_code("function f(a) { return 0 / 0; }", "a = 1", &mut context())
            .await
            .unwrap();
        assert_eq!(output.result, json!(null));
        assert_eq!(output.display.as_deref(), Some("NaN"));

        let cases = vec![TestCase::new("a = 1", "Infinity")];
        let result = grader()
            .execute(&mut context(), "function f(a) { return Infinity; }", &cases, "js", None, &[])
            .await;
        let results = result.results.unwrap();
        assert!(results[0].passed, "{:?}", results[0]);
        assert_eq!(results[0].actual, "Infinity");

        let cases = vec![TestCase::new("n = 10", "10")];
        let result = grader()
            .execute(&mut context(), "function big(n) { return BigInt(n); }", &cases, "js", None, &[])
            .await;
        let results = result.results.unwrap();
        assert!(results[0].passed, "{:?}", results[0]);
        assert_eq!(results[0].error, None);
    }

    #[tokio::test]
    async fn test_runtime_error_is_per_test() {
        require_node!();

        let code = r#"
            function check(n) {
                if (n === 0) throw new Error("n must not be zero");
                return 10 / n;
            }
        "#;
        let cases = vec![
            TestCase::new("n = 0", "0"),
            TestCase::new("n = 4", "2.5"),
        ];

        let result = grader()
            .execute(&mut context(), code, &cases, "javascript", None, &[])
            .await;

        let results = result.results.unwrap();
        assert_eq!(
            results[0].error.as_deref(),
            Some("Execution error: n must not be zero")
        );
        assert!(results[1].passed);
    }

    #[tokio::test]
    async fn test_syntax_error_surfaces_as_execution_error() {
        require_node!();

        let sandbox = NodeSandbox::new(&RuntimeConfig::default());
        let err = sandbox
            .run_code("function broken(a) { return a +; }", "a = 1", &mut context())
            .await
            .unwrap_err();

        match err {
            ExecutionError::Runtime(message) => assert!(message.contains("Unexpected token")),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_runaway_code() {
        require_node!();

        let code = r#"
            function spin(n) {
                if (n === 1) { while (true) {} }
                return n;
            }
        "#;
        let cases = vec![TestCase::new("n = 1", "1"), TestCase::new("n = 2", "2")];
        let mut ctx = context().with_timeout_ms(Some(500));

        let start = Instant::now();
        let result = grader()
            .execute(&mut ctx, code, &cases, "javascript", None, &[])
            .await;

        assert!(start.elapsed() < Duration::from_secs(5));
        let results = result.results.unwrap();
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("Time Limit Exceeded"));
        assert!(results[1].passed);
    }

    #[tokio::test]
    async fn test_no_state_leaks_between_tests() {
        require_node!();

        let code = r#"
            let counter = 0;
            globalThis.seen = (globalThis.seen || 0) + 1;
            function tick(x) { counter += 1; return counter * 10 + globalThis.seen; }
        "#;
        let cases = vec![TestCase::new("x = 1", "11"), TestCase::new("x = 2", "11")];

        let result = grader()
            .execute(&mut context(), code, &cases, "javascript", None, &[])
            .await;

        assert_eq!(result.passed, Some(true), "{:?}", result.results);
    }

    #[tokio::test]
    async fn test_reference_enrichment() {
        require_node!();

        let reference = "function maxOf(nums) { return Math.max(...nums); }";
        let candidate = "const maxOf = (nums) => nums.reduce((a, b) => (a > b ? a : b));";
        let cases = vec![
            TestCase::new("nums = [3,9,2]", ""),
            TestCase::new("nums = [-1,-5]", ""),
        ];

        let result = grader()
            .execute(&mut context(), candidate, &cases, "javascript", Some(reference), &[])
            .await;

        let results = result.results.unwrap();
        assert_eq!(results[0].expected, "9");
        assert_eq!(results[1].expected, "-1");
        assert_eq!(result.passed, Some(true));
    }

    #[tokio::test]
    async fn test_cancel_stops_a_stuck_run() {
        require_node!();

        let grader = grader();
        let cancel = CancellationToken::new();
        let mut request = GradeRequest::new(
            "function hang() { while (true) {} }",
            vec![TestCase::new("x = 1", "1"), TestCase::new("x = 2", "2")],
        );
        request.timeout_ms = Some(30_000);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = grader.grade(&request, cancel).await;

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Cancelled"));
        assert_eq!(result.results.unwrap().len(), 0);
    }
}
