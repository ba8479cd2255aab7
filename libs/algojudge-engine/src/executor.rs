/// Grading Orchestrator - High-Level Run Coordination
///
/// **Responsibility:**
/// Drive one submission through every phase and assemble the final
/// `ExecutionResult`.
///
/// **Sequence:**
/// 1. Reset the run's log buffer
/// 2. Transpile (failure aborts with `success: false`)
/// 3. Constraint gate for test cases awaiting a computed expected value
/// 4. Enrichment of blank expected values from the reference solution
/// 5. Per-test execution and judging, errors caught per test case
/// 6. Aggregate: `passed` only if every test case passed
///
/// This module is the glue layer. It knows nothing about:
/// - How code executes (the sandbox's job)
/// - How outputs are compared (the evaluator's job)
///
/// Cancellation is checked between test cases and raced inside every
/// sandbox invocation; a cancelled run returns the results gathered so far.
use algojudge_common::types::{ExecutionResult, GradeRequest, TestCase, TestResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LanguageConfigManager;
use crate::constraints;
use crate::context::{RunContext, DEFAULT_MAX_LOG_BYTES};
use crate::engine::{NodeSandbox, Sandbox};
use crate::error::ExecutionError;
use crate::evaluator;
use crate::transpiler::{ConfiguredTranspiler, Transpiler};

const BANNER_WIDTH: usize = 40;

#[derive(Clone)]
pub struct Grader {
    transpiler: Arc<dyn Transpiler>,
    sandbox: Arc<dyn Sandbox>,
    max_log_bytes: usize,
}

impl Grader {
    pub fn new(transpiler: Arc<dyn Transpiler>, sandbox: Arc<dyn Sandbox>) -> Self {
        Self {
            transpiler,
            sandbox,
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
        }
    }

    /// Production wiring: configured transpilers and a Node.js sandbox.
    pub fn from_config(languages: Arc<LanguageConfigManager>) -> Self {
        let sandbox = NodeSandbox::new(languages.runtime());
        let max_log_bytes = languages.runtime().max_log_bytes;
        Self::new(Arc::new(ConfiguredTranspiler::new(languages)), Arc::new(sandbox))
            .with_max_log_bytes(max_log_bytes)
    }

    pub fn with_max_log_bytes(mut self, max_log_bytes: usize) -> Self {
        self.max_log_bytes = max_log_bytes;
        self
    }

    /// Context for one run of `request`.
    pub fn context_for(&self, request: &GradeRequest, cancel: CancellationToken) -> RunContext {
        RunContext::new(request.run_id.unwrap_or_else(Uuid::new_v4), cancel)
            .with_max_log_bytes(self.max_log_bytes)
            .with_timeout_ms(request.timeout_ms)
    }

    pub async fn grade(
        &self,
        request: &GradeRequest,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let mut ctx = self.context_for(request, cancel);
        self.execute(
            &mut ctx,
            &request.code,
            &request.test_cases,
            &request.language,
            request.reference_code.as_deref(),
            &request.constraints,
        )
        .await
    }

    #[tracing::instrument(
        skip_all,
        fields(run_id = %ctx.run_id, language = %language, test_count = test_cases.len())
    )]
    pub async fn execute(
        &self,
        ctx: &mut RunContext,
        code: &str,
        test_cases: &[TestCase],
        language: &str,
        reference_code: Option<&str>,
        constraints: &[String],
    ) -> ExecutionResult {
        ctx.reset();
        info!("Starting grading run");

        // Step 1: Transpile
        let executable = match self.transpiler.transpile(code, language, &ctx.cancel).await {
            Ok(executable) => executable,
            Err(_) if ctx.is_cancelled() => return cancelled(ctx, Vec::new(), test_cases.len()),
            Err(e) => {
                warn!(error = %e, "Compilation failed; no test cases run");
                return ExecutionResult {
                    success: false,
                    passed: None,
                    results: None,
                    logs: Some(String::new()),
                    error: Some(format!("Compilation Error: {}", e)),
                };
            }
        };

        // Step 2: Constraint gate
        if let Some(violation) = constraint_violation(test_cases, constraints) {
            info!("Test input violates problem constraints");
            return ExecutionResult {
                success: true,
                passed: Some(false),
                results: Some(vec![violation]),
                logs: Some(String::new()),
                error: None,
            };
        }

        // Step 3: Enrichment
        let Some(test_cases) = self.enrich(ctx, test_cases, reference_code).await else {
            return cancelled(ctx, Vec::new(), test_cases.len());
        };

        // Step 4: Per-test execution
        let mut results = Vec::with_capacity(test_cases.len());
        for (idx, tc) in test_cases.iter().enumerate() {
            if ctx.is_cancelled() {
                return cancelled(ctx, results, test_cases.len());
            }

            ctx.log(format!("\n{}", "=".repeat(BANNER_WIDTH)));
            ctx.log(format!(" TEST CASE {}", idx + 1));
            ctx.log("=".repeat(BANNER_WIDTH));
            ctx.log(format!("Input: {}", tc.input));

            match self.sandbox.run_code(&executable, &tc.input, ctx).await {
                Ok(output) => {
                    let result = evaluator::evaluate_test(&output, tc);
                    ctx.log(format!("Actual: {}", result.actual));
                    ctx.log(format!("Expected: {}", result.expected));
                    ctx.log(format!("Result: {}", if result.passed { "PASSED" } else { "FAILED" }));
                    ctx.log("\n");
                    results.push(result);
                }
                Err(ExecutionError::Cancelled) => return cancelled(ctx, results, test_cases.len()),
                Err(e) => {
                    warn!(test = idx + 1, error = %e, "Test case failed with an execution error");
                    ctx.log(format!("Error: {}", e));
                    ctx.log("Result: FAILED");
                    ctx.log("\n");
                    results.push(TestResult::failure(&tc.input, &tc.output, e.to_string()));
                }
            }
        }

        // Step 5: Aggregate
        let passed = results.iter().all(|r| r.passed);
        info!(
            passed,
            passed_count = results.iter().filter(|r| r.passed).count(),
            "Grading run complete"
        );

        ExecutionResult {
            success: true,
            passed: Some(passed),
            results: Some(results),
            logs: Some(ctx.render_logs()),
            error: None,
        }
    }

    /// Fills blank expected outputs from the reference solution. A failing
    /// reference yields a sentinel expected value. `None` means the run was
    /// cancelled.
    async fn enrich(
        &self,
        ctx: &mut RunContext,
        test_cases: &[TestCase],
        reference_code: Option<&str>,
    ) -> Option<Vec<TestCase>> {
        let Some(reference) = reference_code else {
            return Some(test_cases.to_vec());
        };

        let mut enriched = Vec::with_capacity(test_cases.len());
        for tc in test_cases {
            if !tc.needs_expected() {
                enriched.push(tc.clone());
                continue;
            }
            if ctx.is_cancelled() {
                return None;
            }

            let output = match self.sandbox.run_code(reference, &tc.input, ctx).await {
                Ok(run) => evaluator::format_result(&run),
                Err(ExecutionError::Cancelled) => return None,
                Err(e) => {
                    warn!(error = %e, "Reference solution failed");
                    format!("[Reference Error: {}]", e)
                }
            };
            enriched.push(TestCase {
                output,
                ..tc.clone()
            });
        }
        Some(enriched)
    }
}

/// First test case awaiting a computed expected value whose input breaks
/// the declared constraints, rendered as the run's only result.
fn constraint_violation(test_cases: &[TestCase], rules: &[String]) -> Option<TestResult> {
    if rules.is_empty() {
        return None;
    }
    test_cases
        .iter()
        .filter(|tc| tc.needs_expected())
        .find_map(|tc| {
            let validation = constraints::validate(&tc.input, rules);
            (!validation.valid).then(|| TestResult {
                passed: false,
                input: tc.input.clone(),
                expected: String::new(),
                actual: String::new(),
                error: Some(format!(
                    "Input violates problem constraints:\n\n{}",
                    validation.errors.join("\n")
                )),
            })
        })
}

fn cancelled(ctx: &RunContext, results: Vec<TestResult>, total: usize) -> ExecutionResult {
    warn!(completed = results.len(), total, "Grading run cancelled");
    ExecutionResult {
        success: false,
        passed: None,
        error: Some(format!(
            "Cancelled: completed {} of {} test cases",
            results.len(),
            total
        )),
        results: Some(results),
        logs: Some(ctx.render_logs()),
    }
}
