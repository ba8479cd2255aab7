// Prometheus metrics for grading runs
use algojudge_common::types::ExecutionResult;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Encoder, Histogram,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    pub static ref RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "algojudge_runs_total",
        "Grading runs by outcome",
        &["outcome"]
    )
    .expect("register algojudge_runs_total");
    pub static ref TEST_CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "algojudge_test_cases_total",
        "Graded test cases by status",
        &["status"]
    )
    .expect("register algojudge_test_cases_total");
    pub static ref RUN_DURATION: Histogram = register_histogram!(
        "algojudge_run_duration_seconds",
        "Wall-clock duration of a grading run",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("register algojudge_run_duration_seconds");
    pub static ref RUNS_IN_FLIGHT: IntGauge =
        register_int_gauge!("algojudge_runs_in_flight", "Grading runs currently executing")
            .expect("register algojudge_runs_in_flight");
}

/// Registers every metric up front so a scrape before the first run still
/// lists them.
pub fn register() {
    lazy_static::initialize(&RUNS_TOTAL);
    lazy_static::initialize(&TEST_CASES_TOTAL);
    lazy_static::initialize(&RUN_DURATION);
    lazy_static::initialize(&RUNS_IN_FLIGHT);
}

/// Label for a finished run.
pub fn outcome(result: &ExecutionResult) -> &'static str {
    match (result.success, result.passed) {
        (true, Some(true)) => "passed",
        (true, _) => "failed",
        (false, _) if result
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Cancelled")) =>
        {
            "cancelled"
        }
        (false, _) => "compile_error",
    }
}

pub fn record_run(result: &ExecutionResult, elapsed: Duration) {
    RUNS_TOTAL.with_label_values(&[outcome(result)]).inc();
    RUN_DURATION.observe(elapsed.as_secs_f64());

    for test in result.results.iter().flatten() {
        let status = match (test.passed, test.error.is_some()) {
            (true, _) => "passed",
            (false, true) => "error",
            (false, false) => "failed",
        };
        TEST_CASES_TOTAL.with_label_values(&[status]).inc();
    }
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
