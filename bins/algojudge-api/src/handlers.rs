// HTTP route handlers for the AlgoJudge API

use algojudge_common::types::GradeRequest;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub run_id: Uuid,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub version: String,
    pub transpiled: bool,
}

/// Keeps a run's cancellation handle registered for as long as the grade
/// request is alive, including when the client disconnects mid-run.
struct RunRegistration {
    state: Arc<AppState>,
    run_id: Uuid,
}

impl RunRegistration {
    fn register(state: &Arc<AppState>, run_id: Uuid, cancel: CancellationToken) -> Option<Self> {
        let mut runs = state.runs();
        if runs.contains_key(&run_id) {
            return None;
        }
        runs.insert(run_id, cancel);
        metrics::RUNS_IN_FLIGHT.inc();
        Some(Self {
            state: state.clone(),
            run_id,
        })
    }
}

impl Drop for RunRegistration {
    fn drop(&mut self) {
        self.state.runs().remove(&self.run_id);
        metrics::RUNS_IN_FLIGHT.dec();
    }
}

/// POST /grade - Grade a submission and return its ExecutionResult
pub async fn grade(
    State(state): State<Arc<AppState>>,
    Json(mut request): Json<GradeRequest>,
) -> Response {
    let run_id = *request.run_id.get_or_insert_with(Uuid::new_v4);
    let cancel = CancellationToken::new();

    let Some(_registration) = RunRegistration::register(&state, run_id, cancel.clone()) else {
        error!(run_id = %run_id, "Run id already in progress");
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Run {} is already in progress", run_id),
            }),
        )
            .into_response();
    };

    info!(
        run_id = %run_id,
        language = %request.language,
        test_cases = request.test_cases.len(),
        "Grade requested"
    );

    let start = Instant::now();
    let result = state.grader.grade(&request, cancel).await;
    metrics::record_run(&result, start.elapsed());

    info!(
        run_id = %run_id,
        outcome = metrics::outcome(&result),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Grade finished"
    );

    (StatusCode::OK, [("x-run-id", run_id.to_string())], Json(result)).into_response()
}

/// DELETE /grade/{run_id} - Cancel a run that is still executing
pub async fn cancel_grade(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<Uuid>,
) -> Response {
    let token = state.runs().get(&run_id).cloned();
    match token {
        Some(token) => {
            token.cancel();
            info!(run_id = %run_id, "Run cancellation requested");
            (
                StatusCode::ACCEPTED,
                Json(CancelResponse {
                    run_id,
                    cancelled: true,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No run in progress with id {}", run_id),
            }),
        )
            .into_response(),
    }
}

/// GET /languages - Languages accepted by POST /grade
pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<Vec<LanguageInfo>> {
    let mut languages: Vec<LanguageInfo> = state
        .languages
        .languages()
        .map(|lang| LanguageInfo {
            name: lang.name.clone(),
            aliases: lang.aliases.clone(),
            version: lang.version.clone(),
            transpiled: lang.transpile.is_some(),
        })
        .collect();
    languages.sort_by(|a, b| a.name.cmp(&b.name));
    Json(languages)
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn export_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
