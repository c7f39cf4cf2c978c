use axum::body::Bytes;
use axum::extract::State;
use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use jobslot::{JobStatus, Supervisor};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::command::{CommandBuilder, RunRequest};

#[derive(Clone)]
pub struct AppState {
	pub supervisor: Arc<Supervisor>,
	pub commands: Arc<CommandBuilder>,
}

/// Control routes plus, when `ui_dir` is set, static UI assets as fallback.
pub fn router(state: AppState, ui_dir: Option<PathBuf>) -> Router {
	let api = Router::new()
		.route("/status", get(status))
		.route("/logs", get(logs))
		.route("/run", post(run))
		.route("/stop", post(stop));

	let app = match ui_dir {
		Some(dir) => api.fallback_service(
			ServeDir::new(dir)
				.append_index_html_on_directories(true)
				.call_fallback_on_method_not_allowed(true)
				.not_found_service(not_found.into_service()),
		),
		None => api.fallback(not_found),
	};

	app.layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Serialize)]
struct LogsResponse {
	lines: Vec<String>,
}

#[derive(Serialize)]
struct RunResponse {
	ok: bool,
	command: Vec<String>,
}

#[derive(Serialize)]
struct OkResponse {
	ok: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
	error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Display) -> ApiError {
	(
		status,
		Json(ErrorResponse {
			error: message.to_string(),
		}),
	)
}

async fn status(State(state): State<AppState>) -> Json<JobStatus> {
	Json(state.supervisor.status().await)
}

async fn logs(State(state): State<AppState>) -> Json<LogsResponse> {
	Json(LogsResponse {
		lines: state.supervisor.logs().await,
	})
}

async fn run(State(state): State<AppState>, body: Bytes) -> Result<Json<RunResponse>, ApiError> {
	let request = RunRequest::from_json(&body).map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
	let command = state
		.commands
		.build(&request)
		.map_err(|e| error(StatusCode::BAD_REQUEST, e))?;

	match state.supervisor.start(&command, state.commands.root()).await {
		Ok(true) => Ok(Json(RunResponse { ok: true, command })),
		Ok(false) => Err(error(StatusCode::CONFLICT, "process already running")),
		Err(e) => {
			tracing::warn!("run rejected: {}", e);
			Err(error(StatusCode::BAD_REQUEST, e))
		}
	}
}

async fn stop(State(state): State<AppState>) -> Json<OkResponse> {
	state.supervisor.stop().await;
	Json(OkResponse { ok: true })
}

async fn not_found() -> ApiError {
	error(StatusCode::NOT_FOUND, "not found")
}
