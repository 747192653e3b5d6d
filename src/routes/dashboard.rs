use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use std::sync::Arc;

use super::run_blocking;
use crate::{
    error::AppError,
    models::{AskRequest, AskResponse, CommandRequest, SessionView, UploadQuery},
    services::{
        dashboard::{Command, Outcome, StatsReport},
        file_processor,
        session::UserSession,
        table::{ChartRequest, ChartSpec},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions/:id", get(session_view))
        .route("/sessions/:id/upload", post(upload))
        .route("/sessions/:id/stats", get(stats))
        .route("/sessions/:id/commands", post(command))
        .route("/sessions/:id/charts", post(chart))
        .route("/sessions/:id/ask", post(ask))
}

fn lookup(state: &AppState, id: &str) -> Result<Arc<Mutex<UserSession>>, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::UnknownSession(id.to_string()))
}

async fn session_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, &id)?;
    let session = session.lock();
    let store = &session.store;

    Ok(Json(SessionView {
        username: session.username.clone(),
        phase: store.phase(),
        cleaning_panel_open: store.cleaning_panel_open(),
        visualization_panel_open: store.visualization_panel_open(),
        question: store.data_question().map(str::to_string),
        dataset: state.dashboard.overview(store).ok(),
    }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Outcome>, AppError> {
    let session = lookup(&state, &id)?;
    let dashboard = state.dashboard;
    tracing::info!("Upload of {} ({}KB) for session {}", query.filename, body.len() / 1024, id);

    let outcome = run_blocking(move || {
        let table = file_processor::decode_upload(&query.filename, body)?;
        let mut session = session.lock();
        let (next, outcome) = dashboard.apply(&session.store, Command::Upload(table))?;
        session.store = next;
        Ok(outcome)
    })
    .await?;

    Ok(Json(outcome))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatsReport>, AppError> {
    let session = lookup(&state, &id)?;
    let dashboard = state.dashboard;

    let report = run_blocking(move || {
        let session = session.lock();
        dashboard.stats(&session.store).map_err(AppError::from)
    })
    .await?;

    Ok(Json(report))
}

async fn command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<Outcome>, AppError> {
    let session = lookup(&state, &id)?;
    let dashboard = state.dashboard;
    tracing::debug!("Session {} command: {:?}", id, request);

    let outcome = run_blocking(move || {
        let mut session = session.lock();
        let (next, outcome) = dashboard.apply(&session.store, Command::from(request))?;
        session.store = next;
        Ok(outcome)
    })
    .await?;

    Ok(Json(outcome))
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<ChartSpec>, AppError> {
    let session = lookup(&state, &id)?;
    let dashboard = state.dashboard;

    let spec = run_blocking(move || {
        let session = session.lock();
        dashboard
            .render(&session.store, &request)
            .map_err(AppError::from)
    })
    .await?;

    Ok(Json(spec))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(AppError::InvalidInput("Question must not be empty".to_string()));
    }
    let session = lookup(&state, &id)?;
    let mut session = session.lock();
    let (next, outcome) = state
        .dashboard
        .apply(&session.store, Command::Ask(request.question))?;
    session.store = next;

    match outcome {
        Outcome::Answered { answer, .. } => Ok(Json(AskResponse { answer })),
        other => Err(AppError::Internal(format!("Unexpected outcome: {:?}", other))),
    }
}
