use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use super::run_blocking;
use crate::{
    error::AppError,
    models::{LoginRequest, LoginResponse, RegisterRequest, StatusResponse},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/sessions/:id/logout", post(logout))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let credentials = Arc::clone(&state.credentials);
    run_blocking(move || {
        credentials
            .register(&request.username, &request.email, &request.password)
            .map_err(AppError::from)
    })
    .await?;

    Ok(Json(StatusResponse::success(
        "Registration successful! Please login.",
    )))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let credentials = Arc::clone(&state.credentials);
    let username = run_blocking(move || {
        credentials
            .login(&request.username, &request.password)
            .map_err(AppError::from)
    })
    .await?;

    let session_id = state.sessions.create(&username);
    Ok(Json(LoginResponse {
        status: "success",
        username,
        session_id,
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::UnknownSession(id.clone()))?;
    let username = session.lock().username.clone();
    state.sessions.remove(&id);
    tracing::info!("User {} logged out", username);

    Ok(Json(StatusResponse::success("Logged out")))
}
