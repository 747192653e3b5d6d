use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::credential_store::CredentialError;
use crate::services::dashboard::DashboardError;
use crate::services::file_processor::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown session: {0}")]
    UnknownSession(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Decode(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownSession(_) => StatusCode::NOT_FOUND,
            AppError::Dashboard(err) => match err {
                DashboardError::NoDataset | DashboardError::PanelClosed(_) => StatusCode::CONFLICT,
                DashboardError::EmptyUpload => StatusCode::BAD_REQUEST,
                DashboardError::Precondition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            },
            AppError::Credentials(CredentialError::Database(_)) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Credentials(CredentialError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Credentials(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
