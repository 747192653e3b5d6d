use serde::{Deserialize, Serialize};

use crate::services::dashboard::{Command, DatasetOverview};
use crate::services::session::Phase;
use crate::services::table::CleaningPolicy;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub username: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub username: String,
    pub phase: Phase,
    pub cleaning_panel_open: bool,
    pub visualization_panel_open: bool,
    pub question: Option<String>,
    pub dataset: Option<DatasetOverview>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandRequest {
    OpenCleaning,
    CloseCleaning,
    Clean {
        #[serde(default)]
        policy: CleaningPolicy,
    },
    ShowVisualization,
    HideVisualization,
    Clear,
}

impl From<CommandRequest> for Command {
    fn from(request: CommandRequest) -> Self {
        match request {
            CommandRequest::OpenCleaning => Command::OpenCleaning,
            CommandRequest::CloseCleaning => Command::CloseCleaning,
            CommandRequest::Clean { policy } => Command::Clean(policy),
            CommandRequest::ShowVisualization => Command::ShowVisualization,
            CommandRequest::HideVisualization => Command::HideVisualization,
            CommandRequest::Clear => Command::Clear,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}
