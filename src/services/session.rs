use moka::sync::Cache;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::services::table::Table;

const MAX_SESSIONS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Previewed,
    Cleaning,
    Visualizing,
    CleaningAndVisualizing,
}

#[derive(Debug, Clone, Default)]
pub struct SessionDataStore {
    current: Option<Arc<Table>>,
    original: Option<Arc<Table>>,
    cleaning_panel_open: bool,
    visualization_panel_open: bool,
    data_question: Option<String>,
}

impl SessionDataStore {
    pub fn current(&self) -> Option<&Arc<Table>> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, table: Arc<Table>) {
        self.current = Some(table);
    }

    pub fn original(&self) -> Option<&Arc<Table>> {
        self.original.as_ref()
    }

    pub fn set_original(&mut self, table: Arc<Table>) {
        self.original = Some(table);
    }

    pub fn cleaning_panel_open(&self) -> bool {
        self.cleaning_panel_open
    }

    pub fn visualization_panel_open(&self) -> bool {
        self.visualization_panel_open
    }

    pub fn show_cleaning(&mut self) {
        self.cleaning_panel_open = true;
    }

    pub fn hide_cleaning(&mut self) {
        self.cleaning_panel_open = false;
    }

    pub fn show_visualization(&mut self) {
        self.visualization_panel_open = true;
    }

    pub fn hide_visualization(&mut self) {
        self.visualization_panel_open = false;
    }

    pub fn data_question(&self) -> Option<&str> {
        self.data_question.as_deref()
    }

    pub fn set_data_question(&mut self, question: String) {
        self.data_question = Some(question);
    }

    pub fn clear_data_question(&mut self) {
        self.data_question = None;
    }

    pub fn phase(&self) -> Phase {
        match (
            self.current.is_some(),
            self.cleaning_panel_open,
            self.visualization_panel_open,
        ) {
            (false, _, _) => Phase::Idle,
            (true, false, false) => Phase::Previewed,
            (true, true, false) => Phase::Cleaning,
            (true, false, true) => Phase::Visualizing,
            (true, true, true) => Phase::CleaningAndVisualizing,
        }
    }
}

#[derive(Debug)]
pub struct UserSession {
    pub username: String,
    pub store: SessionDataStore,
}

// Logged-in sessions keyed by id. Each session sits behind its own lock so
// a clean can never interleave with a read of the same session.
pub struct SessionRegistry {
    sessions: Cache<String, Arc<Mutex<UserSession>>>,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(MAX_SESSIONS)
                .time_to_idle(idle_timeout)
                .build(),
        }
    }

    pub fn create(&self, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(
            id.clone(),
            Arc::new(Mutex::new(UserSession {
                username: username.to_string(),
                store: SessionDataStore::default(),
            })),
        );
        tracing::info!("Created session for {}", username);
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<UserSession>>> {
        self.sessions.get(id)
    }

    pub fn remove(&self, id: &str) {
        self.sessions.invalidate(id);
    }
}
