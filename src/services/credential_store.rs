use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Username already exists!")]
    UsernameTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub struct CredentialStore {
    conn: Mutex<Connection>,
}

impl CredentialStore {
    pub fn open(path: &str) -> Result<Self, CredentialError> {
        info!("Opening credential store at {}", path);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| {
            error!("Failed to open credential database: {}", e);
            CredentialError::Database(e)
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_registration (
                username TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        debug!("Credential table ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, CredentialError> {
        Self::open(":memory:")
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<(), CredentialError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(CredentialError::MissingFields);
        }
        if !EMAIL_PATTERN.is_match(email) {
            return Err(CredentialError::InvalidEmail);
        }

        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .query_row(
                "SELECT username FROM user_registration WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            warn!("Registration refused, username {} is taken", username);
            return Err(CredentialError::UsernameTaken);
        }

        let salt = Uuid::new_v4().simple().to_string();
        conn.execute(
            "INSERT INTO user_registration (username, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                username,
                email,
                hash_password(&salt, password),
                salt,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;

        info!("Registered user {}", username);
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, CredentialError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(CredentialError::MissingFields);
        }

        let conn = self.conn.lock();
        let record: Option<(String, String, String)> = conn
            .query_row(
                "SELECT username, password_hash, salt FROM user_registration WHERE username = ?1",
                params![username.trim()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match record {
            Some((stored, hash, salt)) if hash == hash_password(&salt, password) => {
                info!("User {} logged in", stored);
                Ok(stored)
            }
            _ => {
                warn!("Failed login attempt for {}", username);
                Err(CredentialError::InvalidCredentials)
            }
        }
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
