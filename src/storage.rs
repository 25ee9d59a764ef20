use crate::constants;
use crate::draft::{JsonMap, StoredRecord};
use crate::error::{RegistrarError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Record-store boundary: the hosted service's table API, reduced to the
/// three operations the wizard needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the single row whose email column matches, if any.
    async fn fetch_by_email(&self, table: &str, email: &str) -> Result<Option<StoredRecord>>;

    /// Apply a partial update to the row with the given id.
    async fn update(&self, table: &str, id: &str, fields: &JsonMap) -> Result<()>;

    /// Insert a sub-record. Rows carrying a student id and level merge onto
    /// any existing row with the same pair, so re-running finalize does not
    /// duplicate education entries.
    async fn insert(&self, table: &str, record: &JsonMap) -> Result<()>;
}

/// Object-storage boundary for uploaded documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `bucket/path` and return the public URL.
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Authenticated session as reported by the auth service.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, or None when the caller is signed out.
    async fn current_session(&self) -> Result<Option<Session>>;
}

/// In-memory backend implementing all three ports, used by tests and the
/// offline CLI mode.
pub struct InMemoryBackend {
    tables: Arc<Mutex<HashMap<String, HashMap<String, JsonMap>>>>,
    uploads: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    session: Arc<Mutex<Option<Session>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            uploads: Arc::new(Mutex::new(HashMap::new())),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Seeds the provisioning step that normally happens outside the wizard:
    /// an account row with registration not yet completed.
    pub fn provision_student(&self, table: &str, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let mut row = JsonMap::new();
        row.insert(constants::ID.to_string(), Value::String(id.clone()));
        row.insert(constants::EMAIL.to_string(), Value::String(email.to_string()));
        row.insert(constants::COMPLETED.to_string(), Value::Bool(false));

        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().insert(id.clone(), row);

        debug!("Provisioned student record {} for {}", id, email);
        id
    }

    pub fn sign_in(&self, user_id: &str, email: &str) {
        let mut session = self.session.lock().unwrap();
        *session = Some(Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
        });
    }

    /// Test helper: a copy of one row.
    pub fn record(&self, table: &str, id: &str) -> Option<JsonMap> {
        let tables = self.tables.lock().unwrap();
        tables.get(table).and_then(|rows| rows.get(id)).cloned()
    }

    /// Test helper: all rows of a table.
    pub fn rows(&self, table: &str) -> Vec<JsonMap> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Test helper: number of stored objects.
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryBackend {
    async fn fetch_by_email(&self, table: &str, email: &str) -> Result<Option<StoredRecord>> {
        let tables = self.tables.lock().unwrap();
        let record = tables.get(table).and_then(|rows| {
            rows.values()
                .find(|row| {
                    row.get(constants::EMAIL)
                        .and_then(Value::as_str)
                        .map(|e| e.eq_ignore_ascii_case(email))
                        .unwrap_or(false)
                })
                .cloned()
        });

        Ok(record.map(|fields| {
            let id = fields
                .get(constants::ID)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            StoredRecord { id, fields }
        }))
    }

    async fn update(&self, table: &str, id: &str, fields: &JsonMap) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(table).ok_or_else(|| RegistrarError::Persistence {
            message: format!("no such table: {}", table),
        })?;
        let row = rows.get_mut(id).ok_or_else(|| RegistrarError::Persistence {
            message: format!("no record {} in {}", id, table),
        })?;

        for (column, value) in fields {
            row.insert(column.clone(), value.clone());
        }

        debug!("Updated record {} in {}", id, table);
        Ok(())
    }

    async fn insert(&self, table: &str, record: &JsonMap) -> Result<()> {
        let student_id = record.get(constants::EDUCATION_STUDENT_ID).and_then(Value::as_str);
        let level = record.get(constants::EDUCATION_LEVEL).and_then(Value::as_str);

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        // Merge onto an existing (student, level) row when both keys are set
        if let (Some(student_id), Some(level)) = (student_id, level) {
            let existing = rows
                .iter()
                .find(|(_, row)| {
                    row.get(constants::EDUCATION_STUDENT_ID).and_then(Value::as_str) == Some(student_id)
                        && row.get(constants::EDUCATION_LEVEL).and_then(Value::as_str) == Some(level)
                })
                .map(|(id, _)| id.clone());
            if let Some(id) = existing {
                let mut merged = record.clone();
                merged.insert(constants::ID.to_string(), Value::String(id.clone()));
                rows.insert(id, merged);
                return Ok(());
            }
        }

        let id = Uuid::new_v4().to_string();
        let mut row = record.clone();
        row.insert(constants::ID.to_string(), Value::String(id.clone()));
        rows.insert(id.clone(), row);

        debug!("Inserted record {} into {}", id, table);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryBackend {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let key = format!("{}/{}", bucket, path);
        let mut uploads = self.uploads.lock().unwrap();
        uploads.insert(key.clone(), bytes);

        debug!("Stored object {}", key);
        Ok(format!("memory://{}", key))
    }
}

#[async_trait]
impl SessionProvider for InMemoryBackend {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().unwrap().clone())
    }
}
