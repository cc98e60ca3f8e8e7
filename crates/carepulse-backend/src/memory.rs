//! In-process backend.
//!
//! Keeps users, files and documents in concurrent maps. Used by the test
//! suites and by `backend.mode = "memory"` for local development without a
//! backend project. Calls are counted per [`Operation`] and failures can be
//! injected per operation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use carepulse_core::Attachment;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::file_view_url;
use crate::error::BackendError;
use crate::traits::{DocumentDatabase, DocumentStorage, UserDirectory};
use crate::types::{Document, NewUser, StoredFile, User};

const MEMORY_ENDPOINT: &str = "memory://carepulse/v1";
const MEMORY_PROJECT: &str = "local";

/// Backend calls tracked by [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateUser,
    GetUser,
    ListUsers,
    CreateFile,
    CreateDocument,
}

impl Operation {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            Self::CreateUser => 0,
            Self::GetUser => 1,
            Self::ListUsers => 2,
            Self::CreateFile => 3,
            Self::CreateDocument => 4,
        }
    }
}

/// Backend that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    users: DashMap<String, User>,
    files: DashMap<(String, String), (StoredFile, Attachment)>,
    documents: DashMap<String, Document>,
    calls: [AtomicUsize; Operation::COUNT],
    failing: DashSet<Operation>,
    document_gate: OnceLock<Arc<Semaphore>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `op` has been invoked, including failed calls.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Make every subsequent `op` call fail with a 500.
    pub fn fail_on(&self, op: Operation) {
        self.failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.failing.clear();
    }

    /// Seed an existing user.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Snapshot of all created documents.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.iter().map(|d| d.value().clone()).collect()
    }

    /// Number of stored files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Metadata and content of a stored file.
    pub fn file(&self, bucket_id: &str, file_id: &str) -> Option<(StoredFile, Attachment)> {
        self.files
            .get(&(bucket_id.to_string(), file_id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Hold document creation until permits are added to the returned
    /// semaphore. Each `create_document` call consumes one permit.
    pub fn hold_documents(&self) -> Arc<Semaphore> {
        self.document_gate
            .get_or_init(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    fn record(&self, op: Operation) -> Result<(), BackendError> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&op) {
            return Err(BackendError::http(500, format!("injected failure for {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn create_user(&self, user: &NewUser) -> Result<User, BackendError> {
        self.record(Operation::CreateUser)?;
        let duplicate = self.users.iter().any(|u| {
            u.id == user.user_id
                || u.email.eq_ignore_ascii_case(&user.email)
                || (!user.phone.is_empty() && u.phone == user.phone)
        });
        if duplicate {
            return Err(BackendError::conflict(
                "A user with the same id, email, or phone already exists in this project.",
            ));
        }
        let created = User {
            id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        };
        debug!(user_id = %created.id, "stored user in memory");
        self.users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, BackendError> {
        self.record(Operation::GetUser)?;
        self.users
            .get(user_id)
            .map(|u| u.value().clone())
            .ok_or_else(|| BackendError::not_found("User with the requested ID could not be found."))
    }

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>, BackendError> {
        self.record(Operation::ListUsers)?;
        Ok(self
            .users
            .iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.value().clone())
            .collect())
    }
}

#[async_trait]
impl DocumentStorage for MemoryBackend {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: &Attachment,
    ) -> Result<StoredFile, BackendError> {
        self.record(Operation::CreateFile)?;
        let key = (bucket_id.to_string(), file_id.to_string());
        if self.files.contains_key(&key) {
            return Err(BackendError::conflict("A storage file with the requested ID already exists."));
        }
        let meta = StoredFile {
            id: file_id.to_string(),
            bucket_id: bucket_id.to_string(),
            name: file.file_name.clone(),
            mime_type: file.content_type.clone(),
            size: file.size() as u64,
        };
        self.files.insert(key, (meta.clone(), file.clone()));
        Ok(meta)
    }

    fn file_view_url(&self, bucket_id: &str, file_id: &str) -> String {
        file_view_url(MEMORY_ENDPOINT, MEMORY_PROJECT, bucket_id, file_id)
    }
}

#[async_trait]
impl DocumentDatabase for MemoryBackend {
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
    ) -> Result<Document, BackendError> {
        self.record(Operation::CreateDocument)?;
        if let Some(gate) = self.document_gate.get() {
            gate.acquire()
                .await
                .map_err(|_| BackendError::http(503, "document creation closed"))?
                .forget();
        }

        let Value::Object(fields) = data else {
            return Err(BackendError::http(400, "Document data must be a JSON object."));
        };
        if self.documents.contains_key(document_id) {
            return Err(BackendError::conflict("Document with the requested ID already exists."));
        }
        let document = Document {
            id: document_id.to_string(),
            collection_id: collection_id.to_string(),
            database_id: database_id.to_string(),
            data: fields.clone(),
        };
        self.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(id: &str, email: &str, phone: &str) -> NewUser {
        NewUser {
            user_id: id.into(),
            email: email.into(),
            phone: phone.into(),
            name: "Jo".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let backend = MemoryBackend::new();
        backend
            .create_user(&new_user("u1", "dup@x.com", "+15550001111"))
            .await
            .unwrap();
        let err = backend
            .create_user(&new_user("u2", "DUP@x.com", "+15550002222"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(backend.calls(Operation::CreateUser), 2);

        let found = backend.find_users_by_email("dup@x.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let backend = MemoryBackend::new();
        assert!(backend.get_user("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn injected_failures_are_counted() {
        let backend = MemoryBackend::new();
        backend.fail_on(Operation::CreateFile);
        let file = Attachment::new("id.png", "image/png", vec![1u8, 2, 3]);
        let err = backend.create_file("b", "f", &file).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(backend.calls(Operation::CreateFile), 1);
        assert_eq!(backend.file_count(), 0);

        backend.clear_failures();
        let stored = backend.create_file("b", "f", &file).await.unwrap();
        assert_eq!(stored.size, 3);
        let (_, content) = backend.file("b", "f").unwrap();
        assert_eq!(content.bytes.as_ref(), &[1, 2, 3]);
        assert!(backend.file_view_url("b", "f").ends_with("/storage/buckets/b/files/f/view?project=local"));
    }

    #[tokio::test]
    async fn held_documents_wait_for_permits() {
        let backend = Arc::new(MemoryBackend::new());
        let gate = backend.hold_documents();

        let task = {
            let backend = backend.clone();
            tokio::spawn(async move {
                backend
                    .create_document("db", "patients", "d1", &json!({"name": "Jo"}))
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(backend.documents().is_empty());

        gate.add_permits(1);
        let doc = task.await.unwrap().unwrap();
        assert_eq!(doc.data["name"], "Jo");
        assert_eq!(backend.documents().len(), 1);
    }
}
