//! Service traits for the backend-as-a-service collaborators.
//!
//! The intake pipelines only talk to these traits. [`crate::AppwriteClient`]
//! implements them over REST and [`crate::MemoryBackend`] keeps everything in
//! process for tests and local development.

use async_trait::async_trait;
use carepulse_core::Attachment;
use serde_json::Value;

use crate::error::BackendError;
use crate::types::{Document, NewUser, StoredFile, User};

/// User accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create a user. Fails with [`BackendError::Conflict`] if the email or
    /// phone is already registered.
    async fn create_user(&self, user: &NewUser) -> Result<User, BackendError>;

    /// Fetch a user by id.
    async fn get_user(&self, user_id: &str) -> Result<User, BackendError>;

    /// All users registered with the given email.
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>, BackendError>;
}

/// Binary file storage.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Upload a file into a bucket under the given id.
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: &Attachment,
    ) -> Result<StoredFile, BackendError>;

    /// URL at which a stored file can be viewed.
    fn file_view_url(&self, bucket_id: &str, file_id: &str) -> String;
}

/// Document database.
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Create a document in a collection.
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
    ) -> Result<Document, BackendError>;
}

/// Everything the intake flow needs from the backend.
pub trait Backend: UserDirectory + DocumentStorage + DocumentDatabase {}

impl<T> Backend for T where T: UserDirectory + DocumentStorage + DocumentDatabase {}

/// Type alias for a shareable backend instance.
pub type DynBackend = std::sync::Arc<dyn Backend>;
