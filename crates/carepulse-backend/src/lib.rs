//! Backend-as-a-service access for CarePulse.
//!
//! The intake flow needs three collaborators: a user directory, a file
//! store for identification documents and a document database for patient
//! records. They are modelled as traits in [`traits`], implemented over the
//! Appwrite REST API by [`AppwriteClient`] and in process by
//! [`MemoryBackend`].

pub mod appwrite;
pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

use std::sync::Arc;

pub use appwrite::AppwriteClient;
pub use config::{BackendConfig, BackendMode, file_view_url};
pub use error::BackendError;
pub use memory::{MemoryBackend, Operation};
pub use traits::{Backend, DocumentDatabase, DocumentStorage, DynBackend, UserDirectory};
pub use types::{Document, NewUser, StoredFile, User, UserList, email_query};

/// Build the backend selected by `config.mode`.
pub fn create_backend(config: &BackendConfig) -> Result<DynBackend, BackendError> {
    match config.mode {
        BackendMode::Appwrite => Ok(Arc::new(AppwriteClient::new(config)?)),
        BackendMode::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}
