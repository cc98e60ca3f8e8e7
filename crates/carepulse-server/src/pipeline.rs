//! Submission pipeline: turns validated form records into backend calls.
//!
//! User creation falls back to an email lookup when the backend reports a
//! conflict. Patient registration uploads the optional identification
//! document first, then creates the patient document. Nothing is kept
//! locally between calls; a failed step aborts the pipeline and is
//! reported as a [`SubmitError`] naming that step.

use carepulse_api::ApiError;
use carepulse_backend::{BackendConfig, BackendError, Document, DynBackend, NewUser};
use carepulse_core::time::date_to_rfc3339;
use carepulse_core::{CoreError, PatientRecord, User, UserParams, generate_id, validate_id};
use carepulse_forms::FormFailure;
use serde_json::Value;
use tracing::{error, info, warn};

/// Where the browser goes after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Register { user_id: String },
    NewAppointment { user_id: String },
}

impl Navigation {
    pub fn path(&self) -> String {
        match self {
            Self::Register { user_id } => format!("/patient/{user_id}/register"),
            Self::NewAppointment { user_id } => format!("/patient/{user_id}/new-appointment"),
        }
    }
}

/// Result of user creation. `Existing` means the email was already
/// registered and no new account was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    Created(User),
    Existing(User),
}

impl UserOutcome {
    pub fn user(&self) -> &User {
        match self {
            Self::Created(user) | Self::Existing(user) => user,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            Self::Created(user) | Self::Existing(user) => user,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    pub fn navigation(&self) -> Navigation {
        Navigation::Register {
            user_id: self.user().id.clone(),
        }
    }
}

/// A created patient document and the page to continue with.
#[derive(Debug, Clone)]
pub struct RegisteredPatient {
    pub document: Document,
    pub navigation: Navigation,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("user creation failed: {0}")]
    UserCreation(BackendError),

    #[error("user lookup failed: {0}")]
    UserLookup(BackendError),

    #[error("document upload failed: {0}")]
    DocumentUpload(BackendError),

    #[error("patient record creation failed: {0}")]
    RecordCreation(BackendError),

    #[error("could not encode patient record: {0}")]
    Encoding(#[from] CoreError),

    /// The user id does not have the shape of a backend identifier.
    #[error("{0}")]
    InvalidUserId(CoreError),
}

impl SubmitError {
    /// Stable machine-readable cause.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserCreation(_) => "user_creation_failed",
            Self::UserLookup(_) => "user_lookup_failed",
            Self::DocumentUpload(_) => "document_upload_failed",
            Self::RecordCreation(_) => "record_creation_failed",
            Self::Encoding(_) => "encoding_failed",
            Self::InvalidUserId(_) => "invalid_user_id",
        }
    }

    /// Message shown to the person filling in the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserCreation(_) => "We could not create your account. Please try again.",
            Self::UserLookup(_) => "We could not find your account. Please start over.",
            Self::DocumentUpload(_) => {
                "We could not upload your identification document. Please try again."
            }
            Self::RecordCreation(_) => "We could not save your registration. Please try again.",
            Self::Encoding(_) => "Your registration could not be processed.",
            Self::InvalidUserId(_) => "This registration link is not valid. Please start over.",
        }
    }

    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::UserCreation(e)
            | Self::UserLookup(e)
            | Self::DocumentUpload(e)
            | Self::RecordCreation(e) => Some(e),
            Self::Encoding(_) | Self::InvalidUserId(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.backend_error().is_some_and(BackendError::is_not_found)
    }

    pub fn to_failure(&self) -> FormFailure {
        FormFailure::new(self.code(), self.user_message())
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        if matches!(err, SubmitError::UserLookup(_)) && err.is_not_found() {
            return ApiError::not_found(err.user_message());
        }
        match err {
            SubmitError::Encoding(e) => ApiError::internal(e.to_string()),
            SubmitError::InvalidUserId(e) => ApiError::bad_request(e.to_string()),
            other => ApiError::bad_gateway(other.code(), other.user_message()),
        }
    }
}

/// Backend calls of the intake flow, bound to the configured database,
/// collection and bucket.
#[derive(Clone)]
pub struct SubmissionPipeline {
    backend: DynBackend,
    database_id: String,
    patient_collection_id: String,
    bucket_id: String,
}

impl SubmissionPipeline {
    pub fn new(backend: DynBackend, config: &BackendConfig) -> Self {
        Self {
            backend,
            database_id: config.database_id.clone(),
            patient_collection_id: config.patient_collection_id.clone(),
            bucket_id: config.bucket_id.clone(),
        }
    }

    /// Create the user account, or return the account already registered
    /// with the same email.
    pub async fn create_user(&self, params: &UserParams) -> Result<UserOutcome, SubmitError> {
        let new_user = NewUser {
            user_id: generate_id(),
            email: params.email.clone(),
            phone: params.phone.clone(),
            name: params.name.clone(),
        };

        match self.backend.create_user(&new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "user created");
                Ok(UserOutcome::Created(user))
            }
            Err(err) if err.is_conflict() => {
                warn!(email = %params.email, "user already exists, looking up by email");
                let existing = self
                    .backend
                    .find_users_by_email(&params.email)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "user lookup by email failed");
                        SubmitError::UserCreation(e)
                    })?;
                match existing.into_iter().next() {
                    Some(user) => Ok(UserOutcome::Existing(user)),
                    None => {
                        error!(error = %err, "conflict reported but no user has this email");
                        Err(SubmitError::UserCreation(err))
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "user creation failed");
                Err(SubmitError::UserCreation(err))
            }
        }
    }

    /// Fetch the account of `user_id`. Ids the backend could never have
    /// issued are reported as not found without a backend call.
    pub async fn get_user(&self, user_id: &str) -> Result<User, SubmitError> {
        if let Err(e) = validate_id(user_id) {
            warn!(error = %e, "user lookup with malformed id");
            return Err(SubmitError::UserLookup(BackendError::not_found(e.to_string())));
        }
        self.backend.get_user(user_id).await.map_err(|e| {
            if e.is_not_found() {
                warn!(%user_id, "user not found");
            } else {
                error!(%user_id, error = %e, "user lookup failed");
            }
            SubmitError::UserLookup(e)
        })
    }

    /// Store the patient record of `user_id`, with its identification
    /// document when one was attached.
    pub async fn register_patient(
        &self,
        user_id: &str,
        record: &PatientRecord,
    ) -> Result<RegisteredPatient, SubmitError> {
        validate_id(user_id).map_err(SubmitError::InvalidUserId)?;

        let (document_id, document_url) = match &record.identification_document {
            Some(file) => {
                let stored = self
                    .backend
                    .create_file(&self.bucket_id, &generate_id(), file)
                    .await
                    .map_err(|e| {
                        error!(%user_id, error = %e, "identification document upload failed");
                        SubmitError::DocumentUpload(e)
                    })?;
                let url = self.backend.file_view_url(&self.bucket_id, &stored.id);
                (Value::String(stored.id), Value::String(url))
            }
            None => (Value::Null, Value::Null),
        };

        let mut data = serde_json::to_value(record).map_err(CoreError::from)?;
        if let Value::Object(fields) = &mut data {
            let birth_date = match record.birth_date {
                Some(date) => Value::String(date_to_rfc3339(date)?),
                None => Value::Null,
            };
            fields.insert("birthDate".into(), birth_date);
            fields.insert("userId".into(), Value::String(user_id.to_string()));
            fields.insert("identificationDocumentId".into(), document_id);
            fields.insert("identificationDocumentUrl".into(), document_url);
        }

        let document = self
            .backend
            .create_document(
                &self.database_id,
                &self.patient_collection_id,
                &generate_id(),
                &data,
            )
            .await
            .map_err(|e| {
                error!(%user_id, error = %e, "patient record creation failed");
                SubmitError::RecordCreation(e)
            })?;

        info!(%user_id, document_id = %document.id, "patient registered");
        Ok(RegisteredPatient {
            document,
            navigation: Navigation::NewAppointment {
                user_id: user_id.to_string(),
            },
        })
    }
}
