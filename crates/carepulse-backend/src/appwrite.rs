use async_trait::async_trait;
use carepulse_core::Attachment;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::config::{BackendConfig, file_view_url};
use crate::error::BackendError;
use crate::traits::{DocumentDatabase, DocumentStorage, UserDirectory};
use crate::types::{Document, NewUser, StoredFile, User, UserList, email_query};

/// REST client for an Appwrite project, authenticated with a server API key.
#[derive(Debug, Clone)]
pub struct AppwriteClient {
    http_client: Client,
    endpoint: String,
    base: Url,
    project_id: String,
}

impl AppwriteClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-appwrite-project"),
            header_value(&config.project_id, false)?,
        );
        headers.insert(
            HeaderName::from_static("x-appwrite-key"),
            header_value(&config.api_key, true)?,
        );

        let base = Url::parse(config.base_url())
            .map_err(|e| BackendError::Config(format!("invalid endpoint: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Config(format!(
                "endpoint cannot carry a path: {base}"
            )));
        }

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.base_url().to_string(),
            base,
            project_id: config.project_id.clone(),
        })
    }

    /// Endpoint URL extended by `segments`, each percent-encoded as a
    /// single path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(BackendError::from_status(status.as_u16(), &body))
        }
    }
}

fn header_value(value: &str, sensitive: bool) -> Result<HeaderValue, BackendError> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| BackendError::Config(format!("invalid header value: {e}")))?;
    header.set_sensitive(sensitive);
    Ok(header)
}

#[async_trait]
impl UserDirectory for AppwriteClient {
    async fn create_user(&self, user: &NewUser) -> Result<User, BackendError> {
        debug!(user_id = %user.user_id, "creating user");
        let response = self
            .http_client
            .post(self.url(&["users"]))
            .json(user)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_user(&self, user_id: &str) -> Result<User, BackendError> {
        let response = self
            .http_client
            .get(self.url(&["users", user_id]))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>, BackendError> {
        let response = self
            .http_client
            .get(self.url(&["users"]))
            .query(&[("queries[]", email_query(email))])
            .send()
            .await?;
        let list: UserList = Self::decode(response).await?;
        Ok(list.users)
    }
}

#[async_trait]
impl DocumentStorage for AppwriteClient {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: &Attachment,
    ) -> Result<StoredFile, BackendError> {
        debug!(bucket_id, file_id, size = file.size(), "uploading file");
        let mime = if file.content_type.is_empty() {
            "application/octet-stream"
        } else {
            file.content_type.as_str()
        };
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(mime)?;
        let form = Form::new().text("fileId", file_id.to_string()).part("file", part);

        let response = self
            .http_client
            .post(self.url(&["storage", "buckets", bucket_id, "files"]))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    fn file_view_url(&self, bucket_id: &str, file_id: &str) -> String {
        file_view_url(&self.endpoint, &self.project_id, bucket_id, file_id)
    }
}

#[async_trait]
impl DocumentDatabase for AppwriteClient {
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: &Value,
    ) -> Result<Document, BackendError> {
        debug!(database_id, collection_id, document_id, "creating document");
        let body = json!({
            "documentId": document_id,
            "data": data,
        });
        let response = self
            .http_client
            .post(self.url(&[
                "databases",
                database_id,
                "collections",
                collection_id,
                "documents",
            ]))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }
}
