use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use carepulse_core::User;

/// Request body for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub phone: String,
    pub name: String,
}

/// Page of users returned by a list query.
#[derive(Debug, Clone, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Metadata of a file kept in a storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId", default)]
    pub bucket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

/// A document created in a database collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$collectionId", default)]
    pub collection_id: String,
    #[serde(rename = "$databaseId", default)]
    pub database_id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Query selecting users by email, in the backend's JSON query syntax.
pub fn email_query(email: &str) -> String {
    serde_json::json!({
        "method": "equal",
        "attribute": "email",
        "values": [email],
    })
    .to_string()
}
