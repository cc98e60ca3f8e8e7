//! JSON endpoints of the intake flow for non-browser clients.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use carepulse_api::ApiError;
use carepulse_backend::Document;
use carepulse_core::{PatientRecord, User, UserParams, Validate};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
    /// True when the email was already registered and no account was created.
    pub existing: bool,
    pub next: String,
}

/// Patient record plus the user it belongs to. Attachments are only
/// accepted through the multipart registration form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPatientRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub record: PatientRecord,
}

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub document: Document,
    pub next: String,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserParams>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let params = json_body(payload)?;
    params.validate()?;

    let outcome = state.pipeline.create_user(&params).await?;
    let status = if outcome.is_existing() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let next = outcome.navigation().path();
    let existing = outcome.is_existing();
    Ok((
        status,
        Json(UserResponse {
            user: outcome.into_user(),
            existing,
            next,
        }),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.pipeline.get_user(&user_id).await?))
}

pub async fn register_patient(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPatientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    let RegisterPatientRequest { user_id, record } = json_body(payload)?;
    if user_id.trim().is_empty() {
        return Err(ApiError::bad_request("userId must not be empty"));
    }
    record.validate()?;

    let registered = state.pipeline.register_patient(&user_id, &record).await?;
    Ok((
        StatusCode::CREATED,
        Json(PatientResponse {
            document: registered.document,
            next: registered.navigation.path(),
        }),
    ))
}
