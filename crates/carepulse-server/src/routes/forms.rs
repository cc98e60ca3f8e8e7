//! Browser intake flow.
//!
//! `GET /` renders the sign-up form, `POST /` creates the user and redirects
//! to the registration page. `GET /patient/{user_id}/register` renders the
//! registration form prefilled from the user account and its `POST` stores
//! the patient record, then redirects to the new-appointment page.
//!
//! Invalid submissions re-render the form with 422, backend failures with
//! 502 and the cause-specific message. A submit for a form that is already
//! being submitted answers 409 without calling the backend.
//!
//! Backend calls run on their own task, so a client that goes away mid
//! submission cannot leave its form stuck in the submitting state.

use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{
    Form,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use carepulse_api::ApiError;
use carepulse_core::{
    Attachment, FormValues, FromFormValues, PatientRecord, UserParams, Validate,
};
use carepulse_forms::{
    FormController, FormError, FormFailure, HtmlRenderer, RawInput, SubmitRejected,
};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::pipeline::{Navigation, SubmitError};
use crate::server::AppState;
use crate::sessions::FormSessions;

/// Hidden input carrying the form session id.
pub const SESSION_FIELD: &str = "sessionId";

const USER_SCOPE: &str = "/";

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Multipart form error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Rendering failed: {0}")]
    Render(#[from] FormError),

    #[error("Form session {0} is no longer available")]
    SessionLost(Uuid),

    #[error("Submission task failed: {0}")]
    Task(#[from] JoinError),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let api = match &self {
            PageError::Multipart(e) => ApiError::bad_request(e.body_text()),
            PageError::Render(e) => {
                error!(error = %e, "form rendering failed");
                ApiError::internal("Failed to render page")
            }
            PageError::SessionLost(_) => ApiError::internal(self.to_string()),
            PageError::Task(e) => {
                error!(error = %e, "submission task failed");
                ApiError::internal("Submission failed")
            }
        };
        api.into_response()
    }
}

type PageResult = Result<Response, PageError>;

/// Outcome of the synchronous part of a submission.
enum Started<R> {
    /// The form was valid; the record is ready for the pipeline.
    Record(R),
    /// The submission stopped here; this is the answer.
    Responded(Response),
}

fn register_scope(user_id: &str) -> String {
    Navigation::Register {
        user_id: user_id.to_string(),
    }
    .path()
}

fn user_controller(state: &AppState) -> FormController<UserParams> {
    FormController::new(state.user_form.clone(), FormValues::new())
}

fn register_controller(state: &AppState, defaults: FormValues) -> FormController<PatientRecord> {
    FormController::new(state.register_form.clone(), defaults)
}

fn render_session<R>(
    sessions: &FormSessions<R>,
    renderer: &HtmlRenderer,
    id: Uuid,
    scope: &str,
    status: StatusCode,
) -> PageResult
where
    R: FromFormValues + Validate,
{
    let view = sessions
        .with(id, scope, |form| form.view(scope, &id.to_string()))
        .ok_or(PageError::SessionLost(id))??;
    let html = renderer.render_form(&view)?;
    Ok((status, Html(html)).into_response())
}

fn render_message(
    renderer: &HtmlRenderer,
    status: StatusCode,
    title: &str,
    body: &str,
    link: Option<(&str, &str)>,
) -> PageResult {
    let html = renderer.render_message(title, body, link)?;
    Ok((status, Html(html)).into_response())
}

/// Apply the posted fields and validate. Returns the record when the
/// form may be submitted.
fn start_submission<R>(
    sessions: &FormSessions<R>,
    renderer: &HtmlRenderer,
    id: Uuid,
    scope: &str,
    posted: HashMap<String, RawInput>,
) -> Result<Started<R>, PageError>
where
    R: FromFormValues + Validate,
{
    let attempt = sessions
        .with(id, scope, |form| {
            form.apply_submission(posted);
            form.begin_submit()
        })
        .ok_or(PageError::SessionLost(id))?;

    match attempt {
        Ok(record) => Ok(Started::Record(record)),
        Err(SubmitRejected::Invalid(errors)) => {
            debug!(session = %id, violations = errors.len(), "submission rejected");
            render_session(sessions, renderer, id, scope, StatusCode::UNPROCESSABLE_ENTITY)
                .map(Started::Responded)
        }
        Err(rejected) => {
            info!(session = %id, reason = %rejected, "duplicate submission ignored");
            render_message(
                renderer,
                StatusCode::CONFLICT,
                "Already submitted",
                "Your form is already being processed.",
                None,
            )
            .map(Started::Responded)
        }
    }
}

/// Record the pipeline outcome on the form and answer the browser.
fn finish_submission<R>(
    sessions: &FormSessions<R>,
    renderer: &HtmlRenderer,
    id: Uuid,
    scope: &str,
    outcome: Result<Navigation, SubmitError>,
) -> PageResult
where
    R: FromFormValues + Validate,
{
    match outcome {
        Ok(navigation) => {
            sessions.with(id, scope, |form| form.complete(Ok(())));
            sessions.remove(id);
            Ok(Redirect::to(&navigation.path()).into_response())
        }
        Err(err) => {
            let status = match err {
                SubmitError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SubmitError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            sessions.with(id, scope, |form| form.complete(Err(err.to_failure())));
            render_session(sessions, renderer, id, scope, status)
        }
    }
}

/// Run the backend part of a submission on its own task and answer with
/// its outcome.
///
/// The task records the outcome on the form even when the request that
/// started it is dropped.
async fn run_submission<R, F>(
    sessions: Arc<FormSessions<R>>,
    renderer: Arc<HtmlRenderer>,
    id: Uuid,
    scope: String,
    submit: F,
) -> PageResult
where
    R: FromFormValues + Validate + Send + Sync + 'static,
    F: Future<Output = Result<Navigation, SubmitError>> + Send + 'static,
{
    let task = {
        let sessions = sessions.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            let outcome = submit.await;
            finish_submission(&sessions, &renderer, id, &scope, outcome)
        })
    };
    match task.await {
        Ok(result) => result,
        Err(err) => {
            warn!(session = %id, "submission task did not finish");
            sessions.with(id, &scope, |form| {
                form.complete(Err(FormFailure::new(
                    "submission_failed",
                    "Something went wrong. Please try again.",
                )))
            });
            Err(PageError::Task(err))
        }
    }
}

pub async fn user_page(State(state): State<AppState>) -> PageResult {
    let id = state.user_forms.create(USER_SCOPE, user_controller(&state));
    render_session(&state.user_forms, &state.renderer, id, USER_SCOPE, StatusCode::OK)
}

pub async fn submit_user(
    State(state): State<AppState>,
    Form(mut fields): Form<HashMap<String, String>>,
) -> PageResult {
    let session = fields.remove(SESSION_FIELD);
    let posted = fields
        .into_iter()
        .map(|(name, value)| (name, RawInput::Text(value)))
        .collect();
    let id = state
        .user_forms
        .resolve(session.as_deref(), USER_SCOPE, || user_controller(&state));

    let params = match start_submission(&state.user_forms, &state.renderer, id, USER_SCOPE, posted)? {
        Started::Record(params) => params,
        Started::Responded(response) => return Ok(response),
    };

    let pipeline = state.pipeline.clone();
    run_submission(
        state.user_forms.clone(),
        state.renderer.clone(),
        id,
        USER_SCOPE.to_string(),
        async move {
            pipeline
                .create_user(&params)
                .await
                .map(|outcome| outcome.navigation())
        },
    )
    .await
}

pub async fn register_page(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> PageResult {
    let user = match state.pipeline.get_user(&user_id).await {
        Ok(user) => user,
        Err(err) if err.is_not_found() => {
            return render_message(
                &state.renderer,
                StatusCode::NOT_FOUND,
                "Patient not found",
                "We could not find an account for this link.",
                Some(("/", "Start over")),
            );
        }
        Err(err) => {
            return render_message(
                &state.renderer,
                StatusCode::BAD_GATEWAY,
                "Something went wrong",
                err.user_message(),
                Some(("/", "Start over")),
            );
        }
    };

    let scope = register_scope(&user_id);
    let controller = register_controller(&state, PatientRecord::default_values(Some(&user)));
    let id = state.register_forms.create(scope.clone(), controller);
    render_session(&state.register_forms, &state.renderer, id, &scope, StatusCode::OK)
}

pub async fn submit_register(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> PageResult {
    let mut session = None;
    let mut posted = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            posted.insert(
                name,
                RawInput::File(Attachment::new(file_name, content_type, bytes)),
            );
        } else if name == SESSION_FIELD {
            session = Some(field.text().await?);
        } else {
            let value = field.text().await?;
            posted.insert(name, RawInput::Text(value));
        }
    }

    let scope = register_scope(&user_id);
    let id = state.register_forms.resolve(session.as_deref(), &scope, || {
        register_controller(&state, PatientRecord::default_values(None))
    });

    let record = match start_submission(&state.register_forms, &state.renderer, id, &scope, posted)? {
        Started::Record(record) => record,
        Started::Responded(response) => return Ok(response),
    };

    let pipeline = state.pipeline.clone();
    run_submission(
        state.register_forms.clone(),
        state.renderer.clone(),
        id,
        scope,
        async move {
            pipeline
                .register_patient(&user_id, &record)
                .await
                .map(|registered| registered.navigation)
        },
    )
    .await
}

pub async fn new_appointment_page(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> PageResult {
    debug!(%user_id, "registration complete");
    render_message(
        &state.renderer,
        StatusCode::OK,
        "You're all set",
        "Your registration is complete. You can now request an appointment.",
        Some(("/", "Back to start")),
    )
}
