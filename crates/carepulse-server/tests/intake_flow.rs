use std::sync::Arc;
use std::time::Duration;

use carepulse_backend::{BackendMode, MemoryBackend, Operation, User};
use carepulse_server::{AppConfig, build_app};
use reqwest::{Client, StatusCode, multipart, redirect};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    backend: Arc<MemoryBackend>,
    client: Client,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

fn memory_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.backend.mode = BackendMode::Memory;
    cfg.backend.database_id = "intake".into();
    cfg.backend.patient_collection_id = "patients".into();
    cfg.backend.bucket_id = "documents".into();
    cfg
}

async fn start_server() -> TestServer {
    let backend = Arc::new(MemoryBackend::new());
    let app = build_app(&memory_config(), backend.clone()).expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    TestServer {
        base: format!("http://{addr}"),
        backend,
        client,
        shutdown: tx,
        handle,
    }
}

/// Value of the hidden session input of a rendered form.
fn session_id(html: &str) -> String {
    let marker = r#"name="sessionId" value=""#;
    let start = html.find(marker).expect("session input") + marker.len();
    let end = start + html[start..].find('"').expect("closing quote");
    html[start..end].to_string()
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("location")
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

fn registration(session: &str, consent: bool) -> multipart::Form {
    let mut form = multipart::Form::new()
        .text("sessionId", session.to_string())
        .text("name", "Jo")
        .text("email", "jo@x.com")
        .text("phone", "+15550001234")
        .text("birthDate", "1990-04-09")
        .text("gender", "Female")
        .text("address", "14th Street, New York")
        .text("occupation", "Engineer")
        .text("emergencyContactName", "Sam")
        .text("emergencyContactNumber", "+15550009999")
        .text("primaryPhysician", "John Green")
        .text("insuranceProvider", "BlueCross")
        .text("insurancePolicyNumber", "ABC123456789")
        .text("identificationType", "Passport")
        .text("identificationNumber", "123456789")
        .text("disclosureConsent", "on")
        .text("privacyConsent", "on");
    if consent {
        form = form.text("treatmentConsent", "on");
    }
    form
}

fn passport() -> multipart::Part {
    multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("passport.png")
        .mime_str("image/png")
        .unwrap()
}

fn seed_user(backend: &MemoryBackend, id: &str, email: &str) {
    backend.insert_user(User {
        id: id.into(),
        name: "Jo".into(),
        email: email.into(),
        phone: "+15550001234".into(),
    });
}

async fn open_register(server: &TestServer, user_id: &str) -> String {
    let resp = server
        .client
        .get(server.url(&format!("/patient/{user_id}/register")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    session_id(&resp.text().await.unwrap())
}

#[tokio::test]
async fn service_endpoints() {
    let server = start_server().await;

    let resp = server.client.get(server.url("/api/info")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "CarePulse Intake");
    assert_eq!(body["backend"], "memory");

    let resp = server.client.get(server.url("/healthz")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = server
        .client
        .get(server.url("/readyz"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "req-42");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");

    server.stop().await;
}

#[tokio::test]
async fn signup_then_registration_navigates_to_new_appointment() {
    let server = start_server().await;

    // Sign-up form
    let resp = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Get Started"));
    let session = session_id(&html);

    let resp = server
        .client
        .post(server.url("/"))
        .form(&[
            ("sessionId", session.as_str()),
            ("name", "Jo"),
            ("email", "jo@x.com"),
            ("phone", "+15550001234"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(server.backend.calls(Operation::CreateUser), 1);
    let register_path = location(&resp);
    let user_id = register_path
        .strip_prefix("/patient/")
        .and_then(|rest| rest.strip_suffix("/register"))
        .expect("registration path")
        .to_string();

    // Registration form, prefilled from the account
    let resp = server.client.get(server.url(&register_path)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains(r#"value="jo@x.com""#));
    assert!(html.contains(r#"enctype="multipart/form-data""#));
    let session = session_id(&html);

    let resp = server
        .client
        .post(server.url(&register_path))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/patient/{user_id}/new-appointment"));
    assert_eq!(server.backend.calls(Operation::CreateDocument), 1);
    assert_eq!(server.backend.calls(Operation::CreateFile), 0);

    let documents = server.backend.documents();
    assert_eq!(documents.len(), 1);
    let data = &documents[0].data;
    assert_eq!(data["userId"], user_id.as_str());
    assert_eq!(data["name"], "Jo");
    assert_eq!(data["birthDate"], "1990-04-09T00:00:00Z");
    assert_eq!(data["treatmentConsent"], true);
    assert!(data["identificationDocumentId"].is_null());
    assert!(data["identificationDocumentUrl"].is_null());

    let resp = server
        .client
        .get(server.url(&format!("/patient/{user_id}/new-appointment")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn duplicate_email_reuses_existing_user() {
    let server = start_server().await;
    seed_user(&server.backend, "existing-1", "dup@x.com");

    // No session: the form is created on the fly.
    let resp = server
        .client
        .post(server.url("/"))
        .form(&[("name", "Dup"), ("email", "dup@x.com"), ("phone", "+15550007777")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/patient/existing-1/register");
    assert_eq!(server.backend.calls(Operation::CreateUser), 1);
    assert_eq!(server.backend.calls(Operation::ListUsers), 1);

    server.stop().await;
}

#[tokio::test]
async fn invalid_signup_rerenders_without_backend_call() {
    let server = start_server().await;

    let resp = server
        .client
        .post(server.url("/"))
        .form(&[("name", "J"), ("email", "not-an-email"), ("phone", "+15550001234")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Name must be at least 2 characters"));
    assert!(html.contains("Invalid email address"));
    assert!(html.contains(r#"value="not-an-email""#));
    assert_eq!(server.backend.calls(Operation::CreateUser), 0);

    server.stop().await;
}

#[tokio::test]
async fn missing_consent_blocks_record_creation() {
    let server = start_server().await;
    seed_user(&server.backend, "u1", "jo@x.com");
    let session = open_register(&server, "u1").await;

    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, false).part("identificationDocument", passport()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = resp.text().await.unwrap();
    assert!(html.contains("You must consent to treatment in order to proceed"));
    assert_eq!(server.backend.calls(Operation::CreateFile), 0);
    assert_eq!(server.backend.calls(Operation::CreateDocument), 0);

    server.stop().await;
}

#[tokio::test]
async fn attachment_is_uploaded_and_linked() {
    let server = start_server().await;
    seed_user(&server.backend, "u1", "jo@x.com");
    let session = open_register(&server, "u1").await;

    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true).part("identificationDocument", passport()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let documents = server.backend.documents();
    let data = &documents[0].data;
    let file_id = data["identificationDocumentId"].as_str().expect("file id");
    let (meta, file) = server.backend.file("documents", file_id).expect("stored file");
    assert_eq!(meta.name, "passport.png");
    assert_eq!(file.content_type, "image/png");
    assert_eq!(file.size(), 4);
    assert_eq!(
        data["identificationDocumentUrl"],
        format!("memory://carepulse/v1/storage/buckets/documents/files/{file_id}/view?project=local")
    );

    server.stop().await;
}

#[tokio::test]
async fn second_submit_while_submitting_is_rejected() {
    let server = start_server().await;
    seed_user(&server.backend, "u1", "jo@x.com");
    let gate = server.backend.hold_documents();
    let session = open_register(&server, "u1").await;

    let first = {
        let client = server.client.clone();
        let url = server.url("/patient/u1/register");
        let form = registration(&session, true);
        tokio::spawn(async move { client.post(url).multipart(form).send().await.unwrap() })
    };

    // Wait until the first submission reaches the backend.
    for _ in 0..200 {
        if server.backend.calls(Operation::CreateDocument) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.backend.calls(Operation::CreateDocument), 1);

    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(server.backend.calls(Operation::CreateDocument), 1);

    gate.add_permits(1);
    let resp = first.await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(server.backend.documents().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn backend_failure_keeps_values_and_allows_retry() {
    let server = start_server().await;
    seed_user(&server.backend, "u1", "jo@x.com");
    server.backend.fail_on(Operation::CreateDocument);
    let session = open_register(&server, "u1").await;

    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let html = resp.text().await.unwrap();
    assert!(html.contains("We could not save your registration"));
    assert!(html.contains(r#"value="14th Street, New York""#));

    server.backend.clear_failures();
    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(server.backend.calls(Operation::CreateDocument), 2);
    assert_eq!(server.backend.documents().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn unknown_user_registration_page_is_not_found() {
    let server = start_server().await;

    let resp = server
        .client
        .get(server.url("/patient/nobody/register"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().contains("Patient not found"));

    server.stop().await;
}

#[tokio::test]
async fn json_api_flow() {
    let server = start_server().await;
    let user = json!({ "name": "Jo", "email": "jo@x.com", "phone": "+15550001234" });

    let resp = server
        .client
        .post(server.url("/api/users"))
        .json(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let user_id = body["user"]["$id"].as_str().unwrap().to_string();
    assert_eq!(body["existing"], false);
    assert_eq!(body["next"], format!("/patient/{user_id}/register"));

    // Same email again: the existing account is returned.
    let resp = server
        .client
        .post(server.url("/api/users"))
        .json(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["existing"], true);
    assert_eq!(body["user"]["$id"], user_id.as_str());

    let resp = server
        .client
        .get(server.url(&format!("/api/users/{user_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["email"], "jo@x.com");

    let resp = server
        .client
        .get(server.url("/api/users/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let mut patient = json!({
        "userId": user_id,
        "name": "Jo",
        "email": "jo@x.com",
        "phone": "+15550001234",
        "birthDate": "1990-04-09",
        "gender": "Female",
        "address": "14th Street, New York",
        "occupation": "Engineer",
        "emergencyContactName": "Sam",
        "emergencyContactNumber": "+15550009999",
        "primaryPhysician": "John Green",
        "insuranceProvider": "BlueCross",
        "insurancePolicyNumber": "ABC123456789",
        "identificationType": "Passport",
        "treatmentConsent": true,
        "disclosureConsent": true,
        "privacyConsent": false
    });

    let resp = server
        .client
        .post(server.url("/api/patients"))
        .json(&patient)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "validation_failed");
    assert_eq!(body["error"]["fields"][0]["field"], "privacyConsent");
    assert_eq!(server.backend.calls(Operation::CreateDocument), 0);

    patient["privacyConsent"] = json!(true);
    let resp = server
        .client
        .post(server.url("/api/patients"))
        .json(&patient)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["next"], format!("/patient/{user_id}/new-appointment"));
    assert_eq!(body["document"]["userId"], user_id.as_str());
    assert!(body["document"]["identificationDocumentId"].is_null());

    let resp = server
        .client
        .post(server.url("/api/patients"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn abandoned_submission_still_completes() {
    let server = start_server().await;
    seed_user(&server.backend, "u1", "jo@x.com");
    let gate = server.backend.hold_documents();
    let session = open_register(&server, "u1").await;

    // The client gives up while the record is being created.
    let err = server
        .client
        .post(server.url("/patient/u1/register"))
        .timeout(Duration::from_millis(300))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(server.backend.calls(Operation::CreateDocument), 1);

    gate.add_permits(1);
    for _ in 0..200 {
        if server.backend.documents().len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.backend.documents().len(), 1);

    // The form is not left in the submitting state.
    gate.add_permits(1);
    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    server.stop().await;
}

#[tokio::test]
async fn failed_submit_keeps_attachment_for_retry() {
    let server = start_server().await;
    seed_user(&server.backend, "u1", "jo@x.com");
    server.backend.fail_on(Operation::CreateDocument);
    let session = open_register(&server, "u1").await;

    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true).part("identificationDocument", passport()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(resp.text().await.unwrap().contains("passport.png"));

    // Browsers do not send the file again.
    server.backend.clear_failures();
    let resp = server
        .client
        .post(server.url("/patient/u1/register"))
        .multipart(registration(&session, true))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let documents = server.backend.documents();
    assert_eq!(documents.len(), 1);
    let file_id = documents[0].data["identificationDocumentId"]
        .as_str()
        .expect("file id");
    let (meta, _) = server.backend.file("documents", file_id).expect("stored file");
    assert_eq!(meta.name, "passport.png");

    server.stop().await;
}

#[tokio::test]
async fn malformed_user_ids_are_rejected() {
    let server = start_server().await;

    let resp = server
        .client
        .get(server.url("/api/users/..%2Fdatabases%2Fintake%2Fcollections%2Fpatients"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .client
        .get(server.url("/patient/..%2Fdatabases/register"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.backend.calls(Operation::GetUser), 0);

    let resp = server
        .client
        .post(server.url("/api/patients"))
        .json(&json!({
            "userId": "a/b",
            "name": "Jo",
            "email": "jo@x.com",
            "phone": "+15550001234",
            "birthDate": "1990-04-09",
            "gender": "Female",
            "address": "14th Street, New York",
            "occupation": "Engineer",
            "emergencyContactName": "Sam",
            "emergencyContactNumber": "+15550009999",
            "primaryPhysician": "John Green",
            "insuranceProvider": "BlueCross",
            "insurancePolicyNumber": "ABC123456789",
            "identificationType": "Passport",
            "treatmentConsent": true,
            "disclosureConsent": true,
            "privacyConsent": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.backend.calls(Operation::CreateDocument), 0);

    server.stop().await;
}
