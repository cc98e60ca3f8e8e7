pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod sessions;

pub use config::{AppConfig, FormsConfig, LoggingConfig, ServerConfig};
pub use observability::{init_tracing, shutdown_tracing};
pub use pipeline::{Navigation, RegisteredPatient, SubmissionPipeline, SubmitError, UserOutcome};
pub use server::{AppState, CarepulseServer, ServerBuilder, build_app};
pub use sessions::FormSessions;
