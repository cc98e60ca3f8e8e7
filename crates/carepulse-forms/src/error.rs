use carepulse_core::CoreError;

/// Errors raised while describing, parsing or rendering form fields.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is declared custom but has no renderer")]
    MissingCustomRenderer(String),

    /// Posted input that cannot be turned into a value for the field.
    #[error("{field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl FormError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<handlebars::RenderError> for FormError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for FormError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FormError>;
