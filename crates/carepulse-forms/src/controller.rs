//! Form state and the submission lifecycle.
//!
//! ```text
//! Idle ──begin_submit──▶ Validating ──▶ Invalid
//!                                   └─▶ Submitting ──complete──▶ Success | Failure
//! ```
//!
//! `Invalid` and `Failure` accept another submit; `Success` is terminal.
//! While `Submitting`, further submits are rejected without side effects.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use carepulse_core::{FieldValue, FormValues, FromFormValues, Validate, ValidationErrors};
use serde::Serialize;
use tracing::debug;

use crate::definitions::FormDefinition;
use crate::error::{FormError, Result};
use crate::render::{ChangeSink, RawInput, apply_input, render_field};
use crate::widget::{FormView, SectionView};

/// Cause-specific failure reported by whoever performed the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFailure {
    pub code: String,
    pub message: String,
}

impl FormFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FormStatus {
    Idle,
    Validating,
    Invalid,
    Submitting,
    Success,
    Failure(FormFailure),
}

/// Why [`FormController::begin_submit`] did not hand out a record.
#[derive(Debug, thiserror::Error)]
pub enum SubmitRejected {
    #[error("a submission is already in progress")]
    AlreadySubmitting,

    #[error("the form has already been submitted")]
    AlreadySucceeded,

    #[error(transparent)]
    Invalid(ValidationErrors),
}

/// Values, per-field status and lifecycle of one rendered form.
///
/// `R` is the record the form produces once valid.
#[derive(Debug)]
pub struct FormController<R> {
    definition: Arc<FormDefinition>,
    values: FormValues,
    touched: HashSet<String>,
    /// Messages from the validation schema.
    errors: HashMap<String, String>,
    /// Messages for input that could not be parsed at all.
    input_errors: HashMap<String, String>,
    status: FormStatus,
    _record: PhantomData<fn() -> R>,
}

impl<R> FormController<R>
where
    R: FromFormValues + Validate,
{
    pub fn new(definition: Arc<FormDefinition>, defaults: FormValues) -> Self {
        let mut values = FormValues::new();
        for field in definition.fields() {
            let value = defaults.get(&field.name).cloned().unwrap_or_default();
            values.set(field.name.clone(), value);
        }
        Self {
            definition,
            values,
            touched: HashSet::new(),
            errors: HashMap::new(),
            input_errors: HashMap::new(),
            status: FormStatus::Idle,
            _record: PhantomData,
        }
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// Current message for a field, whether touched or not.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.input_errors
            .get(name)
            .or_else(|| self.errors.get(name))
            .map(String::as_str)
    }

    /// Message shown next to the field: only touched fields display errors.
    pub fn visible_error(&self, name: &str) -> Option<&str> {
        if self.is_touched(name) {
            self.error(name)
        } else {
            None
        }
    }

    pub fn is_submit_disabled(&self) -> bool {
        matches!(self.status, FormStatus::Submitting | FormStatus::Success)
    }

    /// Feed posted input for one field through its renderer.
    pub fn apply(&mut self, name: &str, input: RawInput) -> Result<()> {
        if self.is_submit_disabled() {
            return Ok(());
        }
        let definition = Arc::clone(&self.definition);
        let field = definition
            .field(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        apply_input(field, input, self);
        Ok(())
    }

    /// Feed a complete submission. Every declared field is updated; fields
    /// missing from `posted` are treated as absent and unknown keys are
    /// ignored.
    ///
    /// Browsers never post a file input again, so a file held from an
    /// earlier submission is kept when the field comes back blank.
    pub fn apply_submission(&mut self, mut posted: HashMap<String, RawInput>) {
        if self.is_submit_disabled() {
            return;
        }
        let definition = Arc::clone(&self.definition);
        for field in definition.fields() {
            let input = posted.remove(&field.name).unwrap_or(RawInput::Absent);
            let holds_file = matches!(self.values.get(&field.name), Some(FieldValue::File(_)));
            if holds_file && input.is_blank_upload() {
                continue;
            }
            apply_input(field, input, self);
        }
    }

    /// Validate the current values and, if they pass, enter `Submitting` and
    /// return the typed record.
    pub fn begin_submit(&mut self) -> std::result::Result<R, SubmitRejected> {
        match self.status {
            FormStatus::Submitting => return Err(SubmitRejected::AlreadySubmitting),
            FormStatus::Success => return Err(SubmitRejected::AlreadySucceeded),
            _ => {}
        }

        self.status = FormStatus::Validating;
        let record = R::from_values(&self.values);
        let schema_errors = record.validate().err().unwrap_or_default();

        let mut errors = ValidationErrors::new();
        for field in self.definition.fields() {
            self.touched.insert(field.name.clone());
            let message = self
                .input_errors
                .get(&field.name)
                .map(String::as_str)
                .or_else(|| schema_errors.for_field(&field.name));
            if let Some(message) = message {
                errors.push(field.name.clone(), message);
            }
        }
        for violation in schema_errors.iter() {
            if self.definition.field(&violation.field).is_none() {
                errors.push(violation.field.clone(), violation.message.clone());
            }
        }

        self.errors = schema_errors
            .iter()
            .map(|v| (v.field.clone(), v.message.clone()))
            .collect();

        if errors.is_empty() {
            self.status = FormStatus::Submitting;
            Ok(record)
        } else {
            debug!(form = self.definition.id, violations = errors.len(), "form invalid");
            self.status = FormStatus::Invalid;
            Err(SubmitRejected::Invalid(errors))
        }
    }

    /// Record the outcome of the submission started by `begin_submit`.
    pub fn complete(&mut self, outcome: std::result::Result<(), FormFailure>) {
        if self.status != FormStatus::Submitting {
            debug!(form = self.definition.id, status = ?self.status, "ignoring completion");
            return;
        }
        self.status = match outcome {
            Ok(()) => FormStatus::Success,
            Err(failure) => FormStatus::Failure(failure),
        };
    }

    /// Message of the last failed submission.
    pub fn form_error(&self) -> Option<&str> {
        match &self.status {
            FormStatus::Failure(failure) => Some(&failure.message),
            _ => None,
        }
    }

    /// Render every field with its value and visible error.
    pub fn view(&self, action: &str, session_id: &str) -> Result<FormView> {
        let mut sections = Vec::with_capacity(self.definition.sections().len());
        for section in self.definition.sections() {
            let mut rows = Vec::with_capacity(section.rows.len());
            for row in &section.rows {
                let mut fields = Vec::with_capacity(row.len());
                for name in row {
                    let field = self
                        .definition
                        .field(name)
                        .ok_or_else(|| FormError::UnknownField(name.clone()))?;
                    let empty = FieldValue::Empty;
                    let value = self.values.get(name).unwrap_or(&empty);
                    fields.push(render_field(field, value, self.visible_error(name))?);
                }
                rows.push(fields);
            }
            sections.push(SectionView {
                title: section.title.clone(),
                rows,
            });
        }

        Ok(FormView {
            form_id: self.definition.id.to_string(),
            title: self.definition.title.clone(),
            subtitle: self.definition.subtitle.clone(),
            action: action.to_string(),
            multipart: self.definition.multipart,
            session_id: session_id.to_string(),
            sections,
            form_error: self.form_error().map(str::to_string),
            submit_label: self.definition.submit_label.clone(),
            submit_disabled: self.is_submit_disabled(),
        })
    }

    fn revalidate(&mut self, name: &str) {
        let record = R::from_values(&self.values);
        match record.validate() {
            Ok(()) => {
                self.errors.clear();
            }
            Err(errors) => match errors.for_field(name) {
                Some(message) => {
                    self.errors.insert(name.to_string(), message.to_string());
                }
                None => {
                    self.errors.remove(name);
                }
            },
        }
    }
}

impl<R> ChangeSink for FormController<R>
where
    R: FromFormValues + Validate,
{
    fn on_change(&mut self, name: &str, value: FieldValue) {
        self.values.set(name, value);
        self.touched.insert(name.to_string());
        self.input_errors.remove(name);
        self.revalidate(name);
    }

    fn on_invalid(&mut self, name: &str, message: String) {
        self.touched.insert(name.to_string());
        self.input_errors.insert(name.to_string(), message);
    }
}
