//! Field rendering and input parsing.
//!
//! [`render_field`] turns a descriptor and its bound value into a
//! [`RenderedField`]. [`apply_input`] parses what the browser posted for a
//! field and reports the typed value to a [`ChangeSink`], normally the form
//! controller.

use carepulse_core::time::{
    format_iso_date, format_local_datetime, parse_iso_date, parse_local_datetime,
};
use carepulse_core::{Attachment, DateFormat, FieldValue, Gender};

use crate::error::{FormError, Result};
use crate::field::{FieldType, FormFieldDescriptor, SelectOption};
use crate::widget::{ChoiceOption, DEFAULT_PHONE_COUNTRY, RenderedField, Widget};

/// Rendering capability for [`FieldType::Custom`] fields.
pub trait CustomRender: Send + Sync {
    fn render(&self, field: &FormFieldDescriptor, value: &FieldValue) -> Widget;

    fn parse(&self, field: &FormFieldDescriptor, input: RawInput) -> Result<FieldValue>;
}

/// What the browser posted for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    /// The field was not part of the submission (e.g. an unchecked checkbox).
    Absent,
    Text(String),
    File(Attachment),
}

impl RawInput {
    /// True when the input could stand for a file field left untouched:
    /// nothing posted, an empty value or an empty file part.
    pub fn is_blank_upload(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Text(text) => text.is_empty(),
            Self::File(file) => file.file_name.is_empty() && file.size() == 0,
        }
    }
}

/// Receiver of parsed field input.
pub trait ChangeSink {
    fn on_change(&mut self, name: &str, value: FieldValue);

    /// The posted input could not be interpreted for this field.
    fn on_invalid(&mut self, name: &str, message: String);
}

/// Produce the widget for `field` bound to `value`.
pub fn render_field(
    field: &FormFieldDescriptor,
    value: &FieldValue,
    error: Option<&str>,
) -> Result<RenderedField> {
    let widget = match field.field_type {
        FieldType::Input => Widget::TextInput {
            value: text_of(value),
            placeholder: field.placeholder.clone(),
            icon: field.icon.clone(),
            disabled: field.disabled,
        },
        FieldType::Textarea => Widget::TextArea {
            value: text_of(value),
            placeholder: field.placeholder.clone(),
            disabled: field.disabled,
        },
        FieldType::Phone => Widget::PhoneInput {
            value: text_of(value),
            placeholder: field.placeholder.clone(),
            default_country: DEFAULT_PHONE_COUNTRY,
            international: true,
            disabled: field.disabled,
        },
        FieldType::Checkbox => Widget::Checkbox {
            checked: value.as_flag(),
            label: field.label.clone().unwrap_or_default(),
            disabled: field.disabled,
        },
        FieldType::DatePicker => date_widget(field, value)?,
        FieldType::Select => Widget::Select {
            options: choices(&field.options, value),
            placeholder: field.placeholder.clone(),
            disabled: field.disabled,
        },
        FieldType::Custom => custom_renderer(field)?.render(field, value),
    };

    let label = if widget.labels_itself() {
        None
    } else {
        field.label.clone()
    };

    Ok(RenderedField {
        name: field.name.clone(),
        field_type: field.field_type,
        label,
        widget,
        error: error.map(str::to_string),
    })
}

/// Parse posted input for `field` into a typed value.
pub fn parse_input(field: &FormFieldDescriptor, input: RawInput) -> Result<FieldValue> {
    match field.field_type {
        FieldType::Input | FieldType::Textarea => match input {
            RawInput::Absent => Ok(FieldValue::Text(String::new())),
            RawInput::Text(text) => Ok(FieldValue::Text(text)),
            RawInput::File(_) => Err(unexpected_file(field)),
        },
        FieldType::Phone => match input {
            RawInput::Absent => Ok(FieldValue::Text(String::new())),
            RawInput::Text(text) => Ok(FieldValue::Text(normalize_phone(&text))),
            RawInput::File(_) => Err(unexpected_file(field)),
        },
        FieldType::Checkbox => match input {
            RawInput::Absent => Ok(FieldValue::Flag(false)),
            RawInput::Text(text) => parse_flag(&text)
                .map(FieldValue::Flag)
                .ok_or_else(|| FormError::invalid_input(&field.name, "Invalid checkbox value")),
            RawInput::File(_) => Err(unexpected_file(field)),
        },
        FieldType::DatePicker => match input {
            RawInput::Absent => Ok(FieldValue::Empty),
            RawInput::Text(text) if text.trim().is_empty() => Ok(FieldValue::Empty),
            RawInput::Text(text) => parse_date_input(field, &text),
            RawInput::File(_) => Err(unexpected_file(field)),
        },
        FieldType::Select => match input {
            RawInput::Absent => Ok(FieldValue::Empty),
            RawInput::Text(text) if text.is_empty() => Ok(FieldValue::Empty),
            RawInput::Text(text) if field.has_option(&text) => Ok(FieldValue::Text(text)),
            RawInput::Text(_) => Err(FormError::invalid_input(&field.name, "Select a valid option")),
            RawInput::File(_) => Err(unexpected_file(field)),
        },
        FieldType::Custom => custom_renderer(field)?.parse(field, input),
    }
}

/// Parse `input` and report the outcome to `sink`. Disabled fields are
/// never submitted by browsers and keep their current value.
pub fn apply_input<S>(field: &FormFieldDescriptor, input: RawInput, sink: &mut S)
where
    S: ChangeSink + ?Sized,
{
    if field.disabled {
        return;
    }
    match parse_input(field, input) {
        Ok(value) => sink.on_change(&field.name, value),
        Err(FormError::InvalidInput { message, .. }) => sink.on_invalid(&field.name, message),
        Err(other) => sink.on_invalid(&field.name, other.to_string()),
    }
}

fn custom_renderer(field: &FormFieldDescriptor) -> Result<&dyn CustomRender> {
    field
        .custom
        .as_deref()
        .ok_or_else(|| FormError::MissingCustomRenderer(field.name.clone()))
}

fn unexpected_file(field: &FormFieldDescriptor) -> FormError {
    FormError::invalid_input(&field.name, "Unexpected file upload")
}

fn text_of(value: &FieldValue) -> String {
    value.as_text().unwrap_or_default().to_string()
}

fn choices(options: &[SelectOption], value: &FieldValue) -> Vec<ChoiceOption> {
    let current = value.as_text();
    options
        .iter()
        .map(|o| ChoiceOption {
            value: o.value.clone(),
            label: o.label.clone(),
            image: o.image.clone(),
            selected: current == Some(o.value.as_str()),
        })
        .collect()
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "" | "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Strip separators from a phone number. A bare ten-digit number is read as
/// a national number of the default country.
fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let plus = trimmed.starts_with('+');
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.' | '+'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }
    match (plus, digits.len()) {
        (true, _) => format!("+{digits}"),
        (false, 10) => format!("+1{digits}"),
        (false, _) => digits,
    }
}

fn date_widget(field: &FormFieldDescriptor, value: &FieldValue) -> Result<Widget> {
    let format = DateFormat::new(&field.date_format)?;
    let (display, html_value) = match value {
        FieldValue::Date(date) => (format.format_date(*date)?, format_iso_date(*date)?),
        FieldValue::DateTime(datetime) => (
            format.format_datetime(*datetime)?,
            format_local_datetime(*datetime)?,
        ),
        other => {
            let text = text_of(other);
            (text.clone(), text)
        }
    };
    Ok(Widget::DatePicker {
        display,
        value: html_value,
        date_format: field.date_format.clone(),
        show_time_select: field.show_time_select,
        disabled: field.disabled,
    })
}

fn parse_date_input(field: &FormFieldDescriptor, text: &str) -> Result<FieldValue> {
    let text = text.trim();
    let format = DateFormat::new(&field.date_format)?;
    let parsed = if field.show_time_select {
        parse_local_datetime(text)
            .ok()
            .or_else(|| format.parse_datetime(text).ok())
            .map(FieldValue::DateTime)
    } else {
        parse_iso_date(text)
            .ok()
            .or_else(|| format.parse_date(text).ok())
            .map(FieldValue::Date)
    };
    parsed.ok_or_else(|| FormError::invalid_input(&field.name, "Invalid date"))
}

/// Radio buttons, one per option.
#[derive(Debug, Clone)]
pub struct RadioGroup {
    options: Vec<SelectOption>,
}

impl RadioGroup {
    pub fn new(options: impl IntoIterator<Item = SelectOption>) -> Self {
        Self {
            options: options.into_iter().collect(),
        }
    }

    pub fn genders() -> Self {
        Self::new(Gender::ALL.iter().map(|g| SelectOption::new(g.as_str())))
    }
}

impl CustomRender for RadioGroup {
    fn render(&self, field: &FormFieldDescriptor, value: &FieldValue) -> Widget {
        Widget::RadioGroup {
            options: choices(&self.options, value),
            disabled: field.disabled,
        }
    }

    fn parse(&self, field: &FormFieldDescriptor, input: RawInput) -> Result<FieldValue> {
        match input {
            RawInput::Absent => Ok(FieldValue::Empty),
            RawInput::Text(text) if text.trim().is_empty() => Ok(FieldValue::Empty),
            RawInput::Text(text) => self
                .options
                .iter()
                .find(|o| o.value.eq_ignore_ascii_case(text.trim()))
                .map(|o| FieldValue::Text(o.value.clone()))
                .ok_or_else(|| FormError::invalid_input(&field.name, "Select one of the options")),
            RawInput::File(_) => Err(unexpected_file(field)),
        }
    }
}

/// Single-file upload control.
#[derive(Debug, Clone)]
pub struct FileUploader {
    accept: String,
    max_bytes: usize,
}

impl FileUploader {
    pub const DEFAULT_ACCEPT: &'static str = "image/svg+xml,image/png,image/jpeg,image/gif,application/pdf";
    pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

    pub fn new(accept: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            accept: accept.into(),
            max_bytes,
        }
    }
}

impl Default for FileUploader {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ACCEPT, Self::DEFAULT_MAX_BYTES)
    }
}

fn display_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Human-readable list of the kinds in an `accept` attribute.
fn accepted_kinds(accept: &str) -> String {
    let kinds: Vec<&str> = accept
        .split(',')
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(|kind| match kind {
            "image/svg+xml" => "SVG",
            "image/png" => "PNG",
            "image/jpeg" => "JPG",
            "image/gif" => "GIF",
            "application/pdf" => "PDF",
            "image/*" => "Images",
            other => other,
        })
        .collect();
    match kinds.split_last() {
        None => "Any file".to_string(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}

impl CustomRender for FileUploader {
    fn render(&self, field: &FormFieldDescriptor, value: &FieldValue) -> Widget {
        let file_name = match value {
            FieldValue::File(file) => Some(file.file_name.clone()),
            _ => None,
        };
        Widget::FileUploader {
            file_name,
            accept: self.accept.clone(),
            hint: format!(
                "{} (max. {})",
                accepted_kinds(&self.accept),
                display_size(self.max_bytes)
            ),
            disabled: field.disabled,
        }
    }

    fn parse(&self, field: &FormFieldDescriptor, input: RawInput) -> Result<FieldValue> {
        match input {
            // Browsers post an empty part when no file was chosen.
            input if input.is_blank_upload() => Ok(FieldValue::Empty),
            RawInput::Text(_) => Err(FormError::invalid_input(&field.name, "Expected a file upload")),
            RawInput::File(file) if file.size() > self.max_bytes => Err(FormError::invalid_input(
                &field.name,
                format!("File must be at most {}", display_size(self.max_bytes)),
            )),
            RawInput::File(file) => Ok(FieldValue::File(file)),
            // Covered by the blank-upload guard above.
            RawInput::Absent => Ok(FieldValue::Empty),
        }
    }
}
