//! Static field descriptors.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use carepulse_core::DEFAULT_DATE_FORMAT;
use serde::Serialize;

use crate::error::FormError;
use crate::render::CustomRender;

/// Kind of input a field renders as. The set is closed; a tag that does not
/// name one of these variants is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Input,
    Textarea,
    Phone,
    Checkbox,
    DatePicker,
    Select,
    /// Rendered by the field's [`CustomRender`].
    Custom,
}

impl FieldType {
    pub const ALL: [FieldType; 7] = [
        Self::Input,
        Self::Textarea,
        Self::Phone,
        Self::Checkbox,
        Self::DatePicker,
        Self::Select,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Textarea => "textarea",
            Self::Phone => "phone",
            Self::Checkbox => "checkbox",
            Self::DatePicker => "datePicker",
            Self::Select => "select",
            Self::Custom => "skeleton",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" | "text" => Ok(Self::Input),
            "textarea" | "multiline" => Ok(Self::Textarea),
            "phone" | "phoneInput" => Ok(Self::Phone),
            "checkbox" => Ok(Self::Checkbox),
            "datePicker" | "date" => Ok(Self::DatePicker),
            "select" => Ok(Self::Select),
            "skeleton" | "custom" => Ok(Self::Custom),
            other => Err(FormError::UnknownFieldType(other.to_string())),
        }
    }
}

/// Decorative icon shown inside a text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub src: String,
    pub alt: String,
}

/// One choice of a select or radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Declaration of one form field. Built once per form definition and never
/// mutated afterwards.
#[derive(Clone)]
pub struct FormFieldDescriptor {
    pub field_type: FieldType,
    pub name: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub icon: Option<Icon>,
    pub disabled: bool,
    pub date_format: String,
    pub show_time_select: bool,
    pub options: Vec<SelectOption>,
    pub custom: Option<Arc<dyn CustomRender>>,
}

impl FormFieldDescriptor {
    pub fn new(field_type: FieldType, name: impl Into<String>) -> Self {
        Self {
            field_type,
            name: name.into(),
            label: None,
            placeholder: None,
            icon: None,
            disabled: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            show_time_select: false,
            options: Vec::new(),
            custom: None,
        }
    }

    /// Descriptor whose widget is produced by `renderer`.
    pub fn custom(name: impl Into<String>, renderer: impl CustomRender + 'static) -> Self {
        let mut field = Self::new(FieldType::Custom, name);
        field.custom = Some(Arc::new(renderer));
        field
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn icon(mut self, src: impl Into<String>, alt: impl Into<String>) -> Self {
        self.icon = Some(Icon {
            src: src.into(),
            alt: alt.into(),
        });
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }

    pub fn show_time_select(mut self, show: bool) -> Self {
        self.show_time_select = show;
        self
    }

    pub fn options(mut self, options: impl IntoIterator<Item = SelectOption>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

impl fmt::Debug for FormFieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFieldDescriptor")
            .field("field_type", &self.field_type)
            .field("name", &self.name)
            .field("label", &self.label)
            .field("disabled", &self.disabled)
            .field("options", &self.options.len())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_tags_round_trip() {
        for ty in FieldType::ALL {
            assert_eq!(ty.as_str().parse::<FieldType>().unwrap(), ty);
        }
        assert_eq!("multiline".parse::<FieldType>().unwrap(), FieldType::Textarea);
        assert_eq!("custom".parse::<FieldType>().unwrap(), FieldType::Custom);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "slider".parse::<FieldType>().unwrap_err();
        assert!(matches!(err, FormError::UnknownFieldType(ref t) if t == "slider"));
    }

    #[test]
    fn descriptor_defaults() {
        let field = FormFieldDescriptor::new(FieldType::DatePicker, "birthDate").label("Date of birth");
        assert_eq!(field.date_format, "MM/DD/YYYY");
        assert!(!field.show_time_select);
        assert!(!field.disabled);
        assert_eq!(field.label.as_deref(), Some("Date of birth"));
    }
}
