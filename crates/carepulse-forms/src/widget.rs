use serde::Serialize;

use crate::field::{FieldType, Icon};

/// Country preselected by phone inputs.
pub const DEFAULT_PHONE_COUNTRY: &str = "US";

/// Concrete control produced for a field, with its bound value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Widget {
    TextInput {
        value: String,
        placeholder: Option<String>,
        icon: Option<Icon>,
        disabled: bool,
    },
    TextArea {
        value: String,
        placeholder: Option<String>,
        disabled: bool,
    },
    PhoneInput {
        value: String,
        placeholder: Option<String>,
        default_country: &'static str,
        international: bool,
        disabled: bool,
    },
    /// Carries its own label; the field wrapper renders none.
    Checkbox {
        checked: bool,
        label: String,
        disabled: bool,
    },
    DatePicker {
        /// Value in the field's display format.
        display: String,
        /// Value in the form HTML date inputs expect (`YYYY-MM-DD` or
        /// `YYYY-MM-DDTHH:MM`).
        value: String,
        date_format: String,
        show_time_select: bool,
        disabled: bool,
    },
    Select {
        options: Vec<ChoiceOption>,
        placeholder: Option<String>,
        disabled: bool,
    },
    RadioGroup {
        options: Vec<ChoiceOption>,
        disabled: bool,
    },
    FileUploader {
        file_name: Option<String>,
        accept: String,
        /// Accepted kinds and size limit, shown under the control.
        hint: String,
        disabled: bool,
    },
}

impl Widget {
    /// Name of the HTML template rendering this widget.
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::TextInput { .. } => "text_input",
            Self::TextArea { .. } => "text_area",
            Self::PhoneInput { .. } => "phone_input",
            Self::Checkbox { .. } => "checkbox",
            Self::DatePicker { .. } => "date_picker",
            Self::Select { .. } => "select",
            Self::RadioGroup { .. } => "radio_group",
            Self::FileUploader { .. } => "file_uploader",
        }
    }

    pub fn labels_itself(&self) -> bool {
        matches!(self, Self::Checkbox { .. })
    }
}

/// An option as rendered, flagged when it holds the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
    pub image: Option<String>,
    pub selected: bool,
}

/// A field ready to be displayed: label, widget and the message of the
/// first violated rule, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedField {
    pub name: String,
    pub field_type: FieldType,
    pub label: Option<String>,
    pub widget: Widget,
    pub error: Option<String>,
}

/// Group of rows under an optional heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub title: Option<String>,
    pub rows: Vec<Vec<RenderedField>>,
}

/// Everything needed to display a form page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub form_id: String,
    pub title: String,
    pub subtitle: String,
    pub action: String,
    pub multipart: bool,
    pub session_id: String,
    pub sections: Vec<SectionView>,
    /// Message of a failed submission, shown above the fields.
    pub form_error: Option<String>,
    pub submit_label: String,
    pub submit_disabled: bool,
}
