//! Form layer of the CarePulse intake flow.
//!
//! Forms are declared statically as [`FormDefinition`]s made of
//! [`FormFieldDescriptor`]s. [`render_field`] maps each descriptor to a
//! [`Widget`], [`HtmlRenderer`] turns widgets into server-side HTML and the
//! [`FormController`] tracks values, per-field errors and the submission
//! lifecycle of one rendered form.

pub mod controller;
pub mod definitions;
pub mod error;
pub mod field;
pub mod html;
pub mod render;
pub mod widget;

pub use controller::{FormController, FormFailure, FormStatus, SubmitRejected};
pub use definitions::{FormDefinition, Section, register_form, user_form};
pub use error::{FormError, Result};
pub use field::{FieldType, FormFieldDescriptor, Icon, SelectOption};
pub use html::HtmlRenderer;
pub use render::{
    ChangeSink, CustomRender, FileUploader, RadioGroup, RawInput, apply_input, parse_input,
    render_field,
};
pub use widget::{ChoiceOption, FormView, RenderedField, SectionView, Widget};
