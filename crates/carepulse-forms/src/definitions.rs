//! The intake forms.

use carepulse_core::{DOCTORS, IdentificationType};

use crate::field::{FieldType, FormFieldDescriptor, SelectOption};
use crate::render::{FileUploader, RadioGroup};

/// Fields sharing a heading, laid out in rows.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: Option<String>,
    pub rows: Vec<Vec<String>>,
}

/// Static layout and field declarations of one form.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    pub id: &'static str,
    pub title: String,
    pub subtitle: String,
    pub submit_label: String,
    /// Posted as `multipart/form-data` because it carries a file.
    pub multipart: bool,
    fields: Vec<FormFieldDescriptor>,
    sections: Vec<Section>,
}

impl FormDefinition {
    pub fn new(id: &'static str, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            subtitle: subtitle.into(),
            submit_label: "Submit".into(),
            multipart: false,
            fields: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    pub fn multipart(mut self) -> Self {
        self.multipart = true;
        self
    }

    /// Append a section. Each inner vector is one row of fields.
    pub fn section(mut self, title: Option<&str>, rows: Vec<Vec<FormFieldDescriptor>>) -> Self {
        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row_names = Vec::with_capacity(row.len());
            for field in row {
                row_names.push(field.name.clone());
                self.fields.push(field);
            }
            names.push(row_names);
        }
        self.sections.push(Section {
            title: title.map(str::to_string),
            rows: names,
        });
        self
    }

    pub fn fields(&self) -> &[FormFieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormFieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

fn input(name: &str, label: &str) -> FormFieldDescriptor {
    FormFieldDescriptor::new(FieldType::Input, name).label(label)
}

fn textarea(name: &str, label: &str, placeholder: &str) -> FormFieldDescriptor {
    FormFieldDescriptor::new(FieldType::Textarea, name)
        .label(label)
        .placeholder(placeholder)
}

fn phone(name: &str, label: &str) -> FormFieldDescriptor {
    FormFieldDescriptor::new(FieldType::Phone, name)
        .label(label)
        .placeholder("(555) 123-4567")
}

fn checkbox(name: &str, label: &str) -> FormFieldDescriptor {
    FormFieldDescriptor::new(FieldType::Checkbox, name).label(label)
}

fn name_field() -> FormFieldDescriptor {
    input("name", "Full name")
        .placeholder("John Doe")
        .icon("/assets/icons/user.svg", "user")
}

fn email_field() -> FormFieldDescriptor {
    input("email", "Email")
        .placeholder("johndoe@gmail.com")
        .icon("/assets/icons/email.svg", "email")
}

/// First step: create the user account.
pub fn user_form() -> FormDefinition {
    FormDefinition::new("user", "Hi there 👋", "Schedule your first appointment.")
        .submit_label("Get Started")
        .section(
            None,
            vec![
                vec![name_field()],
                vec![email_field()],
                vec![phone("phone", "Phone number")],
            ],
        )
}

/// Second step: the full patient registration.
pub fn register_form() -> FormDefinition {
    let physicians = DOCTORS
        .iter()
        .map(|d| SelectOption::new(d.name).with_image(d.image));

    FormDefinition::new("register", "Welcome 👋", "Let us know more about yourself.")
        .submit_label("Submit and Continue")
        .multipart()
        .section(
            Some("Personal Information"),
            vec![
                vec![name_field()],
                vec![email_field(), phone("phone", "Phone number")],
                vec![
                    FormFieldDescriptor::new(FieldType::DatePicker, "birthDate").label("Date of birth"),
                    FormFieldDescriptor::custom("gender", RadioGroup::genders()).label("Gender"),
                ],
                vec![
                    input("address", "Address").placeholder("14th Street, New York"),
                    input("occupation", "Occupation").placeholder("Software Engineer"),
                ],
                vec![
                    input("emergencyContactName", "Emergency contact name").placeholder("Guardian's name"),
                    phone("emergencyContactNumber", "Emergency contact number"),
                ],
            ],
        )
        .section(
            Some("Medical Information"),
            vec![
                vec![
                    FormFieldDescriptor::new(FieldType::Select, "primaryPhysician")
                        .label("Primary care physician")
                        .placeholder("Select a physician")
                        .options(physicians),
                ],
                vec![
                    input("insuranceProvider", "Insurance provider").placeholder("BlueCross BlueShield"),
                    input("insurancePolicyNumber", "Insurance policy number").placeholder("ABC123456789"),
                ],
                vec![
                    textarea("allergies", "Allergies (if any)", "Peanuts, Penicillin, Pollen"),
                    textarea(
                        "currentMedications",
                        "Current medications (if any)",
                        "Ibuprofen 200mg, Paracetamol 500mg",
                    ),
                ],
                vec![
                    textarea("familyMedicalHistory", "Family medical history", "Mother had brain cancer, Father had heart disease"),
                    textarea("pastMedicalHistory", "Past medical history", "Appendectomy, Tonsillectomy"),
                ],
            ],
        )
        .section(
            Some("Identification and Verification"),
            vec![
                vec![
                    FormFieldDescriptor::new(FieldType::Select, "identificationType")
                        .label("Identification type")
                        .placeholder("Select an identification type")
                        .options(IdentificationType::all().map(|t| SelectOption::new(t.as_str()))),
                ],
                vec![input("identificationNumber", "Identification number").placeholder("123456789")],
                vec![
                    FormFieldDescriptor::custom("identificationDocument", FileUploader::default())
                        .label("Scanned copy of identification document"),
                ],
            ],
        )
        .section(
            Some("Consent and Privacy"),
            vec![
                vec![checkbox("treatmentConsent", "I consent to treatment")],
                vec![checkbox("disclosureConsent", "I consent to disclosure of information")],
                vec![checkbox("privacyConsent", "I acknowledge that I have reviewed and agree to the privacy policy")],
            ],
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_form_fields() {
        let form = user_form();
        let names: Vec<&str> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "email", "phone"]);
        assert!(!form.multipart);
    }

    #[test]
    fn register_form_layout() {
        let form = register_form();
        assert!(form.multipart);
        assert_eq!(form.sections().len(), 4);
        assert_eq!(form.fields().len(), 22);

        let physician = form.field("primaryPhysician").unwrap();
        assert_eq!(physician.options.len(), DOCTORS.len());
        assert!(physician.has_option("John Green"));

        let id_type = form.field("identificationType").unwrap();
        assert!(id_type.has_option("Birth Certificate"));
        assert_eq!(id_type.options.len(), 11);

        assert_eq!(form.field("gender").unwrap().field_type, FieldType::Custom);
        assert!(form.field("identificationDocument").unwrap().custom.is_some());
    }
}
