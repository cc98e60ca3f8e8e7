//! Validation schemas for the sign-up and registration forms.
//!
//! Schemas are pure and synchronous: they never perform I/O, so controllers can
//! run them on every edit. Violations are reported per field, in form
//! declaration order.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use crate::patient::{PatientRecord, UserParams, find_doctor};

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[1-9]\d{1,14}$").expect("valid phone regex")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
        .expect("valid email regex")
});

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_REGEX.is_match(email)
}

/// One rule violation on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Ordered set of violations produced by a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{} ({})", v.message, v.field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.violations.iter()
    }

    /// First message reported for a field.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.violations
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.message.as_str())
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// A record that can be checked against its schema.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Declarative rule builder. Each call checks one field and records at most
/// one message for it.
struct Rules {
    errors: ValidationErrors,
}

impl Rules {
    fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize, label: &str) -> &mut Self {
        let len = value.chars().count();
        if len < min {
            self.errors
                .push(field, format!("{label} must be at least {min} characters"));
        } else if len > max {
            self.errors
                .push(field, format!("{label} must be at most {max} characters"));
        }
        self
    }

    fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_email(value) {
            self.errors.push(field, "Invalid email address");
        }
        self
    }

    fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_phone(value) {
            self.errors.push(field, "Invalid phone number");
        }
        self
    }

    fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(field, message);
        }
        self
    }

    fn finish(&mut self) -> Result<(), ValidationErrors> {
        std::mem::take(&mut self.errors).into_result()
    }
}

impl Validate for UserParams {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Rules::new()
            .length("name", &self.name, 2, 50, "Name")
            .email("email", &self.email)
            .phone("phone", &self.phone)
            .finish()
    }
}

impl Validate for PatientRecord {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Rules::new()
            .length("name", &self.name, 2, 50, "Name")
            .email("email", &self.email)
            .phone("phone", &self.phone)
            .check("birthDate", self.birth_date.is_some(), "Birth date is required")
            .check("gender", self.gender.is_some(), "Select a gender")
            .length("address", &self.address, 5, 500, "Address")
            .length("occupation", &self.occupation, 2, 500, "Occupation")
            .length(
                "emergencyContactName",
                &self.emergency_contact_name,
                2,
                50,
                "Contact name",
            )
            .phone("emergencyContactNumber", &self.emergency_contact_number)
            .check(
                "primaryPhysician",
                find_doctor(&self.primary_physician).is_some(),
                "Select at least one doctor",
            )
            .length(
                "insuranceProvider",
                &self.insurance_provider,
                2,
                50,
                "Insurance name",
            )
            .length(
                "insurancePolicyNumber",
                &self.insurance_policy_number,
                2,
                50,
                "Policy number",
            )
            .check(
                "treatmentConsent",
                self.treatment_consent,
                "You must consent to treatment in order to proceed",
            )
            .check(
                "disclosureConsent",
                self.disclosure_consent,
                "You must consent to disclosure in order to proceed",
            )
            .check(
                "privacyConsent",
                self.privacy_consent,
                "You must consent to privacy in order to proceed",
            )
            .finish()
    }
}
