//! Patient intake records and the fixed reference lists they draw from.

use crate::error::{CoreError, Result};
use crate::time::today_utc;
use crate::values::{FieldValue, FormValues, FromFormValues};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownGender(s.to_string()))
    }
}

/// Accepted identification document kinds.
pub const IDENTIFICATION_TYPES: &[&str] = &[
    "Birth Certificate",
    "Driver's License",
    "Medical Insurance Card/Policy",
    "Military ID Card",
    "National Identity Card",
    "Passport",
    "Resident Alien Card (Green Card)",
    "Social Security Card",
    "State ID Card",
    "Student ID Card",
    "Voter ID Card",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct IdentificationType(&'static str);

impl IdentificationType {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn all() -> impl Iterator<Item = IdentificationType> {
        IDENTIFICATION_TYPES.iter().map(|t| IdentificationType(*t))
    }
}

impl Default for IdentificationType {
    fn default() -> Self {
        Self(IDENTIFICATION_TYPES[0])
    }
}

impl FromStr for IdentificationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        IDENTIFICATION_TYPES
            .iter()
            .find(|t| **t == s.trim())
            .map(|t| IdentificationType(*t))
            .ok_or_else(|| CoreError::UnknownIdentificationType(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for IdentificationType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

impl From<IdentificationType> for String {
    fn from(value: IdentificationType) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for IdentificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A physician patients can pick as their primary doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub name: &'static str,
    pub image: &'static str,
}

pub const DOCTORS: &[Doctor] = &[
    Doctor { name: "John Green", image: "/assets/images/dr-green.png" },
    Doctor { name: "Leila Cameron", image: "/assets/images/dr-cameron.png" },
    Doctor { name: "David Livingston", image: "/assets/images/dr-livingston.png" },
    Doctor { name: "Evan Peter", image: "/assets/images/dr-peter.png" },
    Doctor { name: "Jane Powell", image: "/assets/images/dr-powell.png" },
    Doctor { name: "Alex Ramirez", image: "/assets/images/dr-remirez.png" },
    Doctor { name: "Jasmine Lee", image: "/assets/images/dr-lee.png" },
    Doctor { name: "Alyana Cruz", image: "/assets/images/dr-cruz.png" },
    Doctor { name: "Hardik Sharma", image: "/assets/images/dr-sharma.png" },
];

pub fn find_doctor(name: &str) -> Option<&'static Doctor> {
    DOCTORS.iter().find(|d| d.name == name)
}

/// Binary upload attached to a form, e.g. a scanned identification document.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Bytes,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// First-step sign-up details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserParams {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl FromFormValues for UserParams {
    fn from_values(values: &FormValues) -> Self {
        Self {
            name: values.text("name"),
            email: values.text("email"),
            phone: values.text("phone"),
        }
    }
}

/// A user account in the backend user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Candidate patient registration as entered in the registration form.
///
/// Optional typed fields hold `None` when the input was empty or could not be
/// interpreted; the validation schema decides whether that is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, with = "crate::time::serde_iso_date")]
    pub birth_date: Option<Date>,
    #[serde(default)]
    pub gender: Option<Gender>,
    pub address: String,
    pub occupation: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub primary_physician: String,
    pub insurance_provider: String,
    pub insurance_policy_number: String,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub current_medications: Option<String>,
    #[serde(default)]
    pub family_medical_history: Option<String>,
    #[serde(default)]
    pub past_medical_history: Option<String>,
    #[serde(default)]
    pub identification_type: Option<IdentificationType>,
    #[serde(default)]
    pub identification_number: Option<String>,
    #[serde(skip)]
    pub identification_document: Option<Attachment>,
    pub treatment_consent: bool,
    pub disclosure_consent: bool,
    pub privacy_consent: bool,
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            birth_date: Some(today_utc()),
            gender: Some(Gender::Male),
            address: String::new(),
            occupation: String::new(),
            emergency_contact_name: String::new(),
            emergency_contact_number: String::new(),
            primary_physician: String::new(),
            insurance_provider: String::new(),
            insurance_policy_number: String::new(),
            allergies: None,
            current_medications: None,
            family_medical_history: None,
            past_medical_history: None,
            identification_type: Some(IdentificationType::default()),
            identification_number: None,
            identification_document: None,
            treatment_consent: false,
            disclosure_consent: false,
            privacy_consent: false,
        }
    }
}

impl PatientRecord {
    /// Initial registration form values, prefilled from the signed-up user.
    pub fn default_values(user: Option<&User>) -> FormValues {
        let defaults = PatientRecord::default();
        let mut values = FormValues::new();
        values.set("name", user.map(|u| u.name.clone()).unwrap_or_default());
        values.set("email", user.map(|u| u.email.clone()).unwrap_or_default());
        values.set("phone", user.map(|u| u.phone.clone()).unwrap_or_default());
        if let Some(date) = defaults.birth_date {
            values.set("birthDate", FieldValue::Date(date));
        }
        if let Some(gender) = defaults.gender {
            values.set("gender", gender.as_str());
        }
        for key in [
            "address",
            "occupation",
            "emergencyContactName",
            "emergencyContactNumber",
            "primaryPhysician",
            "insurancePolicyNumber",
            "insuranceProvider",
            "allergies",
            "currentMedications",
            "familyMedicalHistory",
            "pastMedicalHistory",
            "identificationNumber",
        ] {
            values.set(key, "");
        }
        if let Some(kind) = defaults.identification_type {
            values.set("identificationType", kind.as_str());
        }
        values.set("identificationDocument", FieldValue::Empty);
        for key in ["treatmentConsent", "disclosureConsent", "privacyConsent"] {
            values.set(key, false);
        }
        values
    }
}

impl FromFormValues for PatientRecord {
    fn from_values(values: &FormValues) -> Self {
        Self {
            name: values.text("name"),
            email: values.text("email"),
            phone: values.text("phone"),
            birth_date: values.date("birthDate"),
            gender: values.opt_text("gender").and_then(|g| g.parse().ok()),
            address: values.text("address"),
            occupation: values.text("occupation"),
            emergency_contact_name: values.text("emergencyContactName"),
            emergency_contact_number: values.text("emergencyContactNumber"),
            primary_physician: values.text("primaryPhysician"),
            insurance_provider: values.text("insuranceProvider"),
            insurance_policy_number: values.text("insurancePolicyNumber"),
            allergies: values.opt_text("allergies"),
            current_medications: values.opt_text("currentMedications"),
            family_medical_history: values.opt_text("familyMedicalHistory"),
            past_medical_history: values.opt_text("pastMedicalHistory"),
            identification_type: values
                .opt_text("identificationType")
                .and_then(|t| t.parse().ok()),
            identification_number: values.opt_text("identificationNumber"),
            identification_document: values.attachment("identificationDocument"),
            treatment_consent: values.flag("treatmentConsent"),
            disclosure_consent: values.flag("disclosureConsent"),
            privacy_consent: values.flag("privacyConsent"),
        }
    }
}
