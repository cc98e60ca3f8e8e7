pub mod error;
pub mod id;
pub mod patient;
pub mod time;
pub mod validation;
pub mod values;

pub use error::{CoreError, Result};
pub use id::{generate_id, validate_id};
pub use patient::{
    Attachment, DOCTORS, Doctor, Gender, IDENTIFICATION_TYPES, IdentificationType, PatientRecord,
    User, UserParams, find_doctor,
};
pub use self::time::{DEFAULT_DATE_FORMAT, DateFormat, today_utc};
pub use validation::{FieldViolation, Validate, ValidationErrors, is_valid_email, is_valid_phone};
pub use values::{FieldValue, FormValues, FromFormValues};
