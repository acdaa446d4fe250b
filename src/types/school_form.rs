//! The school form contract.
//!
//! `SCHOOL_FORM` is the single description of every submitted field. The
//! server validates against it through `SchoolForm`, and the form-rendering
//! layer fetches it from `GET /api/schools/form`.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::db::NewSchool;

/// Minimum number of digits in a contact number.
pub const CONTACT_MIN_DIGITS: usize = 10;

/// Default cap for an uploaded image: 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Multipart part name carrying the image file.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    Text,
    Digits { min_len: usize },
    Email,
    Image { accept: &'static str },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldRule {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub rule: Rule,
}

pub const SCHOOL_FORM: &[FieldRule] = &[
    FieldRule {
        name: "name",
        label: "School Name",
        required: true,
        rule: Rule::Text,
    },
    FieldRule {
        name: "address",
        label: "Address",
        required: true,
        rule: Rule::Text,
    },
    FieldRule {
        name: "city",
        label: "City",
        required: true,
        rule: Rule::Text,
    },
    FieldRule {
        name: "state",
        label: "State",
        required: true,
        rule: Rule::Text,
    },
    FieldRule {
        name: "contact",
        label: "Contact Number",
        required: true,
        rule: Rule::Digits {
            min_len: CONTACT_MIN_DIGITS,
        },
    },
    FieldRule {
        name: "email_id",
        label: "Email ID",
        required: true,
        rule: Rule::Email,
    },
    FieldRule {
        name: IMAGE_FIELD,
        label: "School Image",
        required: true,
        rule: Rule::Image { accept: "image/*" },
    },
];

/// Serialized form contract, including the configured image cap.
#[derive(Debug, Serialize)]
pub struct FormContract {
    pub fields: &'static [FieldRule],
    pub max_image_bytes: u64,
}

/// Text fields of a submission, checked against `SCHOOL_FORM`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct SchoolForm {
    #[validate(length(min = 1, message = "School name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(custom(function = "validate_contact"))]
    pub contact: String,
    #[validate(custom(function = "validate_email_id"))]
    pub email_id: String,
}

impl SchoolForm {
    /// Builds the form from raw multipart text fields. Absent keys become empty
    /// strings so the required checks report them.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let take = |key: &str| fields.get(key).cloned().unwrap_or_default();
        Self {
            name: take("name"),
            address: take("address"),
            city: take("city"),
            state: take("state"),
            contact: take("contact"),
            email_id: take("email_id"),
        }
    }

    pub fn into_new_school(self) -> NewSchool {
        NewSchool {
            name: self.name,
            address: self.address,
            city: self.city,
            state: self.state,
            contact: self.contact,
            email_id: self.email_id,
        }
    }
}

fn validate_contact(contact: &str) -> Result<(), ValidationError> {
    if contact.is_empty() {
        return Err(field_error("required", "Contact is required"));
    }
    if !contact.bytes().all(|b| b.is_ascii_digit()) {
        return Err(field_error("digits", "Contact must be a number"));
    }
    if contact.len() < CONTACT_MIN_DIGITS {
        return Err(field_error(
            "min_digits",
            format!("Contact must be at least {CONTACT_MIN_DIGITS} digits"),
        ));
    }
    Ok(())
}

fn validate_email_id(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(field_error("required", "Email is required"));
    }
    if !email.validate_email() {
        return Err(field_error("email", "Must be a valid email"));
    }
    Ok(())
}

fn field_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}
