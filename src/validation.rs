//! Stage schemas for incoming lead payloads.
//!
//! Each stage's JSON Schema is derived from its typed model in [`crate::models`],
//! so the `#[serde(flatten)]` embedding of the previous stage carries over to the
//! schema chain. A payload is checked against the compiled schema first so that
//! every violated field is reported at once, then deserialized.

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{Draft, JSONSchema, ValidationError};
use regex::Regex;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use crate::errors::AppError;
use crate::models::*;

/// Custom `format` names checked by the compiled validators.
const PHONE_FORMAT: &str = "de-phone";
const EMAIL_FORMAT: &str = "lead-email";
const PICTURE_URL_FORMAT: &str = "picture-url";

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted path from the payload root, e.g. `contact.contactInformation.phone`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

// ============ Contact Newtypes ============

/// A German phone number with all whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Trims, strips every whitespace character and requires the `+49` prefix.
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("Phone number is required");
        }

        let normalized: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        if !normalized.starts_with("+49") {
            return Err("Phone number must start with +49");
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl JsonSchema for PhoneNumber {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        "PhoneNumber".to_string()
    }

    fn json_schema(_: &mut SchemaGenerator) -> Schema {
        formatted_string(PHONE_FORMAT)
    }
}

/// A syntactically valid email address, stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        if is_valid_email(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err("Invalid email address")
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl JsonSchema for EmailAddress {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        "EmailAddress".to_string()
    }

    fn json_schema(_: &mut SchemaGenerator) -> Schema {
        formatted_string(EMAIL_FORMAT)
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@(?:[a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
            .expect("email regex is valid")
    })
}

/// Validate email address
///
/// Local part may not start with a dot or contain `..`; the domain needs at
/// least one dot and an alphabetic TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    if email.starts_with('.') || email.contains("..") {
        return false;
    }
    email_regex().is_match(email)
}

/// Picture URLs must be absolute.
pub fn is_valid_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok()
}

fn is_valid_phone(raw: &str) -> bool {
    PhoneNumber::parse(raw).is_ok()
}

// ============ Schema Fragments ============

fn formatted_string(format: &str) -> Schema {
    SchemaObject {
        instance_type: Some(InstanceType::String.into()),
        format: Some(format.to_string()),
        ..Default::default()
    }
    .into()
}

/// `version` must be the literal [`SCHEMA_VERSION`].
pub fn version_schema(_: &mut SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(InstanceType::String.into()),
        const_value: Some(Value::String(SCHEMA_VERSION.to_string())),
        ..Default::default()
    }
    .into()
}

pub fn picture_url_schema(_: &mut SchemaGenerator) -> Schema {
    formatted_string(PICTURE_URL_FORMAT)
}

// ============ Compiled Stage Validators ============

struct StageValidators {
    minimal: JSONSchema,
    qualification: JSONSchema,
    discovery: JSONSchema,
    selling: JSONSchema,
}

impl StageValidators {
    fn compile() -> Result<Self, String> {
        Ok(Self {
            minimal: compile::<MinimalLead>()?,
            qualification: compile::<QualificationLead>()?,
            discovery: compile::<DiscoveryLead>()?,
            selling: compile::<SellingLead>()?,
        })
    }

    fn for_stage(&self, stage: LeadStage) -> &JSONSchema {
        match stage {
            LeadStage::Minimal => &self.minimal,
            LeadStage::Qualification => &self.qualification,
            LeadStage::Discovery => &self.discovery,
            LeadStage::Selling => &self.selling,
        }
    }
}

fn compile<T: JsonSchema>() -> Result<JSONSchema, String> {
    let schema = serde_json::to_value(schema_for!(T))
        .map_err(|e| format!("Failed to serialize {} schema: {e}", T::schema_name()))?;

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .with_format(PHONE_FORMAT, is_valid_phone)
        .with_format(EMAIL_FORMAT, is_valid_email)
        .with_format(PICTURE_URL_FORMAT, is_valid_url)
        .compile(&schema)
        .map_err(|e| format!("Failed to compile {} schema: {e}", T::schema_name()))
}

/// Validators are compiled once per process.
fn validators() -> Result<&'static StageValidators, AppError> {
    static VALIDATORS: OnceLock<Result<StageValidators, String>> = OnceLock::new();
    VALIDATORS
        .get_or_init(StageValidators::compile)
        .as_ref()
        .map_err(|e| AppError::InternalError(e.clone()))
}

// ============ Violation Mapping ============

/// JSON pointer (`/a/b/0`) to dotted path (`a.b.0`).
fn dotted_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn quoted_choices(options: &Value) -> String {
    options
        .as_array()
        .map(|values| {
            values
                .iter()
                .map(|v| format!("'{}'", v.as_str().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .unwrap_or_default()
}

fn min_length_message(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or_default() {
        "firstName" => "First name is required",
        "lastName" => "Last name is required",
        "street" => "Street is required",
        "city" => "City is required",
        "postalCode" => "Postal code is required",
        "countryCode" => "Country code is required",
        _ => "Must not be empty",
    }
}

fn format_message(format: &str, instance: &Value) -> String {
    match format {
        PHONE_FORMAT => PhoneNumber::parse(instance.as_str().unwrap_or_default())
            .err()
            .unwrap_or("Invalid phone number")
            .to_string(),
        EMAIL_FORMAT => "Invalid email address".to_string(),
        PICTURE_URL_FORMAT => "Picture URL must be valid".to_string(),
        other => format!("Invalid {}", other),
    }
}

/// Whether the violation is a type mismatch, which masks the value checks on
/// the same field.
fn to_violation(error: &ValidationError<'_>) -> (FieldViolation, bool) {
    let path = dotted_path(&error.instance_path.to_string());
    let instance: &Value = &error.instance;

    let (path, message, is_type) = match &error.kind {
        ValidationErrorKind::Required { property } => (
            join(&path, property.as_str().unwrap_or_default()),
            "Required".to_string(),
            false,
        ),
        ValidationErrorKind::Type { kind } => {
            let expected = match kind {
                TypeKind::Single(expected) => expected.to_string(),
                TypeKind::Multiple(_) => "a different type".to_string(),
            };
            let message = format!("Expected {}, received {}", expected, type_name(instance));
            (path, message, true)
        }
        ValidationErrorKind::Enum { options } => {
            let message = format!(
                "Invalid enum value. Expected {}, received '{}'",
                quoted_choices(options),
                instance.as_str().unwrap_or_default()
            );
            (path, message, false)
        }
        ValidationErrorKind::Constant { expected_value } => {
            let message = format!("Invalid literal value, expected {}", expected_value);
            (path, message, false)
        }
        ValidationErrorKind::MinLength { .. } => {
            let message = min_length_message(&path).to_string();
            (path, message, false)
        }
        ValidationErrorKind::Format { format } => {
            let format: &str = format.as_ref();
            (path, format_message(format, instance), false)
        }
        _ => (path, error.to_string(), false),
    };

    (FieldViolation { path, message }, is_type)
}

// ============ Entry Points ============

/// Reads the `leadStage` discriminator. An absent tag means `minimal`.
pub fn stage_of(payload: &Value) -> Result<LeadStage, FieldViolation> {
    let invalid = || FieldViolation {
        path: "leadStage".to_string(),
        message: "Invalid discriminator value. Expected 'selling' | 'discovery' | 'qualification' | 'minimal'"
            .to_string(),
    };

    match payload.get("leadStage") {
        None => Ok(LeadStage::default()),
        Some(Value::String(s)) => s.parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Checks `payload` against the schema of `stage` and returns every violation,
/// ordered by path.
///
/// The payload's own `leadStage` is ignored, so a payload can be checked
/// against any stage.
pub fn check_stage(stage: LeadStage, payload: &Value) -> Result<Vec<FieldViolation>, AppError> {
    let validator = validators()?.for_stage(stage);

    let Err(errors) = validator.validate(payload) else {
        return Ok(Vec::new());
    };

    let found: Vec<(FieldViolation, bool)> = errors.map(|e| to_violation(&e)).collect();
    let mut violations: Vec<FieldViolation> = found
        .iter()
        .filter(|(violation, is_type)| {
            *is_type
                || !found
                    .iter()
                    .any(|(other, other_is_type)| *other_is_type && other.path == violation.path)
        })
        .map(|(violation, _)| violation.clone())
        .collect();

    violations.sort_by(|a, b| a.path.cmp(&b.path));
    violations.dedup();
    Ok(violations)
}

fn typed<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, AppError> {
    serde_json::from_value(payload.clone()).map_err(|e| {
        AppError::Validation(vec![FieldViolation {
            path: String::new(),
            message: e.to_string(),
        }])
    })
}

/// Validates and normalizes a raw payload into a typed [`LeadRequest`].
///
/// Dispatches on `leadStage`, reports every violated field at once and
/// normalizes the contact phone. Unknown keys are dropped.
pub fn parse_lead(payload: &Value) -> Result<LeadRequest, AppError> {
    let stage = if payload.is_object() {
        stage_of(payload).map_err(|v| AppError::Validation(vec![v]))?
    } else {
        LeadStage::Minimal
    };

    let violations = check_stage(stage, payload)?;
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    Ok(match stage {
        LeadStage::Minimal => LeadRequest::Minimal(typed(payload)?),
        LeadStage::Qualification => LeadRequest::Qualification(typed(payload)?),
        LeadStage::Discovery => LeadRequest::Discovery(typed(payload)?),
        LeadStage::Selling => LeadRequest::Selling(typed(payload)?),
    })
}
