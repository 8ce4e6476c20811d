use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const FULL_NAME_MAX: usize = 255;
pub const PHONE_MAX: usize = 20;
pub const EMAIL_MAX: usize = 320;
pub const JOB_TITLE_MAX: usize = 255;
pub const PLATFORM_MAX: usize = 50;
pub const OPEN_ID_MAX: usize = 64;
pub const LOGIN_METHOD_MAX: usize = 64;

/// Validation failures raised before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid status '{0}': expected one of pending, reviewed, shortlisted, rejected")]
    InvalidStatus(String),
    #[error("invalid role '{0}': expected user or admin")]
    InvalidRole(String),
}

/// Review workflow state of an applicant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantStatus {
    #[default]
    Pending,
    Reviewed,
    Shortlisted,
    Rejected,
}

impl ApplicantStatus {
    pub const ALL: [ApplicantStatus; 4] = [
        Self::Pending,
        Self::Reviewed,
        Self::Shortlisted,
        Self::Rejected,
    ];

    /// Returns the canonical database representation for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Reviewed => "Reviewed",
            Self::Shortlisted => "Shortlisted",
            Self::Rejected => "Rejected",
        }
    }
}

impl FromStr for ApplicantStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ValidationError::InvalidStatus(value.to_string()))
    }
}

impl fmt::Display for ApplicantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition channel of an applicant.
///
/// Known short codes map to dedicated variants; anything else is carried
/// through verbatim so new channels do not need a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    Facebook,
    Instagram,
    Organic,
    Other(String),
}

impl Platform {
    pub fn from_code(code: &str) -> Self {
        match code {
            "fb" => Self::Facebook,
            "ig" => Self::Instagram,
            "organic" => Self::Organic,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Facebook => "fb",
            Self::Instagram => "ig",
            Self::Organic => "organic",
            Self::Other(code) => code,
        }
    }

    /// Organic applicants arrived without a paid campaign.
    pub fn is_organic(&self) -> bool {
        matches!(self, Self::Organic)
    }

    /// Human readable channel name shown on the applicant card.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Self::Facebook => Cow::Borrowed("Facebook"),
            Self::Instagram => Cow::Borrowed("Instagram"),
            Self::Organic => Cow::Borrowed("Organic"),
            Self::Other(code) => Cow::Owned(code.to_uppercase()),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Facebook => "📱",
            Self::Instagram => "📸",
            Self::Organic => "✨",
            Self::Other(_) => "•",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// Applicant record as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Applicant {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub job_title: String,
    pub platform: Platform,
    pub status: ApplicantStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Applicant {
    /// Derived from the platform; there is no independent flag to drift.
    pub fn is_organic(&self) -> bool {
        self.platform.is_organic()
    }
}

impl Serialize for Applicant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Applicant", 11)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("fullName", &self.full_name)?;
        state.serialize_field("phone", &self.phone)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("jobTitle", &self.job_title)?;
        state.serialize_field("platform", &self.platform)?;
        state.serialize_field("isOrganic", &self.is_organic())?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("notes", &self.notes)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("updatedAt", &self.updated_at)?;
        state.end()
    }
}

/// Unvalidated applicant input as received from a client or the seed file.
///
/// Every field defaults to empty so an absent key surfaces as
/// [`ValidationError::Missing`] rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDraft {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub platform: String,
}

/// Validated insert payload. Only obtainable through [`TryFrom<ApplicantDraft>`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplicant {
    full_name: String,
    phone: String,
    email: String,
    job_title: String,
    platform: Platform,
}

impl NewApplicant {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn job_title(&self) -> &str {
        &self.job_title
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl TryFrom<ApplicantDraft> for NewApplicant {
    type Error = ValidationError;

    fn try_from(draft: ApplicantDraft) -> Result<Self, Self::Error> {
        let full_name = required_text("fullName", &draft.full_name, FULL_NAME_MAX)?;
        let phone = required_text("phone", &draft.phone, PHONE_MAX)?;
        let email = required_text("email", &draft.email, EMAIL_MAX)?;
        let job_title = required_text("jobTitle", &draft.job_title, JOB_TITLE_MAX)?;
        let platform = required_text("platform", &draft.platform, PLATFORM_MAX)?;

        Ok(Self {
            full_name,
            phone,
            email,
            job_title,
            platform: Platform::from_code(&platform),
        })
    }
}

/// Reviewer action on an applicant: a new status and optionally new notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ApplicantStatus,
    /// `None` keeps the stored notes; `Some("")` clears them.
    pub notes: Option<String>,
}

impl StatusChange {
    pub fn parse(status: &str, notes: Option<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            status: status.trim().parse()?,
            notes,
        })
    }
}

/// Role assigned to an authenticated user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::InvalidRole(other.to_string())),
        }
    }
}

/// Authenticated identity as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

/// Identity details presented on a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    open_id: String,
    name: Option<String>,
    email: Option<String>,
    login_method: Option<String>,
}

impl SignIn {
    pub fn new(
        open_id: &str,
        name: Option<String>,
        email: Option<String>,
        login_method: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            open_id: required_text("openId", open_id, OPEN_ID_MAX)?,
            name: name.filter(|value| !value.trim().is_empty()),
            email: optional_text("email", email, EMAIL_MAX)?,
            login_method: optional_text("loginMethod", login_method, LOGIN_METHOD_MAX)?,
        })
    }

    pub fn open_id(&self) -> &str {
        &self.open_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn login_method(&self) -> Option<&str> {
        self.login_method.as_deref()
    }
}

fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(text) if !text.trim().is_empty() => required_text(field, &text, max).map(Some),
        _ => Ok(None),
    }
}
