//! Domain model for the HVAC applicants portal.
//!
//! Holds the applicant and user records, their validation rules, the bundled
//! seed batch, and the HTML renderer used for the reviewer pages.
pub mod render;
pub mod seed;
pub mod types;

pub use types::{
    Applicant, ApplicantDraft, ApplicantStatus, NewApplicant, Platform, SignIn, StatusChange,
    User, UserRole, ValidationError,
};
