//! Fixed applicant batch used to populate an empty portal.

use thiserror::Error;

use crate::types::{ApplicantDraft, NewApplicant, ValidationError};

const SEED_JSON: &str = include_str!("../data/applicants.json");

/// Number of records in the bundled batch.
pub const SEED_APPLICANT_COUNT: usize = 10;

#[derive(Debug, Error)]
pub enum SeedDataError {
    #[error("failed to decode seed data: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("seed record {index} is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },
}

/// Decodes and validates the bundled applicant batch, preserving file order.
pub fn seed_applicants() -> Result<Vec<NewApplicant>, SeedDataError> {
    let drafts: Vec<ApplicantDraft> = serde_json::from_str(SEED_JSON)?;
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            NewApplicant::try_from(draft).map_err(|source| SeedDataError::Invalid { index, source })
        })
        .collect()
}
