//! One-shot population of the applicant store with the bundled batch.

use chrono::{DateTime, Utc};
use hvac_portal_core::seed::{seed_applicants, SeedDataError};
use hvac_portal_storage::{ApplicantError, Database, StorageError};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to prepare database: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid seed data: {0}")]
    Data(#[from] SeedDataError),
    #[error("failed to insert applicants: {0}")]
    Insert(#[from] ApplicantError),
}

/// Inserts the bundled applicants in a single transaction.
///
/// Repeated runs insert the batch again; records are never deduplicated.
pub async fn seed_database(database: &Database, now: DateTime<Utc>) -> Result<usize, SeedError> {
    let applicants = seed_applicants()?;
    let stored = database
        .applicants()
        .insert_batch(&applicants, now)
        .await?;
    Ok(stored.len())
}

/// Connects to `database_url`, applies migrations, seeds, and closes the pool.
///
/// The outcome is logged before the pool is closed, whether or not seeding
/// succeeded.
pub async fn run(database_url: &str) -> Result<usize, SeedError> {
    let database = Database::connect(database_url).await?;
    info!(stage = "seed", "seeding database with applicant data");

    let outcome = match database.run_migrations().await {
        Ok(()) => seed_database(&database, Utc::now()).await,
        Err(err) => Err(err.into()),
    };

    match &outcome {
        Ok(count) => info!(stage = "seed", count, "successfully seeded applicants"),
        Err(err) => error!(stage = "seed", error = %err, "error seeding database"),
    }

    database.close().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvac_portal_core::seed::SEED_APPLICANT_COUNT;
    use hvac_portal_core::ApplicantStatus;
    use hvac_portal_storage::ListParams;

    fn database_url(dir: &tempfile::TempDir) -> String {
        format!("sqlite://{}?mode=rwc", dir.path().join("seed.db").display())
    }

    #[tokio::test]
    async fn seeding_empty_store_inserts_fixed_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = database_url(&dir);

        let inserted = run(&url).await.expect("seed succeeds");
        assert_eq!(inserted, SEED_APPLICANT_COUNT);

        let database = Database::connect(&url).await.expect("reconnect");
        let applicants = database
            .applicants()
            .list(ListParams::default())
            .await
            .expect("list");
        assert_eq!(applicants.len(), 10);
        assert!(applicants
            .iter()
            .all(|applicant| applicant.status == ApplicantStatus::Pending));

        let samuel = applicants
            .iter()
            .find(|applicant| applicant.email == "Sasashika14@gmail.com")
            .expect("seeded record");
        assert_eq!(samuel.full_name, "Samuel Atef");
        assert_eq!(samuel.platform.as_str(), "fb");

        let organic: Vec<_> = applicants
            .iter()
            .filter(|applicant| applicant.is_organic())
            .map(|applicant| applicant.full_name.as_str())
            .collect();
        assert_eq!(organic, vec!["Ahmed Magdy"]);
        database.close().await;
    }

    #[tokio::test]
    async fn seeding_twice_duplicates_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = database_url(&dir);

        run(&url).await.expect("first seed");
        run(&url).await.expect("second seed");

        let database = Database::connect(&url).await.expect("reconnect");
        assert_eq!(database.applicants().count().await.expect("count"), 20);
        database.close().await;
    }

    #[tokio::test]
    async fn unreachable_database_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!(
            "sqlite://{}?mode=ro",
            dir.path().join("missing.db").display()
        );

        let err = run(&url).await.unwrap_err();
        assert!(matches!(err, SeedError::Storage(StorageError::Connect(_))));
    }
}
