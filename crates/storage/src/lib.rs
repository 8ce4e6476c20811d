use std::{str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    query::QueryAs,
    sqlite::{
        SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions,
        SqliteSynchronous,
    },
    Sqlite, SqlitePool,
};
use thiserror::Error;

use hvac_portal_core::types::{
    Applicant, ApplicantStatus, NewApplicant, Platform, SignIn, StatusChange, User, UserRole,
    ValidationError,
};

const APPLICANT_COLUMNS: &str =
    "id, fullName, phone, email, jobTitle, platform, status, notes, createdAt, updatedAt";

const USER_COLUMNS: &str =
    "id, openId, name, email, loginMethod, role, createdAt, updatedAt, lastSignedIn";

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// Connection pragmas are part of the connect options so every pooled
    /// connection carries them.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = connect_options(database_url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to operate on applicant records.
    pub fn applicants(&self) -> ApplicantRepository {
        ApplicantRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for interacting with authenticated users.
    pub fn users(&self) -> UserRepository {
        UserRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for checked-out connections to return and closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, StorageError> {
    let options = SqliteConnectOptions::from_str(database_url).map_err(StorageError::Connect)?;
    Ok(options
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5)))
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Paging window for applicant listings. The default returns every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Repository for applicant records.
#[derive(Clone)]
pub struct ApplicantRepository {
    pool: SqlitePool,
}

impl ApplicantRepository {
    /// Lists applicants ordered by id, optionally paged.
    pub async fn list(&self, params: ListParams) -> Result<Vec<Applicant>, ApplicantError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = params.limit.map(i64::from).unwrap_or(-1);
        let offset = params.offset.map(i64::from).unwrap_or(0);

        let rows = sqlx::query_as::<_, ApplicantRow>(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApplicantRow::into_domain).collect()
    }

    /// Fetches a single applicant; `Ok(None)` when the id is unknown.
    pub async fn fetch(&self, id: i64) -> Result<Option<Applicant>, ApplicantError> {
        let row = sqlx::query_as::<_, ApplicantRow>(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApplicantRow::into_domain).transpose()
    }

    /// Inserts a new applicant in the `pending` state and returns the stored record.
    pub async fn insert(
        &self,
        applicant: &NewApplicant,
        created_at: DateTime<Utc>,
    ) -> Result<Applicant, ApplicantError> {
        let sql = insert_sql();
        let row = insert_query(&sql, applicant, to_rfc3339(created_at))
            .fetch_one(&self.pool)
            .await?;
        row.into_domain()
    }

    /// Inserts every applicant inside one transaction.
    ///
    /// Either all records are stored or, on the first failure, none are.
    pub async fn insert_batch(
        &self,
        applicants: &[NewApplicant],
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Applicant>, ApplicantError> {
        let sql = insert_sql();
        let timestamp = to_rfc3339(created_at);
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(applicants.len());

        for applicant in applicants {
            let row = insert_query(&sql, applicant, timestamp.clone())
                .fetch_one(&mut *tx)
                .await?;
            stored.push(row.into_domain()?);
        }

        tx.commit().await?;
        Ok(stored)
    }

    /// Applies a reviewer status change and refreshes `updatedAt`.
    pub async fn update_status(
        &self,
        id: i64,
        change: &StatusChange,
        updated_at: DateTime<Utc>,
    ) -> Result<Applicant, ApplicantError> {
        let notes = change.notes.as_deref();
        let row = sqlx::query_as::<_, ApplicantRow>(&format!(
            "UPDATE applicants \
             SET status = ?, \
                 notes = CASE WHEN ? IS NULL THEN notes ELSE NULLIF(?, '') END, \
                 updatedAt = ? \
             WHERE id = ? \
             RETURNING {APPLICANT_COLUMNS}"
        ))
        .bind(change.status.as_str())
        .bind(notes)
        .bind(notes)
        .bind(to_rfc3339(updated_at))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApplicantError::NotFound)?;

        row.into_domain()
    }

    /// Returns the number of stored applicants.
    pub async fn count(&self) -> Result<i64, ApplicantError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applicants")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO applicants \
         (fullName, phone, email, jobTitle, platform, status, createdAt, updatedAt) \
         VALUES (?, ?, ?, ?, ?, 'pending', ?, ?) \
         RETURNING {APPLICANT_COLUMNS}"
    )
}

fn insert_query<'q>(
    sql: &'q str,
    applicant: &'q NewApplicant,
    timestamp: String,
) -> QueryAs<'q, Sqlite, ApplicantRow, SqliteArguments<'q>> {
    sqlx::query_as::<_, ApplicantRow>(sql)
        .bind(applicant.full_name())
        .bind(applicant.phone())
        .bind(applicant.email())
        .bind(applicant.job_title())
        .bind(applicant.platform().as_str())
        .bind(timestamp.clone())
        .bind(timestamp)
}

/// Raw applicant row as selected from SQLite.
#[derive(Debug, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
struct ApplicantRow {
    id: i64,
    full_name: String,
    phone: String,
    email: String,
    job_title: String,
    platform: String,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicantRow {
    fn into_domain(self) -> Result<Applicant, ApplicantError> {
        let status = self
            .status
            .parse::<ApplicantStatus>()
            .map_err(ApplicantError::InvalidRecord)?;
        Ok(Applicant {
            id: self.id,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            job_title: self.job_title,
            platform: Platform::from_code(&self.platform),
            status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Errors that can occur while reading or mutating applicants.
#[derive(Debug, Error)]
pub enum ApplicantError {
    #[error("applicant not found")]
    NotFound,
    #[error("stored applicant is invalid: {0}")]
    InvalidRecord(ValidationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for authenticated users.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Records a successful sign-in.
    ///
    /// New identities are inserted; known ones get `lastSignedIn` and `updatedAt`
    /// refreshed and any supplied profile fields overwritten. `role` is only
    /// applied when provided, otherwise new users start as `user`.
    pub async fn upsert_sign_in(
        &self,
        sign_in: &SignIn,
        role: Option<UserRole>,
        signed_in_at: DateTime<Utc>,
    ) -> Result<User, UserError> {
        let timestamp = to_rfc3339(signed_in_at);
        let role = role.map(UserRole::as_str);
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users \
             (openId, name, email, loginMethod, role, createdAt, updatedAt, lastSignedIn) \
             VALUES (?, ?, ?, ?, COALESCE(?, 'user'), ?, ?, ?) \
             ON CONFLICT(openId) DO UPDATE \
             SET name = COALESCE(excluded.name, users.name), \
                 email = COALESCE(excluded.email, users.email), \
                 loginMethod = COALESCE(excluded.loginMethod, users.loginMethod), \
                 role = COALESCE(?, users.role), \
                 updatedAt = excluded.updatedAt, \
                 lastSignedIn = excluded.lastSignedIn \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(sign_in.open_id())
        .bind(sign_in.name())
        .bind(sign_in.email())
        .bind(sign_in.login_method())
        .bind(role)
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(&timestamp)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    /// Looks up a user by external identity.
    pub async fn fetch_by_open_id(&self, open_id: &str) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE openId = ?"
        ))
        .bind(open_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
struct UserRow {
    id: i64,
    open_id: String,
    name: Option<String>,
    email: Option<String>,
    login_method: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_signed_in: DateTime<Utc>,
}

impl UserRow {
    fn into_domain(self) -> Result<User, UserError> {
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(UserError::InvalidRecord)?;
        Ok(User {
            id: self.id,
            open_id: self.open_id,
            name: self.name,
            email: self.email,
            login_method: self.login_method,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_signed_in: self.last_signed_in,
        })
    }
}

/// Errors that can occur while reading or mutating users.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("stored user is invalid: {0}")]
    InvalidRecord(ValidationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
