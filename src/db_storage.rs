use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::{Identity, LeadEntry, LeadRequest};
use crate::validation::parse_lead;

/// Default page size for operational listings.
pub const DEFAULT_LIST_LIMIT: i64 = 1000;

/// Persistence seam for lead records.
///
/// Implementations keep one record per [`Identity`], stamp `created_at` once on
/// insert and refresh `updated_at` on every write.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Creates the backing table and indexes if they are missing.
    async fn ensure_schema(&self) -> Result<(), AppError>;

    /// Round-trips the backend once.
    async fn ping(&self) -> Result<(), AppError>;

    /// First record matching the identity, if any.
    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<LeadEntry>, AppError>;

    /// Inserts a new record. An existing identity yields `AppError::Conflict`.
    async fn insert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError>;

    /// Replaces the record for the lead's identity, or inserts it.
    /// `created_at` of an existing record is kept.
    async fn upsert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError>;

    /// Most recently created records first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<LeadEntry>, AppError>;
}

/// Row shape of `lead_entries`.
#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    payload: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeadRow {
    /// Re-validates the stored document so a malformed row never leaves storage.
    fn into_entry(self) -> Result<LeadEntry, AppError> {
        let lead = parse_lead(&self.payload).map_err(|e| {
            AppError::InternalError(format!("Stored lead {} failed schema: {}", self.id, e))
        })?;

        Ok(LeadEntry {
            id: self.id,
            lead,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Maps a failure to build the unique identity index. Duplicate (email, phone)
/// rows block it until an operator removes them, so that case gets its own
/// message instead of the generic startup retry line.
fn identity_index_failure(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            tracing::error!(
                "Cannot create unique index lead_entries_identity_key: lead_entries has duplicate (email, phone) rows ({}). \
                 Delete all but the oldest row per identity; startup keeps retrying until then",
                db_err.message()
            );
            AppError::InternalError(
                "Duplicate (email, phone) rows in lead_entries block the identity index".to_string(),
            )
        }
        _ => AppError::WithContext {
            source: Box::new(AppError::from(err)),
            context: "assert index lead_entries_identity_key".to_string(),
        },
    }
}

/// PostgreSQL-backed lead storage.
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lead_entries (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                lead_stage TEXT NOT NULL,
                version TEXT NOT NULL,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("create lead_entries")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS lead_entries_created_at_desc ON lead_entries (created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .context("assert index lead_entries_created_at_desc")?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS lead_entries_identity_key ON lead_entries (email, phone)",
        )
        .execute(&self.pool)
        .await
        .map_err(identity_index_failure)?;

        tracing::info!("Indexes asserted for lead_entries");
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<LeadEntry>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT id, payload, created_at, updated_at
            FROM lead_entries
            WHERE email = $1 AND phone = $2
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(&identity.email)
        .bind(&identity.phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LeadRow::into_entry).transpose()
    }

    async fn insert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError> {
        let identity = lead.identity();
        let document = lead.to_document()?;

        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            INSERT INTO lead_entries (id, email, phone, lead_stage, version, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            RETURNING id, payload, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.email)
        .bind(&identity.phone)
        .bind(lead.stage().as_str())
        .bind(lead.version())
        .bind(&document)
        .fetch_one(&self.pool)
        .await?;

        row.into_entry()
    }

    async fn upsert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError> {
        let identity = lead.identity();
        let document = lead.to_document()?;

        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            INSERT INTO lead_entries (id, email, phone, lead_stage, version, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (email, phone) DO UPDATE
            SET lead_stage = EXCLUDED.lead_stage,
                version = EXCLUDED.version,
                payload = EXCLUDED.payload,
                updated_at = now()
            RETURNING id, payload, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.email)
        .bind(&identity.phone)
        .bind(lead.stage().as_str())
        .bind(lead.version())
        .bind(&document)
        .fetch_one(&self.pool)
        .await?;

        row.into_entry()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<LeadEntry>, AppError> {
        let rows = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT id, payload, created_at, updated_at
            FROM lead_entries
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeadRow::into_entry).collect()
    }
}
