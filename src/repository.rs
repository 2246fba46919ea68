use std::sync::Arc;

use crate::connection::ConnectionStatus;
use crate::db_storage::LeadStore;
use crate::errors::{root_cause, AppError};
use crate::models::{Identity, LeadEntry, LeadRequest};

/// Gated access to lead storage.
///
/// Every operation consults the connection status first and fails fast with
/// 503 when the backend is flagged down. Storage failures are logged with the
/// operation and identity before being returned.
#[derive(Clone)]
pub struct LeadRepository {
    store: Arc<dyn LeadStore>,
    status: ConnectionStatus,
}

impl LeadRepository {
    pub fn new(store: Arc<dyn LeadStore>, status: ConnectionStatus) -> Self {
        Self { store, status }
    }

    /// Resolves an identity to its record. Absence is `Ok(None)`.
    pub async fn find_by_identity(
        &self,
        identity: &Identity,
    ) -> Result<Option<LeadEntry>, AppError> {
        self.status.ensure_backend_up("LeadRepository:find_by_identity")?;
        self.store
            .find_by_identity(identity)
            .await
            .map_err(|e| log_failure("find_by_identity", identity, None, e))
    }

    pub async fn insert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError> {
        self.status.ensure_backend_up("LeadRepository:insert")?;
        self.store
            .insert(lead)
            .await
            .map_err(|e| log_failure("insert", &lead.identity(), Some(lead), e))
    }

    pub async fn upsert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError> {
        self.status.ensure_backend_up("LeadRepository:upsert")?;
        self.store
            .upsert(lead)
            .await
            .map_err(|e| log_failure("upsert", &lead.identity(), Some(lead), e))
    }
}

fn log_failure(
    operation: &str,
    identity: &Identity,
    lead: Option<&LeadRequest>,
    err: AppError,
) -> AppError {
    let stage = lead.map(|l| l.stage().as_str()).unwrap_or("-");
    match root_cause(&err) {
        AppError::Conflict(_) => tracing::warn!(
            "LeadRepository:{}: Duplicate key error (identity={}, stage={})",
            operation,
            identity,
            stage
        ),
        _ => tracing::error!(
            "LeadRepository:{} failed (identity={}, stage={}): {}",
            operation,
            identity,
            stage,
            err
        ),
    }
    err
}
