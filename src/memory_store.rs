//! In-process [`LeadStore`] with the same semantics as the PostgreSQL store.
//!
//! Used by the test suite. Every call is counted so tests can assert that a
//! request never reached storage.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db_storage::LeadStore;
use crate::errors::AppError;
use crate::models::{Identity, LeadEntry, LeadRequest};

pub struct MemoryLeadStore {
    entries: RwLock<HashMap<Identity, LeadEntry>>,
    reachable: AtomicBool,
    hide_existing: AtomicBool,
    calls: AtomicUsize,
}

impl Default for MemoryLeadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            hide_existing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulates losing or regaining the backend.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes identity lookups miss while the records stay in place, as when a
    /// concurrent create commits between lookup and insert.
    pub fn set_hide_existing(&self, hide: bool) {
        self.hide_existing.store(hide, Ordering::SeqCst);
    }

    /// Number of store calls made so far, pings included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn enter(&self) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::ServiceUnavailable(
                "Service temporarily unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn ensure_schema(&self) -> Result<(), AppError> {
        self.enter()
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.enter()
    }

    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<LeadEntry>, AppError> {
        self.enter()?;
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.entries.read().await.get(identity).cloned())
    }

    async fn insert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError> {
        self.enter()?;
        let identity = lead.identity();
        let mut entries = self.entries.write().await;

        if entries.contains_key(&identity) {
            return Err(AppError::Conflict("Duplicate resource".to_string()));
        }

        let now = Utc::now();
        let entry = LeadEntry {
            id: Uuid::new_v4(),
            lead: lead.clone(),
            created_at: now,
            updated_at: now,
        };
        entries.insert(identity, entry.clone());
        Ok(entry)
    }

    async fn upsert(&self, lead: &LeadRequest) -> Result<LeadEntry, AppError> {
        self.enter()?;
        let identity = lead.identity();
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        let entry = match entries.get(&identity) {
            Some(existing) => LeadEntry {
                id: existing.id,
                lead: lead.clone(),
                created_at: existing.created_at,
                updated_at: now.max(existing.updated_at),
            },
            None => LeadEntry {
                id: Uuid::new_v4(),
                lead: lead.clone(),
                created_at: now,
                updated_at: now,
            },
        };
        entries.insert(identity, entry.clone());
        Ok(entry)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<LeadEntry>, AppError> {
        self.enter()?;
        let mut all: Vec<LeadEntry> = self.entries.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(all)
    }
}
