//! LAUREL Ledger - Badge Persistence Contract
//!
//! Defines the badge ledger abstraction: durable storage of badge
//! definitions and award records with idempotent award semantics. The
//! in-memory reference implementation lives here; durable backends
//! implement the same trait over a unique constraint on the award slot.

use laurel_core::{AwardResult, BadgeDefinition, LaurelResult, LedgerError, UserBadge};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// LEDGER TRAIT
// ============================================================================

/// Badge ledger contract.
///
/// `award` is the one operation with non-trivial semantics: it is an atomic
/// check-then-insert per `(user_ref, badge_key, dedupe_key)` slot, where an
/// absent dedupe key is itself a fixed slot per `(user_ref, badge_key)`.
/// Two concurrent sweeps for the same user must never produce two records
/// for the same slot; implementations back this with a unique constraint
/// plus insert-or-ignore, or an equivalent transactional check-then-insert.
pub trait BadgeLedger: Send + Sync {
    /// Create the definition if absent, or refresh its metadata if a
    /// definition with the same key exists. Safe to call on every process
    /// start for every catalog entry.
    fn upsert_definition(&self, def: &BadgeDefinition) -> LaurelResult<()>;

    /// Attempt to grant a badge. Returns `Ok(None)` when `badge_key` is
    /// unknown to the ledger (a registration mismatch, not an error).
    /// Otherwise returns the record occupying the slot: the pre-existing
    /// one with `is_new = false` and nothing written, or a freshly
    /// inserted one granted now with `is_new = true`.
    fn award(
        &self,
        user_ref: &str,
        badge_key: &str,
        dedupe_key: Option<&str>,
    ) -> LaurelResult<Option<AwardResult>>;

    /// Look up one definition by key.
    fn definition(&self, key: &str) -> LaurelResult<Option<BadgeDefinition>>;

    /// All registered definitions.
    fn definitions(&self) -> LaurelResult<Vec<BadgeDefinition>>;

    /// All award records held by a user, in grant order.
    fn badges_for_user(&self, user_ref: &str) -> LaurelResult<Vec<UserBadge>>;

    /// Number of award records held by a user.
    fn badge_count(&self, user_ref: &str) -> LaurelResult<usize>;
}

// ============================================================================
// IN-MEMORY REFERENCE IMPLEMENTATION
// ============================================================================

/// Award slot key: `(user_ref, badge_key, dedupe_key)`.
type AwardSlot = (String, String, Option<String>);

/// In-memory badge ledger. The award map is keyed by the full slot tuple
/// and `award` holds the write lock across the whole check-then-insert,
/// which is the in-memory equivalent of the unique-constraint contract.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    definitions: Arc<RwLock<HashMap<String, BadgeDefinition>>>,
    awards: Arc<RwLock<HashMap<AwardSlot, UserBadge>>>,
}

impl InMemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all definitions and award records.
    pub fn clear(&self) -> LaurelResult<()> {
        self.write_definitions()?.clear();
        self.write_awards()?.clear();
        Ok(())
    }

    /// Number of registered definitions.
    pub fn definition_count(&self) -> LaurelResult<usize> {
        Ok(self.read_definitions()?.len())
    }

    /// Total number of award records across all users.
    pub fn award_count(&self) -> LaurelResult<usize> {
        Ok(self.read_awards()?.len())
    }

    fn read_definitions(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<String, BadgeDefinition>>, LedgerError> {
        self.definitions.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_definitions(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, BadgeDefinition>>, LedgerError> {
        self.definitions
            .write()
            .map_err(|_| LedgerError::LockPoisoned)
    }

    fn read_awards(&self) -> Result<RwLockReadGuard<'_, HashMap<AwardSlot, UserBadge>>, LedgerError> {
        self.awards.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_awards(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<AwardSlot, UserBadge>>, LedgerError> {
        self.awards.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl BadgeLedger for InMemoryLedger {
    fn upsert_definition(&self, def: &BadgeDefinition) -> LaurelResult<()> {
        let mut definitions = self.write_definitions()?;
        definitions.insert(def.key.clone(), def.clone());
        Ok(())
    }

    fn award(
        &self,
        user_ref: &str,
        badge_key: &str,
        dedupe_key: Option<&str>,
    ) -> LaurelResult<Option<AwardResult>> {
        if !self.read_definitions()?.contains_key(badge_key) {
            return Ok(None);
        }

        let slot: AwardSlot = (
            user_ref.to_string(),
            badge_key.to_string(),
            dedupe_key.map(str::to_string),
        );

        // The write lock spans the whole check-then-insert: the slot cannot
        // be double-filled by a racing sweep.
        let mut awards = self.write_awards()?;
        if let Some(existing) = awards.get(&slot) {
            return Ok(Some(AwardResult {
                record: existing.clone(),
                is_new: false,
            }));
        }

        let record = UserBadge::new(user_ref, badge_key, slot.2.clone());
        awards.insert(slot, record.clone());
        Ok(Some(AwardResult {
            record,
            is_new: true,
        }))
    }

    fn definition(&self, key: &str) -> LaurelResult<Option<BadgeDefinition>> {
        Ok(self.read_definitions()?.get(key).cloned())
    }

    fn definitions(&self) -> LaurelResult<Vec<BadgeDefinition>> {
        let mut all: Vec<BadgeDefinition> = self.read_definitions()?.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }

    fn badges_for_user(&self, user_ref: &str) -> LaurelResult<Vec<UserBadge>> {
        let mut records: Vec<UserBadge> = self
            .read_awards()?
            .values()
            .filter(|r| r.user_ref == user_ref)
            .cloned()
            .collect();
        // UUIDv7 record ids sort by creation time.
        records.sort_by_key(|r| r.record_id);
        Ok(records)
    }

    fn badge_count(&self, user_ref: &str) -> LaurelResult<usize> {
        Ok(self
            .read_awards()?
            .values()
            .filter(|r| r.user_ref == user_ref)
            .count())
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
