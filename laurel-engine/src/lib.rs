//! LAUREL Engine - Badge Sweep Orchestrator
//!
//! Synchronizes the badge catalog into the ledger at construction and runs
//! full evaluation sweeps for one user at a time:
//! - Per-item evaluators over each fetched content collection, awarded with
//!   a per-item dedupe key
//! - Whole-set evaluators once per collection, awarded per user
//! - User-aggregate evaluators last, awarded per user
//!
//! The engine holds only the immutable evaluator list and collaborator
//! references; sweeps for different users may run concurrently, and racing
//! sweeps for the same user are resolved by the ledger's atomic award slot.

use chrono::Utc;
use laurel_core::{
    item_dedupe_key, BadgeEvaluator, BadgeNotifier, CatalogError, ContentItem, ContentKind,
    ContentStore, LaurelResult, Timestamp, UserBadge,
};
use laurel_ledger::BadgeLedger;
use std::sync::Arc;

// ============================================================================
// SWEEP OPTIONS
// ============================================================================

/// Caller-supplied bounds for one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// Hard deadline for the sweep. Checked between evaluation units; when
    /// it passes, the sweep truncates cleanly (unchecked badges are picked
    /// up by the next run) with no partial corruption, since every award
    /// is an independently committed unit of work.
    pub deadline: Option<Timestamp>,
}

impl SweepOptions {
    /// Bound the sweep by a hard deadline.
    pub fn with_deadline(deadline: Timestamp) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Utc::now() >= deadline)
    }
}

// ============================================================================
// SWEEP OUTCOME
// ============================================================================

/// Tally of one sweep, logged at completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Awards that created a new record.
    pub awards_new: u64,
    /// Awards that found the slot already filled.
    pub awards_existing: u64,
    /// Positive matches skipped because the ledger did not know the key.
    pub unknown_keys: u64,
    /// Award calls that failed and were survived.
    pub award_faults: u64,
    /// Notification deliveries that failed and were survived.
    pub notify_faults: u64,
    /// Phases skipped because their content fetch failed.
    pub phases_skipped: u64,
    /// Whether the deadline truncated the sweep.
    pub truncated: bool,
}

/// Result of one sweep: every award record touched (new and pre-existing
/// alike, in evaluation order) plus the tally.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub records: Vec<UserBadge>,
    pub stats: SweepStats,
}

// ============================================================================
// BADGE ENGINE
// ============================================================================

/// The sweep orchestrator. Construction synchronizes every evaluator's
/// badge definition into the ledger exactly once; a failure there is fatal
/// and the engine is not constructed.
pub struct BadgeEngine {
    evaluators: Vec<Arc<dyn BadgeEvaluator>>,
    ledger: Arc<dyn BadgeLedger>,
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn BadgeNotifier>,
}

impl BadgeEngine {
    /// Build an engine from the evaluator list (catalog plus any custom
    /// evaluators, in registration order) and the collaborators.
    ///
    /// Rejects evaluators that expose no evaluation shape, then upserts
    /// every badge definition into the ledger. Any upsert failure aborts
    /// construction; the first sweep can only run after this one-time
    /// synchronization has completed.
    pub fn new(
        evaluators: Vec<Arc<dyn BadgeEvaluator>>,
        ledger: Arc<dyn BadgeLedger>,
        store: Arc<dyn ContentStore>,
        notifier: Arc<dyn BadgeNotifier>,
    ) -> LaurelResult<Self> {
        for evaluator in &evaluators {
            if !evaluator.supports_any() {
                return Err(CatalogError::NoCapability {
                    key: evaluator.key().to_string(),
                }
                .into());
            }
        }

        for evaluator in &evaluators {
            ledger.upsert_definition(evaluator.definition())?;
        }
        tracing::info!(evaluators = evaluators.len(), "Badge catalog synchronized");

        Ok(Self {
            evaluators,
            ledger,
            store,
            notifier,
        })
    }

    /// The evaluator list, in evaluation order.
    pub fn evaluators(&self) -> &[Arc<dyn BadgeEvaluator>] {
        &self.evaluators
    }

    /// Run one full evaluation sweep for a user and return every award
    /// record touched. Never fails: partial faults are logged, counted,
    /// and survived (the affected badge is simply not awarded this run and
    /// self-heals on the next sweep).
    pub fn process_user_badges(&self, user_ref: &str) -> Vec<UserBadge> {
        self.sweep(user_ref, SweepOptions::default()).records
    }

    /// Run one sweep with caller-supplied bounds, returning records and
    /// the sweep tally.
    pub fn sweep(&self, user_ref: &str, options: SweepOptions) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();

        for kind in [ContentKind::Post, ContentKind::Answer, ContentKind::Collection] {
            if options.expired() {
                outcome.stats.truncated = true;
                break;
            }
            match self.fetch_collection(user_ref, kind) {
                Ok(items) => {
                    self.run_content_phase(user_ref, kind, &items, &options, &mut outcome)
                }
                Err(e) => {
                    outcome.stats.phases_skipped += 1;
                    tracing::error!(
                        error = %e,
                        user_ref,
                        kind = %kind,
                        "Content fetch failed, skipping phase"
                    );
                }
            }
        }

        if options.expired() {
            outcome.stats.truncated = true;
        } else {
            match self.store.fetch_user_profile(user_ref) {
                Ok(profile) => {
                    for evaluator in &self.evaluators {
                        if !evaluator.supports_user() {
                            continue;
                        }
                        if !evaluator.evaluate_user(&profile) {
                            continue;
                        }
                        self.commit_award(user_ref, evaluator.key(), None, &mut outcome);
                    }
                }
                Err(e) => {
                    outcome.stats.phases_skipped += 1;
                    tracing::error!(
                        error = %e,
                        user_ref,
                        "Profile fetch failed, skipping aggregate phase"
                    );
                }
            }
        }

        let stats = outcome.stats;
        tracing::info!(
            user_ref,
            new = stats.awards_new,
            existing = stats.awards_existing,
            unknown_keys = stats.unknown_keys,
            award_faults = stats.award_faults,
            notify_faults = stats.notify_faults,
            phases_skipped = stats.phases_skipped,
            truncated = stats.truncated,
            "Badge sweep completed"
        );

        outcome
    }

    fn fetch_collection(
        &self,
        user_ref: &str,
        kind: ContentKind,
    ) -> LaurelResult<Vec<ContentItem>> {
        match kind {
            ContentKind::Post => self.store.fetch_authored_posts(user_ref),
            ContentKind::Answer => self.store.fetch_authored_answers(user_ref),
            ContentKind::Collection => self.store.fetch_owned_collections(user_ref),
        }
    }

    /// One content phase: the per-item pass (item-outer, evaluator-inner)
    /// followed by the whole-set pass over the same fetched collection.
    fn run_content_phase(
        &self,
        user_ref: &str,
        kind: ContentKind,
        items: &[ContentItem],
        options: &SweepOptions,
        outcome: &mut SweepOutcome,
    ) {
        for item in items {
            if options.expired() {
                outcome.stats.truncated = true;
                return;
            }
            for evaluator in &self.evaluators {
                if !evaluator.supports_item() {
                    continue;
                }
                if !evaluator.evaluate_item(item) {
                    continue;
                }
                let dedupe = item_dedupe_key(kind, item.item_id);
                self.commit_award(user_ref, evaluator.key(), Some(&dedupe), outcome);
            }
        }

        if options.expired() {
            outcome.stats.truncated = true;
            return;
        }
        for evaluator in &self.evaluators {
            if !evaluator.supports_item_set() {
                continue;
            }
            if !evaluator.evaluate_item_set(items) {
                continue;
            }
            self.commit_award(user_ref, evaluator.key(), None, outcome);
        }
    }

    /// Commit one positive match: award through the ledger, record the
    /// result, and notify when the award is genuinely new. Faults are
    /// logged and survived; the sweep continues.
    fn commit_award(
        &self,
        user_ref: &str,
        badge_key: &str,
        dedupe_key: Option<&str>,
        outcome: &mut SweepOutcome,
    ) {
        match self.ledger.award(user_ref, badge_key, dedupe_key) {
            Ok(Some(result)) => {
                if result.is_new {
                    outcome.stats.awards_new += 1;
                    if let Err(e) = self
                        .notifier
                        .notify_badge_awarded(user_ref, &result.record)
                    {
                        outcome.stats.notify_faults += 1;
                        tracing::warn!(
                            error = %e,
                            user_ref,
                            badge_key,
                            "Badge notification failed, award stands"
                        );
                    }
                } else {
                    outcome.stats.awards_existing += 1;
                }
                outcome.records.push(result.record);
            }
            Ok(None) => {
                outcome.stats.unknown_keys += 1;
                tracing::warn!(user_ref, badge_key, "Badge key unknown to ledger, skipping");
            }
            Err(e) => {
                outcome.stats.award_faults += 1;
                tracing::error!(
                    error = %e,
                    user_ref,
                    badge_key,
                    "Award failed, continuing sweep"
                );
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use laurel_core::{
        new_item_id, BadgeDefinition, BadgeKind, BadgeLevel, LaurelError, LedgerError,
        UserProfile,
    };
    use laurel_ledger::InMemoryLedger;
    use laurel_rules::BadgeCatalog;
    use laurel_test_utils::{MockContentStore, RecordingNotifier, StaticEvaluator};

    fn one_time_definition(key: &str) -> BadgeDefinition {
        BadgeDefinition::new(
            key,
            "Test Badge",
            "Awarded in tests",
            "medal-bronze",
            BadgeLevel::Bronze,
            BadgeKind::OneTime,
            0,
        )
    }

    fn builtin_engine(
        store: MockContentStore,
    ) -> (BadgeEngine, Arc<InMemoryLedger>, Arc<RecordingNotifier>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = BadgeEngine::new(
            BadgeCatalog::builtin().into_evaluators(),
            ledger.clone(),
            Arc::new(store),
            notifier.clone(),
        )
        .unwrap();
        (engine, ledger, notifier)
    }

    fn alice_store() -> MockContentStore {
        MockContentStore::new()
            .with_posts("alice", vec![ContentItem::post(new_item_id()).with_score(15)])
            .with_answers(
                "alice",
                vec![ContentItem::answer(new_item_id())
                    .with_score(5)
                    .with_correct_answer(true)],
            )
            .with_collections("alice", vec![])
            .with_profile(
                "alice",
                UserProfile {
                    questions_authored: 1,
                    answers_authored: 1,
                    ..Default::default()
                },
            )
    }

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_construction_synchronizes_catalog() {
        let catalog_len = BadgeCatalog::builtin().len();
        let (_engine, ledger, _notifier) = builtin_engine(MockContentStore::new());
        assert_eq!(ledger.definition_count().unwrap(), catalog_len);
    }

    #[test]
    fn test_construction_rejects_shapeless_evaluator() {
        let inert =
            Arc::new(StaticEvaluator::new(one_time_definition("inert"))) as Arc<dyn BadgeEvaluator>;
        let result = BadgeEngine::new(
            vec![inert],
            Arc::new(InMemoryLedger::new()),
            Arc::new(MockContentStore::new()),
            Arc::new(RecordingNotifier::new()),
        );
        assert!(matches!(
            result.err(),
            Some(LaurelError::Catalog(CatalogError::NoCapability { key })) if key == "inert"
        ));
    }

    // ========================================================================
    // Scenario Test
    // ========================================================================

    #[test]
    fn test_alice_scenario_two_badges_then_idempotent() {
        let (engine, _ledger, notifier) = builtin_engine(alice_store());

        let first = engine.sweep("alice", SweepOptions::default());
        let mut first_keys: Vec<String> = first
            .records
            .iter()
            .map(|r| r.badge_key.clone())
            .collect();
        first_keys.sort();
        assert_eq!(first_keys, vec!["good-question", "problem-solver"]);
        assert_eq!(first.stats.awards_new, 2);
        assert_eq!(first.stats.awards_existing, 0);

        let good_question = first
            .records
            .iter()
            .find(|r| r.badge_key == "good-question")
            .unwrap();
        assert!(good_question
            .dedupe_key
            .as_deref()
            .unwrap()
            .starts_with("post:"));
        let solver = first
            .records
            .iter()
            .find(|r| r.badge_key == "problem-solver")
            .unwrap();
        assert_eq!(solver.dedupe_key, None);

        // Second sweep: same two records, nothing new, no new notifications.
        let second = engine.sweep("alice", SweepOptions::default());
        assert_eq!(second.stats.awards_new, 0);
        assert_eq!(second.stats.awards_existing, 2);

        let mut first_ids: Vec<_> = first.records.iter().map(|r| r.record_id).collect();
        let mut second_ids: Vec<_> = second.records.iter().map(|r| r.record_id).collect();
        first_ids.sort();
        second_ids.sort();
        assert_eq!(first_ids, second_ids);

        assert_eq!(notifier.count_for("alice", "good-question"), 1);
        assert_eq!(notifier.count_for("alice", "problem-solver"), 1);
        assert_eq!(notifier.notifications().len(), 2);
    }

    // ========================================================================
    // Dedupe Tests
    // ========================================================================

    #[test]
    fn test_two_qualifying_posts_two_records() {
        let store = MockContentStore::new().with_posts(
            "alice",
            vec![
                ContentItem::post(new_item_id()).with_score(20),
                ContentItem::post(new_item_id()).with_score(20),
            ],
        );
        let (engine, _ledger, notifier) = builtin_engine(store);

        let outcome = engine.sweep("alice", SweepOptions::default());
        let good_questions: Vec<_> = outcome
            .records
            .iter()
            .filter(|r| r.badge_key == "good-question")
            .collect();

        assert_eq!(good_questions.len(), 2);
        assert_ne!(good_questions[0].dedupe_key, good_questions[1].dedupe_key);
        assert_eq!(outcome.stats.awards_new as usize, outcome.records.len());
        assert_eq!(notifier.count_for("alice", "good-question"), 2);
    }

    // ========================================================================
    // Fault Isolation Tests
    // ========================================================================

    #[test]
    fn test_failed_collection_fetch_skips_only_that_phase() {
        let store = alice_store().with_failing_collections();
        let (engine, _ledger, _notifier) = builtin_engine(store);

        let outcome = engine.sweep("alice", SweepOptions::default());
        let mut keys: Vec<String> = outcome
            .records
            .iter()
            .map(|r| r.badge_key.clone())
            .collect();
        keys.sort();

        // Post, answer, and aggregate phases still ran.
        assert_eq!(keys, vec!["good-question", "problem-solver"]);
        assert_eq!(outcome.stats.phases_skipped, 1);
    }

    #[test]
    fn test_notify_fault_does_not_fail_award() {
        let ledger = Arc::new(InMemoryLedger::new());
        let notifier = Arc::new(RecordingNotifier::failing());
        let engine = BadgeEngine::new(
            BadgeCatalog::builtin().into_evaluators(),
            ledger.clone(),
            Arc::new(alice_store()),
            notifier.clone(),
        )
        .unwrap();

        let first = engine.sweep("alice", SweepOptions::default());
        assert_eq!(first.stats.awards_new, 2);
        assert_eq!(first.stats.notify_faults, 2);
        assert_eq!(first.records.len(), 2);
        assert_eq!(ledger.badge_count("alice").unwrap(), 2);

        // The award is durable: the next sweep neither re-awards nor
        // retries the notification.
        let second = engine.sweep("alice", SweepOptions::default());
        assert_eq!(second.stats.awards_new, 0);
        assert_eq!(second.stats.notify_faults, 0);
        assert_eq!(notifier.notifications().len(), 2);
    }

    /// Ledger wrapper that fails every award for one badge key.
    struct FailingAwardLedger {
        inner: InMemoryLedger,
        fail_key: String,
    }

    impl BadgeLedger for FailingAwardLedger {
        fn upsert_definition(&self, def: &BadgeDefinition) -> LaurelResult<()> {
            self.inner.upsert_definition(def)
        }

        fn award(
            &self,
            user_ref: &str,
            badge_key: &str,
            dedupe_key: Option<&str>,
        ) -> LaurelResult<Option<laurel_core::AwardResult>> {
            if badge_key == self.fail_key {
                return Err(LedgerError::Backend {
                    reason: "injected fault".to_string(),
                }
                .into());
            }
            self.inner.award(user_ref, badge_key, dedupe_key)
        }

        fn definition(&self, key: &str) -> LaurelResult<Option<BadgeDefinition>> {
            self.inner.definition(key)
        }

        fn definitions(&self) -> LaurelResult<Vec<BadgeDefinition>> {
            self.inner.definitions()
        }

        fn badges_for_user(&self, user_ref: &str) -> LaurelResult<Vec<UserBadge>> {
            self.inner.badges_for_user(user_ref)
        }

        fn badge_count(&self, user_ref: &str) -> LaurelResult<usize> {
            self.inner.badge_count(user_ref)
        }
    }

    #[test]
    fn test_award_fault_does_not_abort_sweep() {
        let ledger = Arc::new(FailingAwardLedger {
            inner: InMemoryLedger::new(),
            fail_key: "good-question".to_string(),
        });
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = BadgeEngine::new(
            BadgeCatalog::builtin().into_evaluators(),
            ledger,
            Arc::new(alice_store()),
            notifier.clone(),
        )
        .unwrap();

        let outcome = engine.sweep("alice", SweepOptions::default());

        // The failing award is counted and survived; the rest of the sweep
        // still lands.
        assert_eq!(outcome.stats.award_faults, 1);
        let keys: Vec<String> = outcome
            .records
            .iter()
            .map(|r| r.badge_key.clone())
            .collect();
        assert_eq!(keys, vec!["problem-solver"]);
        assert_eq!(notifier.count_for("alice", "problem-solver"), 1);
        assert_eq!(notifier.count_for("alice", "good-question"), 0);
    }

    #[test]
    fn test_unknown_key_skipped_not_failed() {
        let always = Arc::new(
            StaticEvaluator::new(one_time_definition("phantom")).with_user_verdict(true),
        ) as Arc<dyn BadgeEvaluator>;
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = BadgeEngine::new(
            vec![always],
            ledger.clone(),
            Arc::new(MockContentStore::new().with_profile("alice", UserProfile::default())),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();

        // Wipe the synchronized definition out from under the engine; the
        // positive match now hits an unknown key.
        ledger.clear().unwrap();

        let outcome = engine.sweep("alice", SweepOptions::default());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats.unknown_keys, 1);
        assert_eq!(outcome.stats.award_faults, 0);
    }

    // ========================================================================
    // Ordering and Deadline Tests
    // ========================================================================

    #[test]
    fn test_notifications_follow_catalog_order() {
        let first = Arc::new(
            StaticEvaluator::new(one_time_definition("first-badge")).with_user_verdict(true),
        ) as Arc<dyn BadgeEvaluator>;
        let second = Arc::new(
            StaticEvaluator::new(one_time_definition("second-badge")).with_user_verdict(true),
        ) as Arc<dyn BadgeEvaluator>;
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = BadgeEngine::new(
            vec![first, second],
            Arc::new(InMemoryLedger::new()),
            Arc::new(MockContentStore::new().with_profile("alice", UserProfile::default())),
            notifier.clone(),
        )
        .unwrap();

        engine.process_user_badges("alice");

        let keys: Vec<String> = notifier
            .notifications()
            .iter()
            .map(|(_, record)| record.badge_key.clone())
            .collect();
        assert_eq!(keys, vec!["first-badge", "second-badge"]);
    }

    #[test]
    fn test_expired_deadline_truncates_cleanly() {
        let (engine, ledger, notifier) = builtin_engine(alice_store());

        let options = SweepOptions::with_deadline(Utc::now() - chrono::Duration::seconds(1));
        let outcome = engine.sweep("alice", options);

        assert!(outcome.stats.truncated);
        assert!(outcome.records.is_empty());
        assert_eq!(ledger.badge_count("alice").unwrap(), 0);
        assert!(notifier.notifications().is_empty());

        // The next unbounded sweep picks everything up.
        let full = engine.sweep("alice", SweepOptions::default());
        assert_eq!(full.stats.awards_new, 2);
    }

    #[test]
    fn test_process_user_badges_returns_records() {
        let (engine, _ledger, _notifier) = builtin_engine(alice_store());
        let records = engine.process_user_badges("alice");
        assert_eq!(records.len(), 2);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
