//! LAUREL Test Utilities
//!
//! Centralized test infrastructure for the LAUREL workspace:
//! - Mock collaborators (scripted content store, recording notifier,
//!   configurable static evaluator)
//! - Proptest generators for all entity types
//! - Re-exports of the in-memory ledger and core types

// Re-export the reference ledger from its source crate
pub use laurel_ledger::{BadgeLedger, InMemoryLedger};

// Re-export core types for convenience
pub use laurel_core::{
    item_dedupe_key, new_item_id, AwardResult, BadgeDefinition, BadgeEvaluator, BadgeKind,
    BadgeLevel, BadgeNotifier, ContentItem, ContentKind, ContentStore, ContentStoreError,
    CounterField, ItemField, ItemId, LaurelError, LaurelResult, LedgerError, NotifyError,
    Timestamp, UserBadge, UserProfile, UserRef,
};

use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// MOCK CONTENT STORE
// ============================================================================

/// Scripted content store for testing. Unscripted users read as empty
/// collections and an all-zero profile; each fetch kind can be switched to
/// fail for exercising phase-skip behavior.
#[derive(Debug, Default)]
pub struct MockContentStore {
    posts: HashMap<String, Vec<ContentItem>>,
    answers: HashMap<String, Vec<ContentItem>>,
    collections: HashMap<String, Vec<ContentItem>>,
    profiles: HashMap<String, UserProfile>,
    fail_posts: bool,
    fail_answers: bool,
    fail_collections: bool,
    fail_profile: bool,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(mut self, user_ref: &str, items: Vec<ContentItem>) -> Self {
        self.posts.insert(user_ref.to_string(), items);
        self
    }

    pub fn with_answers(mut self, user_ref: &str, items: Vec<ContentItem>) -> Self {
        self.answers.insert(user_ref.to_string(), items);
        self
    }

    pub fn with_collections(mut self, user_ref: &str, items: Vec<ContentItem>) -> Self {
        self.collections.insert(user_ref.to_string(), items);
        self
    }

    pub fn with_profile(mut self, user_ref: &str, profile: UserProfile) -> Self {
        self.profiles.insert(user_ref.to_string(), profile);
        self
    }

    pub fn with_failing_posts(mut self) -> Self {
        self.fail_posts = true;
        self
    }

    pub fn with_failing_answers(mut self) -> Self {
        self.fail_answers = true;
        self
    }

    pub fn with_failing_collections(mut self) -> Self {
        self.fail_collections = true;
        self
    }

    pub fn with_failing_profile(mut self) -> Self {
        self.fail_profile = true;
        self
    }

    fn fetch_fault(what: &str, user_ref: &str) -> LaurelError {
        ContentStoreError::FetchFailed {
            what: what.to_string(),
            user_ref: user_ref.to_string(),
            reason: "injected fault".to_string(),
        }
        .into()
    }
}

impl ContentStore for MockContentStore {
    fn fetch_authored_posts(&self, user_ref: &str) -> LaurelResult<Vec<ContentItem>> {
        if self.fail_posts {
            return Err(Self::fetch_fault("posts", user_ref));
        }
        Ok(self.posts.get(user_ref).cloned().unwrap_or_default())
    }

    fn fetch_authored_answers(&self, user_ref: &str) -> LaurelResult<Vec<ContentItem>> {
        if self.fail_answers {
            return Err(Self::fetch_fault("answers", user_ref));
        }
        Ok(self.answers.get(user_ref).cloned().unwrap_or_default())
    }

    fn fetch_owned_collections(&self, user_ref: &str) -> LaurelResult<Vec<ContentItem>> {
        if self.fail_collections {
            return Err(Self::fetch_fault("collections", user_ref));
        }
        Ok(self.collections.get(user_ref).cloned().unwrap_or_default())
    }

    fn fetch_user_profile(&self, user_ref: &str) -> LaurelResult<UserProfile> {
        if self.fail_profile {
            return Err(Self::fetch_fault("profile", user_ref));
        }
        Ok(self.profiles.get(user_ref).cloned().unwrap_or_default())
    }
}

// ============================================================================
// RECORDING NOTIFIER
// ============================================================================

/// Notifier that records every delivery attempt. In failing mode the
/// attempt is recorded and then reported as failed, for exercising the
/// best-effort notification contract.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: RwLock<Vec<(String, UserBadge)>>,
    fail_delivery: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            notifications: RwLock::new(Vec::new()),
            fail_delivery: true,
        }
    }

    /// All recorded delivery attempts, in order.
    pub fn notifications(&self) -> Vec<(String, UserBadge)> {
        self.notifications.read().unwrap().clone()
    }

    /// Number of attempts for one `(user, badge)` pair.
    pub fn count_for(&self, user_ref: &str, badge_key: &str) -> usize {
        self.notifications
            .read()
            .unwrap()
            .iter()
            .filter(|(user, record)| user == user_ref && record.badge_key == badge_key)
            .count()
    }
}

impl BadgeNotifier for RecordingNotifier {
    fn notify_badge_awarded(&self, user_ref: &str, record: &UserBadge) -> LaurelResult<()> {
        self.notifications
            .write()
            .unwrap()
            .push((user_ref.to_string(), record.clone()));

        if self.fail_delivery {
            return Err(NotifyError::DeliveryFailed {
                user_ref: user_ref.to_string(),
                reason: "injected fault".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// STATIC EVALUATOR
// ============================================================================

/// Evaluator with scripted capabilities and verdicts. A shape left
/// unconfigured is unsupported; `StaticEvaluator::new` alone supports
/// nothing, which exercises the engine's no-capability rejection.
#[derive(Debug, Clone)]
pub struct StaticEvaluator {
    definition: BadgeDefinition,
    item_verdict: Option<bool>,
    item_set_verdict: Option<bool>,
    user_verdict: Option<bool>,
}

impl StaticEvaluator {
    pub fn new(definition: BadgeDefinition) -> Self {
        Self {
            definition,
            item_verdict: None,
            item_set_verdict: None,
            user_verdict: None,
        }
    }

    pub fn with_item_verdict(mut self, verdict: bool) -> Self {
        self.item_verdict = Some(verdict);
        self
    }

    pub fn with_item_set_verdict(mut self, verdict: bool) -> Self {
        self.item_set_verdict = Some(verdict);
        self
    }

    pub fn with_user_verdict(mut self, verdict: bool) -> Self {
        self.user_verdict = Some(verdict);
        self
    }
}

impl BadgeEvaluator for StaticEvaluator {
    fn definition(&self) -> &BadgeDefinition {
        &self.definition
    }

    fn supports_item(&self) -> bool {
        self.item_verdict.is_some()
    }

    fn supports_item_set(&self) -> bool {
        self.item_set_verdict.is_some()
    }

    fn supports_user(&self) -> bool {
        self.user_verdict.is_some()
    }

    fn evaluate_item(&self, _item: &ContentItem) -> bool {
        self.item_verdict.unwrap_or(false)
    }

    fn evaluate_item_set(&self, _items: &[ContentItem]) -> bool {
        self.item_set_verdict.unwrap_or(false)
    }

    fn evaluate_user(&self, _profile: &UserProfile) -> bool {
        self.user_verdict.unwrap_or(false)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating LAUREL entity types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID (for generic ID generation).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a valid UUIDv7 item id (timestamp-sortable).
    pub fn arb_item_id() -> impl Strategy<Value = ItemId> {
        Just(()).prop_map(|_| new_item_id())
    }

    pub fn arb_badge_level() -> impl Strategy<Value = BadgeLevel> {
        prop_oneof![
            Just(BadgeLevel::Bronze),
            Just(BadgeLevel::Silver),
            Just(BadgeLevel::Gold),
            Just(BadgeLevel::Diamond),
        ]
    }

    pub fn arb_badge_kind() -> impl Strategy<Value = BadgeKind> {
        prop_oneof![Just(BadgeKind::OneTime), Just(BadgeKind::Repetitive)]
    }

    pub fn arb_content_kind() -> impl Strategy<Value = ContentKind> {
        prop_oneof![
            Just(ContentKind::Post),
            Just(ContentKind::Answer),
            Just(ContentKind::Collection),
        ]
    }

    /// Generate a badge definition with a plausible kebab-case key.
    pub fn arb_badge_definition() -> impl Strategy<Value = BadgeDefinition> {
        (
            "[a-z]{3,10}-[a-z]{3,10}",
            arb_badge_level(),
            arb_badge_kind(),
            0u32..500,
        )
            .prop_map(|(key, level, kind, reputation)| {
                BadgeDefinition::new(
                    &key,
                    "Generated Badge",
                    "Generated in property tests",
                    "medal-bronze",
                    level,
                    kind,
                    reputation,
                )
            })
    }

    /// Generate a content item whose attributes are consistent with its
    /// kind: only answers may be marked correct, only collections carry
    /// item and follower counts.
    pub fn arb_content_item() -> impl Strategy<Value = ContentItem> {
        (
            arb_content_kind(),
            -100i64..1_000,
            0i64..20_000,
            any::<bool>(),
            0i64..100,
            0i64..100,
            any::<bool>(),
            0i64..10,
            0i64..8,
        )
            .prop_map(
                |(kind, score, views, correct, items, followers, header, images, tags)| {
                    let base = match kind {
                        ContentKind::Post => ContentItem::post(new_item_id())
                            .with_header_image(header)
                            .with_image_count(images),
                        ContentKind::Answer => {
                            ContentItem::answer(new_item_id()).with_correct_answer(correct)
                        }
                        ContentKind::Collection => ContentItem::collection(new_item_id())
                            .with_item_count(items)
                            .with_follower_count(followers),
                    };
                    base.with_score(score)
                        .with_view_count(views)
                        .with_tag_count(tags)
                },
            )
    }

    pub fn arb_user_profile() -> impl Strategy<Value = UserProfile> {
        (
            0i64..100_000,
            0i64..100_000,
            0i64..10_000,
            0i64..10_000,
            0i64..100_000,
            0i64..1_000_000,
            0i64..10_000_000,
            0i64..100_000,
            0i64..1_000_000,
        )
            .prop_map(
                |(
                    questions,
                    answers,
                    articles,
                    links,
                    comments,
                    votes,
                    views,
                    followers,
                    reputation,
                )| UserProfile {
                    questions_authored: questions,
                    answers_authored: answers,
                    articles_authored: articles,
                    links_authored: links,
                    comments_posted: comments,
                    votes_cast: votes,
                    views_accrued: views,
                    followers_gained: followers,
                    reputation_score: reputation,
                },
            )
    }

    /// Generate an award record with an optional per-item dedupe key.
    pub fn arb_user_badge() -> impl Strategy<Value = UserBadge> {
        (
            "[a-z]{3,10}",
            "[a-z]{3,10}-[a-z]{3,10}",
            proptest::option::of((arb_content_kind(), arb_item_id())),
        )
            .prop_map(|(user_ref, badge_key, slot)| {
                let dedupe = slot.map(|(kind, id)| item_dedupe_key(kind, id));
                UserBadge::new(&user_ref, &badge_key, dedupe)
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
