//! LAUREL Core - Entity Types
//!
//! Pure data structures and collaborator trait seams. All other crates
//! depend on this. This crate contains ONLY data types and the traits
//! that connect the engine to its collaborators - no business logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Content item identifier using UUIDv7 for timestamp-sortable IDs.
pub type ItemId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque user identifier. The engine never interprets it; it only keys
/// award records and collaborator fetches by it.
pub type UserRef = String;

/// Generate a new UUIDv7 ItemId (timestamp-sortable).
pub fn new_item_id() -> ItemId {
    Uuid::now_v7()
}

/// Dedupe key for a per-item award slot, e.g. `"post:0192..."`.
/// Per-item badges are re-awardable once per distinct item, so the slot is
/// scoped to the item rather than to the user as a whole.
pub fn item_dedupe_key(kind: ContentKind, item_id: ItemId) -> String {
    format!("{}:{}", kind.as_str(), item_id)
}

// ============================================================================
// ENUMS
// ============================================================================

/// Badge tier. The derived ordering is part of the contract:
/// bronze < silver < gold < diamond.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum BadgeLevel {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

/// Award uniqueness semantics for a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BadgeKind {
    /// Granted at most once per user.
    OneTime,
    /// Granted once per qualifying content item (per-item dedupe key).
    Repetitive,
}

/// Content kind discriminator for evaluable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Post,
    Answer,
    Collection,
}

impl ContentKind {
    /// Stable wire name, used as the dedupe-key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Answer => "answer",
            ContentKind::Collection => "collection",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric fields of a content item addressable by data-driven rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemField {
    Score,
    ViewCount,
    ItemCount,
    FollowerCount,
    ImageCount,
    TagCount,
}

/// Lifetime counters of a user profile addressable by data-driven rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterField {
    QuestionsAuthored,
    AnswersAuthored,
    ArticlesAuthored,
    LinksAuthored,
    CommentsPosted,
    VotesCast,
    ViewsAccrued,
    FollowersGained,
    Reputation,
}

// ============================================================================
// BADGE DEFINITION
// ============================================================================

/// Immutable metadata describing one achievement. Identified by a globally
/// unique `key`; registered into the ledger by upsert-by-key at startup and
/// never mutated afterwards except by idempotent re-registration.
///
/// The `description` text documents the comparison operator of the badge's
/// threshold ("more than N" is strict, "N or more" is inclusive). That
/// wording is the fixed contract for the badge; rule tables must match it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    /// Globally unique badge key, e.g. `"good-question"`.
    pub key: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub level: BadgeLevel,
    pub kind: BadgeKind,
    /// Reputation granted alongside the badge. Non-negative.
    pub reputation_award: u32,
    /// Informational flag: whether the badge ships with the system.
    pub is_system_badge: bool,
}

impl BadgeDefinition {
    /// Create a new badge definition. `is_system_badge` defaults to false.
    pub fn new(
        key: &str,
        name: &str,
        description: &str,
        icon: &str,
        level: BadgeLevel,
        kind: BadgeKind,
        reputation_award: u32,
    ) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            level,
            kind,
            reputation_award,
            is_system_badge: false,
        }
    }

    /// Mark this definition as a system badge.
    pub fn as_system(mut self) -> Self {
        self.is_system_badge = true;
        self
    }
}

// ============================================================================
// EVALUABLE CONTENT ITEM
// ============================================================================

/// Point-in-time snapshot of one post, answer, or collection, tagged by
/// `kind`. Attributes that do not apply to a kind stay at their zero/false
/// defaults, which is also how missing fields are modeled: evaluators treat
/// absent numeric fields as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub item_id: ItemId,
    pub kind: ContentKind,
    /// Net vote score. May be negative.
    pub score: i64,
    pub view_count: i64,
    /// Answers only: accepted as the correct answer.
    pub is_correct_answer: bool,
    /// Collections only: number of curated items.
    pub item_count: i64,
    /// Collections only: number of followers.
    pub follower_count: i64,
    pub has_header_image: bool,
    pub image_count: i64,
    pub tag_count: i64,
}

impl ContentItem {
    fn new(item_id: ItemId, kind: ContentKind) -> Self {
        Self {
            item_id,
            kind,
            score: 0,
            view_count: 0,
            is_correct_answer: false,
            item_count: 0,
            follower_count: 0,
            has_header_image: false,
            image_count: 0,
            tag_count: 0,
        }
    }

    /// Create a post snapshot with all attributes at their defaults.
    pub fn post(item_id: ItemId) -> Self {
        Self::new(item_id, ContentKind::Post)
    }

    /// Create an answer snapshot with all attributes at their defaults.
    pub fn answer(item_id: ItemId) -> Self {
        Self::new(item_id, ContentKind::Answer)
    }

    /// Create a collection snapshot with all attributes at their defaults.
    pub fn collection(item_id: ItemId) -> Self {
        Self::new(item_id, ContentKind::Collection)
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    pub fn with_view_count(mut self, view_count: i64) -> Self {
        self.view_count = view_count;
        self
    }

    pub fn with_correct_answer(mut self, correct: bool) -> Self {
        self.is_correct_answer = correct;
        self
    }

    pub fn with_item_count(mut self, item_count: i64) -> Self {
        self.item_count = item_count;
        self
    }

    pub fn with_follower_count(mut self, follower_count: i64) -> Self {
        self.follower_count = follower_count;
        self
    }

    pub fn with_header_image(mut self, has_header_image: bool) -> Self {
        self.has_header_image = has_header_image;
        self
    }

    pub fn with_image_count(mut self, image_count: i64) -> Self {
        self.image_count = image_count;
        self
    }

    pub fn with_tag_count(mut self, tag_count: i64) -> Self {
        self.tag_count = tag_count;
        self
    }

    /// Read a numeric field by name. Fields that do not apply to this
    /// item's kind read as zero.
    pub fn field(&self, field: ItemField) -> i64 {
        match field {
            ItemField::Score => self.score,
            ItemField::ViewCount => self.view_count,
            ItemField::ItemCount => self.item_count,
            ItemField::FollowerCount => self.follower_count,
            ItemField::ImageCount => self.image_count,
            ItemField::TagCount => self.tag_count,
        }
    }
}

// ============================================================================
// USER AGGREGATE PROFILE
// ============================================================================

/// Read-only projection of a user's lifetime counters. Supplied by the
/// content store; the engine never mutates it. `Default` is the all-zero
/// profile of a brand-new user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub questions_authored: i64,
    pub answers_authored: i64,
    pub articles_authored: i64,
    pub links_authored: i64,
    pub comments_posted: i64,
    pub votes_cast: i64,
    pub views_accrued: i64,
    pub followers_gained: i64,
    pub reputation_score: i64,
}

impl UserProfile {
    /// Read a lifetime counter by name.
    pub fn counter(&self, field: CounterField) -> i64 {
        match field {
            CounterField::QuestionsAuthored => self.questions_authored,
            CounterField::AnswersAuthored => self.answers_authored,
            CounterField::ArticlesAuthored => self.articles_authored,
            CounterField::LinksAuthored => self.links_authored,
            CounterField::CommentsPosted => self.comments_posted,
            CounterField::VotesCast => self.votes_cast,
            CounterField::ViewsAccrued => self.views_accrued,
            CounterField::FollowersGained => self.followers_gained,
            CounterField::Reputation => self.reputation_score,
        }
    }
}

// ============================================================================
// AWARD RECORDS
// ============================================================================

/// One grant of a badge to one user. The tuple
/// `(user_ref, badge_key, dedupe_key)` is unique; a record with no dedupe
/// key is itself a fixed slot per `(user_ref, badge_key)`. Never updated,
/// never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub record_id: Uuid,
    pub user_ref: UserRef,
    pub badge_key: String,
    pub granted_at: Timestamp,
    pub dedupe_key: Option<String>,
}

impl UserBadge {
    /// Create a new award record granted now.
    pub fn new(user_ref: &str, badge_key: &str, dedupe_key: Option<String>) -> Self {
        Self {
            record_id: Uuid::now_v7(),
            user_ref: user_ref.to_string(),
            badge_key: badge_key.to_string(),
            granted_at: Utc::now(),
            dedupe_key,
        }
    }
}

/// Outcome of a ledger award call: the record occupying the slot, and
/// whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardResult {
    pub record: UserBadge,
    pub is_new: bool,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Badge ledger errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Definition upsert failed for {key}: {reason}")]
    UpsertFailed { key: String, reason: String },

    #[error("Award insert failed for {badge_key}: {reason}")]
    AwardFailed { badge_key: String, reason: String },

    #[error("Ledger lock poisoned")]
    LockPoisoned,

    #[error("Ledger backend fault: {reason}")]
    Backend { reason: String },
}

/// Content store fetch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentStoreError {
    #[error("Fetching {what} for user {user_ref} failed: {reason}")]
    FetchFailed {
        what: String,
        user_ref: String,
        reason: String,
    },
}

/// Notification delivery errors. Always best-effort from the engine's
/// perspective: a delivery fault never invalidates the award.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Badge notification for user {user_ref} failed: {reason}")]
    DeliveryFailed { user_ref: String, reason: String },
}

/// Catalog registration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Evaluator for badge {key} exposes no evaluation shape")]
    NoCapability { key: String },
}

/// Master error type for all LAUREL operations.
#[derive(Debug, Clone, Error)]
pub enum LaurelError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Content store error: {0}")]
    ContentStore(#[from] ContentStoreError),

    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result type alias for LAUREL operations.
pub type LaurelResult<T> = Result<T, LaurelError>;

// ============================================================================
// EVALUATOR SEAM
// ============================================================================

/// Predicate logic unit bound to one badge definition, polymorphic over
/// three evaluation shapes. Implementations expose the shapes they support
/// through the capability queries; the orchestrator only invokes operations
/// an evaluator actually exposes, so the `evaluate_*` defaults are never
/// reached through a well-behaved caller.
///
/// All predicates are stateless and deterministic for a given snapshot.
/// Non-applicable item kinds evaluate to `false`, never an error; empty
/// item sets and all-zero profiles are tolerated.
pub trait BadgeEvaluator: Send + Sync {
    /// The badge definition this evaluator decides.
    fn definition(&self) -> &BadgeDefinition;

    /// The associated badge key, passed to the ledger on a positive match.
    fn key(&self) -> &str {
        &self.definition().key
    }

    fn supports_item(&self) -> bool {
        false
    }

    fn supports_item_set(&self) -> bool {
        false
    }

    fn supports_user(&self) -> bool {
        false
    }

    /// True if the evaluator supports at least one evaluation shape.
    /// Evaluators supporting none are rejected at engine construction.
    fn supports_any(&self) -> bool {
        self.supports_item() || self.supports_item_set() || self.supports_user()
    }

    /// Predicate over one content item.
    fn evaluate_item(&self, _item: &ContentItem) -> bool {
        false
    }

    /// Predicate over a whole fetched collection at once. Must return
    /// `false` for an empty slice.
    fn evaluate_item_set(&self, _items: &[ContentItem]) -> bool {
        false
    }

    /// Predicate over the user's lifetime counters.
    fn evaluate_user(&self, _profile: &UserProfile) -> bool {
        false
    }
}

// ============================================================================
// CONTENT STORE SEAM
// ============================================================================

/// Read-only collaborator supplying point-in-time snapshots of a user's
/// authored content and aggregate profile. The engine holds no
/// subscriptions; every sweep re-fetches.
pub trait ContentStore: Send + Sync {
    /// The user's authored, active posts.
    fn fetch_authored_posts(&self, user_ref: &str) -> LaurelResult<Vec<ContentItem>>;

    /// The user's authored answers.
    fn fetch_authored_answers(&self, user_ref: &str) -> LaurelResult<Vec<ContentItem>>;

    /// The collections the user owns.
    fn fetch_owned_collections(&self, user_ref: &str) -> LaurelResult<Vec<ContentItem>>;

    /// The user's aggregate lifetime counters.
    fn fetch_user_profile(&self, user_ref: &str) -> LaurelResult<UserProfile>;
}

// ============================================================================
// NOTIFICATION SEAM
// ============================================================================

/// Downstream notification collaborator. Invoked once per genuinely new
/// award; fire-and-forget from the engine's perspective.
pub trait BadgeNotifier: Send + Sync {
    fn notify_badge_awarded(&self, user_ref: &str, record: &UserBadge) -> LaurelResult<()>;
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
