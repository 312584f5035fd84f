//! LAUREL Rules - Data-Driven Badge Catalog
//!
//! Badges are rows of declarative rule configuration interpreted by a small
//! number of parameterized predicate shapes:
//! - Threshold on a single item field
//! - Count / total-score over a whole fetched collection
//! - Threshold or conjunction over lifetime counters
//!
//! One generic [`RuleEvaluator`] interprets a [`RuleSpec`]; the built-in
//! catalog is a table of specs. Operators can append their own
//! [`BadgeEvaluator`] implementations to the catalog; registration order is
//! preserved and keys are not deduplicated (the ledger upserts by key, so
//! the last-registered definition wins).

use laurel_core::{
    BadgeDefinition, BadgeEvaluator, BadgeKind, BadgeLevel, ContentItem, ContentKind,
    CounterField, ItemField, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// COMPARISON OPERATORS
// ============================================================================

/// Threshold comparison operator. The choice of operator is part of each
/// badge's fixed contract and mirrors its description text: "more than N"
/// is [`Cmp::Above`] (strict), "N or more" is [`Cmp::AtLeast`] (inclusive).
/// Tiers of the same badge family intentionally mix operators; rules must
/// not normalize them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmp {
    /// Strict greater-than.
    Above,
    /// Greater-than-or-equal.
    AtLeast,
}

impl Cmp {
    /// Whether `value` satisfies this comparison against `threshold`.
    pub fn matches(&self, value: i64, threshold: i64) -> bool {
        match self {
            Cmp::Above => value > threshold,
            Cmp::AtLeast => value >= threshold,
        }
    }
}

/// One lifetime-counter threshold, the unit of user-aggregate rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterThreshold {
    pub field: CounterField,
    pub cmp: Cmp,
    pub threshold: i64,
}

// ============================================================================
// PREDICATE SHAPES
// ============================================================================

/// Predicate over one content item. Every shape is scoped to exactly one
/// content kind; items of any other kind evaluate to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemPredicate {
    /// Numeric field threshold, e.g. "post score more than 10".
    FieldThreshold {
        kind: ContentKind,
        field: ItemField,
        cmp: Cmp,
        threshold: i64,
    },
    /// Post with a header image and at least `min_images` illustrations.
    IllustratedPost { min_images: i64 },
    /// Item of `kind` carrying at least `min_tags` tags.
    WellTagged { kind: ContentKind, min_tags: i64 },
}

impl ItemPredicate {
    /// Evaluate against one item snapshot. Non-applicable kinds are `false`.
    pub fn matches(&self, item: &ContentItem) -> bool {
        match self {
            ItemPredicate::FieldThreshold {
                kind,
                field,
                cmp,
                threshold,
            } => item.kind == *kind && cmp.matches(item.field(*field), *threshold),
            ItemPredicate::IllustratedPost { min_images } => {
                item.kind == ContentKind::Post
                    && item.has_header_image
                    && item.image_count >= *min_images
            }
            ItemPredicate::WellTagged { kind, min_tags } => {
                item.kind == *kind && item.tag_count >= *min_tags
            }
        }
    }
}

/// Predicate over a whole fetched collection at once. Used for counting and
/// aggregation rules that cannot be decided from a single item. All shapes
/// evaluate an empty slice to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetPredicate {
    /// Number of items of `kind` in the set satisfies the threshold.
    CountOfKind {
        kind: ContentKind,
        cmp: Cmp,
        threshold: i64,
    },
    /// At least one answer in the set is marked correct.
    AnyCorrectAnswer,
    /// Summed score of items of `kind` satisfies the threshold.
    TotalScoreOfKind {
        kind: ContentKind,
        cmp: Cmp,
        threshold: i64,
    },
}

impl SetPredicate {
    /// Evaluate against a fetched collection snapshot.
    pub fn matches(&self, items: &[ContentItem]) -> bool {
        if items.is_empty() {
            return false;
        }
        match self {
            SetPredicate::CountOfKind {
                kind,
                cmp,
                threshold,
            } => {
                let count = items.iter().filter(|i| i.kind == *kind).count() as i64;
                cmp.matches(count, *threshold)
            }
            SetPredicate::AnyCorrectAnswer => items
                .iter()
                .any(|i| i.kind == ContentKind::Answer && i.is_correct_answer),
            SetPredicate::TotalScoreOfKind {
                kind,
                cmp,
                threshold,
            } => {
                let total: i64 = items
                    .iter()
                    .filter(|i| i.kind == *kind)
                    .map(|i| i.score)
                    .sum();
                cmp.matches(total, *threshold)
            }
        }
    }
}

/// Predicate over lifetime counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserPredicate {
    /// Single counter threshold, e.g. "reputation of 5,000 or more".
    Counter(CounterThreshold),
    /// Conjunction of counter thresholds: `true` only when every single
    /// threshold is met simultaneously. An empty conjunction is `false`.
    AllCounters(Vec<CounterThreshold>),
}

impl UserPredicate {
    /// Evaluate against an aggregate profile.
    pub fn matches(&self, profile: &UserProfile) -> bool {
        match self {
            UserPredicate::Counter(t) => cmp_counter(profile, t),
            UserPredicate::AllCounters(thresholds) => {
                !thresholds.is_empty() && thresholds.iter().all(|t| cmp_counter(profile, t))
            }
        }
    }
}

fn cmp_counter(profile: &UserProfile, t: &CounterThreshold) -> bool {
    t.cmp.matches(profile.counter(t.field), t.threshold)
}

// ============================================================================
// RULE SPEC AND GENERIC EVALUATOR
// ============================================================================

/// One row of rule configuration: a badge definition plus at most one
/// predicate per evaluation shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub definition: BadgeDefinition,
    pub item: Option<ItemPredicate>,
    pub item_set: Option<SetPredicate>,
    pub user: Option<UserPredicate>,
}

impl RuleSpec {
    /// Rule decided per content item (repetitive badges).
    pub fn for_item(definition: BadgeDefinition, predicate: ItemPredicate) -> Self {
        Self {
            definition,
            item: Some(predicate),
            item_set: None,
            user: None,
        }
    }

    /// Rule decided over a whole fetched collection (one-time badges).
    pub fn for_item_set(definition: BadgeDefinition, predicate: SetPredicate) -> Self {
        Self {
            definition,
            item: None,
            item_set: Some(predicate),
            user: None,
        }
    }

    /// Rule decided over lifetime counters (one-time badges).
    pub fn for_user(definition: BadgeDefinition, predicate: UserPredicate) -> Self {
        Self {
            definition,
            item: None,
            item_set: None,
            user: Some(predicate),
        }
    }
}

/// Generic evaluator interpreting one [`RuleSpec`]. Capability queries
/// reflect which predicates the spec carries.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    spec: RuleSpec,
}

impl RuleEvaluator {
    pub fn new(spec: RuleSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }
}

impl BadgeEvaluator for RuleEvaluator {
    fn definition(&self) -> &BadgeDefinition {
        &self.spec.definition
    }

    fn supports_item(&self) -> bool {
        self.spec.item.is_some()
    }

    fn supports_item_set(&self) -> bool {
        self.spec.item_set.is_some()
    }

    fn supports_user(&self) -> bool {
        self.spec.user.is_some()
    }

    fn evaluate_item(&self, item: &ContentItem) -> bool {
        self.spec.item.as_ref().is_some_and(|p| p.matches(item))
    }

    fn evaluate_item_set(&self, items: &[ContentItem]) -> bool {
        self.spec.item_set.as_ref().is_some_and(|p| p.matches(items))
    }

    fn evaluate_user(&self, profile: &UserProfile) -> bool {
        self.spec.user.as_ref().is_some_and(|p| p.matches(profile))
    }
}

// ============================================================================
// BADGE CATALOG
// ============================================================================

/// Ordered list of evaluators: the built-in rule table plus any
/// operator-supplied custom evaluators, in registration order. Listing is
/// pure and repeatable; the catalog never deduplicates keys.
pub struct BadgeCatalog {
    evaluators: Vec<Arc<dyn BadgeEvaluator>>,
}

impl BadgeCatalog {
    /// The catalog of badges shipped with the system.
    pub fn builtin() -> Self {
        let evaluators = builtin_rules()
            .into_iter()
            .map(|spec| Arc::new(RuleEvaluator::new(spec)) as Arc<dyn BadgeEvaluator>)
            .collect();
        Self { evaluators }
    }

    /// An empty catalog, for compositions built entirely from custom rules.
    pub fn empty() -> Self {
        Self {
            evaluators: Vec::new(),
        }
    }

    /// Append an evaluator, preserving order.
    pub fn push(&mut self, evaluator: Arc<dyn BadgeEvaluator>) {
        self.evaluators.push(evaluator);
    }

    /// Append an operator-supplied evaluator, preserving order.
    pub fn with_custom(mut self, evaluator: Arc<dyn BadgeEvaluator>) -> Self {
        self.push(evaluator);
        self
    }

    /// The ordered evaluator list.
    pub fn evaluators(&self) -> &[Arc<dyn BadgeEvaluator>] {
        &self.evaluators
    }

    /// Consume the catalog into its evaluator list, the form the engine
    /// takes at construction.
    pub fn into_evaluators(self) -> Vec<Arc<dyn BadgeEvaluator>> {
        self.evaluators
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// BUILT-IN RULE TABLE
// ============================================================================

fn level_icon(level: BadgeLevel) -> &'static str {
    match level {
        BadgeLevel::Bronze => "medal-bronze",
        BadgeLevel::Silver => "medal-silver",
        BadgeLevel::Gold => "medal-gold",
        BadgeLevel::Diamond => "medal-diamond",
    }
}

fn repetitive_badge(
    key: &str,
    name: &str,
    description: &str,
    level: BadgeLevel,
    reputation: u32,
) -> BadgeDefinition {
    BadgeDefinition::new(
        key,
        name,
        description,
        level_icon(level),
        level,
        BadgeKind::Repetitive,
        reputation,
    )
    .as_system()
}

fn one_time_badge(
    key: &str,
    name: &str,
    description: &str,
    level: BadgeLevel,
    reputation: u32,
) -> BadgeDefinition {
    BadgeDefinition::new(
        key,
        name,
        description,
        level_icon(level),
        level,
        BadgeKind::OneTime,
        reputation,
    )
    .as_system()
}

fn item_score(kind: ContentKind, cmp: Cmp, threshold: i64) -> ItemPredicate {
    ItemPredicate::FieldThreshold {
        kind,
        field: ItemField::Score,
        cmp,
        threshold,
    }
}

fn counter(field: CounterField, cmp: Cmp, threshold: i64) -> CounterThreshold {
    CounterThreshold {
        field,
        cmp,
        threshold,
    }
}

/// The shipped badge table. Thresholds and operator wording are fixed
/// contract per badge; the description text states the operator in words.
fn builtin_rules() -> Vec<RuleSpec> {
    use BadgeLevel::{Bronze, Diamond, Gold, Silver};
    use Cmp::{Above, AtLeast};
    use ContentKind::{Answer, Collection, Post};
    use CounterField::*;

    vec![
        // === Question score (per item) ===
        RuleSpec::for_item(
            repetitive_badge(
                "good-question",
                "Good Question",
                "Question with a score of more than 10",
                Bronze,
                10,
            ),
            item_score(Post, Above, 10),
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "great-question",
                "Great Question",
                "Question with a score of more than 25",
                Silver,
                25,
            ),
            item_score(Post, Above, 25),
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "stellar-question",
                "Stellar Question",
                "Question with a score of more than 100",
                Gold,
                100,
            ),
            item_score(Post, Above, 100),
        ),
        // === Question views (per item) ===
        RuleSpec::for_item(
            repetitive_badge(
                "popular-question",
                "Popular Question",
                "Question viewed more than 1,000 times",
                Bronze,
                0,
            ),
            ItemPredicate::FieldThreshold {
                kind: Post,
                field: ItemField::ViewCount,
                cmp: Above,
                threshold: 1_000,
            },
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "famous-question",
                "Famous Question",
                "Question viewed more than 10,000 times",
                Gold,
                0,
            ),
            ItemPredicate::FieldThreshold {
                kind: Post,
                field: ItemField::ViewCount,
                cmp: Above,
                threshold: 10_000,
            },
        ),
        // === Answer score (per item) ===
        RuleSpec::for_item(
            repetitive_badge(
                "good-answer",
                "Good Answer",
                "Answer with a score of more than 10",
                Bronze,
                10,
            ),
            item_score(Answer, Above, 10),
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "great-answer",
                "Great Answer",
                "Answer with a score of more than 25",
                Silver,
                25,
            ),
            item_score(Answer, Above, 25),
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "stellar-answer",
                "Stellar Answer",
                "Answer with a score of more than 100",
                Gold,
                100,
            ),
            item_score(Answer, Above, 100),
        ),
        // === Presentation (per item) ===
        RuleSpec::for_item(
            repetitive_badge(
                "illustrated-question",
                "Illustrated Question",
                "Question with a header image and 2 or more illustrations",
                Bronze,
                5,
            ),
            ItemPredicate::IllustratedPost { min_images: 2 },
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "well-tagged-question",
                "Well-Tagged Question",
                "Question filed under 3 or more tags",
                Bronze,
                5,
            ),
            ItemPredicate::WellTagged {
                kind: Post,
                min_tags: 3,
            },
        ),
        // === Collections (per item) ===
        RuleSpec::for_item(
            repetitive_badge(
                "curated-collection",
                "Curated Collection",
                "Collection with 10 or more items",
                Silver,
                15,
            ),
            ItemPredicate::FieldThreshold {
                kind: Collection,
                field: ItemField::ItemCount,
                cmp: AtLeast,
                threshold: 10,
            },
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "comprehensive-collection",
                "Comprehensive Collection",
                "Collection with more than 50 items",
                Gold,
                50,
            ),
            ItemPredicate::FieldThreshold {
                kind: Collection,
                field: ItemField::ItemCount,
                cmp: Above,
                threshold: 50,
            },
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "followed-collection",
                "Followed Collection",
                "Collection with 5 or more followers",
                Silver,
                15,
            ),
            ItemPredicate::FieldThreshold {
                kind: Collection,
                field: ItemField::FollowerCount,
                cmp: AtLeast,
                threshold: 5,
            },
        ),
        RuleSpec::for_item(
            repetitive_badge(
                "beloved-collection",
                "Beloved Collection",
                "Collection with more than 25 followers",
                Gold,
                50,
            ),
            ItemPredicate::FieldThreshold {
                kind: Collection,
                field: ItemField::FollowerCount,
                cmp: Above,
                threshold: 25,
            },
        ),
        // === Whole-set milestones (one time) ===
        RuleSpec::for_item_set(
            one_time_badge(
                "first-collection",
                "First Collection",
                "Created your first collection",
                Bronze,
                5,
            ),
            SetPredicate::CountOfKind {
                kind: Collection,
                cmp: AtLeast,
                threshold: 1,
            },
        ),
        RuleSpec::for_item_set(
            one_time_badge(
                "collector",
                "Collector",
                "Curated 5 or more collections",
                Silver,
                20,
            ),
            SetPredicate::CountOfKind {
                kind: Collection,
                cmp: AtLeast,
                threshold: 5,
            },
        ),
        RuleSpec::for_item_set(
            one_time_badge(
                "problem-solver",
                "Problem Solver",
                "At least one of your answers has been marked correct",
                Bronze,
                15,
            ),
            SetPredicate::AnyCorrectAnswer,
        ),
        RuleSpec::for_item_set(
            one_time_badge(
                "question-bank",
                "Question Bank",
                "Combined score of your questions is more than 100",
                Silver,
                25,
            ),
            SetPredicate::TotalScoreOfKind {
                kind: Post,
                cmp: Above,
                threshold: 100,
            },
        ),
        RuleSpec::for_item_set(
            one_time_badge(
                "answer-vault",
                "Answer Vault",
                "Combined score of your answers is more than 100",
                Silver,
                25,
            ),
            SetPredicate::TotalScoreOfKind {
                kind: Answer,
                cmp: Above,
                threshold: 100,
            },
        ),
        // === Lifetime counters (one time) ===
        RuleSpec::for_user(
            one_time_badge("curious", "Curious", "Asked 10 or more questions", Bronze, 10),
            UserPredicate::Counter(counter(QuestionsAuthored, AtLeast, 10)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "inquisitive",
                "Inquisitive",
                "Asked 50 or more questions",
                Silver,
                25,
            ),
            UserPredicate::Counter(counter(QuestionsAuthored, AtLeast, 50)),
        ),
        RuleSpec::for_user(
            one_time_badge("helpful", "Helpful", "Posted 10 or more answers", Bronze, 10),
            UserPredicate::Counter(counter(AnswersAuthored, AtLeast, 10)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "supportive",
                "Supportive",
                "Posted 50 or more answers",
                Silver,
                25,
            ),
            UserPredicate::Counter(counter(AnswersAuthored, AtLeast, 50)),
        ),
        RuleSpec::for_user(
            one_time_badge("scribe", "Scribe", "Published 10 or more articles", Bronze, 10),
            UserPredicate::Counter(counter(ArticlesAuthored, AtLeast, 10)),
        ),
        RuleSpec::for_user(
            one_time_badge("connector", "Connector", "Shared 10 or more links", Bronze, 10),
            UserPredicate::Counter(counter(LinksAuthored, AtLeast, 10)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "commentator",
                "Commentator",
                "Posted 100 or more comments",
                Bronze,
                10,
            ),
            UserPredicate::Counter(counter(CommentsPosted, AtLeast, 100)),
        ),
        RuleSpec::for_user(
            one_time_badge("civic-duty", "Civic Duty", "Cast 100 or more votes", Bronze, 10),
            UserPredicate::Counter(counter(VotesCast, AtLeast, 100)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "electorate",
                "Electorate",
                "Cast 1,000 or more votes",
                Silver,
                25,
            ),
            UserPredicate::Counter(counter(VotesCast, AtLeast, 1_000)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "audience",
                "Audience",
                "Content viewed 10,000 or more times in total",
                Silver,
                25,
            ),
            UserPredicate::Counter(counter(ViewsAccrued, AtLeast, 10_000)),
        ),
        RuleSpec::for_user(
            one_time_badge("fanbase", "Fanbase", "Gained 25 or more followers", Silver, 25),
            UserPredicate::Counter(counter(FollowersGained, AtLeast, 25)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "established",
                "Established",
                "Reached a reputation of 1,000 or more",
                Silver,
                0,
            ),
            UserPredicate::Counter(counter(Reputation, AtLeast, 1_000)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "trusted",
                "Trusted",
                "Reached a reputation of 5,000 or more",
                Gold,
                0,
            ),
            UserPredicate::Counter(counter(Reputation, AtLeast, 5_000)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "luminary",
                "Luminary",
                "Reached a reputation of 25,000 or more",
                Diamond,
                0,
            ),
            UserPredicate::Counter(counter(Reputation, AtLeast, 25_000)),
        ),
        RuleSpec::for_user(
            one_time_badge(
                "encyclopedia",
                "Encyclopedia",
                "Authored 10 or more each of questions, answers, articles, and links",
                Diamond,
                100,
            ),
            UserPredicate::AllCounters(vec![
                counter(QuestionsAuthored, AtLeast, 10),
                counter(AnswersAuthored, AtLeast, 10),
                counter(ArticlesAuthored, AtLeast, 10),
                counter(LinksAuthored, AtLeast, 10),
            ]),
        ),
    ]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use laurel_core::new_item_id;
    use std::collections::HashSet;

    fn find(catalog: &BadgeCatalog, key: &str) -> Arc<dyn BadgeEvaluator> {
        catalog
            .evaluators()
            .iter()
            .find(|e| e.key() == key)
            .unwrap_or_else(|| panic!("no builtin badge {key}"))
            .clone()
    }

    // ========================================================================
    // Threshold Boundary Tests
    // ========================================================================

    #[test]
    fn test_above_rejects_threshold_value() {
        let catalog = BadgeCatalog::builtin();
        let good_question = find(&catalog, "good-question");

        let at_threshold = ContentItem::post(new_item_id()).with_score(10);
        let over_threshold = ContentItem::post(new_item_id()).with_score(11);

        assert!(!good_question.evaluate_item(&at_threshold));
        assert!(good_question.evaluate_item(&over_threshold));
    }

    #[test]
    fn test_at_least_accepts_threshold_value() {
        let catalog = BadgeCatalog::builtin();
        let followed = find(&catalog, "followed-collection");

        let at_threshold = ContentItem::collection(new_item_id()).with_follower_count(5);
        let under_threshold = ContentItem::collection(new_item_id()).with_follower_count(4);

        assert!(followed.evaluate_item(&at_threshold));
        assert!(!followed.evaluate_item(&under_threshold));
    }

    #[test]
    fn test_aggregate_at_least_accepts_exact_count() {
        let catalog = BadgeCatalog::builtin();
        let curious = find(&catalog, "curious");

        let profile = UserProfile {
            questions_authored: 10,
            ..Default::default()
        };
        assert!(curious.evaluate_user(&profile));

        let short = UserProfile {
            questions_authored: 9,
            ..Default::default()
        };
        assert!(!curious.evaluate_user(&short));
    }

    // ========================================================================
    // Applicability Tests
    // ========================================================================

    #[test]
    fn test_question_rule_is_false_for_answers() {
        let catalog = BadgeCatalog::builtin();
        let good_question = find(&catalog, "good-question");

        // Same score, wrong kind.
        let answer = ContentItem::answer(new_item_id()).with_score(50);
        assert!(!good_question.evaluate_item(&answer));
    }

    #[test]
    fn test_collection_rule_is_false_for_posts() {
        let catalog = BadgeCatalog::builtin();
        let curated = find(&catalog, "curated-collection");

        let post = ContentItem::post(new_item_id()).with_item_count(100);
        assert!(!curated.evaluate_item(&post));
    }

    #[test]
    fn test_illustrated_question_needs_header_and_count() {
        let catalog = BadgeCatalog::builtin();
        let illustrated = find(&catalog, "illustrated-question");

        let no_header = ContentItem::post(new_item_id()).with_image_count(5);
        let too_few = ContentItem::post(new_item_id())
            .with_header_image(true)
            .with_image_count(1);
        let qualifying = ContentItem::post(new_item_id())
            .with_header_image(true)
            .with_image_count(2);

        assert!(!illustrated.evaluate_item(&no_header));
        assert!(!illustrated.evaluate_item(&too_few));
        assert!(illustrated.evaluate_item(&qualifying));
    }

    // ========================================================================
    // Set Predicate Tests
    // ========================================================================

    #[test]
    fn test_set_predicates_tolerate_empty_sets() {
        let catalog = BadgeCatalog::builtin();
        for key in [
            "first-collection",
            "collector",
            "problem-solver",
            "question-bank",
            "answer-vault",
        ] {
            assert!(
                !find(&catalog, key).evaluate_item_set(&[]),
                "{key} matched an empty set"
            );
        }
    }

    #[test]
    fn test_first_collection_counts_one() {
        let catalog = BadgeCatalog::builtin();
        let first = find(&catalog, "first-collection");

        let one = vec![ContentItem::collection(new_item_id())];
        assert!(first.evaluate_item_set(&one));
    }

    #[test]
    fn test_any_correct_answer() {
        let catalog = BadgeCatalog::builtin();
        let solver = find(&catalog, "problem-solver");

        let unaccepted = vec![
            ContentItem::answer(new_item_id()).with_score(30),
            ContentItem::answer(new_item_id()),
        ];
        assert!(!solver.evaluate_item_set(&unaccepted));

        let accepted = vec![
            ContentItem::answer(new_item_id()),
            ContentItem::answer(new_item_id()).with_correct_answer(true),
        ];
        assert!(solver.evaluate_item_set(&accepted));
    }

    #[test]
    fn test_total_score_sums_negative_scores() {
        let catalog = BadgeCatalog::builtin();
        let bank = find(&catalog, "question-bank");

        // 60 + 45 = 105 > 100
        let qualifying = vec![
            ContentItem::post(new_item_id()).with_score(60),
            ContentItem::post(new_item_id()).with_score(45),
        ];
        assert!(bank.evaluate_item_set(&qualifying));

        // 60 + 45 - 10 = 95, the downvoted post drags the total under
        let dragged = vec![
            ContentItem::post(new_item_id()).with_score(60),
            ContentItem::post(new_item_id()).with_score(45),
            ContentItem::post(new_item_id()).with_score(-10),
        ];
        assert!(!bank.evaluate_item_set(&dragged));
    }

    // ========================================================================
    // User Predicate Tests
    // ========================================================================

    #[test]
    fn test_encyclopedia_conjunction_all_or_nothing() {
        let catalog = BadgeCatalog::builtin();
        let encyclopedia = find(&catalog, "encyclopedia");

        let complete = UserProfile {
            questions_authored: 10,
            answers_authored: 10,
            articles_authored: 10,
            links_authored: 10,
            ..Default::default()
        };
        assert!(encyclopedia.evaluate_user(&complete));

        // One counter one below its threshold fails the whole conjunction.
        for missing in 0..4 {
            let mut profile = complete.clone();
            match missing {
                0 => profile.questions_authored = 9,
                1 => profile.answers_authored = 9,
                2 => profile.articles_authored = 9,
                _ => profile.links_authored = 9,
            }
            assert!(!encyclopedia.evaluate_user(&profile));
        }
    }

    #[test]
    fn test_zero_profile_earns_no_builtin_badge() {
        let catalog = BadgeCatalog::builtin();
        let profile = UserProfile::default();
        for evaluator in catalog.evaluators() {
            if evaluator.supports_user() {
                assert!(
                    !evaluator.evaluate_user(&profile),
                    "{} matched an all-zero profile",
                    evaluator.key()
                );
            }
        }
    }

    // ========================================================================
    // Catalog Shape Tests
    // ========================================================================

    #[test]
    fn test_builtin_keys_are_unique() {
        let catalog = BadgeCatalog::builtin();
        let mut seen = HashSet::new();
        for evaluator in catalog.evaluators() {
            assert!(
                seen.insert(evaluator.key().to_string()),
                "duplicate builtin key {}",
                evaluator.key()
            );
        }
    }

    #[test]
    fn test_builtin_evaluators_expose_exactly_one_shape() {
        let catalog = BadgeCatalog::builtin();
        for evaluator in catalog.evaluators() {
            let shapes = [
                evaluator.supports_item(),
                evaluator.supports_item_set(),
                evaluator.supports_user(),
            ]
            .iter()
            .filter(|s| **s)
            .count();
            assert_eq!(shapes, 1, "{} exposes {shapes} shapes", evaluator.key());
        }
    }

    #[test]
    fn test_builtin_kind_matches_shape() {
        // Per-item rules are repetitive; set and user rules are one-time.
        let catalog = BadgeCatalog::builtin();
        for evaluator in catalog.evaluators() {
            let expected = if evaluator.supports_item() {
                BadgeKind::Repetitive
            } else {
                BadgeKind::OneTime
            };
            assert_eq!(
                evaluator.definition().kind,
                expected,
                "{} kind does not match its shape",
                evaluator.key()
            );
        }
    }

    #[test]
    fn test_builtin_badges_are_system_badges() {
        let catalog = BadgeCatalog::builtin();
        for evaluator in catalog.evaluators() {
            assert!(evaluator.definition().is_system_badge);
        }
    }

    #[test]
    fn test_catalog_preserves_order_and_duplicates() {
        let duplicate = Arc::new(RuleEvaluator::new(RuleSpec::for_user(
            one_time_badge(
                "curious",
                "Curious",
                "Operator override",
                BadgeLevel::Bronze,
                0,
            ),
            UserPredicate::Counter(counter(CounterField::QuestionsAuthored, Cmp::AtLeast, 1)),
        )));

        let base_len = BadgeCatalog::builtin().len();
        let catalog = BadgeCatalog::builtin().with_custom(duplicate);

        assert_eq!(catalog.len(), base_len + 1);
        // The duplicate key is appended, not merged; last wins at upsert.
        assert_eq!(catalog.evaluators().last().unwrap().key(), "curious");
    }

    #[test]
    fn test_listing_is_repeatable() {
        let a: Vec<String> = BadgeCatalog::builtin()
            .evaluators()
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        let b: Vec<String> = BadgeCatalog::builtin()
            .evaluators()
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        assert_eq!(a, b);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
