use std::collections::BTreeSet;

use crate::models::{CatalogItem, ItemKey, ReleaseStatus};

/// Tag fragments that mark an item as adult content.
pub const ADULT_TAGS: [&str; 11] = [
    "sexual content",
    "nudity",
    "mature",
    "nsfw",
    "adult content",
    "hentai",
    "sexual",
    "erotic",
    "adult",
    "sex",
    "nude",
];

/// Read access to the user's favorites and lists.
pub trait Membership {
    /// Whether `key` is favorited.
    fn is_favorite(&self, key: &ItemKey) -> bool;
    /// Whether `key` is in the list named `list`. Unknown lists contain nothing.
    fn is_in_list(&self, list: &str, key: &ItemKey) -> bool;
}

/// Membership with no favorites and no lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMembership;

impl Membership for NoMembership {
    fn is_favorite(&self, _key: &ItemKey) -> bool {
        false
    }

    fn is_in_list(&self, _list: &str, _key: &ItemKey) -> bool {
        false
    }
}

/// Restricts results to curated items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MembershipFilter {
    /// No restriction.
    #[default]
    All,
    /// Only favorites.
    Favorites,
    /// Only members of the named list.
    List(String),
}

/// User-selected filter values. Unset criteria pass everything through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    /// Comma-separated keyword phrases; any match keeps the item.
    pub keywords: String,
    /// Tags that must all be present.
    pub include_tags: Vec<String>,
    /// Tags of which none may be present.
    pub exclude_tags: Vec<String>,
    /// Only items with a demo.
    pub demo_only: bool,
    /// Only items with this release status.
    pub release_status: Option<ReleaseStatus>,
    /// Keep adult-tagged items.
    pub show_adult: bool,
    /// Favorites/list restriction.
    pub membership: MembershipFilter,
}

/// Filtered items plus how many were removed only for being adult content.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Items that passed every predicate, in input order.
    pub items: Vec<CatalogItem>,
    /// Items that passed every other predicate but were adult and hidden.
    pub hidden_adult: usize,
}

/// Parsed form of the criteria, lower-cased once per call.
struct Prepared<'a> {
    keywords: Vec<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    criteria: &'a FilterCriteria,
}

impl<'a> Prepared<'a> {
    fn new(criteria: &'a FilterCriteria) -> Self {
        Self {
            keywords: parse_keywords(&criteria.keywords),
            include: lower_all(&criteria.include_tags),
            exclude: lower_all(&criteria.exclude_tags),
            criteria,
        }
    }

    fn flags_pass(&self, item: &CatalogItem, membership: &impl Membership) -> bool {
        if self.criteria.demo_only && !item.has_demo() {
            return false;
        }
        if let Some(status) = self.criteria.release_status {
            if item.release_status != status {
                return false;
            }
        }
        match &self.criteria.membership {
            MembershipFilter::All => true,
            MembershipFilter::Favorites => membership.is_favorite(&item.key),
            MembershipFilter::List(name) => membership.is_in_list(name, &item.key),
        }
    }

    fn tags_pass(&self, tags: &str) -> bool {
        self.include.iter().all(|tag| tags.contains(tag.as_str()))
            && !self.exclude.iter().any(|tag| tags.contains(tag.as_str()))
    }

    fn keywords_pass(&self, item: &CatalogItem) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = item.search_text();
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }
}

/// Apply every predicate conjunctively. Pure; the result keeps input order.
pub fn apply(
    items: &[CatalogItem],
    criteria: &FilterCriteria,
    membership: &impl Membership,
) -> FilterOutcome {
    let prepared = Prepared::new(criteria);
    let mut outcome = FilterOutcome::default();

    for item in items {
        if !prepared.flags_pass(item, membership) {
            continue;
        }
        let tags = lowered_tags(item);
        if !prepared.tags_pass(&tags) || !prepared.keywords_pass(item) {
            continue;
        }
        if !criteria.show_adult && is_adult_tags(&tags) {
            outcome.hidden_adult += 1;
            continue;
        }
        outcome.items.push(item.clone());
    }

    outcome
}

/// Whether the item's tags mark it as adult content.
pub fn is_adult(item: &CatalogItem) -> bool {
    is_adult_tags(&lowered_tags(item))
}

fn is_adult_tags(lowered: &str) -> bool {
    ADULT_TAGS.iter().any(|tag| lowered.contains(tag))
}

fn lowered_tags(item: &CatalogItem) -> String {
    item.community_tags
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Split a comma-separated query into trimmed, lower-cased, non-empty keywords.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn lower_all(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Every distinct tag across the catalog, sorted.
pub fn available_tags(items: &[CatalogItem]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.tags())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
