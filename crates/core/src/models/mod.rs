//! Shared domain models.

mod identity;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use identity::ItemKey;

/// Release state reported by the catalog, used for filtering, grouping and badges.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    /// Already purchasable.
    Released,
    /// Announced with a near release date.
    ComingSoon,
    /// Announced without a near release date.
    DistantFuture,
    /// Missing or unrecognised status.
    #[default]
    Unknown,
}

impl ReleaseStatus {
    /// All statuses in grouping order.
    pub const ALL: [ReleaseStatus; 4] = [
        Self::Released,
        Self::ComingSoon,
        Self::DistantFuture,
        Self::Unknown,
    ];

    /// Case-insensitive parse of the raw column; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "released" => Self::Released,
            "coming_soon" => Self::ComingSoon,
            "distant_future" => Self::DistantFuture,
            _ => Self::Unknown,
        }
    }

    /// Value as stored in the sheet.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::ComingSoon => "coming_soon",
            Self::DistantFuture => "distant_future",
            Self::Unknown => "unknown",
        }
    }

    /// Position when grouping by status.
    pub fn rank(self) -> u8 {
        match self {
            Self::Released => 0,
            Self::ComingSoon => 1,
            Self::DistantFuture => 2,
            Self::Unknown => 3,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Released => "Released",
            Self::ComingSoon => "Coming Soon",
            Self::DistantFuture => "Distant Future",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalised catalog row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Identity used by favorites and lists.
    pub key: ItemKey,
    /// Numeric store id, when the row carried a usable one.
    pub app_id: Option<u64>,
    /// Display name.
    pub name: String,
    /// One-line store blurb.
    pub short_description: Option<String>,
    /// Full store description, HTML.
    pub detailed_description: Option<String>,
    /// "About this game" section, HTML.
    pub about_the_game: Option<String>,
    /// Comma-separated genres.
    pub genres: Option<String>,
    /// Comma-separated store categories.
    pub categories: Option<String>,
    /// Developer names.
    pub developers: Option<String>,
    /// Publisher names.
    pub publishers: Option<String>,
    /// Comma-separated community tags, most popular first.
    pub community_tags: Option<String>,
    /// Store page.
    pub url: Option<String>,
    /// Support contact address.
    pub support_email: Option<String>,
    /// Support page.
    pub support_url: Option<String>,
    /// Capsule image URL.
    pub header_image: Option<String>,
    /// JSON array of screenshot objects, kept verbatim.
    pub screenshots: Option<String>,
    /// JSON array of movie objects, kept verbatim.
    pub movies: Option<String>,
    /// First trailer, when the movies column is missing.
    pub first_trailer_url: Option<String>,
    /// First screenshot, when the screenshots column is missing.
    pub first_screenshot_url: Option<String>,
    /// A demo exists for this item.
    pub demo: bool,
    /// The row itself is a demo.
    pub is_demo: bool,
    /// Store marks the item as coming soon.
    pub is_coming_soon: bool,
    /// The release date is an estimate.
    pub is_placeholder_date: bool,
    /// Normalised release state.
    pub release_status: ReleaseStatus,
    /// Release date as displayed by the store.
    pub release_date: Option<String>,
    /// Release date parsed from `release_date`, when recognisable.
    pub release_on: Option<NaiveDate>,
    /// When the row was added to the tracker.
    pub date_added: Option<DateTime<Utc>>,
}

impl CatalogItem {
    /// Build an item with only identity fields set.
    pub fn named(app_id: Option<u64>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: ItemKey::derive(app_id, &name),
            app_id,
            name,
            ..Self::default()
        }
    }

    /// True when either demo column is set.
    pub fn has_demo(&self) -> bool {
        self.demo || self.is_demo
    }

    /// First non-empty of the detailed, about-the-game and short descriptions.
    pub fn primary_description(&self) -> Option<&str> {
        [
            &self.detailed_description,
            &self.about_the_game,
            &self.short_description,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .map(str::trim)
        .find(|text| !text.is_empty())
    }

    /// Trimmed, non-empty tags in popularity order.
    pub fn tags(&self) -> Vec<&str> {
        self.community_tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lower-cased text searched by keyword queries.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if !self.name.trim().is_empty() {
            parts.push(&self.name);
        }
        if let Some(description) = self.primary_description() {
            parts.push(description);
        }
        for field in [&self.genres, &self.categories] {
            if let Some(value) = field.as_deref().filter(|v| !v.trim().is_empty()) {
                parts.push(value);
            }
        }
        parts.join(" ").to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(ReleaseStatus::parse(" Coming_Soon "), ReleaseStatus::ComingSoon);
        assert_eq!(ReleaseStatus::parse("RELEASED"), ReleaseStatus::Released);
        assert_eq!(ReleaseStatus::parse("early access"), ReleaseStatus::Unknown);
    }

    #[test]
    fn search_text_uses_first_description_only() {
        let mut item = CatalogItem::named(Some(1), "Hades");
        item.detailed_description = Some("   ".into());
        item.about_the_game = Some("Defy the god of the dead".into());
        item.short_description = Some("Roguelike dungeon crawler".into());
        item.genres = Some("Action, Indie".into());
        item.categories = Some("Single-player".into());

        let text = item.search_text();
        assert_eq!(text, "hades defy the god of the dead action, indie single-player");
        assert!(!text.contains("roguelike"));
    }

    #[test]
    fn tags_skip_blank_entries() {
        let mut item = CatalogItem::named(None, "Stardew Valley");
        item.community_tags = Some("Farming Sim, , Pixel Graphics ,Cozy".into());
        assert_eq!(item.tags(), vec!["Farming Sim", "Pixel Graphics", "Cozy"]);
    }
}
