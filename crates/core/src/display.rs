//! Presentation helpers shared by frontends.

use std::{cmp::Reverse, collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::models::{CatalogItem, ReleaseStatus};

const TAG_DISPLAY_LIMIT: usize = 10;
const POPULAR_TAG_COUNT: usize = 5;
const UNKNOWN: &str = "Unknown";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("invalid markup regex"));
static BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(br|/p|/li|/h[1-6])\s*/?>").expect("invalid break regex"));

/// `YYYY-MM-DD HH:MM`, or `Unknown` when the item has no timestamp.
pub fn format_date_added(date_added: Option<DateTime<Utc>>) -> String {
    date_added
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Store descriptions with markup removed, common entities decoded and
/// paragraphs separated by single blank lines.
pub fn plain_text(raw: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(raw, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    let mut paragraphs = Vec::new();
    for line in decoded.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            paragraphs.push(line);
        }
    }
    paragraphs.join("\n\n")
}

/// Color family for a release status; frontends map it to their palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorHint {
    /// Released.
    Green,
    /// Coming soon.
    Orange,
    /// Distant future.
    Blue,
    /// Unknown.
    Gray,
}

/// Release status rendered for a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseBadge {
    /// Status label.
    pub status_text: &'static str,
    /// Status emoji.
    pub emoji: &'static str,
    /// Color family for the status.
    pub color_hint: ColorHint,
    /// Release date, prefixed with `~` when it is an estimate.
    pub date_text: String,
    /// Emoji and label together.
    pub badge_text: String,
}

impl ReleaseBadge {
    /// Badge for `item`.
    pub fn for_item(item: &CatalogItem) -> Self {
        let status = item.release_status;
        let (emoji, color_hint) = match status {
            ReleaseStatus::Released => ("✅", ColorHint::Green),
            ReleaseStatus::ComingSoon => ("🔜", ColorHint::Orange),
            ReleaseStatus::DistantFuture => ("🔮", ColorHint::Blue),
            ReleaseStatus::Unknown => ("❓", ColorHint::Gray),
        };
        let date = item
            .release_date
            .as_deref()
            .map(str::trim)
            .filter(|date| !date.is_empty())
            .unwrap_or(UNKNOWN);
        let estimated = item.is_placeholder_date
            && matches!(status, ReleaseStatus::ComingSoon | ReleaseStatus::DistantFuture);
        let date_text = if estimated {
            format!("~{date}")
        } else {
            date.to_string()
        };

        Self {
            status_text: status.label(),
            emoji,
            color_hint,
            date_text,
            badge_text: format!("{emoji} {}", status.label()),
        }
    }
}

/// One tag chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChip {
    /// Tag text.
    pub name: String,
    /// Among the most-voted tags.
    pub popular: bool,
}

/// Leading tags of an item with a count of the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    /// Shown tags in column order.
    pub chips: Vec<TagChip>,
    /// Tags not shown.
    pub remaining: usize,
}

impl TagSummary {
    /// Summary for `item`, or `None` without tags.
    pub fn for_item(item: &CatalogItem) -> Option<Self> {
        let tags = item.tags();
        if tags.is_empty() {
            return None;
        }
        let chips = tags
            .iter()
            .take(TAG_DISPLAY_LIMIT)
            .enumerate()
            .map(|(index, name)| TagChip {
                name: (*name).to_string(),
                popular: index < POPULAR_TAG_COUNT,
            })
            .collect::<Vec<_>>();
        Some(Self {
            remaining: tags.len() - chips.len(),
            chips,
        })
    }
}

impl fmt::Display for TagSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .chips
            .iter()
            .map(|chip| chip.name.as_str())
            .collect::<Vec<_>>()
            .join(" • ");
        f.write_str(&joined)?;
        if self.remaining > 0 {
            write!(f, " (+{} more)", self.remaining)?;
        }
        Ok(())
    }
}

/// Trailer entry from the movies column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Movie {
    /// Trailer title.
    pub name: Option<String>,
    /// Preview image.
    pub thumbnail: Option<String>,
    /// Playable video.
    pub video_url: Option<String>,
    /// Featured trailer.
    pub highlight: bool,
}

impl Movie {
    /// Best URL to open: the video, else its thumbnail.
    pub fn url(&self) -> Option<&str> {
        self.video_url.as_deref().or(self.thumbnail.as_deref())
    }
}

/// Screenshot entry from the screenshots column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Screenshot {
    /// Small image.
    pub thumbnail: Option<String>,
    /// Full-size image.
    pub full: Option<String>,
}

impl Screenshot {
    /// Full-size image, else the thumbnail.
    pub fn url(&self) -> Option<&str> {
        self.full.as_deref().or(self.thumbnail.as_deref())
    }
}

/// Parsed media columns. Malformed JSON yields an empty section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaGallery {
    /// Highlights first, then by name.
    pub movies: Vec<Movie>,
    /// Screenshots in column order.
    pub screenshots: Vec<Screenshot>,
}

impl MediaGallery {
    /// Gallery for `item`.
    pub fn for_item(item: &CatalogItem) -> Self {
        let mut movies: Vec<Movie> = parse_media(item.movies.as_deref(), "movies");
        movies.sort_by_key(|movie| (Reverse(movie.highlight), movie.name.clone().unwrap_or_default()));
        Self {
            movies,
            screenshots: parse_media(item.screenshots.as_deref(), "screenshots"),
        }
    }

    /// Neither trailers nor screenshots.
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.screenshots.is_empty()
    }
}

fn parse_media<T: for<'de> Deserialize<'de>>(raw: Option<&str>, column: &str) -> Vec<T> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|err| {
        debug!(column, "ignoring malformed media column: {err}");
        Vec::new()
    })
}

/// Aggregate counts for the summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Catalog size before filtering.
    pub total: usize,
    /// Results after filtering.
    pub filtered: usize,
    /// Filtered results that offer a demo.
    pub with_demo: usize,
    /// Filtered results per release status.
    pub by_status: BTreeMap<ReleaseStatus, usize>,
    /// Items removed only for being adult content.
    pub hidden_adult: usize,
}

impl CatalogStats {
    /// Stats for `filtered` results drawn from a catalog of `total` items.
    pub fn collect(total: usize, filtered: &[CatalogItem], hidden_adult: usize) -> Self {
        let mut by_status = BTreeMap::new();
        for item in filtered {
            *by_status.entry(item.release_status).or_insert(0) += 1;
        }
        Self {
            total,
            filtered: filtered.len(),
            with_demo: filtered.iter().filter(|item| item.has_demo()).count(),
            by_status,
            hidden_adult,
        }
    }

    /// Count for one status.
    pub fn status_count(&self, status: ReleaseStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or_default()
    }
}
