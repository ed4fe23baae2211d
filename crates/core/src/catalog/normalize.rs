//! Field coercion for raw sheet rows. Nothing here fails: values that do not
//! coerce become `None` or `false`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{CatalogItem, ItemKey, ReleaseStatus};

/// One sheet row keyed by column header.
pub type RawRow = Map<String, Value>;

const TRUTHY: [&str; 3] = ["true", "1", "yes"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const RELEASE_DATE_FORMATS: [&str; 6] = [
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%Y-%m-%d",
    "%d %b %Y",
];

/// Spreadsheet serial numbers count days from this date.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

static QUARTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^q([1-4])\s+(\d{4})$").expect("invalid quarter regex"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").expect("invalid year regex"));
static TZ_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(utc|gmt|z)$").expect("invalid timezone suffix regex"));

/// Normalise one row. Returns `None` when the row has no usable name.
pub fn normalize_row(row: &RawRow) -> Option<CatalogItem> {
    let name = text(row, "Name")?;
    let app_id = row.get("AppID").and_then(coerce_app_id);
    let key = ItemKey::derive(app_id, &name);
    if !key.is_stable() {
        debug!(name = %name, key = %key, "row has no numeric AppID; using name-derived key");
    }

    let (release_date, release_on) = match row.get("ReleaseDate") {
        Some(Value::Number(n)) if !is_year(n) => {
            let date = n.as_f64().and_then(serial_to_datetime).map(|at| at.date_naive());
            let label = date
                .map(|d| d.format("%b %-d, %Y").to_string())
                .or_else(|| Some(n.to_string()));
            (label, date)
        }
        _ => {
            let raw = text(row, "ReleaseDate");
            let parsed = raw.as_deref().and_then(parse_release_date);
            (raw, parsed)
        }
    };

    Some(CatalogItem {
        key,
        app_id,
        short_description: text(row, "ShortDescription"),
        detailed_description: text(row, "DetailedDescription"),
        about_the_game: text(row, "AboutTheGame"),
        genres: text(row, "Genres"),
        categories: text(row, "Categories"),
        developers: text(row, "Developers"),
        publishers: text(row, "Publishers"),
        community_tags: text(row, "CommunityTags"),
        url: text(row, "URL"),
        support_email: text(row, "SupportEmail"),
        support_url: text(row, "SupportURL"),
        header_image: text(row, "HeaderImage"),
        screenshots: text(row, "Screenshots"),
        movies: text(row, "Movies"),
        first_trailer_url: text(row, "FirstTrailerURL"),
        first_screenshot_url: text(row, "FirstScreenshotURL"),
        demo: flag(row, "Demo"),
        is_demo: flag(row, "IsDemo"),
        is_coming_soon: flag(row, "IsComingSoon"),
        is_placeholder_date: flag(row, "IsPlaceholderDate"),
        release_status: text(row, "ReleaseStatus")
            .map(|raw| ReleaseStatus::parse(&raw))
            .unwrap_or_default(),
        release_date,
        release_on,
        date_added: row.get("DateAdded").and_then(parse_timestamp_cell),
        name,
    })
}

/// Stringify a cell; blank cells are `None`.
pub fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Case-insensitive membership in {"true", "1", "yes"}.
pub fn coerce_bool(value: &Value) -> bool {
    cell_text(value)
        .map(|text| TRUTHY.contains(&text.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Integral, non-negative values only. `"570"`, `570`, `570.0` and `"570.0"` all yield 570.
pub fn coerce_app_id(value: &Value) -> Option<u64> {
    let number = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_id))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_id))?
        }
        _ => return None,
    };
    Some(number)
}

fn float_to_id(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then_some(value as u64)
}

/// `DateAdded` from either a text cell or a spreadsheet serial number.
pub fn parse_timestamp_cell(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(serial_to_datetime),
        other => cell_text(other).and_then(|raw| parse_timestamp(&raw)),
    }
}

/// Convert a spreadsheet serial day number (fraction = time of day) to UTC.
pub fn serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    Some((epoch + Duration::seconds(seconds)).and_utc())
}

// Bare four-digit integers in the release column are years, not serials.
fn is_year(n: &serde_json::Number) -> bool {
    n.as_u64().is_some_and(|v| (1000..=9999).contains(&v))
}

/// Parse a `DateAdded` cell. Naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let stripped = TZ_SUFFIX_RE.replace(raw, "");
    let stripped = stripped.trim();
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(stripped, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a store-formatted release date. Month, quarter and year-only values
/// resolve to the first day of the period.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in RELEASE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    for format in ["%d %b %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {raw}"), format) {
            return Some(date);
        }
    }
    if let Some(caps) = QUARTER_RE.captures(raw) {
        let quarter: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1);
    }
    if let Some(caps) = YEAR_RE.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}

fn text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).and_then(cell_text)
}

fn flag(row: &RawRow, column: &str) -> bool {
    row.get(column).map(coerce_bool).unwrap_or(false)
}
