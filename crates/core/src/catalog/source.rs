use std::{fs, path::PathBuf, time::Duration};

use reqwest::{blocking::Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::normalize::RawRow;
use crate::{config::SourceConfig, error::FetchError};

/// Google Sheets REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can hand back the raw catalog rows.
///
/// Implementations must be read-only against the backing store.
pub trait CatalogSource: Send + Sync {
    /// Return every row, headers already applied.
    fn fetch_rows(&self) -> Result<Vec<RawRow>, FetchError>;
}

/// Opaque credentials for the Sheets API.
#[derive(Clone)]
pub enum SheetCredentials {
    /// API key sent as the `key` query parameter.
    ApiKey(String),
    /// OAuth access token sent as a bearer header.
    AccessToken(String),
}

impl std::fmt::Debug for SheetCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(..)"),
            Self::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

impl SheetCredentials {
    /// Pick the configured credential, preferring the access token.
    pub fn new(api_key: Option<&str>, access_token: Option<&str>) -> Result<Self, FetchError> {
        if let Some(token) = access_token {
            return validate("access_token", token).map(Self::AccessToken);
        }
        if let Some(key) = api_key {
            return validate("api_key", key).map(Self::ApiKey);
        }
        Err(FetchError::Credential(
            "neither api_key nor access_token is configured".to_string(),
        ))
    }
}

fn validate(field: &str, value: &str) -> Result<String, FetchError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FetchError::Credential(format!("{field} is empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(FetchError::Credential(format!(
            "{field} contains whitespace"
        )));
    }
    Ok(value.to_string())
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads a worksheet through the Sheets values API.
pub struct SheetsSource {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    worksheet: String,
    credentials: SheetCredentials,
}

impl SheetsSource {
    /// Build a source for one worksheet of a spreadsheet.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
        credentials: SheetCredentials,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| FetchError::Transient(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            credentials,
        })
    }

    /// Point the source at a different API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from configuration, validating credentials first.
    pub fn from_config(config: &SourceConfig) -> Result<Self, FetchError> {
        let spreadsheet_id = config
            .spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FetchError::Credential("spreadsheet_id is not configured".into()))?;
        let credentials =
            SheetCredentials::new(config.api_key.as_deref(), config.access_token.as_deref())?;
        let mut source = Self::new(spreadsheet_id, config.worksheet.clone(), credentials)?;
        if let Some(base) = config.api_base.as_deref() {
            source = source.with_api_base(base);
        }
        Ok(source)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.api_base, self.spreadsheet_id, self.worksheet
        )
    }
}

impl CatalogSource for SheetsSource {
    fn fetch_rows(&self) -> Result<Vec<RawRow>, FetchError> {
        let mut request = self
            .client
            .get(self.endpoint())
            .query(&RENDER_OPTIONS);
        request = match &self.credentials {
            SheetCredentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            SheetCredentials::AccessToken(token) => request.bearer_auth(token),
        };

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body, &self.worksheet));
        }

        let range: ValueRange = response.json()?;
        let rows = rows_from_values(range.values);
        info!(worksheet = %self.worksheet, rows = rows.len(), "fetched worksheet");
        Ok(rows)
    }
}

/// Numbers stay raw; date-typed cells come back as their displayed text.
const RENDER_OPTIONS: [(&str, &str); 2] = [
    ("valueRenderOption", "UNFORMATTED_VALUE"),
    ("dateTimeRenderOption", "FORMATTED_STRING"),
];

fn classify_status(status: StatusCode, body: &str, worksheet: &str) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound(format!("spreadsheet or worksheet '{worksheet}'")),
        StatusCode::BAD_REQUEST if body.contains("Unable to parse range") => {
            FetchError::NotFound(format!("worksheet '{worksheet}'"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::Transient(format!("authorization rejected ({status})"))
        }
        _ => FetchError::Transient(format!("unexpected response {status}")),
    }
}

/// Zip a header row with the data rows. Short rows are padded with empty strings.
pub(crate) fn rows_from_values(values: Vec<Vec<Value>>) -> Vec<RawRow> {
    let mut iter = values.into_iter();
    let Some(header) = iter.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
        .collect();

    iter.filter(|row| !row.is_empty())
        .map(|row| {
            let mut cells = row.into_iter();
            headers
                .iter()
                .filter_map(|name| {
                    let cell = cells.next().unwrap_or_else(|| Value::String(String::new()));
                    (!name.is_empty()).then(|| (name.clone(), cell))
                })
                .collect()
        })
        .collect()
}

/// Reads rows from a local JSON export (an array of objects).
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    /// Source backed by the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for SnapshotSource {
    fn fetch_rows(&self) -> Result<Vec<RawRow>, FetchError> {
        if !self.path.is_file() {
            return Err(FetchError::NotFound(self.path.display().to_string()));
        }
        let content = fs::read_to_string(&self.path).map_err(|err| {
            FetchError::Transient(format!("failed to read {}: {err}", self.path.display()))
        })?;
        let rows: Vec<RawRow> = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded catalog snapshot");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn credentials_are_validated() {
        assert!(matches!(
            SheetCredentials::new(None, None),
            Err(FetchError::Credential(_))
        ));
        assert!(matches!(
            SheetCredentials::new(Some("   "), None),
            Err(FetchError::Credential(_))
        ));
        assert!(matches!(
            SheetCredentials::new(Some("abc def"), None),
            Err(FetchError::Credential(_))
        ));
        assert!(matches!(
            SheetCredentials::new(Some("key"), Some("token")),
            Ok(SheetCredentials::AccessToken(token)) if token == "token"
        ));
        assert!(matches!(
            SheetCredentials::new(Some(" key "), None),
            Ok(SheetCredentials::ApiKey(key)) if key == "key"
        ));
    }

    #[test]
    fn missing_spreadsheet_id_is_a_credential_error() {
        let config = SourceConfig {
            api_key: Some("key".into()),
            ..SourceConfig::default()
        };
        assert!(matches!(
            SheetsSource::from_config(&config),
            Err(FetchError::Credential(_))
        ));
    }

    #[test]
    fn zips_headers_with_rows() {
        let rows = rows_from_values(vec![
            vec![json!("AppID"), json!("Name"), json!("Demo")],
            vec![json!(570), json!("Dota 2")],
            vec![],
            vec![json!("n/a"), json!("Mystery"), json!("TRUE")],
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["AppID"], json!(570));
        assert_eq!(rows[0]["Demo"], json!(""));
        assert_eq!(rows[1]["Demo"], json!("TRUE"));
        assert!(rows_from_values(Vec::new()).is_empty());
    }

    #[test]
    fn dates_are_requested_as_formatted_text() {
        assert!(RENDER_OPTIONS.contains(&("dateTimeRenderOption", "FORMATTED_STRING")));
        assert!(RENDER_OPTIONS.contains(&("valueRenderOption", "UNFORMATTED_VALUE")));
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "", "Steam_Master"),
            FetchError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(
                StatusCode::BAD_REQUEST,
                "Unable to parse range: Steam_Master",
                "Steam_Master"
            ),
            FetchError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "", "Steam_Master"),
            FetchError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "", "Steam_Master"),
            FetchError::Transient(_)
        ));
    }

    #[test]
    fn snapshot_source_reads_rows() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("catalog.json");
        fs::write(&path, r#"[{"AppID": 570, "Name": "Dota 2"}]"#)?;

        let rows = SnapshotSource::new(&path).fetch_rows()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Name"], json!("Dota 2"));

        let missing = SnapshotSource::new(dir.path().join("absent.json")).fetch_rows();
        assert!(matches!(missing, Err(FetchError::NotFound(_))));

        fs::write(&path, "not json")?;
        assert!(matches!(
            SnapshotSource::new(&path).fetch_rows(),
            Err(FetchError::Decode(_))
        ));
        Ok(())
    }
}
