//! Google Sheets v4 REST backend
//!
//! Each instance is one authorization context. Tokens come from a Google
//! service-account key (OAuth2 JWT-bearer grant, RS256) and are cached until
//! shortly before they expire. Ranges without a sheet name address the first
//! visible worksheet.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::record::HEADER;
use super::{SheetBackend, SheetContext, SheetError};
use crate::core::config;
use crate::core::error::AppResult;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Fields of a service-account JSON key that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Reads a key file downloaded from the Google Cloud console.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let text = fs_err::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    TOKEN_LIFETIME_SECS
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SheetsMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
}

/// Where access tokens come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    ServiceAccount(ServiceAccountKey),
    /// A pre-issued access token, used as-is
    Static(String),
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

/// One Google Sheets authorization context.
#[derive(Debug)]
pub struct GoogleSheetsBackend {
    client: Client,
    base_url: String,
    source: TokenSource,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsBackend {
    pub fn new(source: TokenSource) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("walletlist/0.4")
            .timeout(config::sheets::timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config::sheets::API_BASE_URL.to_string(),
            source,
            token: Mutex::new(None),
        })
    }

    /// Loads a service-account key file and builds a context from it.
    pub fn from_key_file(path: impl AsRef<Path>) -> AppResult<Self> {
        Self::new(TokenSource::ServiceAccount(ServiceAccountKey::from_file(path)?))
    }

    /// Points the client at another API root (a local mock in tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn access_token(&self) -> Result<String, SheetError> {
        let key = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount(key) => key,
        };

        let now = chrono::Utc::now().timestamp();
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - config::sheets::TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let claims = Claims {
            iss: &key.client_email,
            scope: config::sheets::SCOPES,
            aud: &key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetError::Auth(format!("invalid private key: {}", e)))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| SheetError::Auth(format!("failed to sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }
        let token: TokenResponse = response.json().await?;
        log::info!("Obtained spreadsheet access token for {}", key.client_email);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    fn spreadsheet_url(&self, sheet_id: &str) -> String {
        format!("{}/spreadsheets/{}", self.base_url, sheet_id)
    }

    fn values_url(&self, sheet_id: &str, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(sheet_id), range)
    }

    async fn get_values(&self, sheet_id: &str, range: &str, major_dimension: &str) -> Result<ValueRange, SheetError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.values_url(sheet_id, range))
            .bearer_auth(token)
            .query(&[("majorDimension", major_dimension)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn put_values(&self, sheet_id: &str, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .put(self.values_url(sheet_id, range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn first_sheet_id(&self, sheet_id: &str) -> Result<i64, SheetError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.spreadsheet_url(sheet_id))
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.sheetId")])
            .send()
            .await?;
        let metadata: SheetsMetadata = check(response).await?.json().await?;
        metadata
            .sheets
            .first()
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| SheetError::Other("spreadsheet has no worksheets".to_string()))
    }
}

/// Turns a non-success response into `SheetError::Api`.
async fn check(response: Response) -> Result<Response, SheetError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetError::Api {
        status: status.as_u16(),
        body,
    })
}

/// A1 column letters for a 1-based column index.
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[async_trait]
impl SheetBackend for GoogleSheetsBackend {
    async fn open(&self, sheet_id: &str) -> Result<(), SheetError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.spreadsheet_url(sheet_id))
            .bearer_auth(token)
            .query(&[("fields", "spreadsheetId")])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn column_values(&self, sheet_id: &str, column: usize) -> Result<Vec<String>, SheetError> {
        let letter = column_letter(column);
        let range = format!("{}:{}", letter, letter);
        let values = self.get_values(sheet_id, &range, "COLUMNS").await?;
        Ok(values.values.into_iter().next().unwrap_or_default())
    }

    async fn all_values(&self, sheet_id: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let values = self.get_values(sheet_id, "A:Z", "ROWS").await?.values;
        // The API drops trailing empty cells; pad so columns line up.
        let width = values.iter().map(Vec::len).max().unwrap_or(0).max(HEADER.len());
        Ok(values
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect())
    }

    async fn append_row(&self, sheet_id: &str, row: &[String]) -> Result<(), SheetError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.values_url(sheet_id, "A1:append"))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn insert_row(&self, sheet_id: &str, index: usize, row: &[String]) -> Result<(), SheetError> {
        let grid_id = self.first_sheet_id(sheet_id).await?;
        let token = self.access_token().await?;
        let start = index.saturating_sub(1);
        let response = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url(sheet_id)))
            .bearer_auth(token)
            .json(&json!({
                "requests": [{
                    "insertDimension": {
                        "range": {
                            "sheetId": grid_id,
                            "dimension": "ROWS",
                            "startIndex": start,
                            "endIndex": start + 1
                        },
                        "inheritFromBefore": false
                    }
                }]
            }))
            .send()
            .await?;
        check(response).await?;

        let range = format!("A{}", start + 1);
        self.put_values(sheet_id, &range, vec![row.to_vec()]).await
    }

    async fn update_cell(&self, sheet_id: &str, row: usize, column: usize, value: &str) -> Result<(), SheetError> {
        let range = format!("{}{}", column_letter(column), row);
        self.put_values(sheet_id, &range, vec![vec![value.to_string()]]).await
    }
}

/// Builds the named contexts from key files, primary first.
///
/// A key that cannot be loaded is logged and left out, so the bot still runs
/// on whichever context is available.
pub fn build_contexts(primary: impl AsRef<Path>, secondary: impl AsRef<Path>) -> Vec<SheetContext> {
    let mut contexts = Vec::new();
    for (name, path) in [("primary", primary.as_ref()), ("secondary", secondary.as_ref())] {
        match GoogleSheetsBackend::from_key_file(path) {
            Ok(backend) => {
                log::info!("📄 Sheets context '{}' loaded from {}", name, path.display());
                contexts.push(SheetContext::new(name, Arc::new(backend) as Arc<dyn SheetBackend>));
            }
            Err(e) => log::warn!("Sheets context '{}' unavailable ({}): {}", name, path.display(), e),
        }
    }
    if contexts.is_empty() {
        log::error!("❌ No spreadsheet credentials could be loaded, spreadsheet links will fail");
    }
    contexts
}
