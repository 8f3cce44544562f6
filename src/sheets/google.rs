use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::models::SpreadsheetRef;
use crate::sheets::auth::TokenSource;
use crate::sheets::SheetsApi;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Characters escaped inside one URL path segment (ids and A1 ranges).
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\'')
    .add(b'!');

/// Sheets v4 REST client.
pub struct GoogleSheets<T> {
    client: Client,
    tokens: T,
    sheets_api: String,
    drive_api: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

/// A1 range covering a whole tab, e.g. `'My Tab'`.
fn tab_range(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

impl<T: TokenSource> GoogleSheets<T> {
    pub fn new(client: Client, tokens: T) -> Self {
        Self::with_endpoints(client, tokens, SHEETS_API, DRIVE_FILES_API)
    }

    pub fn with_endpoints(
        client: Client,
        tokens: T,
        sheets_api: impl Into<String>,
        drive_api: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            sheets_api: sheets_api.into(),
            drive_api: drive_api.into(),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SinkError> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.sheets_api,
            encode_segment(spreadsheet_id),
            encode_segment(range)
        )
    }
}

async fn check(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(SinkError::Auth(format!("{}: {}", status, body)))
        }
        _ => Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        }),
    }
}

#[async_trait]
impl<T: TokenSource> SheetsApi for GoogleSheets<T> {
    async fn resolve_spreadsheet(&self, spreadsheet: &SpreadsheetRef) -> Result<String, SinkError> {
        let name = match spreadsheet {
            SpreadsheetRef::Id(id) => return Ok(id.clone()),
            SpreadsheetRef::Name(name) => name,
        };

        warn!(name = %name, "Looking up spreadsheet by display name; prefer a spreadsheet id");
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let request = self
            .client
            .get(&self.drive_api)
            .query(&[("q", query.as_str()), ("fields", "files(id)")]);

        let files: FileList = check(self.send(request).await?).await?.json().await?;
        files
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SinkError::SpreadsheetNotFound(spreadsheet.to_string()))
    }

    async fn tab_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SinkError> {
        let url = format!("{}/{}", self.sheets_api, encode_segment(spreadsheet_id));
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SinkError::SpreadsheetNotFound(spreadsheet_id.to_string()));
        }

        let meta: SpreadsheetMeta = check(response).await?.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn clear_tab(&self, spreadsheet_id: &str, tab: &str) -> Result<(), SinkError> {
        let url = format!("{}:clear", self.values_url(spreadsheet_id, &tab_range(tab)));
        let request = self.client.post(url).json(&json!({}));

        check(self.send(request).await?).await?;
        debug!(tab, "Cleared tab");
        Ok(())
    }

    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        values: &[Vec<String>],
    ) -> Result<(), SinkError> {
        let range = format!("{}!A1", tab_range(tab));
        let request = self
            .client
            .put(self.values_url(spreadsheet_id, &range))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": values,
            }));

        check(self.send(request).await?).await?;
        debug!(tab, rows = values.len(), "Updated tab");
        Ok(())
    }
}
