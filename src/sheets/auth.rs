use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::SinkError;
use crate::models::SpreadsheetRef;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a Google service-account JSON key that the token exchange
/// needs. Everything else in the blob is ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Drive access is only requested when the spreadsheet must be found by name.
pub fn scopes_for(spreadsheet: &SpreadsheetRef) -> Vec<String> {
    match spreadsheet {
        SpreadsheetRef::Id(_) => vec![SHEETS_SCOPE.to_string()],
        SpreadsheetRef::Name(_) => vec![SHEETS_SCOPE.to_string(), DRIVE_READONLY_SCOPE.to_string()],
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, SinkError>;
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a signed JWT assertion for an OAuth access token and caches it
/// until shortly before it expires.
pub struct ServiceAccountTokens {
    client: Client,
    key: ServiceAccountKey,
    scopes: Vec<String>,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(client: Client, key: ServiceAccountKey, scopes: Vec<String>) -> Self {
        Self {
            client,
            key,
            scopes,
            cache: Mutex::new(None),
        }
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, SinkError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| SinkError::Auth(format!("unusable private key: {}", e)))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| SinkError::Auth(format!("could not sign assertion: {}", e)))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, SinkError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS) < cached.expires_at {
                debug!("Using cached access token");
                return Ok(cached.token.clone());
            }
        }

        let assertion = self.assertion(Utc::now())?;
        info!(account = %self.key.client_email, "Requesting access token");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();
        *cache = Some(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });

        Ok(access_token)
    }
}

#[cfg(test)]
pub(crate) struct StaticToken(pub &'static str);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, SinkError> {
        Ok(self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn name_lookup_adds_drive_scope() {
        assert_eq!(scopes_for(&SpreadsheetRef::Id("x".into())), vec![SHEETS_SCOPE]);
        assert_eq!(
            scopes_for(&SpreadsheetRef::Name("x".into())),
            vec![SHEETS_SCOPE, DRIVE_READONLY_SCOPE]
        );
    }

    #[test]
    fn token_uri_defaults_when_absent() {
        let key: ServiceAccountKey =
            serde_json::from_str(r#"{"client_email":"a@b.c","private_key":"pk"}"#).unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[tokio::test]
    async fn bad_private_key_fails_before_token_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let key = ServiceAccountKey {
            client_email: "sync@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: format!("{}/token", server.uri()),
        };
        let tokens = ServiceAccountTokens::new(Client::new(), key, vec![SHEETS_SCOPE.to_string()]);

        let err = tokens.access_token().await.unwrap_err();
        assert!(matches!(err, SinkError::Auth(_)));
    }
}
