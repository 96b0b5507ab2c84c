//! OAuth2 access tokens for the database REST API, minted from a Google
//! service-account key.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

const SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion.
const ASSERTION_TTL_SEC: i64 = 3600;
/// Tokens are replaced this long before they actually expire.
const REFRESH_MARGIN_SEC: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

// ---------------------------------------------------------------------------
// Token source seam
// ---------------------------------------------------------------------------

/// Anything that can hand out a bearer token for the next request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Service account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccount {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read service account {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse service account {}", path.display()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Whether a cached token must be replaced at `now_ts`.
fn needs_refresh(cached: Option<&CachedToken>, now_ts: i64) -> bool {
    match cached {
        None => true,
        Some(c) => now_ts + REFRESH_MARGIN_SEC >= c.expires_at,
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct TokenProvider {
    account: ServiceAccount,
    key: EncodingKey,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(account: ServiceAccount, timeout: Duration) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("service account private_key is not a valid RSA PEM key")?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            account,
            key,
            http,
            cache: Mutex::new(None),
        })
    }

    fn assertion(&self, now_ts: i64) -> Result<String> {
        let claims = Claims {
            iss: self.account.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: self.account.token_uri.clone(),
            iat: now_ts,
            exp: now_ts + ASSERTION_TTL_SEC,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .context("failed to sign token assertion")
    }

    async fn exchange(&self, now_ts: i64) -> Result<CachedToken> {
        let assertion = self.assertion(now_ts)?;
        let resp = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .with_context(|| format!("token request to {} failed", self.account.token_uri))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("token endpoint returned {status}: {body}");
        }

        let token: TokenResponse = resp.json().await.context("invalid token response")?;
        debug!(expires_in = token.expires_in, "access token refreshed");
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now_ts + token.expires_in,
        })
    }
}

#[async_trait]
impl TokenSource for TokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        let now_ts = OffsetDateTime::now_utc().unix_timestamp();
        if needs_refresh(cache.as_ref(), now_ts) {
            *cache = Some(self.exchange(now_ts).await?);
        }
        match cache.as_ref() {
            Some(c) => Ok(c.token.clone()),
            None => bail!("no access token available"),
        }
    }
}

/// A fixed token, for tests and emulators.
#[cfg(test)]
pub(crate) struct StaticToken(pub &'static str);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, State};
    use axum::routing::post;
    use axum::{Json, Router};
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TEST_KEY: &str = include_str!("testdata/service_key.pem");
    const TEST_PUB: &str = include_str!("testdata/service_key.pub.pem");

    fn account(token_uri: String) -> ServiceAccount {
        ServiceAccount {
            client_email: "worker@smart-iris.iam.gserviceaccount.com".into(),
            private_key: TEST_KEY.into(),
            token_uri,
        }
    }

    #[derive(Clone, Default)]
    struct Endpoint {
        calls: Arc<AtomicUsize>,
        last_assertion: Arc<std::sync::Mutex<Option<String>>>,
    }

    async fn token_handler(
        State(ep): State<Endpoint>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<Value> {
        let n = ep.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(form.get("grant_type").map(String::as_str), Some(JWT_BEARER_GRANT));
        *ep.last_assertion.lock().unwrap() = form.get("assertion").cloned();
        Json(json!({
            "access_token": format!("tok-{n}"),
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
    }

    async fn spawn_token_server(ep: Endpoint) -> String {
        let app = Router::new()
            .route("/token", post(token_handler))
            .with_state(ep);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/token")
    }

    #[test]
    fn refresh_margin() {
        assert!(needs_refresh(None, 0));
        let c = CachedToken { token: "t".into(), expires_at: 1_000 };
        assert!(!needs_refresh(Some(&c), 939));
        assert!(needs_refresh(Some(&c), 940));
        assert!(needs_refresh(Some(&c), 2_000));
    }

    #[test]
    fn token_uri_defaults_to_google() {
        let sa: ServiceAccount = serde_json::from_value(json!({
            "client_email": "a@b", "private_key": "k"
        }))
        .unwrap();
        assert_eq!(sa.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ServiceAccount::load(Path::new("/nonexistent/sa.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sa.json"));
    }

    #[test]
    fn bad_private_key_rejected() {
        let mut sa = account("http://localhost/token".into());
        sa.private_key = "not a key".into();
        assert!(TokenProvider::new(sa, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn assertion_carries_scopes_and_audience() {
        let uri = "https://oauth2.googleapis.com/token".to_string();
        let provider = TokenProvider::new(account(uri.clone()), Duration::from_secs(5)).unwrap();
        let jwt = provider.assertion(1_700_000_000).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[uri.as_str()]);
        validation.validate_exp = false;
        let data = decode::<Claims>(
            &jwt,
            &DecodingKey::from_rsa_pem(TEST_PUB.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.iss, "worker@smart-iris.iam.gserviceaccount.com");
        assert!(data.claims.scope.contains("firebase.database"));
        assert!(data.claims.scope.contains("userinfo.email"));
        assert_eq!(data.claims.exp - data.claims.iat, ASSERTION_TTL_SEC);
    }

    #[tokio::test]
    async fn token_fetched_once_then_cached() {
        let ep = Endpoint::default();
        let uri = spawn_token_server(ep.clone()).await;
        let provider = TokenProvider::new(account(uri), Duration::from_secs(5)).unwrap();

        assert_eq!(provider.access_token().await.unwrap(), "tok-0");
        assert_eq!(provider.access_token().await.unwrap(), "tok-0");
        assert_eq!(ep.calls.load(Ordering::SeqCst), 1);
        assert!(ep.last_assertion.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn expiring_token_replaced() {
        let ep = Endpoint::default();
        let uri = spawn_token_server(ep.clone()).await;
        let provider = TokenProvider::new(account(uri), Duration::from_secs(5)).unwrap();

        *provider.cache.lock().await = Some(CachedToken {
            token: "stale".into(),
            expires_at: OffsetDateTime::now_utc().unix_timestamp() + 30,
        });
        assert_eq!(provider.access_token().await.unwrap(), "tok-0");
    }

    #[tokio::test]
    async fn endpoint_error_surfaces_status() {
        let app = Router::new().route(
            "/token",
            post(|| async { (axum::http::StatusCode::BAD_REQUEST, "invalid_grant") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider =
            TokenProvider::new(account(format!("http://{addr}/token")), Duration::from_secs(5))
                .unwrap();
        let err = provider.access_token().await.unwrap_err().to_string();
        assert!(err.contains("400"), "{err}");
        assert!(err.contains("invalid_grant"), "{err}");
    }
}
