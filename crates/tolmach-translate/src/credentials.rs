//! Backend credentials: token sources and an expiry-aware cache.
//!
//! A [`TokenSource`] mints credentials; [`TokenCache`] hands out the current
//! one and re-mints only when it is missing or about to expire.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tolmach_core::{
    config::{CredentialSource, CredentialsConfig},
    error::TolmachError,
    shellexpand,
};
use tracing::{debug, info};

/// Upper bound on how long a token command may run.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Audience claim of the JWT exchanged for an IAM token.
const IAM_AUDIENCE: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

/// Lifetime of a signed exchange JWT.
const JWT_LIFETIME_SECS: i64 = 3600;

/// How a credential is presented in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Bearer <iam-token>`.
    Bearer,
    /// `Api-Key <service-account-key>`.
    ApiKey,
}

/// An opaque credential for the translation backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    scheme: AuthScheme,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            value: token.into(),
            scheme: AuthScheme::Bearer,
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            value: key.into(),
            scheme: AuthScheme::ApiKey,
        }
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        match self.scheme {
            AuthScheme::Bearer => format!("Bearer {}", self.value),
            AuthScheme::ApiKey => format!("Api-Key {}", self.value),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// A freshly minted credential and when it stops being valid.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub credential: Credential,
    /// `None` = does not expire (or expiry unknown).
    pub expires_at: Option<DateTime<Utc>>,
}

/// Something that can mint backend credentials.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Obtain a new credential. May perform network or process I/O.
    async fn mint(&self) -> Result<MintedToken, TolmachError>;
}

/// A pre-minted token or API key supplied by configuration.
pub struct StaticToken {
    credential: Credential,
}

impl StaticToken {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    fn name(&self) -> &str {
        match self.credential.scheme {
            AuthScheme::Bearer => "static",
            AuthScheme::ApiKey => "api_key",
        }
    }

    async fn mint(&self) -> Result<MintedToken, TolmachError> {
        Ok(MintedToken {
            credential: self.credential.clone(),
            expires_at: None,
        })
    }
}

#[derive(Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token from the compute instance metadata service
/// (the service account attached to the VM).
pub struct MetadataToken {
    client: reqwest::Client,
    url: String,
}

impl MetadataToken {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl TokenSource for MetadataToken {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn mint(&self) -> Result<MintedToken, TolmachError> {
        let resp = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .timeout(COMMAND_TIMEOUT)
            .send()
            .await
            .map_err(|e| TolmachError::Credentials(format!("metadata request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TolmachError::Credentials(format!(
                "metadata returned {status}: {body}"
            )));
        }

        let parsed: MetadataTokenResponse = resp.json().await.map_err(|e| {
            TolmachError::Credentials(format!("metadata: failed to parse response: {e}"))
        })?;
        if parsed.access_token.trim().is_empty() {
            return Err(TolmachError::Credentials(
                "metadata returned an empty token".into(),
            ));
        }

        Ok(MintedToken {
            credential: Credential::bearer(parsed.access_token.trim()),
            expires_at: parsed
                .expires_in
                .filter(|&secs| secs > 0)
                .and_then(chrono::Duration::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
        })
    }
}

/// Token printed on stdout by an external command (e.g. `yc iam create-token`).
pub struct CommandToken {
    program: String,
    args: Vec<String>,
    ttl: Duration,
}

impl CommandToken {
    /// Parse a whitespace-separated command line.
    pub fn new(command_line: &str, ttl: Duration) -> Result<Self, TolmachError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TolmachError::Config("credentials.command is empty".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            ttl,
        })
    }
}

#[async_trait]
impl TokenSource for CommandToken {
    fn name(&self) -> &str {
        "command"
    }

    async fn mint(&self) -> Result<MintedToken, TolmachError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);

        debug!("minting token via {}", self.program);
        let output = tokio::time::timeout(COMMAND_TIMEOUT, cmd.output())
            .await
            .map_err(|_| {
                TolmachError::Credentials(format!(
                    "{} timed out after {}s",
                    self.program,
                    COMMAND_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| TolmachError::Credentials(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TolmachError::Credentials(format!(
                "{} exited with {}: {stderr}",
                self.program, output.status
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(TolmachError::Credentials(format!(
                "{} printed no token",
                self.program
            )));
        }

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(1));
        Ok(MintedToken {
            credential: Credential::bearer(token),
            expires_at: Some(Utc::now() + ttl),
        })
    }
}

/// A service-account authorized key, as downloaded from the cloud console.
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    pub id: String,
    pub service_account_id: String,
    pub private_key: String,
}

impl ServiceAccountKey {
    pub fn from_json(content: &str) -> Result<Self, TolmachError> {
        serde_json::from_str(content)
            .map_err(|e| TolmachError::Config(format!("invalid service account key: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, TolmachError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TolmachError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }
}

#[derive(Serialize, Deserialize)]
struct JwtClaims {
    aud: String,
    iss: String,
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
struct IamTokenRequest<'a> {
    jwt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IamTokenResponse {
    iam_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// IAM token minted from a service-account key: a PS256 JWT signed with the
/// key is exchanged at the IAM endpoint.
pub struct KeyFileToken {
    client: reqwest::Client,
    iam_url: String,
    key_id: String,
    service_account_id: String,
    signing_key: EncodingKey,
}

impl KeyFileToken {
    pub fn new(key: ServiceAccountKey, iam_url: &str) -> Result<Self, TolmachError> {
        // Console keys carry a comment line before the PEM block.
        let pem = key
            .private_key
            .find("-----BEGIN")
            .map_or(key.private_key.as_str(), |start| &key.private_key[start..]);
        let signing_key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            TolmachError::Config(format!("service account key {}: bad private key: {e}", key.id))
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            iam_url: iam_url.to_string(),
            key_id: key.id,
            service_account_id: key.service_account_id,
            signing_key,
        })
    }

    pub fn from_file(path: &Path, iam_url: &str) -> Result<Self, TolmachError> {
        Self::new(ServiceAccountKey::load(path)?, iam_url)
    }

    fn sign_jwt(&self, now: DateTime<Utc>) -> Result<String, TolmachError> {
        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(self.key_id.clone());
        let claims = JwtClaims {
            aud: IAM_AUDIENCE.to_string(),
            iss: self.service_account_id.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + JWT_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| TolmachError::Credentials(format!("failed to sign JWT: {e}")))
    }
}

#[async_trait]
impl TokenSource for KeyFileToken {
    fn name(&self) -> &str {
        "key_file"
    }

    async fn mint(&self) -> Result<MintedToken, TolmachError> {
        let jwt = self.sign_jwt(Utc::now())?;
        let resp = self
            .client
            .post(&self.iam_url)
            .json(&IamTokenRequest { jwt: &jwt })
            .timeout(COMMAND_TIMEOUT)
            .send()
            .await
            .map_err(|e| TolmachError::Credentials(format!("IAM token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TolmachError::Credentials(format!(
                "IAM token exchange returned {status}: {body}"
            )));
        }

        let parsed: IamTokenResponse = resp.json().await.map_err(|e| {
            TolmachError::Credentials(format!("IAM: failed to parse response: {e}"))
        })?;
        if parsed.iam_token.trim().is_empty() {
            return Err(TolmachError::Credentials("IAM returned an empty token".into()));
        }

        Ok(MintedToken {
            credential: Credential::bearer(parsed.iam_token.trim()),
            expires_at: parsed.expires_at,
        })
    }
}

/// Caches the current credential and re-mints it near expiry.
///
/// Minting happens under an async mutex, so concurrent callers that find the
/// token stale wait for a single mint instead of each starting their own.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    margin: chrono::Duration,
    current: Mutex<Option<MintedToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>, refresh_margin: Duration) -> Self {
        Self {
            source,
            margin: chrono::Duration::from_std(refresh_margin)
                .unwrap_or(chrono::Duration::zero()),
            current: Mutex::new(None),
        }
    }

    /// Build the configured token source behind a cache.
    pub fn from_config(config: &CredentialsConfig) -> Result<Self, TolmachError> {
        let token = config.token.trim();
        let source: Arc<dyn TokenSource> = match config.source {
            CredentialSource::Static | CredentialSource::ApiKey if token.is_empty() => {
                return Err(TolmachError::Config(
                    "credentials.token is empty. Set it in config.toml or via \
                     YC_IAM_TOKEN / YC_API_KEY."
                        .into(),
                ));
            }
            CredentialSource::Static => Arc::new(StaticToken::new(Credential::bearer(token))),
            CredentialSource::ApiKey => Arc::new(StaticToken::new(Credential::api_key(token))),
            CredentialSource::Metadata => Arc::new(MetadataToken::new(&config.metadata_url)),
            CredentialSource::Command => Arc::new(CommandToken::new(
                &config.command,
                Duration::from_secs(config.token_ttl_secs),
            )?),
            CredentialSource::KeyFile if config.key_file.trim().is_empty() => {
                return Err(TolmachError::Config(
                    "credentials.key_file is empty. Point it at a service account key.json."
                        .into(),
                ));
            }
            CredentialSource::KeyFile => Arc::new(KeyFileToken::from_file(
                Path::new(&shellexpand(config.key_file.trim())),
                &config.iam_url,
            )?),
        };
        Ok(Self::new(
            source,
            Duration::from_secs(config.refresh_margin_secs),
        ))
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Return a valid credential, minting a new one if needed.
    pub async fn credential(&self) -> Result<Credential, TolmachError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            if self.is_fresh(token) {
                return Ok(token.credential.clone());
            }
            debug!("{} token expired or near expiry, re-minting", self.source.name());
        }

        let minted = self.source.mint().await?;
        info!(
            "minted backend credential via {} (expires: {})",
            self.source.name(),
            minted
                .expires_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
        let credential = minted.credential.clone();
        *current = Some(minted);
        Ok(credential)
    }

    /// Drop the cached credential (e.g. after the backend rejected it).
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    fn is_fresh(&self, token: &MintedToken) -> bool {
        match token.expires_at {
            None => true,
            Some(expires_at) => Utc::now() + self.margin < expires_at,
        }
    }
}
