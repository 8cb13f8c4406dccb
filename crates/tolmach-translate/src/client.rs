//! Shared HTTP plumbing for the Yandex Cloud Translate v2 REST API.

use crate::credentials::Credential;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tolmach_core::{config::TranslateConfig, error::TolmachError};
use tracing::debug;

/// HTTP client bound to one backend base URL and folder.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    folder_id: Option<String>,
    timeout: Duration,
}

impl BackendClient {
    /// Create a client from config values.
    pub fn from_config(config: &TranslateConfig) -> Self {
        let folder_id = Some(config.folder_id.trim().to_string()).filter(|f| !f.is_empty());
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            folder_id,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Create a client against an explicit base URL (used by tests).
    pub fn new(base_url: &str, folder_id: Option<&str>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            folder_id: folder_id.map(str::to_string),
            timeout,
        }
    }

    /// Folder to bill requests to, if configured.
    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to `{base_url}/{path}` and decode the JSON response.
    ///
    /// Transport failures, timeouts, non-2xx statuses, and undecodable
    /// bodies all come back as [`TolmachError::Backend`].
    pub async fn post<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        credential: &Credential,
    ) -> Result<Resp, TolmachError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("translate backend: POST {url}");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", credential.authorization())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| TolmachError::Backend(format!("{path} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TolmachError::Backend(format!(
                "{path} returned {status}: {text}"
            )));
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| TolmachError::Backend(format!("{path}: failed to parse response: {e}")))
    }
}
