//! Supported-language catalog with a bounded-lifetime cache.

use crate::{client::BackendClient, credentials::Credential};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguagesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    languages: Vec<LanguageEntry>,
}

#[derive(Deserialize)]
struct LanguageEntry {
    #[serde(default)]
    code: Option<String>,
}

struct Snapshot {
    codes: BTreeSet<String>,
    fetched_at: Instant,
}

/// Caches the backend's supported language codes.
///
/// The cache is filled by the first successful fetch and refreshed once it is
/// older than `refresh`. Empty results are never cached. While nothing has
/// been fetched successfully, the configured fallback set is served.
pub struct LanguageCatalog {
    client: Arc<BackendClient>,
    refresh: Duration,
    fallback: BTreeSet<String>,
    snapshot: RwLock<Option<Snapshot>>,
    fetch_guard: Mutex<()>,
}

impl LanguageCatalog {
    pub fn new(client: Arc<BackendClient>, refresh: Duration, fallback: &[String]) -> Self {
        Self {
            client,
            refresh,
            fallback: fallback.iter().map(|c| c.trim().to_lowercase()).collect(),
            snapshot: RwLock::new(None),
            fetch_guard: Mutex::new(()),
        }
    }

    /// Fetch the supported codes from the backend, uncached.
    ///
    /// Any failure is logged and yields an empty set, which callers must read
    /// as "validation unavailable".
    pub async fn list_languages(&self, credential: &Credential) -> BTreeSet<String> {
        let body = LanguagesRequest {
            folder_id: self.client.folder_id(),
        };
        match self
            .client
            .post::<_, LanguagesResponse>("languages", &body, credential)
            .await
        {
            Ok(resp) => resp
                .languages
                .into_iter()
                .filter_map(|l| l.code)
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
            Err(e) => {
                error!("list languages failed: {e}");
                BTreeSet::new()
            }
        }
    }

    /// Supported codes: the cached set when fresh, otherwise a new fetch.
    ///
    /// Falls back to a stale cache, then to the fallback set, when the
    /// backend cannot be reached.
    pub async fn supported(&self, credential: &Credential) -> BTreeSet<String> {
        if let Some(codes) = self.fresh_codes() {
            return codes;
        }

        // One fetch at a time; late arrivals reuse the winner's result.
        let _guard = self.fetch_guard.lock().await;
        if let Some(codes) = self.fresh_codes() {
            return codes;
        }

        let fetched = self.list_languages(credential).await;
        if fetched.is_empty() {
            if let Some(stale) = self.cached_codes() {
                warn!("language catalog unavailable, serving stale cache");
                return stale;
            }
            warn!("language catalog unavailable, using fallback set");
            return self.fallback.clone();
        }

        info!("language catalog loaded: {} languages", fetched.len());
        if let Ok(mut snapshot) = self.snapshot.write() {
            *snapshot = Some(Snapshot {
                codes: fetched.clone(),
                fetched_at: Instant::now(),
            });
        }
        fetched
    }

    /// Whether `code` is a supported target language.
    pub async fn is_supported(&self, code: &str, credential: &Credential) -> bool {
        let code = code.trim().to_lowercase();
        !code.is_empty() && self.supported(credential).await.contains(&code)
    }

    /// Forget the cached set; the next lookup fetches again.
    pub fn invalidate(&self) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            *snapshot = None;
            debug!("language catalog invalidated");
        }
    }

    pub fn fallback(&self) -> &BTreeSet<String> {
        &self.fallback
    }

    fn fresh_codes(&self) -> Option<BTreeSet<String>> {
        let snapshot = self.snapshot.read().ok()?;
        snapshot
            .as_ref()
            .filter(|s| s.fetched_at.elapsed() < self.refresh)
            .map(|s| s.codes.clone())
    }

    fn cached_codes(&self) -> Option<BTreeSet<String>> {
        let snapshot = self.snapshot.read().ok()?;
        snapshot.as_ref().map(|s| s.codes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGUAGES_BODY: &str = r#"{"languages":[
        {"code":"en","name":"English"},
        {"code":"ru","name":"русский"},
        {"code":"de"},
        {"name":"nameless"}
    ]}"#;

    fn catalog(server: &mockito::Server, refresh: Duration) -> LanguageCatalog {
        let client = Arc::new(BackendClient::new(
            &server.url(),
            Some("b1g"),
            Duration::from_secs(5),
        ));
        LanguageCatalog::new(client, refresh, &["en".to_string(), "ru".to_string()])
    }

    #[tokio::test]
    async fn test_list_languages_parses_codes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/languages")
            .match_body(mockito::Matcher::Json(serde_json::json!({"folderId": "b1g"})))
            .with_status(200)
            .with_body(LANGUAGES_BODY)
            .create_async()
            .await;

        let codes = catalog(&server, Duration::from_secs(60))
            .list_languages(&Credential::bearer("t1"))
            .await;
        let expected: BTreeSet<String> = ["de", "en", "ru"].iter().map(|s| s.to_string()).collect();
        assert_eq!(codes, expected);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_supported_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/languages")
            .with_status(200)
            .with_body(LANGUAGES_BODY)
            .expect(1)
            .create_async()
            .await;

        let cat = catalog(&server, Duration::from_secs(3600));
        let cred = Credential::bearer("t1");
        assert!(cat.is_supported("de", &cred).await);
        assert!(cat.is_supported(" DE ", &cred).await);
        assert!(!cat.is_supported("xx", &cred).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_supported_refreshes_after_interval() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/languages")
            .with_status(200)
            .with_body(LANGUAGES_BODY)
            .expect(2)
            .create_async()
            .await;

        let cat = catalog(&server, Duration::ZERO);
        let cred = Credential::bearer("t1");
        cat.supported(&cred).await;
        cat.supported(&cred).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failure_uses_fallback_and_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/languages")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let cat = catalog(&server, Duration::from_secs(3600));
        let cred = Credential::bearer("t1");
        let first = cat.supported(&cred).await;
        assert_eq!(&first, cat.fallback());
        assert!(first.contains("en") && first.contains("ru"));
        // Not cached: a second lookup tries the backend again.
        cat.supported(&cred).await;
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_failure_after_success_serves_stale_cache() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("POST", "/languages")
            .with_status(200)
            .with_body(LANGUAGES_BODY)
            .expect(1)
            .create_async()
            .await;

        let cat = catalog(&server, Duration::ZERO);
        let cred = Credential::bearer("t1");
        assert!(cat.supported(&cred).await.contains("de"));
        ok.assert_async().await;
        ok.remove_async().await;

        let _fail = server
            .mock("POST", "/languages")
            .with_status(503)
            .create_async()
            .await;
        assert!(cat.supported(&cred).await.contains("de"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/languages")
            .with_status(200)
            .with_body(LANGUAGES_BODY)
            .expect(2)
            .create_async()
            .await;

        let cat = catalog(&server, Duration::from_secs(3600));
        let cred = Credential::bearer("t1");
        cat.supported(&cred).await;
        cat.invalidate();
        cat.supported(&cred).await;
        mock.assert_async().await;
    }
}
