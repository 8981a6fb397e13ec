//! Client for the spreadsheet-backed remote API.
//!
//! The backend comes in two URL shapes: an RPC-style "exec" endpoint that
//! takes a `mode` parameter, and an older endpoint that takes `sheet`. When
//! an origin is configured, the same-origin `/api/sheets` proxy is tried as
//! well. Candidates are tried one after another; each one gets its own
//! timeout and retry budget. Successful collection reads are cached per
//! base URL for a short TTL.

mod envelope;
mod transport;

#[cfg(test)]
pub(crate) use transport::fake;

pub use envelope::{Envelope, decode_items, parse_body};
pub use transport::{HttpResponse, ReqwestTransport, Transport};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::collection::Collection;
use crate::error::SheetError;
use crate::store::Record;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(300);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Plain-text bodies avoid a CORS preflight on the exec endpoint.
const POST_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

#[derive(Debug, Clone)]
pub struct SheetOptions {
    /// Per-attempt deadline.
    pub timeout: Duration,
    /// Extra attempts after the first for retryable failures.
    pub retries: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub backoff: Duration,
    pub cache_ttl: Duration,
}

impl Default for SheetOptions {
    fn default() -> Self {
        SheetOptions {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip the cache and go to the network.
    pub force_refresh: bool,
}

struct CacheEntry {
    items: Vec<Record>,
    expires_at: Instant,
}

/// Reply to a write request.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    ok: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct SheetClient<T: Transport = ReqwestTransport> {
    transport: T,
    base_url: Option<String>,
    origin: Option<String>,
    options: SheetOptions,
    cache: Mutex<HashMap<(String, Collection), CacheEntry>>,
}

impl SheetClient<ReqwestTransport> {
    /// Client over HTTP with default options.
    pub fn http() -> Result<Self, SheetError> {
        Ok(SheetClient::new(ReqwestTransport::new()?, SheetOptions::default()))
    }
}

impl<T: Transport> SheetClient<T> {
    pub fn new(transport: T, options: SheetOptions) -> Self {
        SheetClient {
            transport,
            base_url: None,
            origin: None,
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn options(&self) -> &SheetOptions {
        &self.options
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Set the remote endpoint. Trailing slashes are dropped.
    pub fn set_base_url(&mut self, url: &str) -> Result<(), SheetError> {
        self.base_url = Some(normalize_endpoint(url, "base URL")?);
        Ok(())
    }

    /// Set the site origin hosting the `/api/sheets` proxy and `/data/` files.
    pub fn set_origin(&mut self, url: &str) -> Result<(), SheetError> {
        self.origin = Some(normalize_endpoint(url, "origin")?);
        Ok(())
    }

    pub fn with_base_url(mut self, url: &str) -> Result<Self, SheetError> {
        self.set_base_url(url)?;
        Ok(self)
    }

    pub fn with_origin(mut self, url: &str) -> Result<Self, SheetError> {
        self.set_origin(url)?;
        Ok(self)
    }

    /// Fetch a collection from the first remote candidate that answers.
    pub async fn fetch_collection(
        &self,
        collection: Collection,
        options: FetchOptions,
    ) -> Result<Vec<Record>, SheetError> {
        let base = self
            .base_url
            .clone()
            .ok_or_else(|| SheetError::Config("no remote base URL set".into()))?;

        if !options.force_refresh {
            if let Some(items) = self.cached(&base, collection) {
                debug!(%collection, count = items.len(), "Serving collection from cache");
                return Ok(items);
            }
        }

        let mut failures = Vec::new();

        for url in self.candidate_urls(collection)? {
            match self.fetch_with_retry(&url).await {
                Ok(items) => {
                    info!(%collection, %url, count = items.len(), "Fetched collection");
                    self.store_cached(&base, collection, items.clone());
                    return Ok(items);
                }
                Err(e) => {
                    warn!(%collection, %url, error = %e, "Candidate failed, trying next");
                    failures.push((url.to_string(), e));
                }
            }
        }

        Err(SheetError::Exhausted(failures))
    }

    /// Fetch the statically hosted export of a collection. Never cached.
    pub async fn fetch_static(&self, collection: Collection) -> Result<Vec<Record>, SheetError> {
        let url = self.static_url(collection)?;
        self.fetch_with_retry(&url).await
    }

    pub fn static_url(&self, collection: Collection) -> Result<Url, SheetError> {
        let origin = self
            .origin
            .as_deref()
            .ok_or_else(|| SheetError::Config("no origin set for static data".into()))?;
        parse_url(&format!("{}{}", origin, collection.static_path()))
    }

    /// Send a write to the exec endpoint. Writes are never retried.
    pub async fn post(
        &self,
        collection: Collection,
        action: &str,
        payload: Value,
    ) -> Result<Value, SheetError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| SheetError::Config("no remote base URL set".into()))?;

        let mut url = parse_url(base)?;
        url.query_pairs_mut().append_pair("mode", action);

        let body = json!({
            "entity": collection.mode(),
            "action": action,
            "payload": payload,
        })
        .to_string();

        debug!(%collection, action, %url, "Posting write");

        let response = timeout(
            self.options.timeout,
            self.transport.post(&url, POST_CONTENT_TYPE, body),
        )
        .await
        .map_err(|_| SheetError::Timeout(self.options.timeout.as_millis() as u64))??;

        if !response.is_success() {
            return Err(SheetError::Status(response.status));
        }

        let reply: WriteResponse = serde_json::from_value(parse_body(&response.body)?)
            .map_err(|e| SheetError::MalformedJson(e.to_string()))?;

        if !reply.ok {
            return Err(SheetError::Rejected(
                reply.error.unwrap_or_else(|| "no reason given".into()),
            ));
        }

        self.invalidate(collection);
        Ok(reply.data.unwrap_or(Value::Null))
    }

    /// Drop every cached collection for every endpoint.
    pub fn clear_cache(&self) {
        self.cache_guard().clear();
    }

    /// Drop cached copies of one collection for every endpoint.
    pub fn invalidate(&self, collection: Collection) {
        self.cache_guard().retain(|(_, c), _| *c != collection);
    }

    /// URLs to try for a collection, in order, without duplicates.
    pub fn candidate_urls(&self, collection: Collection) -> Result<Vec<Url>, SheetError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| SheetError::Config("no remote base URL set".into()))?;
        let base_url = parse_url(base)?;

        let mut candidates = Vec::new();

        if base_url.path().trim_end_matches('/').ends_with("/exec") {
            let mut exec = base_url.clone();
            exec.query_pairs_mut().append_pair("mode", collection.mode());
            candidates.push(exec);
        }

        let mut legacy = base_url;
        legacy
            .query_pairs_mut()
            .append_pair("sheet", collection.sheet_name());
        candidates.push(legacy);

        if let Some(origin) = self.origin.as_deref() {
            let mut proxy = parse_url(&format!("{origin}/api/sheets"))?;
            proxy.query_pairs_mut().append_pair("mode", collection.mode());
            candidates.push(proxy);
        }

        let mut unique: Vec<Url> = Vec::with_capacity(candidates.len());
        for url in candidates {
            if !unique.contains(&url) {
                unique.push(url);
            }
        }
        Ok(unique)
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<Vec<Record>, SheetError> {
        let mut delay = self.options.backoff;
        let mut attempt = 0;

        loop {
            match self.fetch_once(url).await {
                Ok(items) => return Ok(items),
                Err(e) if e.is_retryable() && attempt < self.options.retries => {
                    attempt += 1;
                    debug!(%url, attempt, ?delay, error = %e, "Retrying after backoff");
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<Record>, SheetError> {
        let request_url = with_cache_bust(url);

        let response = timeout(self.options.timeout, self.transport.get(&request_url))
            .await
            .map_err(|_| SheetError::Timeout(self.options.timeout.as_millis() as u64))??;

        if !response.is_success() {
            return Err(SheetError::Status(response.status));
        }

        decode_items(&response.body)
    }

    fn cached(&self, base: &str, collection: Collection) -> Option<Vec<Record>> {
        let cache = self.cache_guard();
        let entry = cache.get(&(base.to_string(), collection))?;
        (entry.expires_at > Instant::now()).then(|| entry.items.clone())
    }

    fn store_cached(&self, base: &str, collection: Collection, items: Vec<Record>) {
        let entry = CacheEntry {
            items,
            expires_at: Instant::now() + self.options.cache_ttl,
        };
        self.cache_guard()
            .insert((base.to_string(), collection), entry);
    }

    fn cache_guard(&self) -> std::sync::MutexGuard<'_, HashMap<(String, Collection), CacheEntry>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Trim, validate as an http(s) URL and drop trailing slashes.
pub fn normalize_endpoint(input: &str, what: &str) -> Result<String, SheetError> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SheetError::Config(format!("{what} is empty")));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| SheetError::Config(format!("invalid {what} '{trimmed}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SheetError::Config(format!(
            "{what} must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

fn parse_url(s: &str) -> Result<Url, SheetError> {
    Url::parse(s).map_err(|e| SheetError::Config(format!("invalid URL '{s}': {e}")))
}

fn with_cache_bust(url: &Url) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair("t", &Utc::now().timestamp_millis().to_string());
    busted
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeTransport, Reply};
    use super::*;

    const EXEC: &str = "https://script.example.com/macros/s/abc/exec";
    const EXEC_MODE: &str = "https://script.example.com/macros/s/abc/exec?mode=lessen";
    const EXEC_SHEET: &str = "https://script.example.com/macros/s/abc/exec?sheet=Lessen";

    fn client(transport: FakeTransport) -> SheetClient<FakeTransport> {
        SheetClient::new(transport, SheetOptions::default())
            .with_base_url(EXEC)
            .unwrap()
    }

    #[test]
    fn test_set_base_url_validates_and_strips_slash() {
        let mut client = SheetClient::new(FakeTransport::new(), SheetOptions::default());

        client.set_base_url("  https://example.com/api/ ").unwrap();
        assert_eq!(client.base_url(), Some("https://example.com/api"));

        assert!(matches!(client.set_base_url("   "), Err(SheetError::Config(_))));
        assert!(matches!(client.set_base_url("not a url"), Err(SheetError::Config(_))));
        assert!(matches!(
            client.set_base_url("ftp://example.com"),
            Err(SheetError::Config(_))
        ));
        // A rejected value leaves the previous one in place.
        assert_eq!(client.base_url(), Some("https://example.com/api"));
    }

    #[test]
    fn test_candidate_urls_for_exec_base_with_origin() {
        let client = client(FakeTransport::new())
            .with_origin("https://school.example.com/")
            .unwrap();

        let urls: Vec<String> = client
            .candidate_urls(Collection::Lessen)
            .unwrap()
            .iter()
            .map(Url::to_string)
            .collect();

        assert_eq!(
            urls,
            vec![
                EXEC_MODE.to_string(),
                EXEC_SHEET.to_string(),
                "https://school.example.com/api/sheets?mode=lessen".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidate_urls_for_legacy_base() {
        let client = SheetClient::new(FakeTransport::new(), SheetOptions::default())
            .with_base_url("https://sheets.example.com/api/read")
            .unwrap();

        let urls = client.candidate_urls(Collection::Klassen).unwrap();

        assert_eq!(urls.len(), 1);
        assert_eq!(
            urls[0].as_str(),
            "https://sheets.example.com/api/read?sheet=Klassen"
        );
    }

    #[test]
    fn test_candidate_urls_for_proxy_base() {
        let client = SheetClient::new(FakeTransport::new(), SheetOptions::default())
            .with_base_url("https://school.example.com/api/sheets")
            .unwrap()
            .with_origin("https://school.example.com")
            .unwrap();

        let urls: Vec<String> = client
            .candidate_urls(Collection::Trainers)
            .unwrap()
            .iter()
            .map(Url::to_string)
            .collect();

        assert_eq!(
            urls,
            vec![
                "https://school.example.com/api/sheets?sheet=Trainers".to_string(),
                "https://school.example.com/api/sheets?mode=trainers".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unset_base_url_fails_without_network() {
        let client = SheetClient::new(FakeTransport::new(), SheetOptions::default());

        let result = client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await;

        assert!(matches!(result, Err(SheetError::Config(_))));
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_within_ttl_then_refetch() {
        let client = client(FakeTransport::new().route(EXEC_MODE, vec![Reply::Json(r#"[{"id":1}]"#)]));

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        let cached = client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(cached.len(), 1);
        assert_eq!(client.transport().calls().len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_refresh_and_clear_cache_bypass_cache() {
        let client = client(FakeTransport::new().route(EXEC_MODE, vec![Reply::Json("[]")]));

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();
        client
            .fetch_collection(Collection::Lessen, FetchOptions { force_refresh: true })
            .await
            .unwrap();
        assert_eq!(client.transport().calls().len(), 2);

        client.clear_cache();
        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(client.transport().calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_timeouts_then_success() {
        let client = client(FakeTransport::new().route(
            EXEC_MODE,
            vec![Reply::Hang, Reply::Hang, Reply::Json(r#"{"items":[{"id":"a"}]}"#)],
        ));
        let started = Instant::now();

        let items = client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(client.transport().calls_to(EXEC_MODE), 3);
        assert_eq!(client.transport().calls_to(EXEC_SHEET), 0);
        // Two 12s timeouts plus 300ms and 600ms of backoff.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(24_900), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(25_000), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_exhausted_before_next_candidate() {
        let client = client(
            FakeTransport::new()
                .route(EXEC_MODE, vec![Reply::NetworkDown])
                .route(EXEC_SHEET, vec![Reply::Json("[]")]),
        );

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(client.transport().calls_to(EXEC_MODE), 3);
        assert_eq!(client.transport().calls_to(EXEC_SHEET), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ok_false_is_not_retried() {
        let client = client(
            FakeTransport::new()
                .route(EXEC_MODE, vec![Reply::Json(r#"{"ok":false,"error":"unknown mode"}"#)])
                .route(EXEC_SHEET, vec![Reply::Json(r#"[{"id":2}]"#)]),
        );

        let items = client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(client.transport().calls_to(EXEC_MODE), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_status_is_not_retried() {
        let client = client(FakeTransport::new().route(
            "https://script.example.com/",
            vec![Reply::Status(500, "Internal error")],
        ));

        let result = client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await;

        match result {
            Err(SheetError::Exhausted(failures)) => {
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().all(|(_, e)| matches!(e, SheetError::Status(500))));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_html_response_is_retried() {
        let client = client(FakeTransport::new().route(
            EXEC_MODE,
            vec![Reply::Json("<html>login</html>"), Reply::Json("[]")],
        ));

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(client.transport().calls_to(EXEC_MODE), 2);
    }

    #[tokio::test]
    async fn test_requests_carry_cache_bust() {
        let client = client(FakeTransport::new().route(EXEC_MODE, vec![Reply::Json("[]")]));

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        let calls = client.transport().calls();
        assert!(calls[0].starts_with(&format!("{EXEC_MODE}&t=")));
    }

    #[tokio::test]
    async fn test_post_sends_envelope_and_invalidates_cache() {
        let client = client(
            FakeTransport::new()
                .route(
                    "https://script.example.com/macros/s/abc/exec?mode=add",
                    vec![Reply::Json(r#"{"ok":true,"data":{"id":"les-1"}}"#)],
                )
                .route(EXEC_MODE, vec![Reply::Json("[]")]),
        );

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();

        let data = client
            .post(Collection::Lessen, "add", json!({ "title": "Puppy" }))
            .await
            .unwrap();
        assert_eq!(data, json!({ "id": "les-1" }));

        let posts = client.transport().posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1, POST_CONTENT_TYPE);
        let body: Value = serde_json::from_str(&posts[0].2).unwrap();
        assert_eq!(
            body,
            json!({ "entity": "lessen", "action": "add", "payload": { "title": "Puppy" } })
        );

        client
            .fetch_collection(Collection::Lessen, FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(client.transport().calls_to(EXEC_MODE), 2);
    }

    #[tokio::test]
    async fn test_post_rejection() {
        let client = client(FakeTransport::new().route(
            "https://script.example.com/",
            vec![Reply::Json(r#"{"ok":false,"error":"locked"}"#)],
        ));

        let result = client.post(Collection::Lessen, "delete", json!({ "id": 1 })).await;

        assert!(matches!(result, Err(SheetError::Rejected(reason)) if reason == "locked"));
        assert_eq!(client.transport().posts().len(), 1);
    }
}
