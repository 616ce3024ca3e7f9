//! Walking page-numbered list endpoints.
//!
//! Both list APIs of the platform answer with the same envelope:
//!
//! ```text
//! { "success": bool, "code": int?, "msg": str?,
//!   "data": { "<records key>": [...], "hasNextPage": bool } }
//! ```
//!
//! [`fetch_all_pages`] requests page 1, 2, ... in order and stops on the first
//! of: `hasNextPage` false, a page with no records, a transport failure, an
//! envelope the endpoint rejects, or a record that does not project. None of
//! these is an error for the caller; the reason is reported alongside the
//! records accumulated so far.

use crate::http::{Fetch, FetchRequest};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// A list endpoint the paginator can walk.
pub trait Listing {
    type Record;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// The request for page `page_num` (1-based).
    fn request(&self, page_num: u32) -> FetchRequest;

    /// Accept or reject a decoded envelope; `Err` carries the reason.
    fn check(&self, envelope: &Envelope) -> Result<(), String>;

    /// Key of the record array inside `data`.
    fn records_key(&self) -> &'static str;

    /// Turn one raw record into the endpoint's record type.
    fn project(&self, raw: &Value) -> Result<Self::Record, serde_json::Error>;

    /// Pause before requesting the next page.
    fn pause(&self) -> Option<Duration> {
        None
    }
}

/// Response envelope shared by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn has_next_page(&self) -> bool {
        self.data
            .get("hasNextPage")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn records(&self, key: &str) -> &[Value] {
        self.data
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Upstream message, or a placeholder when there is none.
    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or("unknown error")
    }

    /// `success` must be true.
    pub fn require_success(&self) -> Result<(), String> {
        if self.success {
            Ok(())
        } else {
            Err(self.message().to_string())
        }
    }

    /// `success` must be true and `code` must be 200.
    pub fn require_success_code(&self) -> Result<(), String> {
        self.require_success()?;
        match self.code {
            Some(200) => Ok(()),
            Some(code) => Err(format!("code {code}: {}", self.message())),
            None => Err(format!("missing code: {}", self.message())),
        }
    }
}

/// Why pagination stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last page said `hasNextPage: false`.
    LastPage,
    /// A page came back with no records.
    EmptyPage,
    /// Network failure, non-2xx status, or a body that is not JSON.
    Transport(String),
    /// The envelope reported a failure.
    Upstream(String),
    /// A record failed to project; its page was discarded.
    Malformed(String),
}

impl StopReason {
    /// Whether pagination ran to its natural end.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, StopReason::LastPage | StopReason::EmptyPage)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::LastPage => write!(f, "last page"),
            StopReason::EmptyPage => write!(f, "empty page"),
            StopReason::Transport(e) => write!(f, "transport failure: {e}"),
            StopReason::Upstream(e) => write!(f, "upstream failure: {e}"),
            StopReason::Malformed(e) => write!(f, "malformed record: {e}"),
        }
    }
}

/// Records collected across pages, in page order.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub records: Vec<T>,
    /// Pages whose records were accepted.
    pub pages_fetched: u32,
    pub stop: StopReason,
}

impl<T> Paginated<T> {
    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

/// Fetch every page of `listing`, starting at page 1.
///
/// # Arguments
///
/// * `fetcher` - Transport used for every page request
/// * `listing` - The endpoint: page requests, envelope check and projection
///
/// # Returns
///
/// The records of every fully accepted page, in page order, together with
/// the number of pages fetched and the reason pagination stopped. Failures
/// end the walk but are never returned as errors.
#[instrument(level = "info", skip_all, fields(listing = listing.name()))]
pub async fn fetch_all_pages<F, L>(fetcher: &F, listing: &L) -> Paginated<L::Record>
where
    F: Fetch,
    L: Listing,
{
    let mut records = Vec::new();
    let mut page_num = 1u32;

    let stop = loop {
        let envelope = match fetch_envelope(fetcher, &listing.request(page_num)).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(page_num, error = %e, "Request failed; stopping");
                break StopReason::Transport(e);
            }
        };

        if let Err(msg) = listing.check(&envelope) {
            error!(page_num, %msg, "Endpoint returned an error; stopping");
            break StopReason::Upstream(msg);
        }

        let raw = envelope.records(listing.records_key());
        if raw.is_empty() {
            debug!(page_num, "No more records");
            break StopReason::EmptyPage;
        }

        let page: Result<Vec<_>, _> = raw.iter().map(|r| listing.project(r)).collect();
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                warn!(page_num, error = %e, "Malformed record; discarding page and stopping");
                break StopReason::Malformed(e.to_string());
            }
        };
        debug!(page_num, count = page.len(), "Page fetched");
        records.extend(page);

        if !envelope.has_next_page() {
            debug!(page_num, "Reached last page");
            break StopReason::LastPage;
        }

        page_num += 1;
        if let Some(pause) = listing.pause() {
            sleep(pause).await;
        }
    };

    let pages_fetched = match stop {
        StopReason::LastPage => page_num,
        _ => page_num - 1,
    };
    info!(count = records.len(), pages_fetched, %stop, "Pagination finished");
    Paginated {
        records,
        pages_fetched,
        stop,
    }
}

async fn fetch_envelope<F: Fetch>(fetcher: &F, request: &FetchRequest) -> Result<Envelope, String> {
    let response = fetcher.get(request).await.map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("HTTP status {}", response.status));
    }
    serde_json::from_slice(&response.body).map_err(|e| format!("invalid JSON body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedFetcher;
    use crate::http::FetchResponse;
    use serde_json::json;

    /// Listing of plain numbers under `items`, with an optional pause.
    struct Numbers {
        pause: Option<Duration>,
    }

    impl Listing for Numbers {
        type Record = i64;

        fn name(&self) -> &'static str {
            "numbers"
        }

        fn request(&self, page_num: u32) -> FetchRequest {
            FetchRequest::get("https://example.com/numbers").query("pageNum", page_num)
        }

        fn check(&self, envelope: &Envelope) -> Result<(), String> {
            envelope.require_success()
        }

        fn records_key(&self) -> &'static str {
            "items"
        }

        fn project(&self, raw: &Value) -> Result<i64, serde_json::Error> {
            serde_json::from_value(raw.clone())
        }

        fn pause(&self) -> Option<Duration> {
            self.pause
        }
    }

    fn page(items: Value, has_next: bool) -> Value {
        json!({"success": true, "data": {"items": items, "hasNextPage": has_next}})
    }

    #[tokio::test]
    async fn stops_on_last_page_without_further_requests() {
        let fetcher = ScriptedFetcher::json_pages(vec![
            page(json!([1, 2]), true),
            page(json!([3]), false),
            page(json!([99]), false),
        ]);

        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        assert_eq!(out.records, vec![1, 2, 3]);
        assert_eq!(out.stop, StopReason::LastPage);
        assert_eq!(out.pages_fetched, 2);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn requests_pages_in_increasing_order() {
        let fetcher = ScriptedFetcher::json_pages(vec![
            page(json!([1]), true),
            page(json!([2]), true),
            page(json!([3]), false),
        ]);

        fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        let pages: Vec<String> = fetcher
            .requests()
            .iter()
            .map(|r| r.query_value("pageNum").unwrap().to_string())
            .collect();
        assert_eq!(pages, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn unsuccessful_envelope_returns_accumulated() {
        let fetcher = ScriptedFetcher::json_pages(vec![
            page(json!([1, 2]), true),
            json!({"success": false, "msg": "rate limited"}),
        ]);

        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        assert_eq!(out.records, vec![1, 2]);
        assert_eq!(out.stop, StopReason::Upstream("rate limited".to_string()));
        assert_eq!(out.pages_fetched, 1);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn empty_page_terminates_even_if_more_is_claimed() {
        let fetcher = ScriptedFetcher::json_pages(vec![
            page(json!([1]), true),
            page(json!([]), true),
        ]);

        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        assert_eq!(out.records, vec![1]);
        assert_eq!(out.stop, StopReason::EmptyPage);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn missing_record_array_counts_as_empty() {
        let fetcher =
            ScriptedFetcher::json_pages(vec![json!({"success": true, "data": {"hasNextPage": true}})]);

        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        assert!(out.records.is_empty());
        assert_eq!(out.stop, StopReason::EmptyPage);
        assert!(out.stop.is_exhausted());
    }

    #[tokio::test]
    async fn transport_error_is_not_fatal() {
        let fetcher = ScriptedFetcher::sequence(vec![
            Ok(FetchResponse::new(200, page(json!([1]), true).to_string())),
            Err("timed out".to_string()),
        ]);

        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        assert_eq!(out.records, vec![1]);
        assert!(matches!(out.stop, StopReason::Transport(ref e) if e.contains("timed out")));
        assert!(!out.stop.is_exhausted());
    }

    #[tokio::test]
    async fn http_error_status_and_bad_json_are_transport_stops() {
        let fetcher = ScriptedFetcher::sequence(vec![Ok(FetchResponse::new(502, "bad gateway"))]);
        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;
        assert_eq!(out.stop, StopReason::Transport("HTTP status 502".to_string()));

        let fetcher = ScriptedFetcher::sequence(vec![Ok(FetchResponse::new(200, "<html>"))]);
        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;
        assert!(matches!(out.stop, StopReason::Transport(ref e) if e.starts_with("invalid JSON")));
        assert!(out.records.is_empty());
    }

    #[tokio::test]
    async fn malformed_record_discards_its_page() {
        let fetcher = ScriptedFetcher::json_pages(vec![
            page(json!([1, 2]), true),
            page(json!([3, "four", 5]), true),
        ]);

        let out = fetch_all_pages(&fetcher, &Numbers { pause: None }).await;

        assert_eq!(out.records, vec![1, 2]);
        assert!(matches!(out.stop, StopReason::Malformed(_)));
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_pages_only() {
        let fetcher = ScriptedFetcher::json_pages(vec![
            page(json!([1]), true),
            page(json!([2]), true),
            page(json!([3]), false),
        ]);
        let t0 = tokio::time::Instant::now();

        let out = fetch_all_pages(
            &fetcher,
            &Numbers {
                pause: Some(Duration::from_secs(1)),
            },
        )
        .await;

        assert_eq!(out.records, vec![1, 2, 3]);
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[test]
    fn success_code_check() {
        let ok: Envelope = serde_json::from_value(json!({"success": true, "code": 200})).unwrap();
        assert!(ok.require_success_code().is_ok());

        let bad_code: Envelope =
            serde_json::from_value(json!({"success": true, "code": 500, "msg": "boom"})).unwrap();
        assert_eq!(bad_code.require_success_code(), Err("code 500: boom".to_string()));

        let no_code: Envelope = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(no_code.require_success_code().is_err());

        let failed: Envelope = serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(failed.require_success_code(), Err("unknown error".to_string()));
    }
}
