//! HTTP transport used by every scraper.
//!
//! The [`Fetch`] trait is the only way scrapers reach the network, which
//! keeps pagination and page extraction testable against scripted responses.
//! A non-2xx status is a successful fetch at this layer; each caller decides
//! what a usable response is.

use crate::error::{Error, Result};
use rand::rng;
use rand::seq::IndexedRandom;
use reqwest::redirect::Policy;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Content type sent with comment and article page requests.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Desktop browser User-Agents the harvester rotates through.
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/535.1 (KHTML, like Gecko) Chrome/14.0.835.163 Safari/535.1",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:6.0) Gecko/20100101 Firefox/6.0",
    "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1; WOW64; Trident/4.0; SLCC2; .NET CLR 2.0.50727; .NET CLR 3.5.30729; .NET CLR 3.0.30729; Media Center PC 6.0; .NET4.0C; InfoPath.3)",
];

/// A single GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub follow_redirects: bool,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            follow_redirects: true,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Value of a query parameter, if set.
    #[cfg(test)]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a header, if set. Header names compare case-insensitively.
    #[cfg(test)]
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[cfg(test)]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issue GET requests.
///
/// Implementors only fail on transport problems (connect, timeout, body
/// read). Any HTTP status, including 3xx when redirects are off, is returned
/// as a response.
pub trait Fetch {
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// [`Fetch`] over `reqwest`.
///
/// Holds two clients because the redirect policy is per client in reqwest
/// and requests choose per call whether to follow.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    following: reqwest::Client,
    not_following: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let build = |policy: Policy| {
            reqwest::Client::builder()
                .timeout(timeout)
                .redirect(policy)
                .build()
                .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))
        };
        Ok(Self {
            following: build(Policy::default())?,
            not_following: build(Policy::none())?,
        })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let t0 = Instant::now();
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.not_following
        };

        let mut builder = client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "GET failed");
            Error::Transport(format!("GET {}: {e}", request.url))
        })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("reading body of {}: {e}", request.url)))?;

        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET completed"
        );
        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Pick a User-Agent uniformly at random, falling back to the first default
/// when the pool is empty.
pub fn random_user_agent(pool: &[String]) -> String {
    pool.choose(&mut rng())
        .cloned()
        .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
}
