//! Account lookup by name.
//!
//! The search endpoint matches loosely, so the result list is scanned for an
//! entry whose `columnName` equals the requested name exactly. The endpoint
//! wants a device id and a request signature; both are opaque values taken
//! from configuration.

use crate::config::Config;
use crate::http::{Fetch, FetchRequest};
use crate::models::AccountInfo;
use crate::pagination::Envelope;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

fn search_request(config: &Config, name: &str) -> FetchRequest {
    FetchRequest::get(&config.endpoints.account_search)
        .query("pageIndex", 1)
        .query("origin", 3)
        .query("pageSize", 20)
        .query("location", "guangzhou")
        .query("deviceId", &config.device_id)
        .query("userId", "")
        .query("indexType", 0)
        .query("sortType", "time")
        .query("classifiedType", -1)
        .query("sign", &config.sign)
        .query("secretCanChanged", "true")
        .query("keyword", name)
}

/// Look up the account called exactly `name`.
///
/// # Arguments
///
/// * `fetcher` - Transport for the search request
/// * `config` - Supplies the endpoint, device id and signature
/// * `name` - Account name; matched against `columnName` exactly
///
/// # Returns
///
/// The matching account record as returned upstream. Every failure is logged
/// and yields `None`: transport, HTTP status, a rejected envelope, or no
/// exact match.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn search_account<F: Fetch>(
    fetcher: &F,
    config: &Config,
    name: &str,
) -> Option<AccountInfo> {
    let response = match fetcher.get(&search_request(config, name)).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            error!(status = response.status, "Account search failed");
            return None;
        }
        Err(e) => {
            error!(error = %e, "Account search failed");
            return None;
        }
    };

    let envelope: Envelope = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(error = %e, "Account search returned invalid JSON");
            return None;
        }
    };
    if let Err(msg) = envelope.require_success_code() {
        error!(%msg, "Account search returned an error");
        return None;
    }

    let found = envelope
        .records("nfh")
        .iter()
        .filter_map(Value::as_object)
        .map(|account| AccountInfo(account.clone()))
        .find(|account| account.column_name() == Some(name));

    match &found {
        Some(account) => debug!(column_id = ?account.column_id(), "Found exact account match"),
        None => warn!("No account matches the name exactly"),
    }
    found
}
