//! Runtime configuration.
//!
//! Settings come from an optional YAML file; every field has a default, so
//! an empty file (or none at all) is a valid configuration. Command-line
//! flags are applied on top in `main`.
//!
//! ```yaml
//! data_dir: ./data
//! storage: csv
//! device_id: "..."
//! sign: "..."
//! comment_pause_secs: 1
//! page_retries: 5
//! page_retry_delay_secs: 30
//! ```

use crate::error::Result;
use crate::http::DEFAULT_USER_AGENTS;
use crate::retry::FixedBackoff;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Which storage backend the harvest writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Append-only CSV tables with a UTF-8 BOM.
    #[default]
    Csv,
    /// One JSON object per line.
    Jsonl,
    /// Keep records in memory only (dry run).
    Memory,
}

/// Platform endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub article_list: String,
    pub comment_list: String,
    pub account_search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            article_list: "https://nfplusapi.nfnews.com/nfplus-manuscript-web/article/list"
                .to_string(),
            comment_list:
                "https://nfplusapi.nfnews.com/nfplus-cmt-web/buildStyle/cmt/moreCommentList"
                    .to_string(),
            account_search: "https://api.nfnews.com/nanfang_if/searchInSign/classifiedSearch"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage: StorageKind,
    /// Device id the account search endpoint expects. Opaque.
    pub device_id: String,
    /// Request signature the account search endpoint expects. Opaque.
    pub sign: String,
    pub endpoints: Endpoints,
    pub article_page_size: u32,
    pub comment_page_size: u32,
    /// Politeness delay between comment pages.
    pub comment_pause_secs: u64,
    /// Retries after the first article page request.
    pub page_retries: usize,
    pub page_retry_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agents: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            storage: StorageKind::default(),
            device_id: String::new(),
            sign: String::new(),
            endpoints: Endpoints::default(),
            article_page_size: 20,
            comment_page_size: 20,
            comment_pause_secs: 1,
            page_retries: 5,
            page_retry_delay_secs: 30,
            request_timeout_secs: 30,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn comment_pause(&self) -> Duration {
        Duration::from_secs(self.comment_pause_secs)
    }

    pub fn page_backoff(&self) -> FixedBackoff {
        FixedBackoff::new(
            self.page_retries,
            Duration::from_secs(self.page_retry_delay_secs),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
