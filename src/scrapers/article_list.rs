//! Article listing of one account (column).
//!
//! Walks `article/list` page by page and projects each raw record onto
//! [`ArticleListEntry`]'s allow-list. No pause between pages.

use crate::config::Config;
use crate::http::{Fetch, FetchRequest};
use crate::models::ArticleListEntry;
use crate::pagination::{Envelope, Listing, Paginated, fetch_all_pages};
use serde_json::Value;
use tracing::{info, instrument};

/// The article listing endpoint for one column.
#[derive(Debug, Clone)]
pub struct ArticleList<'a> {
    pub base_url: &'a str,
    pub column_id: &'a str,
    pub page_size: u32,
}

impl<'a> ArticleList<'a> {
    pub fn new(config: &'a Config, column_id: &'a str) -> Self {
        Self {
            base_url: &config.endpoints.article_list,
            column_id,
            page_size: config.article_page_size,
        }
    }
}

impl Listing for ArticleList<'_> {
    type Record = ArticleListEntry;

    fn name(&self) -> &'static str {
        "article_list"
    }

    fn request(&self, page_num: u32) -> FetchRequest {
        FetchRequest::get(self.base_url)
            .query("nfhSubCount", 0)
            .query("columnId", self.column_id)
            .query("service", 0)
            .query("pageSize", self.page_size)
            .query("pageNum", page_num)
    }

    fn check(&self, envelope: &Envelope) -> Result<(), String> {
        envelope.require_success()
    }

    fn records_key(&self) -> &'static str {
        "list"
    }

    fn project(&self, raw: &Value) -> Result<ArticleListEntry, serde_json::Error> {
        serde_json::from_value(raw.clone())
    }
}

/// Every listed article of `column_id`, in listing order.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn fetch_article_list<F: Fetch>(
    fetcher: &F,
    config: &Config,
    column_id: &str,
) -> Paginated<ArticleListEntry> {
    let listing = ArticleList::new(config, column_id);
    let out = fetch_all_pages(fetcher, &listing).await;
    info!(count = out.records.len(), stop = %out.stop, "Fetched article list");
    out
}
