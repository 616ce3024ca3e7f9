//! Harvest orchestration.
//!
//! Ties the scrapers to storage. Three entry points mirror the three ways an
//! article becomes known:
//!
//! 1. by account name: search, then everything in the account's column
//! 2. by column id: everything the article listing returns
//! 3. by URL: article pages handed over from the app side
//!
//! Work is strictly sequential. A failure on one article (unreachable page,
//! missing DOM anchor, storage error) is logged and counted, and the run
//! moves on to the next one.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::Fetch;
use crate::models::{Article, Comment};
use crate::scrapers::{account, article_list, article_page, comments};
use crate::source::{ListingItem, SeenTitles};
use crate::storage::Storage;
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub accounts: usize,
    pub articles: usize,
    pub comments: usize,
    /// Items not processed: already seen, or page unavailable.
    pub skipped: usize,
    /// Items that failed to parse or store.
    pub failed: usize,
}

impl HarvestSummary {
    fn absorb(&mut self, other: HarvestSummary) {
        self.accounts += other.accounts;
        self.articles += other.articles;
        self.comments += other.comments;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accounts, {} articles, {} comments, {} skipped, {} failed",
            self.accounts, self.articles, self.comments, self.skipped, self.failed
        )
    }
}

/// Runs harvests against one fetcher and one storage handle.
pub struct Harvester<'a, F, S> {
    fetcher: &'a F,
    storage: &'a S,
    config: &'a Config,
}

impl<'a, F: Fetch, S: Storage> Harvester<'a, F, S> {
    pub fn new(fetcher: &'a F, storage: &'a S, config: &'a Config) -> Self {
        Self {
            fetcher,
            storage,
            config,
        }
    }

    /// Look up an account by exact name, store it, and harvest its column.
    #[instrument(level = "info", skip(self))]
    pub async fn harvest_account(&self, name: &str) -> Result<HarvestSummary> {
        let account = account::search_account(self.fetcher, self.config, name)
            .await
            .ok_or_else(|| Error::AccountNotFound(name.to_string()))?;
        let column_id = account
            .column_id()
            .ok_or_else(|| Error::Upstream(format!("account `{name}` has no columnId")))?;

        self.storage.store_account_info(&account).await?;
        let mut summary = HarvestSummary {
            accounts: 1,
            ..HarvestSummary::default()
        };
        summary.absorb(self.harvest_column(&column_id).await);
        Ok(summary)
    }

    /// Store every listed article of a column together with its comments.
    #[instrument(level = "info", skip(self))]
    pub async fn harvest_column(&self, column_id: &str) -> HarvestSummary {
        let mut summary = HarvestSummary::default();
        let listing = article_list::fetch_article_list(self.fetcher, self.config, column_id).await;
        debug!(pages = listing.pages_fetched, count = listing.records.len(), "Article list fetched");
        if !listing.stop.is_exhausted() {
            warn!(stop = %listing.stop, "Article list incomplete");
        }

        for entry in listing.into_records() {
            if let Err(e) = self.storage.store_article_entry(&entry).await {
                error!(error = %e, article_id = ?entry.article_id, "Failed to store listing entry");
                summary.failed += 1;
                continue;
            }
            summary.articles += 1;

            let Some(article_id) = entry.article_id() else {
                warn!(title = ?entry.title, "Listing entry has no articleId; skipping comments");
                continue;
            };
            match self.harvest_comments(&article_id).await {
                Ok(stored) => summary.comments += stored,
                Err(e) => {
                    error!(%article_id, error = %e, "Failed to store comments");
                    summary.failed += 1;
                }
            }
        }

        info!(%summary, "Column harvest finished");
        summary
    }

    /// Fetch, parse and store one article page and its comments.
    ///
    /// `Ok(None)` when the page never became available.
    #[instrument(level = "info", skip(self))]
    pub async fn harvest_article_url(&self, url: &str) -> Result<Option<(Article, Vec<Comment>)>> {
        let Some(article) = article_page::fetch_article(self.fetcher, self.config, url).await? else {
            return Ok(None);
        };

        let comments = match article.article_id.as_deref() {
            Some(id) if !id.is_empty() => {
                let out = comments::fetch_comments(self.fetcher, self.config, id).await;
                if !out.stop.is_exhausted() {
                    warn!(article_id = id, stop = %out.stop, "Comment thread incomplete");
                }
                out.into_records()
            }
            _ => {
                debug!("Article has no id; skipping comments");
                Vec::new()
            }
        };

        self.storage.store_article(&article).await?;
        self.storage.store_comments(&comments).await?;
        Ok(Some((article, comments)))
    }

    /// Harvest a listing handed over from the app side, skipping titles
    /// already in `seen`. Returns the updated set.
    #[instrument(level = "info", skip_all, fields(items = items.len(), seen = seen.len()))]
    pub async fn harvest_listing(
        &self,
        items: &[ListingItem],
        mut seen: SeenTitles,
    ) -> (HarvestSummary, SeenTitles) {
        let mut summary = HarvestSummary::default();

        for item in items {
            if seen.contains(item.seen_key()) {
                debug!(key = item.seen_key(), "Already visited; skipping");
                summary.skipped += 1;
                continue;
            }
            seen.insert(item.seen_key());
            info!(title = ?item.title, url = %item.url, "Harvesting article");

            match self.harvest_article_url(&item.url).await {
                Ok(Some((_, comments))) => {
                    summary.articles += 1;
                    summary.comments += comments.len();
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!(url = %item.url, error = %e, "Article failed; continuing");
                    summary.failed += 1;
                }
            }
        }

        info!(%summary, seen = seen.len(), "Listing harvest finished");
        (summary, seen)
    }

    /// Fetch and store one article's comments; returns how many were stored.
    async fn harvest_comments(&self, article_id: &str) -> Result<usize> {
        let out = comments::fetch_comments(self.fetcher, self.config, article_id).await;
        if !out.stop.is_exhausted() {
            warn!(article_id, stop = %out.stop, "Comment thread incomplete");
        }
        let comments = out.into_records();
        self.storage.store_comments(&comments).await?;
        Ok(comments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedFetcher;
    use crate::http::{FetchRequest, FetchResponse};
    use crate::storage::MemoryStorage;
    use serde_json::{Value, json};

    const ARTICLE_PAGE: &str = r#"<html><head>
        <meta name="author" content="A"><meta name="Copyright" content="1">
        <meta name="location" content="GZ"></head><body>
        <!--enpproperty <articleid>art1</articleid><title>Meta</title>/enpproperty-->
        <h1 id="articleTitle">Dom</h1><img class="colimg" src="a.png">
        <div class="nfhtime pubtime" data-time="t"></div>
        <div class="article">Body</div></body></html>"#;

    fn comment(id: &str) -> Value {
        json!({
            "cmtId": id, "parentId": "0", "username": "a", "likeCount": 3,
            "userUuid": "u1", "portraitUrl": "p", "cmtContent": "hi",
            "articleId": "art1", "createTime": "t", "ipLocation": "gz",
            "rootCmtId": id, "subCmtCount": 0
        })
    }

    fn json_response(v: Value) -> FetchResponse {
        FetchResponse::new(200, v.to_string())
    }

    /// Routes by endpoint: comments, article list, account search, else page.
    fn platform(config: &Config) -> ScriptedFetcher {
        let endpoints = config.endpoints.clone();
        ScriptedFetcher::new(move |_, req: &FetchRequest| {
            if req.url == endpoints.comment_list {
                let id = req.query_value("articleId").unwrap_or_default();
                return Ok(json_response(json!({
                    "success": true, "code": 200,
                    "data": {"newComment": [comment(&format!("{id}-c1"))], "hasNextPage": false}
                })));
            }
            if req.url == endpoints.article_list {
                return Ok(json_response(json!({
                    "success": true,
                    "data": {"list": [{"articleId": 10, "title": "one"}, {"title": "no id"}],
                             "hasNextPage": false}
                })));
            }
            if req.url == endpoints.account_search {
                return Ok(json_response(json!({
                    "success": true, "code": 200,
                    "data": {"nfh": [{"columnName": "acct", "columnId": 5}]}
                })));
            }
            if req.url.ends_with("/missing.html") {
                return Ok(FetchResponse::new(404, "gone"));
            }
            if req.url.ends_with("/broken.html") {
                return Ok(FetchResponse::new(200, "<html><body>nothing</body></html>"));
            }
            Ok(FetchResponse::new(200, ARTICLE_PAGE))
        })
    }

    fn item(title: &str, url: &str) -> ListingItem {
        ListingItem {
            title: Some(title.to_string()),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn account_harvest_stores_account_entries_and_comments() {
        let config = Config::default();
        let fetcher = platform(&config);
        let storage = MemoryStorage::default();
        let harvester = Harvester::new(&fetcher, &storage, &config);

        let summary = harvester.harvest_account("acct").await.unwrap();

        assert_eq!(
            summary,
            HarvestSummary {
                accounts: 1,
                articles: 2,
                comments: 1,
                skipped: 0,
                failed: 0
            }
        );
        assert_eq!(storage.accounts().len(), 1);
        assert_eq!(storage.entries().len(), 2);
        assert_eq!(storage.comments()[0].cmt_id, json!("10-c1"));

        let list_req = fetcher
            .requests()
            .into_iter()
            .find(|r| r.url == config.endpoints.article_list)
            .unwrap();
        assert_eq!(list_req.query_value("columnId"), Some("5"));
    }

    #[tokio::test]
    async fn unknown_account_is_an_error() {
        let config = Config::default();
        let fetcher = ScriptedFetcher::json_pages(vec![json!({
            "success": true, "code": 200, "data": {"nfh": []}
        })]);
        let storage = MemoryStorage::default();
        let harvester = Harvester::new(&fetcher, &storage, &config);

        let err = harvester.harvest_account("nobody").await.unwrap_err();

        assert!(matches!(err, Error::AccountNotFound(ref n) if n == "nobody"));
        assert!(storage.accounts().is_empty());
    }

    #[tokio::test]
    async fn article_url_uses_metadata_id_for_comments() {
        let config = Config::default();
        let fetcher = platform(&config);
        let storage = MemoryStorage::default();
        let harvester = Harvester::new(&fetcher, &storage, &config);

        let (article, comments) = harvester
            .harvest_article_url("https://static.nfnews.com/a.html")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(article.title.as_deref(), Some("Meta"));
        assert_eq!(comments.len(), 1);
        assert_eq!(storage.articles(), vec![article]);
        let comment_req = fetcher
            .requests()
            .into_iter()
            .find(|r| r.url == config.endpoints.comment_list)
            .unwrap();
        assert_eq!(comment_req.query_value("articleId"), Some("art1"));
    }

    #[tokio::test(start_paused = true)]
    async fn listing_skips_seen_unavailable_and_broken_items() {
        let config = Config::default();
        let fetcher = platform(&config);
        let storage = MemoryStorage::default();
        let harvester = Harvester::new(&fetcher, &storage, &config);

        let mut seen = SeenTitles::new();
        seen.insert("already");
        let items = vec![
            item("already", "https://static.nfnews.com/0.html"),
            item("first", "https://static.nfnews.com/1.html"),
            item("first", "https://static.nfnews.com/1-dup.html"),
            item("gone", "https://static.nfnews.com/missing.html"),
            item("broken", "https://static.nfnews.com/broken.html"),
            item("last", "https://static.nfnews.com/2.html"),
        ];

        let (summary, seen) = harvester.harvest_listing(&items, seen).await;

        assert_eq!(
            summary,
            HarvestSummary {
                accounts: 0,
                articles: 2,
                comments: 2,
                skipped: 3,
                failed: 1
            }
        );
        assert_eq!(seen.len(), 5);
        assert!(seen.contains("gone"));
        assert_eq!(storage.articles().len(), 2);
        let page_requests = fetcher
            .requests()
            .iter()
            .filter(|r| r.url.ends_with("missing.html"))
            .count();
        assert_eq!(page_requests, 6);
    }

    #[test]
    fn summary_display() {
        let s = HarvestSummary {
            accounts: 1,
            articles: 2,
            comments: 3,
            skipped: 4,
            failed: 5,
        };
        assert_eq!(
            s.to_string(),
            "1 accounts, 2 articles, 3 comments, 4 skipped, 5 failed"
        );
    }
}
