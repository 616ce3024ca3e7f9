//! Comment thread of one article.
//!
//! Walks `moreCommentList` page by page with a one-second politeness delay
//! between pages. Each request picks a fresh User-Agent and does not follow
//! redirects. The envelope must carry both `success: true` and `code: 200`.

use crate::config::Config;
use crate::http::{FORM_CONTENT_TYPE, Fetch, FetchRequest, random_user_agent};
use crate::models::Comment;
use crate::pagination::{Envelope, Listing, Paginated, fetch_all_pages};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// The comment listing endpoint for one article.
#[derive(Debug, Clone)]
pub struct CommentList<'a> {
    pub base_url: &'a str,
    pub article_id: &'a str,
    pub page_size: u32,
    pub pause: Duration,
    pub user_agents: &'a [String],
}

impl<'a> CommentList<'a> {
    pub fn new(config: &'a Config, article_id: &'a str) -> Self {
        Self {
            base_url: &config.endpoints.comment_list,
            article_id,
            page_size: config.comment_page_size,
            pause: config.comment_pause(),
            user_agents: &config.user_agents,
        }
    }
}

impl Listing for CommentList<'_> {
    type Record = Comment;

    fn name(&self) -> &'static str {
        "comments"
    }

    fn request(&self, page_num: u32) -> FetchRequest {
        FetchRequest::get(self.base_url)
            .query("articleId", self.article_id)
            .query("pageNum", page_num)
            .query("pageSize", self.page_size)
            .header("User-Agent", random_user_agent(self.user_agents))
            .header("Content-Type", FORM_CONTENT_TYPE)
            .follow_redirects(false)
    }

    fn check(&self, envelope: &Envelope) -> Result<(), String> {
        envelope.require_success_code()
    }

    fn records_key(&self) -> &'static str {
        "newComment"
    }

    fn project(&self, raw: &Value) -> Result<Comment, serde_json::Error> {
        serde_json::from_value(raw.clone())
    }

    fn pause(&self) -> Option<Duration> {
        Some(self.pause)
    }
}

/// Every comment of `article_id`, in the order the platform returns them.
///
/// # Arguments
///
/// * `fetcher` - Transport for the page requests
/// * `config` - Supplies the endpoint, page size and pause between pages
/// * `article_id` - Id of the article whose thread is walked
///
/// # Returns
///
/// The comments of every accepted page and the reason pagination stopped.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn fetch_comments<F: Fetch>(
    fetcher: &F,
    config: &Config,
    article_id: &str,
) -> Paginated<Comment> {
    debug!("Fetching comments");
    fetch_all_pages(fetcher, &CommentList::new(config, article_id)).await
}
