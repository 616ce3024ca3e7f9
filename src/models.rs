//! Data models for harvested accounts, articles, listing entries and comments.
//!
//! This module defines the records handed to storage:
//! - [`Article`]: one article page, reconciled from the DOM and the embedded
//!   metadata block
//! - [`ArticleListEntry`]: one record of the account article listing, projected
//!   to a fixed allow-list of fields
//! - [`Comment`]: one comment, copied verbatim from the comment listing
//! - [`AccountInfo`]: one account search result, kept as the upstream object
//!
//! Listing and comment records keep the platform's camelCase keys, hence the
//! `rename_all` attributes. Values whose upstream type is not pinned down
//! (ids, counters) are kept as [`serde_json::Value`] so they are stored exactly
//! as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An article page after DOM and metadata reconciliation.
///
/// Field order is the column order of the `articles` table.
///
/// `title`, `article_id`, `keyword` and `cover_url` may come from the
/// `enpproperty` metadata comment. When that block is present it always wins,
/// including when it lacks a `title` element, in which case `title` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub is_original: bool,
    pub author: Option<String>,
    /// Value of the `data-time` attribute of the publish-time div.
    pub pub_date: Option<String>,
    pub article_id: Option<String>,
    /// Value of the `location` meta tag.
    pub address: Option<String>,
    pub keyword: Option<String>,
    /// Avatar of the publishing account.
    pub avatar: Option<String>,
    pub cover_url: Option<String>,
    /// Body text; empty when the page has no `.article` container.
    pub content_text: String,
}

/// One record of the article listing endpoint, restricted to [`ArticleListEntry::FIELDS`].
///
/// Allow-listed keys missing upstream deserialize to `null`; every other key
/// is dropped. Serializing always emits all sixteen keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleListEntry {
    pub article_id: Value,
    pub title: Value,
    pub copyright: Value,
    pub summary: Value,
    pub release_time: Value,
    pub create_time: Value,
    pub update_time: Value,
    pub article_type: Value,
    pub share_url: Value,
    pub source: Value,
    pub count_discuss: Value,
    pub count_like: Value,
    pub column_name: Value,
    pub column_id: Value,
    pub column_desc: Value,
    pub pic_middle: Value,
}

impl ArticleListEntry {
    /// Upstream keys kept by the projection, in column order.
    #[cfg(test)]
    pub const FIELDS: [&'static str; 16] = [
        "articleId",
        "title",
        "copyright",
        "summary",
        "releaseTime",
        "createTime",
        "updateTime",
        "articleType",
        "shareUrl",
        "source",
        "countDiscuss",
        "countLike",
        "columnName",
        "columnId",
        "columnDesc",
        "picMiddle",
    ];

    /// The article id rendered as a query value, if the listing carried one.
    pub fn article_id(&self) -> Option<String> {
        scalar_to_string(&self.article_id)
    }
}

/// A comment as returned by the comment listing endpoint.
///
/// Every field is required: a record lacking any of them fails to
/// deserialize instead of being defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub cmt_id: Value,
    pub parent_id: Value,
    pub username: Value,
    pub like_count: Value,
    pub user_uuid: Value,
    pub portrait_url: Value,
    pub cmt_content: Value,
    pub article_id: Value,
    pub create_time: Value,
    pub ip_location: Value,
    pub root_cmt_id: Value,
    pub sub_cmt_count: Value,
}

/// An account search result, kept verbatim (key order preserved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountInfo(pub Map<String, Value>);

impl AccountInfo {
    pub fn column_name(&self) -> Option<&str> {
        self.0.get("columnName").and_then(Value::as_str)
    }

    /// `columnId` as a query value; upstream sends it as a number or a string.
    pub fn column_id(&self) -> Option<String> {
        self.0.get("columnId").and_then(scalar_to_string)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Render a JSON scalar the way it would appear in a query string.
///
/// `null`, empty strings and compound values have no such rendering.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
