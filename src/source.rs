//! Article URLs handed over by the app-side navigator.
//!
//! On the device, each article is opened in the Nanfang+ app and its share
//! link copied to the clipboard. That side of the pipeline is outside this
//! crate; what reaches it is a listing of article URLs, one per line:
//!
//! ```text
//! # title<TAB>url, or just url
//! 中山大学召开年度工作会议	https://static.nfnews.com/content/202501/02/c1.html
//! https://static.nfnews.com/content/202501/03/c2.html
//! ```

use std::collections::HashSet;
use std::io::BufRead;

/// One article as seen in the app listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub title: Option<String>,
    pub url: String,
}

impl ListingItem {
    /// Key under which the item is remembered: its title, or its URL when
    /// the listing gave no title.
    pub fn seen_key(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Parse a listing. Blank lines and `#` comments are skipped.
pub fn read_listing(reader: impl BufRead) -> std::io::Result<Vec<ListingItem>> {
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let item = match line.rsplit_once('\t') {
            Some((title, url)) if !title.trim().is_empty() => ListingItem {
                title: Some(title.trim().to_string()),
                url: url.trim().to_string(),
            },
            Some((_, url)) => ListingItem {
                title: None,
                url: url.trim().to_string(),
            },
            None => ListingItem {
                title: None,
                url: line.to_string(),
            },
        };
        items.push(item);
    }
    Ok(items)
}

/// Titles already visited during one listing session.
///
/// Owned by whoever drives the session; the harvester takes it by value and
/// hands back the updated set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenTitles(HashSet<String>);

impl SeenTitles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Remember `key`; returns `false` if it was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        self.0.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
