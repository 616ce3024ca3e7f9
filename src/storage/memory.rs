use super::Storage;
use crate::error::Result;
use crate::models::{AccountInfo, Article, ArticleListEntry, Comment};
use std::sync::Mutex;

/// Keeps every record in memory. Used for dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    accounts: Mutex<Vec<AccountInfo>>,
    articles: Mutex<Vec<Article>>,
    entries: Mutex<Vec<ArticleListEntry>>,
    comments: Mutex<Vec<Comment>>,
}

impl MemoryStorage {
    pub fn accounts(&self) -> Vec<AccountInfo> {
        self.accounts.lock().unwrap().clone()
    }

    pub fn articles(&self) -> Vec<Article> {
        self.articles.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<ArticleListEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.comments.lock().unwrap().clone()
    }
}

impl Storage for MemoryStorage {
    async fn store_account_info(&self, account: &AccountInfo) -> Result<()> {
        self.accounts.lock().unwrap().push(account.clone());
        Ok(())
    }

    async fn store_article(&self, article: &Article) -> Result<()> {
        self.articles.lock().unwrap().push(article.clone());
        Ok(())
    }

    async fn store_article_entry(&self, entry: &ArticleListEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn store_comments(&self, comments: &[Comment]) -> Result<()> {
        self.comments.lock().unwrap().extend_from_slice(comments);
        Ok(())
    }
}
