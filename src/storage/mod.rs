//! Persistence of harvested records.
//!
//! The storage backend is chosen once at startup ([`StorageHandle::open`]) and
//! passed by reference to the harvester. Every backend keeps four
//! append-only tables:
//!
//! ```text
//! data_dir/
//! ├── accounts.csv       # one row per account search hit
//! ├── articles.csv       # one row per parsed article page
//! ├── article_list.csv   # one row per article listing entry
//! └── comments.csv       # one row per comment
//! ```
//!
//! (`.jsonl` instead of `.csv` for the JSON Lines backend.)
//!
//! Empty inputs are accepted and ignored.

pub mod csv_file;
pub mod jsonl;
pub mod memory;

use crate::config::{Config, StorageKind};
use crate::error::Result;
use crate::models::{AccountInfo, Article, ArticleListEntry, Comment};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub use self::csv_file::CsvStorage;
pub use self::jsonl::JsonlStorage;
pub use self::memory::MemoryStorage;

/// The tables every backend maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Accounts,
    Articles,
    ArticleList,
    Comments,
}

impl Table {
    pub fn stem(self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Articles => "articles",
            Table::ArticleList => "article_list",
            Table::Comments => "comments",
        }
    }
}

/// A sink for harvested records.
pub trait Storage {
    async fn store_account_info(&self, account: &AccountInfo) -> Result<()>;

    async fn store_article(&self, article: &Article) -> Result<()>;

    async fn store_article_entry(&self, entry: &ArticleListEntry) -> Result<()>;

    /// Store one article's comments, in order.
    async fn store_comments(&self, comments: &[Comment]) -> Result<()>;
}

/// The storage backend selected by configuration.
#[derive(Debug)]
pub enum StorageHandle {
    Csv(CsvStorage),
    Jsonl(JsonlStorage),
    Memory(MemoryStorage),
}

impl StorageHandle {
    pub fn open(config: &Config) -> Self {
        match config.storage {
            StorageKind::Csv => StorageHandle::Csv(CsvStorage::new(&config.data_dir)),
            StorageKind::Jsonl => StorageHandle::Jsonl(JsonlStorage::new(&config.data_dir)),
            StorageKind::Memory => StorageHandle::Memory(MemoryStorage::default()),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            StorageHandle::Csv(_) => StorageKind::Csv,
            StorageHandle::Jsonl(_) => StorageKind::Jsonl,
            StorageHandle::Memory(_) => StorageKind::Memory,
        }
    }
}

impl Storage for StorageHandle {
    async fn store_account_info(&self, account: &AccountInfo) -> Result<()> {
        if account.is_empty() {
            debug!("store_account_info: empty account");
            return Ok(());
        }
        match self {
            StorageHandle::Csv(s) => s.store_account_info(account).await,
            StorageHandle::Jsonl(s) => s.store_account_info(account).await,
            StorageHandle::Memory(s) => s.store_account_info(account).await,
        }
    }

    async fn store_article(&self, article: &Article) -> Result<()> {
        match self {
            StorageHandle::Csv(s) => s.store_article(article).await,
            StorageHandle::Jsonl(s) => s.store_article(article).await,
            StorageHandle::Memory(s) => s.store_article(article).await,
        }
    }

    async fn store_article_entry(&self, entry: &ArticleListEntry) -> Result<()> {
        match self {
            StorageHandle::Csv(s) => s.store_article_entry(entry).await,
            StorageHandle::Jsonl(s) => s.store_article_entry(entry).await,
            StorageHandle::Memory(s) => s.store_article_entry(entry).await,
        }
    }

    async fn store_comments(&self, comments: &[Comment]) -> Result<()> {
        if comments.is_empty() {
            debug!("store_comments: no comments");
            return Ok(());
        }
        match self {
            StorageHandle::Csv(s) => s.store_comments(comments).await,
            StorageHandle::Jsonl(s) => s.store_comments(comments).await,
            StorageHandle::Memory(s) => s.store_comments(comments).await,
        }
    }
}

/// Append `bytes` to `path`, creating the file if needed.
async fn append_to_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
