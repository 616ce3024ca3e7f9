//! JSON Lines tables: one compact JSON object per line.

use super::{Storage, Table, append_to_file};
use crate::error::Result;
use crate::models::{AccountInfo, Article, ArticleListEntry, Comment};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct JsonlStorage {
    base_dir: PathBuf,
}

impl JsonlStorage {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.base_dir.join(format!("{}.jsonl", table.stem()))
    }

    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    async fn append<T: Serialize>(&self, table: Table, records: &[T]) -> Result<()> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        let path = self.path(table);
        append_to_file(&path, &buf).await?;
        debug!(path = %path.display(), "Appended JSON lines");
        Ok(())
    }
}

impl Storage for JsonlStorage {
    async fn store_account_info(&self, account: &AccountInfo) -> Result<()> {
        self.append(Table::Accounts, std::slice::from_ref(account)).await
    }

    async fn store_article(&self, article: &Article) -> Result<()> {
        self.append(Table::Articles, std::slice::from_ref(article)).await
    }

    async fn store_article_entry(&self, entry: &ArticleListEntry) -> Result<()> {
        self.append(Table::ArticleList, std::slice::from_ref(entry)).await
    }

    async fn store_comments(&self, comments: &[Comment]) -> Result<()> {
        self.append(Table::Comments, comments).await
    }
}
