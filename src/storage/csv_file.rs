//! CSV tables for spreadsheet use.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet software picks the
//! right encoding. The BOM and the header row are written only when a file
//! is created; later writes append rows. The header comes from the keys of
//! the first record written. Records whose keys differ from an existing
//! header are still appended, with a warning.
//!
//! Cells: strings as-is, `null` as an empty cell, numbers and booleans in
//! their JSON spelling, nested values as compact JSON.

use super::{Storage, Table, append_to_file};
use crate::error::Result;
use crate::models::{AccountInfo, Article, ArticleListEntry, Comment};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct CsvStorage {
    base_dir: PathBuf,
}

impl CsvStorage {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.base_dir.join(format!("{}.csv", table.stem()))
    }

    /// Append `records` to `table`, writing BOM and header first when the
    /// file is new.
    ///
    /// Returns how many records had keys that differ from the table header.
    /// Those rows are still written, but their cells no longer line up with
    /// the columns.
    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    async fn append<T: Serialize>(&self, table: Table, records: &[T]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let objects = records
            .iter()
            .map(as_object)
            .collect::<Result<Vec<_>>>()?;
        let path = self.path(table);
        let existing = read_header(&path).await?;
        let is_new_file = existing.is_none();
        let header = existing.unwrap_or_else(|| objects[0].keys().cloned().collect());

        let mut buf = Vec::new();
        if is_new_file {
            buf.extend_from_slice(UTF8_BOM);
        }
        let mut misaligned = 0;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut buf);
            if is_new_file {
                writer.write_record(&header)?;
            }
            for (index, object) in objects.iter().enumerate() {
                if !matches_header(&header, object) {
                    warn!(
                        path = %path.display(),
                        index,
                        keys = ?object.keys().collect::<Vec<_>>(),
                        "Record keys differ from the table header; columns will not line up"
                    );
                    misaligned += 1;
                }
                writer.write_record(object.values().map(cell))?;
            }
            writer.flush()?;
        }

        append_to_file(&path, &buf).await?;
        debug!(path = %path.display(), misaligned, "Appended CSV rows");
        Ok(misaligned)
    }
}

impl Storage for CsvStorage {
    async fn store_account_info(&self, account: &AccountInfo) -> Result<()> {
        self.append(Table::Accounts, std::slice::from_ref(account)).await?;
        Ok(())
    }

    async fn store_article(&self, article: &Article) -> Result<()> {
        self.append(Table::Articles, std::slice::from_ref(article)).await?;
        Ok(())
    }

    async fn store_article_entry(&self, entry: &ArticleListEntry) -> Result<()> {
        self.append(Table::ArticleList, std::slice::from_ref(entry)).await?;
        Ok(())
    }

    async fn store_comments(&self, comments: &[Comment]) -> Result<()> {
        self.append(Table::Comments, comments).await?;
        Ok(())
    }
}

fn as_object<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// Header row of an existing table, or `None` if the file does not exist.
async fn read_header(path: &Path) -> Result<Option<Vec<String>>> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).await?;
    let line = line.trim_start_matches('\u{feff}');
    let header = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .transpose()?
        .map(|record| record.iter().map(str::to_string).collect())
        .unwrap_or_default();
    Ok(Some(header))
}

fn matches_header(header: &[String], object: &Map<String, Value>) -> bool {
    header.len() == object.len() && header.iter().zip(object.keys()).all(|(h, k)| h == k)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article(title: &str) -> Article {
        Article {
            title: Some(title.to_string()),
            is_original: true,
            author: Some("author".to_string()),
            pub_date: Some("2025-01-02".to_string()),
            article_id: Some("42".to_string()),
            address: None,
            keyword: Some("a,b".to_string()),
            avatar: None,
            cover_url: None,
            content_text: "line one\nline \"two\"".to_string(),
        }
    }

    fn comment(id: i64) -> Comment {
        serde_json::from_value(json!({
            "cmtId": id, "parentId": 0, "username": "a", "likeCount": 3,
            "userUuid": "u1", "portraitUrl": "p", "cmtContent": "hi, there",
            "articleId": "art1", "createTime": "t", "ipLocation": null,
            "rootCmtId": id, "subCmtCount": 0
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn header_and_bom_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CsvStorage::new(tmp.path());

        storage.store_article(&article("first")).await.unwrap();
        storage.store_article(&article("second")).await.unwrap();

        let bytes = std::fs::read(storage.path(Table::Articles)).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(!text.contains('\u{feff}'));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            [
                "title", "is_original", "author", "pub_date", "article_id", "address",
                "keyword", "avatar", "cover_url", "content_text"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "first");
        assert_eq!(&rows[1][0], "second");
        assert_eq!(&rows[0][1], "true");
        assert_eq!(&rows[0][5], "");
        assert_eq!(&rows[0][9], "line one\nline \"two\"");
    }

    #[tokio::test]
    async fn comments_append_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CsvStorage::new(tmp.path());

        storage.store_comments(&[comment(1), comment(2)]).await.unwrap();
        storage.store_comments(&[comment(3)]).await.unwrap();

        let bytes = std::fs::read(storage.path(Table::Comments)).unwrap();
        let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        assert_eq!(&reader.headers().unwrap()[0], "cmtId");
        let ids: Vec<String> = reader.records().map(|r| r.unwrap()[0].to_string()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn account_columns_follow_upstream_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CsvStorage::new(tmp.path());
        let account: AccountInfo = serde_json::from_str(
            r#"{"columnId": 7, "columnName": "中山大学", "tags": ["a", "b"]}"#,
        )
        .unwrap();

        storage.store_account_info(&account).await.unwrap();

        let bytes = std::fs::read(storage.path(Table::Accounts)).unwrap();
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("columnId,columnName,tags"));
        assert_eq!(lines.next(), Some(r#"7,中山大学,"[""a"",""b""]""#));
    }

    #[tokio::test]
    async fn account_with_other_keys_is_flagged_but_appended() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CsvStorage::new(tmp.path());
        let first: AccountInfo =
            serde_json::from_str(r#"{"columnId": 7, "columnName": "A"}"#).unwrap();
        let same: AccountInfo =
            serde_json::from_str(r#"{"columnId": 8, "columnName": "B"}"#).unwrap();
        let other: AccountInfo =
            serde_json::from_str(r#"{"columnName": "C", "columnId": 9, "extra": 1}"#).unwrap();

        assert_eq!(storage.append(Table::Accounts, &[first]).await.unwrap(), 0);
        assert_eq!(storage.append(Table::Accounts, &[same]).await.unwrap(), 0);
        assert_eq!(storage.append(Table::Accounts, &[other]).await.unwrap(), 1);

        let header = read_header(&storage.path(Table::Accounts)).await.unwrap();
        assert_eq!(header, Some(vec!["columnId".to_string(), "columnName".to_string()]));
        let text = std::fs::read_to_string(storage.path(Table::Accounts)).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().last(), Some("C,9,1"));
    }

    #[tokio::test]
    async fn missing_table_has_no_header() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CsvStorage::new(tmp.path());
        assert_eq!(read_header(&storage.path(Table::Comments)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_entries_keep_null_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CsvStorage::new(tmp.path());
        let entry: ArticleListEntry =
            serde_json::from_value(json!({"articleId": 1, "title": "X"})).unwrap();

        storage.store_article_entry(&entry).await.unwrap();

        let bytes = std::fs::read(storage.path(Table::ArticleList)).unwrap();
        let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        assert_eq!(reader.headers().unwrap().len(), ArticleListEntry::FIELDS.len());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "1");
        assert_eq!(&row[1], "X");
        assert_eq!(&row[2], "");
    }

    #[test]
    fn cells() {
        assert_eq!(cell(&Value::Null), "");
        assert_eq!(cell(&json!("x")), "x");
        assert_eq!(cell(&json!(1.5)), "1.5");
        assert_eq!(cell(&json!(false)), "false");
        assert_eq!(cell(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
