//! Article page extraction.
//!
//! An article page carries its data twice: in visible DOM nodes and in an
//! HTML comment containing `enpproperty`, which wraps a small markup fragment
//! (`<articleid>`, `<title>`, `<keyword>`, `<picurl>`, ...). The comment block
//! is authoritative for the fields it defines.
//!
//! # Fetching
//!
//! A page is usable only with HTTP 200. Anything else is retried on a fixed
//! schedule (5 retries, 30 s apart by default); after that the article is
//! skipped by returning `None`.
//!
//! # Parsing
//!
//! [`parse_article_html`] is a pure function of the page bytes. Six DOM anchors
//! are required (`#articleTitle`, `meta[name=author]`, `meta[name=Copyright]`,
//! `img.colimg`, `div.nfhtime.pubtime`, `meta[name=location]`); a missing anchor
//! fails the whole article instead of yielding a partial record.
//!
//! The title must not be blank. A blank metadata `<title>` defers to the DOM
//! title; a block with no `<title>` at all leaves the article untitled.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{FORM_CONTENT_TYPE, Fetch, FetchRequest, FetchResponse, random_user_agent};
use crate::models::Article;
use crate::utils::{decode_utf8_ignoring_invalid, truncate_for_log};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Marker identifying the metadata comment.
const METADATA_MARKER: &str = "enpproperty";

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("#articleTitle").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"meta[name="author"]"#).unwrap());
static COPYRIGHT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="Copyright"]"#).unwrap());
static AVATAR: Lazy<Selector> = Lazy::new(|| Selector::parse("img.colimg").unwrap());
static PUB_TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("div.nfhtime.pubtime").unwrap());
static LOCATION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="location"]"#).unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse(".article").unwrap());

static META_ARTICLE_ID: Lazy<Selector> = Lazy::new(|| Selector::parse("articleid").unwrap());
static META_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_KEYWORD: Lazy<Selector> = Lazy::new(|| Selector::parse("keyword").unwrap());
static META_PIC_URL: Lazy<Selector> = Lazy::new(|| Selector::parse("picurl").unwrap());

/// Fields recovered from the `enpproperty` comment. Absent elements are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub article_id: Option<String>,
    pub title: Option<String>,
    pub keyword: Option<String>,
    pub cover_url: Option<String>,
}

/// Fetch and parse one article page.
///
/// # Arguments
///
/// * `fetcher` - Transport for the page requests
/// * `config` - Supplies the retry budget and User-Agent pool
/// * `url` - Absolute URL of the article page
///
/// # Returns
///
/// `Ok(None)` when the page never came back with HTTP 200 and the article
/// should be skipped. `Err` when `url` is not a URL, or the page arrived but
/// lacks a required anchor or a title.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn fetch_article<F: Fetch>(
    fetcher: &F,
    config: &Config,
    url: &str,
) -> Result<Option<Article>> {
    Url::parse(url)?;

    let Some(response) = fetch_article_page(fetcher, config, url).await else {
        warn!("Article page unavailable after retries; skipping");
        return Ok(None);
    };

    let article = parse_article_html(&response.body)?;
    info!(
        title = ?article.title,
        article_id = ?article.article_id,
        content = %truncate_for_log(&article.content_text, 20),
        "Parsed article page"
    );
    Ok(Some(article))
}

/// GET the page until it answers 200, within the configured retry budget.
pub async fn fetch_article_page<F: Fetch>(
    fetcher: &F,
    config: &Config,
    url: &str,
) -> Option<FetchResponse> {
    config
        .page_backoff()
        .run(
            |attempt| {
                let request = page_request(config, url, attempt);
                async move { fetcher.get(&request).await }
            },
            is_good_response,
        )
        .await
}

/// Request for the given attempt (0 is the first).
///
/// REVIEW: only the first request disables redirects; retries follow them.
/// The platform crawler has always behaved this way and it is unclear whether
/// that is intended, so it is kept as is.
fn page_request(config: &Config, url: &str, attempt: usize) -> FetchRequest {
    FetchRequest::get(url)
        .header("User-Agent", random_user_agent(&config.user_agents))
        .header("Content-Type", FORM_CONTENT_TYPE)
        .follow_redirects(attempt > 0)
}

fn is_good_response(response: &FetchResponse) -> bool {
    response.status == 200
}

/// Parse an article page.
pub fn parse_article_html(bytes: &[u8]) -> Result<Article> {
    let html = decode_utf8_ignoring_invalid(bytes);
    let document = Html::parse_document(&html);

    let dom_title = required(&document, &TITLE, "articleTitle")?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    let author = required_attr(&document, &AUTHOR, "author", "content")?;
    let copyright = required_attr(&document, &COPYRIGHT, "Copyright", "content")?;
    let avatar = required_attr(&document, &AVATAR, "colimg", "src")?;
    let pub_date = required_attr(&document, &PUB_TIME, "pubtime", "data-time")?;
    let address = required_attr(&document, &LOCATION, "location", "content")?;

    let mut article = Article {
        title: Some(dom_title),
        is_original: copyright.as_deref() != Some("0"),
        author,
        pub_date,
        article_id: None,
        address,
        keyword: None,
        avatar,
        cover_url: None,
        content_text: String::new(),
    };

    if let Some(meta) = embedded_metadata(&document) {
        debug!(?meta, "Found embedded metadata block");
        article.title = resolve_title(meta.title, article.title.take());
        article.article_id = meta.article_id;
        article.keyword = meta.keyword;
        article.cover_url = meta.cover_url;
    }
    if article.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(Error::EmptyTitle);
    }

    if let Some(body) = document.select(&BODY).next() {
        article.content_text = body.text().collect();
    }

    Ok(article)
}

/// Title when a metadata block is present.
///
/// A non-blank metadata title wins. A blank one falls back to the DOM title.
/// A block without a `<title>` element yields no title at all, even when the
/// DOM has one.
fn resolve_title(meta: Option<String>, dom: Option<String>) -> Option<String> {
    match meta {
        Some(title) if !title.trim().is_empty() => Some(title),
        Some(_) => dom,
        None => None,
    }
}

/// Parse the first HTML comment containing `enpproperty`, if any.
pub fn embedded_metadata(document: &Html) -> Option<EmbeddedMetadata> {
    let block = document
        .tree
        .root()
        .descendants()
        .filter_map(|node| node.value().as_comment())
        .map(|comment| &**comment)
        .find(|text| text.contains(METADATA_MARKER))?;

    let fragment = Html::parse_document(block);
    Some(EmbeddedMetadata {
        article_id: first_text(&fragment, &META_ARTICLE_ID),
        title: first_text(&fragment, &META_TITLE),
        keyword: first_text(&fragment, &META_KEYWORD),
        cover_url: first_text(&fragment, &META_PIC_URL),
    })
}

fn required<'a>(
    document: &'a Html,
    selector: &Selector,
    anchor: &'static str,
) -> Result<ElementRef<'a>> {
    document
        .select(selector)
        .next()
        .ok_or(Error::MissingElement { anchor })
}

/// The attribute of a required element. The element must exist; the
/// attribute may not.
fn required_attr(
    document: &Html,
    selector: &Selector,
    anchor: &'static str,
    attr: &str,
) -> Result<Option<String>> {
    Ok(required(document, selector, anchor)?
        .value()
        .attr(attr)
        .map(str::to_string))
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect())
}
