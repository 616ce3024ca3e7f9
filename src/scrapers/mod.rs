//! Acquisition from the Nanfang+ platform.
//!
//! Each submodule wraps one upstream surface:
//!
//! | Surface | Module | Method | Notes |
//! |---------|--------|--------|-------|
//! | Account search | [`account`] | JSON API | Exact `columnName` match; needs device id + signature |
//! | Article listing | [`article_list`] | Paginated JSON API | Records projected to a fixed allow-list |
//! | Comment listing | [`comments`] | Paginated JSON API | 1 s politeness delay, rotating User-Agent |
//! | Article page | [`article_page`] | HTML scraping | DOM fields overlaid by the `enpproperty` metadata comment |
//!
//! # Common Patterns
//!
//! - Listing endpoints go through [`crate::pagination::fetch_all_pages`] and
//!   never fail; they report why they stopped next to what they collected.
//! - All network access goes through [`crate::http::Fetch`].
//! - Requests are strictly sequential.

pub mod account;
pub mod article_list;
pub mod article_page;
pub mod comments;
