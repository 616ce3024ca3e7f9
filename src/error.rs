//! Error type shared by every stage of the harvest.
//!
//! Pagination never surfaces these directly (it folds them into a
//! [`StopReason`](crate::pagination::StopReason)); article extraction and
//! storage do.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Network failure, timeout, or a client that could not be built.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A DOM anchor the article page must carry was not found.
    #[error("article page is missing required element `{anchor}`")]
    MissingElement { anchor: &'static str },

    /// The article page parsed but its title resolved to blank text.
    #[error("article title is empty")]
    EmptyTitle,

    #[error("no account named `{0}`")]
    AccountNotFound(String),

    /// The platform answered but reported a failure (`success=false`, bad `code`).
    #[error("upstream error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, Error>;
