use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CollectorError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("{url} returned an empty document")]
    EmptyResponse { url: String },

    #[error("{url} reports more records than one page holds (nextRecordPosition={next})")]
    #[diagnostic(help("narrow the query range; pages beyond the first are never fetched"))]
    PaginationOverflow { url: String, next: String },

    #[error("cached document at {path} is corrupt: {message}")]
    #[diagnostic(help("delete the cache file to fetch it again"))]
    CorruptCache { path: Utf8PathBuf, message: String },

    #[error("checkpoint file {path} holds an invalid date: {value:?}")]
    #[diagnostic(help("fix or delete the checkpoint file, or pass --start-date"))]
    CorruptCheckpoint { path: Utf8PathBuf, value: String },

    #[error("unexpected response shape from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("invalid issue id: {0:?}")]
    InvalidIssueId(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
