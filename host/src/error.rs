//! error types for the hub

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("hub rejected batch with status {0}")]
    Rejected(u16),

    #[error("ingestion queue closed")]
    QueueClosed,
}

pub type HubResult<T> = Result<T, HubError>;
