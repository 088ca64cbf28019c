// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{}", all_sources_message(.last))]
    AllSourcesFailed { last: Option<Box<FetchError>> },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("insufficient data: {found} usable rows")]
    InsufficientData { found: usize },

    #[error("no monthly returns produced")]
    EmptyResult,
}

fn all_sources_message(last: &Option<Box<FetchError>>) -> String {
    match last {
        Some(err) => format!("all sources failed: {}", err),
        None => "all sources failed: no source returned usable data".to_string(),
    }
}

impl FetchError {
    pub fn parse(reason: impl Into<String>) -> Self {
        FetchError::Parse(reason.into())
    }

    pub fn transport(url: &str, reason: impl Into<String>) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
