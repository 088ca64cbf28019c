// src/handlers/error.rs
use std::fmt;

use crate::error::FetchError;

/// Failure of a user-triggered action, worded for display.
#[derive(Debug, Clone)]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        ActionError {
            message: message.into(),
        }
    }
}

impl From<FetchError> for ActionError {
    fn from(err: FetchError) -> Self {
        ActionError::new(format!("Fetch failed: {}", err))
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActionError {}

/// Confirmation shown after a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(pub String);

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
