use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported mode: {0} (use quote or code)")]
    UnsupportedMode(String),

    #[error("word count must be positive")]
    InvalidWordCount,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("prompt contains unsupported character {0:?} (printable ASCII only)")]
    NonAsciiPrompt(char),

    /// The key reader failed for a reason other than a clean shutdown.
    #[error("input error: {0}")]
    Input(#[source] io::Error),

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("history: {0}")]
    History(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors caused by bad arguments rather than by the environment.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMode(_)
                | Error::InvalidWordCount
                | Error::EmptyPrompt
                | Error::NonAsciiPrompt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_are_classified() {
        assert!(Error::UnsupportedMode("poem".into()).is_usage());
        assert!(Error::InvalidWordCount.is_usage());
        assert!(Error::NonAsciiPrompt('é').is_usage());
        assert!(!Error::Input(io::Error::other("boom")).is_usage());
        assert!(!Error::History("disk full".into()).is_usage());
    }

    #[test]
    fn input_error_message_is_prefixed() {
        let err = Error::Input(io::Error::other("device gone"));
        assert_eq!(err.to_string(), "input error: device gone");
    }
}
