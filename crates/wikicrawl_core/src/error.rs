use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure classes for a single lister, fetch, or write step.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request to {url} failed")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: StatusCode },
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CrawlError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::HttpStatus { .. } => "http_status",
            Self::Decode { .. } => "decode",
            Self::Io { .. } => "io",
        }
    }
}

/// Render an error with its source chain on one line: `outer: inner: root`.
pub fn describe_error(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use reqwest::StatusCode;

    use super::{CrawlError, describe_error};

    #[test]
    fn describe_error_joins_source_chain() {
        let error = CrawlError::Io {
            path: PathBuf::from("out/Rapi.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            describe_error(&error),
            "failed to write out/Rapi.txt: permission denied"
        );
        assert_eq!(error.kind(), "io");
    }

    #[test]
    fn decode_error_includes_serde_message() {
        let source = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("must fail to parse");
        let error = CrawlError::Decode {
            url: "https://wiki.example.org/api.php".to_string(),
            source: Box::new(source),
        };
        let message = describe_error(&error);
        assert!(message.starts_with("failed to decode response from https://wiki.example.org/api.php: "));
        assert_eq!(error.kind(), "decode");
    }

    #[test]
    fn http_status_message_names_status() {
        let error = CrawlError::HttpStatus {
            url: "https://wiki.example.org/wiki/Missing".to_string(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(
            describe_error(&error),
            "https://wiki.example.org/wiki/Missing returned HTTP 404 Not Found"
        );
    }
}
