//! Error taxonomy for a scrape run.
//!
//! Only [`ScrapeError::SessionCreation`] is fatal for a source run. Navigation
//! and extraction failures are recovered from by the pagination loop, and
//! teardown failures never reach this type at all: the session manager logs
//! and swallows them.

/// All errors that can surface from the scraping engine.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// The browser could not be launched. Ends the current source's run.
    #[error("failed to create browser session: {0}")]
    SessionCreation(String),

    /// A page load failed after every retry.
    #[error("navigation to {url} failed after {attempts} attempt(s)")]
    Navigation { url: String, attempts: u32 },

    /// The results list is missing from a listing page.
    #[error("results container not found on page {page}")]
    ContainerNotFound { page: u32 },

    /// A detail page is missing a required element or field.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The browser engine failed while a live handle was in use.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScrapeError {
    /// Whether this error ends the current source's run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::SessionCreation(_))
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_session_creation_is_fatal() {
        assert!(ScrapeError::SessionCreation("no chromium".into()).is_fatal());
        assert!(!ScrapeError::Navigation {
            url: "https://example.com".into(),
            attempts: 3
        }
        .is_fatal());
        assert!(!ScrapeError::ContainerNotFound { page: 1 }.is_fatal());
        assert!(!ScrapeError::Extraction("missing description".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = ScrapeError::Navigation {
            url: "https://example.com/jobs".into(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "navigation to https://example.com/jobs failed after 3 attempt(s)"
        );
        assert_eq!(
            ScrapeError::ContainerNotFound { page: 2 }.to_string(),
            "results container not found on page 2"
        );
    }
}
