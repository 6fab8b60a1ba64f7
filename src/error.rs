// ── Error type ───────────────────────────────────────────────────────────────

/// Failures the scraping core surfaces upward.
///
/// Missing fields and failed enrichment never show up here: those are absorbed
/// into defaults and degraded stubs. Only identifier lookups that exhaust every
/// URL pattern produce `NotFound`.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Article with ID {id} not found")]
    NotFound { id: String },
    #[error("{0}")]
    InvalidInput(String),
    #[error("Request timeout")]
    Timeout,
    #[error("{0}")]
    Client(String),
}

impl ScrapeError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ScrapeError::InvalidInput(msg.into())
    }
}
