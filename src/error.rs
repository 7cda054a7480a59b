use thiserror::Error;

/// Failures the enrichment pipeline surfaces to the caller.
///
/// Only the primary page fetch and a malformed input URL are fatal; favicon
/// and color failures degrade to a null color and never show up here.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("page fetch returned status {0}")]
    Status(u16),
    #[error("page fetch failed: {0}")]
    Transport(String),
}

/// Failures from the folder-suggestion advisor.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisor is not configured, set GEMINI_API_KEY")]
    NotConfigured,
    #[error("advisor request failed: {0}")]
    Unavailable(String),
    #[error("advisor returned an unexpected response shape")]
    MalformedResponse,
}
