use crate::gateway::GatewayError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors reported by feed operations.
///
/// A category that does not exist is not an error: it is the
/// [`FetchOutcome::NotFound`](super::FetchOutcome::NotFound) outcome. An empty
/// page is likewise a normal, terminal result.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network failure, timeout, non-success status or an undecodable response.
    #[error(transparent)]
    Transport(#[from] GatewayError),
    /// `apply_filters` was called on a category or subcategory feed.
    #[error("Filters can only be applied to the archive feed")]
    FiltersUnsupported,
    /// A slug or id could not be substituted into an endpoint path.
    #[error("Invalid path segment: {0:?}")]
    InvalidSegment(String),
    /// The archive filter's end date precedes its start date.
    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Transport(GatewayError::Json(err))
    }
}

impl FeedError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FeedError::Transport(_))
    }
}
