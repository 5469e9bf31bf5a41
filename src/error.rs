// Error kinds for the data path
use thiserror::Error;

/// Failure of a data fetch or reload. `Unavailable` is not a failure in
/// the UI sense: it renders a "no data" affordance, not an error state.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backend credentials missing")]
    ConfigurationMissing,

    #[error("request for {resource} timed out")]
    Timeout { resource: &'static str },

    #[error("network failure fetching {resource}: {source}")]
    Network {
        resource: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed {resource} payload: {detail}")]
    Validation {
        resource: &'static str,
        detail: String,
    },

    #[error("no data available for the requested window")]
    Unavailable,
}

impl FetchError {
    pub fn network(resource: &'static str, source: impl Into<anyhow::Error>) -> Self {
        FetchError::Network {
            resource,
            source: source.into(),
        }
    }

    pub fn validation(resource: &'static str, detail: impl Into<String>) -> Self {
        FetchError::Validation {
            resource,
            detail: detail.into(),
        }
    }
}
