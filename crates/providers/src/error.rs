//! Provider error types.

use domain::Provider;
use thiserror::Error;

/// Errors raised while talking to an external vendor.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The vendor answered with a non-2xx status.
    #[error("{provider} API returned {status}: {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// The request never completed (DNS, TLS, timeout).
    #[error("transport failure talking to {provider}: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    /// No credential could be resolved for the provider/store pair.
    #[error("no credential configured for {0}")]
    MissingCredential(Provider),

    /// The vendor answered 2xx but the body was not in the expected shape.
    #[error("unexpected {provider} response: {message}")]
    UnexpectedResponse {
        provider: Provider,
        message: String,
    },
}
