#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{network} request failed: {source}")]
    Network {
        network: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{network} returned status {status}")]
    Http { network: String, status: u16 },

    #[error("{network} returned non-JSON ({status}): {snippet}")]
    NonJson {
        network: String,
        status: u16,
        snippet: String,
    },

    #[error("{network} credentials unavailable")]
    MissingCredentials { network: String },

    #[error("{network} timed out after {seconds}s")]
    Timeout { network: String, seconds: u64 },
}
