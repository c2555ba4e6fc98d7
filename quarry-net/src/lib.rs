pub mod adapter;
pub mod adapters;
pub mod credentials;
pub mod envelope;
pub mod error;

pub use adapter::{FetchContext, FetchOrchestrator, NetworkAdapter};
pub use adapters::build_adapters;
pub use credentials::{CredentialProvider, TokenFetcher};
pub use envelope::extract_records;
pub use error::AdapterError;
