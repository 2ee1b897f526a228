//! Self-address discovery.
//!
//! The original reads `AWS_MD_URL` with a blocking `urllib.request`; the
//! Rust port keeps that shape with `ureq` — already a teacher dependency in
//! `kimberlite-chaos`, picked there for the same reason: a sync HTTP client
//! with no tokio footprint, run inside `spawn_blocking` from async callers.

use async_trait::async_trait;

use crate::error::CoordinatorError;

const AWS_PUBLIC_IPV4_URL: &str = "http://169.254.169.254/latest/meta-data/public-ipv4";

#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn discover(&self) -> Result<String, CoordinatorError>;
}

/// Fetches this node's address from an instance-metadata endpoint.
pub struct MetadataAddressSource {
    url: String,
}

impl MetadataAddressSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The endpoint `original_source` uses.
    pub fn aws_default() -> Self {
        Self::new(AWS_PUBLIC_IPV4_URL)
    }
}

#[async_trait]
impl AddressSource for MetadataAddressSource {
    async fn discover(&self) -> Result<String, CoordinatorError> {
        let url = self.url.clone();
        tokio::task::spawn_blocking(move || {
            ureq::get(&url)
                .call()
                .map_err(|e| CoordinatorError::Fatal(format!("metadata request failed: {e}")))?
                .into_string()
                .map_err(|e| CoordinatorError::Fatal(format!("metadata response not utf8: {e}")))
        })
        .await
        .map_err(|e| CoordinatorError::Fatal(format!("metadata task panicked: {e}")))?
    }
}

/// A fixed address, for tests and deployments that are not cloud-hosted.
pub struct StaticAddressSource(pub String);

impl StaticAddressSource {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }
}

#[async_trait]
impl AddressSource for StaticAddressSource {
    async fn discover(&self) -> Result<String, CoordinatorError> {
        Ok(self.0.clone())
    }
}
