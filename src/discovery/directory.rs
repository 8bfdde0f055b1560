//! HTTP client for the public proxy directory.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::DirectoryConfig;
use crate::discovery::candidate::{filter_by_protocol, Candidate};
use crate::discovery::{CandidateSource, SourceError, SourceResult};

/// Fetches the directory listing and keeps one protocol.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    client: Client,
    url: String,
    protocol: String,
}

impl DirectorySource {
    pub fn new(config: &DirectoryConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            protocol: config.protocol.clone(),
        })
    }
}

#[async_trait]
impl CandidateSource for DirectorySource {
    async fn discover(&self) -> SourceResult<Vec<Candidate>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let listed: Vec<Candidate> = response.json().await?;
        let total = listed.len();
        let kept = filter_by_protocol(listed, &self.protocol);

        tracing::debug!(
            url = %self.url,
            total,
            kept = kept.len(),
            protocol = %self.protocol,
            "Fetched proxy directory"
        );
        Ok(kept)
    }
}
