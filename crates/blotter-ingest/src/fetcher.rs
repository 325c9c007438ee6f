//! Record fetcher for the incident API
//!
//! One GET, one bounded attempt. Any failure means "nothing to load" for
//! this run; [`RecordFetcher::fetch`] reports it as an empty batch and logs
//! the cause.

use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::record::RawRecord;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("blotter-ingest/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the incident feed
pub struct RecordFetcher {
    client: Client,
    url: String,
}

impl RecordFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Fetch the current batch, or nothing if the attempt failed
    pub async fn fetch(&self) -> Vec<RawRecord> {
        match self.try_fetch().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Fetch failed; nothing will be loaded this run");
                Vec::new()
            },
        }
    }

    /// Fetch the current batch, keeping the failure cause
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn try_fetch(&self) -> std::result::Result<Vec<RawRecord>, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: self.url.clone(),
            source,
        };

        let response = self.client.get(&self.url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let records: Vec<RawRecord> =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                url: self.url.clone(),
                source,
            })?;

        info!(count = records.len(), "Fetched events from API");
        Ok(records)
    }
}
