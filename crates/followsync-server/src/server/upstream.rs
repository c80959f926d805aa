//! Paginated follow lists from the public Scratch REST API.
//!
//! `GET {base}/users/{subject}/{following|followers}?limit=N&offset=M`
//! answers with a JSON array of user objects. Only `username` is read.

use crate::server::telemetry::{
    increment_upstream_failures, increment_upstream_requests, record_page_latency,
};
use anyhow::Context;
use followsync::{Direction, RelationSource, UpstreamError};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Deserialize)]
struct ListedUser {
    username: String,
}

/// [`RelationSource`] backed by the Scratch users API.
#[derive(Clone, Debug)]
pub struct ScratchApi {
    client: Client,
    base: Url,
}

impl ScratchApi {
    /// `timeout` bounds a whole request. The resolver applies its own
    /// per-page timeout on top, so this only caps stray sockets.
    pub fn new(base: Url, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base })
    }

    fn page_url(&self, subject: &str, direction: Direction, offset: usize, limit: usize) -> Url {
        let mut url = self.base.clone();
        // `base` is validated as a base URL at config time.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["users", subject, direction.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        url
    }

    async fn request_page(&self, url: Url) -> Result<Vec<String>, UpstreamError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Request {
                context: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| UpstreamError::Request {
            context: e.to_string(),
        })?;
        decode_page(&body)
    }
}

fn decode_page(body: &[u8]) -> Result<Vec<String>, UpstreamError> {
    let users: Vec<ListedUser> =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Decode {
            context: e.to_string(),
        })?;
    Ok(users.into_iter().map(|user| user.username).collect())
}

impl RelationSource for ScratchApi {
    async fn fetch_page(
        &self,
        subject: &str,
        direction: Direction,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, UpstreamError> {
        let url = self.page_url(subject, direction, offset, limit);
        increment_upstream_requests();
        let started = Instant::now();

        let result = self.request_page(url).await;
        record_page_latency(started.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(names) => {
                tracing::debug!(subject, %direction, offset, count = names.len(), "page fetched");
            }
            Err(e) => {
                increment_upstream_failures();
                tracing::warn!(subject, %direction, offset, "page fetch failed: {e}");
            }
        }
        result
    }
}
