use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::traits::{RangeBody, RemoteMetadata, RemoteSource};
use crate::error::{FetchError, Result};

pub struct HttpSource {
    client: Client,
    url: String,
    headers: HashMap<String, String>,
}

impl HttpSource {
    pub fn new(url: String, headers: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            url,
            headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build a request with the configured custom headers applied.
    fn apply_headers(&self, mut req: RequestBuilder) -> RequestBuilder {
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        req
    }

    fn resolution_error(&self, reason: impl Into<String>) -> FetchError {
        FetchError::Resolution {
            url: self.url.clone(),
            reason: reason.into(),
        }
    }
}

/// Parse an IMF-fixdate `Last-Modified` value, e.g.
/// `Mon, 10 Mar 2025 12:00:00 GMT`.
fn parse_last_modified(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value).ok().map(SystemTime::from)
}

struct HttpRangeBody {
    response: reqwest::Response,
}

#[async_trait]
impl RangeBody for HttpRangeBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response
            .chunk()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn probe(&self) -> Result<RemoteMetadata> {
        let resp = self
            .apply_headers(self.client.head(&self.url))
            .send()
            .await
            .map_err(|e| self.resolution_error(format!("request failed: {e}")))?;

        let status = resp.status();
        debug!("probe status={} url={}", status.as_u16(), self.url);
        if !status.is_success() {
            return Err(self.resolution_error(format!("HTTP {}", status.as_u16())));
        }

        let size_bytes = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| self.resolution_error("missing or malformed Content-Length"))?;

        // A missing Last-Modified is a valid (if unfortunate) server
        // response; an unparsable one degrades the same way.
        let last_modified = match resp
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
        {
            Some(raw) => {
                let parsed = parse_last_modified(raw);
                if parsed.is_none() {
                    warn!("unparsable Last-Modified {:?} from {}", raw, self.url);
                }
                parsed
            }
            None => None,
        };

        Ok(RemoteMetadata {
            size_bytes,
            last_modified,
        })
    }

    async fn open_range(
        &self,
        start: u64,
        end_inclusive: u64,
        header_timeout: Duration,
    ) -> Result<Box<dyn RangeBody>> {
        let range = format!("bytes={}-{}", start, end_inclusive);
        let request = self
            .apply_headers(self.client.get(&self.url))
            .header(header::RANGE, range.as_str());

        let resp = tokio::time::timeout(header_timeout, request.send())
            .await
            .map_err(|_| FetchError::HeaderTimeout(header_timeout))?
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(
                "range fetch failed status={} range={} url={}",
                status.as_u16(),
                range,
                self.url
            );
            return Err(FetchError::Transport(format!(
                "HTTP {} for range {}",
                status.as_u16(),
                range
            )));
        }

        // Appending a full-body response at a nonzero offset would corrupt
        // the file; require 206 whenever we asked to continue mid-resource.
        if start > 0 && status != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::Transport(format!(
                "server ignored range request (HTTP {})",
                status.as_u16()
            )));
        }

        debug!("range open status={} range={}", status.as_u16(), range);
        Ok(Box::new(HttpRangeBody { response: resp }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_last_modified_imf_fixdate() {
        let parsed = parse_last_modified("Mon, 10 Mar 2025 12:00:00 GMT");
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_last_modified_garbage() {
        assert!(parse_last_modified("not a date").is_none());
        assert!(parse_last_modified("").is_none());
    }
}
