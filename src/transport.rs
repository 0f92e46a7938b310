//! Outbound HTTP boundary.
//!
//! Every call takes an explicit [`CancellationToken`]; the transport must stop
//! the underlying request once the token fires. Callers still decide whether a
//! late completion is acted upon.

use crate::error::TransportError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Raw response: status plus an opaque body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError>;

    async fn get(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError>;
}

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        req: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let fut = async {
            let resp = req.send().await.map_err(network_error)?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await.map_err(network_error)?;
            Ok::<_, TransportError>(HttpResponse { status, body })
        };
        // Dropping the request future aborts the connection.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Aborted),
            res = fut => res,
        }
    }
}

fn network_error(e: reqwest::Error) -> TransportError {
    TransportError::Network(format!("{e:#}"))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        self.execute(self.http.post(url).json(body), cancel).await
    }

    async fn get(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        self.execute(self.http.get(url), cancel).await
    }
}
