//! Analysis request lifecycle controller.
//!
//! Owns the single in-flight attempt: supersedes it on a new submission, races
//! it against a timeout, and classifies how it ended.

use crate::error::RequestError;
use crate::model::{AnalysisReport, AnalysisRequest, ErrorBody, HealthStatus};
use crate::transport::{HttpResponse, Transport};
use crate::validate::ValidReference;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const ANALYZE_PATH: &str = "/analyze";
pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The one attempt allowed to be in flight.
struct InFlightAttempt {
    id: u64,
    cancel: CancellationToken,
    started_at: Instant,
}

/// How the race inside `submit` was decided.
enum Race {
    Done(Result<HttpResponse, crate::error::TransportError>),
    Cancelled,
    TimedOut,
}

pub struct RequestController<T: Transport + ?Sized> {
    transport: Arc<T>,
    timeout: Duration,
    attempt: Mutex<Option<InFlightAttempt>>,
    next_id: AtomicU64,
}

impl<T: Transport + ?Sized> RequestController<T> {
    pub fn new(transport: Arc<T>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            attempt: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlightAttempt>> {
        // The slot holds no invariants a panicking holder could break.
        self.attempt.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Cancel the in-flight attempt, if any. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        match self.slot().as_ref() {
            Some(a) => {
                tracing::info!(attempt = a.id, "cancelling analysis");
                a.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Start a new attempt, superseding any pending one.
    fn begin(&self) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let mut slot = self.slot();
        if let Some(prev) = slot.take() {
            tracing::debug!(superseded = prev.id, by = id, "superseding pending attempt");
            prev.cancel.cancel();
        }
        *slot = Some(InFlightAttempt {
            id,
            cancel: cancel.clone(),
            started_at: Instant::now(),
        });
        (id, cancel)
    }

    /// Clear the slot if `id` still owns it. Returns whether it did.
    fn finish(&self, id: u64) -> bool {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(a) if a.id == id => {
                tracing::debug!(
                    attempt = id,
                    elapsed_ms = a.started_at.elapsed().as_millis() as u64,
                    "attempt finished"
                );
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub async fn submit(&self, reference: ValidReference) -> Result<AnalysisReport, RequestError> {
        let (id, cancel) = self.begin();
        tracing::info!(
            attempt = id,
            owner = reference.owner(),
            repo = reference.name(),
            "submitting analysis"
        );

        let body = serde_json::to_value(AnalysisRequest {
            repo_url: reference.as_str().to_string(),
        })
        .map_err(|e| RequestError::InvalidResponse(e.to_string()))?;

        let race = tokio::select! {
            // Cancellation wins ties so a superseded attempt never commits.
            biased;
            _ = cancel.cancelled() => Race::Cancelled,
            res = self.transport.post_json(ANALYZE_PATH, &body, &cancel) => Race::Done(res),
            _ = tokio::time::sleep(self.timeout) => Race::TimedOut,
        };

        let current = self.finish(id);
        let outcome = match race {
            Race::TimedOut => {
                cancel.cancel();
                tracing::warn!(attempt = id, timeout = ?self.timeout, "analysis timed out");
                Err(RequestError::Timeout)
            }
            Race::Cancelled => Err(RequestError::Cancelled),
            Race::Done(_) if !current || cancel.is_cancelled() => {
                tracing::debug!(attempt = id, "discarding result of stale attempt");
                Err(RequestError::Cancelled)
            }
            Race::Done(Err(e)) => Err(e.into()),
            Race::Done(Ok(resp)) => parse_report(resp),
        };

        if let Err(e) = &outcome {
            tracing::debug!(attempt = id, error = %e, "attempt failed");
        }
        outcome
    }

    /// Probe the service health endpoint. Not tracked as an attempt.
    pub async fn health(&self) -> Result<HealthStatus, RequestError> {
        let cancel = CancellationToken::new();
        let resp = tokio::select! {
            res = self.transport.get(HEALTH_PATH, &cancel) => res?,
            _ = tokio::time::sleep(self.timeout) => {
                cancel.cancel();
                return Err(RequestError::Timeout);
            }
        };
        if !resp.is_success() {
            return Err(RequestError::Server(server_message(&resp)));
        }
        serde_json::from_slice(&resp.body).map_err(|e| RequestError::InvalidResponse(e.to_string()))
    }
}

fn parse_report(resp: HttpResponse) -> Result<AnalysisReport, RequestError> {
    if !resp.is_success() {
        return Err(RequestError::Server(server_message(&resp)));
    }
    serde_json::from_slice(&resp.body).map_err(|e| RequestError::InvalidResponse(e.to_string()))
}

/// Message from a structured `{error}` body, or a generic one naming the status.
pub(crate) fn server_message(resp: &HttpResponse) -> String {
    serde_json::from_slice::<ErrorBody>(&resp.body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Server error: {}", resp.status))
}
