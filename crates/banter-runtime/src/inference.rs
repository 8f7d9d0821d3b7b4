//! [`InferencePool`] – bounded access to the inference service.
//!
//! Every generation goes through a shared semaphore capping the number of
//! in-flight calls, and through a per-call timeout.  There are no retries: a
//! failure maps straight to its canned fallback reply.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::llm_driver::{InferenceRequest, InferenceService, LlmError, sanitize_reply};

pub struct InferencePool {
    service: Arc<dyn InferenceService>,
    permits: Semaphore,
    timeout: Duration,
}

impl InferencePool {
    pub fn new(service: Arc<dyn InferenceService>, max_parallel: usize, timeout: Duration) -> Self {
        Self {
            service,
            permits: Semaphore::new(max_parallel.max(1)),
            timeout,
        }
    }

    /// Generate and sanitise a reply, surfacing the failure.
    pub async fn try_generate(&self, request: &InferenceRequest) -> Result<String, LlmError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::BadResponse("inference pool closed".into()))?;

        debug!(prompt_chars = request.prompt.chars().count(), "inference request");
        match tokio::time::timeout(self.timeout, self.service.generate(request)).await {
            Ok(Ok(raw)) => Ok(sanitize_reply(&raw)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        }
    }

    /// Generate a reply, substituting the canned fallback on any failure.
    pub async fn generate_or_fallback(&self, request: &InferenceRequest) -> String {
        match self.try_generate(request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "inference failed, using fallback reply");
                e.fallback_reply().to_string()
            }
        }
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
