//! LLM provider abstraction
//!
//! The conversation service only sees [`LlmService`]; Gemini is the one
//! concrete provider.

mod error;
mod gemini;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::{GeminiService, DEFAULT_GEMINI_MODEL};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    has_text = response.text.is_some(),
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedService(Result<LlmResponse, LlmErrorKind>);

    #[async_trait]
    impl LlmService for FixedService {
        async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            match &self.0 {
                Ok(response) => Ok(response.clone()),
                Err(kind) => Err(LlmError::new(*kind, "boom")),
            }
        }

        fn model_id(&self) -> &str {
            "fixed-model"
        }
    }

    #[tokio::test]
    async fn test_logging_service_passes_results_through() {
        let ok = LoggingService::new(Arc::new(FixedService(Ok(LlmResponse::with_text("hi")))));
        assert_eq!(ok.model_id(), "fixed-model");
        let response = ok.complete(&LlmRequest::default()).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("hi"));

        let failing = LoggingService::new(Arc::new(FixedService(Err(LlmErrorKind::Network))));
        let err = failing.complete(&LlmRequest::default()).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Network);
        assert_eq!(err.message, "boom");
    }
}
