//! Ordered-fallback dispatch over classifier backends.

use std::sync::Arc;

use crate::backend::{Classification, ClassifierBackend};
use crate::error::{ClassifierError, Result};

/// A successful chain result, annotated with which backend produced it.
#[derive(Debug, Clone)]
pub struct ChainVerdict {
    pub classification: Classification,
    /// Name of the backend that succeeded.
    pub backend: String,
    /// 1-based position of the succeeding backend; greater than 1 means a
    /// fallback was used.
    pub attempts: usize,
}

impl ChainVerdict {
    /// Whether a backend other than the primary produced this result.
    pub fn used_fallback(&self) -> bool {
        self.attempts > 1
    }
}

/// Tries backends in declared order and returns the first success.
///
/// Each backend failure is logged and swallowed; only total failure of the
/// chain surfaces, as [`ClassifierError::Exhausted`].
pub struct ClassifierChain {
    backends: Vec<Arc<dyn ClassifierBackend>>,
}

impl ClassifierChain {
    pub fn new(backends: Vec<Arc<dyn ClassifierBackend>>) -> Self {
        Self { backends }
    }

    /// Classify `text`, falling through the backend list on failure.
    pub async fn classify(&self, text: &str) -> Result<ChainVerdict> {
        for (index, backend) in self.backends.iter().enumerate() {
            match backend.classify(text).await {
                Ok(classification) => {
                    if index > 0 {
                        tracing::info!(
                            backend = backend.name(),
                            "fallback backend produced the result"
                        );
                    }
                    return Ok(ChainVerdict {
                        classification,
                        backend: backend.name().to_string(),
                        attempts: index + 1,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        error = %e,
                        "classifier backend failed, trying next"
                    );
                }
            }
        }

        Err(ClassifierError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sentiflow_core::Sentiment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        name: String,
        result: Option<Classification>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn ok(name: &str, model: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                result: Some(Classification {
                    sentiment: Sentiment::Positive,
                    confidence: 0.9,
                    emotion: "joy".to_string(),
                    model_name: model.to_string(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                result: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClassifierBackend for FixedBackend {
        async fn classify(&self, _text: &str) -> Result<Classification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or(ClassifierError::Provider("down".to_string()))
        }
        fn name(&self) -> &str {
            &self.name
        }
    }

    // ---------------------------------------------------------------
    // Ordering and fallback
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = FixedBackend::ok("local", "distilbert");
        let fallback = FixedBackend::ok("remote", "llama");
        let chain = ClassifierChain::new(vec![primary.clone(), fallback.clone()]);

        let verdict = chain.classify("great").await.unwrap();
        assert_eq!(verdict.classification.model_name, "distilbert");
        assert_eq!(verdict.attempts, 1);
        assert!(!verdict.used_fallback());
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let primary = FixedBackend::failing("local");
        let fallback = FixedBackend::ok("remote", "llama");
        let chain = ClassifierChain::new(vec![primary.clone(), fallback.clone()]);

        let verdict = chain.classify("great").await.unwrap();
        assert_eq!(verdict.classification.model_name, "llama");
        assert_eq!(verdict.backend, "remote");
        assert_eq!(verdict.attempts, 2);
        assert!(verdict.used_fallback());
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_backends_fail_is_exhausted() {
        let chain = ClassifierChain::new(vec![
            FixedBackend::failing("local") as Arc<dyn ClassifierBackend>,
            FixedBackend::failing("remote") as Arc<dyn ClassifierBackend>,
        ]);

        let err = chain.classify("great").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Exhausted));
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let chain = ClassifierChain::new(vec![]);
        let err = chain.classify("great").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Exhausted));
    }
}
