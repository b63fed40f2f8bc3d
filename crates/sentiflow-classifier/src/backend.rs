//! The [`ClassifierBackend`] trait and its result type.

use async_trait::async_trait;
use sentiflow_core::Sentiment;

use crate::error::Result;

/// The fields a backend produces for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub sentiment: Sentiment,
    /// Confidence in [0, 1] as reported by the backend.
    pub confidence: f64,
    /// Free-form emotion label (joy, sadness, anger, fear, surprise, neutral).
    pub emotion: String,
    /// Name of the model that produced this result; persisted so downstream
    /// consumers can tell local and fallback analyses apart.
    pub model_name: String,
}

/// An analysis backend in the classifier chain.
///
/// Backends are shared across concurrently processed entries, so `classify`
/// takes `&self`; implementations needing exclusive access to a resource
/// (like the single subprocess channel) serialize internally.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Classify one piece of text.
    async fn classify(&self, text: &str) -> Result<Classification>;

    /// Short backend name used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_construction() {
        let c = Classification {
            sentiment: Sentiment::Positive,
            confidence: 0.92,
            emotion: "joy".to_string(),
            model_name: "distilbert".to_string(),
        };
        assert_eq!(c.sentiment, Sentiment::Positive);
        assert_eq!(c.model_name, "distilbert");
    }

    // Object safety: the chain stores backends as trait objects.
    struct NullBackend;

    #[async_trait]
    impl ClassifierBackend for NullBackend {
        async fn classify(&self, _text: &str) -> Result<Classification> {
            Err(crate::error::ClassifierError::Exhausted)
        }
        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn test_backend_object_safety() {
        let backend = NullBackend;
        let _: &dyn ClassifierBackend = &backend;
    }
}
