//! Records flowing through the pipeline.
//!
//! A [`StreamEntry`] is what the append log delivers: an opaque monotonic
//! identifier plus a string field map, with no schema enforced at the log
//! layer. [`StreamEntry::validate`] is the single place that decides whether
//! an entry is processable; everything downstream works with the typed
//! [`ValidatedPost`] it produces.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Sentiment label assigned to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Parse a label from classifier output.
    ///
    /// Lenient by design: classifier backends occasionally emit labels
    /// outside the contract (model-specific casing, unexpected classes), and
    /// an unknown label must not fail the entry. Anything unrecognized maps
    /// to [`Sentiment::Neutral`].
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    /// The lowercase wire form stored in the relational store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw entry read from the append log.
///
/// Entries are immutable and read-only to the pipeline; the producer wrote
/// the fields once and the log assigned the identifier.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    /// Opaque, monotonically increasing identifier assigned by the log.
    pub id: String,
    /// Field mapping as appended by the producer.
    pub fields: HashMap<String, String>,
}

impl StreamEntry {
    pub fn new(id: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Validate this entry into a typed post.
    ///
    /// `post_id` and `content` must be present and non-empty; an entry
    /// missing either is malformed and gets discarded by the caller.
    /// `source` and `author` default to empty strings, and a missing or
    /// unparseable `created_at` falls back to the current time rather than
    /// rejecting the post.
    pub fn validate(&self) -> Result<ValidatedPost, ValidationError> {
        let post_id = self.require("post_id")?;
        let content = self.require("content")?;

        let created_at = self
            .fields
            .get("created_at")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(ValidatedPost {
            post_id: post_id.to_string(),
            content: content.to_string(),
            source: self.field_or_empty("source"),
            author: self.field_or_empty("author"),
            created_at,
        })
    }

    fn require(&self, name: &'static str) -> Result<&str, ValidationError> {
        match self.fields.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ValidationError::MissingField(name)),
        }
    }

    fn field_or_empty(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

/// A stream entry that passed validation, ready to classify and persist.
///
/// Persisted to `social_media_posts` with `ingested_at` set to commit time
/// on every upsert, so reprocessing the same entry is safe and observable.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPost {
    pub post_id: String,
    pub content: String,
    pub source: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// The outcome of classifying one post.
///
/// Appended to `sentiment_analysis`, never updated. Multiple rows per
/// `post_id` are expected under at-least-once delivery; downstream readers
/// resolve by the most recent `analyzed_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub post_id: String,
    pub model_name: String,
    pub sentiment: Sentiment,
    /// Confidence in [0, 1]; clamped on construction.
    pub confidence: f64,
    pub emotion: String,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(
        post_id: impl Into<String>,
        model_name: impl Into<String>,
        sentiment: Sentiment,
        confidence: f64,
        emotion: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            model_name: model_name.into(),
            sentiment,
            confidence: confidence.clamp(0.0, 1.0),
            emotion: emotion.into(),
            analyzed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fields: &[(&str, &str)]) -> StreamEntry {
        StreamEntry::new(
            "1700000000000-0",
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    #[test]
    fn test_validate_complete_entry() {
        let e = entry(&[
            ("post_id", "p1"),
            ("content", "I love this!"),
            ("source", "reddit"),
            ("author", "a"),
            ("created_at", "2026-08-30T12:00:00Z"),
        ]);
        let post = e.validate().unwrap();
        assert_eq!(post.post_id, "p1");
        assert_eq!(post.content, "I love this!");
        assert_eq!(post.source, "reddit");
        assert_eq!(post.author, "a");
        assert_eq!(post.created_at.to_rfc3339(), "2026-08-30T12:00:00+00:00");
    }

    #[test]
    fn test_validate_missing_post_id() {
        let e = entry(&[("content", "hello")]);
        assert_eq!(
            e.validate().unwrap_err(),
            ValidationError::MissingField("post_id")
        );
    }

    #[test]
    fn test_validate_missing_content() {
        let e = entry(&[("post_id", "p1")]);
        assert_eq!(
            e.validate().unwrap_err(),
            ValidationError::MissingField("content")
        );
    }

    #[test]
    fn test_validate_blank_content_is_missing() {
        let e = entry(&[("post_id", "p1"), ("content", "   ")]);
        assert_eq!(
            e.validate().unwrap_err(),
            ValidationError::MissingField("content")
        );
    }

    #[test]
    fn test_validate_defaults_optional_fields() {
        let e = entry(&[("post_id", "p1"), ("content", "text")]);
        let post = e.validate().unwrap();
        assert_eq!(post.source, "");
        assert_eq!(post.author, "");
    }

    #[test]
    fn test_validate_unparseable_created_at_falls_back_to_now() {
        let e = entry(&[
            ("post_id", "p1"),
            ("content", "text"),
            ("created_at", "yesterday"),
        ]);
        let before = Utc::now();
        let post = e.validate().unwrap();
        assert!(post.created_at >= before);
    }

    // ---------------------------------------------------------------
    // Sentiment
    // ---------------------------------------------------------------

    #[test]
    fn test_sentiment_from_label() {
        assert_eq!(Sentiment::from_label("positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label("POSITIVE"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label("negative"), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("neutral"), Sentiment::Neutral);
    }

    #[test]
    fn test_sentiment_unknown_label_maps_to_neutral() {
        assert_eq!(Sentiment::from_label("ecstatic"), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label(""), Sentiment::Neutral);
    }

    #[test]
    fn test_sentiment_display() {
        assert_eq!(Sentiment::Positive.to_string(), "positive");
        assert_eq!(Sentiment::Negative.to_string(), "negative");
        assert_eq!(Sentiment::Neutral.to_string(), "neutral");
    }

    #[test]
    fn test_sentiment_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Sentiment::Positive).unwrap(),
            "\"positive\""
        );
        let parsed: Sentiment = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(parsed, Sentiment::Negative);
    }

    // ---------------------------------------------------------------
    // AnalysisResult
    // ---------------------------------------------------------------

    #[test]
    fn test_analysis_result_clamps_confidence() {
        let high = AnalysisResult::new("p1", "m", Sentiment::Positive, 1.7, "joy");
        assert_eq!(high.confidence, 1.0);
        let low = AnalysisResult::new("p1", "m", Sentiment::Negative, -0.2, "anger");
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_analysis_result_fields() {
        let r = AnalysisResult::new("p1", "distilbert", Sentiment::Positive, 0.93, "joy");
        assert_eq!(r.post_id, "p1");
        assert_eq!(r.model_name, "distilbert");
        assert_eq!(r.sentiment, Sentiment::Positive);
        assert_eq!(r.emotion, "joy");
    }
}
