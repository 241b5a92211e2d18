use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape check for sender addresses delivered by the analysis feed
static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// One analyzed email as delivered by the analysis backend
///
/// Identity is `id`; the store rejects nothing else about the record, the
/// backend already validated it. Field aliases match the backend wire names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailRecord {
    #[serde(alias = "email_id")]
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub category: String,
    #[serde(alias = "analysis_results")]
    pub analysis: AnalysisResult,
}

impl EmailRecord {
    /// Whether the sender field is shaped like an email address
    pub fn has_address_shaped_sender(&self) -> bool {
        ADDRESS_PATTERN.is_match(&self.sender)
    }
}

/// Precomputed analysis attached to a record; immutable once ingested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub priority_score: f64,
    pub sentiment: Sentiment,
    pub summary: String,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    /// Externally measured, absent when the thread has no reply yet
    #[serde(default, alias = "response_time")]
    pub response_time_hours: Option<f64>,
}

impl AnalysisResult {
    pub fn priority_bucket(&self) -> PriorityBucket {
        PriorityBucket::from_score(self.priority_score)
    }

    /// Per-record badge rule; identical to the aggregate High bucket
    pub fn is_high_priority(&self) -> bool {
        self.priority_bucket() == PriorityBucket::High
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Confidence in [0, 1]
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-way priority bucket derived from `priority_score`
///
/// One rule for both the per-record badge and the aggregate distribution:
/// score > 0.7 is High, score > 0.3 is Medium, everything else is Low.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PriorityBucket {
    High,
    Medium,
    Low,
}

impl PriorityBucket {
    pub const ALL: [PriorityBucket; 3] = [
        PriorityBucket::High,
        PriorityBucket::Medium,
        PriorityBucket::Low,
    ];

    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            PriorityBucket::High
        } else if score > 0.3 {
            PriorityBucket::Medium
        } else {
            PriorityBucket::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityBucket::High => "high",
            PriorityBucket::Medium => "medium",
            PriorityBucket::Low => "low",
        }
    }
}

impl fmt::Display for PriorityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
