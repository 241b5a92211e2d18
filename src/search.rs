use serde::{Deserialize, Serialize};

use crate::models::{EmailRecord, PriorityBucket, SentimentLabel};

/// Text query plus facet predicates, combined with logical AND
///
/// Evaluation never touches the store or the metrics snapshot; aggregates
/// always describe the full set so the view can say "N of M emails".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilter {
    /// Case-insensitive substring matched against subject and sender
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<PriorityBucket>,
    #[serde(default)]
    pub sentiment: Option<SentimentLabel>,
}

impl SearchFilter {
    /// Filter matching every record
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
            && self.category.is_none()
            && self.priority.is_none()
            && self.sentiment.is_none()
    }

    /// Whether a single record passes every active predicate
    pub fn matches(&self, record: &EmailRecord) -> bool {
        let query = self.query.trim();
        if !query.is_empty() {
            let needle = query.to_lowercase();
            let in_subject = record.subject.to_lowercase().contains(&needle);
            let in_sender = record.sender.to_lowercase().contains(&needle);
            if !in_subject && !in_sender {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if record.category != *category {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if record.analysis.priority_bucket() != priority {
                return false;
            }
        }

        if let Some(sentiment) = self.sentiment {
            if record.analysis.sentiment.label != sentiment {
                return false;
            }
        }

        true
    }

    /// Narrow the record sequence, preserving input order
    pub fn apply<'a>(&self, records: &'a [EmailRecord]) -> Vec<&'a EmailRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// Human-readable description of the active predicates, for the view header
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        let query = self.query.trim();
        if !query.is_empty() {
            parts.push(format!("text \"{}\"", query));
        }
        if let Some(category) = &self.category {
            parts.push(format!("category {}", category));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("priority {}", priority));
        }
        if let Some(sentiment) = self.sentiment {
            parts.push(format!("sentiment {}", sentiment));
        }
        parts.join(", ")
    }
}
