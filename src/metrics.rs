use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{EmailRecord, PriorityBucket, SentimentLabel};

/// Point-in-time aggregate over the full (unfiltered) record set
///
/// Derived only, never hand-edited; `recompute` rebuilds it from scratch in
/// one pass. Sentiment and priority maps always carry every fixed bucket
/// (zero-seeded); `categories` carries only observed categories since the
/// category vocabulary is open-ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub total_emails: usize,
    pub categories: BTreeMap<String, usize>,
    pub sentiment_distribution: BTreeMap<SentimentLabel, usize>,
    pub priority_distribution: BTreeMap<PriorityBucket, usize>,
    pub avg_response_time_hours: Option<f64>,
}

impl MetricsSnapshot {
    /// Snapshot of an empty record set (dashboard's degraded state)
    pub fn empty() -> Self {
        recompute(&[])
    }

    pub fn high_priority_count(&self) -> usize {
        self.priority_distribution
            .get(&PriorityBucket::High)
            .copied()
            .unwrap_or(0)
    }

    pub fn positive_count(&self) -> usize {
        self.sentiment_distribution
            .get(&SentimentLabel::Positive)
            .copied()
            .unwrap_or(0)
    }
}

/// Derive a fresh snapshot from the record set
///
/// Order-independent: every record contributes to exactly one category, one
/// sentiment and one priority bucket, so each count-sum equals
/// `total_emails`. The response-time average is absent, not zero, when no
/// record carries a measured response time.
pub fn recompute(records: &[EmailRecord]) -> MetricsSnapshot {
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut sentiment_distribution: BTreeMap<SentimentLabel, usize> =
        SentimentLabel::ALL.iter().map(|l| (*l, 0)).collect();
    let mut priority_distribution: BTreeMap<PriorityBucket, usize> =
        PriorityBucket::ALL.iter().map(|b| (*b, 0)).collect();

    let mut response_time_sum = 0.0;
    let mut response_time_count = 0usize;

    for record in records {
        *categories.entry(record.category.clone()).or_insert(0) += 1;
        *sentiment_distribution
            .entry(record.analysis.sentiment.label)
            .or_insert(0) += 1;
        *priority_distribution
            .entry(record.analysis.priority_bucket())
            .or_insert(0) += 1;

        if let Some(hours) = record.analysis.response_time_hours {
            response_time_sum += hours;
            response_time_count += 1;
        }
    }

    let avg_response_time_hours = if response_time_count > 0 {
        Some(response_time_sum / response_time_count as f64)
    } else {
        None
    };

    MetricsSnapshot {
        total_emails: records.len(),
        categories,
        sentiment_distribution,
        priority_distribution,
        avg_response_time_hours,
    }
}
