//! Common test utilities and fixtures

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mail_triage::error::Result;
use mail_triage::feed::AnalysisFeed;
use mail_triage::models::{
    AnalysisResult, EmailRecord, Sentiment, SentimentLabel,
};
use mail_triage::session::{SessionState, SessionStatus};
use mockall::mock;

/// Create a test record with default analysis values
pub fn create_test_record(id: &str, subject: &str, sender: &str) -> EmailRecord {
    EmailRecord {
        id: id.to_string(),
        subject: subject.to_string(),
        sender: sender.to_string(),
        category: "Work".to_string(),
        analysis: AnalysisResult {
            priority_score: 0.5,
            sentiment: Sentiment {
                label: SentimentLabel::Neutral,
                score: 0.6,
            },
            summary: format!("Summary of {}", subject),
            suggested_actions: vec!["Reply".to_string()],
            response_time_hours: None,
        },
    }
}

/// Create a test record with full control over the analysis dimensions
pub fn create_analyzed_record(
    id: &str,
    category: &str,
    priority_score: f64,
    label: SentimentLabel,
    response_time_hours: Option<f64>,
) -> EmailRecord {
    let mut record = create_test_record(id, &format!("subject {}", id), "someone@example.com");
    record.category = category.to_string();
    record.analysis.priority_score = priority_score;
    record.analysis.sentiment.label = label;
    record.analysis.response_time_hours = response_time_hours;
    record
}

/// The two-record scenario from the dashboard acceptance checks
pub fn scenario_records() -> Vec<EmailRecord> {
    let mut work = create_test_record("w-1", "Team offsite agenda", "boss@corp.com");
    work.category = "Work".to_string();
    work.analysis.priority_score = 0.8;
    work.analysis.sentiment.label = SentimentLabel::Positive;

    let mut finance = create_test_record("f-1", "Invoice Payment Due", "billing@vendor.com");
    finance.category = "Finance".to_string();
    finance.analysis.priority_score = 0.9;
    finance.analysis.sentiment.label = SentimentLabel::Neutral;

    vec![work, finance]
}

/// A session that passes the route guard
pub fn authenticated_session() -> SessionState {
    SessionState {
        status: SessionStatus::Authenticated,
        access_token: Some("test-token".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

/// A session whose token lifetime already ran out
pub fn expired_session() -> SessionState {
    SessionState {
        status: SessionStatus::Authenticated,
        access_token: Some("test-token".to_string()),
        expires_at: Some(Utc::now() - Duration::minutes(5)),
    }
}

mock! {
    pub Feed {}

    #[async_trait]
    impl AnalysisFeed for Feed {
        async fn fetch_records(&self, access_token: &str, limit: usize) -> Result<Vec<EmailRecord>>;
    }
}

/// Feed JSON in the backend's wire format
pub fn feed_body(records: &[EmailRecord]) -> serde_json::Value {
    serde_json::to_value(records).unwrap()
}
