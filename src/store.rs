use tokio::sync::watch;

use crate::error::{Result, TriageError};
use crate::models::EmailRecord;

/// In-memory working set of analyzed emails
///
/// Insertion order is stable: `all()` always returns records in the order
/// they first arrived, and replacing a record by id keeps its position.
/// Every mutation bumps a revision that subscribers can watch, so the
/// presentation layer re-renders without polling.
pub struct EmailStore {
    records: Vec<EmailRecord>,
    revision: watch::Sender<u64>,
}

impl EmailStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            records: Vec::new(),
            revision,
        }
    }

    /// Insert a record, or replace the record with the same id in place
    pub fn upsert(&mut self, record: EmailRecord) {
        match self.position(&record.id) {
            Some(idx) => {
                tracing::debug!("Replacing record {}", record.id);
                self.records[idx] = record;
            }
            None => {
                tracing::debug!("Inserting record {}", record.id);
                self.records.push(record);
            }
        }
        self.bump();
    }

    /// Remove a record by id, returning it
    pub fn remove(&mut self, id: &str) -> Result<EmailRecord> {
        let idx = self
            .position(id)
            .ok_or_else(|| TriageError::RecordNotFound(id.to_string()))?;
        let record = self.records.remove(idx);
        self.bump();
        Ok(record)
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Result<&EmailRecord> {
        self.position(id)
            .map(|idx| &self.records[idx])
            .ok_or_else(|| TriageError::RecordNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Full working set in insertion order
    pub fn all(&self) -> &[EmailRecord] {
        &self.records
    }

    /// Replace the whole working set with a fresh feed batch
    ///
    /// Duplicate ids within the batch collapse to one record: first
    /// occurrence keeps the position, last occurrence wins the content.
    pub fn replace_all(&mut self, records: Vec<EmailRecord>) {
        self.records.clear();
        for record in records {
            match self.position(&record.id) {
                Some(idx) => self.records[idx] = record,
                None => self.records.push(record),
            }
        }
        tracing::debug!("Replaced working set with {} records", self.records.len());
        self.bump();
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.bump();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current revision; bumped on every mutation
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for EmailStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Sentiment, SentimentLabel};

    fn record(id: &str, subject: &str) -> EmailRecord {
        EmailRecord {
            id: id.to_string(),
            subject: subject.to_string(),
            sender: "someone@example.com".to_string(),
            category: "Work".to_string(),
            analysis: AnalysisResult {
                priority_score: 0.5,
                sentiment: Sentiment {
                    label: SentimentLabel::Neutral,
                    score: 0.6,
                },
                summary: String::new(),
                suggested_actions: Vec::new(),
                response_time_hours: None,
            },
        }
    }

    #[test]
    fn test_upsert_inserts_and_replaces() {
        let mut store = EmailStore::new();
        store.upsert(record("a", "first"));
        store.upsert(record("b", "second"));
        assert_eq!(store.len(), 2);

        // Replacing keeps the original position
        store.upsert(record("a", "updated"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[0].subject, "updated");
        assert_eq!(store.all()[1].id, "b");
    }

    #[test]
    fn test_insertion_order_stable() {
        let mut store = EmailStore::new();
        for id in ["c", "a", "b"] {
            store.upsert(record(id, id));
        }
        let order: Vec<&str> = store.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_get_and_remove() {
        let mut store = EmailStore::new();
        store.upsert(record("a", "first"));

        assert_eq!(store.get("a").unwrap().subject, "first");
        assert!(matches!(
            store.get("missing"),
            Err(TriageError::RecordNotFound(_))
        ));

        let removed = store.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(store.is_empty());
        assert!(matches!(
            store.remove("a"),
            Err(TriageError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_replace_all_dedupes_last_wins() {
        let mut store = EmailStore::new();
        store.upsert(record("old", "gone after replace"));

        store.replace_all(vec![
            record("a", "v1"),
            record("b", "b"),
            record("a", "v2"),
        ]);

        assert_eq!(store.len(), 2);
        assert!(!store.contains("old"));
        assert_eq!(store.all()[0].id, "a");
        assert_eq!(store.all()[0].subject, "v2");
    }

    #[test]
    fn test_revision_bumps_on_mutation() {
        let mut store = EmailStore::new();
        let rx = store.subscribe();
        let start = *rx.borrow();

        store.upsert(record("a", "first"));
        assert_eq!(store.revision(), start + 1);

        store.remove("a").unwrap();
        assert_eq!(store.revision(), start + 2);

        store.clear();
        assert_eq!(store.revision(), start + 3);
    }

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let mut store = EmailStore::new();
        let mut rx = store.subscribe();

        store.upsert(record("a", "first"));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert!(!rx.has_changed().unwrap());
    }
}
