//! Terminal presentation of the triage data: metric cards, email list and
//! the interactive search/filter loop

use chrono::Local;
use inquire::{Select, Text};

use crate::cli::truncate_string;
use crate::error::{Result, TriageError};
use crate::feed::AnalysisFeed;
use crate::metrics::{recompute, MetricsSnapshot};
use crate::models::{EmailRecord, PriorityBucket, SentimentLabel};
use crate::search::SearchFilter;
use crate::session::{can_access, SessionStore};
use crate::store::EmailStore;

/// Why the interactive loop ended
#[derive(Debug, PartialEq, Eq)]
pub enum DashboardOutcome {
    Quit,
    LogoutRequested,
}

const ACTION_SEARCH: &str = "Search subject/sender";
const ACTION_CATEGORY: &str = "Filter by category";
const ACTION_PRIORITY: &str = "Filter by priority";
const ACTION_SENTIMENT: &str = "Filter by sentiment";
const ACTION_CLEAR: &str = "Clear filters";
const ACTION_REFRESH: &str = "Refresh from feed";
const ACTION_LOGOUT: &str = "Logout";
const ACTION_QUIT: &str = "Quit";
const FACET_ANY: &str = "(any)";

/// Dashboard over the email store and a feed client
///
/// The store is the single source for both the metric cards and the list;
/// filtering narrows only the displayed list, never the aggregates.
pub struct Dashboard<F: AnalysisFeed> {
    feed: F,
    store: EmailStore,
    filter: SearchFilter,
    fetch_limit: usize,
    list_rows: usize,
    last_error: Option<String>,
}

impl<F: AnalysisFeed> Dashboard<F> {
    pub fn new(feed: F, fetch_limit: usize, list_rows: usize) -> Self {
        Self {
            feed,
            store: EmailStore::new(),
            filter: SearchFilter::any(),
            fetch_limit,
            list_rows,
            last_error: None,
        }
    }

    pub fn store(&self) -> &EmailStore {
        &self.store
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: SearchFilter) {
        self.filter = filter;
    }

    /// Re-fetch the working set from the analysis feed
    ///
    /// The route guard is re-evaluated here: an expired session refuses the
    /// fetch with an auth error so the caller drops back to the login view.
    /// A feed failure keeps the stale working set and records the error for
    /// the view; the dashboard degrades instead of crashing.
    pub async fn refresh(&mut self, session: &SessionStore) -> Result<()> {
        if !can_access(session.state()) {
            return Err(TriageError::AuthError(
                "Session is not authenticated or has expired".to_string(),
            ));
        }
        let token = session.state().access_token.clone().ok_or_else(|| {
            TriageError::AuthError("Session carries no access token".to_string())
        })?;

        match self.feed.fetch_records(&token, self.fetch_limit).await {
            Ok(records) => {
                self.store.replace_all(records);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Render the metric cards and the (possibly filtered) email list
    pub fn render(&self) {
        let snapshot = recompute(self.store.all());
        let visible = self.filter.apply(self.store.all());

        println!("\n========================================");
        println!("Mail Triage Dashboard");
        println!("========================================");
        println!("Refreshed: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

        if let Some(error) = &self.last_error {
            println!("\n! Feed unavailable: {}", error);
            println!("! Showing the last known data. Choose \"{}\" to retry.", ACTION_REFRESH);
        }

        render_metric_cards(&snapshot);

        if self.filter.is_empty() {
            println!("\nShowing all {} emails", snapshot.total_emails);
        } else {
            println!(
                "\nShowing {} of {} emails (filter: {})",
                visible.len(),
                snapshot.total_emails,
                self.filter.describe()
            );
        }

        for record in visible.iter().take(self.list_rows) {
            render_record(record);
        }
        if visible.len() > self.list_rows {
            println!("  ... and {} more", visible.len() - self.list_rows);
        }
        println!("========================================");
    }

    /// Interactive loop: search, facet filters, refresh, logout
    pub async fn run(&mut self, session: &SessionStore) -> Result<DashboardOutcome> {
        loop {
            self.render();

            let options = vec![
                ACTION_SEARCH,
                ACTION_CATEGORY,
                ACTION_PRIORITY,
                ACTION_SENTIMENT,
                ACTION_CLEAR,
                ACTION_REFRESH,
                ACTION_LOGOUT,
                ACTION_QUIT,
            ];
            let choice = match Select::new("Action:", options).prompt() {
                Ok(choice) => choice,
                // Esc or closed input ends the session cleanly
                Err(_) => return Ok(DashboardOutcome::Quit),
            };

            match choice {
                ACTION_SEARCH => {
                    if let Ok(query) = Text::new("Search text (empty clears):")
                        .with_initial_value(&self.filter.query)
                        .prompt()
                    {
                        self.filter.query = query;
                    }
                }
                ACTION_CATEGORY => {
                    let mut choices = vec![FACET_ANY.to_string()];
                    choices.extend(self.observed_categories());
                    if let Ok(choice) = Select::new("Category:", choices).prompt() {
                        self.filter.category =
                            (choice != FACET_ANY).then_some(choice);
                    }
                }
                ACTION_PRIORITY => {
                    let choices = vec![FACET_ANY, "high", "medium", "low"];
                    if let Ok(choice) = Select::new("Priority:", choices).prompt() {
                        self.filter.priority = match choice {
                            "high" => Some(PriorityBucket::High),
                            "medium" => Some(PriorityBucket::Medium),
                            "low" => Some(PriorityBucket::Low),
                            _ => None,
                        };
                    }
                }
                ACTION_SENTIMENT => {
                    let choices = vec![FACET_ANY, "positive", "neutral", "negative"];
                    if let Ok(choice) = Select::new("Sentiment:", choices).prompt() {
                        self.filter.sentiment = match choice {
                            "positive" => Some(SentimentLabel::Positive),
                            "neutral" => Some(SentimentLabel::Neutral),
                            "negative" => Some(SentimentLabel::Negative),
                            _ => None,
                        };
                    }
                }
                ACTION_CLEAR => {
                    self.filter = SearchFilter::any();
                }
                ACTION_REFRESH => match self.refresh(session).await {
                    Ok(()) => {}
                    // Expired/rejected session sends the user to the login view
                    Err(e @ TriageError::AuthError(_)) => return Err(e),
                    // Other feed failures degrade; render shows the banner
                    Err(_) => {}
                },
                ACTION_LOGOUT => return Ok(DashboardOutcome::LogoutRequested),
                _ => return Ok(DashboardOutcome::Quit),
            }
        }
    }

    fn observed_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .store
            .all()
            .iter()
            .map(|r| r.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// The four metric cards plus the distribution lines
fn render_metric_cards(snapshot: &MetricsSnapshot) {
    println!("\nTotal emails:        {}", snapshot.total_emails);
    println!(
        "Avg response time:   {}",
        format_response_time(snapshot.avg_response_time_hours)
    );
    println!("High priority:       {}", snapshot.high_priority_count());
    println!("Positive sentiment:  {}", snapshot.positive_count());

    if !snapshot.categories.is_empty() {
        let breakdown: Vec<String> = snapshot
            .categories
            .iter()
            .map(|(category, count)| format!("{} {}", category, count))
            .collect();
        println!("Categories:          {}", breakdown.join(", "));
    }
}

fn render_record(record: &EmailRecord) {
    let badge = if record.analysis.is_high_priority() {
        " [HIGH]"
    } else {
        ""
    };
    println!(
        "  [{}]{} {} - {}",
        record.category,
        badge,
        truncate_string(&record.subject, 48),
        record.sender
    );
    if !record.analysis.summary.is_empty() {
        println!("      {}", truncate_string(&record.analysis.summary, 72));
    }
    if !record.analysis.suggested_actions.is_empty() {
        println!(
            "      actions: {}",
            record.analysis.suggested_actions.join(" | ")
        );
    }
}

pub fn format_response_time(hours: Option<f64>) -> String {
    match hours {
        Some(hours) => format!("{:.1} h", hours),
        None => "n/a".to_string(),
    }
}

/// Unauthenticated view: why access was refused and what to do next
pub fn render_login_view(reason: &str) {
    println!("\n========================================");
    println!("Sign-in required");
    println!("========================================");
    println!("{}", reason);
    println!("\nRun: mail-triage login");
    println!("========================================");
}
