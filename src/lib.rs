//! Mail Triage Dashboard
//!
//! A terminal presentation layer for an email-triage product: it signs the
//! user in through the Microsoft identity platform, ingests precomputed
//! per-email analysis from an external backend, and renders aggregate
//! metrics plus a searchable email list.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 authorization-code flow with a loopback
//!   redirect listener and a cached session
//! - **Ingestion**: analyzed-email feed client with transient-failure retry
//! - **Aggregation**: deterministic metric snapshots derived from the full
//!   working set
//! - **Search/Filter**: text query and facet predicates over the displayed
//!   list, independent of the aggregates
//!
//! # Example Usage
//!
//! ```no_run
//! use mail_triage::config::Config;
//! use mail_triage::metrics::recompute;
//! use mail_triage::store::EmailStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!     println!("feed backend: {}", config.feed.base_url);
//!
//!     let store = EmailStore::new();
//!     let snapshot = recompute(store.all());
//!     println!("{} emails, {} high priority", snapshot.total_emails,
//!         snapshot.high_priority_count());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authorization-code flow and token exchange
//! - [`cli`] - Command-line interface
//! - [`config`] - Configuration management
//! - [`dashboard`] - Terminal views and the interactive loop
//! - [`error`] - Error types and result aliases
//! - [`feed`] - Analyzed-email feed client
//! - [`metrics`] - Aggregate metric snapshots
//! - [`models`] - Core data structures
//! - [`search`] - Search and facet filtering
//! - [`session`] - Session state, route guard and persistence
//! - [`store`] - In-memory email record store

pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod search;
pub mod session;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{Result, TriageError};

// Core data models
pub use models::{AnalysisResult, EmailRecord, PriorityBucket, Sentiment, SentimentLabel};

// Aggregation
pub use metrics::{recompute, MetricsSnapshot};

// Search/filtering
pub use search::SearchFilter;

// Session and route guard
pub use session::{can_access, SessionState, SessionStatus, SessionStore};

// Auth flow
pub use auth::{AuthFlowController, SCOPES};

// Stores and feed
pub use feed::{AnalysisFeed, HttpAnalysisFeed};
pub use store::EmailStore;

// Config types
pub use config::{Config, DashboardConfig, FeedConfig, OAuthConfig};

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};

// Dashboard types
pub use dashboard::{Dashboard, DashboardOutcome};
