//! Command-line interface

use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mail-triage")]
#[command(version)]
#[command(about = "Terminal dashboard for analyzed email triage", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to the cached session file
    #[arg(long, default_value = ".mail-triage/session.json")]
    pub session_file: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in through the Microsoft identity provider
    Login {
        /// Discard any cached session before starting
        #[arg(long)]
        force: bool,
    },

    /// Clear the cached session
    Logout,

    /// Show the triage dashboard
    Dashboard {
        /// Maximum number of analyzed emails to fetch
        #[arg(short, long)]
        limit: Option<usize>,

        /// Render once and exit instead of entering the interactive loop
        #[arg(long)]
        once: bool,
    },

    /// Show session status
    Status {
        /// Show detailed information
        #[arg(long)]
        detailed: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!(
            "{}...",
            s.chars()
                .take(max_len.saturating_sub(3))
                .collect::<String>()
        )
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi: MultiProgress::new(),
            spinner_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        println!("  ✓ {}", msg);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("exactly ten", 11), "exactly ten");
        assert_eq!(truncate_string("a longer subject line", 10), "a longe...");
    }

    #[test]
    fn test_cli_parses_dashboard() {
        let cli = Cli::parse_from(["mail-triage", "dashboard", "--limit", "10", "--once"]);
        match cli.command {
            Commands::Dashboard { limit, once } => {
                assert_eq!(limit, Some(10));
                assert!(once);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_default_paths() {
        let cli = Cli::parse_from(["mail-triage", "status"]);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.session_file, PathBuf::from(".mail-triage/session.json"));
        assert!(!cli.verbose);
    }
}
