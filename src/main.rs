use anyhow::Result;
use clap::Parser;
use mail_triage::auth::AuthFlowController;
use mail_triage::cli::{Cli, Commands, ProgressReporter};
use mail_triage::config::Config;
use mail_triage::dashboard::{render_login_view, Dashboard, DashboardOutcome};
use mail_triage::error::TriageError;
use mail_triage::feed::HttpAnalysisFeed;
use mail_triage::session::{can_access, SessionState, SessionStore};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with level based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mail_triage=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mail_triage=info,warn,error"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Login { force } => {
            let config = Config::load(&cli.config).await?;
            let controller =
                AuthFlowController::new(config.oauth.clone(), config.feed.timeout_secs)?;
            let mut session = SessionStore::load(&cli.session_file).await?;

            if force {
                controller.logout(&mut session);
            }
            // A pending session left behind by an interrupted run cannot resume
            if session.status() == mail_triage::session::SessionStatus::Pending {
                controller.fail_login(&mut session, "stale pending login attempt");
            }

            if can_access(session.state()) {
                println!("Already signed in. Use --force to start over.");
                return Ok(());
            }

            let (url, state) = controller.begin_login(&mut session)?;
            println!("Open this URL in your browser to sign in:\n\n{}\n", url);
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!("Could not open browser automatically: {}", e);
            }

            let reporter = ProgressReporter::new();
            let spinner = reporter.add_spinner("Waiting for the sign-in redirect...");

            let code = match controller.await_redirect(&state).await {
                Ok(code) => code,
                Err(e) => {
                    spinner.finish_and_clear();
                    controller.fail_login(&mut session, &e.to_string());
                    session.save(&cli.session_file).await?;
                    return Err(e.into());
                }
            };

            spinner.set_message("Exchanging authorization code...");
            let exchange = controller.complete_login(&mut session, &code).await;
            session.save(&cli.session_file).await?;
            exchange?;
            reporter.finish_spinner(&spinner, "Signed in");

            if let Some(expires_at) = session.state().expires_at {
                println!("Session expires at {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            Ok(())
        }

        Commands::Logout => {
            let mut session = SessionStore::load(&cli.session_file).await?;
            session.set(SessionState::anonymous());
            session.save(&cli.session_file).await?;
            println!("Signed out.");
            Ok(())
        }

        Commands::Dashboard { limit, once } => {
            let config = Config::load(&cli.config).await?;
            let session = SessionStore::load(&cli.session_file).await?;

            // Route guard: protected view renders only for a live session
            if !can_access(session.state()) {
                let reason = if session.state().is_expired() {
                    "Your session has expired."
                } else {
                    "You are not signed in."
                };
                render_login_view(reason);
                return Ok(());
            }

            let feed = HttpAnalysisFeed::new(&config.feed)?;
            let mut dashboard = Dashboard::new(
                feed,
                limit.unwrap_or(config.feed.fetch_limit),
                config.dashboard.list_rows,
            );

            let reporter = ProgressReporter::new();
            let spinner = reporter.add_spinner("Fetching analyzed emails...");
            match dashboard.refresh(&session).await {
                Ok(()) => {
                    reporter.finish_spinner(
                        &spinner,
                        &format!("Fetched {} analyzed emails", dashboard.store().len()),
                    );
                }
                Err(TriageError::AuthError(msg)) => {
                    spinner.finish_and_clear();
                    render_login_view(&msg);
                    return Ok(());
                }
                Err(e) => {
                    // Degraded view; the dashboard banner shows the error
                    spinner.finish_and_clear();
                    tracing::warn!("Initial feed fetch failed: {}", e);
                }
            }

            if once {
                dashboard.render();
                return Ok(());
            }

            match dashboard.run(&session).await {
                Ok(DashboardOutcome::Quit) => Ok(()),
                Ok(DashboardOutcome::LogoutRequested) => {
                    let mut session = session;
                    session.set(SessionState::anonymous());
                    session.save(&cli.session_file).await?;
                    println!("Signed out.");
                    Ok(())
                }
                Err(TriageError::AuthError(msg)) => {
                    render_login_view(&msg);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::Status { detailed } => {
            let session = SessionStore::load(&cli.session_file).await?;
            let state = session.state();

            println!("\n========================================");
            println!("Session Status");
            println!("========================================");
            println!("Status: {:?}", state.status);
            println!("Dashboard access: {}", if can_access(state) { "allowed" } else { "denied" });

            if detailed {
                match state.expires_at {
                    Some(expires_at) => {
                        println!("Expires: {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
                        println!("Expired: {}", state.is_expired());
                    }
                    None => println!("Expires: never"),
                }
                println!("Access token cached: {}", state.access_token.is_some());
            }
            println!("========================================");
            Ok(())
        }

        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(TriageError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(&output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nPlease edit this file before logging in.");
            println!("Key settings to review:");
            println!("  - oauth.tenant_id / oauth.client_id: from your app registration");
            println!("  - oauth.redirect_uri: must match the registration exactly");
            println!("  - feed.base_url: where the analysis backend is reachable");
            Ok(())
        }
    }
}

/// Display error with a hint for the common failure classes
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(triage_err) = error.downcast_ref::<TriageError>() {
        match triage_err {
            TriageError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file.");
                eprintln!("      Run: mail-triage init-config --force");
                eprintln!("      OAuth values can also come from MICROSOFT_* env variables.");
            }
            TriageError::AuthError(_) => {
                eprintln!("\nHint: Sign in again with: mail-triage login");
            }
            TriageError::NetworkError(_) | TriageError::ServerError { .. } => {
                eprintln!("\nHint: The analysis backend may be down or unreachable.");
                eprintln!("      Check feed.base_url and try again.");
            }
            TriageError::RateLimitExceeded { retry_after } => {
                eprintln!("\nHint: Wait {} seconds and try again.", retry_after);
            }
            _ => {}
        }
    }
}
