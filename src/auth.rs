//! OAuth2 authorization-code flow against the Microsoft identity platform

use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{Result, TriageError};
use crate::session::{SessionState, SessionStatus, SessionStore};

/// Graph scopes requested during authorization
pub const SCOPES: &[&str] = &["Mail.Read", "Mail.ReadWrite", "User.Read"];

/// How long the loopback listener waits for the provider to redirect back
pub const REDIRECT_TIMEOUT: Duration = Duration::from_secs(180);

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Authorization code captured from the provider redirect
#[derive(Debug)]
pub struct AuthorizationCode(pub String);

/// Drives the anonymous -> pending -> authenticated state machine
///
/// Construction validates the OAuth configuration; a missing tenant id,
/// client id or malformed redirect URI is fatal here rather than surfacing
/// mid-flow.
pub struct AuthFlowController {
    oauth: OAuthConfig,
    http: reqwest::Client,
}

impl AuthFlowController {
    pub fn new(oauth: OAuthConfig, timeout_secs: u64) -> Result<Self> {
        oauth.validate()?;

        // A pending token exchange must not hang the session forever
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TriageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { oauth, http })
    }

    /// Authorization endpoint URL for this tenant
    fn authorize_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.oauth.authority.trim_end_matches('/'),
            self.oauth.tenant_id
        )
    }

    /// Token endpoint URL for this tenant
    fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.oauth.authority.trim_end_matches('/'),
            self.oauth.tenant_id
        )
    }

    /// Build the authorization URL the browser is sent to
    pub fn authorize_url(&self, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.authorize_endpoint())
            .map_err(|e| TriageError::ConfigError(format!("Bad authorize endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.oauth.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.oauth.redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state);

        Ok(url)
    }

    /// Start the login handshake
    ///
    /// Only valid when the session is anonymous (an expired authenticated
    /// session counts as anonymous). Transitions to pending and returns the
    /// URL plus the CSRF state the redirect must echo; from here control
    /// belongs to the identity provider until the redirect lands.
    pub fn begin_login(&self, session: &mut SessionStore) -> Result<(Url, String)> {
        match session.status() {
            SessionStatus::Anonymous => {}
            SessionStatus::Authenticated if session.state().is_expired() => {}
            SessionStatus::Pending => {
                return Err(TriageError::AuthError(
                    "A login attempt is already pending".to_string(),
                ));
            }
            SessionStatus::Authenticated => {
                return Err(TriageError::AuthError(
                    "Already signed in; log out first".to_string(),
                ));
            }
        }

        let state = uuid::Uuid::new_v4().to_string();
        let url = self.authorize_url(&state)?;

        session.set(SessionState {
            status: SessionStatus::Pending,
            access_token: None,
            expires_at: None,
        });
        tracing::info!("Login started, awaiting provider redirect");

        Ok((url, state))
    }

    /// Wait on the loopback redirect for the authorization code
    ///
    /// Binds the listener from the configured redirect URI and accepts the
    /// first request carrying a matching state. A provider error parameter,
    /// state mismatch or timeout all surface as auth errors; the caller
    /// resets the session to anonymous via `fail_login`.
    pub async fn await_redirect(&self, expected_state: &str) -> Result<AuthorizationCode> {
        let redirect_uri = self.oauth.redirect_uri.clone();
        let expected_state = expected_state.to_string();

        tokio::task::spawn_blocking(move || {
            listen_for_code(&redirect_uri, &expected_state, REDIRECT_TIMEOUT)
        })
        .await
        .map_err(|e| TriageError::Unknown(format!("Redirect listener panicked: {}", e)))?
    }

    /// Resume the handshake: exchange the authorization code for a token
    ///
    /// Success transitions the session to authenticated. Every failure mode
    /// (denied consent already caught at the redirect, network error,
    /// invalid code, malformed body) drops the session back to anonymous
    /// and surfaces an auth error.
    pub async fn complete_login(
        &self,
        session: &mut SessionStore,
        code: &AuthorizationCode,
    ) -> Result<()> {
        if session.status() != SessionStatus::Pending {
            return Err(TriageError::AuthError(
                "No login attempt is pending".to_string(),
            ));
        }

        match self.exchange_code(&code.0).await {
            Ok(token) => {
                let expires_at = token
                    .expires_in
                    .map(|secs| Utc::now() + ChronoDuration::seconds(secs as i64));
                session.set(SessionState {
                    status: SessionStatus::Authenticated,
                    access_token: Some(token.access_token),
                    expires_at,
                });
                tracing::info!("Token exchange succeeded, session authenticated");
                Ok(())
            }
            Err(e) => {
                session.set(SessionState::anonymous());
                tracing::warn!("Token exchange failed: {}", e);
                Err(e)
            }
        }
    }

    /// Abort a pending login, returning the session to anonymous
    pub fn fail_login(&self, session: &mut SessionStore, reason: &str) {
        tracing::warn!("Login failed: {}", reason);
        session.set(SessionState::anonymous());
    }

    /// Clear the session from any state
    pub fn logout(&self, session: &mut SessionStore) {
        session.set(SessionState::anonymous());
        tracing::info!("Logged out");
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let mut params = vec![
            ("client_id", self.oauth.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let scope = SCOPES.join(" ");
        params.push(("scope", scope.as_str()));
        if let Some(secret) = &self.oauth.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| TriageError::AuthError(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TriageError::AuthError(format!(
                "Token exchange failed: HTTP {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| TriageError::AuthError(format!("Malformed token response: {}", e)))
    }
}

/// Blocking loopback listener for the authorization redirect
fn listen_for_code(
    redirect_uri: &str,
    expected_state: &str,
    timeout: Duration,
) -> Result<AuthorizationCode> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| TriageError::ConfigError(format!("Invalid redirect_uri: {}", e)))?;

    let host = redirect
        .host_str()
        .ok_or_else(|| TriageError::ConfigError("redirect_uri missing host".to_string()))?
        .to_string();
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| TriageError::ConfigError("redirect_uri missing port".to_string()))?;

    let bind_ip: IpAddr = match host.as_str() {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse().map_err(|_| {
            TriageError::ConfigError(format!(
                "redirect_uri host must be localhost/127.0.0.1 or an IP: {}",
                other
            ))
        })?,
    };
    let bind_addr = SocketAddr::new(bind_ip, port);

    // Bind before the browser opens so the redirect cannot race the listener
    let server = Server::http(bind_addr).map_err(|e| {
        TriageError::NetworkError(format!(
            "Failed to bind redirect listener on {}: {}",
            bind_addr, e
        ))
    })?;

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };

        let full = format!("http://{}:{}{}", host, port, request.url());
        let Ok(parsed) = Url::parse(&full) else {
            let _ = request.respond(Response::from_string("Bad redirect"));
            continue;
        };

        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut error_description = None;
        for (k, v) in parsed.query_pairs() {
            match k.as_ref() {
                "code" => code = Some(v.into_owned()),
                "state" => state = Some(v.into_owned()),
                "error" => error = Some(v.into_owned()),
                "error_description" => error_description = Some(v.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            let _ = request.respond(Response::from_string(
                "Sign-in was not completed. You can close this tab.",
            ));
            let detail = error_description.unwrap_or_default();
            return Err(TriageError::AuthError(format!(
                "Provider returned {}: {}",
                error, detail
            )));
        }

        match (code, state) {
            (Some(code), Some(state)) if state == expected_state => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                return Ok(AuthorizationCode(code));
            }
            (Some(_), _) => {
                let _ = request.respond(Response::from_string(
                    "State mismatch. You can close this tab.",
                ));
                return Err(TriageError::AuthError(
                    "Redirect state mismatch (possible CSRF)".to_string(),
                ));
            }
            _ => {
                let _ = request.respond(Response::from_string(
                    "No authorization code in redirect. You can close this tab.",
                ));
            }
        }
    }

    Err(TriageError::AuthError(
        "Timed out waiting for the provider redirect".to_string(),
    ))
}
