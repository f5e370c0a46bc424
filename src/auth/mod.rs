//! Session manager: login against the token endpoint and template
//! finalization.
//!
//! The session is never held only in memory. Every successful login rewrites
//! the request-template store on disk, so a restarted process resumes issuing
//! purchases with the last-known token and re-validates it by reacting to a
//! live 401 rather than logging in eagerly.

pub mod credentials;

pub use credentials::CredentialStore;

use crate::error::AuthError;
use crate::templates::RequestTemplates;
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

const CLIENT_ID_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    access_token: String,
}

pub struct SessionManager {
    auth_url: String,
    templates_path: PathBuf,
    client: Client,
}

impl SessionManager {
    pub fn new(auth_url: impl Into<String>, templates_path: PathBuf, client: Client) -> Self {
        Self {
            auth_url: auth_url.into(),
            templates_path,
            client,
        }
    }

    /// Perform a password-grant login and finalize the request templates.
    ///
    /// On HTTP failure nothing is written to disk. On success the template
    /// store is rewritten with the fresh bearer token and the literal user id
    /// substituted into every URL pattern; fields the login step does not own
    /// are copied through unchanged.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let client_id = random_client_id();
        let form = [
            ("username", username),
            ("password", password),
            ("grant_type", "password"),
            ("client_id", client_id.as_str()),
            ("extend_exp", "true"),
        ];

        // The token endpoint gets the bare header variant, never a stale
        // bearer token.
        let templates = RequestTemplates::load(&self.templates_path)
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let mut request = self.client.post(&self.auth_url).form(&form);
        for (name, value) in &templates.token_header {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Token endpoint rejected login: HTTP {status}");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(AuthError::MalformedResponse("access_token"));
        }
        if token.user_id.is_empty() {
            return Err(AuthError::MalformedResponse("user_id"));
        }

        self.persist_session(&token.access_token, &token.user_id)?;
        debug!("Login successful for user {}", token.user_id);

        Ok(Session {
            user_id: token.user_id,
            access_token: token.access_token,
        })
    }

    /// Same routine as [`SessionManager::login`], invoked automatically when a
    /// live request comes back unauthorized. Callers must re-read the
    /// credential store immediately beforehand; it is the single source of
    /// truth for the remembered pair.
    pub async fn reauthenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        debug!("Re-authenticating after an unauthorized response");
        self.login(username, password).await
    }

    fn persist_session(&self, access_token: &str, user_id: &str) -> Result<(), AuthError> {
        let mut templates = RequestTemplates::load(&self.templates_path)
            .map_err(|e| AuthError::Persist(e.to_string()))?;
        templates.finalize(access_token, user_id);
        templates
            .save(&self.templates_path)
            .map_err(|e| AuthError::Persist(e.to_string()))
    }
}

/// Random 32-character alphanumeric client identifier, regenerated per login.
fn random_client_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CLIENT_ID_LEN)
        .map(char::from)
        .collect()
}
