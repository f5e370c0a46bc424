//! Continuous top-up loop (subscription-style farming).
//!
//! Repeats an idempotent PUT against a fixed endpoint/payload pair until
//! cancelled. A 401 triggers exactly one re-authentication and one retry of
//! the same request; every other failure is reported and the loop keeps
//! going. The inter-iteration wait is the loop's only suspension point and
//! wakes early when the cancellation token fires.

use super::{JobSummary, ProgressSink};
use crate::auth::{CredentialStore, SessionManager};
use crate::error::ConfigError;
use crate::templates::RequestTemplates;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const ITERATION_WAIT: Duration = Duration::from_secs(10);

/// One farmable endpoint/payload pair from the template store.
#[derive(Debug, Clone)]
pub struct FarmTarget {
    pub label: &'static str,
    url: String,
    payload: Value,
}

impl FarmTarget {
    pub fn money(templates: &RequestTemplates) -> Result<Self, ConfigError> {
        if templates.url_buy.url_money.is_empty() {
            return Err(ConfigError::MissingTemplate("url_buy.url_money"));
        }
        Ok(Self {
            label: "money",
            url: templates.url_buy.url_money.clone(),
            payload: templates.payload_money.clone(),
        })
    }

    pub fn cstacks(templates: &RequestTemplates) -> Result<Self, ConfigError> {
        if templates.url_buy.url_cstacks.is_empty() {
            return Err(ConfigError::MissingTemplate("url_buy.url_cstacks"));
        }
        Ok(Self {
            label: "c-stacks",
            url: templates.url_buy.url_cstacks.clone(),
            payload: templates.payload_cstacks.clone(),
        })
    }
}

enum IterationOutcome {
    Success { balance: String },
    Unauthorized { body: String },
    Http { body: String },
    Network(String),
}

pub struct ContinuousLoop {
    client: Client,
    target: FarmTarget,
    headers: BTreeMap<String, String>,
    session: SessionManager,
    credentials: CredentialStore,
    interval: Duration,
}

impl ContinuousLoop {
    pub fn new(
        client: Client,
        target: FarmTarget,
        templates: &RequestTemplates,
        session: SessionManager,
        credentials: CredentialStore,
    ) -> Result<Self, ConfigError> {
        if templates.headers.is_empty() {
            return Err(ConfigError::MissingTemplate("headers"));
        }
        Ok(Self {
            client,
            target,
            headers: templates.headers.clone(),
            session,
            credentials,
            interval: ITERATION_WAIT,
        })
    }

    /// Shorten the inter-iteration wait; tests run with zero.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the token is cancelled. Reports one status line per
    /// iteration and a terminal "stopped" line on exit.
    pub async fn run(
        &mut self,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> JobSummary {
        let mut summary = JobSummary {
            attempted: 0,
            succeeded: 0,
            cancelled: false,
        };

        while !cancel.is_cancelled() {
            summary.attempted += 1;
            let seq = summary.attempted;
            debug!("Purchasing slot {seq}.");

            match self.attempt().await {
                IterationOutcome::Success { balance } => {
                    summary.succeeded += 1;
                    progress.report(&format!(
                        "Purchase {seq} successful. Total balance: {balance}"
                    ));
                }
                IterationOutcome::Unauthorized { .. } => {
                    warn!("Token expired, attempting re-login.");
                    if self.reauthenticate_and_retry(seq, progress).await {
                        summary.succeeded += 1;
                    }
                }
                IterationOutcome::Http { body } => {
                    error!("Error purchasing item: {body}");
                    progress.report(&format!("Error: {body}"));
                }
                IterationOutcome::Network(e) => {
                    error!("Network error: {e}");
                    progress.report(&format!("Network error: {e}"));
                }
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = sleep(self.interval) => {}
            }
        }

        summary.cancelled = true;
        debug!("Purchase process stopped.");
        progress.report("Purchase process stopped.");
        summary
    }

    /// One-shot recovery: refresh the token from stored credentials and retry
    /// the same request exactly once. A second rejection is reported, never
    /// retried; nothing here stops the loop.
    async fn reauthenticate_and_retry(&mut self, seq: u64, progress: &dyn ProgressSink) -> bool {
        let Some((username, password)) = self.credentials.load() else {
            error!("No stored credentials found for re-login.");
            progress.report("No credentials found for re-login.");
            return false;
        };

        match self.session.reauthenticate(&username, &password).await {
            Ok(session) => {
                self.headers.insert(
                    "Authorization".to_string(),
                    format!("Bearer {}", session.access_token),
                );
                debug!("Retrying purchase after re-login.");
                match self.attempt().await {
                    IterationOutcome::Success { balance } => {
                        progress.report(&format!(
                            "Purchase {seq} successful. Total balance: {balance}"
                        ));
                        true
                    }
                    IterationOutcome::Unauthorized { body }
                    | IterationOutcome::Http { body } => {
                        error!("Error after re-login: {body}");
                        progress.report(&format!("Error after re-login: {body}"));
                        false
                    }
                    IterationOutcome::Network(e) => {
                        error!("Network error: {e}");
                        progress.report(&format!("Network error: {e}"));
                        false
                    }
                }
            }
            Err(e) => {
                error!("Re-login failed: {e}");
                progress.report("Re-login failed.");
                false
            }
        }
    }

    async fn attempt(&self) -> IterationOutcome {
        let mut request = self.client.put(&self.target.url).json(&self.target.payload);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if status == StatusCode::OK {
                    IterationOutcome::Success {
                        balance: extract_balance(&body),
                    }
                } else if status == StatusCode::UNAUTHORIZED {
                    IterationOutcome::Unauthorized { body }
                } else {
                    IterationOutcome::Http { body }
                }
            }
            Err(e) => IterationOutcome::Network(e.to_string()),
        }
    }
}

fn extract_balance(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("balance") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "Unknown balance".to_string())
}
