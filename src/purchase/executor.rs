//! Finite and bulk purchase executors.
//!
//! Attempts are strictly sequential with a fixed pause after every attempt,
//! whatever the outcome, to stay under server-side rate limiting. The
//! cancellation token is checked at the top of each iteration only; an
//! in-flight request always completes.

use super::{AttemptOutcome, ProgressSink, PurchasePayload};
use crate::catalog::PurchasableItem;
use crate::error::ConfigError;
use crate::templates::RequestTemplates;
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const ATTEMPT_PAUSE: Duration = Duration::from_millis(500);

/// What happened to a finished job; lets the caller tear down transient UI
/// state and is the only synchronization besides the sink and the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub attempted: u64,
    pub succeeded: u64,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct PurchaseExecutor {
    client: Client,
    buy_url: String,
    headers: BTreeMap<String, String>,
    pause: Duration,
}

impl PurchaseExecutor {
    /// Snapshot the buy URL and headers from the template store. The store is
    /// read once at job start and treated as read-mostly afterwards.
    pub fn from_templates(
        client: Client,
        templates: &RequestTemplates,
    ) -> Result<Self, ConfigError> {
        if templates.url_buy_products.url.is_empty() {
            return Err(ConfigError::MissingTemplate("url_buy_products.url"));
        }
        if templates.headers.is_empty() {
            return Err(ConfigError::MissingTemplate("headers"));
        }
        Ok(Self {
            client,
            buy_url: templates.url_buy_products.url.clone(),
            headers: templates.headers.clone(),
            pause: ATTEMPT_PAUSE,
        })
    }

    /// Shorten the inter-attempt pause; tests run with zero.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Buy one item `repeat` times. Exactly one progress event per attempt;
    /// once the token is cancelled no further attempts run and no further
    /// events are reported.
    pub async fn run_finite(
        &self,
        item: &PurchasableItem,
        repeat: u32,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> JobSummary {
        let payload = PurchasePayload::from(item);
        let mut summary = JobSummary {
            attempted: 0,
            succeeded: 0,
            cancelled: false,
        };

        for seq in 1..=u64::from(repeat) {
            if cancel.is_cancelled() {
                debug!("Purchase process stopped by user.");
                summary.cancelled = true;
                break;
            }
            debug!("Purchasing slot {seq} out of {repeat}.");

            let outcome = self.attempt(&payload).await;
            summary.attempted += 1;
            match outcome {
                AttemptOutcome::Success => {
                    summary.succeeded += 1;
                    progress.report(&format!(
                        "Purchased slot {seq} of {repeat} successfully."
                    ));
                }
                AttemptOutcome::Http { status, body } => {
                    error!("Error purchasing item (HTTP {status}): {body}");
                    progress.report(&format!("Error purchasing slot {seq}: {body}"));
                }
                AttemptOutcome::Network(e) => {
                    error!("Network error purchasing item {}: {e}", item.item_id);
                    progress.report(&format!("Network error purchasing slot {seq}: {e}"));
                }
            }

            sleep(self.pause).await;
        }

        summary
    }

    /// Traverse the full catalog slice `repeat` times in order. The counter
    /// advances on every attempt, success or failure; cancellation is checked
    /// before each item, never mid-item.
    pub async fn run_bulk(
        &self,
        items: &[PurchasableItem],
        repeat: u32,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> JobSummary {
        let total = items.len() as u64 * u64::from(repeat);
        let mut summary = JobSummary {
            attempted: 0,
            succeeded: 0,
            cancelled: false,
        };

        'rounds: for _ in 0..repeat {
            for item in items {
                if cancel.is_cancelled() {
                    debug!("Purchase process stopped by user.");
                    summary.cancelled = true;
                    break 'rounds;
                }
                debug!("Buying item: {} (Item ID: {})", item.name, item.item_id);

                let outcome = self.attempt(&PurchasePayload::from(item)).await;
                summary.attempted += 1;
                let count = summary.attempted;
                match outcome {
                    AttemptOutcome::Success => {
                        summary.succeeded += 1;
                        progress.report(&format!("Purchased item {count} of {total}."));
                    }
                    AttemptOutcome::Http { status, body } => {
                        error!(
                            "Error purchasing item {} (HTTP {status}): {body}",
                            item.item_id
                        );
                        progress.report(&format!("Error purchasing item {count}: {body}"));
                    }
                    AttemptOutcome::Network(e) => {
                        error!("Network error purchasing item {}: {e}", item.item_id);
                        progress.report(&format!("Network error purchasing item {count}: {e}"));
                    }
                }

                sleep(self.pause).await;
            }
        }

        progress.report(&format!(
            "Purchased {} of {total} items.",
            summary.attempted
        ));
        summary
    }

    async fn attempt(&self, payload: &PurchasePayload) -> AttemptOutcome {
        let mut request = self.client.post(&self.buy_url).json(payload);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::CREATED {
                    AttemptOutcome::Success
                } else {
                    let body = response.text().await.unwrap_or_default();
                    AttemptOutcome::Http {
                        status: status.as_u16(),
                        body,
                    }
                }
            }
            Err(e) => AttemptOutcome::Network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::progress::testing::RecordingSink;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paint() -> PurchasableItem {
        PurchasableItem {
            name: "Red Paint".into(),
            item_id: "a1".into(),
            price: 100,
            currency: "CASH".into(),
        }
    }

    fn executor(url: String) -> PurchaseExecutor {
        let mut templates = RequestTemplates::default();
        templates.url_buy_products.url = url;
        templates
            .headers
            .insert("Authorization".into(), "Bearer tok".into());
        PurchaseExecutor::from_templates(Client::new(), &templates)
            .unwrap()
            .with_pause(Duration::ZERO)
    }

    #[test]
    fn missing_buy_url_is_a_config_error() {
        let mut templates = RequestTemplates::default();
        templates.headers.insert("Accept".into(), "*/*".into());
        let err = PurchaseExecutor::from_templates(Client::new(), &templates).unwrap_err();
        assert!(err.to_string().contains("url_buy_products.url"));
    }

    #[tokio::test]
    async fn finite_run_issues_exactly_n_attempts_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/buy"))
            .and(body_json(serde_json::json!({
                "itemId": "a1",
                "price": 100,
                "discountedPrice": 100,
                "currencyCode": "CASH"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let sink = RecordingSink::default();
        let summary = executor(format!("{}/buy", server.uri()))
            .run_finite(&paint(), 2, &sink, &CancellationToken::new())
            .await;

        assert_eq!(
            sink.lines(),
            vec![
                "Purchased slot 1 of 2 successfully.",
                "Purchased slot 2 of 2 successfully.",
            ]
        );
        assert_eq!(
            summary,
            JobSummary {
                attempted: 2,
                succeeded: 2,
                cancelled: false
            }
        );
    }

    #[tokio::test]
    async fn finite_run_reports_error_body_verbatim_and_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_string("Insufficient funds"))
            .mount(&server)
            .await;

        let sink = RecordingSink::default();
        let summary = executor(server.uri())
            .run_finite(&paint(), 3, &sink, &CancellationToken::new())
            .await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 0);
        assert!(!summary.cancelled);
        assert_eq!(
            sink.lines()[0],
            "Error purchasing slot 1: Insufficient funds"
        );
    }

    #[tokio::test]
    async fn finite_run_survives_transport_failures() {
        // Nothing listens on port 1; every attempt is a connection failure.
        let sink = RecordingSink::default();
        let summary = executor("http://127.0.0.1:1/buy".into())
            .run_finite(&paint(), 2, &sink, &CancellationToken::new())
            .await;

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 0);
        assert!(sink.lines()[0].starts_with("Network error purchasing slot 1:"));
        assert!(sink.lines()[1].starts_with("Network error purchasing slot 2:"));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_separated_by_the_fixed_pause() {
        // Nothing listens on port 1, so every attempt fails immediately and
        // only the inter-attempt pauses advance the virtual clock.
        let mut templates = RequestTemplates::default();
        templates.url_buy_products.url = "http://127.0.0.1:1/buy".into();
        templates
            .headers
            .insert("Authorization".into(), "Bearer tok".into());
        let executor = PurchaseExecutor::from_templates(Client::new(), &templates).unwrap();

        let started = tokio::time::Instant::now();
        let summary = executor
            .run_finite(&paint(), 3, &RecordingSink::default(), &CancellationToken::new())
            .await;

        assert_eq!(summary.attempted, 3);
        // One pause after every attempt, the last one included.
        assert!(started.elapsed() >= ATTEMPT_PAUSE * 3);
    }

    #[tokio::test]
    async fn cancellation_after_k_attempts_stops_the_loop() {
        struct CancelAfter {
            inner: RecordingSink,
            cancel: CancellationToken,
            after: usize,
        }
        impl ProgressSink for CancelAfter {
            fn report(&self, status: &str) {
                self.inner.report(status);
                if self.inner.lines().len() >= self.after {
                    self.cancel.cancel();
                }
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let sink = CancelAfter {
            inner: RecordingSink::default(),
            cancel: cancel.clone(),
            after: 2,
        };

        let summary = executor(server.uri())
            .run_finite(&paint(), 10, &sink, &cancel)
            .await;

        assert_eq!(summary.attempted, 2);
        assert!(summary.cancelled);
        assert_eq!(sink.inner.lines().len(), 2);
    }

    #[tokio::test]
    async fn bulk_total_counts_failures_too() {
        let server = MockServer::start().await;
        // "a1" purchases succeed, everything else is rejected.
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "itemId": "a1",
                "price": 100,
                "discountedPrice": 100,
                "currencyCode": "CASH"
            })))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server broke"))
            .mount(&server)
            .await;

        let items = vec![
            paint(),
            PurchasableItem {
                name: "Blue Paint".into(),
                item_id: "a2".into(),
                price: 150,
                currency: "CASH".into(),
            },
        ];

        let sink = RecordingSink::default();
        let summary = executor(server.uri())
            .run_bulk(&items, 2, &sink, &CancellationToken::new())
            .await;

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.succeeded, 2);
        let lines = sink.lines();
        // 4 per-attempt events plus the terminal count.
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Purchased item 1 of 4.");
        assert_eq!(lines[1], "Error purchasing item 2: server broke");
        assert_eq!(lines[4], "Purchased 4 of 4 items.");
    }

    #[tokio::test]
    async fn bulk_cancellation_is_checked_per_item() {
        struct CancelImmediately(CancellationToken);
        impl ProgressSink for CancelImmediately {
            fn report(&self, _: &str) {
                self.0.cancel();
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let items = vec![paint(), paint(), paint()];
        let summary = executor(server.uri())
            .run_bulk(&items, 5, &CancelImmediately(cancel.clone()), &cancel)
            .await;

        assert_eq!(summary.attempted, 1);
        assert!(summary.cancelled);
    }
}
