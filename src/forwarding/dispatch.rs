//! Dispatch sequencer - order eligible rows, pick what is new since the
//! checkpoint, and deliver each payload to the webhook

use crate::forwarding::types::{DispatchPayload, EligibleRow, SendStats};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Webhook calls are bounded; a hung receiver must not hang the run.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Order rows by purchase date and keep the ones to deliver.
///
/// With no checkpoint only the single newest row goes out, so a first run
/// against a full export does not flood the receiver. With a checkpoint,
/// everything strictly newer goes out in ascending date order. The sort is
/// stable, so equal dates keep their export order.
pub fn select_for_dispatch(
    mut rows: Vec<EligibleRow>,
    last_sent: Option<NaiveDate>,
) -> Vec<EligibleRow> {
    rows.sort_by_key(|row| row.purchase_date);

    match last_sent {
        None => rows.pop().into_iter().collect(),
        Some(last_sent) => rows
            .into_iter()
            .filter(|row| row.purchase_date > last_sent)
            .collect(),
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("webhook returned status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Where selected payloads go. The production implementation is
/// `WebhookClient`; tests substitute capturing or failing sinks.
#[async_trait]
pub trait DealSink: Send + Sync {
    async fn send(&self, payload: &DispatchPayload) -> Result<(), SendError>;
}

/// HTTP POST sink with a fixed per-request timeout
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DealSink for WebhookClient {
    async fn send(&self, payload: &DispatchPayload) -> Result<(), SendError> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status));
        }

        Ok(())
    }
}

/// Deliver every row, one POST each, in the order given.
///
/// Delivery is best-effort and independent per payload: a failed send is
/// logged with the row's purchase date and the loop moves on. Callers must
/// not gate checkpoint advancement on the returned failure count.
pub async fn send_all(sink: &dyn DealSink, rows: &[EligibleRow]) -> SendStats {
    let mut stats = SendStats::default();

    for row in rows {
        let payload = row.to_payload();
        match sink.send(&payload).await {
            Ok(()) => {
                info!(
                    "Sent deal {} to webhook (purchase_date: {})",
                    row.deal.deal_id, row.purchase_date
                );
                stats.sent += 1;
            }
            Err(e) => {
                error!(
                    "Failed to send deal {} to webhook (purchase_date: {}): {}",
                    row.deal.deal_id, row.purchase_date, e
                );
                stats.failed += 1;
            }
        }
    }

    info!("Delivery complete: {}", stats);

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::types::{CustomerRecord, DealRecord};
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(deal_id: &str, date: NaiveDate) -> EligibleRow {
        EligibleRow {
            purchase_date: date,
            customer: CustomerRecord {
                customer_id: format!("C-{deal_id}"),
                ..CustomerRecord::default()
            },
            deal: DealRecord {
                deal_id: deal_id.to_string(),
                purchase_date: date.format("%m/%d/%Y").to_string(),
                ..DealRecord::default()
            },
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct CapturingSink {
        payloads: Mutex<Vec<DispatchPayload>>,
    }

    impl CapturingSink {
        fn new() -> Self {
            Self {
                payloads: Mutex::new(Vec::new()),
            }
        }

        fn payloads(&self) -> Vec<DispatchPayload> {
            self.payloads.lock().expect("poisoned mutex").clone()
        }
    }

    #[async_trait]
    impl DealSink for CapturingSink {
        async fn send(&self, payload: &DispatchPayload) -> Result<(), SendError> {
            self.payloads
                .lock()
                .expect("poisoned mutex")
                .push(payload.clone());
            Ok(())
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl DealSink for RejectingSink {
        async fn send(&self, _payload: &DispatchPayload) -> Result<(), SendError> {
            Err(SendError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_for_dispatch(Vec::new(), None).is_empty());
        assert!(select_for_dispatch(Vec::new(), Some(date(2024, 6, 1))).is_empty());
    }

    #[test]
    fn no_checkpoint_selects_only_the_newest_row() {
        let rows = vec![
            row("D2", date(2024, 6, 15)),
            row("D3", date(2024, 7, 1)),
            row("D1", date(2024, 5, 1)),
        ];

        let selected = select_for_dispatch(rows, None);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].deal.deal_id, "D3");
        assert_eq!(selected[0].purchase_date, date(2024, 7, 1));
    }

    #[test]
    fn checkpoint_selects_strictly_newer_rows_ascending() {
        let rows = vec![
            row("D3", date(2024, 7, 1)),
            row("D1", date(2024, 5, 1)),
            row("D2", date(2024, 6, 15)),
        ];

        let selected = select_for_dispatch(rows, Some(date(2024, 6, 1)));

        let ids: Vec<&str> = selected.iter().map(|r| r.deal.deal_id.as_str()).collect();
        assert_eq!(ids, vec!["D2", "D3"]);
    }

    #[test]
    fn checkpoint_equal_or_newer_than_everything_selects_nothing() {
        let rows = vec![row("D1", date(2024, 6, 15)), row("D2", date(2024, 7, 1))];

        let selected = select_for_dispatch(rows, Some(date(2024, 7, 1)));

        assert!(selected.is_empty());
    }

    #[test]
    fn equal_dates_keep_export_order() {
        let rows = vec![
            row("FIRST", date(2024, 6, 15)),
            row("SECOND", date(2024, 6, 15)),
        ];

        let selected = select_for_dispatch(rows.clone(), Some(date(2024, 6, 1)));
        let ids: Vec<&str> = selected.iter().map(|r| r.deal.deal_id.as_str()).collect();
        assert_eq!(ids, vec!["FIRST", "SECOND"]);

        // First-run narrowing takes the last of the tied group
        let selected = select_for_dispatch(rows, None);
        assert_eq!(selected[0].deal.deal_id, "SECOND");
    }

    #[tokio::test]
    async fn send_all_delivers_in_order() {
        let sink = CapturingSink::new();
        let rows = vec![row("D1", date(2024, 6, 15)), row("D2", date(2024, 7, 1))];

        let stats = send_all(&sink, &rows).await;

        assert_eq!(stats, SendStats { sent: 2, failed: 0 });
        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].deals.deal_id, "D1");
        assert_eq!(payloads[1].deals.deal_id, "D2");
    }

    #[tokio::test]
    async fn a_failed_send_does_not_stop_later_rows() {
        let rows = vec![row("D1", date(2024, 6, 15)), row("D2", date(2024, 7, 1))];

        let stats = send_all(&RejectingSink, &rows).await;

        assert_eq!(stats, SendStats { sent: 0, failed: 2 });
    }

    #[tokio::test]
    async fn webhook_client_posts_payload_as_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hooks/catch"))
            .and(body_partial_json(serde_json::json!({
                "customer_details": { "customer_id": "C-D1" },
                "deals": { "deal_id": "D1" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebhookClient::new(format!("{}/hooks/catch", server.uri())).unwrap();
        let payload = row("D1", date(2024, 6, 15)).to_payload();

        client.send(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn webhook_client_treats_non_success_status_as_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WebhookClient::new(server.uri()).unwrap();
        let payload = row("D1", date(2024, 6, 15)).to_payload();

        match client.send(&payload).await {
            Err(SendError::Status(status)) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => panic!("Expected status error, got {:?}", other.err()),
        }
    }
}
