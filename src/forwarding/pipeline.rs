//! One-pass orchestrator - load checkpoint, fetch, normalize, filter,
//! select, deliver, advance checkpoint

use crate::forwarding::checkpoint::CheckpointStore;
use crate::forwarding::dispatch::{self, DealSink};
use crate::forwarding::fetch::SourceFetcher;
use crate::forwarding::filter::eligible_date;
use crate::forwarding::normalize::normalize;
use crate::forwarding::types::{EligibleRow, RunSummary};
use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

/// Run the whole forwarding pass once, strictly in sequence.
///
/// Only the export fetch (and a malformed export header) can fail the run.
/// Checkpoint reads fail open, individual deliveries fail soft, and the
/// checkpoint save failure is swallowed after logging, so the caller sees
/// `Ok` for every outcome where dispatch was attempted.
///
/// Policy: the checkpoint advances to the newest selected date even when
/// some or all deliveries failed. Failed rows are not retried on the next
/// run.
pub async fn run(
    checkpoints: &CheckpointStore,
    source: &SourceFetcher,
    sink: &dyn DealSink,
    today: NaiveDate,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    // Step 1: last forwarded purchase date, if any
    let last_sent = checkpoints.load().await;
    if let Some(last_sent) = last_sent {
        info!("Checkpoint loaded: {}", last_sent);
    }
    summary.checkpoint = last_sent;

    // Step 2: fetch the export (fatal on failure)
    let text = source.fetch().await?;

    // Step 3: normalize into customer/deal pairs
    let (pairs, parse_errors) = normalize(&text)?;
    summary.rows_parsed = pairs.len();
    summary.parse_errors = parse_errors;

    // Step 4: keep rows inside the forwarding window
    let eligible: Vec<EligibleRow> = pairs
        .into_iter()
        .filter_map(|(customer, deal)| {
            eligible_date(&deal, today).map(|purchase_date| EligibleRow {
                purchase_date,
                customer,
                deal,
            })
        })
        .collect();
    summary.eligible = eligible.len();

    if eligible.is_empty() {
        info!("No eligible rows found");
        return Ok(summary);
    }

    // Step 5: order and select against the checkpoint
    let to_send = dispatch::select_for_dispatch(eligible, last_sent);
    summary.selected = to_send.len();

    match last_sent {
        None => info!("No checkpoint found, sending the newest row"),
        Some(last_sent) => info!(
            "Filtered rows against checkpoint {}: {} to send",
            last_sent,
            to_send.len()
        ),
    }

    if to_send.is_empty() {
        info!("No new data to send");
        return Ok(summary);
    }

    // Step 6: deliver, best-effort per row
    summary.stats = dispatch::send_all(sink, &to_send).await;

    // Step 7: advance the checkpoint to the newest selected date, delivery
    // failures included
    if let Some(newest) = to_send.last() {
        checkpoints.save(newest.purchase_date).await;
        summary.checkpoint = Some(newest.purchase_date);
    }

    Ok(summary)
}
