//! Checkpoint store - the purchase date of the most recently forwarded deal,
//! persisted as a single-line object in durable storage

use crate::storage::ObjectStore;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

const CHECKPOINT_FORMAT: &str = "%Y-%m-%d";

pub struct CheckpointStore {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The last forwarded purchase date, or `None` when no deal has ever
    /// been forwarded.
    ///
    /// Read failures other than "object missing" also come back as `None`:
    /// the run proceeds as if no checkpoint existed rather than aborting.
    /// A transient storage error can therefore re-forward old data; that is
    /// part of this method's contract.
    pub async fn load(&self) -> Option<NaiveDate> {
        match self.store.get_text(&self.key).await {
            Ok(Some(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    info!("Checkpoint object is empty, treating as no checkpoint");
                    return None;
                }
                match NaiveDate::parse_from_str(text, CHECKPOINT_FORMAT) {
                    Ok(date) => Some(date),
                    Err(e) => {
                        error!("Error parsing checkpoint value {:?}: {}", text, e);
                        None
                    }
                }
            }
            Ok(None) => {
                info!("No checkpoint object found");
                None
            }
            Err(e) => {
                error!("Error loading checkpoint: {:#}", e);
                None
            }
        }
    }

    /// Persist `date` as the new checkpoint, overwriting any prior value.
    ///
    /// A failed save is logged, not raised: by the time this runs the
    /// dispatches already happened, so the worst case is re-sending them on
    /// the next run.
    pub async fn save(&self, date: NaiveDate) {
        let value = date.format(CHECKPOINT_FORMAT).to_string();
        match self.store.put_text(&self.key, value.clone()).await {
            Ok(()) => {
                info!("Checkpoint saved: {}", value);
            }
            Err(e) => {
                error!("Error saving checkpoint: {:#}", e);
            }
        }
    }
}
