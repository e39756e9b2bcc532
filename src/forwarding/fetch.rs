//! Fetch functions - retrieve the raw customer/deal export

use crate::storage::ObjectStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::info;

pub struct SourceFetcher {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl SourceFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Fetch the full export as text. Unlike the checkpoint, a missing or
    /// unreadable export is fatal: there is nothing useful a run can do
    /// without its input.
    pub async fn fetch(&self) -> Result<String> {
        info!("Fetching export object {}", self.key);

        let text = self
            .store
            .get_text(&self.key)
            .await?
            .ok_or_else(|| anyhow!("Export object {} does not exist", self.key))?;

        info!("Fetched {} bytes", text.len());
        Ok(text)
    }
}
