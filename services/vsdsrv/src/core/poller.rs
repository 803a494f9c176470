//! Batch poller
//!
//! Reads a list of register ids inside one lock acquisition, so a concurrent
//! write can never land between two reads of the same batch.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::codec::PointValue;
use super::instrument::{read_descriptor, Instrument};
use crate::error::{Result, VsdError};

/// id → decoded value, or `None` where that id failed
pub type BatchResult = BTreeMap<String, Option<PointValue>>;

impl Instrument {
    /// Read every id in order.
    ///
    /// Per-id failures (unknown id, transaction error) become `None`. A
    /// non-empty batch in which every id failed is `DeviceUnresponsive`.
    pub async fn read_batch(&self, ids: &[String]) -> Result<BatchResult> {
        let mut slot = self.lock().await;
        let session = slot.as_mut().ok_or(VsdError::NotConnected)?;

        let mut results = BatchResult::new();
        if ids.is_empty() {
            return Ok(results);
        }

        let mut success_count = 0usize;
        for id in ids {
            let value = match self.catalog().lookup(id) {
                Ok(desc) => read_descriptor(session, desc).await,
                Err(e) => Err(e),
            };
            match value {
                Ok(value) => {
                    success_count += 1;
                    results.insert(id.clone(), Some(value));
                },
                Err(e) => {
                    debug!("Batch read {} failed: {}", id, e);
                    results.insert(id.clone(), None);
                },
            }
        }

        if success_count == 0 {
            warn!("Batch of {} ids got no answer", ids.len());
            return Err(VsdError::DeviceUnresponsive);
        }
        Ok(results)
    }
}
