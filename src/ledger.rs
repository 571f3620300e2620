//! Ledger Store for simulated payments
//!
//! Durable record of every simulated payment. The whole ledger lives in
//! memory and is rewritten to a flat JSON file on every append; the file is
//! read back in full at startup. One mutex serializes append-and-flush
//! globally. This models a simulation, not a real ledger: a flush failure is
//! reported to the caller but the in-memory record stays visible for the
//! rest of the process lifetime.

use crate::error::{AssistantError, Result};
use crate::models::PaymentRecord;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

pub struct PaymentLedger {
    path: PathBuf,
    records: Mutex<Vec<PaymentRecord>>,
}

impl PaymentLedger {
    /// Open the ledger, reading any previously flushed records. A missing
    /// file starts an empty ledger; an unreadable or corrupt file is
    /// logged and treated the same way.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<PaymentRecord>>(&bytes) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Ledger file {} is not valid JSON, starting empty: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Could not read ledger file {}, starting empty: {}", path.display(), e);
                Vec::new()
            }
        };

        Self {
            path,
            records: Mutex::new(records),
        }
    }

    /// Append a payment record and flush the full ledger to disk before
    /// returning. On flush failure the record is already in memory and the
    /// error is returned for the caller to log.
    pub async fn append(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        records.push(record);

        let json = serde_json::to_string_pretty(&*records)
            .map_err(|e| AssistantError::Persistence(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| AssistantError::Persistence(e.to_string()))
    }

    /// Real balance minus the sum of all completed simulated payments.
    /// Recomputed on every call, never cached.
    pub async fn adjusted_balance(&self, real_balance: f64) -> f64 {
        let records = self.records.lock().await;
        let total: f64 = records
            .iter()
            .filter(|r| r.status == "completed")
            .map(|r| r.amount)
            .sum();
        real_balance - total
    }

    /// Last `count` records in insertion order (oldest first). Used for
    /// general payment history.
    pub async fn history(&self, count: usize) -> Vec<PaymentRecord> {
        let records = self.records.lock().await;
        let start = records.len().saturating_sub(count);
        records[start..].to_vec()
    }

    /// Last `count` records newest first.
    pub async fn recent(&self, count: usize) -> Vec<PaymentRecord> {
        let mut recent = self.history(count).await;
        recent.reverse();
        recent
    }

    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }
}
