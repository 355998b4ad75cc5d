//! Recent transaction history for the session

use std::collections::VecDeque;

use serde::Serialize;
use usdec::TxKind;
use usdec_core::{TokenAmount, TxHash};

/// A submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    pub hash: TxHash,
    pub kind: TxKind,
    /// Amount snapshotted at submission
    pub amount: TokenAmount,
    /// Unix seconds
    pub submitted_at: u64,
}

impl TransactionRecord {
    pub fn new(hash: TxHash, kind: TxKind, amount: TokenAmount, submitted_at: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hash,
            kind,
            amount,
            submitted_at,
        }
    }
}

/// Most recent `limit` records; the oldest is evicted first
#[derive(Debug, Clone)]
pub struct TxHistory {
    limit: usize,
    records: VecDeque<TransactionRecord>,
}

impl TxHistory {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            records: VecDeque::with_capacity(limit),
        }
    }

    pub fn push(&mut self, record: TransactionRecord) {
        if self.records.len() == self.limit {
            if let Some(evicted) = self.records.pop_front() {
                tracing::debug!(hash = %evicted.hash, "Evicted oldest history record");
            }
        }
        self.records.push_back(record);
    }

    /// Newest first
    pub fn recent(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().rev()
    }

    /// Newest record of any of `kinds`
    pub fn latest_of(&self, kinds: &[TxKind]) -> Option<&TransactionRecord> {
        self.recent().find(|r| kinds.contains(&r.kind))
    }

    pub fn find(&self, hash: &TxHash) -> Option<&TransactionRecord> {
        self.records.iter().find(|r| &r.hash == hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
