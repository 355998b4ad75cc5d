//! Confirmation watches
//!
//! Every submitted hash gets exactly one watch. A watch ends when the
//! receipt resolves or when the local status view is reset; resetting never
//! affects the transaction on chain.

use std::time::{Duration, Instant};

use serde::Serialize;
use usdec::TxKind;
use usdec_core::{TokenAmount, TxHash};

struct WatchItem {
    id: String,
    hash: TxHash,
    kind: TxKind,
    amount: TokenAmount,
    submitted_at: Instant,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WatchedItemInfo {
    pub id: String,
    pub hash: String,
    pub kind: TxKind,
    pub amount: String,
    pub elapsed_secs: u64,
}

/// How a watch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Confirmed,
    Reverted,
    Dropped,
    /// Local view reset; the transaction may still confirm
    Released,
}

impl WatchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Reverted => "reverted",
            Self::Dropped => "dropped",
            Self::Released => "released",
        }
    }
}

#[derive(Default)]
pub struct TxWatcher {
    items: Vec<WatchItem>,
}

impl TxWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching `hash`. Returns the watch id, or `None` if the hash
    /// is already watched.
    pub fn watch(&mut self, hash: TxHash, kind: TxKind, amount: TokenAmount) -> Option<String> {
        if self.is_watching(&hash) {
            tracing::warn!(hash = %hash, "Hash already has a confirmation watch");
            return None;
        }
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(hash = %hash, kind = %kind, id = %id, "Watching transaction");
        self.items.push(WatchItem {
            id: id.clone(),
            hash,
            kind,
            amount,
            submitted_at: Instant::now(),
        });
        Some(id)
    }

    pub fn is_watching(&self, hash: &TxHash) -> bool {
        self.items.iter().any(|item| &item.hash == hash)
    }

    /// End the watch for `hash`; false if there was none
    pub fn resolve(&mut self, hash: &TxHash, outcome: WatchOutcome) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.hash != hash);
        let removed = self.items.len() != before;
        if removed {
            tracing::debug!(hash = %hash, outcome = outcome.as_str(), "Watch resolved");
        }
        removed
    }

    pub fn elapsed(&self, hash: &TxHash) -> Option<Duration> {
        self.items
            .iter()
            .find(|item| &item.hash == hash)
            .map(|item| item.submitted_at.elapsed())
    }

    /// Time left before the status view for `hash` may be reset.
    ///
    /// `Some(ZERO)` once eligible, `None` if not watched.
    pub fn reset_remaining(&self, hash: &TxHash, reset_after: Duration) -> Option<Duration> {
        self.elapsed(hash)
            .map(|elapsed| reset_after.saturating_sub(elapsed))
    }

    pub fn watched_items(&self) -> Vec<WatchedItemInfo> {
        self.items
            .iter()
            .map(|item| WatchedItemInfo {
                id: item.id.clone(),
                hash: item.hash.to_string(),
                kind: item.kind,
                amount: item.amount.to_string(),
                elapsed_secs: item.submitted_at.elapsed().as_secs(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
