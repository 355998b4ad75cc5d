//! USDEC Balance/Status Reading
//!
//! Reads balances and the vault preview for the connected address and keeps
//! the latest values in a `watch` channel. Display values may be stale;
//! decisions that need a fresh value (allowance, preview) read directly.

use std::sync::Arc;
use std::time::Duration;

use chain_client::{read_amount, ChainClient};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use usdec_core::{Address, ChainError, TokenAmount};

use crate::constants::ContractAddresses;
use crate::tx_builder::{balance_call, preview_call};

/// Cached read: loading, failed, or loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum ReadState<T> {
    #[default]
    Loading,
    Error(String),
    Value(T),
}

impl<T> ReadState<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl<T> From<Result<T, ChainError>> for ReadState<T> {
    fn from(result: Result<T, ChainError>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// Vault preview for a given deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewQuote {
    pub assets: TokenAmount,
    pub shares: ReadState<TokenAmount>,
}

/// Latest known chain state for one owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub owner: Option<Address>,
    pub usdc: ReadState<TokenAmount>,
    pub usdec: ReadState<TokenAmount>,
    pub preview: Option<PreviewQuote>,
}

/// What the poller should read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollTarget {
    pub owner: Option<Address>,
    /// Net deposit to preview, if any
    pub preview_assets: Option<TokenAmount>,
}

/// Render a balance: `Loading…`, `Error`, or the amount at `dp` places
pub fn display_balance(state: &ReadState<TokenAmount>, decimals: u8, dp: u8) -> String {
    match state {
        ReadState::Loading => "Loading…".to_string(),
        ReadState::Error(_) => "Error".to_string(),
        ReadState::Value(amount) => amount.to_fixed(decimals, dp),
    }
}

/// `token.balanceOf(owner)`
pub async fn fetch_balance(
    client: &dyn ChainClient,
    token: &Address,
    owner: &Address,
) -> Result<TokenAmount, ChainError> {
    read_amount(client, &balance_call(token, owner)).await
}

/// Shares the vault would mint for a deposit of `net`
pub async fn fetch_preview_shares(
    client: &dyn ChainClient,
    contracts: &ContractAddresses,
    net: &TokenAmount,
) -> Result<TokenAmount, ChainError> {
    read_amount(client, &preview_call(contracts, net)).await
}

/// Polls balances and the vault preview, publishing snapshots
pub struct BalanceReader {
    client: Arc<dyn ChainClient>,
    contracts: ContractAddresses,
    snapshot: watch::Sender<BalanceSnapshot>,
}

impl BalanceReader {
    pub fn new(client: Arc<dyn ChainClient>, contracts: ContractAddresses) -> Self {
        let (snapshot, _) = watch::channel(BalanceSnapshot::default());
        Self {
            client,
            contracts,
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceSnapshot> {
        self.snapshot.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> BalanceSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Read everything for `target` once and publish the result
    pub async fn refresh(&self, target: &PollTarget) -> BalanceSnapshot {
        let Some(owner) = &target.owner else {
            let empty = BalanceSnapshot::default();
            self.snapshot.send_replace(empty.clone());
            return empty;
        };

        let client = self.client.as_ref();
        let preview_assets = target
            .preview_assets
            .as_ref()
            .filter(|_| self.contracts.vault_supports_preview);

        let (usdc, usdec, shares) = futures::join!(
            fetch_balance(client, &self.contracts.usdc, owner),
            fetch_balance(client, &self.contracts.usdec, owner),
            async {
                match preview_assets {
                    Some(assets) => {
                        Some(fetch_preview_shares(client, &self.contracts, assets).await)
                    }
                    None => None,
                }
            }
        );

        if let Err(e) = &usdc {
            tracing::warn!(owner = %owner, error = %e, "USDC balance read failed");
        }
        if let Err(e) = &usdec {
            tracing::warn!(owner = %owner, error = %e, "USDEC balance read failed");
        }

        let snapshot = BalanceSnapshot {
            owner: Some(owner.clone()),
            usdc: usdc.into(),
            usdec: usdec.into(),
            preview: preview_assets.zip(shares).map(|(assets, shares)| PreviewQuote {
                assets: assets.clone(),
                shares: shares.into(),
            }),
        };
        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    /// Refresh every `interval` and whenever `target` changes.
    ///
    /// The loop ends when the target sender is dropped.
    pub fn spawn_polling(
        self: Arc<Self>,
        interval: Duration,
        mut target: watch::Receiver<PollTarget>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = target.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let current = target.borrow_and_update().clone();
                self.refresh(&current).await;
            }
            tracing::debug!("Balance poll loop stopped");
        })
    }
}
