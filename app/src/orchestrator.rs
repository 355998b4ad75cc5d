//! Mint/redeem transaction orchestrator
//!
//! One instance per session. Mint and redeem are separate state machines
//! that may run side by side; each step is a method returning
//! `Result<_, FlowError>` so callers (and tests) drive transitions
//! explicitly.
//!
//! Mint: `Idle → AwaitingApprovalSignature → ApprovalPending →
//! ApprovalConfirmed → AwaitingMintSignature → MintPending → MintConfirmed`,
//! skipping the approval states when the allowance already covers the
//! amount. Redeem: `Idle → AwaitingRedeemSignature → RedeemPending →
//! RedeemConfirmed`. Post-submission failures end in `Failed`.
//!
//! Nothing is ever resubmitted automatically.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chain_client::{ChainClient, TxReceipt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use usdec::tx_builder::{build_approve, build_mint, build_redeem, check_preview};
use usdec::{
    assess_mint, fetch_balance, fetch_preview_shares, validate_amount, AllowanceResolver,
    AmountBounds, BalanceReader, ContractAddresses, EmptyInput, FeeBreakdown, MintParams,
    MintPreview, PollTarget, PreparedTx, ReadState, RedeemContext, RedeemPolicy, TxKind,
    Unrestricted, WalletContext,
};
use usdec_core::{
    Address, AppConfig, ChainError, ConfigError, ErrorClass, Ineligibility, OrchestratorConfig,
    ProtocolError, TokenAmount, TrustLevel, TxHash,
};

use crate::history::{TransactionRecord, TxHistory};
use crate::notifier::{Notifier, NotifyKind};
use crate::session::{Allowlist, WalletState};
use crate::tx_watcher::{TxWatcher, WatchOutcome, WatchedItemInfo};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum TxPhase {
    #[default]
    Idle,
    AwaitingApprovalSignature,
    ApprovalPending,
    ApprovalConfirmed,
    AwaitingMintSignature,
    MintPending,
    MintConfirmed,
    AwaitingRedeemSignature,
    RedeemPending,
    RedeemConfirmed,
    Failed,
}

impl TxPhase {
    /// A transaction has been broadcast and not yet resolved
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::ApprovalPending | Self::MintPending | Self::RedeemPending
        )
    }

    /// A flow is under way; a new one cannot start
    pub fn is_busy(&self) -> bool {
        !matches!(
            self,
            Self::Idle | Self::MintConfirmed | Self::RedeemConfirmed | Self::Failed
        )
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("{kind} transaction {hash} failed: {reason}")]
    TransactionFailed {
        kind: TxKind,
        hash: TxHash,
        reason: String,
    },

    #[error("Cannot {action} while {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: TxPhase,
    },

    #[error("A {kind} is already in progress")]
    FlowBusy { kind: TxKind },

    #[error("Allowance not loaded yet; try again")]
    AllowanceUnknown,

    #[error("Amount changed since the approval; start the mint again")]
    AmountChanged,

    #[error("Status view can be reset in {remaining_secs}s")]
    ResetTooEarly { remaining_secs: u64 },
}

impl FlowError {
    /// Error class, or `None` for misuse of the state machine
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Protocol(e) => Some(e.class()),
            Self::Chain(e) => Some(e.class()),
            Self::TransactionFailed { .. } => Some(ErrorClass::Submission),
            Self::InvalidPhase { .. }
            | Self::FlowBusy { .. }
            | Self::AllowanceUnknown
            | Self::AmountChanged
            | Self::ResetTooEarly { .. } => None,
        }
    }
}

impl From<Ineligibility> for FlowError {
    fn from(e: Ineligibility) -> Self {
        Self::Protocol(e.into())
    }
}

impl From<usdec_core::AmountError> for FlowError {
    fn from(e: usdec_core::AmountError) -> Self {
        Self::Protocol(e.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Mint,
    Redeem,
}

#[derive(Debug, Clone)]
struct Submitted {
    hash: TxHash,
    kind: TxKind,
}

#[derive(Debug, Default)]
struct FlowState {
    phase: TxPhase,
    draft: String,
    /// Amount bound when the flow left `Idle`
    amount: Option<TokenAmount>,
    pending: Option<Submitted>,
    last_error: Option<String>,
    failed_hash: Option<TxHash>,
}

/// Read-only view of one flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowView {
    pub phase: TxPhase,
    /// Current text in the amount input
    pub draft: String,
    /// Amount bound to the flow in progress
    pub amount: Option<TokenAmount>,
    pub pending_hash: Option<TxHash>,
    pub last_error: Option<String>,
    pub failed_hash: Option<TxHash>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn sent_message(kind: TxKind) -> &'static str {
    match kind {
        TxKind::Approve => "Approval sent!",
        TxKind::Mint => "Mint tx sent!",
        TxKind::Redeem => "Redeem sent!",
    }
}

fn confirmed_message(kind: TxKind) -> &'static str {
    match kind {
        TxKind::Approve => "Approval confirmed!",
        TxKind::Mint => "Mint confirmed!",
        TxKind::Redeem => "Redeem confirmed!",
    }
}

pub struct Orchestrator {
    client: Arc<dyn ChainClient>,
    notifier: Arc<dyn Notifier>,
    session: watch::Receiver<WalletState>,
    allowlist: Allowlist,
    contracts: ContractAddresses,
    params: MintParams,
    config: OrchestratorConfig,
    explorer_tx_url: String,
    policy: Box<dyn RedeemPolicy>,
    allowance: AllowanceResolver,
    mint: FlowState,
    redeem: FlowState,
    history: TxHistory,
    watcher: TxWatcher,
    last_mint_at: Option<u64>,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        client: Arc<dyn ChainClient>,
        notifier: Arc<dyn Notifier>,
        session: watch::Receiver<WalletState>,
        allowlist: Allowlist,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let contracts = ContractAddresses::from_config(&config.chain)?;
        let params = MintParams::from_config(config)?;

        tracing::info!(
            chain_id = %params.expected_chain,
            usdec = %contracts.usdec,
            vault = %contracts.vault,
            trust_level = ?config.orchestrator.trust_level,
            allowlisted = allowlist.len(),
            "Orchestrator ready"
        );

        Ok(Self {
            allowance: AllowanceResolver::new(contracts.usdc.clone(), contracts.usdec.clone()),
            client,
            notifier,
            session,
            allowlist,
            contracts,
            params,
            config: config.orchestrator.clone(),
            explorer_tx_url: config.chain.explorer_tx_url.clone(),
            policy: Box::new(Unrestricted),
            mint: FlowState::default(),
            redeem: FlowState::default(),
            history: TxHistory::new(config.orchestrator.history_limit),
            watcher: TxWatcher::new(),
            last_mint_at: None,
        })
    }

    pub fn with_redeem_policy(mut self, policy: Box<dyn RedeemPolicy>) -> Self {
        tracing::info!(policy = %policy.describe(), "Redeem policy set");
        self.policy = policy;
        self
    }

    // ─── Views ──────────────────────────────────────────────────────────

    pub fn mint_phase(&self) -> TxPhase {
        self.mint.phase
    }

    pub fn redeem_phase(&self) -> TxPhase {
        self.redeem.phase
    }

    pub fn mint_view(&self) -> FlowView {
        Self::view(&self.mint)
    }

    pub fn redeem_view(&self) -> FlowView {
        Self::view(&self.redeem)
    }

    fn view(flow: &FlowState) -> FlowView {
        FlowView {
            phase: flow.phase,
            draft: flow.draft.clone(),
            amount: flow.amount.clone(),
            pending_hash: flow.pending.as_ref().map(|p| p.hash.clone()),
            last_error: flow.last_error.clone(),
            failed_hash: flow.failed_hash.clone(),
        }
    }

    pub fn history(&self) -> &TxHistory {
        &self.history
    }

    pub fn watched_items(&self) -> Vec<WatchedItemInfo> {
        self.watcher.watched_items()
    }

    /// Explorer link for the latest mint or redeem
    pub fn last_tx_url(&self) -> Option<String> {
        self.history
            .latest_of(&[TxKind::Mint, TxKind::Redeem])
            .map(|r| format!("{}{}", self.explorer_tx_url, r.hash))
    }

    /// What the balance reader should poll right now: the connected
    /// address, and the net deposit of the current mint draft if it parses.
    pub fn poll_target(&self) -> PollTarget {
        let owner = self.session.borrow().address.clone();
        let preview_assets = if self.contracts.vault_supports_preview {
            usdec::parse_amount(&self.mint.draft, self.params.decimals, EmptyInput::Allow)
                .ok()
                .flatten()
                .map(|gross| FeeBreakdown::compute(&gross, self.params.fee_bps).net)
        } else {
            None
        };
        PollTarget {
            owner,
            preview_assets,
        }
    }

    /// Start background balance polling on the configured interval.
    ///
    /// Polling stops when the sender behind `target` is dropped.
    pub fn spawn_balance_polling(
        &self,
        target: watch::Receiver<PollTarget>,
    ) -> (Arc<BalanceReader>, JoinHandle<()>) {
        let reader = Arc::new(BalanceReader::new(
            self.client.clone(),
            self.contracts.clone(),
        ));
        let interval = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let handle = reader.clone().spawn_polling(interval, target);
        (reader, handle)
    }

    // ─── Amount input ───────────────────────────────────────────────────

    /// Update the mint amount input.
    ///
    /// Returns the flow to `Idle` unless a transaction is pending, in which
    /// case only the draft changes.
    pub fn set_mint_amount(&mut self, raw: &str) {
        self.mint.draft = raw.to_string();
        if self.mint.phase.is_pending() {
            tracing::debug!(phase = ?self.mint.phase, "Mint amount edited during flow; draft only");
            return;
        }
        self.allowance.invalidate();
        Self::reset_flow(&mut self.mint, "mint");
    }

    pub fn set_redeem_amount(&mut self, raw: &str) {
        self.redeem.draft = raw.to_string();
        if self.redeem.phase.is_pending() {
            tracing::debug!(phase = ?self.redeem.phase, "Redeem amount edited during flow; draft only");
            return;
        }
        Self::reset_flow(&mut self.redeem, "redeem");
    }

    fn reset_flow(flow: &mut FlowState, name: &str) {
        if flow.phase != TxPhase::Idle {
            tracing::debug!(flow = name, from = ?flow.phase, "Flow reset to Idle");
        }
        flow.phase = TxPhase::Idle;
        flow.amount = None;
        flow.pending = None;
        flow.last_error = None;
        flow.failed_hash = None;
    }

    /// Explicit retry: clear a finished or failed mint back to `Idle`
    pub fn retry_mint(&mut self) -> Result<(), FlowError> {
        if self.mint.phase.is_busy() {
            return Err(FlowError::FlowBusy {
                kind: TxKind::Mint,
            });
        }
        self.allowance.invalidate();
        Self::reset_flow(&mut self.mint, "mint");
        Ok(())
    }

    pub fn retry_redeem(&mut self) -> Result<(), FlowError> {
        if self.redeem.phase.is_busy() {
            return Err(FlowError::FlowBusy {
                kind: TxKind::Redeem,
            });
        }
        Self::reset_flow(&mut self.redeem, "redeem");
        Ok(())
    }

    // ─── Session ────────────────────────────────────────────────────────

    fn wallet_context(&self) -> (WalletContext, Option<Address>) {
        let wallet = self.session.borrow().clone();
        let allowlisted = wallet
            .address
            .as_ref()
            .is_some_and(|a| self.allowlist.contains(a));
        let ctx = WalletContext {
            connected: wallet.is_connected(),
            chain_id: wallet.chain_id,
            allowlisted,
        };
        (ctx, wallet.address)
    }

    /// Fresh session check before a submission
    fn check_session(&self, require_allowlist: bool) -> Result<Address, Ineligibility> {
        let (ctx, address) = self.wallet_context();
        let address = address.ok_or(Ineligibility::WalletNotConnected)?;
        match ctx.chain_id {
            Some(actual) if actual == self.params.expected_chain => {}
            Some(actual) => {
                return Err(Ineligibility::WrongChain {
                    expected: self.params.expected_chain,
                    actual,
                })
            }
            None => return Err(Ineligibility::WalletNotConnected),
        }
        if require_allowlist && !ctx.allowlisted {
            return Err(Ineligibility::NotAllowlisted);
        }
        Ok(address)
    }

    // ─── Mint ───────────────────────────────────────────────────────────

    /// Fee split, gates and vault preview for the current mint input.
    ///
    /// `Ok(None)` while the input is empty.
    pub async fn preview_mint(&self) -> Result<Option<MintPreview>, FlowError> {
        let Some(gross) =
            usdec::parse_amount(&self.mint.draft, self.params.decimals, EmptyInput::Allow)?
        else {
            return Ok(None);
        };
        let (ctx, _) = self.wallet_context();
        let assessment = assess_mint(&gross, &self.params, &ctx);

        let shares = if self.contracts.vault_supports_preview {
            let result =
                fetch_preview_shares(self.client.as_ref(), &self.contracts, &assessment.breakdown.net)
                    .await;
            Some(ReadState::from(result))
        } else {
            None
        };
        Ok(Some(MintPreview::build(
            &assessment,
            shares,
            self.params.decimals,
        )))
    }

    /// Leave `Idle`: validate, gate, preview, and read a fresh allowance.
    ///
    /// Ends in `AwaitingApprovalSignature` or `AwaitingMintSignature`. While
    /// the allowance is unknown the flow stays `Idle`.
    pub async fn start_mint(&mut self) -> Result<TxPhase, FlowError> {
        self.ensure_startable(Flow::Mint)?;

        let gross = validate_amount(&self.mint.draft, &self.params.bounds(), EmptyInput::Reject)?
            .ok_or(usdec_core::AmountError::Empty)?;

        let (ctx, owner) = self.wallet_context();
        let assessment = assess_mint(&gross, &self.params, &ctx);
        usdec::tx_builder::validate_mint(&assessment)?;
        let owner = owner.ok_or(Ineligibility::WalletNotConnected)?;

        if self.contracts.vault_supports_preview {
            let preview =
                fetch_preview_shares(self.client.as_ref(), &self.contracts, &assessment.breakdown.net)
                    .await;
            let shares = check_preview(preview)?;
            tracing::debug!(net = %assessment.breakdown.net, shares = %shares, "Vault preview");
        }

        let allowance = self
            .allowance
            .refresh(self.client.as_ref(), &owner, &gross)
            .await;
        let next = match allowance.needs_approval() {
            None => return Err(FlowError::AllowanceUnknown),
            Some(true) => TxPhase::AwaitingApprovalSignature,
            Some(false) => TxPhase::AwaitingMintSignature,
        };

        tracing::info!(
            gross = %gross,
            fee = %assessment.breakdown.fee,
            net = %assessment.breakdown.net,
            needs_approval = next == TxPhase::AwaitingApprovalSignature,
            "Mint started"
        );
        self.mint.amount = Some(gross);
        self.mint.last_error = None;
        self.mint.failed_hash = None;
        self.transition(Flow::Mint, next);
        Ok(next)
    }

    /// Sign and broadcast the approval for the bound amount
    pub async fn submit_approval(&mut self) -> Result<TxHash, FlowError> {
        self.expect_phase(Flow::Mint, TxPhase::AwaitingApprovalSignature, "submit approval")?;
        let amount = self.bound_amount(Flow::Mint)?;
        let owner = self.recheck_session(Flow::Mint, true)?;

        let tx = build_approve(&self.contracts, &amount);
        let hash = self.sign_and_broadcast(Flow::Mint, &owner, &tx).await?;
        self.transition(Flow::Mint, TxPhase::ApprovalPending);
        Ok(hash)
    }

    /// Wait for the approval receipt.
    ///
    /// With `auto_mint_after_approval` this continues to the mint signature.
    pub async fn confirm_approval(&mut self) -> Result<TxPhase, FlowError> {
        self.expect_phase(Flow::Mint, TxPhase::ApprovalPending, "confirm approval")?;
        self.await_receipt(Flow::Mint).await?;
        self.allowance.invalidate();
        self.transition(Flow::Mint, TxPhase::ApprovalConfirmed);

        if self.config.auto_mint_after_approval {
            return self.continue_to_mint().await;
        }
        Ok(TxPhase::ApprovalConfirmed)
    }

    /// After a confirmed approval, re-read the allowance and move on.
    ///
    /// If the input was edited while the approval was pending, the flow
    /// returns to `Idle` instead.
    pub async fn continue_to_mint(&mut self) -> Result<TxPhase, FlowError> {
        self.expect_phase(Flow::Mint, TxPhase::ApprovalConfirmed, "continue to mint")?;
        let amount = self.bound_amount(Flow::Mint)?;
        if !self.draft_matches(Flow::Mint, &amount) {
            tracing::info!(bound = %amount, draft = %self.mint.draft, "Mint input edited during approval");
            return Err(self.abort_to_idle(Flow::Mint, FlowError::AmountChanged));
        }
        let owner = self.recheck_session(Flow::Mint, true)?;

        let allowance = self
            .allowance
            .refresh(self.client.as_ref(), &owner, &amount)
            .await;
        let next = match allowance.needs_approval() {
            None => return Err(FlowError::AllowanceUnknown),
            Some(true) => {
                tracing::warn!(amount = %amount, "Confirmed approval does not cover the mint");
                TxPhase::AwaitingApprovalSignature
            }
            Some(false) => TxPhase::AwaitingMintSignature,
        };
        self.transition(Flow::Mint, next);
        Ok(next)
    }

    /// Sign and broadcast the mint for the bound gross amount
    pub async fn submit_mint(&mut self) -> Result<TxHash, FlowError> {
        self.expect_phase(Flow::Mint, TxPhase::AwaitingMintSignature, "submit mint")?;
        let gross = self.bound_amount(Flow::Mint)?;
        let owner = self.recheck_session(Flow::Mint, true)?;

        let (ctx, _) = self.wallet_context();
        let assessment = assess_mint(&gross, &self.params, &ctx);
        let tx = match build_mint(&self.contracts, &assessment) {
            Ok(tx) => tx,
            Err(e) => return Err(self.abort_to_idle(Flow::Mint, e.into())),
        };

        let hash = self.sign_and_broadcast(Flow::Mint, &owner, &tx).await?;
        self.mint.draft.clear();
        self.transition(Flow::Mint, TxPhase::MintPending);
        Ok(hash)
    }

    pub async fn confirm_mint(&mut self) -> Result<TxPhase, FlowError> {
        self.expect_phase(Flow::Mint, TxPhase::MintPending, "confirm mint")?;
        self.await_receipt(Flow::Mint).await?;
        self.allowance.invalidate();
        self.last_mint_at = Some(unix_now());
        self.transition(Flow::Mint, TxPhase::MintConfirmed);
        Ok(TxPhase::MintConfirmed)
    }

    /// Drive a mint from `Idle` as far as it goes without a second approval
    pub async fn run_mint(&mut self) -> Result<TxPhase, FlowError> {
        let mut phase = self.start_mint().await?;
        let mut approvals = 0;
        loop {
            phase = match phase {
                TxPhase::AwaitingApprovalSignature if approvals == 0 => {
                    approvals += 1;
                    self.submit_approval().await?;
                    self.confirm_approval().await?
                }
                TxPhase::ApprovalConfirmed => self.continue_to_mint().await?,
                TxPhase::AwaitingMintSignature => {
                    self.submit_mint().await?;
                    self.confirm_mint().await?
                }
                other => return Ok(other),
            };
        }
    }

    // ─── Redeem ─────────────────────────────────────────────────────────

    /// Leave `Idle`: validate the amount and apply the redeem policy
    pub async fn start_redeem(&mut self) -> Result<TxPhase, FlowError> {
        self.ensure_startable(Flow::Redeem)?;

        let bounds = AmountBounds::positive(self.params.decimals);
        let amount = validate_amount(&self.redeem.draft, &bounds, EmptyInput::Reject)?
            .ok_or(usdec_core::AmountError::Empty)?;
        let owner = self.check_session(false)?;

        let balance =
            match fetch_balance(self.client.as_ref(), &self.contracts.usdec, &owner).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "USDEC balance unavailable for redeem check");
                    None
                }
            };
        let ctx = RedeemContext {
            amount: amount.clone(),
            balance,
            last_mint_at: self.last_mint_at,
            now: unix_now(),
        };
        usdec::tx_builder::validate_redeem(&ctx, self.policy.as_ref(), self.params.decimals)?;

        tracing::info!(amount = %amount, "Redeem started");
        self.redeem.amount = Some(amount);
        self.redeem.last_error = None;
        self.redeem.failed_hash = None;
        self.transition(Flow::Redeem, TxPhase::AwaitingRedeemSignature);
        Ok(TxPhase::AwaitingRedeemSignature)
    }

    pub async fn submit_redeem(&mut self) -> Result<TxHash, FlowError> {
        self.expect_phase(Flow::Redeem, TxPhase::AwaitingRedeemSignature, "submit redeem")?;
        let amount = self.bound_amount(Flow::Redeem)?;
        let owner = self.recheck_session(Flow::Redeem, false)?;

        let ctx = RedeemContext {
            amount,
            balance: None,
            last_mint_at: self.last_mint_at,
            now: unix_now(),
        };
        let tx = match build_redeem(
            &self.contracts,
            &ctx,
            self.policy.as_ref(),
            self.params.decimals,
        ) {
            Ok(tx) => tx,
            Err(e) => return Err(self.abort_to_idle(Flow::Redeem, e.into())),
        };

        let hash = self.sign_and_broadcast(Flow::Redeem, &owner, &tx).await?;
        self.redeem.draft.clear();
        self.transition(Flow::Redeem, TxPhase::RedeemPending);
        Ok(hash)
    }

    pub async fn confirm_redeem(&mut self) -> Result<TxPhase, FlowError> {
        self.expect_phase(Flow::Redeem, TxPhase::RedeemPending, "confirm redeem")?;
        self.await_receipt(Flow::Redeem).await?;
        self.transition(Flow::Redeem, TxPhase::RedeemConfirmed);
        Ok(TxPhase::RedeemConfirmed)
    }

    // ─── Status view reset ──────────────────────────────────────────────

    /// Drop the local pending status of the mint flow after
    /// `reset_after_secs`. The transaction itself is unaffected.
    pub fn reset_mint_status_view(&mut self) -> Result<(), FlowError> {
        self.reset_status_view(Flow::Mint)
    }

    pub fn reset_redeem_status_view(&mut self) -> Result<(), FlowError> {
        self.reset_status_view(Flow::Redeem)
    }

    fn reset_status_view(&mut self, which: Flow) -> Result<(), FlowError> {
        let phase = self.flow(which).phase;
        let pending = match (&self.flow(which).pending, phase.is_pending()) {
            (Some(pending), true) => pending.clone(),
            _ => {
                return Err(FlowError::InvalidPhase {
                    action: "reset status view",
                    phase,
                })
            }
        };

        let reset_after = Duration::from_secs(self.config.reset_after_secs);
        let remaining = self
            .watcher
            .reset_remaining(&pending.hash, reset_after)
            .unwrap_or_default();
        if !remaining.is_zero() {
            return Err(FlowError::ResetTooEarly {
                remaining_secs: remaining.as_secs().max(1),
            });
        }

        self.watcher.resolve(&pending.hash, WatchOutcome::Released);
        if which == Flow::Mint {
            self.allowance.invalidate();
        }
        let flow = self.flow_mut(which);
        flow.pending = None;
        flow.amount = None;
        tracing::info!(hash = %pending.hash, kind = %pending.kind, "Status view reset; transaction may still confirm");
        self.transition(which, TxPhase::Idle);
        self.notifier.notify(
            NotifyKind::Info,
            &format!(
                "Status view reset. Transaction {} may still confirm on chain.",
                pending.hash
            ),
        );
        Ok(())
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn flow(&self, which: Flow) -> &FlowState {
        match which {
            Flow::Mint => &self.mint,
            Flow::Redeem => &self.redeem,
        }
    }

    fn flow_mut(&mut self, which: Flow) -> &mut FlowState {
        match which {
            Flow::Mint => &mut self.mint,
            Flow::Redeem => &mut self.redeem,
        }
    }

    fn flow_kind(which: Flow) -> TxKind {
        match which {
            Flow::Mint => TxKind::Mint,
            Flow::Redeem => TxKind::Redeem,
        }
    }

    fn transition(&mut self, which: Flow, to: TxPhase) {
        let flow = self.flow_mut(which);
        tracing::debug!(flow = ?which, from = ?flow.phase, to = ?to, "Phase transition");
        flow.phase = to;
    }

    fn ensure_startable(&self, which: Flow) -> Result<(), FlowError> {
        let phase = self.flow(which).phase;
        if phase.is_busy() {
            return Err(FlowError::FlowBusy {
                kind: Self::flow_kind(which),
            });
        }
        if phase != TxPhase::Idle {
            return Err(FlowError::InvalidPhase {
                action: "start",
                phase,
            });
        }
        Ok(())
    }

    fn expect_phase(
        &self,
        which: Flow,
        expected: TxPhase,
        action: &'static str,
    ) -> Result<(), FlowError> {
        let phase = self.flow(which).phase;
        if phase != expected {
            return Err(FlowError::InvalidPhase { action, phase });
        }
        Ok(())
    }

    fn bound_amount(&self, which: Flow) -> Result<TokenAmount, FlowError> {
        let flow = self.flow(which);
        flow.amount.clone().ok_or(FlowError::InvalidPhase {
            action: "submit without a bound amount",
            phase: flow.phase,
        })
    }

    fn draft_matches(&self, which: Flow, bound: &TokenAmount) -> bool {
        matches!(
            usdec::parse_amount(&self.flow(which).draft, self.params.decimals, EmptyInput::Allow),
            Ok(Some(draft)) if draft == *bound
        )
    }

    /// Session check before signing; on failure the flow returns to `Idle`
    fn recheck_session(&mut self, which: Flow, require_allowlist: bool) -> Result<Address, FlowError> {
        match self.check_session(require_allowlist) {
            Ok(address) => Ok(address),
            Err(e) => Err(self.abort_to_idle(which, e.into())),
        }
    }

    /// Back to `Idle` before anything was broadcast, keeping the reason
    fn abort_to_idle(&mut self, which: Flow, error: FlowError) -> FlowError {
        let reason = error.to_string();
        tracing::debug!(flow = ?which, reason = %reason, "Aborted before submission");
        if which == Flow::Mint {
            self.allowance.invalidate();
        }
        let flow = self.flow_mut(which);
        flow.amount = None;
        flow.last_error = Some(reason);
        self.transition(which, TxPhase::Idle);
        error
    }

    /// Simulate (unless reckless), request a signature, broadcast, and start
    /// the confirmation watch.
    async fn sign_and_broadcast(
        &mut self,
        which: Flow,
        owner: &Address,
        tx: &PreparedTx,
    ) -> Result<TxHash, FlowError> {
        let kind = tx.kind;

        if self.config.trust_level == TrustLevel::Simulated {
            if let Err(e) = self.client.simulate(owner, &tx.call).await {
                tracing::warn!(kind = %kind, call = %tx.call, error = %e, "Simulation failed");
                let reason = match &e {
                    ChainError::Simulation { reason } => reason.clone(),
                    other => other.to_string(),
                };
                self.notifier
                    .notify(NotifyKind::Error, &format!("{} failed: {}", kind.label(), reason));
                return Err(self.abort_to_idle(which, e.into()));
            }
        }

        let hash = match self.client.write(owner, &tx.call).await {
            Ok(hash) => hash,
            Err(ChainError::UserRejected { reason }) => {
                tracing::info!(kind = %kind, reason = %reason, "Signature rejected");
                self.notifier.notify(
                    NotifyKind::Info,
                    &format!("{} request rejected in wallet", kind.label()),
                );
                return Err(self.abort_to_idle(which, ChainError::UserRejected { reason }.into()));
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Broadcast failed");
                self.notifier
                    .notify(NotifyKind::Error, &format!("{} failed: {}", kind.label(), e));
                let flow = self.flow_mut(which);
                flow.last_error = Some(e.to_string());
                self.transition(which, TxPhase::Failed);
                return Err(e.into());
            }
        };

        tracing::info!(kind = %kind, hash = %hash, amount = %tx.amount, "Transaction submitted");
        self.watcher.watch(hash.clone(), kind, tx.amount.clone());
        self.history.push(TransactionRecord::new(
            hash.clone(),
            kind,
            tx.amount.clone(),
            unix_now(),
        ));
        self.flow_mut(which).pending = Some(Submitted {
            hash: hash.clone(),
            kind,
        });
        self.notifier.notify(NotifyKind::Success, sent_message(kind));
        Ok(hash)
    }

    /// Wait for the pending receipt of `which`.
    ///
    /// Reverted or dropped moves the flow to `Failed`. A transport error
    /// leaves it pending so confirmation can be awaited again.
    async fn await_receipt(&mut self, which: Flow) -> Result<TxReceipt, FlowError> {
        let pending = match self.flow(which).pending.clone() {
            Some(pending) => pending,
            None => {
                return Err(FlowError::InvalidPhase {
                    action: "confirm without a pending transaction",
                    phase: self.flow(which).phase,
                })
            }
        };

        let result = self.client.wait_for_receipt(&pending.hash).await;
        let failure = match result {
            Ok(receipt) if receipt.is_success() => {
                tracing::info!(
                    kind = %pending.kind,
                    hash = %pending.hash,
                    block = receipt.block_number,
                    "Transaction confirmed"
                );
                self.watcher.resolve(&pending.hash, WatchOutcome::Confirmed);
                self.flow_mut(which).pending = None;
                self.notifier
                    .notify(NotifyKind::Success, confirmed_message(pending.kind));
                return Ok(receipt);
            }
            Ok(receipt) => {
                self.watcher.resolve(&pending.hash, WatchOutcome::Reverted);
                format!("reverted in block {}", receipt.block_number)
            }
            Err(ChainError::Dropped { .. }) => {
                self.watcher.resolve(&pending.hash, WatchOutcome::Dropped);
                "dropped before inclusion".to_string()
            }
            Err(e) => {
                tracing::warn!(hash = %pending.hash, error = %e, "Receipt unavailable; still pending");
                return Err(e.into());
            }
        };

        tracing::warn!(kind = %pending.kind, hash = %pending.hash, reason = %failure, "Transaction failed");
        self.notifier.notify(
            NotifyKind::Error,
            &format!("{} failed: {} ({})", pending.kind.label(), failure, pending.hash),
        );
        let flow = self.flow_mut(which);
        flow.pending = None;
        flow.last_error = Some(failure.clone());
        flow.failed_hash = Some(pending.hash.clone());
        self.transition(which, TxPhase::Failed);
        Err(FlowError::TransactionFailed {
            kind: pending.kind,
            hash: pending.hash,
            reason: failure,
        })
    }
}
