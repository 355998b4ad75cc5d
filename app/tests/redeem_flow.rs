mod common;

use common::{harness, harness_with, usdc};
use usdec::{LockPeriod, MinimumRedeem};
use usdec_app::{FlowError, NotifyKind, TxPhase};
use usdec_core::{ErrorClass, ProtocolError, TokenAmount};

#[tokio::test]
async fn test_redeem_flow() {
    let mut h = harness();
    h.chain.set_balance(&h.usdec, &h.user, usdc("5"));
    h.orchestrator.set_redeem_amount("2.5");

    assert_eq!(
        h.orchestrator.start_redeem().await.unwrap(),
        TxPhase::AwaitingRedeemSignature
    );
    let hash = h.orchestrator.submit_redeem().await.unwrap();
    assert_eq!(h.orchestrator.redeem_phase(), TxPhase::RedeemPending);
    assert_eq!(h.orchestrator.redeem_view().draft, "");

    assert_eq!(
        h.orchestrator.confirm_redeem().await.unwrap(),
        TxPhase::RedeemConfirmed
    );
    assert_eq!(h.usdec_balance(), usdc("2.5"));
    assert_eq!(h.usdc_balance(), usdc("1002.5"));

    assert_eq!(h.written_methods(), vec!["redeem"]);
    assert_eq!(
        h.notifier.of_kind(NotifyKind::Success),
        vec!["Redeem sent!", "Redeem confirmed!"]
    );
    assert_eq!(
        h.orchestrator.last_tx_url(),
        Some(format!("https://basescan.org/tx/{}", hash))
    );
}

#[tokio::test]
async fn test_redeem_does_not_need_allowlist() {
    let mut h = harness_with(|_| {}, false);
    h.chain.set_balance(&h.usdec, &h.user, usdc("1"));
    h.orchestrator.set_redeem_amount("1");
    assert!(h.orchestrator.start_redeem().await.is_ok());
}

#[tokio::test]
async fn test_redeem_rejects_zero_and_overdraw() {
    let mut h = harness();
    h.chain.set_balance(&h.usdec, &h.user, usdc("5"));

    h.orchestrator.set_redeem_amount("0");
    let err = h.orchestrator.start_redeem().await.unwrap_err();
    assert_eq!(err.class(), Some(ErrorClass::Input));

    h.orchestrator.set_redeem_amount("6");
    let err = h.orchestrator.start_redeem().await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Protocol(ProtocolError::InsufficientBalance { .. })
    ));
    assert_eq!(h.orchestrator.redeem_phase(), TxPhase::Idle);
    assert!(h.chain.writes().is_empty());
}

#[tokio::test]
async fn test_minimum_redeem_policy() {
    let mut h = harness();
    h.orchestrator = h
        .orchestrator
        .with_redeem_policy(Box::new(MinimumRedeem::new(usdc("10"), 6)));
    h.chain.set_balance(&h.usdec, &h.user, usdc("50"));

    h.orchestrator.set_redeem_amount("5");
    let err = h.orchestrator.start_redeem().await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Protocol(ProtocolError::PolicyViolation { .. })
    ));

    h.orchestrator.set_redeem_amount("10");
    assert!(h.orchestrator.start_redeem().await.is_ok());
}

#[tokio::test]
async fn test_lock_period_after_mint() {
    let mut h = harness();
    h.orchestrator = h
        .orchestrator
        .with_redeem_policy(Box::new(LockPeriod::new(LockPeriod::THIRTY_DAYS)));

    // Nothing minted this session: unlocked
    h.chain.set_balance(&h.usdec, &h.user, usdc("1"));
    h.orchestrator.set_redeem_amount("1");
    h.orchestrator.start_redeem().await.unwrap();
    h.orchestrator.submit_redeem().await.unwrap();
    h.orchestrator.confirm_redeem().await.unwrap();

    h.orchestrator.set_mint_amount("11");
    h.orchestrator.run_mint().await.unwrap();

    h.orchestrator.set_redeem_amount("1");
    let err = h.orchestrator.start_redeem().await.unwrap_err();
    assert!(err.to_string().contains("locked"));
}

#[tokio::test]
async fn test_mint_and_redeem_run_side_by_side() {
    let mut h = harness();
    h.preapprove("11");
    h.chain.set_balance(&h.usdec, &h.user, usdc("3"));

    h.orchestrator.set_mint_amount("11");
    h.orchestrator.start_mint().await.unwrap();
    h.orchestrator.set_redeem_amount("3");
    h.orchestrator.start_redeem().await.unwrap();

    // Not with itself
    let err = h.orchestrator.start_redeem().await.unwrap_err();
    assert!(matches!(err, FlowError::FlowBusy { .. }));

    h.orchestrator.submit_mint().await.unwrap();
    h.orchestrator.submit_redeem().await.unwrap();
    h.orchestrator.confirm_redeem().await.unwrap();
    h.orchestrator.confirm_mint().await.unwrap();

    assert_eq!(h.usdec_balance(), usdc("11"));
    assert_eq!(h.orchestrator.mint_phase(), TxPhase::MintConfirmed);
    assert_eq!(h.orchestrator.redeem_phase(), TxPhase::RedeemConfirmed);
}

#[tokio::test]
async fn test_redeem_signature_rejection() {
    let mut h = harness();
    h.chain.set_balance(&h.usdec, &h.user, usdc("2"));
    h.orchestrator.set_redeem_amount("2");
    h.orchestrator.start_redeem().await.unwrap();

    h.chain.reject_next_signature("User denied transaction signature");
    let err = h.orchestrator.submit_redeem().await.unwrap_err();
    assert_eq!(err.class(), Some(ErrorClass::SignatureRejected));
    assert_eq!(h.orchestrator.redeem_phase(), TxPhase::Idle);
    assert_eq!(h.usdec_balance(), TokenAmount::from_units(2_000_000));
}

#[tokio::test]
async fn test_edit_before_redeem_signature_restarts() {
    let mut h = harness();
    h.chain.set_balance(&h.usdec, &h.user, usdc("5"));
    h.orchestrator.set_redeem_amount("2");
    h.orchestrator.start_redeem().await.unwrap();

    h.orchestrator.set_redeem_amount("3");
    assert_eq!(h.orchestrator.redeem_phase(), TxPhase::Idle);
    assert!(h.orchestrator.submit_redeem().await.is_err());

    h.orchestrator.start_redeem().await.unwrap();
    h.orchestrator.submit_redeem().await.unwrap();
    assert_eq!(h.chain.writes()[0].uint_arg(0), Some(&usdc("3")));
}
