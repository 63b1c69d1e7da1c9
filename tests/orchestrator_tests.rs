//! Orchestrator boundary: validation, the uniform outcome shape,
//! failure translation and the debounced simulation scheduler.

mod common;

use std::time::Duration;

use anyhow::anyhow;
use common::{bridge_plan, FlowFixture};
use serde_json::json;
use unibridge::notifications::NotificationKind;
use unibridge::orchestrator::{FlowRequest, SimulationScheduler};
use unibridge::sdk::{
    BridgeParams, DepositParams, SdkError, SettlementSdk, SimulationPreview, TransferParams,
    PROVIDER_USER_REJECTED,
};
use unibridge::types::{TransactionKind, TransactionStatus};

const RESET_DELAY: Duration = Duration::from_millis(20);

fn bridge_request() -> FlowRequest {
    FlowRequest::Bridge(BridgeParams {
        chain_id: 42161,
        token: "USDC".to_string(),
        amount: "10".to_string(),
    })
}

#[tokio::test]
async fn invalid_request_never_reaches_the_sdk() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;

    let outcome = fixture
        .orchestrator
        .execute(FlowRequest::Bridge(BridgeParams {
            chain_id: 42161,
            token: String::new(),
            amount: "10".to_string(),
        }))
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Missing required parameters for bridge transaction: token")
    );
    assert_eq!(fixture.sdk.call_count("bridge"), 0);
    assert!(fixture.history.is_empty().await);
    assert!(fixture.store.snapshot().await.error.is_some());
}

#[tokio::test]
async fn invalid_request_clears_stale_flow_state() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    let store = &fixture.store;

    // Leftovers of a prior attempt that never finished cleanly
    store.set_planned_steps(bridge_plan()).await;
    store.set_awaiting_allowance(true).await;

    let outcome = fixture
        .orchestrator
        .execute(FlowRequest::Bridge(BridgeParams {
            chain_id: 42161,
            token: String::new(),
            amount: "10".to_string(),
        }))
        .await;

    assert!(!outcome.success);
    let snap = store.snapshot().await;
    assert!(snap.steps.is_empty());
    assert!(snap.current_transaction.is_none());
    assert!(!snap.awaiting_allowance);
}

#[tokio::test]
async fn zero_amount_fails_validation() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;

    let outcome = fixture
        .orchestrator
        .execute(FlowRequest::Bridge(BridgeParams {
            chain_id: 42161,
            token: "USDC".to_string(),
            amount: "0".to_string(),
        }))
        .await;

    assert!(!outcome.success);
    assert_eq!(fixture.sdk.call_count("bridge"), 0);
}

#[tokio::test]
async fn transfer_requires_a_recipient() {
    let fixture = FlowFixture::new(TransactionKind::Transfer, RESET_DELAY).await;

    let outcome = fixture
        .orchestrator
        .execute(FlowRequest::Transfer(TransferParams {
            chain_id: 8453,
            token: "ETH".to_string(),
            amount: "0.5".to_string(),
            recipient: String::new(),
        }))
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Missing required parameters for transfer transaction: recipient address")
    );
}

#[tokio::test]
async fn deposit_requires_a_nonempty_abi() {
    let fixture = FlowFixture::new(TransactionKind::Deposit, RESET_DELAY).await;

    let outcome = fixture
        .orchestrator
        .execute(FlowRequest::Deposit(DepositParams {
            to_chain_id: 8453,
            contract_address: "0xdef".to_string(),
            contract_abi: json!([]),
            function_name: "deposit".to_string(),
            function_params: vec![],
            value: None,
            gas_limit: None,
        }))
        .await;

    assert!(!outcome.success);
    assert_eq!(fixture.sdk.call_count("deposit"), 0);
}

#[tokio::test]
async fn uninitialized_sdk_rejects_before_validation() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    fixture.sdk.deinit().await.unwrap();

    let outcome = fixture.orchestrator.execute(bridge_request()).await;

    assert!(!outcome.success);
    assert!(outcome
        .error
        .as_deref()
        .unwrap()
        .contains("settlement SDK is not initialized"));
    assert_eq!(fixture.sdk.call_count("bridge"), 0);
}

#[tokio::test]
async fn successful_execution_resets_the_form() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    let store = &fixture.store;

    store.set_from_chain(Some("Base".to_string())).await;
    store.set_to_chain(Some("Arbitrum".to_string())).await;
    store.set_token(Some("USDC".to_string())).await;
    store.set_amount("10").await;
    fixture.sdk.push_action(Ok(json!({ "hash": "0x1" })));

    let outcome = fixture.orchestrator.execute(bridge_request()).await;

    assert!(outcome.success);
    assert_eq!(outcome.data, Some(json!({ "hash": "0x1" })));
    let snap = store.snapshot().await;
    assert!(!snap.is_executing);
    assert!(snap.form.token.is_none());
    assert!(snap.form.amount.is_empty());
    // The wallet chain is not a user entry and survives the reset
    assert_eq!(snap.form.from_chain.as_deref(), Some("Base"));
}

#[tokio::test]
async fn user_rejection_resets_the_flow_without_a_retry() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    let store = &fixture.store;

    // Simulate an attempt that already submitted before the rejection
    let pending = common::record(
        42,
        TransactionStatus::Pending,
        chrono::Utc::now().timestamp_millis(),
    );
    fixture.history.add(pending.clone()).await;
    store.set_current_transaction(Some(pending)).await;
    fixture.sdk.push_action(Err(anyhow::Error::new(SdkError::with_code(
        "denied",
        PROVIDER_USER_REJECTED,
    ))));

    let outcome = fixture.orchestrator.execute(bridge_request()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Token approval was cancelled"));

    let snap = store.snapshot().await;
    assert!(snap.steps.is_empty());
    assert!(snap.current_transaction.is_none());
    assert!(!snap.is_executing);
    assert_eq!(snap.error.as_deref(), Some("Token approval was cancelled"));
    assert_eq!(
        fixture.history.find(42).await.unwrap().status,
        TransactionStatus::Failed
    );

    let notifications = fixture.sink.all();
    let failure = notifications
        .iter()
        .find(|n| n.kind == NotificationKind::Error)
        .expect("failure notification");
    assert!(!failure.retryable);
    assert!(failure.description.is_some());
}

#[tokio::test]
async fn general_errors_truncate_internal_detail_and_allow_retry() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    fixture
        .sdk
        .push_action(Err(anyhow!("Solver quote expired: height 1234, pool drained")));

    let outcome = fixture.orchestrator.execute(bridge_request()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Solver quote expired"));
    let failure = fixture
        .sink
        .all()
        .into_iter()
        .find(|n| n.kind == NotificationKind::Error)
        .expect("failure notification");
    assert!(failure.retryable);
}

#[tokio::test]
async fn simulation_is_advisory_for_invalid_input() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;

    let preview = fixture
        .orchestrator
        .simulate(&FlowRequest::Bridge(BridgeParams {
            chain_id: 42161,
            token: String::new(),
            amount: "10".to_string(),
        }))
        .await;

    assert!(preview.is_none());
    assert_eq!(fixture.sdk.call_count("simulate_bridge"), 0);
}

#[tokio::test]
async fn simulation_failure_clears_the_preview_silently() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    fixture.sdk.push_simulation(Err(anyhow!("no route found")));

    let preview = fixture.orchestrator.simulate(&bridge_request()).await;

    assert!(preview.is_none());
    let snap = fixture.store.snapshot().await;
    assert!(snap.simulation.is_none());
    assert!(!snap.is_simulating);
    // Advisory: no error, no notification
    assert!(snap.error.is_none());
    assert!(fixture.sink.all().is_empty());
}

#[tokio::test]
async fn successful_simulation_lands_in_the_store() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    fixture.sdk.push_simulation(Ok(SimulationPreview {
        total_fee: Some("0.42".to_string()),
        ..SimulationPreview::default()
    }));

    let preview = fixture.orchestrator.simulate(&bridge_request()).await;

    assert_eq!(preview.unwrap().total_fee.as_deref(), Some("0.42"));
    let snap = fixture.store.snapshot().await;
    assert_eq!(
        snap.simulation.unwrap().total_fee.as_deref(),
        Some("0.42")
    );
}

#[tokio::test]
async fn transfers_have_no_simulation_endpoint() {
    let fixture = FlowFixture::new(TransactionKind::Transfer, RESET_DELAY).await;

    let preview = fixture
        .orchestrator
        .simulate(&FlowRequest::Transfer(TransferParams {
            chain_id: 8453,
            token: "ETH".to_string(),
            amount: "0.5".to_string(),
            recipient: "0xabc".to_string(),
        }))
        .await;

    assert!(preview.is_none());
}

#[tokio::test]
async fn scheduler_supersedes_earlier_simulations() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    let scheduler = SimulationScheduler::new(Duration::from_millis(30));

    scheduler
        .schedule(fixture.orchestrator.clone(), bridge_request())
        .await;
    scheduler
        .schedule(fixture.orchestrator.clone(), bridge_request())
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The first schedule was aborted inside its debounce window
    assert_eq!(fixture.sdk.call_count("simulate_bridge"), 1);
}

#[tokio::test]
async fn cancel_after_the_window_never_strands_the_simulating_flag() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    fixture.sdk.set_simulation_delay(Duration::from_millis(200));
    let scheduler = SimulationScheduler::new(Duration::from_millis(10));

    scheduler
        .schedule(fixture.orchestrator.clone(), bridge_request())
        .await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(fixture.store.snapshot().await.is_simulating);

    // Past the debounce window the call is already in flight; cancelling
    // must not leave the flag stuck
    scheduler.cancel().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let snap = fixture.store.snapshot().await;
    assert!(!snap.is_simulating);
    assert_eq!(fixture.sdk.call_count("simulate_bridge"), 1);
}

#[tokio::test]
async fn cancelled_simulations_never_run() {
    let fixture = FlowFixture::new(TransactionKind::Bridge, RESET_DELAY).await;
    let scheduler = SimulationScheduler::new(Duration::from_millis(30));

    scheduler
        .schedule(fixture.orchestrator.clone(), bridge_request())
        .await;
    scheduler.cancel().await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(fixture.sdk.call_count("simulate_bridge"), 0);
}
