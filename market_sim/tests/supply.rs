use common_errors::{
    ERROR_DEPOSIT_ALREADY_IN_USE, ERROR_INSUFFICIENT_ALLOWANCE, ERROR_INVALID_AMOUNT,
    ERROR_NOT_ENOUGH_AVAILABLE_USER_BALANCE, ERROR_RESERVE_FROZEN,
    ERROR_UNDERLYING_BALANCE_NOT_GREATER_THAN_ZERO,
};
use common_proxies::{Amount, Environment, EnvironmentFault, ProtocolCall};
use common_structs::{InterestRateMode, ReserveConfigUpdate};
use market_sim::GENESIS_TIMESTAMP;

use setup::*;

/// A first deposit at the initial index mints scaled balance one to one.
///
/// Covers:
/// - deposit wallet pull and allowance consumption
/// - collateral flag set on the first supply
/// - reserve liquidity and zero utilization
#[tokio::test]
async fn deposit_first_supply_mints_scaled_one_to_one() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.scaled_a_token_balance), big(1_000_000_000));
    assert_eq!(raw(&position.current_a_token_balance), big(1_000_000_000));
    assert_eq!(raw(&position.wallet_balance), big(0));
    assert!(position.usage_as_collateral_enabled);

    let reserve = state.reserve(USDC).await;
    assert_eq!(raw(&reserve.available_liquidity), big(1_000_000_000));
    assert_eq!(raw(&reserve.total_liquidity), big(1_000_000_000));
    assert_eq!(raw(&reserve.utilization_rate), big(0));
    assert_eq!(raw(&reserve.liquidity_index), big(1_000_000_000_000_000_000_000_000_000));
}

/// Every call mines one block, reverted calls included.
#[tokio::test]
async fn every_call_mines_a_block_one_second_apart() {
    let mut state = MarketTestState::new();
    state.fund("alice", USDC, "10").await;
    assert_eq!(state.market.current_timestamp().await.unwrap(), GENESIS_TIMESTAMP + 2);

    let reason = revert_reason(state.deposit("alice", USDC, "0").await);
    assert_eq!(reason, ERROR_INVALID_AMOUNT);
    assert_eq!(state.market.current_timestamp().await.unwrap(), GENESIS_TIMESTAMP + 3);

    let receipt = state.deposit("alice", USDC, "10").await.unwrap();
    assert_eq!(receipt.timestamp, GENESIS_TIMESTAMP + 4);
}

/// `increaseTime` moves the clock without mining a block.
#[tokio::test]
async fn increase_time_advances_clock_without_mining() {
    let mut state = MarketTestState::new();
    let receipt = state
        .call(ProtocolCall::IncreaseTime { seconds: 3_600 })
        .await
        .unwrap();

    assert_eq!(receipt.timestamp, GENESIS_TIMESTAMP + 3_600);
    assert_eq!(state.market.current_timestamp().await.unwrap(), GENESIS_TIMESTAMP + 3_600);
}

/// The market pulls tokens only within the granted allowance.
#[tokio::test]
async fn deposit_without_allowance_reverts() {
    let mut state = MarketTestState::new();
    state
        .call(ProtocolCall::Mint {
            user: "alice".to_string(),
            asset: USDC.to_string(),
            amount: MarketTestState::amount(USDC, "100"),
        })
        .await
        .unwrap();

    let reason = revert_reason(state.deposit("alice", USDC, "100").await);
    assert_eq!(reason, ERROR_INSUFFICIENT_ALLOWANCE);

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.wallet_balance), big(100_000_000));
    assert_eq!(raw(&position.scaled_a_token_balance), big(0));
}

#[tokio::test]
async fn deposit_into_frozen_reserve_reverts() {
    let mut state = MarketTestState::new();
    state.fund("alice", USDC, "100").await;
    state
        .call(ProtocolCall::SetReserveConfig {
            asset: USDC.to_string(),
            update: ReserveConfigUpdate {
                is_frozen: Some(true),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    let reason = revert_reason(state.deposit("alice", USDC, "100").await);
    assert_eq!(reason, ERROR_RESERVE_FROZEN);
}

/// Withdrawing everything returns the wallet to its funded amount and
/// releases the collateral flag.
#[tokio::test]
async fn withdraw_max_returns_full_balance_and_disables_collateral() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "250").await;

    state
        .call(ProtocolCall::Withdraw {
            user: "alice".to_string(),
            asset: USDC.to_string(),
            amount: Amount::Max,
        })
        .await
        .unwrap();

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.scaled_a_token_balance), big(0));
    assert_eq!(raw(&position.wallet_balance), big(250_000_000));
    assert!(!position.usage_as_collateral_enabled);

    let reserve = state.reserve(USDC).await;
    assert_eq!(raw(&reserve.available_liquidity), big(0));
}

#[tokio::test]
async fn withdraw_above_balance_reverts() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "250").await;

    let reason = revert_reason(
        state
            .call(ProtocolCall::Withdraw {
                user: "alice".to_string(),
                asset: USDC.to_string(),
                amount: Amount::Exact(MarketTestState::amount(USDC, "250.000001")),
            })
            .await,
    );
    assert_eq!(reason, ERROR_NOT_ENOUGH_AVAILABLE_USER_BALANCE);
}

#[tokio::test]
async fn set_use_as_collateral_without_supply_reverts() {
    let mut state = MarketTestState::new();

    let reason = revert_reason(
        state
            .call(ProtocolCall::SetUseAsCollateral {
                user: "alice".to_string(),
                asset: WETH.to_string(),
                enabled: true,
            })
            .await,
    );
    assert_eq!(reason, ERROR_UNDERLYING_BALANCE_NOT_GREATER_THAN_ZERO);
}

/// Collateral backing an open loan cannot be released.
#[tokio::test]
async fn disable_collateral_backing_debt_reverts() {
    let mut state = MarketTestState::new();
    state.supply("bob", USDC, "10000").await;
    state.supply("alice", WETH, "1").await;
    state
        .borrow("alice", USDC, "1000", InterestRateMode::Variable)
        .await
        .unwrap();

    let reason = revert_reason(
        state
            .call(ProtocolCall::SetUseAsCollateral {
                user: "alice".to_string(),
                asset: WETH.to_string(),
                enabled: false,
            })
            .await,
    );
    assert_eq!(reason, ERROR_DEPOSIT_ALREADY_IN_USE);
    assert!(state.position(WETH, "alice").await.usage_as_collateral_enabled);
}

/// Injected faults fail calls before they reach the market; a snapshot
/// restores storage and clock together.
#[tokio::test]
async fn transient_faults_do_not_mine_and_snapshots_restore_state() {
    let mut state = MarketTestState::new();
    state.fund("alice", USDC, "100").await;
    let baseline = state.market.snapshot().await.unwrap();
    let before = state.market.current_timestamp().await.unwrap();

    state.market.inject_transient_faults(1);
    let fault = state.deposit("alice", USDC, "100").await;
    assert!(matches!(fault, Err(EnvironmentFault::Transient { .. })));
    assert_eq!(state.market.current_timestamp().await.unwrap(), before);

    state.deposit("alice", USDC, "100").await.unwrap();
    assert_eq!(raw(&state.position(USDC, "alice").await.wallet_balance), big(0));

    state.market.revert_to(baseline).await.unwrap();
    assert_eq!(state.market.current_timestamp().await.unwrap(), before);
    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.wallet_balance), big(100_000_000));
    assert_eq!(raw(&position.scaled_a_token_balance), big(0));
}

/// Covers:
/// - reverting consumes the snapshot and every later one
/// - released snapshots cannot be reverted to
#[tokio::test]
async fn reverted_and_released_snapshots_are_dropped() {
    let mut state = MarketTestState::new();
    let first = state.market.snapshot().await.unwrap();
    state.fund("alice", USDC, "100").await;
    let second = state.market.snapshot().await.unwrap();
    assert_eq!(state.market.retained_snapshots(), 2);

    state.market.revert_to(first).await.unwrap();
    assert_eq!(state.market.retained_snapshots(), 0);
    assert!(matches!(
        state.market.revert_to(first).await,
        Err(EnvironmentFault::Transient { .. })
    ));
    assert!(state.market.revert_to(second).await.is_err());

    let third = state.market.snapshot().await.unwrap();
    state.market.release_snapshot(third).await.unwrap();
    assert_eq!(state.market.retained_snapshots(), 0);
    assert!(state.market.revert_to(third).await.is_err());
}

/// A clock jump past the end of time is refused and leaves the clock alone.
#[tokio::test]
async fn clock_overflow_refused_without_moving_time() {
    let mut state = MarketTestState::new();

    let fault = state.market.advance_time(u64::MAX).await;
    assert!(matches!(fault, Err(EnvironmentFault::Reverted { .. })));
    assert_eq!(state.market.current_timestamp().await.unwrap(), GENESIS_TIMESTAMP);

    let fault = state.call(ProtocolCall::IncreaseTime { seconds: u64::MAX }).await;
    assert!(matches!(fault, Err(EnvironmentFault::Reverted { .. })));

    let last = u64::MAX - GENESIS_TIMESTAMP;
    assert_eq!(state.market.advance_time(last).await.unwrap(), u64::MAX);
    let fault = state.call(ProtocolCall::SetAssetPrice {
        asset: USDC.to_string(),
        price: MarketTestState::amount(USDC, "1"),
    })
    .await;
    assert!(matches!(fault, Err(EnvironmentFault::Reverted { .. })));
    assert_eq!(state.market.current_timestamp().await.unwrap(), u64::MAX);
}
