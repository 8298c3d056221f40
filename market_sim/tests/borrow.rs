use common_errors::{
    ERROR_AMOUNT_BIGGER_THAN_MAX_LOAN_SIZE_STABLE, ERROR_COLLATERAL_BALANCE_IS_ZERO,
    ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW, ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY,
    ERROR_NO_DEBT_OF_SELECTED_TYPE, ERROR_NO_EXPLICIT_AMOUNT_TO_REPAY_ON_BEHALF,
    ERROR_STABLE_BORROWING_NOT_ENABLED,
};
use common_proxies::{Amount, ProtocolCall};
use common_structs::{InterestRateMode, ReserveConfigUpdate};

use setup::*;

/// Deposit 1000 USDC, borrow 500 USDC variable from the same reserve.
///
/// Covers:
/// - scaled variable debt minted at the initial index
/// - utilization of one half and the resulting variable and liquidity rates
/// - borrowed funds credited to the wallet
#[tokio::test]
async fn borrow_variable_half_of_reserve_reprices_curve() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;
    state
        .borrow("alice", USDC, "500", InterestRateMode::Variable)
        .await
        .unwrap();

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.scaled_variable_debt), big(500_000_000));
    assert_eq!(raw(&position.current_variable_debt), big(500_000_000));
    assert_eq!(raw(&position.wallet_balance), big(500_000_000));

    let reserve = state.reserve(USDC).await;
    assert_eq!(raw(&reserve.available_liquidity), big(500_000_000));
    assert_eq!(raw(&reserve.utilization_rate), big(500_000_000_000_000_000_000_000_000));
    assert_eq!(raw(&reserve.variable_borrow_rate), big(25_000_000_000_000_000_000_000_000));
    assert_eq!(raw(&reserve.liquidity_rate), big(11_250_000_000_000_000_000_000_000));
}

/// Interest accrues on both sides once time passes.
#[tokio::test]
async fn borrow_variable_accrues_over_time() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;
    state
        .borrow("alice", USDC, "500", InterestRateMode::Variable)
        .await
        .unwrap();
    state
        .call(ProtocolCall::IncreaseTime { seconds: 31_536_000 })
        .await
        .unwrap();

    let position = state.position(USDC, "alice").await;
    assert!(raw(&position.current_variable_debt) > big(500_000_000));
    assert!(raw(&position.current_a_token_balance) > big(1_000_000_000));
    assert_eq!(raw(&position.scaled_variable_debt), big(500_000_000));
}

#[tokio::test]
async fn borrow_without_collateral_reverts() {
    let mut state = MarketTestState::new();
    state.supply("bob", USDC, "1000").await;

    let reason = revert_reason(state.borrow("alice", USDC, "1", InterestRateMode::Variable).await);
    assert_eq!(reason, ERROR_COLLATERAL_BALANCE_IS_ZERO);
}

/// 1000 USDC of collateral at 80% LTV supports at most 800 USDC of debt.
#[tokio::test]
async fn borrow_beyond_ltv_reverts() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;

    let reason = revert_reason(state.borrow("alice", USDC, "900", InterestRateMode::Variable).await);
    assert_eq!(reason, ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW);

    state
        .borrow("alice", USDC, "800", InterestRateMode::Variable)
        .await
        .unwrap();
    let account = state.account("alice").await;
    assert_eq!(raw(&account.total_collateral_base), big(500_000_000_000_000_000));
    assert_eq!(raw(&account.total_debt_base), big(400_000_000_000_000_000));
}

#[tokio::test]
async fn borrow_stable_when_disabled_reverts() {
    let mut state = MarketTestState::new();
    state.supply("bob", USDC, "1000").await;
    state.supply("alice", WETH, "1").await;
    state
        .call(ProtocolCall::SetReserveConfig {
            asset: USDC.to_string(),
            update: ReserveConfigUpdate {
                stable_borrow_rate_enabled: Some(false),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    let reason = revert_reason(state.borrow("alice", USDC, "100", InterestRateMode::Stable).await);
    assert_eq!(reason, ERROR_STABLE_BORROWING_NOT_ENABLED);
}

/// Stable loans cannot be backed by a larger deposit of the same asset.
#[tokio::test]
async fn borrow_stable_against_same_asset_reverts() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;

    let reason = revert_reason(state.borrow("alice", USDC, "100", InterestRateMode::Stable).await);
    assert_eq!(reason, ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY);
}

#[tokio::test]
async fn borrow_stable_above_quarter_of_liquidity_reverts() {
    let mut state = MarketTestState::new();
    state.supply("bob", USDC, "1000").await;
    state.supply("alice", WETH, "1").await;

    let reason = revert_reason(state.borrow("alice", USDC, "250.000001", InterestRateMode::Stable).await);
    assert_eq!(reason, ERROR_AMOUNT_BIGGER_THAN_MAX_LOAN_SIZE_STABLE);
}

/// A first stable loan locks the reserve's current stable rate, which at
/// zero utilization is the base stable rate.
#[tokio::test]
async fn borrow_stable_locks_base_rate() {
    let mut state = MarketTestState::new();
    state.supply("bob", USDC, "1000").await;
    state.supply("alice", WETH, "1").await;
    state
        .borrow("alice", USDC, "100", InterestRateMode::Stable)
        .await
        .unwrap();

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.principal_stable_debt), big(100_000_000));
    assert_eq!(raw(&position.current_stable_debt), big(100_000_000));
    assert_eq!(raw(&position.stable_borrow_rate), big(20_000_000_000_000_000_000_000_000));

    let reserve = state.reserve(USDC).await;
    assert_eq!(raw(&reserve.principal_stable_debt), big(100_000_000));
    assert_eq!(raw(&reserve.average_stable_borrow_rate), big(20_000_000_000_000_000_000_000_000));
    assert_eq!(raw(&reserve.utilization_rate), big(100_000_000_000_000_000_000_000_000));
}

#[tokio::test]
async fn repay_max_clears_variable_debt() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;
    state
        .borrow("alice", USDC, "100", InterestRateMode::Variable)
        .await
        .unwrap();
    state.fund("alice", USDC, "1").await;

    state
        .call(ProtocolCall::Repay {
            user: "alice".to_string(),
            asset: USDC.to_string(),
            amount: Amount::Max,
            rate_mode: InterestRateMode::Variable,
            on_behalf_of: "alice".to_string(),
        })
        .await
        .unwrap();

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.scaled_variable_debt), big(0));
    assert_eq!(raw(&state.reserve(USDC).await.scaled_variable_debt), big(0));
}

#[tokio::test]
async fn repay_max_on_behalf_of_other_reverts() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;
    state
        .borrow("alice", USDC, "100", InterestRateMode::Variable)
        .await
        .unwrap();
    state.fund("bob", USDC, "200").await;

    let reason = revert_reason(
        state
            .call(ProtocolCall::Repay {
                user: "bob".to_string(),
                asset: USDC.to_string(),
                amount: Amount::Max,
                rate_mode: InterestRateMode::Variable,
                on_behalf_of: "alice".to_string(),
            })
            .await,
    );
    assert_eq!(reason, ERROR_NO_EXPLICIT_AMOUNT_TO_REPAY_ON_BEHALF);
}

#[tokio::test]
async fn repay_without_debt_of_mode_reverts() {
    let mut state = MarketTestState::new();
    state.supply("alice", USDC, "1000").await;
    state
        .borrow("alice", USDC, "100", InterestRateMode::Variable)
        .await
        .unwrap();

    let reason = revert_reason(
        state
            .call(ProtocolCall::Repay {
                user: "alice".to_string(),
                asset: USDC.to_string(),
                amount: Amount::Exact(MarketTestState::amount(USDC, "10")),
                rate_mode: InterestRateMode::Stable,
                on_behalf_of: "alice".to_string(),
            })
            .await,
    );
    assert_eq!(reason, ERROR_NO_DEBT_OF_SELECTED_TYPE);
}

/// Swapping moves the whole variable debt into stable debt.
#[tokio::test]
async fn swap_variable_to_stable_moves_whole_debt() {
    let mut state = MarketTestState::new();
    state.supply("bob", USDC, "1000").await;
    state.supply("alice", WETH, "1").await;
    state
        .borrow("alice", USDC, "100", InterestRateMode::Variable)
        .await
        .unwrap();

    state
        .call(ProtocolCall::SwapBorrowRateMode {
            user: "alice".to_string(),
            asset: USDC.to_string(),
            rate_mode: InterestRateMode::Variable,
        })
        .await
        .unwrap();

    let position = state.position(USDC, "alice").await;
    assert_eq!(raw(&position.scaled_variable_debt), big(0));
    assert!(raw(&position.principal_stable_debt) >= big(100_000_000));

    let reserve = state.reserve(USDC).await;
    assert_eq!(raw(&reserve.scaled_variable_debt), big(0));
    assert_eq!(raw(&reserve.principal_stable_debt), raw(&position.principal_stable_debt));
}
