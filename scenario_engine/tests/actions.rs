use std::collections::BTreeSet;

use common_errors::FailureClass;
use common_proxies::{Amount, ProtocolCall, Receipt};
use common_structs::InterestRateMode;
use market_sim::GENESIS_TIMESTAMP;
use multiversx_sc::types::BigUint;
use scenario_engine::actions::{executor_for, ActionOutcome, Observation};

pub mod setup;
use setup::*;

fn participants(users: &[&str]) -> BTreeSet<String> {
    users.iter().map(|user| user.to_string()).collect()
}

fn mint(user: &str, text: &str) -> ProtocolCall {
    ProtocolCall::Mint {
        user: user.to_string(),
        asset: USDC.to_string(),
        amount: amount(USDC, text),
    }
}

/// Covers:
/// - the posterior view is read at the block the call was mined in
/// - every listed asset and account is part of it
#[tokio::test]
async fn executed_call_carries_posterior_view() {
    let mut env = market(&config());
    let assets = assets();
    let users = participants(&["alice"]);
    let observation = Observation {
        assets: &assets,
        participants: &users,
    };

    let call = mint("alice", "100");
    let execution = executor_for(&call).execute(&mut env, &call, Some(observation)).await.unwrap();

    let after = execution.after.unwrap();
    assert_eq!(
        execution.outcome,
        ActionOutcome::Succeeded(Receipt {
            timestamp: GENESIS_TIMESTAMP + 1
        })
    );
    assert_eq!(after.timestamp, GENESIS_TIMESTAMP + 1);
    let wallet = &after.position(USDC, "alice").unwrap().wallet_balance;
    assert_eq!(wallet.into_raw_units(), &BigUint::from(100_000_000u64));
    assert!(after.position(WETH, "alice").is_some());
    assert!(after.account("alice").is_some());
}

/// A rejected call is classified and still observed; the block it used is mined.
#[tokio::test]
async fn rejected_call_is_classified_and_observed() {
    let mut env = market(&config());
    let assets = assets();
    let users = participants(&["alice"]);
    let observation = Observation {
        assets: &assets,
        participants: &users,
    };

    let call = ProtocolCall::Deposit {
        user: "alice".to_string(),
        asset: USDC.to_string(),
        amount: amount(USDC, "0"),
    };
    let execution = executor_for(&call).execute(&mut env, &call, Some(observation)).await.unwrap();

    match execution.outcome {
        ActionOutcome::Reverted { class, .. } => assert_eq!(class, Some(FailureClass::InvalidAmount)),
        other => panic!("expected a revert, got {other:?}"),
    }
    assert_eq!(execution.after.unwrap().timestamp, GENESIS_TIMESTAMP + 1);
}

/// Time travel mines nothing and, without an observation, reads nothing back.
#[tokio::test]
async fn increase_time_moves_clock_without_view() {
    let mut env = market(&config());

    let call = ProtocolCall::IncreaseTime { seconds: 3600 };
    let execution = executor_for(&call).execute(&mut env, &call, None).await.unwrap();

    assert_eq!(
        execution.outcome,
        ActionOutcome::Succeeded(Receipt {
            timestamp: GENESIS_TIMESTAMP + 3600
        })
    );
    assert!(execution.after.is_none());
}

/// Covers:
/// - repay on behalf of another user involves payer and debtor
/// - liquidation involves liquidator and borrower
/// - admin calls involve nobody
#[test]
fn involved_users_cover_every_affected_party() {
    let repay = ProtocolCall::Repay {
        user: "bob".to_string(),
        asset: USDC.to_string(),
        amount: Amount::Max,
        rate_mode: InterestRateMode::Variable,
        on_behalf_of: "alice".to_string(),
    };
    assert_eq!(executor_for(&repay).involved_users(&repay), vec!["bob", "alice"]);

    let liquidation = ProtocolCall::LiquidationCall {
        liquidator: "carol".to_string(),
        collateral_asset: WETH.to_string(),
        debt_asset: USDC.to_string(),
        borrower: "alice".to_string(),
        debt_to_cover: Amount::Max,
        receive_a_token: false,
    };
    assert_eq!(
        executor_for(&liquidation).involved_users(&liquidation),
        vec!["carol", "alice"]
    );

    let time = ProtocolCall::IncreaseTime { seconds: 1 };
    assert!(executor_for(&time).involved_users(&time).is_empty());
    assert_eq!(executor_for(&mint("dave", "1")).involved_users(&mint("dave", "1")), vec!["dave"]);
}
