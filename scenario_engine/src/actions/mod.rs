//! One executor per action kind.
//!
//! Executors submit the call, classify what came back and read back the
//! posterior state; they never judge whether the outcome was the expected one.

mod admin;
mod borrow;
mod liquidation;
mod supply;

use std::collections::BTreeSet;

use async_trait::async_trait;
use common_errors::FailureClass;
use common_proxies::{Environment, EnvironmentFault, ProtocolCall, Receipt};
use common_structs::MarketView;

use crate::{errors::StoryError, oracle::View};

pub use admin::{IncreaseTimeExecutor, SetAssetPriceExecutor, SetReserveConfigExecutor};
pub use borrow::{BorrowExecutor, RepayExecutor, SwapBorrowRateModeExecutor};
pub use liquidation::LiquidationCallExecutor;
pub use supply::{ApproveExecutor, DepositExecutor, MintExecutor, SetUseAsCollateralExecutor, WithdrawExecutor};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded(Receipt),
    /// `class` is `None` when the reason matches no known failure class.
    Reverted {
        class: Option<FailureClass>,
        reason: String,
    },
}

/// What an action left behind: its outcome and, when asked for, the
/// posterior view.
pub struct Execution {
    pub outcome: ActionOutcome,
    pub after: Option<View>,
}

/// The slice of the market a view covers.
#[derive(Clone, Copy)]
pub struct Observation<'a> {
    pub assets: &'a [String],
    pub participants: &'a BTreeSet<String>,
}

impl Observation<'_> {
    /// Queries every asset for every participant, plus their accounts.
    ///
    /// Without participants the reserves are still observed.
    pub async fn capture(&self, env: &mut dyn Environment) -> Result<View, StoryError> {
        let timestamp = env.current_timestamp().await?;
        let mut view = MarketView::new(timestamp);

        for asset in self.assets {
            if self.participants.is_empty() {
                let snapshot = env.query_state(asset, "").await?;
                view.reserves.insert(asset.clone(), snapshot.reserve);
            }
            for user in self.participants {
                let snapshot = env.query_state(asset, user).await?;
                view.insert_snapshot(asset, user, snapshot);
            }
        }
        for user in self.participants {
            let account = env.query_account(user).await?;
            view.accounts.insert(user.clone(), account);
        }

        Ok(view)
    }
}

#[async_trait(?Send)]
pub trait ActionExecutor {
    /// Users whose positions the action can change.
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String>;

    /// Submits the call. Protocol rejections are an outcome; transient
    /// environment faults are an error.
    async fn submit(&self, env: &mut dyn Environment, call: &ProtocolCall) -> Result<ActionOutcome, StoryError> {
        classify(env.perform_action(call).await)
    }

    /// Submits the call, then captures `observation` if one is given. A
    /// rejected call still gets its posterior view.
    async fn execute(
        &self,
        env: &mut dyn Environment,
        call: &ProtocolCall,
        observation: Option<Observation<'_>>,
    ) -> Result<Execution, StoryError> {
        let outcome = self.submit(env, call).await?;
        let after = match observation {
            Some(scope) => Some(scope.capture(env).await?),
            None => None,
        };
        Ok(Execution { outcome, after })
    }
}

pub fn classify(result: Result<Receipt, EnvironmentFault>) -> Result<ActionOutcome, StoryError> {
    match result {
        Ok(receipt) => Ok(ActionOutcome::Succeeded(receipt)),
        Err(EnvironmentFault::Reverted { reason }) => Ok(ActionOutcome::Reverted {
            class: FailureClass::from_reason(&reason),
            reason,
        }),
        Err(EnvironmentFault::Transient { reason }) => Err(StoryError::Transient(reason)),
    }
}

pub fn executor_for(call: &ProtocolCall) -> &'static dyn ActionExecutor {
    match call {
        ProtocolCall::Mint { .. } => &MintExecutor,
        ProtocolCall::Approve { .. } => &ApproveExecutor,
        ProtocolCall::Deposit { .. } => &DepositExecutor,
        ProtocolCall::Withdraw { .. } => &WithdrawExecutor,
        ProtocolCall::Borrow { .. } => &BorrowExecutor,
        ProtocolCall::Repay { .. } => &RepayExecutor,
        ProtocolCall::SetUseAsCollateral { .. } => &SetUseAsCollateralExecutor,
        ProtocolCall::SwapBorrowRateMode { .. } => &SwapBorrowRateModeExecutor,
        ProtocolCall::LiquidationCall { .. } => &LiquidationCallExecutor,
        ProtocolCall::SetReserveConfig { .. } => &SetReserveConfigExecutor,
        ProtocolCall::SetAssetPrice { .. } => &SetAssetPriceExecutor,
        ProtocolCall::IncreaseTime { .. } => &IncreaseTimeExecutor,
    }
}

fn actor_only(call: &ProtocolCall) -> Vec<String> {
    call.actor().map(str::to_string).into_iter().collect()
}
