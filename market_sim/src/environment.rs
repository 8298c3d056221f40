use async_trait::async_trait;
use common_proxies::{Environment, EnvironmentFault, ProtocolCall, Receipt, SnapshotId};
use common_structs::{AccountState, StateSnapshot};
use multiversx_sc_scenario::api::StaticApi;

use crate::{positions::LiquidationRequest, SimulatedMarket};

#[async_trait(?Send)]
impl Environment for SimulatedMarket {
    async fn perform_action(&mut self, call: &ProtocolCall) -> Result<Receipt, EnvironmentFault> {
        self.take_transient_fault()?;

        if let ProtocolCall::IncreaseTime { seconds } = call {
            let timestamp = self.advance_time(*seconds).await?;
            return Ok(Receipt { timestamp });
        }

        let timestamp = self.mine_block()?;
        log::trace!("block {timestamp}: {}", call.name());
        self.dispatch(call)?;
        Ok(Receipt { timestamp })
    }

    async fn query_state(
        &mut self,
        asset: &str,
        user: &str,
    ) -> Result<StateSnapshot<StaticApi>, EnvironmentFault> {
        self.take_transient_fault()?;
        let now = self.block_timestamp();
        Ok(StateSnapshot {
            reserve: self.current_reserve(asset, now)?,
            user: self.current_position(asset, user, now)?,
        })
    }

    async fn query_account(&mut self, user: &str) -> Result<AccountState<StaticApi>, EnvironmentFault> {
        self.take_transient_fault()?;
        self.account_data(user, self.block_timestamp())
    }

    async fn current_timestamp(&mut self) -> Result<u64, EnvironmentFault> {
        Ok(self.block_timestamp())
    }

    async fn advance_time(&mut self, seconds: u64) -> Result<u64, EnvironmentFault> {
        self.move_clock(seconds)
    }

    async fn snapshot(&mut self) -> Result<SnapshotId, EnvironmentFault> {
        Ok(SnapshotId(self.take_snapshot()))
    }

    async fn revert_to(&mut self, id: SnapshotId) -> Result<(), EnvironmentFault> {
        if self.restore_snapshot(id.0) {
            return Ok(());
        }

        Err(EnvironmentFault::Transient {
            reason: format!("unknown snapshot {}", id.0),
        })
    }

    async fn release_snapshot(&mut self, id: SnapshotId) -> Result<(), EnvironmentFault> {
        self.discard_snapshot(id.0);
        Ok(())
    }
}

impl SimulatedMarket {
    fn dispatch(&self, call: &ProtocolCall) -> Result<(), EnvironmentFault> {
        match call {
            ProtocolCall::Mint { user, asset, amount } => self.mint(user, asset, amount),
            ProtocolCall::Approve { user, asset, amount } => self.approve(user, asset, amount),
            ProtocolCall::Deposit { user, asset, amount } => self.deposit(user, asset, amount),
            ProtocolCall::Withdraw { user, asset, amount } => self.withdraw(user, asset, amount),
            ProtocolCall::Borrow {
                user,
                asset,
                amount,
                rate_mode,
            } => self.borrow(user, asset, amount, *rate_mode),
            ProtocolCall::Repay {
                user,
                asset,
                amount,
                rate_mode,
                on_behalf_of,
            } => self.repay(user, asset, amount, *rate_mode, on_behalf_of),
            ProtocolCall::SetUseAsCollateral { user, asset, enabled } => {
                self.set_use_as_collateral(user, asset, *enabled)
            },
            ProtocolCall::SwapBorrowRateMode { user, asset, rate_mode } => {
                self.swap_borrow_rate_mode(user, asset, *rate_mode)
            },
            ProtocolCall::LiquidationCall {
                liquidator,
                collateral_asset,
                debt_asset,
                borrower,
                debt_to_cover,
                receive_a_token,
            } => self.liquidation_call(LiquidationRequest {
                liquidator,
                collateral_asset,
                debt_asset,
                borrower,
                debt_to_cover,
                receive_a_token: *receive_a_token,
            }),
            ProtocolCall::SetReserveConfig { asset, update } => self.set_reserve_config(asset, update),
            ProtocolCall::SetAssetPrice { asset, price } => self.set_asset_price(asset, price),
            ProtocolCall::IncreaseTime { .. } => Ok(()),
        }
    }
}
