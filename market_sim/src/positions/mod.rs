//! State-changing calls of the simulated market, one module per area.
//!
//! Every call validates first and mutates after, so a rejected call leaves
//! storage untouched apart from the mined block.

mod borrow;
mod config;
mod liquidation;
mod supply;
mod wallet;

pub use liquidation::LiquidationRequest;

use common_math::SharedMathModule;
use common_structs::UserState;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::SimulatedMarket;

impl SimulatedMarket {
    /// Moves `amount` out of a wallet into the market, consuming allowance.
    pub(crate) fn pull_from_wallet(
        &self,
        payer: &mut UserState<StaticApi>,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) {
        payer.wallet_balance = self.saturating_sub(&payer.wallet_balance, amount);
        payer.allowance = self.saturating_sub(&payer.allowance, amount);
    }

    pub(crate) fn push_to_wallet(
        &self,
        receiver: &mut UserState<StaticApi>,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) {
        receiver.wallet_balance = self.add_same_scale(&receiver.wallet_balance, amount);
    }
}
