use common_math::SharedMathModule;
use common_proxies::EnvironmentFault;
use common_rates::InterestRates;
use common_structs::{MarketParams, ReserveState};
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::SimulatedMarket;

/// A reserve loaded for the duration of one call.
///
/// **Scope**: Working copy of a stored reserve plus its rate strategy and the
/// current block timestamp.
///
/// **Goal**: Let a call accrue, move balances and reprice a reserve in memory;
/// the record is written back when the cache is dropped.
pub struct Cache<'a> {
    sc_ref: &'a SimulatedMarket,
    pub asset: String,
    pub reserve: ReserveState<StaticApi>,
    pub params: MarketParams<StaticApi>,
    /// The timestamp of the current block.
    pub timestamp: u64,
    /// Zero at the reserve's decimals, for comparisons.
    pub zero: ManagedDecimal<StaticApi, NumDecimals>,
}

impl<'a> Cache<'a> {
    pub fn new(sc_ref: &'a SimulatedMarket, asset: &str) -> Result<Self, EnvironmentFault> {
        let reserve = sc_ref.reserve_data(asset)?;
        let params = sc_ref.market_params(asset)?;

        Ok(Cache {
            zero: sc_ref.zero_at(reserve.decimals),
            timestamp: sc_ref.block_timestamp(),
            asset: asset.to_string(),
            reserve,
            params,
            sc_ref,
        })
    }

    /// Accrues indexes up to the current block.
    pub fn update_state(&mut self) {
        self.sc_ref
            .update_reserve_state(&self.sc_ref.ctx, &mut self.reserve, self.timestamp);
    }

    /// Reprices the reserve from its settled balances.
    pub fn update_interest_rates(&mut self) {
        self.sc_ref.update_reserve_rates(
            &self.sc_ref.ctx,
            &self.params,
            &mut self.reserve,
            self.timestamp,
        );
    }

    pub fn add_liquidity(&mut self, amount: &ManagedDecimal<StaticApi, NumDecimals>) {
        self.reserve.available_liquidity = self
            .sc_ref
            .add_same_scale(&self.reserve.available_liquidity, amount);
    }

    pub fn take_liquidity(&mut self, amount: &ManagedDecimal<StaticApi, NumDecimals>) {
        self.reserve.available_liquidity = self
            .sc_ref
            .saturating_sub(&self.reserve.available_liquidity, amount);
    }

    pub fn has_liquidity(&self, amount: &ManagedDecimal<StaticApi, NumDecimals>) -> bool {
        self.reserve.available_liquidity.into_raw_units() >= amount.into_raw_units()
    }
}

impl Drop for Cache<'_> {
    fn drop(&mut self) {
        self.sc_ref
            .set_reserve_data(&self.asset, self.reserve.clone());
    }
}
