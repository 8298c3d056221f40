use std::collections::BTreeMap;

use common_errors::ERROR_ASSET_NOT_SUPPORTED;
use common_proxies::EnvironmentFault;
use common_structs::{ReserveState, UserState};
use multiversx_sc::types::{BigUint, ManagedDecimal};
use multiversx_sc_scenario::api::StaticApi;

use crate::SimulatedMarket;

/// Everything the market persists between blocks, including the block clock.
///
/// Reserve and position records hold stored values only; their time-dependent
/// fields are filled in when they are read through a query.
#[derive(Clone)]
pub struct MarketStorage {
    pub block_timestamp: u64,
    pub reserves: BTreeMap<String, ReserveState<StaticApi>>,
    pub positions: BTreeMap<(String, String), UserState<StaticApi>>,
}

impl SimulatedMarket {
    pub fn block_timestamp(&self) -> u64 {
        self.storage.borrow().block_timestamp
    }

    /// Mines a block one second after the previous one.
    pub(crate) fn mine_block(&self) -> Result<u64, EnvironmentFault> {
        self.move_clock(common_constants::BLOCK_TIME_SECONDS)
    }

    /// Moves the block clock forward; a clock that would wrap is refused and
    /// left where it was.
    pub(crate) fn move_clock(&self, seconds: u64) -> Result<u64, EnvironmentFault> {
        let mut storage = self.storage.borrow_mut();
        let Some(timestamp) = storage.block_timestamp.checked_add(seconds) else {
            return Err(EnvironmentFault::Reverted {
                reason: format!("block timestamp overflow: {} + {seconds}", storage.block_timestamp),
            });
        };
        storage.block_timestamp = timestamp;
        Ok(timestamp)
    }

    pub fn listed_assets(&self) -> Vec<String> {
        self.storage.borrow().reserves.keys().cloned().collect()
    }

    pub(crate) fn reserve_data(&self, asset: &str) -> Result<ReserveState<StaticApi>, EnvironmentFault> {
        self.storage
            .borrow()
            .reserves
            .get(asset)
            .cloned()
            .ok_or_else(|| EnvironmentFault::Reverted {
                reason: ERROR_ASSET_NOT_SUPPORTED.to_string(),
            })
    }

    pub(crate) fn set_reserve_data(&self, asset: &str, reserve: ReserveState<StaticApi>) {
        self.storage
            .borrow_mut()
            .reserves
            .insert(asset.to_string(), reserve);
    }

    /// Stored position of `user`, or an empty one at the reserve's decimals.
    pub(crate) fn position_data(
        &self,
        asset: &str,
        user: &str,
    ) -> Result<UserState<StaticApi>, EnvironmentFault> {
        let key = (asset.to_string(), user.to_string());
        if let Some(position) = self.storage.borrow().positions.get(&key) {
            return Ok(position.clone());
        }

        let reserve = self.reserve_data(asset)?;
        Ok(empty_position(reserve.decimals))
    }

    pub(crate) fn set_position_data(&self, asset: &str, user: &str, position: UserState<StaticApi>) {
        self.storage
            .borrow_mut()
            .positions
            .insert((asset.to_string(), user.to_string()), position);
    }
}

fn empty_position(decimals: usize) -> UserState<StaticApi> {
    let zero = || ManagedDecimal::from_raw_units(BigUint::zero(), decimals);
    UserState {
        scaled_a_token_balance: zero(),
        current_a_token_balance: zero(),
        principal_stable_debt: zero(),
        current_stable_debt: zero(),
        scaled_variable_debt: zero(),
        current_variable_debt: zero(),
        stable_borrow_rate: ManagedDecimal::from_raw_units(
            BigUint::zero(),
            common_constants::RAY_PRECISION,
        ),
        stable_rate_last_updated: 0,
        usage_as_collateral_enabled: false,
        wallet_balance: zero(),
        allowance: zero(),
    }
}
