use common_math::SharedMathModule;
use common_proxies::{Amount, EnvironmentFault};
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::SimulatedMarket;

impl SimulatedMarket {
    /// Test-token faucet: credits `amount` to the user's wallet.
    pub fn mint(
        &self,
        user: &str,
        asset: &str,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) -> Result<(), EnvironmentFault> {
        let mut position = self.position_data(asset, user)?;
        position.wallet_balance = self.add_same_scale(&position.wallet_balance, amount);
        self.set_position_data(asset, user, position);
        Ok(())
    }

    /// Sets the allowance granted to the market; `Max` grants `u128::MAX` raw units.
    pub fn approve(&self, user: &str, asset: &str, amount: &Amount) -> Result<(), EnvironmentFault> {
        let mut position = self.position_data(asset, user)?;
        position.allowance = match amount {
            Amount::Exact(value) => value.clone(),
            Amount::Max => ManagedDecimal::<StaticApi, NumDecimals>::from_raw_units(
                BigUint::from(u128::MAX),
                position.allowance.scale(),
            ),
        };
        self.set_position_data(asset, user, position);
        Ok(())
    }
}
