use common_proxies::EnvironmentFault;
use common_structs::ReserveConfigUpdate;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::SimulatedMarket;

impl SimulatedMarket {
    /// Applies a configuration change without accruing the reserve.
    pub fn set_reserve_config(
        &self,
        asset: &str,
        update: &ReserveConfigUpdate,
    ) -> Result<(), EnvironmentFault> {
        let mut reserve = self.reserve_data(asset)?;
        update.apply(&mut reserve);
        self.set_reserve_data(asset, reserve);
        Ok(())
    }

    pub fn set_asset_price(
        &self,
        asset: &str,
        price: &ManagedDecimal<StaticApi, NumDecimals>,
    ) -> Result<(), EnvironmentFault> {
        let mut reserve = self.reserve_data(asset)?;
        reserve.price = price.clone();
        self.set_reserve_data(asset, reserve);
        Ok(())
    }
}
