use common_proxies::EnvironmentFault;
use common_rates::{AccountMath, InterestRates};
use common_structs::{AccountState, ReserveState, UserState};
use multiversx_sc_scenario::api::StaticApi;

use crate::SimulatedMarket;

impl SimulatedMarket {
    /// Reserve as it reads at `now`, current debt totals included.
    pub fn current_reserve(
        &self,
        asset: &str,
        now: u64,
    ) -> Result<ReserveState<StaticApi>, EnvironmentFault> {
        let mut reserve = self.reserve_data(asset)?;
        self.project_reserve(&self.ctx, &mut reserve, now);
        Ok(reserve)
    }

    /// Position as it reads at `now`, accrued balances included.
    pub fn current_position(
        &self,
        asset: &str,
        user: &str,
        now: u64,
    ) -> Result<UserState<StaticApi>, EnvironmentFault> {
        let reserve = self.reserve_data(asset)?;
        let mut position = self.position_data(asset, user)?;
        self.project_position(&self.ctx, &reserve, &mut position, now);
        Ok(position)
    }

    /// Risk summary of `user` across every listed reserve.
    pub fn account_data(&self, user: &str, now: u64) -> Result<AccountState<StaticApi>, EnvironmentFault> {
        let mut entries = Vec::new();
        for asset in self.listed_assets() {
            let reserve = self.current_reserve(&asset, now)?;
            let position = self.current_position(&asset, user, now)?;
            entries.push((reserve, position));
        }

        let pairs: Vec<_> = entries.iter().map(|(reserve, position)| (reserve, position)).collect();
        Ok(self.calculate_account_data(&self.ctx, &pairs))
    }
}
