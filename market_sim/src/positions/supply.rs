use common_errors::{
    ERROR_DEPOSIT_ALREADY_IN_USE, ERROR_INSUFFICIENT_LIQUIDITY,
    ERROR_NOT_ENOUGH_AVAILABLE_USER_BALANCE, ERROR_TRANSFER_NOT_ALLOWED,
    ERROR_UNDERLYING_BALANCE_NOT_GREATER_THAN_ZERO,
};
use common_math::SharedMathModule;
use common_proxies::{Amount, EnvironmentFault};
use common_rates::{AccountMath, InterestRates};
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::{cache::Cache, validation, SimulatedMarket};

impl SimulatedMarket {
    /// Supplies `amount` from the user's wallet and mints scaled aTokens.
    ///
    /// **Process**:
    /// 1. Validates amount and reserve status, then the wallet pull.
    /// 2. Accrues the reserve, adds the liquidity and reprices it.
    /// 3. Mints `rayDiv(amount, liquidityIndex)`; a first deposit turns the
    ///    position into collateral.
    pub fn deposit(
        &self,
        user: &str,
        asset: &str,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) -> Result<(), EnvironmentFault> {
        let mut cache = Cache::new(self, asset)?;
        validation::require_amount_greater_than_zero(amount)?;
        validation::require_active_not_frozen(&cache.reserve)?;

        let mut position = self.position_data(asset, user)?;
        validation::require_can_pull(&position, amount)?;

        cache.update_state();
        cache.add_liquidity(amount);
        cache.update_interest_rates();

        let first_deposit = self.is_zero(&position.scaled_a_token_balance);
        let scaled = self.scale_amount(&self.ctx, amount, &cache.reserve.liquidity_index);
        position.scaled_a_token_balance = self.add_same_scale(&position.scaled_a_token_balance, &scaled);
        if first_deposit {
            position.usage_as_collateral_enabled = true;
        }
        self.pull_from_wallet(&mut position, amount);
        self.set_position_data(asset, user, position);

        log::debug!("{user} deposited into {asset}");
        Ok(())
    }

    /// Redeems aTokens for underlying; `Max` redeems the whole balance.
    pub fn withdraw(&self, user: &str, asset: &str, amount: &Amount) -> Result<(), EnvironmentFault> {
        let mut cache = Cache::new(self, asset)?;
        let now = cache.timestamp;
        let current = self.current_position(asset, user, now)?;
        let user_balance = current.current_a_token_balance.clone();

        let amount = match amount {
            Amount::Exact(value) => value.clone(),
            Amount::Max => user_balance.clone(),
        };
        validation::require_amount_greater_than_zero(&amount)?;
        require!(
            amount.into_raw_units() <= user_balance.into_raw_units(),
            ERROR_NOT_ENOUGH_AVAILABLE_USER_BALANCE
        );
        validation::require_active(&cache.reserve)?;

        let account = self.account_data(user, now)?;
        let reserve_now = self.current_reserve(asset, now)?;
        require!(
            self.balance_decrease_allowed(&self.ctx, &account, &reserve_now, &current, &amount),
            ERROR_TRANSFER_NOT_ALLOWED
        );
        require!(cache.has_liquidity(&amount), ERROR_INSUFFICIENT_LIQUIDITY);

        cache.update_state();
        cache.take_liquidity(&amount);
        cache.update_interest_rates();

        let mut position = self.position_data(asset, user)?;
        let scaled = self.scale_amount(&self.ctx, &amount, &cache.reserve.liquidity_index);
        position.scaled_a_token_balance = self.saturating_sub(&position.scaled_a_token_balance, &scaled);
        if amount.into_raw_units() == user_balance.into_raw_units() {
            position.usage_as_collateral_enabled = false;
        }
        self.push_to_wallet(&mut position, &amount);
        self.set_position_data(asset, user, position);

        log::debug!("{user} withdrew from {asset}");
        Ok(())
    }

    /// Flags a supplied position as collateral or releases it.
    pub fn set_use_as_collateral(
        &self,
        user: &str,
        asset: &str,
        enabled: bool,
    ) -> Result<(), EnvironmentFault> {
        let now = self.block_timestamp();
        let current = self.current_position(asset, user, now)?;
        require!(
            !self.is_zero(&current.current_a_token_balance),
            ERROR_UNDERLYING_BALANCE_NOT_GREATER_THAN_ZERO
        );

        if !enabled {
            let account = self.account_data(user, now)?;
            let reserve_now = self.current_reserve(asset, now)?;
            require!(
                self.balance_decrease_allowed(
                    &self.ctx,
                    &account,
                    &reserve_now,
                    &current,
                    &current.current_a_token_balance,
                ),
                ERROR_DEPOSIT_ALREADY_IN_USE
            );
        }

        let mut position = self.position_data(asset, user)?;
        position.usage_as_collateral_enabled = enabled;
        self.set_position_data(asset, user, position);
        Ok(())
    }
}
