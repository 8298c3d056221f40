use common_constants::HEALTH_FACTOR_LIQUIDATION_THRESHOLD;
use common_errors::{
    ERROR_AMOUNT_BIGGER_THAN_MAX_LOAN_SIZE_STABLE, ERROR_COLLATERAL_BALANCE_IS_ZERO,
    ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW, ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY,
    ERROR_HEALTH_FACTOR_LOWER_THAN_THRESHOLD, ERROR_INSUFFICIENT_LIQUIDITY,
    ERROR_NO_DEBT_OF_SELECTED_TYPE, ERROR_NO_EXPLICIT_AMOUNT_TO_REPAY_ON_BEHALF,
    ERROR_NO_STABLE_RATE_LOAN_IN_RESERVE, ERROR_NO_VARIABLE_RATE_LOAN_IN_RESERVE,
    ERROR_STABLE_BORROWING_NOT_ENABLED,
};
use common_math::SharedMathModule;
use common_proxies::{Amount, EnvironmentFault};
use common_rates::{AccountMath, InterestRates};
use common_structs::{InterestRateMode, UserState};
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::{cache::Cache, validation, SimulatedMarket};

impl SimulatedMarket {
    /// Opens debt in `asset` against the user's collateral.
    ///
    /// **Process**:
    /// 1. Validates reserve status and amount, then the account: some collateral,
    ///    a health factor above one and enough borrowing power for the new debt.
    /// 2. Stable borrows additionally need stable borrowing enabled, must not be
    ///    backed by the same asset's collateral and are limited to a quarter of
    ///    the available liquidity.
    /// 3. Accrues, mints the debt, releases the liquidity and reprices.
    pub fn borrow(
        &self,
        user: &str,
        asset: &str,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
        rate_mode: InterestRateMode,
    ) -> Result<(), EnvironmentFault> {
        let mut cache = Cache::new(self, asset)?;
        let now = cache.timestamp;
        validation::require_active_not_frozen(&cache.reserve)?;
        validation::require_amount_greater_than_zero(amount)?;

        let account = self.account_data(user, now)?;
        require!(
            !self.is_zero(&account.total_collateral_base),
            ERROR_COLLATERAL_BALANCE_IS_ZERO
        );
        require!(
            account.health_factor.into_raw_units() > &BigUint::from(HEALTH_FACTOR_LIQUIDATION_THRESHOLD),
            ERROR_HEALTH_FACTOR_LOWER_THAN_THRESHOLD
        );

        let amount_in_base = self.base_value(&self.ctx, amount, &cache.reserve.price);
        let debt_after = self.add_same_scale(&account.total_debt_base, &amount_in_base);
        require!(!self.is_zero(&account.ltv), ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW);
        let collateral_needed = self.percent_div(&self.ctx, &debt_after, &account.ltv);
        require!(
            collateral_needed.into_raw_units() <= account.total_collateral_base.into_raw_units(),
            ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW
        );

        let current = self.current_position(asset, user, now)?;
        if rate_mode == InterestRateMode::Stable {
            require!(
                cache.reserve.stable_borrow_rate_enabled,
                ERROR_STABLE_BORROWING_NOT_ENABLED
            );
            require!(
                !current.usage_as_collateral_enabled
                    || self.is_zero(&cache.reserve.ltv)
                    || amount.into_raw_units() > current.current_a_token_balance.into_raw_units(),
                ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY
            );
            let max_loan = self.max_stable_loan_size(&self.ctx, &cache.reserve.available_liquidity);
            require!(
                amount.into_raw_units() <= max_loan.into_raw_units(),
                ERROR_AMOUNT_BIGGER_THAN_MAX_LOAN_SIZE_STABLE
            );
        }
        require!(cache.has_liquidity(amount), ERROR_INSUFFICIENT_LIQUIDITY);

        cache.update_state();
        let mut position = self.position_data(asset, user)?;
        match rate_mode {
            InterestRateMode::Stable => {
                let rate = cache.reserve.stable_borrow_rate.clone();
                self.mint_stable_debt(&mut cache, &mut position, amount, &rate);
            },
            InterestRateMode::Variable => self.mint_variable_debt(&mut cache, &mut position, amount),
        }
        cache.take_liquidity(amount);
        cache.update_interest_rates();

        self.push_to_wallet(&mut position, amount);
        self.set_position_data(asset, user, position);

        log::debug!("{user} borrowed from {asset} at {rate_mode:?} rate");
        Ok(())
    }

    /// Pays back debt of one type. `user` pays, `on_behalf_of` owes.
    pub fn repay(
        &self,
        user: &str,
        asset: &str,
        amount: &Amount,
        rate_mode: InterestRateMode,
        on_behalf_of: &str,
    ) -> Result<(), EnvironmentFault> {
        let mut cache = Cache::new(self, asset)?;
        let now = cache.timestamp;
        let debtor = self.current_position(asset, on_behalf_of, now)?;
        let debt = match rate_mode {
            InterestRateMode::Stable => debtor.current_stable_debt.clone(),
            InterestRateMode::Variable => debtor.current_variable_debt.clone(),
        };

        validation::require_active(&cache.reserve)?;
        if let Amount::Exact(value) = amount {
            validation::require_amount_greater_than_zero(value)?;
        }
        require!(!self.is_zero(&debt), ERROR_NO_DEBT_OF_SELECTED_TYPE);
        require!(
            matches!(amount, Amount::Exact(_)) || user == on_behalf_of,
            ERROR_NO_EXPLICIT_AMOUNT_TO_REPAY_ON_BEHALF
        );

        let payback = match amount {
            Amount::Exact(value) => self.get_min(value.clone(), debt),
            Amount::Max => debt,
        };
        validation::require_can_pull(&self.position_data(asset, user)?, &payback)?;

        cache.update_state();
        let mut position = self.position_data(asset, on_behalf_of)?;
        match rate_mode {
            InterestRateMode::Stable => self.burn_stable_debt(&mut cache, &mut position, &payback),
            InterestRateMode::Variable => self.burn_variable_debt(&mut cache, &mut position, &payback),
        }
        self.set_position_data(asset, on_behalf_of, position);
        cache.add_liquidity(&payback);
        cache.update_interest_rates();

        let mut payer = self.position_data(asset, user)?;
        self.pull_from_wallet(&mut payer, &payback);
        self.set_position_data(asset, user, payer);

        log::debug!("{user} repaid {rate_mode:?} debt of {on_behalf_of} in {asset}");
        Ok(())
    }

    /// Moves the whole debt of `rate_mode` into the other mode.
    pub fn swap_borrow_rate_mode(
        &self,
        user: &str,
        asset: &str,
        rate_mode: InterestRateMode,
    ) -> Result<(), EnvironmentFault> {
        let mut cache = Cache::new(self, asset)?;
        let now = cache.timestamp;
        let current = self.current_position(asset, user, now)?;
        validation::require_active_not_frozen(&cache.reserve)?;

        match rate_mode {
            InterestRateMode::Stable => {
                require!(
                    !self.is_zero(&current.current_stable_debt),
                    ERROR_NO_STABLE_RATE_LOAN_IN_RESERVE
                );
            },
            InterestRateMode::Variable => {
                require!(
                    !self.is_zero(&current.current_variable_debt),
                    ERROR_NO_VARIABLE_RATE_LOAN_IN_RESERVE
                );
                require!(
                    cache.reserve.stable_borrow_rate_enabled,
                    ERROR_STABLE_BORROWING_NOT_ENABLED
                );
                let total_debt =
                    self.add_same_scale(&current.current_stable_debt, &current.current_variable_debt);
                require!(
                    !current.usage_as_collateral_enabled
                        || self.is_zero(&cache.reserve.ltv)
                        || total_debt.into_raw_units() > current.current_a_token_balance.into_raw_units(),
                    ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY
                );
            },
        }

        cache.update_state();
        let mut position = self.position_data(asset, user)?;
        match rate_mode {
            InterestRateMode::Stable => {
                let stable_debt = current.current_stable_debt.clone();
                self.burn_stable_debt(&mut cache, &mut position, &stable_debt);
                self.mint_variable_debt(&mut cache, &mut position, &stable_debt);
            },
            InterestRateMode::Variable => {
                let variable_debt = current.current_variable_debt.clone();
                let rate = cache.reserve.stable_borrow_rate.clone();
                self.burn_variable_debt(&mut cache, &mut position, &variable_debt);
                self.mint_stable_debt(&mut cache, &mut position, &variable_debt, &rate);
            },
        }
        cache.update_interest_rates();
        self.set_position_data(asset, user, position);

        log::debug!("{user} swapped {rate_mode:?} debt in {asset}");
        Ok(())
    }

    pub(crate) fn mint_variable_debt(
        &self,
        cache: &mut Cache<'_>,
        position: &mut UserState<StaticApi>,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) {
        let scaled = self.scale_amount(&self.ctx, amount, &cache.reserve.variable_borrow_index);
        position.scaled_variable_debt = self.add_same_scale(&position.scaled_variable_debt, &scaled);
        cache.reserve.scaled_variable_debt =
            self.add_same_scale(&cache.reserve.scaled_variable_debt, &scaled);
    }

    pub(crate) fn burn_variable_debt(
        &self,
        cache: &mut Cache<'_>,
        position: &mut UserState<StaticApi>,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) {
        let scaled = self.scale_amount(&self.ctx, amount, &cache.reserve.variable_borrow_index);
        position.scaled_variable_debt = self.saturating_sub(&position.scaled_variable_debt, &scaled);
        cache.reserve.scaled_variable_debt =
            self.saturating_sub(&cache.reserve.scaled_variable_debt, &scaled);
    }

    pub(crate) fn mint_stable_debt(
        &self,
        cache: &mut Cache<'_>,
        position: &mut UserState<StaticApi>,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
        rate: &ManagedDecimal<StaticApi, NumDecimals>,
    ) {
        let (user_debt, supply) = self.stable_debt_mint(
            &self.ctx,
            &self.stable_position_of(position),
            &self.stable_supply_of(&cache.reserve),
            amount,
            rate,
            cache.timestamp,
        );
        write_stable(cache, position, user_debt, supply);
    }

    pub(crate) fn burn_stable_debt(
        &self,
        cache: &mut Cache<'_>,
        position: &mut UserState<StaticApi>,
        amount: &ManagedDecimal<StaticApi, NumDecimals>,
    ) {
        let (user_debt, supply) = self.stable_debt_burn(
            &self.ctx,
            &self.stable_position_of(position),
            &self.stable_supply_of(&cache.reserve),
            amount,
            cache.timestamp,
        );
        write_stable(cache, position, user_debt, supply);
    }
}

fn write_stable(
    cache: &mut Cache<'_>,
    position: &mut UserState<StaticApi>,
    user_debt: common_rates::StableDebtPosition<StaticApi>,
    supply: common_rates::StableDebtSupply<StaticApi>,
) {
    position.principal_stable_debt = user_debt.principal;
    position.stable_borrow_rate = user_debt.rate;
    position.stable_rate_last_updated = user_debt.last_updated;
    cache.reserve.principal_stable_debt = supply.principal;
    cache.reserve.average_stable_borrow_rate = supply.average_rate;
    cache.reserve.total_stable_debt_timestamp = supply.last_updated;
}
