use common_errors::{
    ERROR_COLLATERAL_CANNOT_BE_LIQUIDATED, ERROR_HEALTH_FACTOR_NOT_BELOW_THRESHOLD,
    ERROR_NOT_ENOUGH_LIQUIDITY_TO_LIQUIDATE, ERROR_SPECIFIED_CURRENCY_NOT_BORROWED_BY_USER,
};
use common_math::SharedMathModule;
use common_proxies::{Amount, EnvironmentFault};
use common_rates::{AccountMath, InterestRates};
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

use crate::{cache::Cache, validation, SimulatedMarket};

/// Arguments of one liquidation, borrowed from the call.
pub struct LiquidationRequest<'a> {
    pub liquidator: &'a str,
    pub collateral_asset: &'a str,
    pub debt_asset: &'a str,
    pub borrower: &'a str,
    pub debt_to_cover: &'a Amount,
    pub receive_a_token: bool,
}

impl SimulatedMarket {
    /// Repays part of an unhealthy borrower's debt in exchange for collateral
    /// plus the liquidation bonus.
    ///
    /// **Process**:
    /// 1. Requires both reserves active, a health factor below one, collateral
    ///    enabled in the seized reserve and outstanding debt in the repaid one.
    /// 2. Caps the covered debt at the close factor, then at what the borrower's
    ///    collateral can pay for.
    /// 3. Burns variable debt before stable debt, then hands the collateral over
    ///    either as aTokens or as underlying taken out of the reserve.
    /// 4. The liquidator pays the covered debt from their wallet.
    pub fn liquidation_call(&self, request: LiquidationRequest<'_>) -> Result<(), EnvironmentFault> {
        let now = self.block_timestamp();
        let collateral_reserve = self.current_reserve(request.collateral_asset, now)?;
        let debt_reserve = self.current_reserve(request.debt_asset, now)?;
        validation::require_active(&collateral_reserve)?;
        validation::require_active(&debt_reserve)?;

        let account = self.account_data(request.borrower, now)?;
        require!(
            self.is_below_liquidation_threshold(&account.health_factor),
            ERROR_HEALTH_FACTOR_NOT_BELOW_THRESHOLD
        );

        let borrower_collateral =
            self.current_position(request.collateral_asset, request.borrower, now)?;
        require!(
            !self.is_zero(&collateral_reserve.liquidation_threshold)
                && borrower_collateral.usage_as_collateral_enabled,
            ERROR_COLLATERAL_CANNOT_BE_LIQUIDATED
        );

        let borrower_debt = self.current_position(request.debt_asset, request.borrower, now)?;
        let total_debt = self.add_same_scale(
            &borrower_debt.current_stable_debt,
            &borrower_debt.current_variable_debt,
        );
        require!(
            !self.is_zero(&total_debt),
            ERROR_SPECIFIED_CURRENCY_NOT_BORROWED_BY_USER
        );

        let max_liquidatable = self.max_liquidatable_debt(&self.ctx, &total_debt);
        let mut actual_debt = match request.debt_to_cover {
            Amount::Exact(value) => self.get_min(value.clone(), max_liquidatable),
            Amount::Max => max_liquidatable,
        };

        let collateral_balance = borrower_collateral.current_a_token_balance.clone();
        let (seized_collateral, debt_needed) = self.collateral_to_liquidate(
            &self.ctx,
            &collateral_reserve,
            &debt_reserve,
            &actual_debt,
            &collateral_balance,
        );
        if debt_needed.into_raw_units() < actual_debt.into_raw_units() {
            actual_debt = debt_needed;
        }

        if !request.receive_a_token {
            require!(
                collateral_reserve.available_liquidity.into_raw_units()
                    >= seized_collateral.into_raw_units(),
                ERROR_NOT_ENOUGH_LIQUIDITY_TO_LIQUIDATE
            );
        }
        validation::require_can_pull(
            &self.position_data(request.debt_asset, request.liquidator)?,
            &actual_debt,
        )?;

        self.repay_liquidated_debt(&request, &borrower_debt.current_variable_debt, &actual_debt)?;
        self.seize_collateral(&request, &seized_collateral)?;

        let mut borrower = self.position_data(request.collateral_asset, request.borrower)?;
        if seized_collateral.into_raw_units() == collateral_balance.into_raw_units() {
            borrower.usage_as_collateral_enabled = false;
            self.set_position_data(request.collateral_asset, request.borrower, borrower);
        }

        let mut liquidator = self.position_data(request.debt_asset, request.liquidator)?;
        self.pull_from_wallet(&mut liquidator, &actual_debt);
        self.set_position_data(request.debt_asset, request.liquidator, liquidator);

        log::debug!(
            "{} liquidated {} of {}, seizing {}",
            request.liquidator,
            request.debt_asset,
            request.borrower,
            request.collateral_asset
        );
        Ok(())
    }

    fn repay_liquidated_debt(
        &self,
        request: &LiquidationRequest<'_>,
        variable_debt: &ManagedDecimal<StaticApi, NumDecimals>,
        actual_debt: &ManagedDecimal<StaticApi, NumDecimals>,
    ) -> Result<(), EnvironmentFault> {
        let mut cache = Cache::new(self, request.debt_asset)?;
        cache.update_state();

        let mut position = self.position_data(request.debt_asset, request.borrower)?;
        if variable_debt.into_raw_units() >= actual_debt.into_raw_units() {
            self.burn_variable_debt(&mut cache, &mut position, actual_debt);
        } else {
            if !self.is_zero(variable_debt) {
                self.burn_variable_debt(&mut cache, &mut position, variable_debt);
            }
            let stable_part = self.saturating_sub(actual_debt, variable_debt);
            self.burn_stable_debt(&mut cache, &mut position, &stable_part);
        }
        self.set_position_data(request.debt_asset, request.borrower, position);

        cache.add_liquidity(actual_debt);
        cache.update_interest_rates();
        Ok(())
    }

    fn seize_collateral(
        &self,
        request: &LiquidationRequest<'_>,
        seized: &ManagedDecimal<StaticApi, NumDecimals>,
    ) -> Result<(), EnvironmentFault> {
        if request.receive_a_token {
            let now = self.block_timestamp();
            let reserve = self.reserve_data(request.collateral_asset)?;
            let liquidity_index = self.normalized_income(
                &self.ctx,
                &reserve.liquidity_index,
                &reserve.liquidity_rate,
                reserve.last_update_timestamp,
                now,
            );
            let scaled = self.scale_amount(&self.ctx, seized, &liquidity_index);

            let mut borrower = self.position_data(request.collateral_asset, request.borrower)?;
            borrower.scaled_a_token_balance =
                self.saturating_sub(&borrower.scaled_a_token_balance, &scaled);
            self.set_position_data(request.collateral_asset, request.borrower, borrower);

            let mut liquidator = self.position_data(request.collateral_asset, request.liquidator)?;
            if self.is_zero(&liquidator.scaled_a_token_balance) {
                liquidator.usage_as_collateral_enabled = true;
            }
            liquidator.scaled_a_token_balance =
                self.add_same_scale(&liquidator.scaled_a_token_balance, &scaled);
            self.set_position_data(request.collateral_asset, request.liquidator, liquidator);
            return Ok(());
        }

        let mut cache = Cache::new(self, request.collateral_asset)?;
        cache.update_state();
        cache.take_liquidity(seized);
        cache.update_interest_rates();

        let scaled = self.scale_amount(&self.ctx, seized, &cache.reserve.liquidity_index);
        let mut borrower = self.position_data(request.collateral_asset, request.borrower)?;
        borrower.scaled_a_token_balance = self.saturating_sub(&borrower.scaled_a_token_balance, &scaled);
        self.set_position_data(request.collateral_asset, request.borrower, borrower);

        let mut liquidator = self.position_data(request.collateral_asset, request.liquidator)?;
        self.push_to_wallet(&mut liquidator, seized);
        self.set_position_data(request.collateral_asset, request.liquidator, liquidator);
        Ok(())
    }
}
