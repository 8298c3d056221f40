use common_errors::FailureClass;
use common_math::SharedMathModule;
use common_proxies::Amount;
use common_rates::{AccountMath, InterestRates};

use super::{CalculationOracle, Decimal, View};

pub(super) struct Liquidation<'a> {
    pub liquidator: &'a str,
    pub collateral_asset: &'a str,
    pub debt_asset: &'a str,
    pub borrower: &'a str,
    pub debt_to_cover: &'a Amount,
    pub receive_a_token: bool,
}

impl CalculationOracle {
    pub(super) fn liquidation_call(
        &self,
        view: &mut View,
        now: u64,
        call: Liquidation<'_>,
    ) -> Result<(), FailureClass> {
        let collateral_reserve = self.reserve_at(view, call.collateral_asset, now)?;
        let debt_reserve = self.reserve_at(view, call.debt_asset, now)?;
        self.require_active(&collateral_reserve)?;
        self.require_active(&debt_reserve)?;

        let account = self.account_at(view, call.borrower, now)?;
        ensure!(
            self.is_below_liquidation_threshold(&account.health_factor),
            FailureClass::HealthFactorNotBelowThreshold
        );

        let borrower_collateral = self.position_at(view, call.collateral_asset, call.borrower, now)?;
        ensure!(
            !self.is_zero(&collateral_reserve.liquidation_threshold)
                && borrower_collateral.usage_as_collateral_enabled,
            FailureClass::CollateralCannotBeLiquidated
        );

        let borrower_debt = self.position_at(view, call.debt_asset, call.borrower, now)?;
        let total_debt = self.add_same_scale(&borrower_debt.current_stable_debt, &borrower_debt.current_variable_debt);
        ensure!(!self.is_zero(&total_debt), FailureClass::SpecifiedCurrencyNotBorrowedByUser);

        let max_liquidatable = self.max_liquidatable_debt(&self.ctx, &total_debt);
        let mut covered = match call.debt_to_cover {
            Amount::Exact(value) => self.get_min(value.clone(), max_liquidatable),
            Amount::Max => max_liquidatable,
        };
        let collateral_balance = borrower_collateral.current_a_token_balance.clone();
        let (seized, debt_needed) = self.collateral_to_liquidate(
            &self.ctx,
            &collateral_reserve,
            &debt_reserve,
            &covered,
            &collateral_balance,
        );
        if debt_needed.into_raw_units() < covered.into_raw_units() {
            covered = debt_needed;
        }

        if !call.receive_a_token {
            ensure!(
                collateral_reserve.available_liquidity.into_raw_units() >= seized.into_raw_units(),
                FailureClass::NotEnoughLiquidityToLiquidate
            );
        }
        self.require_can_pull(
            &self.load_position(view, call.debt_asset, call.liquidator)?,
            &covered,
        )?;

        self.cover_debt(view, now, &call, &borrower_debt.current_variable_debt, &covered)?;
        self.transfer_collateral(view, now, &call, &seized)?;

        if seized.into_raw_units() == collateral_balance.into_raw_units() {
            let mut borrower = self.load_position(view, call.collateral_asset, call.borrower)?;
            borrower.usage_as_collateral_enabled = false;
            self.store_position(view, call.collateral_asset, call.borrower, borrower);
        }

        let mut liquidator = self.load_position(view, call.debt_asset, call.liquidator)?;
        self.pull(&mut liquidator, &covered);
        self.store_position(view, call.debt_asset, call.liquidator, liquidator);
        Ok(())
    }

    /// Variable debt goes first; only the remainder is taken from stable debt.
    fn cover_debt(
        &self,
        view: &mut View,
        now: u64,
        call: &Liquidation<'_>,
        variable_debt: &Decimal,
        covered: &Decimal,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, call.debt_asset)?;
        self.accrue(&mut reserve, now);

        let mut position = self.load_position(view, call.debt_asset, call.borrower)?;
        if variable_debt.into_raw_units() >= covered.into_raw_units() {
            self.remove_variable_debt(&mut reserve, &mut position, covered);
        } else {
            if !self.is_zero(variable_debt) {
                self.remove_variable_debt(&mut reserve, &mut position, variable_debt);
            }
            let stable_part = self.saturating_sub(covered, variable_debt);
            self.remove_stable_debt(&mut reserve, &mut position, &stable_part, now);
        }
        self.store_position(view, call.debt_asset, call.borrower, position);

        reserve.available_liquidity = self.add_same_scale(&reserve.available_liquidity, covered);
        self.reprice(call.debt_asset, &mut reserve, now)?;
        self.store_reserve(view, call.debt_asset, reserve);
        Ok(())
    }

    fn transfer_collateral(
        &self,
        view: &mut View,
        now: u64,
        call: &Liquidation<'_>,
        seized: &Decimal,
    ) -> Result<(), FailureClass> {
        let asset = call.collateral_asset;

        if call.receive_a_token {
            let reserve = self.load_reserve(view, asset)?;
            let liquidity_index = self.normalized_income(
                &self.ctx,
                &reserve.liquidity_index,
                &reserve.liquidity_rate,
                reserve.last_update_timestamp,
                now,
            );
            let scaled = self.scale_amount(&self.ctx, seized, &liquidity_index);

            let mut borrower = self.load_position(view, asset, call.borrower)?;
            borrower.scaled_a_token_balance = self.saturating_sub(&borrower.scaled_a_token_balance, &scaled);
            self.store_position(view, asset, call.borrower, borrower);

            let mut liquidator = self.load_position(view, asset, call.liquidator)?;
            if self.is_zero(&liquidator.scaled_a_token_balance) {
                liquidator.usage_as_collateral_enabled = true;
            }
            liquidator.scaled_a_token_balance = self.add_same_scale(&liquidator.scaled_a_token_balance, &scaled);
            self.store_position(view, asset, call.liquidator, liquidator);
            return Ok(());
        }

        let mut reserve = self.load_reserve(view, asset)?;
        self.accrue(&mut reserve, now);
        reserve.available_liquidity = self.saturating_sub(&reserve.available_liquidity, seized);
        self.reprice(asset, &mut reserve, now)?;

        let scaled = self.scale_amount(&self.ctx, seized, &reserve.liquidity_index);
        let mut borrower = self.load_position(view, asset, call.borrower)?;
        borrower.scaled_a_token_balance = self.saturating_sub(&borrower.scaled_a_token_balance, &scaled);
        self.store_position(view, asset, call.borrower, borrower);

        let mut liquidator = self.load_position(view, asset, call.liquidator)?;
        self.push(&mut liquidator, seized);
        self.store_position(view, asset, call.liquidator, liquidator);
        self.store_reserve(view, asset, reserve);
        Ok(())
    }
}
