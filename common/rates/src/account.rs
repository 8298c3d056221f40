use common_constants::{HEALTH_FACTOR_LIQUIDATION_THRESHOLD, LIQUIDATION_CLOSE_FACTOR_BPS, WAD_PRECISION};
use common_math::NumericContext;
use common_structs::{AccountState, ReserveState, UserState};

multiversx_sc::imports!();

/// Cross-reserve risk math: base-currency valuation, account aggregates,
/// health factor and the collateral seized by a liquidation.
#[multiversx_sc::module]
pub trait AccountMath: common_math::SharedMathModule {
    /// `price * amount / 10^decimals`, truncated, in WAD.
    fn base_value(
        &self,
        ctx: &NumericContext,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        price: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.mul_down(ctx, amount, price, WAD_PRECISION)
    }

    /// Aggregates every position of one user.
    ///
    /// Only positions flagged as collateral, in reserves with a non-zero
    /// liquidation threshold, count as collateral. The averages are weighted by
    /// collateral value and truncated.
    fn calculate_account_data(
        &self,
        ctx: &NumericContext,
        positions: &[(&ReserveState<Self::Api>, &UserState<Self::Api>)],
    ) -> AccountState<Self::Api> {
        let mut total_collateral = BigUint::zero();
        let mut total_debt = BigUint::zero();
        let mut weighted_ltv = BigUint::zero();
        let mut weighted_threshold = BigUint::zero();

        for (reserve, position) in positions {
            if position.usage_as_collateral_enabled && !self.is_zero(&reserve.liquidation_threshold) {
                let value = self.base_value(ctx, &position.current_a_token_balance, &reserve.price);
                weighted_ltv = weighted_ltv + value.into_raw_units() * reserve.ltv.into_raw_units();
                weighted_threshold = weighted_threshold
                    + value.into_raw_units() * reserve.liquidation_threshold.into_raw_units();
                total_collateral = total_collateral + value.into_raw_units().clone();
            }

            if position.has_debt() {
                let debt = self.add_same_scale(
                    &position.current_stable_debt,
                    &position.current_variable_debt,
                );
                let value = self.base_value(ctx, &debt, &reserve.price);
                total_debt = total_debt + value.into_raw_units().clone();
            }
        }

        let (ltv, current_liquidation_threshold) = if total_collateral == BigUint::zero() {
            (self.bps_zero(), self.bps_zero())
        } else {
            (
                self.to_decimal_bps(ctx.divide(weighted_ltv, &total_collateral)),
                self.to_decimal_bps(ctx.divide(weighted_threshold, &total_collateral)),
            )
        };

        let total_collateral_base = self.to_decimal_wad(total_collateral);
        let total_debt_base = self.to_decimal_wad(total_debt);
        let health_factor = self.health_factor(
            ctx,
            &total_collateral_base,
            &total_debt_base,
            &current_liquidation_threshold,
        );
        let available_borrows_base =
            self.available_borrows(ctx, &total_collateral_base, &total_debt_base, &ltv);

        AccountState {
            total_collateral_base,
            total_debt_base,
            available_borrows_base,
            ltv,
            current_liquidation_threshold,
            health_factor,
        }
    }

    /// `wadDiv(percentMul(collateral, threshold), debt)`; `u128::MAX` without debt.
    fn health_factor(
        &self,
        ctx: &NumericContext,
        collateral: &ManagedDecimal<Self::Api, NumDecimals>,
        debt: &ManagedDecimal<Self::Api, NumDecimals>,
        liquidation_threshold: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if self.is_zero(debt) {
            return self.to_decimal_wad(BigUint::from(u128::MAX));
        }

        let adjusted_collateral = self.percent_mul(ctx, collateral, liquidation_threshold);
        self.div_half_up(ctx, &adjusted_collateral, debt, WAD_PRECISION)
    }

    fn available_borrows(
        &self,
        ctx: &NumericContext,
        collateral: &ManagedDecimal<Self::Api, NumDecimals>,
        debt: &ManagedDecimal<Self::Api, NumDecimals>,
        ltv: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let borrowing_power = self.percent_mul(ctx, collateral, ltv);
        self.saturating_sub(&borrowing_power, debt)
    }

    fn is_below_liquidation_threshold(
        &self,
        health_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> bool {
        health_factor.into_raw_units() < &BigUint::from(HEALTH_FACTOR_LIQUIDATION_THRESHOLD)
    }

    /// Whether removing `amount` of a position's collateral keeps the account
    /// at or above a health factor of one.
    fn balance_decrease_allowed(
        &self,
        ctx: &NumericContext,
        account: &AccountState<Self::Api>,
        reserve: &ReserveState<Self::Api>,
        position: &UserState<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> bool {
        if !position.usage_as_collateral_enabled
            || self.is_zero(&reserve.liquidation_threshold)
            || self.is_zero(&account.total_debt_base)
        {
            return true;
        }

        let decrease = self.base_value(ctx, amount, &reserve.price);
        let collateral_after = self.saturating_sub(&account.total_collateral_base, &decrease);
        if self.is_zero(&collateral_after) {
            return false;
        }

        let weighted_before = account.total_collateral_base.into_raw_units()
            * account.current_liquidation_threshold.into_raw_units();
        let weighted_removed = decrease.into_raw_units() * reserve.liquidation_threshold.into_raw_units();
        let weighted_after = if weighted_removed >= weighted_before {
            BigUint::zero()
        } else {
            weighted_before - weighted_removed
        };
        let threshold_after =
            self.to_decimal_bps(ctx.divide(weighted_after, collateral_after.into_raw_units()));

        let health_factor_after = self.health_factor(
            ctx,
            &collateral_after,
            &account.total_debt_base,
            &threshold_after,
        );
        !self.is_below_liquidation_threshold(&health_factor_after)
    }

    /// Half of the borrower's debt in the liquidated reserve.
    fn max_liquidatable_debt(
        &self,
        ctx: &NumericContext,
        total_debt: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let close_factor = self.to_decimal_bps(BigUint::from(LIQUIDATION_CLOSE_FACTOR_BPS));
        self.percent_mul(ctx, total_debt, &close_factor)
    }

    /// Collateral seized for covering `debt_to_cover`, and the debt actually covered.
    ///
    /// **Formula**:
    /// - `collateral = percentMul(debtPrice * debt * 10^collDecimals, bonus) / (collPrice * 10^debtDecimals)`.
    /// - When that exceeds the user's collateral, the whole collateral is taken and
    ///   `debt = percentDiv(collPrice * collateral * 10^debtDecimals / (debtPrice * 10^collDecimals), bonus)`.
    fn collateral_to_liquidate(
        &self,
        ctx: &NumericContext,
        collateral_reserve: &ReserveState<Self::Api>,
        debt_reserve: &ReserveState<Self::Api>,
        debt_to_cover: &ManagedDecimal<Self::Api, NumDecimals>,
        user_collateral_balance: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> (
        ManagedDecimal<Self::Api, NumDecimals>,
        ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        let collateral_price = collateral_reserve.price.into_raw_units();
        let debt_price = debt_reserve.price.into_raw_units();
        if collateral_price == &BigUint::zero() || debt_price == &BigUint::zero() {
            return (
                self.zero_at(collateral_reserve.decimals),
                self.zero_at(debt_reserve.decimals),
            );
        }

        let collateral_unit = self.pow10(collateral_reserve.decimals);
        let debt_unit = self.pow10(debt_reserve.decimals);

        let gross = &(debt_price * debt_to_cover.into_raw_units()) * &collateral_unit;
        let with_bonus = self.percent_mul(
            ctx,
            &self.to_decimal(gross, 0),
            &collateral_reserve.liquidation_bonus,
        );
        let max_collateral = ctx.divide(
            with_bonus.into_raw_units().clone(),
            &(collateral_price * &debt_unit),
        );

        if &max_collateral > user_collateral_balance.into_raw_units() {
            let collateral_worth = &(collateral_price * user_collateral_balance.into_raw_units()) * &debt_unit;
            let debt_equivalent = ctx.divide(collateral_worth, &(debt_price * &collateral_unit));
            let debt_needed = self.percent_div(
                ctx,
                &self.to_decimal(debt_equivalent, debt_reserve.decimals),
                &collateral_reserve.liquidation_bonus,
            );
            (user_collateral_balance.clone(), debt_needed)
        } else {
            (
                self.to_decimal(max_collateral, collateral_reserve.decimals),
                debt_to_cover.clone(),
            )
        }
    }
}
