#![allow(clippy::too_many_arguments)]

use common_constants::{MAX_STABLE_RATE_BORROW_SIZE_BPS, RAY, RAY_PRECISION, SECONDS_PER_YEAR};
use common_math::NumericContext;
use common_structs::{MarketParams, ReserveState, UserState};

mod account;

pub use account::AccountMath;

multiversx_sc::imports!();

/// Rates produced by one interest-rate update of a reserve.
pub struct ReserveRates<M: ManagedTypeApi> {
    pub utilization: ManagedDecimal<M, NumDecimals>,
    pub liquidity_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub variable_borrow_rate: ManagedDecimal<M, NumDecimals>,
}

/// Both reserve indexes after accrual.
pub struct CumulatedIndexes<M: ManagedTypeApi> {
    pub liquidity_index: ManagedDecimal<M, NumDecimals>,
    pub variable_borrow_index: ManagedDecimal<M, NumDecimals>,
}

/// Stored stable debt of one user: principal, locked rate, last accrual.
#[derive(Clone)]
pub struct StableDebtPosition<M: ManagedTypeApi> {
    pub principal: ManagedDecimal<M, NumDecimals>,
    pub rate: ManagedDecimal<M, NumDecimals>,
    pub last_updated: u64,
}

/// Stored stable debt of a whole reserve.
#[derive(Clone)]
pub struct StableDebtSupply<M: ManagedTypeApi> {
    pub principal: ManagedDecimal<M, NumDecimals>,
    pub average_rate: ManagedDecimal<M, NumDecimals>,
    pub last_updated: u64,
}

/// The InterestRates module holds every formula that moves a reserve through time:
/// the utilization-driven rate curves, index accrual and the stable debt book.
///
/// **Scope**: Shared verbatim by the simulated market and the calculation oracle.
///
/// **Goal**: One definition of each formula, so that both sides truncate at the
/// same step and in the same direction.
#[multiversx_sc::module]
pub trait InterestRates: common_math::SharedMathModule {
    /// `debt / (available + debt)` in RAY, zero for a reserve without debt.
    fn calc_utilization(
        &self,
        ctx: &NumericContext,
        total_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        available_liquidity: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if self.is_zero(total_debt) {
            return self.ray_zero();
        }

        let total = self.add_same_scale(available_liquidity, total_debt);
        self.div_half_up(ctx, total_debt, &total, RAY_PRECISION)
    }

    /// Annual variable borrow rate from a three-region piecewise linear curve.
    ///
    /// **Formula**:
    /// - `utilization < mid`: `base + utilization * slope1 / mid`.
    /// - `mid <= utilization < optimal`: `base + slope1 + (utilization - mid) * slope2 / (optimal - mid)`.
    /// - `utilization >= optimal`: `base + slope1 + slope2 + (utilization - optimal) * slope3 / (1 - optimal)`.
    /// - The result is capped at `max_borrow_rate`.
    fn calc_variable_borrow_rate(
        &self,
        ctx: &NumericContext,
        utilization: &ManagedDecimal<Self::Api, NumDecimals>,
        params: &MarketParams<Self::Api>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let annual_rate = if utilization.into_raw_units() < params.mid_utilization.into_raw_units() {
            // Region 1: utilization < mid_utilization
            let weighted = self.mul_half_up(ctx, utilization, &params.slope1, RAY_PRECISION);
            let contribution =
                self.div_half_up(ctx, &weighted, &params.mid_utilization, RAY_PRECISION);
            self.add_same_scale(&params.base_borrow_rate, &contribution)
        } else if utilization.into_raw_units() < params.optimal_utilization.into_raw_units() {
            // Region 2: mid_utilization <= utilization < optimal_utilization
            let excess = self.saturating_sub(utilization, &params.mid_utilization);
            let span = self.saturating_sub(&params.optimal_utilization, &params.mid_utilization);
            let weighted = self.mul_half_up(ctx, &excess, &params.slope2, RAY_PRECISION);
            let contribution = self.div_half_up(ctx, &weighted, &span, RAY_PRECISION);
            let base = self.add_same_scale(&params.base_borrow_rate, &params.slope1);
            self.add_same_scale(&base, &contribution)
        } else {
            // Region 3: utilization >= optimal_utilization
            let excess = self.saturating_sub(utilization, &params.optimal_utilization);
            let span = self.saturating_sub(&self.ray(), &params.optimal_utilization);
            let contribution = if self.is_zero(&span) {
                self.ray_zero()
            } else {
                let weighted = self.mul_half_up(ctx, &excess, &params.slope3, RAY_PRECISION);
                self.div_half_up(ctx, &weighted, &span, RAY_PRECISION)
            };
            let base = self.add_same_scale(
                &self.add_same_scale(&params.base_borrow_rate, &params.slope1),
                &params.slope2,
            );
            self.add_same_scale(&base, &contribution)
        };

        self.get_min(annual_rate, params.max_borrow_rate.clone())
    }

    /// Annual rate offered to new stable borrowers: two slopes around `optimal`.
    fn calc_stable_borrow_rate(
        &self,
        ctx: &NumericContext,
        utilization: &ManagedDecimal<Self::Api, NumDecimals>,
        params: &MarketParams<Self::Api>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if utilization.into_raw_units() > params.optimal_utilization.into_raw_units() {
            let excess = self.saturating_sub(utilization, &params.optimal_utilization);
            let span = self.saturating_sub(&self.ray(), &params.optimal_utilization);
            let excess_ratio = self.div_half_up(ctx, &excess, &span, RAY_PRECISION);
            let base = self.add_same_scale(&params.base_stable_borrow_rate, &params.stable_slope1);
            let contribution =
                self.mul_half_up(ctx, &params.stable_slope2, &excess_ratio, RAY_PRECISION);
            return self.add_same_scale(&base, &contribution);
        }

        if self.is_zero(&params.optimal_utilization) {
            return params.base_stable_borrow_rate.clone();
        }

        let ratio = self.div_half_up(ctx, utilization, &params.optimal_utilization, RAY_PRECISION);
        let contribution = self.mul_half_up(ctx, &params.stable_slope1, &ratio, RAY_PRECISION);
        self.add_same_scale(&params.base_stable_borrow_rate, &contribution)
    }

    /// Debt-weighted average of the variable rate and the average stable rate.
    ///
    /// Debts are brought to RAY before weighting, so the average does not
    /// depend on the asset's decimals.
    fn calc_overall_borrow_rate(
        &self,
        ctx: &NumericContext,
        total_stable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        total_variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        variable_borrow_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        average_stable_rate: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let total_debt = self.add_same_scale(total_stable_debt, total_variable_debt);
        if self.is_zero(&total_debt) {
            return self.ray_zero();
        }

        let variable_ray = self.rescale_half_up(ctx, total_variable_debt, RAY_PRECISION);
        let stable_ray = self.rescale_half_up(ctx, total_stable_debt, RAY_PRECISION);
        let weighted_variable =
            self.mul_half_up(ctx, &variable_ray, variable_borrow_rate, RAY_PRECISION);
        let weighted_stable = self.mul_half_up(ctx, &stable_ray, average_stable_rate, RAY_PRECISION);

        self.div_half_up(
            ctx,
            &self.add_same_scale(&weighted_variable, &weighted_stable),
            &self.rescale_half_up(ctx, &total_debt, RAY_PRECISION),
            RAY_PRECISION,
        )
    }

    /// `percentMul(overall * utilization, 100% - reserve_factor)`.
    fn calc_liquidity_rate(
        &self,
        ctx: &NumericContext,
        overall_borrow_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        utilization: &ManagedDecimal<Self::Api, NumDecimals>,
        reserve_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let gross = self.mul_half_up(ctx, overall_borrow_rate, utilization, RAY_PRECISION);
        self.percent_mul(ctx, &gross, &self.saturating_sub(&self.bps(), reserve_factor))
    }

    /// Full rate update of a reserve from its post-operation balances.
    ///
    /// `available_liquidity` is the underlying held by the reserve once the
    /// operation's transfers are settled.
    fn calc_interest_rates(
        &self,
        ctx: &NumericContext,
        params: &MarketParams<Self::Api>,
        available_liquidity: &ManagedDecimal<Self::Api, NumDecimals>,
        total_stable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        total_variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        average_stable_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        reserve_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ReserveRates<Self::Api> {
        let total_debt = self.add_same_scale(total_stable_debt, total_variable_debt);
        let utilization = self.calc_utilization(ctx, &total_debt, available_liquidity);
        let variable_borrow_rate = self.calc_variable_borrow_rate(ctx, &utilization, params);
        let stable_borrow_rate = self.calc_stable_borrow_rate(ctx, &utilization, params);
        let overall = self.calc_overall_borrow_rate(
            ctx,
            total_stable_debt,
            total_variable_debt,
            &variable_borrow_rate,
            average_stable_rate,
        );
        let liquidity_rate = self.calc_liquidity_rate(ctx, &overall, &utilization, reserve_factor);

        ReserveRates {
            utilization,
            liquidity_rate,
            stable_borrow_rate,
            variable_borrow_rate,
        }
    }

    /// `1 + rate * time_passed / SECONDS_PER_YEAR`, with a single truncating division.
    fn calculate_linear_interest(
        &self,
        ctx: &NumericContext,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        time_passed: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let accrued = ctx.divide(
            rate.into_raw_units() * &BigUint::from(time_passed),
            &BigUint::from(SECONDS_PER_YEAR),
        );

        self.to_decimal_ray(BigUint::from(RAY) + accrued)
    }

    /// Computes the interest growth factor using a Taylor series approximation for `e^(rate * exp)`.
    ///
    /// **Formula**:
    /// - `rate_per_second = rate / SECONDS_PER_YEAR`, truncated first.
    /// - `x = rate_per_second * exp`.
    /// - `factor = 1 + x + x^2/2! + x^3/3! + x^4/4! + x^5/5!`, every term half-up at RAY.
    /// - If `exp == 0`, returns `1` (RAY-scaled).
    fn calculate_compounded_interest(
        &self,
        ctx: &NumericContext,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        exp: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let ray = self.ray();

        if exp == 0 {
            return ray;
        }

        let rate_per_second = self.to_decimal_ray(ctx.divide(
            rate.into_raw_units().clone(),
            &BigUint::from(SECONDS_PER_YEAR),
        ));
        let exp_dec = self.to_decimal(BigUint::from(exp), 0);

        // x = rate_per_second * time_delta
        let x = self.mul_half_up(ctx, &rate_per_second, &exp_dec, RAY_PRECISION);

        let x_sq = self.mul_half_up(ctx, &x, &x, RAY_PRECISION);
        let x_cub = self.mul_half_up(ctx, &x_sq, &x, RAY_PRECISION);
        let x_pow4 = self.mul_half_up(ctx, &x_cub, &x, RAY_PRECISION);
        let x_pow5 = self.mul_half_up(ctx, &x_pow4, &x, RAY_PRECISION);

        let factor_2 = self.to_decimal(BigUint::from(2u64), 0);
        let factor_6 = self.to_decimal(BigUint::from(6u64), 0);
        let factor_24 = self.to_decimal(BigUint::from(24u64), 0);
        let factor_120 = self.to_decimal(BigUint::from(120u64), 0);

        let term2 = self.div_half_up(ctx, &x_sq, &factor_2, RAY_PRECISION);
        let term3 = self.div_half_up(ctx, &x_cub, &factor_6, RAY_PRECISION);
        let term4 = self.div_half_up(ctx, &x_pow4, &factor_24, RAY_PRECISION);
        let term5 = self.div_half_up(ctx, &x_pow5, &factor_120, RAY_PRECISION);

        [x, term2, term3, term4, term5]
            .iter()
            .fold(ray, |sum, term| self.add_same_scale(&sum, term))
    }

    /// Accrues both indexes from `last_update` to `now`.
    ///
    /// Nothing moves while the liquidity rate is zero; the variable index only
    /// moves while there is variable debt.
    fn cumulate_indexes(
        &self,
        ctx: &NumericContext,
        liquidity_index: &ManagedDecimal<Self::Api, NumDecimals>,
        variable_borrow_index: &ManagedDecimal<Self::Api, NumDecimals>,
        liquidity_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        variable_borrow_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        scaled_variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        last_update: u64,
        now: u64,
    ) -> CumulatedIndexes<Self::Api> {
        let mut indexes = CumulatedIndexes {
            liquidity_index: liquidity_index.clone(),
            variable_borrow_index: variable_borrow_index.clone(),
        };
        if self.is_zero(liquidity_rate) {
            return indexes;
        }

        let elapsed = now.saturating_sub(last_update);
        let liquidity_growth = self.calculate_linear_interest(ctx, liquidity_rate, elapsed);
        indexes.liquidity_index =
            self.mul_half_up(ctx, &liquidity_growth, liquidity_index, RAY_PRECISION);

        if !self.is_zero(scaled_variable_debt) {
            let debt_growth = self.calculate_compounded_interest(ctx, variable_borrow_rate, elapsed);
            indexes.variable_borrow_index =
                self.mul_half_up(ctx, &debt_growth, variable_borrow_index, RAY_PRECISION);
        }

        indexes
    }

    /// Liquidity index as it would read at `now`, without writing it.
    fn normalized_income(
        &self,
        ctx: &NumericContext,
        liquidity_index: &ManagedDecimal<Self::Api, NumDecimals>,
        liquidity_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        last_update: u64,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if now <= last_update {
            return liquidity_index.clone();
        }

        let growth = self.calculate_linear_interest(ctx, liquidity_rate, now - last_update);
        self.mul_half_up(ctx, &growth, liquidity_index, RAY_PRECISION)
    }

    /// Variable borrow index as it would read at `now`, without writing it.
    fn normalized_debt(
        &self,
        ctx: &NumericContext,
        variable_borrow_index: &ManagedDecimal<Self::Api, NumDecimals>,
        variable_borrow_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        last_update: u64,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if now <= last_update {
            return variable_borrow_index.clone();
        }

        let growth =
            self.calculate_compounded_interest(ctx, variable_borrow_rate, now - last_update);
        self.mul_half_up(ctx, &growth, variable_borrow_index, RAY_PRECISION)
    }

    /// `rayDiv(amount, index)`, kept at the amount's decimals.
    fn scale_amount(
        &self,
        ctx: &NumericContext,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        index: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_half_up(ctx, amount, index, amount.scale())
    }

    /// `rayMul(scaled, index)`, kept at the balance's decimals.
    fn unscale_amount(
        &self,
        ctx: &NumericContext,
        scaled: &ManagedDecimal<Self::Api, NumDecimals>,
        index: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.mul_half_up(ctx, scaled, index, scaled.scale())
    }

    /// Principal compounded at `rate` since `last_updated`. Used for one
    /// user's stable debt and, with the average rate, for the reserve total.
    fn stable_debt_balance(
        &self,
        ctx: &NumericContext,
        principal: &ManagedDecimal<Self::Api, NumDecimals>,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        last_updated: u64,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if self.is_zero(principal) {
            return principal.clone();
        }

        let growth =
            self.calculate_compounded_interest(ctx, rate, now.saturating_sub(last_updated));
        self.mul_half_up(ctx, principal, &growth, principal.scale())
    }

    fn max_stable_loan_size(
        &self,
        ctx: &NumericContext,
        available_liquidity: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let share = self.to_decimal_bps(BigUint::from(MAX_STABLE_RATE_BORROW_SIZE_BPS));
        self.percent_mul(ctx, available_liquidity, &share)
    }

    /// Adds `amount` of stable debt at `rate` to a user.
    ///
    /// Accrued interest is folded into both principals, the user's rate becomes
    /// the balance-weighted mix of the old and new rate, and the reserve's
    /// average rate is re-weighted over the new supply.
    fn stable_debt_mint(
        &self,
        ctx: &NumericContext,
        position: &StableDebtPosition<Self::Api>,
        supply: &StableDebtSupply<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        now: u64,
    ) -> (StableDebtPosition<Self::Api>, StableDebtSupply<Self::Api>) {
        let current_balance = self.stable_debt_balance(
            ctx,
            &position.principal,
            &position.rate,
            position.last_updated,
            now,
        );
        let previous_supply = self.stable_debt_balance(
            ctx,
            &supply.principal,
            &supply.average_rate,
            supply.last_updated,
            now,
        );
        let next_balance = self.add_same_scale(&current_balance, amount);
        let next_supply = self.add_same_scale(&previous_supply, amount);
        let amount_ray = self.rescale_half_up(ctx, amount, RAY_PRECISION);

        let user_rate = self.reweighted_rate(
            ctx,
            &self.mul_half_up(
                ctx,
                &position.rate,
                &self.rescale_half_up(ctx, &current_balance, RAY_PRECISION),
                RAY_PRECISION,
            ),
            &self.mul_half_up(ctx, &amount_ray, rate, RAY_PRECISION),
            &next_balance,
        );
        let average_rate = self.reweighted_rate(
            ctx,
            &self.mul_half_up(
                ctx,
                &supply.average_rate,
                &self.rescale_half_up(ctx, &previous_supply, RAY_PRECISION),
                RAY_PRECISION,
            ),
            &self.mul_half_up(ctx, rate, &amount_ray, RAY_PRECISION),
            &next_supply,
        );

        (
            StableDebtPosition {
                principal: next_balance,
                rate: user_rate,
                last_updated: now,
            },
            StableDebtSupply {
                principal: next_supply,
                average_rate,
                last_updated: now,
            },
        )
    }

    /// Removes `amount` of stable debt from a user.
    ///
    /// When the removed share outweighs what the average rate still accounts
    /// for, the reserve's stable supply and average rate are both reset to zero.
    /// A user repaying the whole balance loses the locked rate and timestamp.
    fn stable_debt_burn(
        &self,
        ctx: &NumericContext,
        position: &StableDebtPosition<Self::Api>,
        supply: &StableDebtSupply<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        now: u64,
    ) -> (StableDebtPosition<Self::Api>, StableDebtSupply<Self::Api>) {
        let current_balance = self.stable_debt_balance(
            ctx,
            &position.principal,
            &position.rate,
            position.last_updated,
            now,
        );
        let previous_supply = self.stable_debt_balance(
            ctx,
            &supply.principal,
            &supply.average_rate,
            supply.last_updated,
            now,
        );
        let supply_zero = self.zero_at(previous_supply.scale());

        let (next_supply, average_rate) =
            if previous_supply.into_raw_units() <= amount.into_raw_units() {
                (supply_zero, self.ray_zero())
            } else {
                let next_supply = self.saturating_sub(&previous_supply, amount);
                let first_term = self.mul_half_up(
                    ctx,
                    &supply.average_rate,
                    &self.rescale_half_up(ctx, &previous_supply, RAY_PRECISION),
                    RAY_PRECISION,
                );
                let second_term = self.mul_half_up(
                    ctx,
                    &position.rate,
                    &self.rescale_half_up(ctx, amount, RAY_PRECISION),
                    RAY_PRECISION,
                );
                if second_term.into_raw_units() >= first_term.into_raw_units() {
                    (supply_zero, self.ray_zero())
                } else {
                    let remaining_weight = self.saturating_sub(&first_term, &second_term);
                    let average_rate = self.div_half_up(
                        ctx,
                        &remaining_weight,
                        &self.rescale_half_up(ctx, &next_supply, RAY_PRECISION),
                        RAY_PRECISION,
                    );
                    (next_supply, average_rate)
                }
            };

        let fully_repaid = amount.into_raw_units() >= current_balance.into_raw_units();
        let remaining = self.saturating_sub(&current_balance, amount);
        let user_position = if fully_repaid {
            StableDebtPosition {
                principal: remaining,
                rate: self.ray_zero(),
                last_updated: 0,
            }
        } else {
            StableDebtPosition {
                principal: remaining,
                rate: position.rate.clone(),
                last_updated: now,
            }
        };

        (
            user_position,
            StableDebtSupply {
                principal: next_supply,
                average_rate,
                last_updated: now,
            },
        )
    }

    /// Accrues the stored indexes of a reserve up to `now` and stamps it.
    fn update_reserve_state(
        &self,
        ctx: &NumericContext,
        reserve: &mut ReserveState<Self::Api>,
        now: u64,
    ) {
        let indexes = self.cumulate_indexes(
            ctx,
            &reserve.liquidity_index,
            &reserve.variable_borrow_index,
            &reserve.liquidity_rate,
            &reserve.variable_borrow_rate,
            &reserve.scaled_variable_debt,
            reserve.last_update_timestamp,
            now,
        );
        reserve.liquidity_index = indexes.liquidity_index;
        reserve.variable_borrow_index = indexes.variable_borrow_index;
        reserve.last_update_timestamp = now;
    }

    /// Rewrites the stored rates from the reserve's settled balances.
    ///
    /// Must run after [`update_reserve_state`](Self::update_reserve_state) in the
    /// same block, so the variable index used for the debt total is current.
    fn update_reserve_rates(
        &self,
        ctx: &NumericContext,
        params: &MarketParams<Self::Api>,
        reserve: &mut ReserveState<Self::Api>,
        now: u64,
    ) {
        let total_variable_debt =
            self.unscale_amount(ctx, &reserve.scaled_variable_debt, &reserve.variable_borrow_index);
        let total_stable_debt = self.stable_debt_balance(
            ctx,
            &reserve.principal_stable_debt,
            &reserve.average_stable_borrow_rate,
            reserve.total_stable_debt_timestamp,
            now,
        );

        let rates = self.calc_interest_rates(
            ctx,
            params,
            &reserve.available_liquidity,
            &total_stable_debt,
            &total_variable_debt,
            &reserve.average_stable_borrow_rate,
            &reserve.reserve_factor,
        );
        reserve.utilization_rate = rates.utilization;
        reserve.liquidity_rate = rates.liquidity_rate;
        reserve.stable_borrow_rate = rates.stable_borrow_rate;
        reserve.variable_borrow_rate = rates.variable_borrow_rate;
    }

    /// Fills the time-dependent fields of a stored reserve as they read at `now`:
    /// current debt totals, total liquidity and utilization.
    fn project_reserve(
        &self,
        ctx: &NumericContext,
        reserve: &mut ReserveState<Self::Api>,
        now: u64,
    ) {
        let variable_index = self.normalized_debt(
            ctx,
            &reserve.variable_borrow_index,
            &reserve.variable_borrow_rate,
            reserve.last_update_timestamp,
            now,
        );
        reserve.total_variable_debt =
            self.unscale_amount(ctx, &reserve.scaled_variable_debt, &variable_index);
        reserve.total_stable_debt = self.stable_debt_balance(
            ctx,
            &reserve.principal_stable_debt,
            &reserve.average_stable_borrow_rate,
            reserve.total_stable_debt_timestamp,
            now,
        );

        let total_debt = self.add_same_scale(&reserve.total_stable_debt, &reserve.total_variable_debt);
        reserve.total_liquidity = self.add_same_scale(&reserve.available_liquidity, &total_debt);
        reserve.utilization_rate = self.calc_utilization(ctx, &total_debt, &reserve.available_liquidity);
    }

    /// Fills the current balances of a stored position as they read at `now`.
    fn project_position(
        &self,
        ctx: &NumericContext,
        reserve: &ReserveState<Self::Api>,
        position: &mut UserState<Self::Api>,
        now: u64,
    ) {
        let liquidity_index = self.normalized_income(
            ctx,
            &reserve.liquidity_index,
            &reserve.liquidity_rate,
            reserve.last_update_timestamp,
            now,
        );
        let variable_index = self.normalized_debt(
            ctx,
            &reserve.variable_borrow_index,
            &reserve.variable_borrow_rate,
            reserve.last_update_timestamp,
            now,
        );

        position.current_a_token_balance =
            self.unscale_amount(ctx, &position.scaled_a_token_balance, &liquidity_index);
        position.current_variable_debt =
            self.unscale_amount(ctx, &position.scaled_variable_debt, &variable_index);
        position.current_stable_debt = self.stable_debt_balance(
            ctx,
            &position.principal_stable_debt,
            &position.stable_borrow_rate,
            position.stable_rate_last_updated,
            now,
        );
    }

    fn stable_supply_of(&self, reserve: &ReserveState<Self::Api>) -> StableDebtSupply<Self::Api> {
        StableDebtSupply {
            principal: reserve.principal_stable_debt.clone(),
            average_rate: reserve.average_stable_borrow_rate.clone(),
            last_updated: reserve.total_stable_debt_timestamp,
        }
    }

    fn stable_position_of(&self, position: &UserState<Self::Api>) -> StableDebtPosition<Self::Api> {
        StableDebtPosition {
            principal: position.principal_stable_debt.clone(),
            rate: position.stable_borrow_rate.clone(),
            last_updated: position.stable_rate_last_updated,
        }
    }

    /// `(old_weight + new_weight) / balance` in RAY, zero for an empty balance.
    fn reweighted_rate(
        &self,
        ctx: &NumericContext,
        old_weight: &ManagedDecimal<Self::Api, NumDecimals>,
        new_weight: &ManagedDecimal<Self::Api, NumDecimals>,
        balance: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if self.is_zero(balance) {
            return self.ray_zero();
        }

        self.div_half_up(
            ctx,
            &self.add_same_scale(old_weight, new_weight),
            &self.rescale_half_up(ctx, balance, RAY_PRECISION),
            RAY_PRECISION,
        )
    }
}
