use common_constants::HEALTH_FACTOR_LIQUIDATION_THRESHOLD;
use common_errors::FailureClass;
use common_math::SharedMathModule;
use common_proxies::Amount;
use common_rates::{AccountMath, InterestRates, StableDebtPosition, StableDebtSupply};
use common_structs::{InterestRateMode, ReserveState, UserState};
use multiversx_sc::types::BigUint;
use multiversx_sc_scenario::api::StaticApi;

use super::{CalculationOracle, Decimal, View};

type Reserve = ReserveState<StaticApi>;
type Position = UserState<StaticApi>;

impl CalculationOracle {
    pub(super) fn borrow(
        &self,
        view: &mut View,
        now: u64,
        user: &str,
        asset: &str,
        amount: &Decimal,
        rate_mode: InterestRateMode,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        self.market_params(asset)?;
        self.require_active_not_frozen(&reserve)?;
        self.require_positive(amount)?;

        let account = self.account_at(view, user, now)?;
        ensure!(
            !self.is_zero(&account.total_collateral_base),
            FailureClass::CollateralBalanceIsZero
        );
        ensure!(
            account.health_factor.into_raw_units() > &BigUint::from(HEALTH_FACTOR_LIQUIDATION_THRESHOLD),
            FailureClass::HealthFactorLowerThanThreshold
        );
        let amount_in_base = self.base_value(&self.ctx, amount, &reserve.price);
        let debt_after = self.add_same_scale(&account.total_debt_base, &amount_in_base);
        ensure!(!self.is_zero(&account.ltv), FailureClass::CollateralCannotCoverNewBorrow);
        let collateral_needed = self.percent_div(&self.ctx, &debt_after, &account.ltv);
        ensure!(
            collateral_needed.into_raw_units() <= account.total_collateral_base.into_raw_units(),
            FailureClass::CollateralCannotCoverNewBorrow
        );

        if rate_mode == InterestRateMode::Stable {
            let current = self.position_at(view, asset, user, now)?;
            ensure!(reserve.stable_borrow_rate_enabled, FailureClass::StableBorrowingNotEnabled);
            ensure!(
                !current.usage_as_collateral_enabled
                    || self.is_zero(&reserve.ltv)
                    || amount.into_raw_units() > current.current_a_token_balance.into_raw_units(),
                FailureClass::CollateralSameAsBorrowingCurrency
            );
            let max_loan = self.max_stable_loan_size(&self.ctx, &reserve.available_liquidity);
            ensure!(
                amount.into_raw_units() <= max_loan.into_raw_units(),
                FailureClass::AmountBiggerThanMaxLoanSizeStable
            );
        }
        ensure!(
            reserve.available_liquidity.into_raw_units() >= amount.into_raw_units(),
            FailureClass::InsufficientLiquidity
        );

        self.accrue(&mut reserve, now);
        let mut position = self.load_position(view, asset, user)?;
        match rate_mode {
            InterestRateMode::Stable => {
                let rate = reserve.stable_borrow_rate.clone();
                self.add_stable_debt(&mut reserve, &mut position, amount, &rate, now);
            },
            InterestRateMode::Variable => self.add_variable_debt(&mut reserve, &mut position, amount),
        }
        reserve.available_liquidity = self.saturating_sub(&reserve.available_liquidity, amount);
        self.reprice(asset, &mut reserve, now)?;
        self.push(&mut position, amount);

        self.store_reserve(view, asset, reserve);
        self.store_position(view, asset, user, position);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn repay(
        &self,
        view: &mut View,
        now: u64,
        user: &str,
        asset: &str,
        amount: &Amount,
        rate_mode: InterestRateMode,
        on_behalf_of: &str,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        self.market_params(asset)?;
        let debtor = self.position_at(view, asset, on_behalf_of, now)?;
        let debt = match rate_mode {
            InterestRateMode::Stable => debtor.current_stable_debt.clone(),
            InterestRateMode::Variable => debtor.current_variable_debt.clone(),
        };

        self.require_active(&reserve)?;
        if let Amount::Exact(value) = amount {
            self.require_positive(value)?;
        }
        ensure!(!self.is_zero(&debt), FailureClass::NoDebtOfSelectedType);
        ensure!(
            matches!(amount, Amount::Exact(_)) || user == on_behalf_of,
            FailureClass::NoExplicitAmountToRepayOnBehalf
        );
        let payback = match amount {
            Amount::Exact(value) => self.get_min(value.clone(), debt),
            Amount::Max => debt,
        };
        self.require_can_pull(&self.load_position(view, asset, user)?, &payback)?;

        self.accrue(&mut reserve, now);
        let mut position = self.load_position(view, asset, on_behalf_of)?;
        match rate_mode {
            InterestRateMode::Stable => self.remove_stable_debt(&mut reserve, &mut position, &payback, now),
            InterestRateMode::Variable => self.remove_variable_debt(&mut reserve, &mut position, &payback),
        }
        self.store_position(view, asset, on_behalf_of, position);
        reserve.available_liquidity = self.add_same_scale(&reserve.available_liquidity, &payback);
        self.reprice(asset, &mut reserve, now)?;
        self.store_reserve(view, asset, reserve);

        let mut payer = self.load_position(view, asset, user)?;
        self.pull(&mut payer, &payback);
        self.store_position(view, asset, user, payer);
        Ok(())
    }

    pub(super) fn swap_borrow_rate_mode(
        &self,
        view: &mut View,
        now: u64,
        user: &str,
        asset: &str,
        rate_mode: InterestRateMode,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        self.market_params(asset)?;
        let current = self.position_at(view, asset, user, now)?;
        self.require_active_not_frozen(&reserve)?;

        match rate_mode {
            InterestRateMode::Stable => {
                ensure!(
                    !self.is_zero(&current.current_stable_debt),
                    FailureClass::NoStableRateLoanInReserve
                );
            },
            InterestRateMode::Variable => {
                ensure!(
                    !self.is_zero(&current.current_variable_debt),
                    FailureClass::NoVariableRateLoanInReserve
                );
                ensure!(reserve.stable_borrow_rate_enabled, FailureClass::StableBorrowingNotEnabled);
                let total_debt = self.add_same_scale(&current.current_stable_debt, &current.current_variable_debt);
                ensure!(
                    !current.usage_as_collateral_enabled
                        || self.is_zero(&reserve.ltv)
                        || total_debt.into_raw_units() > current.current_a_token_balance.into_raw_units(),
                    FailureClass::CollateralSameAsBorrowingCurrency
                );
            },
        }

        self.accrue(&mut reserve, now);
        let mut position = self.load_position(view, asset, user)?;
        match rate_mode {
            InterestRateMode::Stable => {
                let debt = current.current_stable_debt;
                self.remove_stable_debt(&mut reserve, &mut position, &debt, now);
                self.add_variable_debt(&mut reserve, &mut position, &debt);
            },
            InterestRateMode::Variable => {
                let debt = current.current_variable_debt;
                let rate = reserve.stable_borrow_rate.clone();
                self.remove_variable_debt(&mut reserve, &mut position, &debt);
                self.add_stable_debt(&mut reserve, &mut position, &debt, &rate, now);
            },
        }
        self.reprice(asset, &mut reserve, now)?;

        self.store_reserve(view, asset, reserve);
        self.store_position(view, asset, user, position);
        Ok(())
    }

    pub(super) fn add_variable_debt(&self, reserve: &mut Reserve, position: &mut Position, amount: &Decimal) {
        let scaled = self.scale_amount(&self.ctx, amount, &reserve.variable_borrow_index);
        position.scaled_variable_debt = self.add_same_scale(&position.scaled_variable_debt, &scaled);
        reserve.scaled_variable_debt = self.add_same_scale(&reserve.scaled_variable_debt, &scaled);
    }

    pub(super) fn remove_variable_debt(&self, reserve: &mut Reserve, position: &mut Position, amount: &Decimal) {
        let scaled = self.scale_amount(&self.ctx, amount, &reserve.variable_borrow_index);
        position.scaled_variable_debt = self.saturating_sub(&position.scaled_variable_debt, &scaled);
        reserve.scaled_variable_debt = self.saturating_sub(&reserve.scaled_variable_debt, &scaled);
    }

    fn add_stable_debt(&self, reserve: &mut Reserve, position: &mut Position, amount: &Decimal, rate: &Decimal, now: u64) {
        let (user_debt, supply) = self.stable_debt_mint(
            &self.ctx,
            &self.stable_position_of(position),
            &self.stable_supply_of(reserve),
            amount,
            rate,
            now,
        );
        record_stable(reserve, position, user_debt, supply);
    }

    pub(super) fn remove_stable_debt(&self, reserve: &mut Reserve, position: &mut Position, amount: &Decimal, now: u64) {
        let (user_debt, supply) = self.stable_debt_burn(
            &self.ctx,
            &self.stable_position_of(position),
            &self.stable_supply_of(reserve),
            amount,
            now,
        );
        record_stable(reserve, position, user_debt, supply);
    }
}

fn record_stable(
    reserve: &mut Reserve,
    position: &mut Position,
    user_debt: StableDebtPosition<StaticApi>,
    supply: StableDebtSupply<StaticApi>,
) {
    position.principal_stable_debt = user_debt.principal;
    position.stable_borrow_rate = user_debt.rate;
    position.stable_rate_last_updated = user_debt.last_updated;
    reserve.principal_stable_debt = supply.principal;
    reserve.average_stable_borrow_rate = supply.average_rate;
    reserve.total_stable_debt_timestamp = supply.last_updated;
}
