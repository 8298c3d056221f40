use common_errors::FailureClass;
use common_math::SharedMathModule;
use common_proxies::Amount;
use common_rates::{AccountMath, InterestRates};

use super::{CalculationOracle, Decimal, View};

impl CalculationOracle {
    pub(super) fn mint(&self, view: &mut View, user: &str, asset: &str, amount: &Decimal) -> Result<(), FailureClass> {
        let mut position = self.load_position(view, asset, user)?;
        self.push(&mut position, amount);
        self.store_position(view, asset, user, position);
        Ok(())
    }

    pub(super) fn approve(&self, view: &mut View, user: &str, asset: &str, amount: &Amount) -> Result<(), FailureClass> {
        let mut position = self.load_position(view, asset, user)?;
        position.allowance = match amount {
            Amount::Exact(value) => value.clone(),
            Amount::Max => self.unlimited(position.allowance.scale()),
        };
        self.store_position(view, asset, user, position);
        Ok(())
    }

    pub(super) fn deposit(
        &self,
        view: &mut View,
        now: u64,
        user: &str,
        asset: &str,
        amount: &Decimal,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        self.market_params(asset)?;
        self.require_positive(amount)?;
        self.require_active_not_frozen(&reserve)?;
        let mut position = self.load_position(view, asset, user)?;
        self.require_can_pull(&position, amount)?;

        self.accrue(&mut reserve, now);
        reserve.available_liquidity = self.add_same_scale(&reserve.available_liquidity, amount);
        self.reprice(asset, &mut reserve, now)?;

        let scaled = self.scale_amount(&self.ctx, amount, &reserve.liquidity_index);
        if self.is_zero(&position.scaled_a_token_balance) {
            position.usage_as_collateral_enabled = true;
        }
        position.scaled_a_token_balance = self.add_same_scale(&position.scaled_a_token_balance, &scaled);
        self.pull(&mut position, amount);

        self.store_reserve(view, asset, reserve);
        self.store_position(view, asset, user, position);
        Ok(())
    }

    pub(super) fn withdraw(
        &self,
        view: &mut View,
        now: u64,
        user: &str,
        asset: &str,
        amount: &Amount,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        self.market_params(asset)?;
        let current = self.position_at(view, asset, user, now)?;
        let balance = current.current_a_token_balance.clone();
        let amount = match amount {
            Amount::Exact(value) => value.clone(),
            Amount::Max => balance.clone(),
        };

        self.require_positive(&amount)?;
        ensure!(
            amount.into_raw_units() <= balance.into_raw_units(),
            FailureClass::NotEnoughAvailableUserBalance
        );
        self.require_active(&reserve)?;
        let account = self.account_at(view, user, now)?;
        let reserve_now = self.reserve_at(view, asset, now)?;
        ensure!(
            self.balance_decrease_allowed(&self.ctx, &account, &reserve_now, &current, &amount),
            FailureClass::TransferNotAllowed
        );
        ensure!(
            reserve.available_liquidity.into_raw_units() >= amount.into_raw_units(),
            FailureClass::InsufficientLiquidity
        );

        self.accrue(&mut reserve, now);
        reserve.available_liquidity = self.saturating_sub(&reserve.available_liquidity, &amount);
        self.reprice(asset, &mut reserve, now)?;

        let mut position = self.load_position(view, asset, user)?;
        let scaled = self.scale_amount(&self.ctx, &amount, &reserve.liquidity_index);
        position.scaled_a_token_balance = self.saturating_sub(&position.scaled_a_token_balance, &scaled);
        if amount.into_raw_units() == balance.into_raw_units() {
            position.usage_as_collateral_enabled = false;
        }
        self.push(&mut position, &amount);

        self.store_reserve(view, asset, reserve);
        self.store_position(view, asset, user, position);
        Ok(())
    }

    pub(super) fn set_use_as_collateral(
        &self,
        view: &mut View,
        now: u64,
        user: &str,
        asset: &str,
        enabled: bool,
    ) -> Result<(), FailureClass> {
        let current = self.position_at(view, asset, user, now)?;
        ensure!(
            !self.is_zero(&current.current_a_token_balance),
            FailureClass::UnderlyingBalanceNotGreaterThanZero
        );
        if !enabled {
            let account = self.account_at(view, user, now)?;
            let reserve_now = self.reserve_at(view, asset, now)?;
            ensure!(
                self.balance_decrease_allowed(
                    &self.ctx,
                    &account,
                    &reserve_now,
                    &current,
                    &current.current_a_token_balance,
                ),
                FailureClass::DepositAlreadyInUse
            );
        }

        let mut position = self.load_position(view, asset, user)?;
        position.usage_as_collateral_enabled = enabled;
        self.store_position(view, asset, user, position);
        Ok(())
    }
}
