//! Independent computation of the state a call should leave behind.
//!
//! The oracle never talks to an environment. It replays a call on a copy of
//! the observed before-view, using the shared protocol formulas with the run's
//! numeric context, and projects every reserve, position and account to the
//! timestamp the next observation will carry.

use std::collections::{BTreeMap, BTreeSet};

use common_constants::BLOCK_TIME_SECONDS;
use common_errors::FailureClass;
use common_math::{NumericContext, SharedMathModule};
use common_proxies::ProtocolCall;
use common_rates::{AccountMath, InterestRates};
use common_structs::{AccountState, MarketParams, MarketView, ReserveState, UserState};
use multiversx_sc::{
    contract_base::ContractBase,
    types::{BigUint, ManagedDecimal, NumDecimals},
};
use multiversx_sc_scenario::api::StaticApi;

use crate::{config::RunConfiguration, errors::ConfigError};

/// Returns the failure class from the enclosing prediction when `$condition` is false.
macro_rules! ensure {
    ($condition:expr, $class:expr) => {
        if !$condition {
            return Err($class);
        }
    };
}

mod admin;
mod borrow;
mod liquidation;
mod supply;

pub type Decimal = ManagedDecimal<StaticApi, NumDecimals>;
pub type View = MarketView<StaticApi>;

/// What the oracle expects a call to do.
#[derive(Clone)]
pub struct Prediction {
    /// `Err` when the protocol should reject the call.
    pub outcome: Result<(), FailureClass>,
    /// Timestamp of the block the call lands in, or the clock after `increaseTime`.
    pub timestamp: u64,
    /// The next observation, as it should read.
    pub view: View,
}

pub struct CalculationOracle {
    ctx: NumericContext,
    params: BTreeMap<String, MarketParams<StaticApi>>,
}

impl ContractBase for CalculationOracle {
    type Api = StaticApi;
}

impl SharedMathModule for CalculationOracle {}
impl InterestRates for CalculationOracle {}
impl AccountMath for CalculationOracle {}

impl CalculationOracle {
    pub fn new(ctx: NumericContext, params: BTreeMap<String, MarketParams<StaticApi>>) -> Self {
        CalculationOracle { ctx, params }
    }

    pub fn from_config(config: &RunConfiguration) -> Result<Self, ConfigError> {
        Ok(Self::new(config.numeric, config.market_params()?))
    }

    /// Expected outcome and after-view of `call`, observed right after it.
    ///
    /// Every call other than `increaseTime` lands in the next block, one second
    /// after `before`. A rejected call still mines that block, so the expected
    /// view is then `before` carried forward in time. The clock saturates
    /// where the market would refuse to move it.
    pub fn predict(&self, before: &View, call: &ProtocolCall) -> Prediction {
        let timestamp = match call {
            ProtocolCall::IncreaseTime { seconds } => before.timestamp.saturating_add(*seconds),
            _ => before.timestamp.saturating_add(BLOCK_TIME_SECONDS),
        };

        let mut working = before.clone();
        let outcome = self.apply(&mut working, call, timestamp);
        let mut view = match outcome {
            Ok(()) => working,
            Err(_) => before.clone(),
        };
        self.settle(&mut view, timestamp);

        Prediction {
            outcome,
            timestamp,
            view,
        }
    }

    fn apply(&self, view: &mut View, call: &ProtocolCall, now: u64) -> Result<(), FailureClass> {
        match call {
            ProtocolCall::Mint { user, asset, amount } => self.mint(view, user, asset, amount),
            ProtocolCall::Approve { user, asset, amount } => self.approve(view, user, asset, amount),
            ProtocolCall::Deposit { user, asset, amount } => self.deposit(view, now, user, asset, amount),
            ProtocolCall::Withdraw { user, asset, amount } => self.withdraw(view, now, user, asset, amount),
            ProtocolCall::Borrow {
                user,
                asset,
                amount,
                rate_mode,
            } => self.borrow(view, now, user, asset, amount, *rate_mode),
            ProtocolCall::Repay {
                user,
                asset,
                amount,
                rate_mode,
                on_behalf_of,
            } => self.repay(view, now, user, asset, amount, *rate_mode, on_behalf_of),
            ProtocolCall::SetUseAsCollateral { user, asset, enabled } => {
                self.set_use_as_collateral(view, now, user, asset, *enabled)
            },
            ProtocolCall::SwapBorrowRateMode { user, asset, rate_mode } => {
                self.swap_borrow_rate_mode(view, now, user, asset, *rate_mode)
            },
            ProtocolCall::LiquidationCall {
                liquidator,
                collateral_asset,
                debt_asset,
                borrower,
                debt_to_cover,
                receive_a_token,
            } => self.liquidation_call(
                view,
                now,
                liquidation::Liquidation {
                    liquidator,
                    collateral_asset,
                    debt_asset,
                    borrower,
                    debt_to_cover,
                    receive_a_token: *receive_a_token,
                },
            ),
            ProtocolCall::SetReserveConfig { asset, update } => self.set_reserve_config(view, asset, update),
            ProtocolCall::SetAssetPrice { asset, price } => self.set_asset_price(view, asset, price),
            ProtocolCall::IncreaseTime { .. } => Ok(()),
        }
    }

    /// Fills every time-dependent field as of `now` and recomputes accounts.
    pub fn settle(&self, view: &mut View, now: u64) {
        for reserve in view.reserves.values_mut() {
            self.project_reserve(&self.ctx, reserve, now);
        }
        for ((asset, _), position) in view.positions.iter_mut() {
            if let Some(reserve) = view.reserves.get(asset) {
                self.project_position(&self.ctx, reserve, position, now);
            }
        }

        let users: BTreeSet<String> = view.positions.keys().map(|(_, user)| user.clone()).collect();
        for user in users {
            let account = self.account_of(view, &user);
            view.accounts.insert(user, account);
        }
        view.timestamp = now;
    }

    /// Account data of `user` from positions that are already projected.
    fn account_of(&self, view: &View, user: &str) -> AccountState<StaticApi> {
        let pairs: Vec<(&ReserveState<StaticApi>, &UserState<StaticApi>)> = view
            .positions_of(user)
            .filter_map(|(asset, position)| view.reserve(asset).map(|reserve| (reserve, position)))
            .collect();
        self.calculate_account_data(&self.ctx, &pairs)
    }

    fn market_params(&self, asset: &str) -> Result<&MarketParams<StaticApi>, FailureClass> {
        self.params.get(asset).ok_or(FailureClass::AssetNotSupported)
    }

    /// Stored reserve record, as the protocol would load it.
    fn load_reserve(&self, view: &View, asset: &str) -> Result<ReserveState<StaticApi>, FailureClass> {
        view.reserve(asset).cloned().ok_or(FailureClass::AssetNotSupported)
    }

    fn store_reserve(&self, view: &mut View, asset: &str, reserve: ReserveState<StaticApi>) {
        view.reserves.insert(asset.to_string(), reserve);
    }

    /// Stored position record; an untracked user has an empty one.
    fn load_position(
        &self,
        view: &View,
        asset: &str,
        user: &str,
    ) -> Result<UserState<StaticApi>, FailureClass> {
        if let Some(position) = view.position(asset, user) {
            return Ok(position.clone());
        }
        let reserve = self.load_reserve(view, asset)?;
        Ok(self.empty_position(reserve.decimals))
    }

    fn store_position(&self, view: &mut View, asset: &str, user: &str, position: UserState<StaticApi>) {
        view.positions
            .insert((asset.to_string(), user.to_string()), position);
    }

    fn reserve_at(&self, view: &View, asset: &str, now: u64) -> Result<ReserveState<StaticApi>, FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        self.project_reserve(&self.ctx, &mut reserve, now);
        Ok(reserve)
    }

    fn position_at(
        &self,
        view: &View,
        asset: &str,
        user: &str,
        now: u64,
    ) -> Result<UserState<StaticApi>, FailureClass> {
        let reserve = self.load_reserve(view, asset)?;
        let mut position = self.load_position(view, asset, user)?;
        self.project_position(&self.ctx, &reserve, &mut position, now);
        Ok(position)
    }

    /// Account data of `user` at `now`, over every reserve in the view.
    fn account_at(&self, view: &View, user: &str, now: u64) -> Result<AccountState<StaticApi>, FailureClass> {
        let mut entries = Vec::new();
        for asset in view.assets() {
            entries.push((
                self.reserve_at(view, asset, now)?,
                self.position_at(view, asset, user, now)?,
            ));
        }
        let pairs: Vec<_> = entries.iter().map(|(reserve, position)| (reserve, position)).collect();
        Ok(self.calculate_account_data(&self.ctx, &pairs))
    }

    fn empty_position(&self, decimals: NumDecimals) -> UserState<StaticApi> {
        UserState {
            scaled_a_token_balance: self.zero_at(decimals),
            current_a_token_balance: self.zero_at(decimals),
            principal_stable_debt: self.zero_at(decimals),
            current_stable_debt: self.zero_at(decimals),
            scaled_variable_debt: self.zero_at(decimals),
            current_variable_debt: self.zero_at(decimals),
            stable_borrow_rate: self.ray_zero(),
            stable_rate_last_updated: 0,
            usage_as_collateral_enabled: false,
            wallet_balance: self.zero_at(decimals),
            allowance: self.zero_at(decimals),
        }
    }

    fn accrue(&self, reserve: &mut ReserveState<StaticApi>, now: u64) {
        self.update_reserve_state(&self.ctx, reserve, now);
    }

    fn reprice(&self, asset: &str, reserve: &mut ReserveState<StaticApi>, now: u64) -> Result<(), FailureClass> {
        let params = self.market_params(asset)?;
        self.update_reserve_rates(&self.ctx, params, reserve, now);
        Ok(())
    }

    fn require_positive(&self, amount: &Decimal) -> Result<(), FailureClass> {
        ensure!(!self.is_zero(amount), FailureClass::InvalidAmount);
        Ok(())
    }

    fn require_active(&self, reserve: &ReserveState<StaticApi>) -> Result<(), FailureClass> {
        ensure!(reserve.is_active, FailureClass::NoActiveReserve);
        Ok(())
    }

    fn require_active_not_frozen(&self, reserve: &ReserveState<StaticApi>) -> Result<(), FailureClass> {
        self.require_active(reserve)?;
        ensure!(!reserve.is_frozen, FailureClass::ReserveFrozen);
        Ok(())
    }

    /// Wallet balance first, then allowance, as an ERC-20 `transferFrom` checks them.
    fn require_can_pull(&self, payer: &UserState<StaticApi>, amount: &Decimal) -> Result<(), FailureClass> {
        ensure!(
            payer.wallet_balance.into_raw_units() >= amount.into_raw_units(),
            FailureClass::InsufficientWalletBalance
        );
        ensure!(
            payer.allowance.into_raw_units() >= amount.into_raw_units(),
            FailureClass::InsufficientAllowance
        );
        Ok(())
    }

    fn pull(&self, payer: &mut UserState<StaticApi>, amount: &Decimal) {
        payer.wallet_balance = self.saturating_sub(&payer.wallet_balance, amount);
        payer.allowance = self.saturating_sub(&payer.allowance, amount);
    }

    fn push(&self, receiver: &mut UserState<StaticApi>, amount: &Decimal) {
        receiver.wallet_balance = self.add_same_scale(&receiver.wallet_balance, amount);
    }

    fn unlimited(&self, scale: NumDecimals) -> Decimal {
        self.to_decimal(BigUint::from(u128::MAX), scale)
    }
}
