use common_constants::{BPS_PRECISION, RAY, RAY_PRECISION, WAD_PRECISION};
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use serde::Deserialize;

use crate::{parse_decimal, DecimalParseError, ReserveState};

/// Static description of one listed asset, as written in the run configuration.
///
/// Rates and utilization points are annual fractions (`"0.04"` is 4%), the price
/// is the value of one whole token in base currency.
#[derive(Clone, Debug, Deserialize)]
pub struct ReserveParams {
    pub decimals: NumDecimals,
    pub price: String,
    pub ltv_bps: u64,
    pub liquidation_threshold_bps: u64,
    pub liquidation_bonus_bps: u64,
    pub reserve_factor_bps: u64,
    #[serde(default = "stable_borrowing_default")]
    pub stable_borrow_rate_enabled: bool,
    pub base_variable_borrow_rate: String,
    pub variable_rate_slope1: String,
    pub variable_rate_slope2: String,
    #[serde(default = "zero_rate")]
    pub variable_rate_slope3: String,
    pub mid_utilization: String,
    pub optimal_utilization: String,
    pub max_borrow_rate: String,
    pub base_stable_borrow_rate: String,
    pub stable_rate_slope1: String,
    pub stable_rate_slope2: String,
}

fn stable_borrowing_default() -> bool {
    true
}

fn zero_rate() -> String {
    "0".to_string()
}

/// Interest-rate strategy of a reserve, converted to RAY.
#[derive(Clone)]
pub struct MarketParams<M: ManagedTypeApi> {
    pub asset_decimals: NumDecimals,
    pub base_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub slope1: ManagedDecimal<M, NumDecimals>,
    pub slope2: ManagedDecimal<M, NumDecimals>,
    pub slope3: ManagedDecimal<M, NumDecimals>,
    pub mid_utilization: ManagedDecimal<M, NumDecimals>,
    pub optimal_utilization: ManagedDecimal<M, NumDecimals>,
    pub max_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub base_stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_slope1: ManagedDecimal<M, NumDecimals>,
    pub stable_slope2: ManagedDecimal<M, NumDecimals>,
}

impl ReserveParams {
    pub fn market_params<M: ManagedTypeApi>(&self) -> Result<MarketParams<M>, DecimalParseError> {
        let ray = |text: &str| parse_decimal::<M>(text, RAY_PRECISION);

        Ok(MarketParams {
            asset_decimals: self.decimals,
            base_borrow_rate: ray(&self.base_variable_borrow_rate)?,
            slope1: ray(&self.variable_rate_slope1)?,
            slope2: ray(&self.variable_rate_slope2)?,
            slope3: ray(&self.variable_rate_slope3)?,
            mid_utilization: ray(&self.mid_utilization)?,
            optimal_utilization: ray(&self.optimal_utilization)?,
            max_borrow_rate: ray(&self.max_borrow_rate)?,
            base_stable_borrow_rate: ray(&self.base_stable_borrow_rate)?,
            stable_slope1: ray(&self.stable_rate_slope1)?,
            stable_slope2: ray(&self.stable_rate_slope2)?,
        })
    }

    /// Freshly initialised reserve: empty, indexes at one, configured flags.
    pub fn initial_state<M: ManagedTypeApi>(
        &self,
        timestamp: u64,
    ) -> Result<ReserveState<M>, DecimalParseError> {
        let amount_zero = || ManagedDecimal::from_raw_units(BigUint::zero(), self.decimals);
        let ray_zero = || ManagedDecimal::from_raw_units(BigUint::zero(), RAY_PRECISION);
        let ray_one = || ManagedDecimal::from_raw_units(BigUint::from(RAY), RAY_PRECISION);
        let bps = |value: u64| ManagedDecimal::from_raw_units(BigUint::from(value), BPS_PRECISION);

        Ok(ReserveState {
            decimals: self.decimals,
            available_liquidity: amount_zero(),
            total_stable_debt: amount_zero(),
            total_variable_debt: amount_zero(),
            total_liquidity: amount_zero(),
            principal_stable_debt: amount_zero(),
            scaled_variable_debt: amount_zero(),
            average_stable_borrow_rate: ray_zero(),
            utilization_rate: ray_zero(),
            liquidity_rate: ray_zero(),
            variable_borrow_rate: ray_zero(),
            stable_borrow_rate: ray_zero(),
            liquidity_index: ray_one(),
            variable_borrow_index: ray_one(),
            last_update_timestamp: timestamp,
            total_stable_debt_timestamp: 0,
            price: parse_decimal(&self.price, WAD_PRECISION)?,
            ltv: bps(self.ltv_bps),
            liquidation_threshold: bps(self.liquidation_threshold_bps),
            liquidation_bonus: bps(self.liquidation_bonus_bps),
            reserve_factor: bps(self.reserve_factor_bps),
            is_active: true,
            is_frozen: false,
            stable_borrow_rate_enabled: self.stable_borrow_rate_enabled,
        })
    }
}

/// Partial update of a reserve's configuration; absent keys stay as they are.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReserveConfigUpdate {
    pub is_active: Option<bool>,
    pub is_frozen: Option<bool>,
    pub stable_borrow_rate_enabled: Option<bool>,
    pub ltv_bps: Option<u64>,
    pub liquidation_threshold_bps: Option<u64>,
    pub liquidation_bonus_bps: Option<u64>,
    pub reserve_factor_bps: Option<u64>,
}

impl ReserveConfigUpdate {
    pub fn apply<M: ManagedTypeApi>(&self, reserve: &mut ReserveState<M>) {
        let bps = |value: u64| ManagedDecimal::from_raw_units(BigUint::from(value), BPS_PRECISION);

        if let Some(flag) = self.is_active {
            reserve.is_active = flag;
        }
        if let Some(flag) = self.is_frozen {
            reserve.is_frozen = flag;
        }
        if let Some(flag) = self.stable_borrow_rate_enabled {
            reserve.stable_borrow_rate_enabled = flag;
        }
        if let Some(value) = self.ltv_bps {
            reserve.ltv = bps(value);
        }
        if let Some(value) = self.liquidation_threshold_bps {
            reserve.liquidation_threshold = bps(value);
        }
        if let Some(value) = self.liquidation_bonus_bps {
            reserve.liquidation_bonus = bps(value);
        }
        if let Some(value) = self.reserve_factor_bps {
            reserve.reserve_factor = bps(value);
        }
    }
}

/// Debt flavour a borrow is taken in, or a position is switched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestRateMode {
    Stable,
    Variable,
}

impl InterestRateMode {
    pub fn other(self) -> Self {
        match self {
            InterestRateMode::Stable => InterestRateMode::Variable,
            InterestRateMode::Variable => InterestRateMode::Stable,
        }
    }
}
