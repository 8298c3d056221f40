use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

mod config;
mod decimal;
mod view;

pub use config::{InterestRateMode, MarketParams, ReserveConfigUpdate, ReserveParams};
pub use decimal::{format_decimal, parse_decimal, raw_digits, DecimalParseError};
pub use view::{first_mismatch, FieldMismatch, FieldValue, Fields, MarketView};

/// One reserve as the protocol reports it at query time.
///
/// Balances are at the asset's decimals, rates and indexes at RAY, the price at
/// WAD and risk parameters in basis points. The current debt totals and the
/// utilization already include interest accrued up to the query timestamp; the
/// stored indexes and rates are the ones written by the last state-changing call.
#[derive(Clone)]
pub struct ReserveState<M: ManagedTypeApi> {
    pub decimals: NumDecimals,
    pub available_liquidity: ManagedDecimal<M, NumDecimals>,
    pub total_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub total_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub total_liquidity: ManagedDecimal<M, NumDecimals>,
    pub principal_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub scaled_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub average_stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub utilization_rate: ManagedDecimal<M, NumDecimals>,
    pub liquidity_rate: ManagedDecimal<M, NumDecimals>,
    pub variable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub liquidity_index: ManagedDecimal<M, NumDecimals>,
    pub variable_borrow_index: ManagedDecimal<M, NumDecimals>,
    pub last_update_timestamp: u64,
    pub total_stable_debt_timestamp: u64,
    pub price: ManagedDecimal<M, NumDecimals>,
    pub ltv: ManagedDecimal<M, NumDecimals>,
    pub liquidation_threshold: ManagedDecimal<M, NumDecimals>,
    pub liquidation_bonus: ManagedDecimal<M, NumDecimals>,
    pub reserve_factor: ManagedDecimal<M, NumDecimals>,
    pub is_active: bool,
    pub is_frozen: bool,
    pub stable_borrow_rate_enabled: bool,
}

/// One user's position in one reserve.
#[derive(Clone)]
pub struct UserState<M: ManagedTypeApi> {
    pub scaled_a_token_balance: ManagedDecimal<M, NumDecimals>,
    pub current_a_token_balance: ManagedDecimal<M, NumDecimals>,
    pub principal_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub current_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub scaled_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub current_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_rate_last_updated: u64,
    pub usage_as_collateral_enabled: bool,
    pub wallet_balance: ManagedDecimal<M, NumDecimals>,
    pub allowance: ManagedDecimal<M, NumDecimals>,
}

/// Cross-reserve risk summary of one user, in base currency (WAD).
#[derive(Clone)]
pub struct AccountState<M: ManagedTypeApi> {
    pub total_collateral_base: ManagedDecimal<M, NumDecimals>,
    pub total_debt_base: ManagedDecimal<M, NumDecimals>,
    pub available_borrows_base: ManagedDecimal<M, NumDecimals>,
    pub ltv: ManagedDecimal<M, NumDecimals>,
    pub current_liquidation_threshold: ManagedDecimal<M, NumDecimals>,
    pub health_factor: ManagedDecimal<M, NumDecimals>,
}

/// Reserve and user position returned together by a single state query.
#[derive(Clone)]
pub struct StateSnapshot<M: ManagedTypeApi> {
    pub reserve: ReserveState<M>,
    pub user: UserState<M>,
}

impl<M: ManagedTypeApi> UserState<M> {
    pub fn has_debt(&self) -> bool {
        !is_zero(&self.current_stable_debt) || !is_zero(&self.current_variable_debt)
    }

    pub fn has_supply(&self) -> bool {
        !is_zero(&self.scaled_a_token_balance)
    }
}

fn is_zero<M: ManagedTypeApi>(value: &ManagedDecimal<M, NumDecimals>) -> bool {
    value.into_raw_units() == &multiversx_sc::types::BigUint::zero()
}
