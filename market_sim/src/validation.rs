use common_errors::{
    ERROR_INSUFFICIENT_ALLOWANCE, ERROR_INSUFFICIENT_WALLET_BALANCE, ERROR_INVALID_AMOUNT,
    ERROR_NO_ACTIVE_RESERVE, ERROR_RESERVE_FROZEN,
};
use common_proxies::EnvironmentFault;
use common_structs::{ReserveState, UserState};
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

pub fn require_amount_greater_than_zero(
    amount: &ManagedDecimal<StaticApi, NumDecimals>,
) -> Result<(), EnvironmentFault> {
    require!(amount.into_raw_units() > &BigUint::zero(), ERROR_INVALID_AMOUNT);
    Ok(())
}

pub fn require_active(reserve: &ReserveState<StaticApi>) -> Result<(), EnvironmentFault> {
    require!(reserve.is_active, ERROR_NO_ACTIVE_RESERVE);
    Ok(())
}

pub fn require_active_not_frozen(reserve: &ReserveState<StaticApi>) -> Result<(), EnvironmentFault> {
    require_active(reserve)?;
    require!(!reserve.is_frozen, ERROR_RESERVE_FROZEN);
    Ok(())
}

/// The checks an ERC-20 `transferFrom` into the market performs: balance first, then allowance.
pub fn require_can_pull(
    payer: &UserState<StaticApi>,
    amount: &ManagedDecimal<StaticApi, NumDecimals>,
) -> Result<(), EnvironmentFault> {
    require!(
        payer.wallet_balance.into_raw_units() >= amount.into_raw_units(),
        ERROR_INSUFFICIENT_WALLET_BALANCE
    );
    require!(
        payer.allowance.into_raw_units() >= amount.into_raw_units(),
        ERROR_INSUFFICIENT_ALLOWANCE
    );
    Ok(())
}
