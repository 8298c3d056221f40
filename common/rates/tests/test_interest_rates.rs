use common_math::{NumericContext, SharedMathModule};
use common_rates::{InterestRates, StableDebtPosition, StableDebtSupply};
use common_structs::MarketParams;
use multiversx_sc::{
    contract_base::ContractBase,
    types::{BigUint, ManagedDecimal, NumDecimals},
};
use multiversx_sc_scenario::api::StaticApi;

const CTX: NumericContext = NumericContext::PROTOCOL;
const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;
const SECONDS_PER_YEAR: u64 = 31_536_000;

pub struct RatesTester;

impl ContractBase for RatesTester {
    type Api = StaticApi;
}

impl SharedMathModule for RatesTester {}
impl InterestRates for RatesTester {}

fn dec(raw: u128, scale: NumDecimals) -> ManagedDecimal<StaticApi, NumDecimals> {
    ManagedDecimal::from_raw_units(BigUint::from(raw), scale)
}

/// `percent` of one RAY, e.g. `ray_pct(4)` is 4%.
fn ray_pct(percent: u128) -> ManagedDecimal<StaticApi, NumDecimals> {
    dec(percent * RAY / 100, 27)
}

fn raw(value: &ManagedDecimal<StaticApi, NumDecimals>) -> BigUint<StaticApi> {
    value.into_raw_units().clone()
}

fn strategy(slope3: u128, max_rate: u128) -> MarketParams<StaticApi> {
    MarketParams {
        asset_decimals: 6,
        base_borrow_rate: ray_pct(0),
        slope1: ray_pct(4),
        slope2: ray_pct(60),
        slope3: ray_pct(slope3),
        mid_utilization: ray_pct(80),
        optimal_utilization: ray_pct(90),
        max_borrow_rate: ray_pct(max_rate),
        base_stable_borrow_rate: ray_pct(2),
        stable_slope1: ray_pct(6),
        stable_slope2: ray_pct(60),
    }
}

/// Half the liquidity lent out reads as exactly 0.5 RAY.
#[test]
fn utilization_half_borrowed_exact() {
    let tester = RatesTester;
    let utilization = tester.calc_utilization(&CTX, &dec(500_000_000, 6), &dec(500_000_000, 6));
    assert_eq!(raw(&utilization), BigUint::from(RAY / 2));
}

#[test]
fn utilization_without_debt_zero() {
    let tester = RatesTester;
    let utilization = tester.calc_utilization(&CTX, &dec(0, 6), &dec(500_000_000, 6));
    assert_eq!(raw(&utilization), BigUint::zero());
    assert_eq!(utilization.scale(), 27);
}

/// Below `mid`: `utilization * slope1 / mid`.
#[test]
fn variable_rate_region_one_scales_slope1() {
    let tester = RatesTester;
    let rate = tester.calc_variable_borrow_rate(&CTX, &ray_pct(50), &strategy(0, 200));
    // 0.5 * 0.04 / 0.8 = 0.025
    assert_eq!(raw(&rate), BigUint::from(25 * RAY / 1000));
}

#[test]
fn variable_rate_region_two_adds_slope2_share() {
    let tester = RatesTester;
    let rate = tester.calc_variable_borrow_rate(&CTX, &ray_pct(85), &strategy(0, 200));
    // 0.04 + 0.05 * 0.6 / 0.1 = 0.34
    assert_eq!(raw(&rate), BigUint::from(34 * RAY / 100));
}

/// Above `optimal` the third slope applies, and the cap wins when lower.
#[test]
fn variable_rate_region_three_capped_at_max() {
    let tester = RatesTester;
    let uncapped = tester.calc_variable_borrow_rate(&CTX, &ray_pct(95), &strategy(100, 200));
    // 0.64 + 0.05 * 1.0 / 0.1 = 1.14
    assert_eq!(raw(&uncapped), BigUint::from(114 * RAY / 100));

    let capped = tester.calc_variable_borrow_rate(&CTX, &ray_pct(95), &strategy(100, 100));
    assert_eq!(raw(&capped), BigUint::from(RAY));
}

#[test]
fn stable_rate_both_slopes() {
    let tester = RatesTester;
    let below = tester.calc_stable_borrow_rate(&CTX, &ray_pct(45), &strategy(0, 200));
    // 0.02 + 0.06 * 0.45 / 0.9 = 0.05
    assert_eq!(raw(&below), BigUint::from(5 * RAY / 100));

    let above = tester.calc_stable_borrow_rate(&CTX, &ray_pct(95), &strategy(0, 200));
    // 0.02 + 0.06 + 0.6 * 0.5 = 0.38
    assert_eq!(raw(&above), BigUint::from(38 * RAY / 100));
}

/// Only variable debt: the overall rate is the variable rate, and suppliers
/// earn `overall * utilization * (1 - reserve factor)`.
#[test]
fn interest_rates_variable_only_reserve() {
    let tester = RatesTester;
    let rates = tester.calc_interest_rates(
        &CTX,
        &strategy(0, 200),
        &dec(500_000_000, 6),
        &dec(0, 6),
        &dec(500_000_000, 6),
        &ray_pct(0),
        &dec(1_000, 4),
    );

    assert_eq!(raw(&rates.utilization), BigUint::from(RAY / 2));
    assert_eq!(raw(&rates.variable_borrow_rate), BigUint::from(25 * RAY / 1000));
    assert_eq!(raw(&rates.stable_borrow_rate), BigUint::from(2 * RAY / 100 + 6 * RAY / 100 * 5 / 9));
    // 0.025 * 0.5 * 0.9 = 0.01125
    assert_eq!(raw(&rates.liquidity_rate), BigUint::from(1_125 * RAY / 100_000));
}

#[test]
fn overall_rate_weights_stable_and_variable_debt() {
    let tester = RatesTester;
    let overall = tester.calc_overall_borrow_rate(
        &CTX,
        &dec(100_000_000, 6),
        &dec(300_000_000, 6),
        &ray_pct(4),
        &ray_pct(8),
    );
    // (300 * 0.04 + 100 * 0.08) / 400 = 0.05
    assert_eq!(raw(&overall), BigUint::from(5 * RAY / 100));
}

#[test]
fn linear_interest_full_and_half_year() {
    let tester = RatesTester;
    let full = tester.calculate_linear_interest(&CTX, &ray_pct(10), SECONDS_PER_YEAR);
    assert_eq!(raw(&full), BigUint::from(RAY + RAY / 10));

    let half = tester.calculate_linear_interest(&CTX, &ray_pct(10), SECONDS_PER_YEAR / 2);
    assert_eq!(raw(&half), BigUint::from(RAY + RAY / 20));
}

#[test]
fn compounded_interest_zero_elapsed_is_one() {
    let tester = RatesTester;
    let factor = tester.calculate_compounded_interest(&CTX, &ray_pct(10), 0);
    assert_eq!(raw(&factor), BigUint::from(RAY));
}

/// A per-second rate of 1e-9: every Taylor term is rounded half-up on its own.
#[test]
fn compounded_interest_taylor_terms_rounded_individually() {
    let tester = RatesTester;
    let rate = dec(SECONDS_PER_YEAR as u128 * 1_000_000_000_000_000_000, 27);

    let one_second = tester.calculate_compounded_interest(&CTX, &rate, 1);
    // 1 + x + x^2/2 with x = 1e-9; x^3 rounds to 1 unit and x^3/6 to zero.
    assert_eq!(raw(&one_second), BigUint::from(RAY + 1_000_000_000_000_000_000 + 500_000_000));

    let two_seconds = tester.calculate_compounded_interest(&CTX, &rate, 2);
    // x = 2e-9: x^2/2 = 2e9 units, x^3 = 8 units, 8/6 rounds to 1.
    assert_eq!(
        raw(&two_seconds),
        BigUint::from(RAY + 2_000_000_000_000_000_000 + 2_000_000_000 + 1)
    );
}

#[test]
fn cumulate_indexes_idle_reserve_unchanged() {
    let tester = RatesTester;
    let indexes = tester.cumulate_indexes(
        &CTX,
        &dec(RAY, 27),
        &dec(RAY, 27),
        &ray_pct(0),
        &ray_pct(5),
        &dec(100, 6),
        0,
        SECONDS_PER_YEAR,
    );
    assert_eq!(raw(&indexes.liquidity_index), BigUint::from(RAY));
    assert_eq!(raw(&indexes.variable_borrow_index), BigUint::from(RAY));
}

/// With supply interest but no variable debt, only the liquidity index moves.
#[test]
fn cumulate_indexes_without_variable_debt_moves_liquidity_only() {
    let tester = RatesTester;
    let indexes = tester.cumulate_indexes(
        &CTX,
        &dec(RAY, 27),
        &dec(RAY, 27),
        &ray_pct(10),
        &ray_pct(20),
        &dec(0, 6),
        0,
        SECONDS_PER_YEAR,
    );
    assert_eq!(raw(&indexes.liquidity_index), BigUint::from(RAY + RAY / 10));
    assert_eq!(raw(&indexes.variable_borrow_index), BigUint::from(RAY));
}

#[test]
fn normalized_income_same_block_is_stored_index() {
    let tester = RatesTester;
    let index = dec(RAY + 12_345, 27);
    let income = tester.normalized_income(&CTX, &index, &ray_pct(10), 50, 50);
    assert_eq!(raw(&income), BigUint::from(RAY + 12_345));
}

#[test]
fn scale_amount_rounds_half_up() {
    let tester = RatesTester;
    let index = dec(RAY + RAY / 2, 27);
    let scaled = tester.scale_amount(&CTX, &dec(1_000_000_000, 6), &index);
    assert_eq!(raw(&scaled), BigUint::from(666_666_667u64));
    assert_eq!(scaled.scale(), 6);

    let back = tester.unscale_amount(&CTX, &scaled, &index);
    assert_eq!(raw(&back), BigUint::from(1_000_000_001u64));
}

fn empty_position() -> StableDebtPosition<StaticApi> {
    StableDebtPosition {
        principal: dec(0, 6),
        rate: ray_pct(0),
        last_updated: 0,
    }
}

fn empty_supply() -> StableDebtSupply<StaticApi> {
    StableDebtSupply {
        principal: dec(0, 6),
        average_rate: ray_pct(0),
        last_updated: 0,
    }
}

#[test]
fn stable_mint_first_borrow_locks_rate() {
    let tester = RatesTester;
    let (position, supply) = tester.stable_debt_mint(
        &CTX,
        &empty_position(),
        &empty_supply(),
        &dec(100_000_000, 6),
        &ray_pct(5),
        10,
    );

    assert_eq!(raw(&position.principal), BigUint::from(100_000_000u64));
    assert_eq!(raw(&position.rate), BigUint::from(5 * RAY / 100));
    assert_eq!(position.last_updated, 10);
    assert_eq!(raw(&supply.principal), BigUint::from(100_000_000u64));
    assert_eq!(raw(&supply.average_rate), BigUint::from(5 * RAY / 100));
    assert_eq!(supply.last_updated, 10);
}

/// A second borrow at a different rate averages both rates by amount.
#[test]
fn stable_mint_second_borrow_reweights_rates() {
    let tester = RatesTester;
    let (position, supply) = tester.stable_debt_mint(
        &CTX,
        &empty_position(),
        &empty_supply(),
        &dec(100_000_000, 6),
        &ray_pct(4),
        10,
    );
    let (position, supply) = tester.stable_debt_mint(
        &CTX,
        &position,
        &supply,
        &dec(300_000_000, 6),
        &ray_pct(8),
        10,
    );

    // (100 * 0.04 + 300 * 0.08) / 400 = 0.07
    assert_eq!(raw(&position.rate), BigUint::from(7 * RAY / 100));
    assert_eq!(raw(&supply.average_rate), BigUint::from(7 * RAY / 100));
    assert_eq!(raw(&supply.principal), BigUint::from(400_000_000u64));
}

#[test]
fn stable_burn_partial_keeps_average() {
    let tester = RatesTester;
    let position = StableDebtPosition {
        principal: dec(100_000_000, 6),
        rate: ray_pct(5),
        last_updated: 10,
    };
    let supply = StableDebtSupply {
        principal: dec(300_000_000, 6),
        average_rate: ray_pct(5),
        last_updated: 10,
    };

    let (position, supply) = tester.stable_debt_burn(&CTX, &position, &supply, &dec(50_000_000, 6), 10);
    assert_eq!(raw(&position.principal), BigUint::from(50_000_000u64));
    assert_eq!(raw(&position.rate), BigUint::from(5 * RAY / 100));
    assert_eq!(position.last_updated, 10);
    assert_eq!(raw(&supply.principal), BigUint::from(250_000_000u64));
    assert_eq!(raw(&supply.average_rate), BigUint::from(5 * RAY / 100));
}

#[test]
fn stable_burn_full_balance_clears_user_rate() {
    let tester = RatesTester;
    let (position, supply) = tester.stable_debt_mint(
        &CTX,
        &empty_position(),
        &empty_supply(),
        &dec(100_000_000, 6),
        &ray_pct(5),
        10,
    );
    let (position, supply) = tester.stable_debt_burn(&CTX, &position, &supply, &dec(100_000_000, 6), 10);

    assert_eq!(raw(&position.principal), BigUint::zero());
    assert_eq!(raw(&position.rate), BigUint::zero());
    assert_eq!(position.last_updated, 0);
    assert_eq!(raw(&supply.principal), BigUint::zero());
    assert_eq!(raw(&supply.average_rate), BigUint::zero());
}

/// A burn whose rate-weight exceeds what the average still carries zeroes the supply.
#[test]
fn stable_burn_heavier_than_average_zeroes_supply() {
    let tester = RatesTester;
    let position = StableDebtPosition {
        principal: dec(60_000_000, 6),
        rate: ray_pct(10),
        last_updated: 10,
    };
    let supply = StableDebtSupply {
        principal: dec(100_000_000, 6),
        average_rate: ray_pct(5),
        last_updated: 10,
    };

    let (_, supply) = tester.stable_debt_burn(&CTX, &position, &supply, &dec(60_000_000, 6), 10);
    assert_eq!(raw(&supply.principal), BigUint::zero());
    assert_eq!(raw(&supply.average_rate), BigUint::zero());
}

#[test]
fn max_stable_loan_is_quarter_of_liquidity() {
    let tester = RatesTester;
    let cap = tester.max_stable_loan_size(&CTX, &dec(1_000_000_000, 6));
    assert_eq!(raw(&cap), BigUint::from(250_000_000u64));
}
