#![no_std]

pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Every transaction is mined in a new block, one second after the previous one.
pub const BLOCK_TIME_SECONDS: u64 = 1;

/// Longest single `increaseTime` jump a scenario may ask for.
pub const MAX_TIME_JUMP_SECONDS: u64 = 100 * SECONDS_PER_YEAR;

pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;
pub const HALF_RAY: u128 = 500_000_000_000_000_000_000_000_000;
pub const RAY_PRECISION: usize = 27;

/// Base-currency unit used for prices and account values.
pub const WAD: u128 = 1_000_000_000_000_000_000;
pub const WAD_PRECISION: usize = 18;

pub const BPS: u64 = 10_000; // 100%
pub const BPS_PRECISION: usize = 4;

/// Health factor under which a position becomes liquidatable (1.0 in WAD).
pub const HEALTH_FACTOR_LIQUIDATION_THRESHOLD: u128 = WAD;

/// Share of the debt a single liquidation may cover (50%).
pub const LIQUIDATION_CLOSE_FACTOR_BPS: u64 = 5_000;

/// Share of the available liquidity a single stable-rate loan may take (25%).
pub const MAX_STABLE_RATE_BORROW_SIZE_BPS: u64 = 2_500;

/// Precision of the process-wide numeric default, restored after every scenario file.
pub const DEFAULT_DECIMAL_PLACES: usize = 20;

/// Upper bound on attempts for a story hit by transient environment faults.
pub const MAX_STORY_ATTEMPTS: u32 = 4;

/// Amount literal meaning "the whole balance or debt".
pub const MAX_AMOUNT_LITERAL: &str = "-1";
