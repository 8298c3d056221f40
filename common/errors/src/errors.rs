#![no_std]

use core::fmt;

pub static ERROR_INVALID_AMOUNT: &str = "Amount must be greater than 0.";

pub static ERROR_NO_ACTIVE_RESERVE: &str = "Action requires an active reserve.";

pub static ERROR_RESERVE_FROZEN: &str = "Action cannot be performed because the reserve is frozen.";

pub static ERROR_ASSET_NOT_SUPPORTED: &str = "Asset not supported.";

pub static ERROR_NOT_ENOUGH_AVAILABLE_USER_BALANCE: &str =
    "User cannot withdraw more than the available balance.";

pub static ERROR_TRANSFER_NOT_ALLOWED: &str = "Transfer cannot be allowed.";

pub static ERROR_INSUFFICIENT_LIQUIDITY: &str = "Not enough liquidity available in the reserve.";

pub static ERROR_INSUFFICIENT_ALLOWANCE: &str = "Transfer amount exceeds allowance.";

pub static ERROR_INSUFFICIENT_WALLET_BALANCE: &str = "Transfer amount exceeds wallet balance.";

pub static ERROR_COLLATERAL_BALANCE_IS_ZERO: &str = "The collateral balance is 0.";

pub static ERROR_HEALTH_FACTOR_LOWER_THAN_THRESHOLD: &str =
    "Health factor is lesser than the liquidation threshold.";

pub static ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW: &str =
    "There is not enough collateral to cover a new borrow.";

pub static ERROR_STABLE_BORROWING_NOT_ENABLED: &str = "Stable borrowing not enabled.";

pub static ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY: &str =
    "Collateral is (mostly) the same currency that is being borrowed.";

pub static ERROR_AMOUNT_BIGGER_THAN_MAX_LOAN_SIZE_STABLE: &str =
    "The requested amount is greater than the max loan size in stable rate mode.";

pub static ERROR_NO_DEBT_OF_SELECTED_TYPE: &str =
    "For repayment of stable debt, the user needs to have stable debt, otherwise, he needs to have variable debt.";

pub static ERROR_NO_EXPLICIT_AMOUNT_TO_REPAY_ON_BEHALF: &str =
    "To repay on behalf of a user an explicit amount to repay is needed.";

pub static ERROR_NO_STABLE_RATE_LOAN_IN_RESERVE: &str =
    "User does not have a stable rate loan in progress on this reserve.";

pub static ERROR_NO_VARIABLE_RATE_LOAN_IN_RESERVE: &str =
    "User does not have a variable rate loan in progress on this reserve.";

pub static ERROR_UNDERLYING_BALANCE_NOT_GREATER_THAN_ZERO: &str =
    "The underlying balance needs to be greater than 0.";

pub static ERROR_DEPOSIT_ALREADY_IN_USE: &str =
    "User deposit is already being used as collateral.";

pub static ERROR_HEALTH_FACTOR_NOT_BELOW_THRESHOLD: &str =
    "Health factor is not below the threshold.";

pub static ERROR_COLLATERAL_CANNOT_BE_LIQUIDATED: &str =
    "The collateral chosen cannot be liquidated.";

pub static ERROR_SPECIFIED_CURRENCY_NOT_BORROWED_BY_USER: &str =
    "User did not borrow the specified currency.";

pub static ERROR_NOT_ENOUGH_LIQUIDITY_TO_LIQUIDATE: &str =
    "There isn't enough liquidity available to liquidate.";

/// Class of a protocol-level rejection. Scenario files name the expected class
/// through its revert reason; environments report rejections the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureClass {
    InvalidAmount,
    NoActiveReserve,
    ReserveFrozen,
    AssetNotSupported,
    NotEnoughAvailableUserBalance,
    TransferNotAllowed,
    InsufficientLiquidity,
    InsufficientAllowance,
    InsufficientWalletBalance,
    CollateralBalanceIsZero,
    HealthFactorLowerThanThreshold,
    CollateralCannotCoverNewBorrow,
    StableBorrowingNotEnabled,
    CollateralSameAsBorrowingCurrency,
    AmountBiggerThanMaxLoanSizeStable,
    NoDebtOfSelectedType,
    NoExplicitAmountToRepayOnBehalf,
    NoStableRateLoanInReserve,
    NoVariableRateLoanInReserve,
    UnderlyingBalanceNotGreaterThanZero,
    DepositAlreadyInUse,
    HealthFactorNotBelowThreshold,
    CollateralCannotBeLiquidated,
    SpecifiedCurrencyNotBorrowedByUser,
    NotEnoughLiquidityToLiquidate,
}

impl FailureClass {
    pub const ALL: [FailureClass; 25] = [
        FailureClass::InvalidAmount,
        FailureClass::NoActiveReserve,
        FailureClass::ReserveFrozen,
        FailureClass::AssetNotSupported,
        FailureClass::NotEnoughAvailableUserBalance,
        FailureClass::TransferNotAllowed,
        FailureClass::InsufficientLiquidity,
        FailureClass::InsufficientAllowance,
        FailureClass::InsufficientWalletBalance,
        FailureClass::CollateralBalanceIsZero,
        FailureClass::HealthFactorLowerThanThreshold,
        FailureClass::CollateralCannotCoverNewBorrow,
        FailureClass::StableBorrowingNotEnabled,
        FailureClass::CollateralSameAsBorrowingCurrency,
        FailureClass::AmountBiggerThanMaxLoanSizeStable,
        FailureClass::NoDebtOfSelectedType,
        FailureClass::NoExplicitAmountToRepayOnBehalf,
        FailureClass::NoStableRateLoanInReserve,
        FailureClass::NoVariableRateLoanInReserve,
        FailureClass::UnderlyingBalanceNotGreaterThanZero,
        FailureClass::DepositAlreadyInUse,
        FailureClass::HealthFactorNotBelowThreshold,
        FailureClass::CollateralCannotBeLiquidated,
        FailureClass::SpecifiedCurrencyNotBorrowedByUser,
        FailureClass::NotEnoughLiquidityToLiquidate,
    ];

    pub fn reason(&self) -> &'static str {
        match self {
            FailureClass::InvalidAmount => ERROR_INVALID_AMOUNT,
            FailureClass::NoActiveReserve => ERROR_NO_ACTIVE_RESERVE,
            FailureClass::ReserveFrozen => ERROR_RESERVE_FROZEN,
            FailureClass::AssetNotSupported => ERROR_ASSET_NOT_SUPPORTED,
            FailureClass::NotEnoughAvailableUserBalance => ERROR_NOT_ENOUGH_AVAILABLE_USER_BALANCE,
            FailureClass::TransferNotAllowed => ERROR_TRANSFER_NOT_ALLOWED,
            FailureClass::InsufficientLiquidity => ERROR_INSUFFICIENT_LIQUIDITY,
            FailureClass::InsufficientAllowance => ERROR_INSUFFICIENT_ALLOWANCE,
            FailureClass::InsufficientWalletBalance => ERROR_INSUFFICIENT_WALLET_BALANCE,
            FailureClass::CollateralBalanceIsZero => ERROR_COLLATERAL_BALANCE_IS_ZERO,
            FailureClass::HealthFactorLowerThanThreshold => {
                ERROR_HEALTH_FACTOR_LOWER_THAN_THRESHOLD
            },
            FailureClass::CollateralCannotCoverNewBorrow => {
                ERROR_COLLATERAL_CANNOT_COVER_NEW_BORROW
            },
            FailureClass::StableBorrowingNotEnabled => ERROR_STABLE_BORROWING_NOT_ENABLED,
            FailureClass::CollateralSameAsBorrowingCurrency => {
                ERROR_COLLATERAL_SAME_AS_BORROWING_CURRENCY
            },
            FailureClass::AmountBiggerThanMaxLoanSizeStable => {
                ERROR_AMOUNT_BIGGER_THAN_MAX_LOAN_SIZE_STABLE
            },
            FailureClass::NoDebtOfSelectedType => ERROR_NO_DEBT_OF_SELECTED_TYPE,
            FailureClass::NoExplicitAmountToRepayOnBehalf => {
                ERROR_NO_EXPLICIT_AMOUNT_TO_REPAY_ON_BEHALF
            },
            FailureClass::NoStableRateLoanInReserve => ERROR_NO_STABLE_RATE_LOAN_IN_RESERVE,
            FailureClass::NoVariableRateLoanInReserve => ERROR_NO_VARIABLE_RATE_LOAN_IN_RESERVE,
            FailureClass::UnderlyingBalanceNotGreaterThanZero => {
                ERROR_UNDERLYING_BALANCE_NOT_GREATER_THAN_ZERO
            },
            FailureClass::DepositAlreadyInUse => ERROR_DEPOSIT_ALREADY_IN_USE,
            FailureClass::HealthFactorNotBelowThreshold => ERROR_HEALTH_FACTOR_NOT_BELOW_THRESHOLD,
            FailureClass::CollateralCannotBeLiquidated => ERROR_COLLATERAL_CANNOT_BE_LIQUIDATED,
            FailureClass::SpecifiedCurrencyNotBorrowedByUser => {
                ERROR_SPECIFIED_CURRENCY_NOT_BORROWED_BY_USER
            },
            FailureClass::NotEnoughLiquidityToLiquidate => ERROR_NOT_ENOUGH_LIQUIDITY_TO_LIQUIDATE,
        }
    }

    /// Maps a revert reason back to its class. Surrounding whitespace is ignored.
    pub fn from_reason(reason: &str) -> Option<FailureClass> {
        let reason = reason.trim();
        FailureClass::ALL
            .iter()
            .copied()
            .find(|class| class.reason() == reason)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}
