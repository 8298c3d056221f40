use common_structs::{InterestRateMode, ReserveConfigUpdate};
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

pub type Decimal = ManagedDecimal<StaticApi, NumDecimals>;

/// An amount argument: an explicit value at the asset's decimals, or "everything".
#[derive(Clone)]
pub enum Amount {
    Exact(Decimal),
    Max,
}

/// One state-changing call against the lending market, already typed and scaled.
#[derive(Clone)]
pub enum ProtocolCall {
    /// Credits test tokens to a wallet.
    Mint {
        user: String,
        asset: String,
        amount: Decimal,
    },
    /// Sets how much of a wallet the market may pull.
    Approve {
        user: String,
        asset: String,
        amount: Amount,
    },
    Deposit {
        user: String,
        asset: String,
        amount: Decimal,
    },
    Withdraw {
        user: String,
        asset: String,
        amount: Amount,
    },
    Borrow {
        user: String,
        asset: String,
        amount: Decimal,
        rate_mode: InterestRateMode,
    },
    /// `on_behalf_of` is the debtor; `user` pays.
    Repay {
        user: String,
        asset: String,
        amount: Amount,
        rate_mode: InterestRateMode,
        on_behalf_of: String,
    },
    SetUseAsCollateral {
        user: String,
        asset: String,
        enabled: bool,
    },
    /// `rate_mode` is the mode the debt is currently in.
    SwapBorrowRateMode {
        user: String,
        asset: String,
        rate_mode: InterestRateMode,
    },
    LiquidationCall {
        liquidator: String,
        collateral_asset: String,
        debt_asset: String,
        borrower: String,
        debt_to_cover: Amount,
        receive_a_token: bool,
    },
    SetReserveConfig {
        asset: String,
        update: ReserveConfigUpdate,
    },
    SetAssetPrice {
        asset: String,
        price: Decimal,
    },
    IncreaseTime {
        seconds: u64,
    },
}

impl ProtocolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolCall::Mint { .. } => "mint",
            ProtocolCall::Approve { .. } => "approve",
            ProtocolCall::Deposit { .. } => "deposit",
            ProtocolCall::Withdraw { .. } => "withdraw",
            ProtocolCall::Borrow { .. } => "borrow",
            ProtocolCall::Repay { .. } => "repay",
            ProtocolCall::SetUseAsCollateral { .. } => "setUseAsCollateral",
            ProtocolCall::SwapBorrowRateMode { .. } => "swapBorrowRateMode",
            ProtocolCall::LiquidationCall { .. } => "liquidationCall",
            ProtocolCall::SetReserveConfig { .. } => "setReserveConfig",
            ProtocolCall::SetAssetPrice { .. } => "setAssetPrice",
            ProtocolCall::IncreaseTime { .. } => "increaseTime",
        }
    }

    /// Account that signs the transaction, if any.
    pub fn actor(&self) -> Option<&str> {
        match self {
            ProtocolCall::Mint { user, .. }
            | ProtocolCall::Approve { user, .. }
            | ProtocolCall::Deposit { user, .. }
            | ProtocolCall::Withdraw { user, .. }
            | ProtocolCall::Borrow { user, .. }
            | ProtocolCall::Repay { user, .. }
            | ProtocolCall::SetUseAsCollateral { user, .. }
            | ProtocolCall::SwapBorrowRateMode { user, .. } => Some(user),
            ProtocolCall::LiquidationCall { liquidator, .. } => Some(liquidator),
            ProtocolCall::SetReserveConfig { .. }
            | ProtocolCall::SetAssetPrice { .. }
            | ProtocolCall::IncreaseTime { .. } => None,
        }
    }

    /// Reserve the call primarily acts on.
    pub fn asset(&self) -> Option<&str> {
        match self {
            ProtocolCall::Mint { asset, .. }
            | ProtocolCall::Approve { asset, .. }
            | ProtocolCall::Deposit { asset, .. }
            | ProtocolCall::Withdraw { asset, .. }
            | ProtocolCall::Borrow { asset, .. }
            | ProtocolCall::Repay { asset, .. }
            | ProtocolCall::SetUseAsCollateral { asset, .. }
            | ProtocolCall::SwapBorrowRateMode { asset, .. }
            | ProtocolCall::SetReserveConfig { asset, .. }
            | ProtocolCall::SetAssetPrice { asset, .. } => Some(asset),
            ProtocolCall::LiquidationCall { debt_asset, .. } => Some(debt_asset),
            ProtocolCall::IncreaseTime { .. } => None,
        }
    }
}
