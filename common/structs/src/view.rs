use std::collections::BTreeMap;
use std::fmt;

use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

use crate::{format_decimal, raw_digits, AccountState, ReserveState, StateSnapshot, UserState};

/// A single observable value, compared without tolerance.
pub enum FieldValue<'a, M: ManagedTypeApi> {
    Decimal(&'a ManagedDecimal<M, NumDecimals>),
    Integer(u64),
    Flag(bool),
}

impl<M: ManagedTypeApi> FieldValue<'_, M> {
    /// Same scale and same raw integer; `1.0` at scale 6 differs from `1.0` at scale 18.
    pub fn same_as(&self, other: &FieldValue<'_, M>) -> bool {
        match (self, other) {
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => {
                a.scale() == b.scale() && a.into_raw_units() == b.into_raw_units()
            },
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Flag(a), FieldValue::Flag(b)) => a == b,
            _ => false,
        }
    }

    /// Raw integer form, as used by explicit state pins.
    pub fn raw(&self) -> String {
        match self {
            FieldValue::Decimal(value) => raw_digits(value.into_raw_units()),
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Flag(value) => value.to_string(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            FieldValue::Decimal(value) => format!("{} (scale {})", format_decimal(value), value.scale()),
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Flag(value) => value.to_string(),
        }
    }
}

/// Named, ordered list of everything a state type exposes for comparison.
pub trait Fields<M: ManagedTypeApi> {
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_, M>)>;

    fn field(&self, name: &str) -> Option<FieldValue<'_, M>> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

impl<M: ManagedTypeApi> Fields<M> for ReserveState<M> {
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_, M>)> {
        vec![
            ("decimals", FieldValue::Integer(self.decimals as u64)),
            ("availableLiquidity", FieldValue::Decimal(&self.available_liquidity)),
            ("totalStableDebt", FieldValue::Decimal(&self.total_stable_debt)),
            ("totalVariableDebt", FieldValue::Decimal(&self.total_variable_debt)),
            ("totalLiquidity", FieldValue::Decimal(&self.total_liquidity)),
            ("principalStableDebt", FieldValue::Decimal(&self.principal_stable_debt)),
            ("scaledVariableDebt", FieldValue::Decimal(&self.scaled_variable_debt)),
            ("averageStableBorrowRate", FieldValue::Decimal(&self.average_stable_borrow_rate)),
            ("utilizationRate", FieldValue::Decimal(&self.utilization_rate)),
            ("liquidityRate", FieldValue::Decimal(&self.liquidity_rate)),
            ("variableBorrowRate", FieldValue::Decimal(&self.variable_borrow_rate)),
            ("stableBorrowRate", FieldValue::Decimal(&self.stable_borrow_rate)),
            ("liquidityIndex", FieldValue::Decimal(&self.liquidity_index)),
            ("variableBorrowIndex", FieldValue::Decimal(&self.variable_borrow_index)),
            ("lastUpdateTimestamp", FieldValue::Integer(self.last_update_timestamp)),
            ("totalStableDebtLastUpdated", FieldValue::Integer(self.total_stable_debt_timestamp)),
            ("price", FieldValue::Decimal(&self.price)),
            ("ltv", FieldValue::Decimal(&self.ltv)),
            ("liquidationThreshold", FieldValue::Decimal(&self.liquidation_threshold)),
            ("liquidationBonus", FieldValue::Decimal(&self.liquidation_bonus)),
            ("reserveFactor", FieldValue::Decimal(&self.reserve_factor)),
            ("isActive", FieldValue::Flag(self.is_active)),
            ("isFrozen", FieldValue::Flag(self.is_frozen)),
            ("stableBorrowRateEnabled", FieldValue::Flag(self.stable_borrow_rate_enabled)),
        ]
    }
}

impl<M: ManagedTypeApi> Fields<M> for UserState<M> {
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_, M>)> {
        vec![
            ("scaledATokenBalance", FieldValue::Decimal(&self.scaled_a_token_balance)),
            ("currentATokenBalance", FieldValue::Decimal(&self.current_a_token_balance)),
            ("principalStableDebt", FieldValue::Decimal(&self.principal_stable_debt)),
            ("currentStableDebt", FieldValue::Decimal(&self.current_stable_debt)),
            ("scaledVariableDebt", FieldValue::Decimal(&self.scaled_variable_debt)),
            ("currentVariableDebt", FieldValue::Decimal(&self.current_variable_debt)),
            ("stableBorrowRate", FieldValue::Decimal(&self.stable_borrow_rate)),
            ("stableRateLastUpdated", FieldValue::Integer(self.stable_rate_last_updated)),
            ("usageAsCollateralEnabled", FieldValue::Flag(self.usage_as_collateral_enabled)),
            ("walletBalance", FieldValue::Decimal(&self.wallet_balance)),
            ("allowance", FieldValue::Decimal(&self.allowance)),
        ]
    }
}

impl<M: ManagedTypeApi> Fields<M> for AccountState<M> {
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_, M>)> {
        vec![
            ("totalCollateralBase", FieldValue::Decimal(&self.total_collateral_base)),
            ("totalDebtBase", FieldValue::Decimal(&self.total_debt_base)),
            ("availableBorrowsBase", FieldValue::Decimal(&self.available_borrows_base)),
            ("ltv", FieldValue::Decimal(&self.ltv)),
            ("currentLiquidationThreshold", FieldValue::Decimal(&self.current_liquidation_threshold)),
            ("healthFactor", FieldValue::Decimal(&self.health_factor)),
        ]
    }
}

/// First field, in declaration order, where `actual` differs from `expected`.
pub fn first_mismatch<M: ManagedTypeApi, T: Fields<M>>(
    scope: &str,
    expected: &T,
    actual: &T,
) -> Option<FieldMismatch> {
    let actual_fields = actual.fields();
    for ((name, expected_value), (_, actual_value)) in expected.fields().into_iter().zip(actual_fields.iter()) {
        if !expected_value.same_as(actual_value) {
            return Some(FieldMismatch {
                field: format!("{scope}.{name}"),
                expected: expected_value.render(),
                actual: actual_value.render(),
            });
        }
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, actual {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Reserve, position and account states observed at one instant.
///
/// Views are built fresh for every observation. Positions are keyed by
/// `(asset, user)`; every listed user also gets an account entry.
#[derive(Clone)]
pub struct MarketView<M: ManagedTypeApi> {
    pub timestamp: u64,
    pub reserves: BTreeMap<String, ReserveState<M>>,
    pub positions: BTreeMap<(String, String), UserState<M>>,
    pub accounts: BTreeMap<String, AccountState<M>>,
}

impl<M: ManagedTypeApi> MarketView<M> {
    pub fn new(timestamp: u64) -> Self {
        MarketView {
            timestamp,
            reserves: BTreeMap::new(),
            positions: BTreeMap::new(),
            accounts: BTreeMap::new(),
        }
    }

    pub fn insert_snapshot(&mut self, asset: &str, user: &str, snapshot: StateSnapshot<M>) {
        self.reserves.insert(asset.to_string(), snapshot.reserve);
        self.positions
            .insert((asset.to_string(), user.to_string()), snapshot.user);
    }

    pub fn reserve(&self, asset: &str) -> Option<&ReserveState<M>> {
        self.reserves.get(asset)
    }

    pub fn position(&self, asset: &str, user: &str) -> Option<&UserState<M>> {
        self.positions.get(&(asset.to_string(), user.to_string()))
    }

    pub fn account(&self, user: &str) -> Option<&AccountState<M>> {
        self.accounts.get(user)
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.reserves.keys().map(String::as_str)
    }

    /// Positions of `user`, in asset order.
    pub fn positions_of<'a>(
        &'a self,
        user: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a UserState<M>)> + 'a {
        self.positions
            .iter()
            .filter(move |((_, owner), _)| owner == user)
            .map(|((asset, _), position)| (asset.as_str(), position))
    }

    /// Walks every entry of `expected` and reports the first one `actual`
    /// disagrees on, then any entry only `actual` has.
    pub fn compare(expected: &Self, actual: &Self) -> Option<FieldMismatch> {
        if expected.timestamp != actual.timestamp {
            return Some(FieldMismatch {
                field: "view.timestamp".to_string(),
                expected: expected.timestamp.to_string(),
                actual: actual.timestamp.to_string(),
            });
        }

        for (asset, reserve) in &expected.reserves {
            let scope = format!("reserve[{asset}]");
            match actual.reserves.get(asset) {
                Some(observed) => {
                    if let Some(mismatch) = first_mismatch(&scope, reserve, observed) {
                        return Some(mismatch);
                    }
                },
                None => return Some(missing(scope)),
            }
        }

        for ((asset, user), position) in &expected.positions {
            let scope = format!("user[{asset}/{user}]");
            match actual.positions.get(&(asset.clone(), user.clone())) {
                Some(observed) => {
                    if let Some(mismatch) = first_mismatch(&scope, position, observed) {
                        return Some(mismatch);
                    }
                },
                None => return Some(missing(scope)),
            }
        }

        for (user, account) in &expected.accounts {
            let scope = format!("account[{user}]");
            match actual.accounts.get(user) {
                Some(observed) => {
                    if let Some(mismatch) = first_mismatch(&scope, account, observed) {
                        return Some(mismatch);
                    }
                },
                None => return Some(missing(scope)),
            }
        }

        if let Some(asset) = actual.reserves.keys().find(|asset| !expected.reserves.contains_key(*asset)) {
            return Some(unexpected(format!("reserve[{asset}]")));
        }
        if let Some((asset, user)) = actual.positions.keys().find(|key| !expected.positions.contains_key(*key)) {
            return Some(unexpected(format!("user[{asset}/{user}]")));
        }
        if let Some(user) = actual.accounts.keys().find(|user| !expected.accounts.contains_key(*user)) {
            return Some(unexpected(format!("account[{user}]")));
        }

        None
    }

    /// Resolves `"reserve.<field>"`, `"user.<field>"` or `"account.<field>"`
    /// against the given asset and user.
    pub fn pinned_field(&self, asset: &str, user: &str, path: &str) -> Option<FieldValue<'_, M>> {
        let (scope, name) = path.split_once('.')?;
        match scope {
            "reserve" => self.reserve(asset)?.field(name),
            "user" => self.position(asset, user)?.field(name),
            "account" => self.account(user)?.field(name),
            _ => None,
        }
    }
}

fn missing(scope: String) -> FieldMismatch {
    FieldMismatch {
        field: scope,
        expected: "present".to_string(),
        actual: "missing".to_string(),
    }
}

fn unexpected(scope: String) -> FieldMismatch {
    FieldMismatch {
        field: scope,
        expected: "missing".to_string(),
        actual: "present".to_string(),
    }
}
