use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use common_math::{NumericContext, SharedMathModule};
use common_proxies::EnvironmentFault;
use common_rates::{AccountMath, InterestRates};
use common_structs::{DecimalParseError, MarketParams, ReserveParams};
use multiversx_sc::contract_base::ContractBase;
use multiversx_sc_scenario::api::StaticApi;

/// Fails the current call with a protocol revert message.
macro_rules! require {
    ($condition:expr, $reason:expr) => {
        if !$condition {
            return Err(common_proxies::EnvironmentFault::Reverted {
                reason: $reason.to_string(),
            });
        }
    };
}

pub mod cache;
mod environment;
pub mod positions;
pub mod storage;
pub mod validation;
pub mod view;

pub use storage::MarketStorage;

/// Block timestamp of a freshly created market.
pub const GENESIS_TIMESTAMP: u64 = 1_600_000_000;

/// In-memory lending market with integer arithmetic, driven through
/// [`common_proxies::Environment`].
///
/// Every call mines a block one second after the previous one, reverted calls
/// included. Snapshots capture the whole storage, block clock included;
/// reverting to one consumes it along with every snapshot taken after it.
pub struct SimulatedMarket {
    pub(crate) ctx: NumericContext,
    params: BTreeMap<String, MarketParams<StaticApi>>,
    pub(crate) storage: RefCell<MarketStorage>,
    snapshots: BTreeMap<u64, MarketStorage>,
    next_snapshot: u64,
    pending_transient_faults: Cell<u32>,
}

impl ContractBase for SimulatedMarket {
    type Api = StaticApi;
}

impl SharedMathModule for SimulatedMarket {}
impl InterestRates for SimulatedMarket {}
impl AccountMath for SimulatedMarket {}

impl SimulatedMarket {
    /// Lists every configured reserve, empty, at [`GENESIS_TIMESTAMP`].
    pub fn new(reserves: &BTreeMap<String, ReserveParams>) -> Result<Self, DecimalParseError> {
        let mut params = BTreeMap::new();
        let mut states = BTreeMap::new();
        for (asset, reserve) in reserves {
            params.insert(asset.clone(), reserve.market_params::<StaticApi>()?);
            states.insert(asset.clone(), reserve.initial_state::<StaticApi>(GENESIS_TIMESTAMP)?);
        }

        log::debug!("simulated market listing {} reserves", states.len());

        Ok(SimulatedMarket {
            ctx: NumericContext::PROTOCOL,
            params,
            storage: RefCell::new(MarketStorage {
                block_timestamp: GENESIS_TIMESTAMP,
                reserves: states,
                positions: BTreeMap::new(),
            }),
            snapshots: BTreeMap::new(),
            next_snapshot: 0,
            pending_transient_faults: Cell::new(0),
        })
    }

    /// Makes the next `count` calls fail before reaching the market, as a
    /// dropped connection would.
    pub fn inject_transient_faults(&self, count: u32) {
        self.pending_transient_faults.set(count);
    }

    pub(crate) fn market_params(
        &self,
        asset: &str,
    ) -> Result<MarketParams<StaticApi>, EnvironmentFault> {
        self.params
            .get(asset)
            .cloned()
            .ok_or_else(|| EnvironmentFault::Reverted {
                reason: common_errors::ERROR_ASSET_NOT_SUPPORTED.to_string(),
            })
    }

    fn take_transient_fault(&self) -> Result<(), EnvironmentFault> {
        let pending = self.pending_transient_faults.get();
        if pending == 0 {
            return Ok(());
        }

        self.pending_transient_faults.set(pending - 1);
        log::warn!("injected transient fault, {} left", pending - 1);
        Err(EnvironmentFault::Transient {
            reason: "connection reset by peer".to_string(),
        })
    }

    fn take_snapshot(&mut self) -> u64 {
        let id = self.next_snapshot;
        self.next_snapshot += 1;
        self.snapshots.insert(id, self.storage.borrow().clone());
        id
    }

    fn restore_snapshot(&mut self, id: u64) -> bool {
        if !self.snapshots.contains_key(&id) {
            return false;
        }

        let mut consumed = self.snapshots.split_off(&id);
        if let Some(saved) = consumed.remove(&id) {
            *self.storage.borrow_mut() = saved;
        }
        true
    }

    fn discard_snapshot(&mut self, id: u64) {
        if self.snapshots.remove(&id).is_none() {
            log::debug!("snapshot {id} already gone");
        }
    }

    /// Snapshots still held, neither reverted to nor released.
    pub fn retained_snapshots(&self) -> usize {
        self.snapshots.len()
    }
}
