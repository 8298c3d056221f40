use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use common_math::NumericContext;
use common_proxies::{Environment, EnvironmentFault, ProtocolCall, Receipt, SnapshotId};
use common_structs::{parse_decimal, AccountState, StateSnapshot};
use market_sim::SimulatedMarket;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;
use scenario_engine::{
    definitions::{ResolvedScenario, Scenario},
    loader::{EmbeddedSource, ScenarioSource},
    RunConfiguration, RunReport, ScenarioRunner,
};

pub const USDC: &str = "USDC";
pub const WETH: &str = "WETH";

/// Reserve listing shared by every test; top-level switches are left to defaults.
pub const CONFIG: &str = r#"
[numeric]
precision = 27
rounding = "down"

[reserves.USDC]
decimals = 6
price = "0.0005"
ltv_bps = 8000
liquidation_threshold_bps = 8500
liquidation_bonus_bps = 10500
reserve_factor_bps = 1000
base_variable_borrow_rate = "0"
variable_rate_slope1 = "0.04"
variable_rate_slope2 = "0.6"
mid_utilization = "0.8"
optimal_utilization = "0.9"
max_borrow_rate = "2"
base_stable_borrow_rate = "0.02"
stable_rate_slope1 = "0.06"
stable_rate_slope2 = "0.6"

[reserves.WETH]
decimals = 18
price = "1"
ltv_bps = 8000
liquidation_threshold_bps = 8500
liquidation_bonus_bps = 10500
reserve_factor_bps = 1000
base_variable_borrow_rate = "0"
variable_rate_slope1 = "0.08"
variable_rate_slope2 = "1"
mid_utilization = "0.65"
optimal_utilization = "0.8"
max_borrow_rate = "3"
base_stable_borrow_rate = "0.03"
stable_rate_slope1 = "0.1"
stable_rate_slope2 = "1"
"#;

/// Deposit 1000 USDC and borrow 500 USDC against it.
pub const DEPOSIT_AND_BORROW: &str = r#"{
  "title": "USDC deposit and borrow",
  "stories": [
    {
      "description": "user deposits 1000 USDC, then borrows 500 at variable rate",
      "actions": [
        { "name": "mint", "args": { "reserve": "USDC", "amount": "1000", "user": "alice" } },
        { "name": "approve", "args": { "reserve": "USDC", "user": "alice" } },
        {
          "name": "deposit",
          "args": { "reserve": "USDC", "amount": "1000", "user": "alice" },
          "expectedState": { "user.scaledATokenBalance": "1000000000" }
        },
        {
          "name": "borrow",
          "args": { "reserve": "USDC", "amount": "500", "borrowRateMode": "variable", "user": "alice" },
          "expectedState": {
            "user.scaledVariableDebt": "500000000",
            "reserve.utilizationRate": "500000000000000000000000000"
          }
        }
      ]
    }
  ]
}"#;

pub fn config() -> RunConfiguration {
    RunConfiguration::from_toml(CONFIG).unwrap()
}

pub fn config_with(extra: &str) -> RunConfiguration {
    RunConfiguration::from_toml(&format!("{extra}\n{CONFIG}")).unwrap()
}

pub fn amount(asset: &str, text: &str) -> ManagedDecimal<StaticApi, NumDecimals> {
    let decimals = config().decimals(asset).unwrap();
    parse_decimal(text, decimals).unwrap()
}

pub fn assets() -> Vec<String> {
    vec![USDC.to_string(), WETH.to_string()]
}

pub fn market(config: &RunConfiguration) -> SimulatedMarket {
    SimulatedMarket::new(&config.reserves).unwrap()
}

pub fn resolve(json: &str) -> ResolvedScenario {
    Scenario::from_json("inline.json", json)
        .unwrap()
        .resolve(&config())
        .unwrap()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Runs the given files, in id order, each against a fresh simulated market.
pub async fn run_files(config: RunConfiguration, files: &[(&str, &str)]) -> RunReport {
    init_logging();
    let mut source = EmbeddedSource::new();
    for (id, json) in files {
        source = source.with(*id, *json);
    }
    let loaded = source.load(&Default::default()).unwrap();
    assert!(loaded.failures.is_empty(), "fixture scenarios must parse");

    let runner = ScenarioRunner::new(config).unwrap();
    runner
        .run(&loaded.registry, |config| Ok(market(config)))
        .await
}

pub async fn run_one(json: &str) -> RunReport {
    run_files(config(), &[("inline.json", json)]).await
}

/// Every call submitted to a [`RecordingEnvironment`], with the numeric
/// context that was the process default at the time.
pub type CallLog = Rc<RefCell<Vec<(String, NumericContext)>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn call_names(log: &CallLog) -> Vec<String> {
    log.borrow().iter().map(|(name, _)| name.clone()).collect()
}

/// A simulated market behind a wrapper that records submitted calls and can
/// misbehave on demand.
pub struct RecordingEnvironment {
    pub inner: SimulatedMarket,
    pub log: CallLog,
    /// Once this many calls went through, queries report one raw unit more
    /// liquidity than the market holds.
    pub tamper_after: Option<usize>,
    /// The call at this 1-based position fails transiently, once, without
    /// reaching the market.
    pub fail_once_at: Option<usize>,
}

impl RecordingEnvironment {
    pub fn new(inner: SimulatedMarket, log: &CallLog) -> Self {
        RecordingEnvironment {
            inner,
            log: log.clone(),
            tamper_after: None,
            fail_once_at: None,
        }
    }

    pub fn tampering_after(mut self, calls: usize) -> Self {
        self.tamper_after = Some(calls);
        self
    }

    pub fn failing_once_at(mut self, call: usize) -> Self {
        self.fail_once_at = Some(call);
        self
    }
}

#[async_trait(?Send)]
impl Environment for RecordingEnvironment {
    async fn perform_action(&mut self, call: &ProtocolCall) -> Result<Receipt, EnvironmentFault> {
        let position = self.log.borrow().len() + 1;
        if self.fail_once_at == Some(position) {
            self.fail_once_at = None;
            return Err(EnvironmentFault::Transient {
                reason: "gateway timeout".to_string(),
            });
        }

        self.log
            .borrow_mut()
            .push((call.name().to_string(), NumericContext::current()));
        self.inner.perform_action(call).await
    }

    async fn query_state(
        &mut self,
        asset: &str,
        user: &str,
    ) -> Result<StateSnapshot<StaticApi>, EnvironmentFault> {
        let mut snapshot = self.inner.query_state(asset, user).await?;
        if self.tamper_after.is_some_and(|calls| self.log.borrow().len() >= calls) {
            let liquidity = &snapshot.reserve.available_liquidity;
            snapshot.reserve.available_liquidity = ManagedDecimal::from_raw_units(
                liquidity.into_raw_units() + &BigUint::<StaticApi>::from(1u64),
                liquidity.scale(),
            );
        }
        Ok(snapshot)
    }

    async fn query_account(&mut self, user: &str) -> Result<AccountState<StaticApi>, EnvironmentFault> {
        self.inner.query_account(user).await
    }

    async fn current_timestamp(&mut self) -> Result<u64, EnvironmentFault> {
        self.inner.current_timestamp().await
    }

    async fn advance_time(&mut self, seconds: u64) -> Result<u64, EnvironmentFault> {
        self.inner.advance_time(seconds).await
    }

    async fn snapshot(&mut self) -> Result<SnapshotId, EnvironmentFault> {
        self.inner.snapshot().await
    }

    async fn revert_to(&mut self, id: SnapshotId) -> Result<(), EnvironmentFault> {
        self.inner.revert_to(id).await
    }

    async fn release_snapshot(&mut self, id: SnapshotId) -> Result<(), EnvironmentFault> {
        self.inner.release_snapshot(id).await
    }
}
