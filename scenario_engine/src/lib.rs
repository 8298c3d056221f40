//! Scenario-driven verification of a fixed-point lending market.
//!
//! Scenario files describe stories of protocol calls. Each call is submitted
//! to an [`Environment`](common_proxies::Environment), and the state observed
//! afterwards is compared field by field with what the
//! [`CalculationOracle`](oracle::CalculationOracle) computes independently.

pub mod actions;
pub mod config;
pub mod definitions;
pub mod errors;
pub mod loader;
pub mod oracle;
pub mod retry;
pub mod runner;
pub mod story;

pub use config::RunConfiguration;
pub use runner::{RunReport, ScenarioRunner};
