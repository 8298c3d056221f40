use std::collections::BTreeSet;
use std::path::PathBuf;

use common_errors::FailureClass;
use common_math::{NumericContext, Rounding};
use common_proxies::{Amount, ProtocolCall};
use scenario_engine::{
    definitions::{Expectation, Scenario},
    errors::{ConfigError, DefinitionError, LoadError},
    loader::{DirectorySource, EmbeddedSource, ScenarioSource},
    runner::parse_selection,
    RunConfiguration,
};

pub mod setup;
use setup::*;

const EMPTY: &str = r#"{ "title": "empty", "stories": [] }"#;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scenario-loader-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn single_action(action: &str) -> String {
    format!(r#"{{ "title": "one", "stories": [ {{ "description": "s", "actions": [ {action} ] }} ] }}"#)
}

/// Covers:
/// - only `*.json` files are picked up
/// - ids are file names, in sorted order
#[test]
fn directory_source_loads_json_files_in_name_order() {
    let dir = scratch_dir("sorted");
    std::fs::write(dir.join("b-borrow.json"), EMPTY).unwrap();
    std::fs::write(dir.join("a-deposit.json"), EMPTY).unwrap();
    std::fs::write(dir.join("notes.txt"), "not a scenario").unwrap();

    let report = DirectorySource::new(&dir).load(&BTreeSet::new()).unwrap();

    let ids: Vec<&str> = report.registry.ids().collect();
    assert_eq!(ids, vec!["a-deposit.json", "b-borrow.json"]);
    assert!(report.failures.is_empty());
}

#[test]
fn directory_source_missing_directory_fails() {
    let dir = std::env::temp_dir().join(format!("scenario-loader-{}-absent", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let error = DirectorySource::new(&dir).load(&BTreeSet::new()).unwrap_err();
    assert!(matches!(error, LoadError::UnreadableDirectory { .. }));
}

/// One broken file does not keep the others from loading.
#[test]
fn malformed_file_is_reported_and_others_load() {
    let source = EmbeddedSource::new()
        .with("broken.json", "{ \"title\": ")
        .with("fine.json", EMPTY);

    let report = source.load(&BTreeSet::new()).unwrap();

    assert_eq!(report.registry.len(), 1);
    assert!(report.registry.get("fine.json").is_some());
    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        DefinitionError::Malformed { source_id, .. } => assert_eq!(source_id, "broken.json"),
        other => panic!("unexpected failure {other}"),
    }
}

#[test]
fn selection_matches_id_or_stem() {
    let source = EmbeddedSource::new()
        .with("deposit.json", EMPTY)
        .with("borrow.json", EMPTY)
        .with("liquidation.json", EMPTY);

    let report = source.load(&parse_selection("deposit, liquidation.json,")).unwrap();

    let ids: Vec<&str> = report.registry.ids().collect();
    assert_eq!(ids, vec!["deposit.json", "liquidation.json"]);
}

/// Covers:
/// - amounts are scaled to the reserve's decimals
/// - `-1` means the whole balance
/// - participants include the debtor of a repay on behalf
#[test]
fn resolve_types_arguments_and_collects_participants() {
    let json = r#"{
      "title": "typed",
      "stories": [{
        "description": "s",
        "actions": [
          { "name": "deposit", "args": { "reserve": "USDC", "amount": "1.5", "user": "alice" } },
          { "name": "withdraw", "args": { "reserve": "USDC", "amount": "-1", "user": "alice" } },
          { "name": "repay", "args": { "reserve": "WETH", "amount": "2", "borrowRateMode": "stable", "user": "carol", "onBehalfOf": "bob" } },
          { "name": "increaseTime", "args": { "seconds": 3600 } }
        ]
      }]
    }"#;

    let scenario = resolve(json);
    let actions = &scenario.stories[0].actions;

    assert_eq!(actions[0].index, 1);
    match &actions[0].call {
        ProtocolCall::Deposit { amount, .. } => {
            assert_eq!(amount.scale(), 6);
            assert_eq!(amount.into_raw_units().to_u64(), Some(1_500_000));
        },
        _ => panic!("expected a deposit"),
    }
    assert!(matches!(
        &actions[1].call,
        ProtocolCall::Withdraw { amount: Amount::Max, .. }
    ));
    assert!(matches!(actions[3].call, ProtocolCall::IncreaseTime { seconds: 3600 }));

    let participants: Vec<&str> = scenario.participants.iter().map(String::as_str).collect();
    assert_eq!(participants, vec!["alice", "bob", "carol"]);
}

#[test]
fn resolve_accepts_revert_message_or_class_name() {
    let by_message = single_action(
        r#"{ "name": "deposit", "args": { "reserve": "USDC", "amount": "0", "user": "alice" }, "expected": "revert", "revertMessage": "Amount must be greater than 0." }"#,
    );
    let by_name = single_action(
        r#"{ "name": "deposit", "args": { "reserve": "USDC", "amount": "0", "user": "alice" }, "expected": "revert", "revertMessage": "InvalidAmount" }"#,
    );
    let open = single_action(
        r#"{ "name": "deposit", "args": { "reserve": "USDC", "amount": "0", "user": "alice" }, "expected": "revert" }"#,
    );

    for json in [by_message, by_name] {
        let scenario = resolve(&json);
        assert_eq!(
            scenario.stories[0].actions[0].expectation,
            Expectation::Revert(Some(FailureClass::InvalidAmount))
        );
    }
    assert_eq!(resolve(&open).stories[0].actions[0].expectation, Expectation::Revert(None));
}

#[test]
fn resolve_unknown_reserve_is_definition_error() {
    let json = single_action(r#"{ "name": "deposit", "args": { "reserve": "DAI", "amount": "1", "user": "alice" } }"#);

    let error = Scenario::from_json("dai.json", &json)
        .unwrap()
        .resolve(&config())
        .err()
        .unwrap();
    match error {
        DefinitionError::InvalidAction { story, action, name, reason } => {
            assert_eq!((story, action), (1, 1));
            assert_eq!(name, "deposit");
            assert!(reason.contains("DAI"));
        },
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn resolve_unknown_action_is_definition_error() {
    let json = single_action(r#"{ "name": "flashLoan", "args": {} }"#);

    let result = Scenario::from_json("flash.json", &json).unwrap().resolve(&config());
    assert!(matches!(result, Err(DefinitionError::InvalidAction { .. })));
}

/// Covers:
/// - a jump that would wrap the block clock is refused at resolution
/// - a century is still accepted
#[test]
fn resolve_oversized_time_jump_is_definition_error() {
    let json = single_action(r#"{ "name": "increaseTime", "args": { "seconds": 18446744073709551615 } }"#);
    let error = Scenario::from_json("forever.json", &json)
        .unwrap()
        .resolve(&config())
        .err()
        .unwrap();
    match error {
        DefinitionError::InvalidAction { name, reason, .. } => {
            assert_eq!(name, "increaseTime");
            assert!(reason.contains("18446744073709551615"), "{reason}");
        },
        other => panic!("unexpected error {other}"),
    }

    let json = single_action(r#"{ "name": "increaseTime", "args": { "seconds": 3153600000 } }"#);
    let scenario = Scenario::from_json("century.json", &json).unwrap().resolve(&config()).unwrap();
    assert!(matches!(
        scenario.stories[0].actions[0].call,
        ProtocolCall::IncreaseTime { seconds: 3_153_600_000 }
    ));
}

#[test]
fn resolve_pin_without_subject_is_definition_error() {
    let json = single_action(r#"{ "name": "increaseTime", "args": { "seconds": 10 }, "expectedState": { "user.walletBalance": "0" } }"#);

    let result = Scenario::from_json("pin.json", &json).unwrap().resolve(&config());
    assert!(matches!(result, Err(DefinitionError::InvalidAction { .. })));
}

/// Covers:
/// - omitted switches fall back to the protocol context and four attempts
/// - a zero attempt bound is rejected
#[test]
fn configuration_defaults_and_validation() {
    let config = config();
    assert!(!config.skip_integrity_check);
    assert_eq!(config.max_attempts, 4);
    assert_eq!(config.numeric.rounding, Rounding::Down);
    assert_eq!(config.decimals(USDC), Some(6));
    assert_eq!(config.decimals(WETH), Some(18));

    let listing_only = CONFIG.replace("[numeric]\nprecision = 27\nrounding = \"down\"\n", "");
    let defaulted = RunConfiguration::from_toml(&listing_only).unwrap();
    assert_eq!(defaulted.numeric, NumericContext::PROTOCOL);

    let error = RunConfiguration::from_toml(&format!("max_attempts = 0\n{CONFIG}")).unwrap_err();
    assert!(matches!(error, ConfigError::NoAttempts));
}

/// Covers:
/// - half-up rounding is refused before any scenario runs
/// - a scale other than the protocol's is refused too
#[test]
fn configuration_numeric_context_must_match_protocol() {
    let numeric = "[numeric]\nprecision = 27\nrounding = \"down\"\n";

    let half_up = CONFIG.replace(numeric, "[numeric]\nprecision = 27\nrounding = \"half_up\"\n");
    let error = RunConfiguration::from_toml(&half_up).unwrap_err();
    match error {
        ConfigError::NumericContextMismatch { expected, found } => {
            assert_eq!(expected, NumericContext::PROTOCOL);
            assert_eq!(found.rounding, Rounding::HalfUp);
        },
        other => panic!("expected a numeric context error, got {other:?}"),
    }

    let coarse = CONFIG.replace(numeric, "[numeric]\nprecision = 2\nrounding = \"down\"\n");
    let error = RunConfiguration::from_toml(&coarse).unwrap_err();
    assert!(matches!(
        error,
        ConfigError::NumericContextMismatch { found: NumericContext { precision: 2, .. }, .. }
    ));
}

#[test]
fn configuration_with_bad_price_is_rejected() {
    let broken = CONFIG.replacen("price = \"0.0005\"", "price = \"cheap\"", 1);

    let error = RunConfiguration::from_toml(&broken).unwrap_err();
    assert!(matches!(error, ConfigError::InvalidReserve { .. }));
}
