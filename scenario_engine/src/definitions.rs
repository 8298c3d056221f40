use std::collections::{BTreeMap, BTreeSet};

use common_constants::{MAX_AMOUNT_LITERAL, MAX_TIME_JUMP_SECONDS, WAD_PRECISION};
use common_errors::FailureClass;
use common_proxies::{Amount, ProtocolCall};
use common_structs::{parse_decimal, InterestRateMode, ReserveConfigUpdate};
use multiversx_sc::types::{ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;
use serde::Deserialize;
use serde_json::Value;

use crate::{actions, config::RunConfiguration, errors::parse_failure_class, errors::DefinitionError};

/// One scenario file as written on disk.
#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub stories: Vec<Story>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Story {
    pub description: String,
    pub actions: Vec<ActionDefinition>,
}

/// An untyped action; arguments are resolved against the run configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
    #[serde(default)]
    pub expected: ExpectedOutcome,
    /// Expected failure class, as the protocol's message or the class name.
    #[serde(default)]
    pub revert_message: Option<String>,
    /// Field pins such as `"user.scaledATokenBalance": "1000000000"`.
    #[serde(default)]
    pub expected_state: BTreeMap<String, Value>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedOutcome {
    #[default]
    Success,
    Revert,
}

/// What the scenario declares about an action's outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    Success,
    /// `None` leaves the class to the oracle's prediction.
    Revert(Option<FailureClass>),
}

#[derive(Clone)]
pub struct ResolvedAction {
    /// Position within the story, starting at 1.
    pub index: usize,
    pub call: ProtocolCall,
    pub expectation: Expectation,
    /// `(path, raw value)` pairs checked against the actor's post-state.
    pub pins: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct ResolvedStory {
    pub description: String,
    pub actions: Vec<ResolvedAction>,
}

#[derive(Clone)]
pub struct ResolvedScenario {
    pub title: String,
    pub stories: Vec<ResolvedStory>,
    /// Every user any action of the file involves, in name order.
    pub participants: BTreeSet<String>,
}

impl Scenario {
    pub fn from_json(source_id: &str, text: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(text).map_err(|error| DefinitionError::Malformed {
            source_id: source_id.to_string(),
            error,
        })
    }

    /// Types every action against the configured reserves.
    pub fn resolve(&self, config: &RunConfiguration) -> Result<ResolvedScenario, DefinitionError> {
        let mut participants = BTreeSet::new();
        let mut stories = Vec::with_capacity(self.stories.len());

        for (story_position, story) in self.stories.iter().enumerate() {
            let mut resolved = Vec::with_capacity(story.actions.len());
            for (action_position, definition) in story.actions.iter().enumerate() {
                let args = Args {
                    story: story_position + 1,
                    action: action_position + 1,
                    name: &definition.name,
                    values: &definition.args,
                    config,
                };
                let action = args.resolve(definition)?;
                participants.extend(actions::executor_for(&action.call).involved_users(&action.call));
                resolved.push(action);
            }
            stories.push(ResolvedStory {
                description: story.description.clone(),
                actions: resolved,
            });
        }

        Ok(ResolvedScenario {
            title: self.title.clone(),
            stories,
            participants,
        })
    }
}

/// Argument accessor for one action, carrying its position for diagnostics.
struct Args<'a> {
    story: usize,
    action: usize,
    name: &'a str,
    values: &'a BTreeMap<String, Value>,
    config: &'a RunConfiguration,
}

impl Args<'_> {
    fn error(&self, reason: impl Into<String>) -> DefinitionError {
        DefinitionError::invalid_action(self.story, self.action, self.name, reason)
    }

    fn resolve(&self, definition: &ActionDefinition) -> Result<ResolvedAction, DefinitionError> {
        let call = self.call()?;

        let expectation = match definition.expected {
            ExpectedOutcome::Success => {
                if definition.revert_message.is_some() {
                    return Err(self.error("revertMessage given for an action expected to succeed"));
                }
                Expectation::Success
            },
            ExpectedOutcome::Revert => match &definition.revert_message {
                Some(message) => {
                    let class = parse_failure_class(message)
                        .ok_or_else(|| self.error(format!("unknown revert message `{message}`")))?;
                    Expectation::Revert(Some(class))
                },
                None => Expectation::Revert(None),
            },
        };

        let mut pins = Vec::with_capacity(definition.expected_state.len());
        for (path, value) in &definition.expected_state {
            self.check_pin_path(&call, path)?;
            pins.push((path.clone(), self.scalar(path, value)?));
        }

        Ok(ResolvedAction {
            index: self.action,
            call,
            expectation,
            pins,
        })
    }

    fn call(&self) -> Result<ProtocolCall, DefinitionError> {
        let call = match self.name {
            "mint" => {
                let asset = self.asset("reserve")?;
                ProtocolCall::Mint {
                    user: self.text("user")?,
                    amount: self.exact_amount("amount", &asset)?,
                    asset,
                }
            },
            "approve" => {
                let asset = self.asset("reserve")?;
                let amount = if self.values.contains_key("amount") {
                    self.amount("amount", &asset)?
                } else {
                    Amount::Max
                };
                ProtocolCall::Approve {
                    user: self.text("user")?,
                    asset,
                    amount,
                }
            },
            "deposit" => {
                let asset = self.asset("reserve")?;
                ProtocolCall::Deposit {
                    user: self.text("user")?,
                    amount: self.exact_amount("amount", &asset)?,
                    asset,
                }
            },
            "withdraw" => {
                let asset = self.asset("reserve")?;
                ProtocolCall::Withdraw {
                    user: self.text("user")?,
                    amount: self.amount("amount", &asset)?,
                    asset,
                }
            },
            "borrow" => {
                let asset = self.asset("reserve")?;
                ProtocolCall::Borrow {
                    user: self.text("user")?,
                    amount: self.exact_amount("amount", &asset)?,
                    rate_mode: self.rate_mode("borrowRateMode")?,
                    asset,
                }
            },
            "repay" => {
                let asset = self.asset("reserve")?;
                let user = self.text("user")?;
                let on_behalf_of = match self.values.get("onBehalfOf") {
                    Some(_) => self.text("onBehalfOf")?,
                    None => user.clone(),
                };
                ProtocolCall::Repay {
                    amount: self.amount("amount", &asset)?,
                    rate_mode: self.rate_mode("borrowRateMode")?,
                    user,
                    asset,
                    on_behalf_of,
                }
            },
            "setUseAsCollateral" => ProtocolCall::SetUseAsCollateral {
                user: self.text("user")?,
                asset: self.asset("reserve")?,
                enabled: self.flag("useAsCollateral")?,
            },
            "swapBorrowRateMode" => ProtocolCall::SwapBorrowRateMode {
                user: self.text("user")?,
                asset: self.asset("reserve")?,
                rate_mode: self.rate_mode("borrowRateMode")?,
            },
            "liquidationCall" => {
                let debt_asset = self.asset("reserve")?;
                ProtocolCall::LiquidationCall {
                    liquidator: self.text("user")?,
                    collateral_asset: self.asset("collateralReserve")?,
                    borrower: self.text("borrower")?,
                    debt_to_cover: self.amount("amount", &debt_asset)?,
                    receive_a_token: match self.values.get("receiveAToken") {
                        Some(_) => self.flag("receiveAToken")?,
                        None => false,
                    },
                    debt_asset,
                }
            },
            "setReserveConfig" => ProtocolCall::SetReserveConfig {
                asset: self.asset("reserve")?,
                update: self.config_update()?,
            },
            "setAssetPrice" => ProtocolCall::SetAssetPrice {
                asset: self.asset("reserve")?,
                price: self.decimal("price", WAD_PRECISION)?,
            },
            "increaseTime" => ProtocolCall::IncreaseTime {
                seconds: self.seconds("seconds")?,
            },
            other => return Err(self.error(format!("unknown action `{other}`"))),
        };
        Ok(call)
    }

    fn value(&self, key: &str) -> Result<&Value, DefinitionError> {
        self.values
            .get(key)
            .ok_or_else(|| self.error(format!("missing argument `{key}`")))
    }

    /// Strings, numbers and booleans, as text.
    fn scalar(&self, key: &str, value: &Value) -> Result<String, DefinitionError> {
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            _ => Err(self.error(format!("`{key}` must be a string, number or boolean"))),
        }
    }

    fn text(&self, key: &str) -> Result<String, DefinitionError> {
        self.scalar(key, self.value(key)?)
    }

    fn asset(&self, key: &str) -> Result<String, DefinitionError> {
        let asset = self.text(key)?;
        if self.config.decimals(&asset).is_none() {
            return Err(self.error(format!("reserve `{asset}` is not configured")));
        }
        Ok(asset)
    }

    fn decimal(
        &self,
        key: &str,
        decimals: NumDecimals,
    ) -> Result<ManagedDecimal<StaticApi, NumDecimals>, DefinitionError> {
        let text = self.text(key)?;
        parse_decimal(&text, decimals).map_err(|error| self.error(format!("`{key}`: {error}")))
    }

    fn is_max(text: &str) -> bool {
        text == MAX_AMOUNT_LITERAL || text.eq_ignore_ascii_case("all")
    }

    fn amount(&self, key: &str, asset: &str) -> Result<Amount, DefinitionError> {
        if Self::is_max(&self.text(key)?) {
            return Ok(Amount::Max);
        }
        self.exact_amount(key, asset).map(Amount::Exact)
    }

    fn exact_amount(
        &self,
        key: &str,
        asset: &str,
    ) -> Result<ManagedDecimal<StaticApi, NumDecimals>, DefinitionError> {
        let decimals = self
            .config
            .decimals(asset)
            .ok_or_else(|| self.error(format!("reserve `{asset}` is not configured")))?;
        if Self::is_max(&self.text(key)?) {
            return Err(self.error(format!("`{key}` needs an explicit amount")));
        }
        self.decimal(key, decimals)
    }

    fn flag(&self, key: &str) -> Result<bool, DefinitionError> {
        match self.text(key)?.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(self.error(format!("`{key}` must be true or false, got `{other}`"))),
        }
    }

    fn rate_mode(&self, key: &str) -> Result<InterestRateMode, DefinitionError> {
        match self.text(key)?.to_ascii_lowercase().as_str() {
            "stable" => Ok(InterestRateMode::Stable),
            "variable" => Ok(InterestRateMode::Variable),
            other => Err(self.error(format!("`{key}` must be stable or variable, got `{other}`"))),
        }
    }

    fn seconds(&self, key: &str) -> Result<u64, DefinitionError> {
        let text = self.text(key)?;
        let seconds: u64 = text
            .parse()
            .map_err(|_| self.error(format!("`{key}` must be a whole number of seconds, got `{text}`")))?;
        if seconds > MAX_TIME_JUMP_SECONDS {
            return Err(self.error(format!(
                "`{key}` jumps {seconds} seconds, more than the {MAX_TIME_JUMP_SECONDS} allowed"
            )));
        }
        Ok(seconds)
    }

    /// Every argument except `reserve` is a configuration key.
    fn config_update(&self) -> Result<ReserveConfigUpdate, DefinitionError> {
        let fields: serde_json::Map<String, Value> = self
            .values
            .iter()
            .filter(|(key, _)| key.as_str() != "reserve")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        serde_json::from_value(Value::Object(fields)).map_err(|error| self.error(error.to_string()))
    }

    fn check_pin_path(&self, call: &ProtocolCall, path: &str) -> Result<(), DefinitionError> {
        let scope = path.split_once('.').map(|(scope, _)| scope);
        let usable = match scope {
            Some("reserve") => call.asset().is_some(),
            Some("user") => call.asset().is_some() && call.actor().is_some(),
            Some("account") => call.actor().is_some(),
            _ => return Err(self.error(format!("pin `{path}` must start with reserve., user. or account."))),
        };
        if !usable {
            return Err(self.error(format!("pin `{path}` has no subject for this action")));
        }
        Ok(())
    }
}

