use std::collections::BTreeSet;

use common_errors::FailureClass;
use common_proxies::Environment;
use common_structs::{FieldMismatch, MarketView};

use crate::{
    actions::{self, ActionOutcome, Execution, Observation},
    definitions::{Expectation, ResolvedAction, ResolvedStory},
    errors::StoryError,
    oracle::{CalculationOracle, Prediction, View},
};

/// What every story of one scenario file shares.
pub struct StoryContext<'a> {
    pub oracle: &'a CalculationOracle,
    /// Configured assets, observed for every participant.
    pub assets: Vec<String>,
    pub participants: &'a BTreeSet<String>,
    pub skip_integrity_check: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoryStatus {
    Ready,
    /// `action` is the 1-based index of the action in flight.
    Running { action: usize },
    Passed,
    Failed,
}

/// Runs the actions of one story in order and stops at the first problem.
///
/// Each action is checked in three steps: the outcome the scenario declares,
/// then agreement with the oracle on outcome, receipt timestamp and the full
/// after-view, then any explicit field pins. The oracle step is skipped when
/// integrity checking is off; pins are always enforced.
pub struct StoryExecutor<'a> {
    story: &'a ResolvedStory,
    context: &'a StoryContext<'a>,
    status: StoryStatus,
    /// The latest observation; the after-view of one action is the
    /// before-view of the next.
    last_view: Option<View>,
}

impl<'a> StoryExecutor<'a> {
    pub fn new(story: &'a ResolvedStory, context: &'a StoryContext<'a>) -> Self {
        StoryExecutor {
            story,
            context,
            status: StoryStatus::Ready,
            last_view: None,
        }
    }

    pub fn status(&self) -> StoryStatus {
        self.status
    }

    pub async fn run(&mut self, env: &mut dyn Environment) -> Result<(), StoryError> {
        log::info!("story: {}", self.story.description);

        for action in &self.story.actions {
            self.status = StoryStatus::Running { action: action.index };
            if let Err(error) = self.step(env, action).await {
                log::warn!("story '{}' stopped: {error}", self.story.description);
                self.status = StoryStatus::Failed;
                return Err(error);
            }
        }

        self.status = StoryStatus::Passed;
        Ok(())
    }

    async fn step(&mut self, env: &mut dyn Environment, action: &ResolvedAction) -> Result<(), StoryError> {
        let call = &action.call;
        let integrity = !self.context.skip_integrity_check;

        let before = match self.last_view.take() {
            Some(view) if integrity => Some(view),
            _ if integrity => Some(self.observation().capture(env).await?),
            _ => None,
        };

        log::debug!("action {} ({})", action.index, call.name());
        let observation = (integrity || !action.pins.is_empty()).then(|| self.observation());
        let Execution { outcome, after } = actions::executor_for(call).execute(env, call, observation).await?;
        check_declared(action, &outcome)?;

        let Some(after) = after else {
            return Ok(());
        };

        if let Some(before) = before {
            let prediction = self.context.oracle.predict(&before, call);
            check_prediction(action, &outcome, &prediction, &after)?;
        }
        check_pins(action, &after)?;

        self.last_view = Some(after);
        Ok(())
    }

    fn observation(&self) -> Observation<'a> {
        let context = self.context;
        Observation {
            assets: &context.assets,
            participants: context.participants,
        }
    }
}

fn check_declared(action: &ResolvedAction, outcome: &ActionOutcome) -> Result<(), StoryError> {
    let violated = |detail: String| StoryError::ExpectationViolated {
        action_index: action.index,
        action: action.call.name().to_string(),
        detail,
    };

    match (action.expectation, outcome) {
        (_, ActionOutcome::Reverted { class: None, reason }) => {
            Err(violated(format!("reverted with unrecognised reason '{reason}'")))
        },
        (Expectation::Success, ActionOutcome::Reverted { reason, .. }) => {
            Err(violated(format!("expected success, reverted with '{reason}'")))
        },
        (Expectation::Revert(_), ActionOutcome::Succeeded(_)) => Err(violated("expected a revert, call succeeded".to_string())),
        (Expectation::Revert(Some(expected)), ActionOutcome::Reverted { class: Some(actual), .. })
            if expected != *actual =>
        {
            Err(violated(format!("expected revert '{expected}', got '{actual}'")))
        },
        _ => Ok(()),
    }
}

fn check_prediction(
    action: &ResolvedAction,
    outcome: &ActionOutcome,
    prediction: &Prediction,
    after: &View,
) -> Result<(), StoryError> {
    let mismatch = |mismatch: FieldMismatch| StoryError::Mismatch {
        action_index: action.index,
        action: action.call.name().to_string(),
        mismatch,
    };

    let agrees = match (&prediction.outcome, outcome) {
        (Ok(()), ActionOutcome::Succeeded(_)) => true,
        (Err(expected), ActionOutcome::Reverted { class, .. }) => *class == Some(*expected),
        _ => false,
    };
    if !agrees {
        return Err(mismatch(FieldMismatch {
            field: "outcome".to_string(),
            expected: describe_prediction(&prediction.outcome),
            actual: describe_outcome(outcome),
        }));
    }

    if let ActionOutcome::Succeeded(receipt) = outcome {
        if receipt.timestamp != prediction.timestamp {
            return Err(mismatch(FieldMismatch {
                field: "receipt.timestamp".to_string(),
                expected: prediction.timestamp.to_string(),
                actual: receipt.timestamp.to_string(),
            }));
        }
    }

    match MarketView::compare(&prediction.view, after) {
        Some(found) => Err(mismatch(found)),
        None => Ok(()),
    }
}

/// Pins resolve against the action's asset and acting user.
fn check_pins(action: &ResolvedAction, after: &View) -> Result<(), StoryError> {
    let asset = action.call.asset().unwrap_or_default();
    let user = action.call.actor().unwrap_or_default();

    for (path, expected) in &action.pins {
        let actual = match after.pinned_field(asset, user, path) {
            Some(value) => value.raw(),
            None => "missing".to_string(),
        };
        if actual != *expected {
            return Err(StoryError::Mismatch {
                action_index: action.index,
                action: action.call.name().to_string(),
                mismatch: FieldMismatch {
                    field: path.clone(),
                    expected: expected.clone(),
                    actual,
                },
            });
        }
    }
    Ok(())
}

fn describe_prediction(outcome: &Result<(), FailureClass>) -> String {
    match outcome {
        Ok(()) => "success".to_string(),
        Err(class) => format!("revert '{class}'"),
    }
}

fn describe_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Succeeded(_) => "success".to_string(),
        ActionOutcome::Reverted { reason, .. } => format!("revert '{reason}'"),
    }
}
