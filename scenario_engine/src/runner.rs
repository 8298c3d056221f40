use std::collections::BTreeSet;

use common_math::with_precision;
use common_proxies::{Environment, EnvironmentFault};

use crate::{
    config::RunConfiguration,
    definitions::ResolvedScenario,
    errors::{ConfigError, DefinitionError, StoryFailure},
    loader::ScenarioRegistry,
    oracle::CalculationOracle,
    retry::RetryPolicy,
    story::StoryContext,
};

#[derive(Debug)]
pub struct StoryReport {
    pub description: String,
    pub attempts: u32,
    pub outcome: Result<(), StoryFailure>,
}

#[derive(Debug)]
pub struct ScenarioReport {
    pub source_id: String,
    pub title: String,
    pub stories: Vec<StoryReport>,
    /// Set when no environment could be created for the file.
    pub setup_failure: Option<EnvironmentFault>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.setup_failure.is_none() && self.stories.iter().all(|story| story.outcome.is_ok())
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub scenarios: Vec<ScenarioReport>,
    /// Files rejected while parsing or resolving.
    pub definition_failures: Vec<DefinitionError>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.definition_failures.is_empty() && self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn story_count(&self) -> usize {
        self.scenarios.iter().map(|scenario| scenario.stories.len()).sum()
    }

    pub fn failed_story_count(&self) -> usize {
        self.scenarios
            .iter()
            .flat_map(|scenario| &scenario.stories)
            .filter(|story| story.outcome.is_err())
            .count()
    }

    pub fn log_summary(&self) {
        for scenario in &self.scenarios {
            if let Some(fault) = &scenario.setup_failure {
                log::error!("{}: environment unavailable: {fault}", scenario.source_id);
            }
            for story in &scenario.stories {
                match &story.outcome {
                    Ok(()) => log::info!("PASS {} / {}", scenario.title, story.description),
                    Err(failure) => log::error!("FAIL {} / {}: {failure}", scenario.title, story.description),
                }
            }
        }
        for failure in &self.definition_failures {
            log::error!("invalid scenario: {failure}");
        }
        log::info!(
            "{} of {} stories passed, {} invalid scenario file(s)",
            self.story_count() - self.failed_story_count(),
            self.story_count(),
            self.definition_failures.len()
        );
    }
}

/// Runs scenario files one after another, each against a fresh environment.
///
/// Stories of one file share that environment in declaration order; the
/// configured numeric context is the process default for the duration of a
/// file and the previous default comes back afterwards.
pub struct ScenarioRunner {
    config: RunConfiguration,
    oracle: CalculationOracle,
    retry: RetryPolicy,
}

impl ScenarioRunner {
    pub fn new(config: RunConfiguration) -> Result<Self, ConfigError> {
        let oracle = CalculationOracle::from_config(&config)?;
        let retry = RetryPolicy::new(config.max_attempts);
        Ok(ScenarioRunner { config, oracle, retry })
    }

    pub async fn run<E, F>(&self, registry: &ScenarioRegistry, mut new_environment: F) -> RunReport
    where
        E: Environment,
        F: FnMut(&RunConfiguration) -> Result<E, EnvironmentFault>,
    {
        let mut report = RunReport::default();

        for (source_id, scenario) in registry.iter() {
            let resolved = match scenario.resolve(&self.config) {
                Ok(resolved) => resolved,
                Err(error) => {
                    log::error!("{source_id}: {error}");
                    report.definition_failures.push(error);
                    continue;
                },
            };

            let scenario_report = match new_environment(&self.config) {
                Ok(mut env) => {
                    with_precision(
                        self.config.numeric,
                        self.run_scenario(source_id, &resolved, &mut env),
                    )
                    .await
                },
                Err(fault) => ScenarioReport {
                    source_id: source_id.to_string(),
                    title: resolved.title.clone(),
                    stories: Vec::new(),
                    setup_failure: Some(fault),
                },
            };
            report.scenarios.push(scenario_report);
        }

        report
    }

    async fn run_scenario(&self, source_id: &str, scenario: &ResolvedScenario, env: &mut dyn Environment) -> ScenarioReport {
        log::info!("scenario {source_id}: {}", scenario.title);

        let context = StoryContext {
            oracle: &self.oracle,
            assets: self.config.reserves.keys().cloned().collect(),
            participants: &scenario.participants,
            skip_integrity_check: self.config.skip_integrity_check,
        };

        let mut stories = Vec::with_capacity(scenario.stories.len());
        for story in &scenario.stories {
            let run = self.retry.run_story(env, &context, story).await;
            stories.push(StoryReport {
                description: story.description.clone(),
                attempts: run.attempts,
                outcome: run.outcome,
            });
        }

        ScenarioReport {
            source_id: source_id.to_string(),
            title: scenario.title.clone(),
            stories,
            setup_failure: None,
        }
    }
}

/// Parses a comma-separated scenario selection; blank entries are ignored.
pub fn parse_selection(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
