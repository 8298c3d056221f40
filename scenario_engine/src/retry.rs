use common_proxies::{Environment, SnapshotId};

use crate::{
    definitions::ResolvedStory,
    errors::{RetryExhausted, StoryError, StoryFailure},
    story::{StoryContext, StoryExecutor},
};

/// How one story ended and how many attempts it took.
#[derive(Debug)]
pub struct StoryRun {
    pub attempts: u32,
    pub outcome: Result<(), StoryFailure>,
}

/// Re-runs a story from the same starting state after transient faults.
///
/// A snapshot is taken before the first attempt; every retry reverts to it
/// and takes a fresh one. The last one is released once the story settles.
/// Mismatches and violated expectations end the story immediately.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run_story(
        &self,
        env: &mut dyn Environment,
        context: &StoryContext<'_>,
        story: &ResolvedStory,
    ) -> StoryRun {
        let mut baseline = None;
        let run = self.attempt_until_settled(env, &mut baseline, context, story).await;

        if let Some(id) = baseline {
            if let Err(fault) = env.release_snapshot(id).await {
                log::warn!("could not release snapshot {}: {fault}", id.0);
            }
        }
        run
    }

    async fn attempt_until_settled(
        &self,
        env: &mut dyn Environment,
        baseline: &mut Option<SnapshotId>,
        context: &StoryContext<'_>,
        story: &ResolvedStory,
    ) -> StoryRun {
        let mut last_fault = String::new();

        for attempt in 1..=self.max_attempts {
            match attempt_story(env, baseline, context, story).await {
                Ok(()) => {
                    return StoryRun {
                        attempts: attempt,
                        outcome: Ok(()),
                    }
                },
                Err(StoryError::Transient(reason)) => {
                    log::warn!(
                        "attempt {attempt}/{} of '{}' hit a transient fault: {reason}",
                        self.max_attempts,
                        story.description
                    );
                    last_fault = reason;
                },
                Err(error) => {
                    return StoryRun {
                        attempts: attempt,
                        outcome: Err(StoryFailure::Failed(error)),
                    }
                },
            }
        }

        StoryRun {
            attempts: self.max_attempts,
            outcome: Err(RetryExhausted {
                attempts: self.max_attempts,
                last_fault,
            }
            .into()),
        }
    }
}

/// Restores the baseline when one exists, re-arms it and runs the story once.
async fn attempt_story(
    env: &mut dyn Environment,
    baseline: &mut Option<SnapshotId>,
    context: &StoryContext<'_>,
    story: &ResolvedStory,
) -> Result<(), StoryError> {
    if let Some(id) = *baseline {
        env.revert_to(id).await?;
        *baseline = None;
    }
    *baseline = Some(env.snapshot().await?);

    StoryExecutor::new(story, context).run(env).await
}
