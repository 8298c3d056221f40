use async_trait::async_trait;
use common_proxies::{Environment, ProtocolCall, Receipt};

use super::{classify, ActionExecutor, ActionOutcome};
use crate::errors::StoryError;

pub struct SetReserveConfigExecutor;
pub struct SetAssetPriceExecutor;
pub struct IncreaseTimeExecutor;

#[async_trait(?Send)]
impl ActionExecutor for SetReserveConfigExecutor {
    fn involved_users(&self, _call: &ProtocolCall) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait(?Send)]
impl ActionExecutor for SetAssetPriceExecutor {
    fn involved_users(&self, _call: &ProtocolCall) -> Vec<String> {
        Vec::new()
    }
}

/// Moves the clock through the environment's time control, mining nothing.
#[async_trait(?Send)]
impl ActionExecutor for IncreaseTimeExecutor {
    fn involved_users(&self, _call: &ProtocolCall) -> Vec<String> {
        Vec::new()
    }

    async fn submit(&self, env: &mut dyn Environment, call: &ProtocolCall) -> Result<ActionOutcome, StoryError> {
        match call {
            ProtocolCall::IncreaseTime { seconds } => {
                let advanced = env.advance_time(*seconds).await;
                classify(advanced.map(|timestamp| Receipt { timestamp }))
            },
            _ => classify(env.perform_action(call).await),
        }
    }
}
