use async_trait::async_trait;
use common_proxies::ProtocolCall;

use super::ActionExecutor;

pub struct LiquidationCallExecutor;

#[async_trait(?Send)]
impl ActionExecutor for LiquidationCallExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        match call {
            ProtocolCall::LiquidationCall {
                liquidator, borrower, ..
            } => vec![liquidator.clone(), borrower.clone()],
            _ => Vec::new(),
        }
    }
}
