use async_trait::async_trait;
use common_proxies::ProtocolCall;

use super::{actor_only, ActionExecutor};

pub struct MintExecutor;
pub struct ApproveExecutor;
pub struct DepositExecutor;
pub struct WithdrawExecutor;
pub struct SetUseAsCollateralExecutor;

#[async_trait(?Send)]
impl ActionExecutor for MintExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}

#[async_trait(?Send)]
impl ActionExecutor for ApproveExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}

#[async_trait(?Send)]
impl ActionExecutor for DepositExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}

#[async_trait(?Send)]
impl ActionExecutor for WithdrawExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}

#[async_trait(?Send)]
impl ActionExecutor for SetUseAsCollateralExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}
