use async_trait::async_trait;
use common_proxies::ProtocolCall;

use super::{actor_only, ActionExecutor};

pub struct BorrowExecutor;
pub struct RepayExecutor;
pub struct SwapBorrowRateModeExecutor;

#[async_trait(?Send)]
impl ActionExecutor for BorrowExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}

/// The payer and the debtor may differ.
#[async_trait(?Send)]
impl ActionExecutor for RepayExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        match call {
            ProtocolCall::Repay { user, on_behalf_of, .. } if user != on_behalf_of => {
                vec![user.clone(), on_behalf_of.clone()]
            },
            _ => actor_only(call),
        }
    }
}

#[async_trait(?Send)]
impl ActionExecutor for SwapBorrowRateModeExecutor {
    fn involved_users(&self, call: &ProtocolCall) -> Vec<String> {
        actor_only(call)
    }
}
