use async_trait::async_trait;
use common_structs::{AccountState, StateSnapshot};
use multiversx_sc_scenario::api::StaticApi;

use crate::ProtocolCall;

/// What a mined transaction reports back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub timestamp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentFault {
    /// The protocol rejected the call; `reason` is its revert message.
    #[error("call reverted: {reason}")]
    Reverted { reason: String },
    /// Infrastructure trouble unrelated to protocol logic.
    #[error("transient environment fault: {reason}")]
    Transient { reason: String },
}

/// A lending market instance scenarios can drive and observe.
///
/// Every state-changing call is mined one second after the previous block.
/// Queries report state as of the current block timestamp.
#[async_trait(?Send)]
pub trait Environment {
    async fn perform_action(&mut self, call: &ProtocolCall) -> Result<Receipt, EnvironmentFault>;

    async fn query_state(
        &mut self,
        asset: &str,
        user: &str,
    ) -> Result<StateSnapshot<StaticApi>, EnvironmentFault>;

    async fn query_account(&mut self, user: &str) -> Result<AccountState<StaticApi>, EnvironmentFault>;

    async fn current_timestamp(&mut self) -> Result<u64, EnvironmentFault>;

    /// Moves the clock forward without mining; returns the new timestamp.
    async fn advance_time(&mut self, seconds: u64) -> Result<u64, EnvironmentFault>;

    async fn snapshot(&mut self) -> Result<SnapshotId, EnvironmentFault>;

    /// Restores the state captured by `id`. The snapshot is consumed, as are
    /// any taken after it.
    async fn revert_to(&mut self, id: SnapshotId) -> Result<(), EnvironmentFault>;

    /// Drops a snapshot that will not be reverted to.
    async fn release_snapshot(&mut self, _id: SnapshotId) -> Result<(), EnvironmentFault> {
        Ok(())
    }
}
