mod call;
mod environment;

pub use call::{Amount, ProtocolCall};
pub use environment::{Environment, EnvironmentFault, Receipt, SnapshotId};
