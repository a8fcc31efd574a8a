pub mod group;
pub mod ids;

pub use group::HostGroup;
pub use ids::{CorrelationKey, ListenerId, OperationHandle};
