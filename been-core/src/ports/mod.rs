//! Collaborators the lifecycle controller depends on but does not own.
//!
//! Each port is an `async_trait` so adapters can be in-memory fakes, HTTP
//! clients or anything else that can answer the calls.

pub mod database;
pub mod monitor;
pub mod resolver;
pub mod tasks;

pub use database::{HostDatabase, UserProperties};
pub use monitor::LoadMonitor;
pub use resolver::HostResolver;
pub use tasks::{TaskDependency, TaskDescriptor, TaskExecution};
