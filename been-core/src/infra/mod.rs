pub mod memory;
pub mod resolver;

pub use memory::InMemoryHostDatabase;
pub use resolver::{DnsHostResolver, PassthroughResolver};
