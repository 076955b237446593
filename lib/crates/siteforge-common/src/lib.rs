pub mod probe;
pub mod types;

pub use probe::{HostFacts, ProbeReport};
pub use types::*;
