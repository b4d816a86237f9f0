//! Prompt profile module
//!
//! Profiles define the personality, scenario, and base instructions for
//! the simulated user personas and the service agents they talk to.

mod registry;
mod types;

pub use registry::ProfileRegistry;
pub use types::*;
