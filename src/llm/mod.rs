//! Completion client module
//!
//! Provides the abstraction over the hosted chat completion API
//! and implementations for production (HTTP) and testing (mock).

mod api;
mod mock;
mod traits;

pub use api::ApiClient;
pub use mock::{MockClient, MockConfig};
pub use traits::*;
