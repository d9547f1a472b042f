//! Service layer module
//!
//! Model resolver, upstream HTTP client, stream relay, and the dispatch
//! orchestrator that ties them together.

pub mod client;
pub mod dispatch;
pub mod relay;
pub mod resolver;

pub use client::UpstreamClient;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use relay::{RelayOutcome, RelayState, StreamRelay};
pub use resolver::ModelResolver;
