//! Data models for the invitation sync backend.
//!
//! Wire names are camelCase for the editor and dashboard clients; raw change
//! payloads keep the store's snake_case keys.

mod change;
mod guest;
mod snapshot;
mod stats;

pub use change::*;
pub use guest::*;
pub use snapshot::*;
pub use stats::*;
