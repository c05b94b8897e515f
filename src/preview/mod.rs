//! Live preview pipeline: editor edits in, render-surface payloads out.
//!
//! `snapshot` builds, `debounce` paces, `channel` picks the transfer strategy,
//! `bridge` runs the handshake and `session` ties them together per invitation.

mod bridge;
mod channel;
mod debounce;
mod session;
mod snapshot;

pub use bridge::*;
pub use channel::*;
pub use debounce::*;
pub use session::*;
pub use snapshot::*;
