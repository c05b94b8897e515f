//! Realtime reconciliation pipeline: change notifications in, dashboard frames out.

mod dashboard;
mod feed;
mod loader;
mod normalize;
mod reconcile;
mod stats;
mod subscription;

pub use dashboard::*;
pub use feed::*;
pub use loader::*;
pub use normalize::*;
pub use reconcile::*;
pub use stats::*;
pub use subscription::*;
