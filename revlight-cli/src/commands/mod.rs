//! CLI command implementations

pub mod review;
pub mod watch;

pub use review::ReviewArgs;
pub use watch::WatchArgs;
