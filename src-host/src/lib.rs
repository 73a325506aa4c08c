// Worker host library: supervises the backend worker, discovers its port,
// binds the session proxy to it, and runs content sync in front of it

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod paths;
pub mod protocol;
pub mod session;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub mod test_utils;

pub use config::{Config, HostMode};
pub use host::{Host, HostSessions};
