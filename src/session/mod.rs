pub mod runtime;
pub mod watchdog;

pub use runtime::{SessionConfig, SessionHandle, SessionRuntime};
pub use watchdog::{supervise, WatchdogConfig};
