//! System wiring: configuration, logging, startup and shutdown.

pub mod config;
pub mod logging;
pub mod shop_system;

pub use self::config::*;
pub use self::logging::*;
pub use self::shop_system::*;
