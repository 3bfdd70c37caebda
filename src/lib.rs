//! Clevo XSM laptop driver: configuration, attribute layer and session
//! wiring shared by the `xsmctl` binary and its tests.

pub mod attributes;
pub mod config;
pub mod session;

pub use attributes::Attribute;
pub use config::Config;
pub use session::Session;
