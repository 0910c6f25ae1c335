//! Common test utilities and fixtures.

pub mod gateway;
pub mod server;

#[allow(unused_imports)]
pub use gateway::*;
#[allow(unused_imports)]
pub use server::*;
