//! HTTP request handlers.

pub mod common;
pub mod push;

pub use common::*;
pub use push::*;
