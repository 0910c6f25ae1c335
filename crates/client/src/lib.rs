//! Push client library for stevedore.
//!
//! The client drives the server's reconciliation loop: submit the manifest,
//! upload whatever byte ranges come back as requirements, echo the upload
//! evidence, and repeat until the server answers with none.

pub mod api_client;
pub mod backoff;
pub mod error;
pub mod layer;
pub mod orchestrator;
pub mod source;

pub use api_client::Client;
pub use backoff::Backoff;
pub use error::{ClientError, ClientResult};
pub use layer::push_layer;
pub use orchestrator::{
    digest_from_url, push_until_complete, LayerSource, MemorySource, PushOptions,
};
pub use source::{read_range, ReadAt};
