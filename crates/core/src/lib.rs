//! Core domain types and shared logic for the stevedore push protocol.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Manifests and their content-addressed layers
//! - Push references and their storage key mapping
//! - Chunk planning for multipart uploads
//! - The push request/response wire types
//! - Shared configuration types

pub mod api;
pub mod chunks;
pub mod config;
pub mod error;
pub mod manifest;
pub mod reference;

pub use api::{CompletePart, ErrorResponse, PushParams, PushRequest, PushResponse, Requirement};
pub use chunks::{Chunk, Chunks};
pub use error::{Error, Result};
pub use manifest::{Layer, Manifest};
pub use reference::{blob_key, Reference};

/// Default chunk size: 16 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Default presigned URL lifetime: 15 minutes
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 15 * 60;
