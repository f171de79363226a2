#![doc = "gdrive-core: remote-storage gateway and drive operations for the gdrive tools."]

//! This crate holds everything the `gdrive` binaries do apart from argument
//! parsing and authentication.
//!
//! # Layers
//! - [`contract::RemoteStore`]: one method per remote round trip (mockable).
//! - [`client::DriveClient`]: the Drive v3 REST implementation.
//! - [`repository::DriveRepository`] and [`service::DriveService`]: the
//!   operations behind `gdrive`.
//! - [`resource::DriveResource`]: the status-carrying operations behind
//!   `gdrive-resource`.

pub mod client;
pub mod contract;
pub mod error;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod memory;
pub mod record;
pub mod repository;
pub mod resource;
pub mod service;
pub mod status;

pub use error::{DriveError, Result};
pub use record::{DriveRecord, RecordMetadata, FOLDER_MIME_TYPE};
pub use status::Status;
