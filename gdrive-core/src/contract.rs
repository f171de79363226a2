//! # contract: the remote-storage seam
//!
//! [`RemoteStore`] is the single trait between this workspace and the storage
//! provider. Each method is exactly one round trip to the remote API; local
//! filesystem decisions (file vs. directory, target paths) live one layer up
//! in [`crate::repository`] and [`crate::resource`].
//!
//! ## Implementors
//! - [`crate::client::DriveClient`]: the Drive v3 REST client.
//! - [`crate::memory::InMemoryStore`]: a faked service for tests.
//! - `MockRemoteStore`: generated by `mockall` for expectation-driven tests.

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;
use crate::record::{DriveRecord, RecordMetadata};

/// Round-trip operations against the remote storage tree.
///
/// The trait is `Send + Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one record by id. Unknown ids are [`crate::DriveError::NotFound`].
    async fn get(&self, file_id: &str) -> Result<DriveRecord>;

    /// List records, optionally narrowed by a Drive search query.
    async fn list(&self, query: Option<String>) -> Result<Vec<DriveRecord>>;

    /// Create a record. `content` is the local file to stream as the body;
    /// `None` creates a metadata-only record such as a folder.
    async fn create(
        &self,
        metadata: RecordMetadata,
        content: Option<PathBuf>,
    ) -> Result<DriveRecord>;

    /// Replace name/content of an existing record, linking it to the
    /// comma-separated `add_parents` ids.
    async fn update(
        &self,
        file_id: &str,
        metadata: RecordMetadata,
        add_parents: Option<String>,
        content: Option<PathBuf>,
    ) -> Result<DriveRecord>;

    /// Delete a record. Deleting an unknown id is an error.
    async fn delete(&self, file_id: &str) -> Result<()>;

    /// Stream a file record's content into `target`, returning the bytes written.
    async fn download_to(&self, file_id: &str, target: PathBuf) -> Result<u64>;
}
