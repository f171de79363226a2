//! # resource: status-carrying drive operations
//!
//! [`DriveResource`] is the flavour used by the `gdrive-resource` binary. Instead
//! of returning errors, each operation resets the [`Status`] to
//! `Uninitialized`, runs one remote call, logs any failure, and leaves the
//! status at `Success` or `Error` for the caller to turn into an exit code.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::contract::RemoteStore;
use crate::error::DriveError;
use crate::record::{parent_query, DriveRecord, RecordMetadata, FOLDER_MIME_TYPE};
use crate::repository::{download_target, ensure_local_exists, local_name};
use crate::status::Status;

pub struct DriveResource<S> {
    store: S,
    status: Status,
    parent_id: Option<String>,
}

impl<S: RemoteStore> DriveResource<S> {
    pub fn new(store: S) -> Self {
        DriveResource {
            store,
            status: Status::Uninitialized,
            parent_id: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn code(&self) -> i32 {
        self.status.code()
    }

    /// Folder used as list filter and as parent of created records.
    pub fn set_parent_id(&mut self, parent_id: impl Into<String>) {
        self.parent_id = Some(parent_id.into());
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn fail(&mut self, err: DriveError) {
        error!(error = %err, "Drive operation failed");
        self.status = Status::Error;
    }

    fn settle<T>(&mut self, result: Result<T, DriveError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.status = Status::Success;
                Some(value)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    pub async fn get_file_by_id(&mut self, file_id: &str) -> Option<DriveRecord> {
        self.status = Status::Uninitialized;
        info!(file_id, "Fetching file");
        let result = self.store.get(file_id).await;
        self.settle(result)
    }

    /// Children of the configured parent, or every record when no parent is set.
    /// The status only becomes `Success` when at least one record came back.
    pub async fn get_files(&mut self) -> Option<Vec<DriveRecord>> {
        self.status = Status::Uninitialized;
        info!(parent_id = ?self.parent_id, "Fetching file list");
        let query = self.parent_id.as_deref().map(parent_query);
        match self.store.list(query).await {
            Ok(files) => {
                if !files.is_empty() {
                    self.status = Status::Success;
                }
                Some(files)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Upload a local file or directory under the configured parent.
    pub async fn create(&mut self, path: &Path) -> Option<DriveRecord> {
        self.status = Status::Uninitialized;
        if let Err(e) = ensure_local_exists(path) {
            self.fail(e);
            return None;
        }

        let mut metadata = RecordMetadata {
            name: local_name(path),
            ..Default::default()
        };
        if let Some(parent) = &self.parent_id {
            metadata.parents.push(parent.clone());
        }
        info!(path = %path.display(), "Uploading");

        let result = if path.is_dir() {
            metadata.mime_type = Some(FOLDER_MIME_TYPE.to_string());
            self.store.create(metadata, None).await
        } else {
            self.store.create(metadata, Some(path.to_path_buf())).await
        };
        self.settle(result)
    }

    pub async fn delete(&mut self, file_id: &str) {
        self.status = Status::Uninitialized;
        info!(file_id, "Deleting");
        let result = self.store.delete(file_id).await;
        self.settle(result);
    }

    /// Download a record into the directory `path`.
    pub async fn download(&mut self, path: &Path, file_id: &str) -> Option<PathBuf> {
        self.status = Status::Uninitialized;
        info!(file_id, "Downloading");
        let result = self.download_inner(path, file_id).await;
        self.settle(result)
    }

    async fn download_inner(&self, path: &Path, file_id: &str) -> Result<PathBuf, DriveError> {
        let remote = self.store.get(file_id).await?;
        let local = download_target(path, &remote.name)?;
        if remote.is_folder() {
            tokio::fs::create_dir_all(&local).await?;
        } else {
            self.store.download_to(file_id, local.clone()).await?;
        }
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRemoteStore;
    use mockall::predicate::eq;

    fn file(id: &str, parents: &[&str]) -> DriveRecord {
        DriveRecord {
            id: id.into(),
            name: format!("{id}.txt"),
            mime_type: "text/plain".into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn empty_listing_leaves_status_uninitialized() {
        let mut store = MockRemoteStore::new();
        store.expect_list().with(eq(None::<String>)).returning(|_| Ok(vec![]));

        let mut resource = DriveResource::new(store);
        let files = resource.get_files().await.unwrap();
        assert!(files.is_empty());
        assert_eq!(resource.status(), Status::Uninitialized);
    }

    #[tokio::test]
    async fn listing_with_parent_filters_by_query() {
        let mut store = MockRemoteStore::new();
        store
            .expect_list()
            .with(eq(Some("'p1' in parents".to_string())))
            .returning(|_| Ok(vec![file("a", &["p1"])]));

        let mut resource = DriveResource::new(store);
        resource.set_parent_id("p1");
        let files = resource.get_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(resource.code(), 2);
    }

    #[tokio::test]
    async fn create_of_missing_path_errors_without_remote_call() {
        let mut store = MockRemoteStore::new();
        store.expect_create().never();

        let mut resource = DriveResource::new(store);
        assert!(resource
            .create(Path::new("/no/such/file.txt"))
            .await
            .is_none());
        assert_eq!(resource.status(), Status::Error);
    }

    #[tokio::test]
    async fn create_without_parent_sends_no_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let mut store = MockRemoteStore::new();
        store
            .expect_create()
            .withf(|metadata, content| metadata.parents.is_empty() && content.is_some())
            .returning(|_, _| Ok(file("a", &["root-id"])));

        let mut resource = DriveResource::new(store);
        assert!(resource.create(&path).await.is_some());
        assert_eq!(resource.status(), Status::Success);
    }

    #[tokio::test]
    async fn download_of_relative_escaping_name_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let mut store = MockRemoteStore::new();
        store.expect_get().returning(|id| {
            Ok(DriveRecord {
                id: id.into(),
                name: "../sibling.txt".into(),
                mime_type: "text/plain".into(),
                parents: vec![],
            })
        });
        store.expect_download_to().never();

        let mut resource = DriveResource::new(store);
        assert!(resource.download(out.path(), "f1").await.is_none());
        assert_eq!(resource.status(), Status::Error);
    }

    #[tokio::test]
    async fn status_is_reset_between_operations() {
        let mut store = MockRemoteStore::new();
        store
            .expect_delete()
            .withf(|id: &str| id == "bad")
            .returning(|id| Err(DriveError::NotFound(id.to_string())));
        store
            .expect_get()
            .withf(|id: &str| id == "good")
            .returning(|id| Ok(file(id, &[])));

        let mut resource = DriveResource::new(store);
        resource.delete("bad").await;
        assert_eq!(resource.status(), Status::Error);

        assert!(resource.get_file_by_id("good").await.is_some());
        assert_eq!(resource.status(), Status::Success);
    }
}
