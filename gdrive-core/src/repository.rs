//! # repository: drive operations over a [`RemoteStore`]
//!
//! [`DriveRepository`] turns the raw round trips of the contract into the
//! operations the CLI exposes. The only decisions made here are:
//!
//! - the parent folder falls back to the root folder when none is given,
//! - whether a local path is a directory (folder MIME type, no content) or a
//!   file (content streamed from disk),
//! - the `'<parentId>' in parents` query used to list a folder's children.
//!
//! Every failure is returned as-is; nothing is retried.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::contract::RemoteStore;
use crate::error::{DriveError, Result};
use crate::record::{parent_query, DriveRecord, RecordMetadata, FOLDER_MIME_TYPE, ROOT_ALIAS};

pub struct DriveRepository<S> {
    store: S,
}

/// Name a local path will carry remotely: its final component.
pub(crate) fn local_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Local path a remote record named `name` is downloaded to: `local_dir/name`.
/// The name must be exactly one normal path component, so the target can never
/// leave `local_dir`.
pub(crate) fn download_target(local_dir: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(local_dir.join(part)),
        _ => Err(DriveError::UnsafeName(name.to_string())),
    }
}

pub(crate) fn ensure_local_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DriveError::LocalPathNotFound(path.to_path_buf()))
    }
}

fn log_record(record: &DriveRecord, local: &Path) {
    let canonical = local
        .canonicalize()
        .unwrap_or_else(|_| local.to_path_buf());
    info!(
        file_id = %record.id,
        name = %record.name,
        mime_type = %record.mime_type,
        path = %canonical.display(),
        "Record"
    );
}

impl<S: RemoteStore> DriveRepository<S> {
    pub fn new(store: S) -> Self {
        DriveRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every record visible to the user.
    pub async fn find_all(&self) -> Result<Vec<DriveRecord>> {
        info!("Fetching file list");
        self.store.list(None).await
    }

    pub async fn find_by_query(&self, query: &str) -> Result<Vec<DriveRecord>> {
        info!(query, "Fetching file list");
        self.store.list(Some(query.to_string())).await
    }

    /// Direct children of the folder `parent_id`.
    pub async fn find_by_parent_id(&self, parent_id: &str) -> Result<Vec<DriveRecord>> {
        self.find_by_query(&parent_query(parent_id)).await
    }

    pub async fn find_by_file_id(&self, file_id: &str) -> Result<DriveRecord> {
        info!(file_id, "Fetching file");
        self.store.get(file_id).await
    }

    pub async fn root_id(&self) -> Result<String> {
        Ok(self.find_by_file_id(ROOT_ALIAS).await?.id)
    }

    /// Upload a local file or directory under `parent_id`, or under the root
    /// folder when no parent is given.
    pub async fn upload(&self, local_path: &Path, parent_id: Option<&str>) -> Result<DriveRecord> {
        ensure_local_exists(local_path)?;
        let parent_id = match parent_id {
            Some(id) => id.to_string(),
            None => self.root_id().await?,
        };

        let name = local_name(local_path);
        info!(name = %name, parent_id = %parent_id, "Uploading");

        let record = if local_path.is_dir() {
            let metadata = RecordMetadata {
                name,
                mime_type: Some(FOLDER_MIME_TYPE.to_string()),
                parents: vec![parent_id],
            };
            self.store.create(metadata, None).await?
        } else {
            let metadata = RecordMetadata {
                name,
                mime_type: None,
                parents: vec![parent_id],
            };
            self.store
                .create(metadata, Some(local_path.to_path_buf()))
                .await?
        };

        log_record(&record, local_path);
        Ok(record)
    }

    /// Download a record into `local_dir`. Folders become a created local
    /// directory; files have their content streamed to `local_dir/<name>`.
    pub async fn download(&self, local_dir: &Path, file_id: &str) -> Result<PathBuf> {
        let record = self.find_by_file_id(file_id).await?;
        let target = download_target(local_dir, &record.name)?;
        info!(name = %record.name, "Downloading");

        if record.is_folder() {
            tokio::fs::create_dir_all(&target).await?;
        } else {
            let bytes = self.store.download_to(file_id, target.clone()).await?;
            info!(file_id, bytes, "Downloaded content");
        }

        log_record(&record, &target);
        Ok(target)
    }

    /// Re-send name and content of `local_path` to the existing record
    /// `file_id`. The prior MIME type and parent links are re-applied unchanged.
    pub async fn update(&self, local_path: &Path, file_id: &str) -> Result<DriveRecord> {
        ensure_local_exists(local_path)?;
        let remote = self.find_by_file_id(file_id).await?;

        let metadata = RecordMetadata {
            name: local_name(local_path),
            mime_type: Some(remote.mime_type.clone()),
            parents: Vec::new(),
        };
        let add_parents = if remote.parents.is_empty() {
            None
        } else {
            Some(remote.parents.join(","))
        };
        info!(name = %remote.name, "Updating");

        let content = if local_path.is_dir() {
            None
        } else {
            Some(local_path.to_path_buf())
        };
        let record = self
            .store
            .update(file_id, metadata, add_parents, content)
            .await?;

        log_record(&record, local_path);
        Ok(record)
    }

    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let record = self.find_by_file_id(file_id).await?;
        info!(name = %record.name, "Deleting");
        self.store.delete(file_id).await?;
        info!(
            file_id = %record.id,
            name = %record.name,
            mime_type = %record.mime_type,
            "Deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRemoteStore;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    fn record(id: &str, name: &str, mime: &str, parents: &[&str]) -> DriveRecord {
        DriveRecord {
            id: id.into(),
            name: name.into(),
            mime_type: mime.into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn find_by_parent_id_sends_parent_query() {
        let mut store = MockRemoteStore::new();
        store
            .expect_list()
            .with(eq(Some("'p1' in parents".to_string())))
            .times(1)
            .returning(|_| Ok(vec![]));

        let repo = DriveRepository::new(store);
        assert!(repo.find_by_parent_id("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_without_parent_falls_back_to_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, b"hello").unwrap();

        let mut store = MockRemoteStore::new();
        store
            .expect_get()
            .withf(|id: &str| id == "root")
            .times(1)
            .returning(|_| Ok(record("root-id", "My Drive", FOLDER_MIME_TYPE, &[])));
        let expected_path = file.clone();
        store
            .expect_create()
            .withf(move |metadata, content| {
                metadata.name == "report.txt"
                    && metadata.parents == vec!["root-id".to_string()]
                    && metadata.mime_type.is_none()
                    && content.as_deref() == Some(expected_path.as_path())
            })
            .times(1)
            .returning(|metadata, _| Ok(record("f1", &metadata.name, "text/plain", &["root-id"])));

        let repo = DriveRepository::new(store);
        let created = repo.upload(&file, None).await.unwrap();
        assert_eq!(created.id, "f1");
    }

    #[tokio::test]
    async fn upload_directory_sends_folder_mime_type_without_content() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("photos");
        std::fs::create_dir(&sub).unwrap();

        let mut store = MockRemoteStore::new();
        store.expect_get().never();
        store
            .expect_create()
            .withf(|metadata, content| {
                metadata.name == "photos"
                    && metadata.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
                    && metadata.parents == vec!["parent-9".to_string()]
                    && content.is_none()
            })
            .times(1)
            .returning(|metadata, _| Ok(record("d1", &metadata.name, FOLDER_MIME_TYPE, &["parent-9"])));

        let repo = DriveRepository::new(store);
        let created = repo.upload(&sub, Some("parent-9")).await.unwrap();
        assert!(created.is_folder());
    }

    #[tokio::test]
    async fn upload_of_missing_path_makes_no_remote_call() {
        let mut store = MockRemoteStore::new();
        store.expect_get().never();
        store.expect_create().never();

        let repo = DriveRepository::new(store);
        let err = repo
            .upload(Path::new("/definitely/not/here.txt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::LocalPathNotFound(_)));
    }

    #[tokio::test]
    async fn update_reapplies_prior_parents_and_mime_type() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("v2.txt");
        std::fs::write(&file, b"second version").unwrap();

        let mut store = MockRemoteStore::new();
        store
            .expect_get()
            .withf(|id: &str| id == "f1")
            .returning(|_| Ok(record("f1", "v1.txt", "text/plain", &["a", "b"])));
        store
            .expect_update()
            .withf(|id: &str, metadata, add_parents, content| {
                id == "f1"
                    && metadata.name == "v2.txt"
                    && metadata.mime_type.as_deref() == Some("text/plain")
                    && add_parents.as_deref() == Some("a,b")
                    && content.is_some()
            })
            .times(1)
            .returning(|_, metadata, _, _| Ok(record("f1", &metadata.name, "text/plain", &["a", "b"])));

        let repo = DriveRepository::new(store);
        let updated = repo.update(&file, "f1").await.unwrap();
        assert_eq!(updated.name, "v2.txt");
        assert_eq!(updated.parents, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn download_of_folder_creates_directory_without_fetching_content() {
        let dir = tempdir().unwrap();

        let mut store = MockRemoteStore::new();
        store
            .expect_get()
            .returning(|_| Ok(record("d1", "backup", FOLDER_MIME_TYPE, &["root-id"])));
        store.expect_download_to().never();

        let repo = DriveRepository::new(store);
        let target = repo.download(dir.path(), "d1").await.unwrap();
        assert_eq!(target, dir.path().join("backup"));
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn delete_surfaces_remote_not_found() {
        let mut store = MockRemoteStore::new();
        store
            .expect_get()
            .returning(|id| Err(DriveError::NotFound(id.to_string())));
        store.expect_delete().never();

        let repo = DriveRepository::new(store);
        let err = repo.delete("gone").await.unwrap_err();
        assert!(matches!(err, DriveError::NotFound(id) if id == "gone"));
    }

    #[tokio::test]
    async fn download_rejects_names_that_leave_the_target_directory() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let absolute = outside.path().join("escaped.txt");
        let absolute_name = absolute.to_string_lossy().into_owned();

        for name in [absolute_name.as_str(), "../x", "a/b.txt", "..", ""] {
            let mut store = MockRemoteStore::new();
            let remote_name = name.to_string();
            store
                .expect_get()
                .returning(move |id| Ok(record(id, &remote_name, "text/plain", &["root-id"])));
            store.expect_download_to().never();

            let repo = DriveRepository::new(store);
            let err = repo.download(dir.path(), "f1").await.unwrap_err();
            assert!(
                matches!(&err, DriveError::UnsafeName(n) if n == name),
                "name {name:?} gave {err:?}"
            );
        }
        assert!(!absolute.exists());
    }

    #[test]
    fn download_target_accepts_plain_names() {
        let dir = Path::new("/data/out");
        assert_eq!(
            download_target(dir, "report 2024.txt").unwrap(),
            dir.join("report 2024.txt")
        );
        assert_eq!(download_target(dir, ".hidden").unwrap(), dir.join(".hidden"));
        assert!(download_target(dir, ".").is_err());
        assert!(download_target(dir, "/etc/passwd").is_err());
    }

    #[test]
    fn local_name_uses_final_component() {
        assert_eq!(local_name(Path::new("a/b/c.txt")), "c.txt");
        assert_eq!(local_name(Path::new("src/test")), "test");
    }
}
