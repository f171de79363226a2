use std::path::{Path, PathBuf};

use crate::contract::RemoteStore;
use crate::error::Result;
use crate::record::DriveRecord;
use crate::repository::DriveRepository;

/// Entry point used by the `gdrive` binary. Delegates to [`DriveRepository`].
pub struct DriveService<S> {
    repository: DriveRepository<S>,
}

impl<S: RemoteStore> DriveService<S> {
    pub fn new(store: S) -> Self {
        DriveService {
            repository: DriveRepository::new(store),
        }
    }

    pub fn repository(&self) -> &DriveRepository<S> {
        &self.repository
    }

    pub async fn find_all(&self) -> Result<Vec<DriveRecord>> {
        self.repository.find_all().await
    }

    pub async fn find_by_query(&self, query: &str) -> Result<Vec<DriveRecord>> {
        self.repository.find_by_query(query).await
    }

    pub async fn find_by_parent_id(&self, parent_id: &str) -> Result<Vec<DriveRecord>> {
        self.repository.find_by_parent_id(parent_id).await
    }

    pub async fn find_by_file_id(&self, file_id: &str) -> Result<DriveRecord> {
        self.repository.find_by_file_id(file_id).await
    }

    pub async fn upload(&self, local_path: &Path, parent_id: Option<&str>) -> Result<DriveRecord> {
        self.repository.upload(local_path, parent_id).await
    }

    pub async fn download(&self, local_dir: &Path, file_id: &str) -> Result<PathBuf> {
        self.repository.download(local_dir, file_id).await
    }

    pub async fn update(&self, local_path: &Path, file_id: &str) -> Result<DriveRecord> {
        self.repository.update(local_path, file_id).await
    }

    pub async fn delete(&self, file_id: &str) -> Result<()> {
        self.repository.delete(file_id).await
    }

    pub async fn root_id(&self) -> Result<String> {
        self.repository.root_id().await
    }
}
