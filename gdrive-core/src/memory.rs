//! In-memory [`RemoteStore`] standing in for the remote service in tests.
//!
//! It follows the Drive behaviours the repository relies on: the `root` alias,
//! new records defaulting to the root folder as parent, `'<id>' in parents`
//! queries, `addParents` merging, and 404s for unknown or deleted ids.
//! Content type detection is not modelled: records created without a MIME type
//! keep the generic media type.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::MEDIA_CONTENT_TYPE;
use crate::contract::RemoteStore;
use crate::error::{DriveError, Result};
use crate::record::{parent_from_query, DriveRecord, RecordMetadata, FOLDER_MIME_TYPE, ROOT_ALIAS};

const ROOT_ID: &str = "mem-root";

#[derive(Debug, Clone)]
struct Entry {
    record: DriveRecord,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the `root` alias resolves to.
    pub fn root_id(&self) -> &'static str {
        ROOT_ID
    }

    /// Stored content of a file record, if the id exists.
    pub fn content_of(&self, file_id: &str) -> Option<Vec<u8>> {
        self.lock()
            .entries
            .get(file_id)
            .map(|entry| entry.content.clone())
    }

    /// Number of records currently stored, excluding the root folder.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // a poisoned lock only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn root_record() -> DriveRecord {
        DriveRecord {
            id: ROOT_ID.to_string(),
            name: "My Drive".to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: Vec::new(),
        }
    }
}

async fn read_content(content: Option<PathBuf>) -> Result<Option<Vec<u8>>> {
    match content {
        Some(path) => Ok(Some(tokio::fs::read(&path).await?)),
        None => Ok(None),
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn get(&self, file_id: &str) -> Result<DriveRecord> {
        if file_id == ROOT_ALIAS || file_id == ROOT_ID {
            return Ok(Self::root_record());
        }
        self.lock()
            .entries
            .get(file_id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))
    }

    async fn list(&self, query: Option<String>) -> Result<Vec<DriveRecord>> {
        let state = self.lock();
        let records = state.entries.values().map(|entry| &entry.record);
        match query {
            None => Ok(records.cloned().collect()),
            Some(q) => {
                let parent = parent_from_query(&q).ok_or_else(|| DriveError::Api {
                    status: 400,
                    message: format!("Invalid Value: {q}"),
                })?;
                let parent = if parent == ROOT_ALIAS { ROOT_ID } else { parent };
                Ok(records
                    .filter(|record| record.parents.iter().any(|p| p == parent))
                    .cloned()
                    .collect())
            }
        }
    }

    async fn create(
        &self,
        metadata: RecordMetadata,
        content: Option<PathBuf>,
    ) -> Result<DriveRecord> {
        let mime_type = metadata
            .mime_type
            .clone()
            .unwrap_or_else(|| MEDIA_CONTENT_TYPE.to_string());
        let content = read_content(content).await?.unwrap_or_default();

        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        let parents = if metadata.parents.is_empty() {
            vec![ROOT_ID.to_string()]
        } else {
            metadata.parents
        };
        let record = DriveRecord {
            id: id.clone(),
            name: metadata.name,
            mime_type,
            parents,
        };
        state.entries.insert(
            id,
            Entry {
                record: record.clone(),
                content,
            },
        );
        Ok(record)
    }

    async fn update(
        &self,
        file_id: &str,
        metadata: RecordMetadata,
        add_parents: Option<String>,
        content: Option<PathBuf>,
    ) -> Result<DriveRecord> {
        let content = read_content(content).await?;

        let mut state = self.lock();
        let entry = state
            .entries
            .get_mut(file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;

        entry.record.name = metadata.name;
        if let Some(mime) = metadata.mime_type {
            entry.record.mime_type = mime;
        }
        for parent in add_parents.iter().flat_map(|p| p.split(',')) {
            let parent = parent.trim();
            if !parent.is_empty() && !entry.record.parents.iter().any(|p| p == parent) {
                entry.record.parents.push(parent.to_string());
            }
        }
        if let Some(bytes) = content {
            entry.content = bytes;
        }
        Ok(entry.record.clone())
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        self.lock()
            .entries
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))
    }

    async fn download_to(&self, file_id: &str, target: PathBuf) -> Result<u64> {
        let entry = self
            .lock()
            .entries
            .get(file_id)
            .cloned()
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;
        if entry.record.is_folder() {
            return Err(DriveError::Api {
                status: 403,
                message: "Only files with binary content can be downloaded".to_string(),
            });
        }
        tokio::fs::write(&target, &entry.content).await?;
        Ok(entry.content.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_alias_resolves() {
        let store = InMemoryStore::new();
        let root = store.get("root").await.unwrap();
        assert_eq!(root.id, store.root_id());
        assert!(root.is_folder());
    }

    #[tokio::test]
    async fn created_records_default_to_root_parent() {
        let store = InMemoryStore::new();
        let folder = store
            .create(
                RecordMetadata {
                    name: "docs".into(),
                    mime_type: Some(FOLDER_MIME_TYPE.into()),
                    parents: vec![],
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(folder.parents, vec![ROOT_ID.to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unsupported_query_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .list(Some("name contains 'x'".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::Api { status: 400, .. }));
    }
}
