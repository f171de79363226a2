//! # record: remote file/directory metadata
//!
//! A [`DriveRecord`] is the projection of a Drive file resource this crate reads
//! back from the API: id, name, MIME type and parent ids. Everything else the
//! service stores is ignored by requesting only [`RECORD_FIELDS`].

use serde::{Deserialize, Serialize};

/// MIME type Drive uses to mark a record as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Field projection for single-record requests.
pub const RECORD_FIELDS: &str = "id,name,mimeType,parents";

/// Field projection for list requests.
pub const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,parents)";

/// Alias Drive resolves to the id of the user's root folder.
pub const ROOT_ALIAS: &str = "root";

/// A remote file or directory as exposed by the storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveRecord {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Metadata body sent when creating or updating a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Search query selecting the direct children of `parent_id`.
pub fn parent_query(parent_id: &str) -> String {
    format!("'{parent_id}' in parents")
}

/// Extracts the parent id back out of a query built by [`parent_query`].
pub fn parent_from_query(query: &str) -> Option<&str> {
    query
        .trim()
        .strip_suffix("in parents")?
        .trim()
        .strip_prefix('\'')?
        .strip_suffix('\'')
}
