//! # client: Drive v3 REST implementation of [`RemoteStore`]
//!
//! [`DriveClient`] speaks to `https://www.googleapis.com/drive/v3` with a bearer
//! access token obtained elsewhere (the CLI crate owns authentication). Each
//! trait method is one HTTP round trip, except `list`, which follows
//! `nextPageToken` until the listing is exhausted.
//!
//! File content is never buffered whole: uploads are streamed from disk inside a
//! `multipart/related` body and downloads are streamed into the target file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use crate::contract::RemoteStore;
use crate::error::{DriveError, Result};
use crate::record::{DriveRecord, RecordMetadata, LIST_FIELDS, RECORD_FIELDS};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Content type of the media part. Drive detects the real type from the content.
pub const MEDIA_CONTENT_TYPE: &str = "application/octet-stream";

const PAGE_SIZE: &str = "100";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Drive v3 client bound to one access token.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    access_token: String,
    api_url: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveRecord>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl DriveClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_endpoints(access_token, DEFAULT_API_URL, DEFAULT_UPLOAD_URL)
    }

    /// Build a client against non-default endpoints (proxies, emulators).
    pub fn with_endpoints(
        access_token: impl Into<String>,
        api_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let upload_url = upload_url.into().trim_end_matches('/').to_string();
        debug!(api_url = %api_url, upload_url = %upload_url, "Initialised Drive client");
        Ok(DriveClient {
            http,
            access_token: access_token.into(),
            api_url,
            upload_url,
        })
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api_url)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, file_id)
    }

    fn upload_files_url(&self) -> String {
        format!("{}/files", self.upload_url)
    }

    fn upload_file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.upload_url, file_id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Send `metadata` plus the content of `path` as one `multipart/related` upload.
    async fn send_multipart(
        &self,
        method: Method,
        url: &str,
        metadata: &RecordMetadata,
        path: &Path,
        add_parents: Option<&str>,
    ) -> Result<Response> {
        let file = tokio::fs::File::open(path).await?;
        let file_len = file.metadata().await?.len();

        let boundary = format!("gdrive-{}", uuid::Uuid::new_v4().simple());
        let metadata_json = serde_json::to_string(metadata)?;
        let (head, tail) = related_envelope(&boundary, &metadata_json, MEDIA_CONTENT_TYPE);
        let content_length = head.len() as u64 + file_len + tail.len() as u64;

        let body = stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(head)) })
            .chain(ReaderStream::new(file))
            .chain(stream::once(async move { Ok(Bytes::from(tail)) }));

        let mut query = vec![("uploadType", "multipart"), ("fields", RECORD_FIELDS)];
        if let Some(parents) = add_parents {
            query.push(("addParents", parents));
        }

        debug!(url, path = %path.display(), bytes = file_len, "Sending multipart upload");
        let response = self
            .request(method, url)
            .query(&query)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;
        Ok(response)
    }
}

/// Opening and closing segments around the media part of a `multipart/related` body.
fn related_envelope(boundary: &str, metadata_json: &str, content_type: &str) -> (String, String) {
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata_json}\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");
    (head, tail)
}

/// Turn a non-success response into a [`DriveError`]. A 404 on a request for a
/// specific record becomes `NotFound`.
async fn ensure_success(response: Response, file_id: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    if let (StatusCode::NOT_FOUND, Some(id)) = (status, file_id) {
        return Err(DriveError::NotFound(id.to_string()));
    }
    error!(status = %status, message = %message, "Drive API returned an error");
    Err(DriveError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Stream a response body into a newly created file at `target`.
async fn write_body(response: Response, target: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(target).await?;
    let mut body = std::pin::pin!(response.bytes_stream().map_err(DriveError::from));
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn get(&self, file_id: &str) -> Result<DriveRecord> {
        debug!(file_id, "GET file");
        let response = self
            .request(Method::GET, &self.file_url(file_id))
            .query(&[("fields", RECORD_FIELDS)])
            .send()
            .await?;
        let record = ensure_success(response, Some(file_id))
            .await?
            .json::<DriveRecord>()
            .await?;
        Ok(record)
    }

    async fn list(&self, query: Option<String>) -> Result<Vec<DriveRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("fields", LIST_FIELDS), ("pageSize", PAGE_SIZE)];
            if let Some(q) = query.as_deref() {
                params.push(("q", q));
            }
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            debug!(query = ?query, page_token = ?page_token, "GET file list page");
            let response = self
                .request(Method::GET, &self.files_url())
                .query(&params)
                .send()
                .await?;
            let page = ensure_success(response, None)
                .await?
                .json::<FileList>()
                .await?;

            records.extend(page.files);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn create(
        &self,
        metadata: RecordMetadata,
        content: Option<PathBuf>,
    ) -> Result<DriveRecord> {
        let response = match content {
            Some(path) => {
                self.send_multipart(Method::POST, &self.upload_files_url(), &metadata, &path, None)
                    .await?
            }
            None => {
                debug!(name = %metadata.name, "POST metadata-only file");
                self.request(Method::POST, &self.files_url())
                    .query(&[("fields", RECORD_FIELDS)])
                    .json(&metadata)
                    .send()
                    .await?
            }
        };
        let record = ensure_success(response, None)
            .await?
            .json::<DriveRecord>()
            .await?;
        Ok(record)
    }

    async fn update(
        &self,
        file_id: &str,
        metadata: RecordMetadata,
        add_parents: Option<String>,
        content: Option<PathBuf>,
    ) -> Result<DriveRecord> {
        let response = match content {
            Some(path) => {
                self.send_multipart(
                    Method::PATCH,
                    &self.upload_file_url(file_id),
                    &metadata,
                    &path,
                    add_parents.as_deref(),
                )
                .await?
            }
            None => {
                debug!(file_id, name = %metadata.name, "PATCH metadata");
                let mut params = vec![("fields", RECORD_FIELDS)];
                if let Some(parents) = add_parents.as_deref() {
                    params.push(("addParents", parents));
                }
                self.request(Method::PATCH, &self.file_url(file_id))
                    .query(&params)
                    .json(&metadata)
                    .send()
                    .await?
            }
        };
        let record = ensure_success(response, Some(file_id))
            .await?
            .json::<DriveRecord>()
            .await?;
        Ok(record)
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        debug!(file_id, "DELETE file");
        let response = self
            .request(Method::DELETE, &self.file_url(file_id))
            .send()
            .await?;
        ensure_success(response, Some(file_id)).await?;
        Ok(())
    }

    async fn download_to(&self, file_id: &str, target: PathBuf) -> Result<u64> {
        debug!(file_id, target = %target.display(), "GET file media");
        let response = self
            .request(Method::GET, &self.file_url(file_id))
            .query(&[("alt", "media")])
            .send()
            .await?;
        let response = ensure_success(response, Some(file_id)).await?;

        match write_body(response, &target).await {
            Ok(written) => Ok(written),
            Err(e) => {
                error!(file_id, error = %e, target = %target.display(), "Download interrupted, removing partial file");
                let _ = tokio::fs::remove_file(&target).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_normalised() {
        let client =
            DriveClient::with_endpoints("token", "http://localhost:9000/drive/v3/", "http://localhost:9000/upload/")
                .unwrap();
        assert_eq!(client.files_url(), "http://localhost:9000/drive/v3/files");
        assert_eq!(
            client.file_url("abc"),
            "http://localhost:9000/drive/v3/files/abc"
        );
        assert_eq!(
            client.upload_file_url("abc"),
            "http://localhost:9000/upload/files/abc"
        );
    }

    #[test]
    fn related_envelope_wraps_metadata_and_media() {
        let (head, tail) = related_envelope("b0", r#"{"name":"a.txt"}"#, "text/plain");
        assert_eq!(
            head,
            "--b0\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"a.txt\"}\r\n--b0\r\nContent-Type: text/plain\r\n\r\n"
        );
        assert_eq!(tail, "\r\n--b0--\r\n");
    }

    #[test]
    fn error_envelope_message_is_extracted() {
        let body = r#"{"error":{"code":404,"message":"File not found: xyz.","errors":[]}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.message, "File not found: xyz.");
    }

    #[test]
    fn file_list_page_parses_with_and_without_token() {
        let page: FileList = serde_json::from_str(
            r#"{"nextPageToken":"t2","files":[{"id":"1","name":"a","mimeType":"text/plain","parents":["p"]}]}"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("t2"));
        assert_eq!(page.files.len(), 1);

        let last: FileList = serde_json::from_str(r#"{"files":[]}"#).unwrap();
        assert!(last.next_page_token.is_none());
    }
}
