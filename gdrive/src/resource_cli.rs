//! Command line of `gdrive-resource`, the status-carrying flavour of the tool.
//!
//! Every operation runs through [`DriveResource`], which never returns errors:
//! the exit code is whatever [`Status`] the resource is left in.

use crate::auth::connect;
use crate::cli::{resolve_access_token, DEFAULT_ENCODING};
use anyhow::Result;
use clap::{ArgGroup, Parser};
use gdrive_core::contract::RemoteStore;
use gdrive_core::resource::DriveResource;
use gdrive_core::{DriveRecord, Status};
use std::io::Write;
use std::path::PathBuf;

pub const DEFAULT_CREDENTIALS: &str = "credentials.json";

#[derive(Parser, Debug)]
#[clap(
    name = "gdrive-resource",
    version,
    about = "List, create, delete and export Google Drive files"
)]
#[clap(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["list", "create", "delete", "export"])
))]
pub struct ResourceCli {
    /// Folder to list, and parent of created files
    #[clap(short = 'p', long, value_name = "FILE_ID")]
    pub parent_id: Option<String>,

    /// List files (under --parent-id when given)
    #[clap(short = 'l', long)]
    pub list: bool,

    /// Upload a local file or directory
    #[clap(short = 'c', long, value_name = "PATH")]
    pub create: Option<PathBuf>,

    /// Delete a remote file or directory
    #[clap(short = 'd', long, value_name = "FILE_ID")]
    pub delete: Option<String>,

    /// Download a remote file or directory into a local directory
    #[clap(short = 'e', long, num_args = 2, value_names = ["PATH", "FILE_ID"])]
    pub export: Option<Vec<String>>,

    /// Path to the credential JSON file
    #[clap(long, value_name = "PATH", default_value = DEFAULT_CREDENTIALS)]
    pub credentials: PathBuf,

    /// Encoding of the credential JSON file
    #[clap(long, default_value = DEFAULT_ENCODING)]
    pub encoding: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOperation {
    List,
    Create(PathBuf),
    Delete(String),
    Export { local_dir: PathBuf, file_id: String },
}

impl ResourceOperation {
    pub fn from_cli(cli: &ResourceCli) -> Result<Self> {
        if cli.list {
            return Ok(ResourceOperation::List);
        }
        if let Some(path) = &cli.create {
            return Ok(ResourceOperation::Create(path.clone()));
        }
        if let Some(file_id) = &cli.delete {
            return Ok(ResourceOperation::Delete(file_id.clone()));
        }
        match cli.export.as_deref() {
            Some([local_dir, file_id]) => Ok(ResourceOperation::Export {
                local_dir: PathBuf::from(local_dir),
                file_id: file_id.clone(),
            }),
            Some(_) => anyhow::bail!("--export takes a local directory and a file id"),
            None => anyhow::bail!("one of --list, --create, --delete or --export is required"),
        }
    }
}

fn print_listing<W: Write>(out: &mut W, files: &[DriveRecord]) -> std::io::Result<()> {
    writeln!(out, "File count: {}", files.len())?;
    writeln!(out)?;
    for file in files {
        writeln!(out, "Name: {}", file.name)?;
        writeln!(out, "ID: {}", file.id)?;
        for parent in &file.parents {
            writeln!(out, "Parent ID: {parent}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Run one operation on `resource` and report the status it ends in.
pub async fn execute_resource<S, W>(
    operation: &ResourceOperation,
    resource: &mut DriveResource<S>,
    out: &mut W,
) -> Result<Status>
where
    S: RemoteStore,
    W: Write,
{
    match operation {
        ResourceOperation::List => {
            if let Some(files) = resource.get_files().await {
                print_listing(out, &files)?;
                return Ok(Status::Success);
            }
        }
        ResourceOperation::Create(path) => {
            if let Some(record) = resource.create(path).await {
                tracing::info!(file_id = %record.id, name = %record.name, "Created");
            }
        }
        ResourceOperation::Delete(file_id) => {
            resource.delete(file_id).await;
        }
        ResourceOperation::Export { local_dir, file_id } => {
            if let Some(path) = resource.download(local_dir, file_id).await {
                tracing::info!(path = %path.display(), "Exported");
            }
        }
    }
    Ok(resource.status())
}

pub async fn run_resource(cli: ResourceCli) -> Result<Status> {
    tracing::info!("trace_initialised");

    let operation = ResourceOperation::from_cli(&cli)?;
    tracing::info!(?operation, "Validated operation");

    let access_token = resolve_access_token(&cli.credentials, &cli.encoding).await?;
    let mut resource = DriveResource::new(connect(access_token)?);
    if let Some(parent_id) = &cli.parent_id {
        resource.set_parent_id(parent_id.clone());
    }

    let mut stdout = std::io::stdout();
    execute_resource(&operation, &mut resource, &mut stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdrive_core::memory::InMemoryStore;

    fn parse(args: &[&str]) -> ResourceCli {
        ResourceCli::try_parse_from(std::iter::once("gdrive-resource").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn export_takes_path_and_id() {
        let cli = parse(&["-e", "out", "f1"]);
        assert_eq!(
            ResourceOperation::from_cli(&cli).unwrap(),
            ResourceOperation::Export {
                local_dir: PathBuf::from("out"),
                file_id: "f1".into()
            }
        );
        assert!(ResourceCli::try_parse_from(["gdrive-resource", "--export", "out"]).is_err());
    }

    #[test]
    fn credential_defaults_apply() {
        let cli = parse(&["--list"]);
        assert_eq!(cli.credentials, PathBuf::from(DEFAULT_CREDENTIALS));
        assert_eq!(cli.encoding, DEFAULT_ENCODING);
        assert!(ResourceCli::try_parse_from(["gdrive-resource", "-l", "-d", "x"]).is_err());
    }

    #[tokio::test]
    async fn list_prints_count_then_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let store = InMemoryStore::new();
        let root = store.root_id().to_string();
        let mut resource = DriveResource::new(store);
        let created = resource.create(&path).await.unwrap();
        resource.set_parent_id(root.clone());

        let mut out = Vec::new();
        let status = execute_resource(&ResourceOperation::List, &mut resource, &mut out)
            .await
            .unwrap();
        assert_eq!(status, Status::Success);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!(
                "File count: 1\n\nName: notes.txt\nID: {}\nParent ID: {root}\n\n",
                created.id
            )
        );
    }

    #[tokio::test]
    async fn empty_list_still_succeeds_after_printing() {
        let mut resource = DriveResource::new(InMemoryStore::new());
        let mut out = Vec::new();
        let status = execute_resource(&ResourceOperation::List, &mut resource, &mut out)
            .await
            .unwrap();
        assert_eq!(status, Status::Success);
        assert_eq!(String::from_utf8(out).unwrap(), "File count: 0\n\n");
    }

    #[tokio::test]
    async fn failed_delete_reports_error_status() {
        let mut resource = DriveResource::new(InMemoryStore::new());
        let mut out = Vec::new();
        let status = execute_resource(
            &ResourceOperation::Delete("missing".into()),
            &mut resource,
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(status, Status::Error);
        assert!(out.is_empty());
    }
}
