///
/// This module implements the `gdrive` command line: flag parsing, validation of
/// the modifiers each operation needs, dispatch into [`DriveService`], and the
/// mapping of the outcome to a [`Status`] (and so to an exit code).
///
/// All drive behaviour lives in the [`gdrive-core`] crate; this module is CLI glue.
///
/// ## Operations
/// Exactly one of `--list`, `--upload`, `--download`, `--modify`, `--remove`.
///
/// | operation    | needs                                 |
/// |--------------|---------------------------------------|
/// | `--list`     | (`--parent-id`, defaults to root)     |
/// | `--upload`   | `--local-path` (`--parent-id`)        |
/// | `--download` | `--local-path`, `--remote-file-id`    |
/// | `--modify`   | `--local-path`, `--remote-file-id`    |
/// | `--remove`   | `--remote-file-id`                    |
///
/// Missing modifiers are reported before the credential file is touched.
///
/// [`gdrive-core`]: ../../gdrive-core/
use crate::auth::{access_token_from_env, authorize, connect};
use crate::credentials::{load_credentials, CredentialEncoding};
use anyhow::{bail, Result};
use clap::{ArgGroup, Parser};
use gdrive_core::contract::RemoteStore;
use gdrive_core::service::DriveService;
use gdrive_core::Status;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

pub const DEFAULT_CLIENT_SECRET: &str = "client_secret/client_secret.json";
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// CLI for gdrive: list, upload, download, modify and remove Google Drive files.
#[derive(Parser, Debug)]
#[clap(
    name = "gdrive",
    version,
    about = "List, upload, download, modify and remove files and folders in Google Drive"
)]
#[clap(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["list", "upload", "download", "modify", "remove"])
))]
pub struct Cli {
    /// Local file or directory to operate on
    #[clap(short = 'L', long, value_name = "PATH")]
    pub local_path: Option<PathBuf>,

    /// File ID of the remote file or directory to operate on
    #[clap(short = 'R', long, value_name = "FILE_ID")]
    pub remote_file_id: Option<String>,

    /// File ID of the parent directory (defaults to the root folder)
    #[clap(short = 'P', long, value_name = "FILE_ID")]
    pub parent_id: Option<String>,

    /// Path to the credential JSON file
    #[clap(short = 'C', long, value_name = "PATH", default_value = DEFAULT_CLIENT_SECRET)]
    pub client_secret: PathBuf,

    /// Encoding of the credential JSON file
    #[clap(short = 'E', long, default_value = DEFAULT_ENCODING)]
    pub encoding: String,

    /// List the files and directories under the parent directory
    #[clap(short = 'l', long)]
    pub list: bool,

    /// Upload a local file or directory
    #[clap(short = 'u', long)]
    pub upload: bool,

    /// Download a remote file or directory into the local directory
    #[clap(short = 'd', long)]
    pub download: bool,

    /// Replace a remote file or directory with the local one
    #[clap(short = 'm', long)]
    pub modify: bool,

    /// Delete a remote file or directory
    #[clap(short = 'r', long)]
    pub remove: bool,
}

/// A validated operation with every modifier it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List {
        parent_id: Option<String>,
    },
    Upload {
        local_path: PathBuf,
        parent_id: Option<String>,
    },
    Download {
        local_path: PathBuf,
        remote_file_id: String,
    },
    Modify {
        local_path: PathBuf,
        remote_file_id: String,
    },
    Remove {
        remote_file_id: String,
    },
}

fn required<T: Clone>(value: &Option<T>, flag: &str) -> Result<T> {
    match value {
        Some(v) => Ok(v.clone()),
        None => {
            tracing::warn!(flag, "Required option missing");
            bail!("{flag} option is required")
        }
    }
}

impl Operation {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.list {
            Ok(Operation::List {
                parent_id: cli.parent_id.clone(),
            })
        } else if cli.upload {
            Ok(Operation::Upload {
                local_path: required(&cli.local_path, "--local-path")?,
                parent_id: cli.parent_id.clone(),
            })
        } else if cli.download {
            Ok(Operation::Download {
                local_path: required(&cli.local_path, "--local-path")?,
                remote_file_id: required(&cli.remote_file_id, "--remote-file-id")?,
            })
        } else if cli.modify {
            Ok(Operation::Modify {
                local_path: required(&cli.local_path, "--local-path")?,
                remote_file_id: required(&cli.remote_file_id, "--remote-file-id")?,
            })
        } else if cli.remove {
            Ok(Operation::Remove {
                remote_file_id: required(&cli.remote_file_id, "--remote-file-id")?,
            })
        } else {
            bail!("one of --list, --upload, --download, --modify or --remove is required")
        }
    }
}

/// Run one validated operation against `service`, writing listings to `out`.
///
/// A completed listing reports [`Status::Uninitialized`] (exit code 0); upload,
/// download, modify and remove report [`Status::Success`] (exit code 2).
pub async fn dispatch<S, W>(
    operation: &Operation,
    service: &DriveService<S>,
    out: &mut W,
) -> Result<Status>
where
    S: RemoteStore,
    W: Write,
{
    match operation {
        Operation::List { parent_id } => {
            let parent_id = match parent_id {
                Some(id) => id.clone(),
                None => service.root_id().await?,
            };
            let records = service.find_by_parent_id(&parent_id).await?;
            for record in &records {
                writeln!(
                    out,
                    "id: {} name: {} mime_type: {}",
                    record.id, record.name, record.mime_type
                )?;
            }
            tracing::info!(command = "list", count = records.len(), "Listed files");
            // listing exits 0, transfers and deletes exit 2
            return Ok(Status::Uninitialized);
        }
        Operation::Upload {
            local_path,
            parent_id,
        } => {
            let record = service.upload(local_path, parent_id.as_deref()).await?;
            tracing::info!(command = "upload", file_id = %record.id, "Upload complete");
        }
        Operation::Download {
            local_path,
            remote_file_id,
        } => {
            let target = service.download(local_path, remote_file_id).await?;
            tracing::info!(command = "download", path = %target.display(), "Download complete");
        }
        Operation::Modify {
            local_path,
            remote_file_id,
        } => {
            let record = service.update(local_path, remote_file_id).await?;
            tracing::info!(command = "modify", file_id = %record.id, "Update complete");
        }
        Operation::Remove { remote_file_id } => {
            service.delete(remote_file_id).await?;
            tracing::info!(command = "remove", file_id = %remote_file_id, "Delete complete");
        }
    }
    Ok(Status::Success)
}

/// Bearer token from `GDRIVE_ACCESS_TOKEN`, or from the credential file.
pub(crate) async fn resolve_access_token(
    credentials_path: &std::path::Path,
    encoding: &str,
) -> Result<String> {
    if let Some(token) = access_token_from_env() {
        tracing::info!("Using access token from environment");
        return Ok(token);
    }
    let encoding: CredentialEncoding = encoding.parse()?;
    let credentials = load_credentials(credentials_path, encoding)?;
    let http = reqwest::Client::new();
    authorize(&credentials, &http).await
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<Status> {
    tracing::info!("trace_initialised");

    let operation = Operation::from_cli(&cli)?;
    tracing::info!(?operation, "Validated operation");

    let access_token = resolve_access_token(&cli.client_secret, &cli.encoding).await?;
    let service = DriveService::new(connect(access_token)?);

    let mut stdout = std::io::stdout();
    dispatch(&operation, &service, &mut stdout).await
}

/// Print a clap error and pick the exit code: help/version succeed, usage
/// errors are local precondition failures.
pub fn parse_error_exit(err: clap::Error) -> ExitCode {
    let _ = err.print();
    if err.use_stderr() {
        Status::Error.into()
    } else {
        ExitCode::SUCCESS
    }
}

/// Log the outcome of a run and turn it into the process exit code.
pub fn finish(result: Result<Status>) -> ExitCode {
    let status = match result {
        Ok(status) => {
            tracing::info!(code = status.code(), "CLI completed");
            status
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("[ERROR] {e:#}");
            Status::Error
        }
    };
    status.into()
}
