/// `credentials` module: reads the credential JSON handed to the authentication step.
///
/// The file path and its text encoding are both user-configurable (`--client-secret`,
/// `--encoding`). Three shapes are accepted, tried in this order:
///
/// 1. an authorised-user file (`client_id`, `client_secret`, `refresh_token`),
///    as written by `gcloud auth application-default login`;
/// 2. an OAuth client secret downloaded from the cloud console
///    (`{"installed": {...}}` or `{"web": {...}}`), whose refresh token is supplied
///    through the `GDRIVE_REFRESH_TOKEN` environment variable;
/// 3. a bare `{"access_token": "..."}`.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Text encodings accepted for the credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEncoding {
    Utf8,
    /// UTF-16 with byte-order detection, big-endian when no BOM is present.
    Utf16,
    Utf16Le,
    Utf16Be,
}

impl FromStr for CredentialEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalised: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalised.as_str() {
            "UTF8" => Ok(CredentialEncoding::Utf8),
            "UTF16" => Ok(CredentialEncoding::Utf16),
            "UTF16LE" => Ok(CredentialEncoding::Utf16Le),
            "UTF16BE" => Ok(CredentialEncoding::Utf16Be),
            _ => Err(anyhow!("Unsupported credential file encoding: {s}")),
        }
    }
}

impl CredentialEncoding {
    /// Decode raw file bytes, dropping a leading byte-order mark.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            CredentialEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                Ok(String::from_utf8(bytes.to_vec())?)
            }
            CredentialEncoding::Utf16 => match bytes {
                [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
                [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
                _ => decode_utf16(bytes, u16::from_be_bytes),
            },
            CredentialEncoding::Utf16Le => {
                let bytes = bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes);
                decode_utf16(bytes, u16::from_le_bytes)
            }
            CredentialEncoding::Utf16Be => {
                let bytes = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
                decode_utf16(bytes, u16::from_be_bytes)
            }
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        bail!("UTF-16 input has an odd number of bytes");
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    Ok(String::from_utf16(&units)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSecret {
    Installed(OAuthClient),
    Web(OAuthClient),
}

impl ClientSecret {
    pub fn client(&self) -> &OAuthClient {
        match self {
            ClientSecret::Installed(c) | ClientSecret::Web(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticToken {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    AuthorizedUser(AuthorizedUser),
    ClientSecret(ClientSecret),
    AccessToken(StaticToken),
}

/// Parse credential JSON already decoded to text.
pub fn parse_credentials(content: &str) -> Result<Credentials> {
    serde_json::from_str(content).map_err(|e| {
        anyhow!("Failed to parse credential file: expected an authorised-user, client secret or access token JSON document ({e})")
    })
}

/// Read and parse the credential file at `path` using `encoding`.
pub fn load_credentials<P: AsRef<Path>>(path: P, encoding: CredentialEncoding) -> Result<Credentials> {
    let path_ref = path.as_ref();
    info!(credentials_path = ?path_ref, ?encoding, "Loading credentials from file");

    let bytes = match fs::read(path_ref) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = ?e, credentials_path = ?path_ref, "Failed to read credential file");
            return Err(anyhow!(
                "Failed to read credential file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let content = encoding.decode(&bytes).map_err(|e| {
        error!(error = %e, credentials_path = ?path_ref, "Failed to decode credential file");
        anyhow!("Failed to decode credential file {:?} as {:?}: {}", path_ref, encoding, e)
    })?;

    let credentials = parse_credentials(&content)?;
    info!(credentials_path = ?path_ref, "Parsed credential file successfully");
    Ok(credentials)
}
