//! Bundle acquirer.
//!
//! Three steps against the configuration service: ask it to *generate* a
//! bundle for the requested tag, *download* the archive it names, and
//! *extract* that archive under the local staging root. Each step is fatal
//! on failure, and extraction never leaves a complete-looking bundle
//! directory behind when it did not fully succeed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::SyncError;
use crate::locate::Endpoint;

const GENERATE_PATH: &str = "configuration/generate";

/// Per-request ceiling; a hung service must not stall the node forever.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    tag: Option<&'a str>,
    node: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    result: Option<String>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: i64,
    message: String,
}

/// Acquires the bundle for `tag` and returns its extracted directory.
pub async fn acquire(endpoint: &Endpoint, tag: &str, cfg: &Config) -> Result<PathBuf, SyncError> {
    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| SyncError::Generation {
            tag: tag.to_string(),
            detail: e.to_string(),
        })?;

    let name = generate(&client, endpoint, tag, &cfg.node_id).await?;
    info!("Service generated bundle \"{}\" for tag \"{}\"", name, tag);

    let archive = download(&client, endpoint, &name, cfg).await?;
    info!("Downloaded bundle archive to {}", archive.display());

    // The tar API is synchronous; keep it off the async workers.
    let staging = cfg.local_staging_dir.clone();
    let task_archive = archive.clone();
    let task_name = name.clone();
    let bundle = tokio::task::spawn_blocking(move || unpack(&task_archive, &staging, &task_name))
        .await
        .map_err(|e| SyncError::Extract {
            archive: archive.clone(),
            detail: e.to_string(),
        })??;
    info!("Extracted bundle to {}", bundle.display());

    Ok(bundle)
}

/// Asks the service to generate a bundle; returns the server-chosen bundle
/// name, which is independent of the requested tag.
async fn generate(
    client: &Client,
    endpoint: &Endpoint,
    tag: &str,
    node_id: &str,
) -> Result<String, SyncError> {
    let fail = |detail: String| SyncError::Generation {
        tag: tag.to_string(),
        detail,
    };

    let url = endpoint.join(GENERATE_PATH);
    let body = GenerateRequest {
        tag: Some(tag),
        node: node_id,
    };

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;
    let status = response.status();
    let text = response.text().await.map_err(|e| fail(e.to_string()))?;

    let reply: GenerateReply = serde_json::from_str(&text)
        .map_err(|_| fail(format!("unrecognized response (status {}): {}", status, text)))?;

    // An error-shaped reply is a hard stop, same as a transport failure.
    if let Some(err) = reply.error {
        return Err(SyncError::Rejected {
            tag: tag.to_string(),
            code: err.code,
            message: err.message,
        });
    }
    // A non-2xx answer is a failed generation no matter what the body says.
    if !status.is_success() {
        return Err(fail(format!("server returned {}: {}", status, text)));
    }
    match reply.result {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(fail(format!(
            "response carried neither result nor error (status {})",
            status
        ))),
    }
}

/// Fetches `<remote_staging_dir>/<name>.tar.gz` into the local staging
/// directory and returns the archive path.
async fn download(
    client: &Client,
    endpoint: &Endpoint,
    name: &str,
    cfg: &Config,
) -> Result<PathBuf, SyncError> {
    let remote = format!(
        "{}/{}.tar.gz",
        cfg.remote_staging_dir.trim_matches('/'),
        name
    );
    let url = endpoint.join(&remote);
    let fail = |detail: String| SyncError::Download {
        url: url.clone(),
        detail,
    };

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("server returned {}", response.status())));
    }
    let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;

    tokio::fs::create_dir_all(&cfg.local_staging_dir)
        .await
        .map_err(|e| fail(e.to_string()))?;
    let local = cfg.local_staging_dir.join(format!("{}.tar.gz", name));
    tokio::fs::write(&local, &bytes)
        .await
        .map_err(|e| fail(e.to_string()))?;

    Ok(local)
}

/// Unpacks `archive` inside a scratch directory under `staging`, then
/// renames the bundle directory into its final place. On any failure the
/// final path is left untouched; the scratch directory is removed when
/// dropped.
fn unpack(archive: &Path, staging: &Path, name: &str) -> Result<PathBuf, SyncError> {
    let fail = |detail: String| SyncError::Extract {
        archive: archive.to_path_buf(),
        detail,
    };

    let scratch = tempfile::tempdir_in(staging).map_err(|e| fail(e.to_string()))?;
    let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball
        .unpack(scratch.path())
        .map_err(|e| fail(e.to_string()))?;

    let unpacked = scratch.path().join(name);
    if !unpacked.is_dir() {
        return Err(fail(format!(
            "archive did not contain a \"{}\" directory",
            name
        )));
    }

    // The active link may resolve to the current destination when the
    // server reuses a bundle name, so the old directory is displaced into
    // the scratch directory rather than deleted; it is reclaimed on drop.
    let dest = staging.join(name);
    let displaced = scratch.path().join("previous");
    let had_previous = dest.exists();
    if had_previous {
        std::fs::rename(&dest, &displaced).map_err(|e| fail(e.to_string()))?;
    }
    if let Err(e) = std::fs::rename(&unpacked, &dest) {
        // Put the previous bundle back so the active link stays valid.
        if had_previous {
            let _ = std::fs::rename(&displaced, &dest);
        }
        return Err(fail(e.to_string()));
    }

    Ok(dest)
}
