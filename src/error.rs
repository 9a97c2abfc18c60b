//! Error taxonomy for the sync pipeline.
//!
//! Every variant is fatal to the run: nothing in the acquisition or
//! activation chain is retried, and a failed run must abort before the
//! convergence engine is invoked.

use std::path::PathBuf;

use thiserror::Error;

/// A fatal failure in the acquisition/activation pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Resolving the configuration service hostname failed, or the name
    /// yielded no addresses.
    #[error("resolving configuration service host {host}: {detail}")]
    Resolution { host: String, detail: String },

    /// The generate request failed in transport, or the response body was
    /// not one of the two recognized shapes.
    #[error("generating configuration for tag \"{tag}\": {detail}")]
    Generation { tag: String, detail: String },

    /// The service answered with its error shape. Carries the
    /// server-reported code and message verbatim.
    #[error("configuration service rejected tag \"{tag}\": code {code}, {message}")]
    Rejected {
        tag: String,
        code: i64,
        message: String,
    },

    /// Fetching the bundle archive or writing it locally failed.
    #[error("downloading bundle archive {url}: {detail}")]
    Download { url: String, detail: String },

    /// The archive was corrupt, incomplete, or could not be unpacked.
    #[error("extracting bundle archive {}: {detail}", .archive.display())]
    Extract { archive: PathBuf, detail: String },

    /// The active-configuration link could not be repointed.
    #[error("activating bundle {}: {detail}", .bundle.display())]
    Activation { bundle: PathBuf, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_carries_server_code_and_message() {
        let err = SyncError::Rejected {
            tag: "v7".into(),
            code: 42,
            message: "x".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("x"));
        assert!(msg.contains("v7"));
    }

    #[test]
    fn extract_display_names_the_archive() {
        let err = SyncError::Extract {
            archive: PathBuf::from("/var/lib/confsync/bundles/v7.tar.gz"),
            detail: "unexpected EOF".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("v7.tar.gz"));
        assert!(msg.contains("unexpected EOF"));
    }
}
