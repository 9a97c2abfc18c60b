//! Convergence trigger.
//!
//! Hands control to the external configuration-management engine so the
//! node's actual state converges on the active configuration. The engine's
//! own exit code is passed through untranslated; a failed convergence is
//! the engine's report, not ours.

use anyhow::Context;
use async_trait::async_trait;
use log::info;
use tokio::process::Command;

const ENGINE: &str = "salt-call";
const ENGINE_ARGS: [&str; 4] = [
    "--local",
    "--retcode-passthrough",
    "--out=json",
    "state.highstate",
];

#[async_trait]
pub trait ConvergeRunner: Send + Sync {
    /// Runs one convergence pass and returns the engine's exit code.
    async fn converge(&self) -> anyhow::Result<i32>;
}

/// Production runner invoking `salt-call` in local masterless mode.
pub struct SaltCall;

#[async_trait]
impl ConvergeRunner for SaltCall {
    async fn converge(&self) -> anyhow::Result<i32> {
        info!("Running {} {}", ENGINE, ENGINE_ARGS.join(" "));
        let status = Command::new(ENGINE)
            .args(ENGINE_ARGS)
            .status()
            .await
            .with_context(|| format!("failed to run {}", ENGINE))?;
        // A signal-terminated engine carries no code.
        Ok(status.code().unwrap_or(1))
    }
}
