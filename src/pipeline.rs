//! Orchestrates one synchronization run.

use anyhow::Result;
use log::info;

use crate::acquire::acquire;
use crate::activate::activate;
use crate::config::Config;
use crate::converge::ConvergeRunner;
use crate::locate::resolve_endpoint;

/// Runs one sync and returns the convergence engine's exit code.
///
/// With a tag: locate the service, acquire the bundle, activate it, then
/// converge. Without a tag: converge directly against whatever is already
/// active, correcting local drift without a version change. Any failure
/// before convergence aborts the run; converging mid-update would apply a
/// half-switched configuration.
pub async fn run(cfg: &Config, tag: Option<&str>, runner: &dyn ConvergeRunner) -> Result<i32> {
    if let Some(tag) = tag {
        let endpoint = resolve_endpoint(&cfg.host, cfg.port).await?;
        let bundle = acquire(&endpoint, tag, cfg).await?;
        activate(&bundle, &cfg.active_link)?;
    } else {
        info!("No tag supplied, re-applying the active configuration");
    }

    runner.converge().await
}
