use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Static local configuration, loaded once at process start and immutable
/// for the duration of the run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Hostname of the cluster configuration service.
    pub host: String,
    /// Port of the cluster configuration service.
    pub port: u16,
    /// Stable identity of this node, sent with every generate request.
    pub node_id: String,
    /// Archive path prefix on the service, relative to the endpoint root.
    pub remote_staging_dir: String,
    /// Local directory archives are downloaded to and extracted under.
    pub local_staging_dir: PathBuf,
    /// Well-known symlink the convergence engine reads to find the active
    /// configuration root.
    pub active_link: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "config.cluster.local".into(),
            port: 8080,
            node_id: String::new(),
            remote_staging_dir: "tarballs".into(),
            local_staging_dir: PathBuf::from("/var/lib/confsync/bundles"),
            active_link: PathBuf::from("/etc/confsync/active"),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("confsync.toml"))
            .merge(Json::file("confsync.json"))
            .merge(Env::prefixed("CONFSYNC_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // Node identity falls back to the host name the way containerized
        // deployments expose it.
        if config.node_id.is_empty() {
            if let Ok(hostname) = std::env::var("HOSTNAME") {
                config.node_id = hostname.trim().to_string();
            }
        }
        if config.node_id.is_empty() {
            return Err(anyhow::anyhow!(
                "node_id is not configured and HOSTNAME is unset"
            ));
        }

        Ok(config)
    }
}
