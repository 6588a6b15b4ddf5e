/// `load_config` module: reads the YAML run configuration and injects secrets from the environment.
///
/// The YAML file never holds secrets. The Innovator password comes from
/// `INNOVATOR_PASSWORD` (or an interactive prompt when it is unset) and the
/// HyperThought token from `HYPERTHOUGHT_TOKEN`, read when the client is built.
///
/// # Accepted YAML
/// ```yaml
/// innovator:
///   base_url: http://plm.example.com/InnovatorServer
///   client_id: IOMApp
///   database: InnovatorSolutions
///   username: admin
/// hyperthought:
///   base_url: https://hyperthought.example.com
/// transfer:
///   space_id: 3f1c...
///   path: ",folder-pk,"   # optional
///   bom_file: ./assembly-bom.csv
/// ```
use anyhow::{Context, Result};
use innovator_sync_core::session::Credentials;
use innovator_sync_core::transfer::TransferConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const PASSWORD_ENV: &str = "INNOVATOR_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct InnovatorSection {
    pub base_url: String,
    pub client_id: String,
    pub database: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HyperThoughtSection {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferSection {
    pub space_id: String,
    #[serde(default)]
    pub path: Option<String>,
    pub bom_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub innovator: InnovatorSection,
    pub hyperthought: HyperThoughtSection,
    pub transfer: TransferSection,
}

impl CliConfig {
    /// The transfer section, with a relative BOM path resolved against `base_dir`.
    pub fn transfer_config(&self, base_dir: &Path) -> TransferConfig {
        let bom_file = if self.transfer.bom_file.is_absolute() {
            self.transfer.bom_file.clone()
        } else {
            base_dir.join(&self.transfer.bom_file)
        };
        TransferConfig {
            space_id: self.transfer.space_id.clone(),
            path: self.transfer.path.clone(),
            bom_file,
        }
    }

    pub fn credentials(&self, password: String) -> Credentials {
        Credentials {
            base_url: self.innovator.base_url.clone(),
            client_id: self.innovator.client_id.clone(),
            database: self.innovator.database.clone(),
            username: self.innovator.username.clone(),
            password,
        }
    }
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.transfer.space_id.trim().is_empty() {
        error!(config_path = ?path_ref, "transfer.space_id is empty");
        anyhow::bail!("transfer.space_id must not be empty");
    }
    Ok(config)
}

/// `INNOVATOR_PASSWORD` if set and non-empty.
pub fn password_from_env() -> Option<String> {
    env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}

/// Password from the environment, or asked for without echo.
pub fn resolve_password(username: &str) -> Result<String> {
    if let Some(password) = password_from_env() {
        info!(variable = PASSWORD_ENV, "Using Innovator password from environment");
        return Ok(password);
    }
    warn!(variable = PASSWORD_ENV, "Innovator password not in environment, prompting");
    dialoguer::Password::new()
        .with_prompt(format!("Innovator password for {username}"))
        .interact()
        .context("Failed to read the Innovator password")
}
