//! Configuration file support for glsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GLSYNC_`, e.g., `GLSYNC_DATABASE_URL`)
//! 3. Config file (~/.config/glsync/config.toml or ./glsync.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/glsync/glsync.db` on
//! Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/glsync/glsync.db"  # optional, this is the default
//!
//! [gitlab]
//! host = "gitlab.com"  # or self-hosted instance
//! client_id = "..."       # OAuth application ID
//! client_secret = "..."   # or use GLSYNC_GITLAB_CLIENT_SECRET env var
//! redirect_uri = "https://app.example.com/oauth/callback"
//!
//! [vault]
//! secret = "..."  # or use GLSYNC_VAULT_SECRET env var
//!
//! [sync]
//! workers = 4
//! requests_per_second = 10
//! project_concurrency = 4
//! enrich_commit_stats = true
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// GitLab platform and OAuth application configuration.
    pub gitlab: GitLabConfig,
    /// Token vault configuration.
    pub vault: VaultConfig,
    /// Default sync options.
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (sqlite:// scheme).
    /// Defaults to `sqlite://~/.local/state/glsync/glsync.db` if not specified.
    pub url: Option<String>,
}

/// GitLab platform configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// GitLab host (e.g., "gitlab.com" or "https://gitlab.example.com").
    /// Can also be set via GLSYNC_GITLAB_HOST.
    pub host: Option<String>,
    /// OAuth application ID.
    pub client_id: Option<String>,
    /// OAuth application secret.
    /// Can also be set via GLSYNC_GITLAB_CLIENT_SECRET.
    pub client_secret: Option<String>,
    /// OAuth redirect URI registered with the application.
    pub redirect_uri: Option<String>,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            host: Some("gitlab.com".to_string()),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
        }
    }
}

/// Token vault configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Secret the vault key is derived from.
    /// Can also be set via GLSYNC_VAULT_SECRET.
    pub secret: Option<String>,
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Worker-pool size for scheduled runs.
    pub workers: usize,
    /// Per-credential API request pacing.
    pub requests_per_second: u32,
    /// Concurrent per-project fetches within one pass.
    pub project_concurrency: usize,
    /// Fetch per-commit line stats via the detail endpoint.
    pub enrich_commit_stats: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: glsync::sync::SCHEDULER_WORKERS,
            requests_per_second: 10,
            project_concurrency: glsync::sync::DEFAULT_PROJECT_CONCURRENCY,
            enrich_commit_stats: true,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/glsync/config.toml)
    /// 3. Local config file (./glsync.toml)
    /// 4. Environment variables with GLSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "glsync") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("glsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./glsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., GLSYNC_DATABASE_URL -> database.url
        builder = builder.add_source(
            Environment::with_prefix("GLSYNC")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter enables read-write access and creates the
    /// file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("glsync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the GitLab host.
    pub fn gitlab_host(&self) -> String {
        self.gitlab
            .host
            .clone()
            .unwrap_or_else(|| "gitlab.com".to_string())
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/glsync` or `~/.local/state/glsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "glsync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
