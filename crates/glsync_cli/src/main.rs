//! glsync CLI - command-line interface for the GitLab sync engine.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "glsync")]
#[command(version)]
#[command(about = "GitLab activity synchronization engine")]
#[command(
    long_about = "glsync connects per-user GitLab accounts over OAuth and incrementally \
synchronizes commits, issues, and merge requests into a local activity store. \
Reads and analytics are served from the store; the platform is only contacted \
by sync passes."
)]
#[command(after_long_help = r#"EXAMPLES
    Apply database migrations:
        $ glsync migrate up

    Connect a user with an OAuth authorization code:
        $ glsync connect --user 7a0f... --code abc123

    Run a sync pass for one user:
        $ glsync sync --user 7a0f...

    Sync every active integration:
        $ glsync sync --all

    Show stored commits, refreshing first:
        $ glsync commits --user 7a0f... --refresh --limit 20

    Activity analytics over the last 30 days as JSON:
        $ glsync analytics --user 7a0f... --json

CONFIGURATION
    glsync reads configuration from:
      1. ~/.config/glsync/config.toml (or $XDG_CONFIG_HOME/glsync/config.toml)
      2. ./glsync.toml
      3. Environment variables (GLSYNC_* prefix)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GLSYNC_DATABASE_URL             Database connection string (default: ~/.local/state/glsync/glsync.db)
    GLSYNC_GITLAB_HOST              GitLab host (default: gitlab.com)
    GLSYNC_GITLAB_CLIENT_ID         OAuth application ID
    GLSYNC_GITLAB_CLIENT_SECRET     OAuth application secret
    GLSYNC_GITLAB_REDIRECT_URI      OAuth redirect URI
    GLSYNC_VAULT_SECRET             Secret the token vault key is derived from
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Connect a user's GitLab account with an OAuth authorization code
    Connect {
        /// User to connect
        #[arg(short, long)]
        user: Uuid,

        /// Authorization code from the OAuth redirect
        #[arg(short, long)]
        code: String,

        /// Redirect URI used in the authorization request (overrides config)
        #[arg(short, long)]
        redirect_uri: Option<String>,
    },
    /// Show a user's connection status
    Status {
        /// User to inspect
        #[arg(short, long)]
        user: Uuid,
    },
    /// Run sync passes
    Sync {
        /// Sync one user
        #[arg(short, long, conflicts_with = "all")]
        user: Option<Uuid>,

        /// Sync every active integration
        #[arg(short, long)]
        all: bool,
    },
    /// List stored commits for a user
    Commits {
        /// User whose commits to list
        #[arg(short, long)]
        user: Uuid,

        /// Restrict to one project ID
        #[arg(short, long)]
        project: Option<i64>,

        /// Only commits from the last N days
        #[arg(short, long)]
        since_days: Option<i64>,

        /// Maximum number of commits
        #[arg(short, long, default_value_t = 50)]
        limit: u64,

        /// Run a sync pass before reading
        #[arg(short = 'r', long)]
        refresh: bool,
    },
    /// Activity analytics over stored records
    Analytics {
        /// User whose activity to aggregate
        #[arg(short, long)]
        user: Uuid,

        /// Window in days ending now
        #[arg(short, long, default_value_t = 30)]
        days: i64,

        /// Emit the full report as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Disconnect a user's integration (history is kept)
    Disconnect {
        /// User to disconnect
        #[arg(short, long)]
        user: Uuid,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging in non-TTY mode only; interactive runs get the
    // styled console output instead.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("glsync=info,glsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .expect("Failed to determine database URL - this should not happen");

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Connect {
            user,
            code,
            redirect_uri,
        } => {
            let service = commands::shared::build_service(&config, &database_url).await?;
            commands::connect::handle_connect(&service, &config, user, &code, redirect_uri).await?;
        }
        Commands::Status { user } => {
            let service = commands::shared::build_service(&config, &database_url).await?;
            commands::status::handle_status(&service, user).await?;
        }
        Commands::Sync { user, all } => {
            let service = commands::shared::build_service(&config, &database_url).await?;
            commands::sync::handle_sync(&service, user, all).await?;
        }
        Commands::Commits {
            user,
            project,
            since_days,
            limit,
            refresh,
        } => {
            let service = commands::shared::build_service(&config, &database_url).await?;
            commands::commits::handle_commits(&service, user, project, since_days, limit, refresh)
                .await?;
        }
        Commands::Analytics { user, days, json } => {
            let service = commands::shared::build_service(&config, &database_url).await?;
            commands::analytics::handle_analytics(&service, user, days, json).await?;
        }
        Commands::Disconnect { user } => {
            let service = commands::shared::build_service(&config, &database_url).await?;
            commands::disconnect::handle_disconnect(&service, user).await?;
        }
    }

    Ok(())
}
