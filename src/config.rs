use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MULTIPART_MAX_MEMORY: usize = 32 << 20;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Prefix prepended to object keys to build public URLs.
    pub result_url_prefix: String,
    /// Highlighting theme name.
    pub style: String,
    pub logo_url: String,
    pub index_url: String,
    pub favicon_url: String,
    /// Upper bound for an upload request body, in bytes.
    pub multipart_max_memory: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal paste hosting service")]
pub struct Args {
    /// Host to bind to (overrides PASTE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PASTE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides PASTE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides PASTE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public URL prefix for stored objects (overrides PASTE_STORE_RESULT_URL_PREFIX)
    #[arg(long)]
    pub result_url_prefix: Option<String>,

    /// Highlighting theme (overrides PASTE_STORE_STYLE)
    #[arg(long)]
    pub style: Option<String>,

    /// Logo URL shown on pages (overrides PASTE_STORE_LOGO_URL)
    #[arg(long)]
    pub logo_url: Option<String>,

    /// Index URL linked from pages (overrides PASTE_STORE_INDEX_URL)
    #[arg(long)]
    pub index_url: Option<String>,

    /// Favicon URL (overrides PASTE_STORE_FAVICON_URL)
    #[arg(long)]
    pub favicon_url: Option<String>,

    /// Maximum upload body size in bytes (overrides PASTE_STORE_MULTIPART_MAX_MEMORY)
    #[arg(long)]
    pub multipart_max_memory: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args)?, migrate))
    }

    /// Merge parsed CLI arguments over environment values and defaults.
    pub fn merge(args: Args) -> Result<Self> {
        let env_host = env::var("PASTE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("PASTE_STORE_PORT", 3000u16)?;
        let env_storage =
            env::var("PASTE_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("PASTE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/paste_store.db".into());
        let env_prefix = env::var("PASTE_STORE_RESULT_URL_PREFIX").unwrap_or_else(|_| "/".into());
        let env_style = env::var("PASTE_STORE_STYLE").unwrap_or_else(|_| "InspiredGitHub".into());
        let env_logo = env::var("PASTE_STORE_LOGO_URL").unwrap_or_default();
        let env_index = env::var("PASTE_STORE_INDEX_URL").unwrap_or_else(|_| "/".into());
        let env_favicon = env::var("PASTE_STORE_FAVICON_URL").unwrap_or_default();
        let env_max_memory =
            parse_env("PASTE_STORE_MULTIPART_MAX_MEMORY", DEFAULT_MULTIPART_MAX_MEMORY)?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            result_url_prefix: args.result_url_prefix.unwrap_or(env_prefix),
            style: args.style.unwrap_or(env_style),
            logo_url: args.logo_url.unwrap_or(env_logo),
            index_url: args.index_url.unwrap_or(env_index),
            favicon_url: args.favicon_url.unwrap_or(env_favicon),
            multipart_max_memory: args.multipart_max_memory.unwrap_or(env_max_memory),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
