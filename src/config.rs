use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_FUNCTION_WINDOW_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Connection settings for SupabaseClient
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub anon_key: String,
    pub function_window: Duration, // min gap between two calls to the same edge function
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            function_window: Duration::from_millis(DEFAULT_FUNCTION_WINDOW_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_function_window(mut self, window: Duration) -> Self {
        self.function_window = window;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// SUPABASE_URL and SUPABASE_ANON_KEY are required,
    /// SUPABASE_FUNCTION_WINDOW_MS and SUPABASE_TIMEOUT_SECS optional.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::Config("SUPABASE_URL is not set".to_string()))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::Config("SUPABASE_ANON_KEY is not set".to_string()))?;

        let mut config = Self::new(url, anon_key);
        if let Some(ms) = env_u64("SUPABASE_FUNCTION_WINDOW_MS")? {
            config.function_window = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("SUPABASE_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a whole number, got {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "supabase-kit")]
#[command(about = "Command line access to a Supabase project")]
pub struct Args {
    // Project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub url: String,

    // Anonymous (public) API key
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub anon_key: String,

    // Minimum gap between two calls to the same edge function
    #[arg(long, env = "SUPABASE_FUNCTION_WINDOW_MS", default_value_t = DEFAULT_FUNCTION_WINDOW_MS)]
    pub function_window_ms: u64,

    // Request timeout in seconds
    #[arg(long, env = "SUPABASE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    // Sign in with these credentials before running the command
    #[arg(long, env = "SUPABASE_EMAIL")]
    pub email: Option<String>,

    #[arg(long, env = "SUPABASE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    // Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    // Print prometheus metrics after the command
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.url, &self.anon_key)
            .with_function_window(Duration::from_millis(self.function_window_ms))
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Invoke an edge function
    Invoke {
        name: String,
        /// JSON request body
        #[arg(long, default_value = "{}")]
        body: String,
        /// Override the call window for this invocation
        #[arg(long)]
        window_ms: Option<u64>,
    },
    /// Select rows from a table
    Select {
        table: String,
        #[arg(long, default_value = "*")]
        columns: String,
        /// Equality filter, col=value (repeatable)
        #[arg(long = "eq")]
        eq: Vec<String>,
        /// Membership filter, col=a,b,c (repeatable)
        #[arg(long = "in")]
        in_list: Vec<String>,
        /// Ordering, col or col.desc (repeatable)
        #[arg(long)]
        order: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Call a database function
    Rpc {
        function: String,
        /// JSON parameters
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Upload a local file to a bucket
    Upload {
        bucket: String,
        path: String,
        file: PathBuf,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
        #[arg(long)]
        upsert: bool,
    },
    /// Download an object to a local file
    Download {
        bucket: String,
        path: String,
        out: PathBuf,
    },
    /// Print the public URL of an object
    PublicUrl { bucket: String, path: String },
}
