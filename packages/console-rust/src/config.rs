//! Console configuration: where the backend lives and how to talk to it.

use std::time::Duration;

/// Default backend root, as served by the AutoDrive API in development.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines on stderr.
    #[default]
    Pretty,
    /// One JSON object per event on stderr.
    Json,
}

/// Settings shared by every resource client of one console session.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Root of the REST API; resource paths are appended to it.
    pub api_base_url: String,
    /// Maximum time to wait for one HTTP request to complete.
    pub request_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    pub log_format: LogFormat,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("autodrive-console/{}", env!("CARGO_PKG_VERSION")),
            log_format: LogFormat::default(),
        }
    }
}

/// Command-line flags (or environment variables) that build a [`ConsoleConfig`].
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Root URL of the AutoDrive REST API
    #[arg(long = "api-url", env = "AUTODRIVE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", env = "AUTODRIVE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Log output format
    #[arg(long, env = "AUTODRIVE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl From<ConfigArgs> for ConsoleConfig {
    fn from(args: ConfigArgs) -> Self {
        Self {
            api_base_url: args.api_url,
            request_timeout: Duration::from_secs(args.timeout_secs),
            log_format: args.log_format,
            ..Self::default()
        }
    }
}
