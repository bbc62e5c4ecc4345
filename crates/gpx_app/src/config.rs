//! Command line and environment configuration.
//!
//! Values come from flags first, then the environment (a `.env` file in the
//! working directory is loaded before parsing).

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use gpx_engine::{
    Backoff, BackendRoutes, ClientSettings, EngineConfig, PollPolicy, DEFAULT_ROUTE_PREFIX,
};
use gpx_logging::{LogDestination, DEFAULT_LOG_FILE};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Debug, Parser)]
#[command(
    name = "gpx-tools",
    about = "Upload a GPX track to the job engine and save the rendered map"
)]
pub struct Cli {
    /// GPX file to upload
    pub file: PathBuf,

    /// Base URL of the job engine
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Url,

    /// Path prefix rewritten onto the backend URL
    #[arg(long, default_value = DEFAULT_ROUTE_PREFIX)]
    pub route_prefix: String,

    /// Delay between status checks, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub interval_ms: u64,

    /// Give up after this many status checks (default: poll until ready)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Multiply the delay by this factor after every check
    #[arg(long)]
    pub backoff_factor: Option<u32>,

    /// Upper bound for the delay when backing off, in milliseconds
    #[arg(long, default_value_t = 60_000)]
    pub max_interval_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Submit again after a failed upload, up to this many times
    #[arg(long, default_value_t = 0)]
    pub resubmit: u32,

    /// Where to write the rendered map page [default: <FILE stem>_map.html]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// URL of the app, checked against the session gate
    #[arg(long, default_value = "http://localhost:3000/")]
    pub app_url: Url,

    /// Refuse to run without a session token
    #[arg(long)]
    pub require_session: bool,

    #[arg(long, env = "GPX_TOOLS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Call the job engine healthcheck before uploading
    #[arg(long)]
    pub preflight: bool,

    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Everything the app loop needs, resolved from [`Cli`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub file: PathBuf,
    pub output: PathBuf,
    pub engine: EngineConfig,
    pub resubmit: u32,
    pub app_url: Url,
    pub require_session: bool,
    pub session_token: Option<String>,
    pub preflight: bool,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        let path = PathBuf::from(DEFAULT_LOG_FILE);
        match self.log {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(path),
            LogTarget::Both => LogDestination::Both(path),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_millis(self.interval_ms);
        let backoff = match self.backoff_factor {
            Some(factor) if factor > 1 => Backoff::Exponential {
                factor,
                max_interval: Duration::from_millis(self.max_interval_ms.max(self.interval_ms)),
            },
            _ => Backoff::Fixed,
        };
        PollPolicy {
            interval,
            backoff,
            max_attempts: self.max_attempts,
        }
    }

    pub fn into_config(self) -> AppConfig {
        let poll = self.poll_policy();
        let routes =
            BackendRoutes::new(self.backend_url.clone()).with_prefix(&self.route_prefix);
        let client = ClientSettings {
            routes,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        };
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output(&self.file));
        AppConfig {
            file: self.file,
            output,
            engine: EngineConfig { client, poll },
            resubmit: self.resubmit,
            app_url: self.app_url,
            require_session: self.require_session,
            session_token: self.session_token,
            preflight: self.preflight,
        }
    }
}

/// `<stem>_map.html` next to the input file.
pub fn default_output(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("gpx");
    file.with_file_name(format!("{stem}_map.html"))
}
