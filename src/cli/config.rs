use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "backdrop-ajax",
    version,
    about = "Headless Backdrop AJAX engine: bind, submit and apply server commands"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: backdrop-ajax.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append lifecycle trace events to this JSON-lines file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the AJAX descriptors a page binds
    Bindings {
        #[command(flatten)]
        page: PageArgs,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Trigger an element and apply recorded responses
    Replay {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        trigger: TriggerArgs,

        /// JSON file with the recorded responses
        #[arg(long)]
        responses: String,

        /// Write the resulting HTML here (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Trigger an element and send its request to a live server
    Submit {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        trigger: TriggerArgs,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Write the resulting HTML here (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct PageArgs {
    /// HTML file of the page
    #[arg(long)]
    pub page: String,

    /// JSON file with the page settings
    #[arg(long)]
    pub settings: Option<String>,

    /// URL the page was served from
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TriggerArgs {
    /// Id of the element to trigger
    #[arg(long)]
    pub element: String,

    /// Event to fire (default: the descriptor's own event)
    #[arg(long)]
    pub event: Option<String>,
}

// ============================================================================
// Config File Schema
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub page: PageConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageConfig {
    /// Default page URL when `--url` is not given.
    pub base_url: Option<String>,

    /// Callback URLs that skip response verification.
    #[serde(default)]
    pub trusted_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    pub path: Option<String>,
}

// Serde default helpers
fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("backdrop-ajax/{}", env!("CARGO_PKG_VERSION")) }

pub const DEFAULT_PAGE_URL: &str = "http://localhost/";

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("backdrop-ajax.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

/// Page URL: CLI > config > default.
pub fn resolve_page_url(cli_url: Option<&str>, config: &AppConfig) -> String {
    cli_url
        .or(config.page.base_url.as_deref())
        .unwrap_or(DEFAULT_PAGE_URL)
        .to_string()
}

/// Trace file: CLI > config.
pub fn resolve_trace_path<'a>(cli_trace: Option<&'a str>, config: &'a AppConfig) -> Option<&'a str> {
    cli_trace.or(config.trace.path.as_deref())
}
