use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "markerlog",
    version,
    about = "Marker stream logger for network event streams",
    long_about = "Discover labeled-event streams on the local network, attach to a subset of them\n\
                  and print incoming markers as a live, filterable log."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// List streams currently advertised on the network
    Discover(DiscoverArgs),
    /// Connect to streams and print incoming markers
    Watch(WatchArgs),
    /// Show the effective configuration and available backends
    Info(InfoArgs),
}

/// Streaming transport to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-memory transport publishing a fake marker stream
    Simulated,
    /// Lab Streaming Layer (requires the lsl-support feature)
    Lsl,
}

#[derive(Args, Clone)]
pub struct ConfigArgs {
    /// JSON configuration file
    #[arg(long, env = "MARKERLOG_CONFIG")]
    pub config: Option<String>,

    /// Streaming backend
    #[arg(long, value_enum, default_value_t = Backend::Simulated, env = "MARKERLOG_BACKEND")]
    pub backend: Backend,

    /// Discovery timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Maximum number of log entries kept
    #[arg(long)]
    pub log_capacity: Option<usize>,

    /// Maximum samples decoded per stream per tick
    #[arg(long)]
    pub max_batch: Option<usize>,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Markers published per tick by the simulated backend
    #[arg(long, default_value_t = 1)]
    pub markers_per_tick: usize,
}

#[derive(Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Stream names to connect to
    #[arg(long = "stream", num_args = 1..)]
    pub streams: Vec<String>,

    /// Connect to every discovered stream
    #[arg(long, default_value_t = false, conflicts_with = "streams")]
    pub all: bool,

    /// Only show markers whose content contains this text
    #[arg(long, default_value = "")]
    pub content_filter: String,

    /// Only show markers from streams whose name contains this text
    #[arg(long, default_value = "")]
    pub stream_filter: String,

    /// Stop after this many ticks (default: run until Ctrl-C)
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Print entries as JSON lines
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress the summary on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
