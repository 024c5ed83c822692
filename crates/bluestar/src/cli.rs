//! Clap derive structures for the `bluestar` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bluestar -- control Bluestar smart air conditioners from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "bluestar",
    version,
    about = "Control Bluestar smart air conditioners from the command line",
    long_about = "Talks to the Bluestar Smart AC cloud: lists units, reads their state,\n\
        and applies control changes through the MQTT broker with REST fallbacks.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "BLUESTAR_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Registered phone number (overrides profile)
    #[arg(long, env = "BLUESTAR_PHONE", global = true, hide_env_values = true)]
    pub phone: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "BLUESTAR_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BLUESTAR_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip the MQTT broker and control over REST only
    #[arg(long, env = "BLUESTAR_NO_BROKER", global = true)]
    pub no_broker: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BLUESTAR_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List air conditioners on the account
    #[command(alias = "ls", alias = "d")]
    Devices,

    /// Show the current state of one unit
    #[command(alias = "st")]
    Status(DeviceArg),

    /// Change power, mode, temperature, fan, swing or display
    #[command(alias = "ctl")]
    Control(ControlArgs),

    /// Ask a unit to re-report its state
    Sync(DeviceArg),

    /// Poll the account and print every change until Ctrl-C
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArg {
    /// Device (thing) ID or display name
    pub device: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(t: Toggle) -> Self {
        t == Toggle::On
    }
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("changes")
        .required(true)
        .multiple(true)
        .args(["power", "mode", "temp", "fan", "vswing", "hswing", "display"])
))]
pub struct ControlArgs {
    /// Device (thing) ID or display name
    pub device: String,

    /// Turn the unit on or off
    #[arg(long)]
    pub power: Option<Toggle>,

    /// Operating mode code (e.g. 0 fan, 1 heat/auto, 2 cool, 3 dry)
    #[arg(long)]
    pub mode: Option<i64>,

    /// Target temperature in °C
    #[arg(long, short = 't', allow_negative_numbers = true)]
    pub temp: Option<f64>,

    /// Fan speed code
    #[arg(long)]
    pub fan: Option<i64>,

    /// Vertical swing code
    #[arg(long)]
    pub vswing: Option<i64>,

    /// Horizontal swing code
    #[arg(long)]
    pub hswing: Option<i64>,

    /// Front panel display
    #[arg(long)]
    pub display: Option<Toggle>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Polling period in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
