//! Clap derive structures for the `prepdesk` CLI.
//!
//! Only clap and clap_complete are used here; `build.rs` includes this file
//! to render man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// prepdesk -- front-desk attendance check-in from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "prepdesk",
    version,
    about = "Mark attendance and manage PrepDesk sessions from the command line",
    long_about = "Scan-free attendance check-in for PrepDesk institutes.\n\n\
        Give `checkin` the link encoded in the front-desk QR code (or the bare\n\
        token) and a phone number; the location comes from the profile, the\n\
        command-line flags, or a geo-IP endpoint.",
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
    /// Institute profile to use
    #[arg(long, short = 'p', env = "PREPDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, short = 'u', env = "PREPDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Internal-access key sent with every request
    #[arg(long, env = "PREPDESK_INTERNAL_KEY", global = true, hide_env = true)]
    pub internal_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PREPDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "PREPDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mark attendance from a front-desk QR code
    #[command(alias = "in")]
    Checkin(CheckinArgs),

    /// Inspect QR tokens
    Token(TokenArgs),

    /// Sign in to the institute API
    Login(LoginArgs),

    /// End the current session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Check-in ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckinArgs {
    /// Attendance link from the QR code (…/attendance or …/attendance?token=…)
    #[arg(long, conflicts_with = "token")]
    pub url: Option<String>,

    /// Bare QR token (omit for the static QR code)
    #[arg(long)]
    pub token: Option<String>,

    /// Student phone number (prompted for when omitted on a terminal)
    #[arg(long, short = 'n')]
    pub phone: Option<String>,

    /// Fixed latitude (requires --longitude)
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    /// Fixed longitude (requires --latitude)
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    /// Geo-IP endpoint returning {"latitude", "longitude"}
    #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
    pub geolocation_url: Option<String>,

    /// Never prompt; fail instead
    #[arg(long)]
    pub no_input: bool,
}

// ── Token ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Decode a QR token (or attendance link) and report whether it is usable today
    Inspect {
        /// Token or attendance link
        token: String,
    },
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (prompted for when omitted)
    #[arg(long, short = 'e', env = "PREPDESK_EMAIL")]
    pub email: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,
    /// Show the resolved configuration
    Show,
    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
