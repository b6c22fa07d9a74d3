use clap::Parser;

/// Command-line surface for the composition-root binary (spec §2.A —
/// `clap` derive, matching `kftui`'s style in the teacher workspace).
#[derive(Parser, Debug)]
#[command(name = "venuectl")]
#[command(about = "Centralised controller for venue A/V equipment")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON config document.
    #[arg(short = 'c', long, default_value = "./config.json", value_name = "PATH")]
    pub config: String,

    /// Overrides RUST_LOG for this process, e.g. "debug" or "venuectl_monitor=trace".
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Runs a single monitor sweep and exits instead of starting the scheduler daemon.
    #[arg(long)]
    pub one_shot: bool,
}
