// Flags shared by both binaries (SPEC_FULL.md §1/§8). Secrets and
// per-environment wiring stay in the environment (`Config::from_env`);
// clap only covers the handful of flags an operator might flip per-run.

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Clone, Debug)]
pub struct LogArgs {
    /// Minimum log level.
    #[clap(long, default_value = "info")]
    pub log_level: LevelFilter,

    /// Directory for the daily-rotated log file.
    #[clap(long, default_value = "logs")]
    pub log_dir: String,

    /// Skip writing logs to disk, stdout only.
    #[clap(long)]
    pub disable_file_logging: bool,

    /// Disable ANSI colors in stdout log lines.
    #[clap(long)]
    pub disable_log_color: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "besuscan-listener", about = "BesuScan block/mempool/event-log listeners")]
pub struct ListenerArgs {
    #[clap(flatten)]
    pub log: LogArgs,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "besuscan-worker", about = "BesuScan queue consumers and metrics endpoint")]
pub struct WorkerArgs {
    #[clap(flatten)]
    pub log: LogArgs,

    /// Address the Prometheus `/metrics` endpoint binds to.
    #[clap(long, default_value = "0.0.0.0:9898")]
    pub metrics_bind_address: String,
}
