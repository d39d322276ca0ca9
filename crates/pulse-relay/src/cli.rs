use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pulse-relay",
    version,
    about = "Authenticated WebSocket relay for the realtime voice API"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "relay.yaml")]
    pub config: PathBuf,

    /// Listen address (overrides config file setting)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Upstream realtime API URL (overrides config file setting)
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Credential mode, `static` or `token` (overrides config file setting)
    #[arg(long)]
    pub auth_mode: Option<String>,
}
