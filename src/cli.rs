use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "hive-backend", about = "Hive social platform backend", version)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: String,

    /// Override the configured listen port.
    #[arg(short, long)]
    pub port: Option<u16>,
}
