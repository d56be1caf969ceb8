use clap::Parser;
use std::path::PathBuf;

/// Polls MidNite Classic charge controllers over Modbus/TCP
#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Poll interval in milliseconds, overrides the config file
    #[clap(short = 'i', long = "interval")]
    pub interval_ms: Option<u64>,

    /// Additional controllers to poll, as HOST[:PORT]
    #[clap(value_name = "HOST[:PORT]")]
    pub hosts: Vec<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn default_config_file() -> PathBuf {
        if cfg!(debug_assertions) {
            "./classic2mqtt.yaml".into()
        } else {
            "/etc/classic2mqtt.yaml".into()
        }
    }
}
