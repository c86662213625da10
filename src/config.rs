//! CLI arguments and server configuration defaults.

use clap::Parser;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FTP_USERNAME: &str = "ftpuser";
pub const DEFAULT_FTP_PASSWORD: &str = "ftp-pass";
pub const DEFAULT_STORAGE_NODE_PORT: u16 = 8090;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STORAGE_NODE_ROOT: &str = "/";

/// CLI arguments and environment configuration for the coordinator.
///
/// `metadata_host`/`metadata_user`/`metadata_password` are accepted for
/// compatibility with deployments that still set them, but are unused: the
/// directory tree is held in-process (`tree.rs`) rather than in an external
/// document database.
#[derive(Parser, Debug)]
#[command(name = "ns-coordinator", about = "Distributed file system name server coordinator")]
pub struct Args {
    #[arg(long, env = "NS_BIND", default_value = DEFAULT_BIND, help = "HTTP bind address")]
    pub bind: String,
    #[arg(long, env = "NS_PORT", default_value_t = DEFAULT_PORT, help = "HTTP port")]
    pub port: u16,
    #[arg(
        long,
        env = "FTP_USERNAME",
        default_value = DEFAULT_FTP_USERNAME,
        help = "FTP login used against every storage node"
    )]
    pub ftp_username: String,
    #[arg(
        long,
        env = "FTP_PASSWORD",
        default_value = DEFAULT_FTP_PASSWORD,
        help = "FTP password used against every storage node"
    )]
    pub ftp_password: String,
    #[arg(
        long,
        env = "STORAGE_NODE_PORT",
        default_value_t = DEFAULT_STORAGE_NODE_PORT,
        help = "Port for each storage node's HTTP side-channel (/ping, /info/space)"
    )]
    pub storage_node_port: u16,
    #[arg(
        long,
        env = "REQUEST_TIMEOUT",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        help = "Timeout in seconds for health/space-query HTTP calls to storage nodes"
    )]
    pub request_timeout_secs: u64,
    #[arg(
        long,
        env = "FTP_TLS",
        default_value_t = false,
        help = "Wrap the FTP control/data channel to storage nodes in TLS"
    )]
    pub ftp_tls: bool,
    #[arg(
        long,
        env = "STORAGE_NODE_ROOT",
        default_value = DEFAULT_STORAGE_NODE_ROOT,
        help = "Root directory each storage node's FTP login lands in"
    )]
    pub storage_node_root: String,

    #[arg(long, env = "METADATA_HOST", help = "Unused; accepted for compatibility")]
    pub metadata_host: Option<String>,
    #[arg(long, env = "METADATA_USER", help = "Unused; accepted for compatibility")]
    pub metadata_user: Option<String>,
    #[arg(long, env = "METADATA_PASSWORD", help = "Unused; accepted for compatibility")]
    pub metadata_password: Option<String>,
}
