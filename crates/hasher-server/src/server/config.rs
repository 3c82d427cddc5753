use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::net::SocketAddr;

/// Runtime configuration for the `hasher-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is honoured), with the defaults listed on each field.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hasher-server",
    version,
    about = "An HTTP service that digests passwords asynchronously"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8888"))]
    pub server_addr: String,

    /// Delay, in milliseconds, applied to each submission before its digest is
    /// computed.
    ///
    /// Environment variable: `WORK_DELAY_MS`
    #[arg(long, env = "WORK_DELAY_MS", default_value_t = 5_000)]
    pub work_delay_ms: u64,

    /// How often, in milliseconds, the termination monitor checks whether a
    /// requested shutdown has finished draining.
    ///
    /// Environment variable: `POLL_INTERVAL_MS`
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 50)]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub work_delay: Duration,
    pub poll_interval: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than 0");
        }

        let server_addr = args
            .server_addr
            .parse()
            .with_context(|| format!("invalid SERVER_ADDR `{}`", args.server_addr))?;

        Ok(Self {
            server_addr,
            work_delay: Duration::from_millis(args.work_delay_ms),
            poll_interval: Duration::from_millis(args.poll_interval_ms),
        })
    }
}
