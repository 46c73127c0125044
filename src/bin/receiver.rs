//! Receiver process: acknowledges every arrival with the next expected sequence number.

use std::process::ExitCode;
use std::time::Duration;

use bottleneck::{addr, receiver};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "receiver", about = "Go-Back-N traffic sink")]
struct Args {
    /// This receiver's id (listens on port 5000 + id - 1)
    #[arg(long, default_value_t = 1)]
    id: u32,
    /// Host the senders receive acknowledgments on
    #[arg(long, default_value = "127.0.0.1")]
    sender_host: String,
    /// Lookahead window size
    #[arg(long, default_value_t = 32)]
    window: u32,
    /// Pause 0..=5 or 0..=15 ms (alternating every 5 s) before each read
    #[arg(long)]
    jitter: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1)]
    report_secs: u64,
}

fn build_config(args: &Args) -> bottleneck::Result<receiver::Config> {
    let bind_port = addr::receiver_port(args.id)?;

    Ok(receiver::Config {
        id: args.id,
        bind_addr: (std::net::Ipv4Addr::UNSPECIFIED, bind_port).into(),
        sender_ip: addr::resolve(&args.sender_host, 0)?.ip(),
        window_size: args.window,
        jitter: args.jitter,
        report_interval: Duration::from_secs(args.report_secs),
        seed: args.seed,
        ..Default::default()
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    let result = build_config(&args)
        .and_then(bottleneck::Receiver::bind)
        .and_then(|mut receiver| receiver.run());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("receiver failed: {err}");
            ExitCode::FAILURE
        }
    }
}
