//! Router process: queues units per destination and forwards one per service interval.

use std::process::ExitCode;
use std::time::Duration;

use bottleneck::{addr, router};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "router", about = "Rate-limited drop-tail router")]
struct Args {
    /// Number of queues: 1 shares a queue between all receivers, N gives receiver k queue k
    #[arg(long, default_value_t = 2)]
    queues: usize,
    /// Time to forward one unit (milliseconds)
    #[arg(long, default_value_t = 10)]
    service_ms: u64,
    /// Capacity of each queue (units)
    #[arg(long, default_value_t = 64)]
    capacity: usize,
    /// Number of receivers (receiver k listens on port 5000 + k - 1)
    #[arg(long, default_value_t = 2)]
    receivers: u32,
    #[arg(long, default_value = "127.0.0.1")]
    receiver_host: String,
    #[arg(long, default_value_t = 1)]
    report_secs: u64,
}

fn build_config(args: &Args) -> bottleneck::Result<router::Config> {
    let receiver_addrs = (1..=args.receivers)
        .map(|id| addr::receiver_addr(&args.receiver_host, id))
        .collect::<bottleneck::Result<Vec<_>>>()?;

    Ok(router::Config {
        receiver_addrs,
        queue_count: args.queues,
        queue_capacity: args.capacity,
        service_interval: Duration::from_millis(args.service_ms),
        report_interval: Duration::from_secs(args.report_secs),
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
        .and_then(bottleneck::Router::bind)
        .and_then(|mut router| router.run());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("router failed: {err}");
            ExitCode::FAILURE
        }
    }
}
