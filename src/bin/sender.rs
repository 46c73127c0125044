//! Sender process: paces units toward the router and runs Go-Back-N on the acknowledgments.

use std::process::ExitCode;
use std::time::Duration;

use bottleneck::window::SendWindowConfig;
use bottleneck::{addr, sender};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sender", about = "Go-Back-N traffic source")]
struct Args {
    /// This sender's id (acknowledgments arrive on port 4000 + id - 1)
    #[arg(long, default_value_t = 1)]
    id: u32,
    /// Destination receiver id
    #[arg(long, default_value_t = 1)]
    receiver_id: u32,
    #[arg(long, default_value = "127.0.0.1")]
    router_host: String,
    /// Mean gap between departures (milliseconds, exponentially distributed)
    #[arg(long, default_value_t = 10.0)]
    mean_interval_ms: f64,
    /// Initial window size
    #[arg(long, default_value_t = 32)]
    window: u32,
    /// Retransmission timeout before the first round-trip sample (milliseconds)
    #[arg(long, default_value_t = 1000.0)]
    timeout_ms: f64,
    /// Grow the window by one per acknowledgment, halve it on loss
    #[arg(long)]
    aimd: bool,
    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,
    /// Plain Poisson source: ignore acknowledgments
    #[arg(long)]
    open_loop: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1)]
    report_secs: u64,
}

fn build_config(args: &Args) -> bottleneck::Result<sender::Config> {
    let bind_port = addr::sender_port(args.id)?;

    Ok(sender::Config {
        window: SendWindowConfig {
            sender_id: args.id,
            receiver_id: args.receiver_id,
            window_size: args.window,
            aimd: args.aimd,
            initial_timeout_ms: args.timeout_ms,
            ..Default::default()
        },
        bind_addr: (std::net::Ipv4Addr::UNSPECIFIED, bind_port).into(),
        router_addr: addr::router_addr(&args.router_host)?,
        mean_interval_ms: args.mean_interval_ms,
        open_loop: args.open_loop,
        run_for: args.duration_secs.map(Duration::from_secs),
        report_interval: Duration::from_secs(args.report_secs),
        seed: args.seed,
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
        .and_then(bottleneck::Sender::bind)
        .and_then(|mut sender| sender.run());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("sender failed: {err}");
            ExitCode::FAILURE
        }
    }
}
