use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use obs_compare::lifecycle::Shutdown;
use obs_compare::loadgen::{self, default_tasks, LoadConfig};

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(about = "Synthetic traffic for the obs-compare demo app", long_about = None)]
struct Cli {
    /// Base URL of the app under test.
    #[arg(long, default_value = "http://localhost:8000")]
    host: String,

    /// Maximum number of concurrent users.
    #[arg(short, long, default_value_t = 20)]
    users: usize,

    /// Users spawned per second.
    #[arg(short = 'r', long, default_value_t = 2.0)]
    spawn_rate: f64,

    /// How long to run, e.g. "30s" or "5m".
    #[arg(short = 't', long, default_value = "5m", value_parser = humantime::parse_duration)]
    run_time: Duration,

    /// Minimum think time between a user's requests.
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    wait_min: Duration,

    /// Maximum think time between a user's requests.
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    wait_max: Duration,

    /// Per-request timeout.
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadgen=info,obs_compare=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = LoadConfig {
        host: cli.host,
        users: cli.users,
        spawn_rate: cli.spawn_rate,
        run_time: cli.run_time,
        wait_min: cli.wait_min,
        wait_max: cli.wait_max,
        request_timeout: cli.timeout,
        tasks: default_tasks(),
    };

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let report = loadgen::run(config, shutdown.subscribe()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        println!("\n{}", report.render());
    }

    Ok(())
}
