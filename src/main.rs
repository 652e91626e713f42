//! vnstat-http binary
//!
//! Serves vnstat traffic statistics over HTTP and optionally pushes them to a
//! Prometheus remote-write endpoint.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};
use vnstat_http::{
    parse_snapshot, render, start_push, start_web_server, PushConfig, SnapshotSource,
    TrafficSnapshot, VnstatCommand, WebConfig, DEFAULT_PUSH_INTERVAL_SECS, DEFAULT_WEB_PORT,
};

#[derive(Parser)]
#[command(name = "vnstat-http")]
#[command(about = "HTTP exporter for vnstat traffic statistics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Serves vnstat reports and Prometheus metrics over HTTP, with optional remote-write push")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, env = "VNSTAT_HTTP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, env = "VNSTAT_HTTP_PORT", default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Authentication token (leave empty to disable)
    #[arg(long, env = "VNSTAT_HTTP_TOKEN")]
    token: Option<String>,

    /// Network interface to query (leave empty to query all)
    #[arg(short, long, env = "VNSTAT_HTTP_INTERFACE")]
    interface: Option<String>,

    /// Log warnings and errors only
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve,

    /// Read vnstat once, print the result and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Disable CORS headers
    #[arg(long, global = true)]
    no_cors: bool,

    /// Prometheus remote write URL (e.g. https://<instance>.grafana.net/api/prom/push)
    #[arg(long, global = true, env = "VNSTAT_HTTP_GRAFANA_URL")]
    grafana_url: Option<String>,

    /// Remote write user (Grafana Cloud instance ID)
    #[arg(long, global = true, env = "VNSTAT_HTTP_GRAFANA_USER")]
    grafana_user: Option<String>,

    /// Remote write password (Grafana Cloud API token)
    #[arg(long, global = true, env = "VNSTAT_HTTP_GRAFANA_TOKEN")]
    grafana_token: Option<String>,

    /// Seconds between remote write pushes
    #[arg(
        long,
        global = true,
        env = "VNSTAT_HTTP_GRAFANA_INTERVAL",
        default_value_t = DEFAULT_PUSH_INTERVAL_SECS
    )]
    grafana_interval: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum SnapshotFormat {
    Prometheus,
    Json,
    Pretty,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    format: SnapshotFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    let source = VnstatCommand::new().with_interface(cli.interface.clone());

    // Check vnstat is installed before doing anything else
    if let Err(e) = source.check_installed().await {
        error!("Failed to start: {}", e);
        error!("Please ensure vnstat is installed");
        std::process::exit(1);
    }

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(args, source).await,
        Some(Commands::Serve) | None => serve_command(&cli, source).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn serve_command(cli: &Cli, source: VnstatCommand) -> anyhow::Result<()> {
    let args = &cli.serve;
    let web_config = WebConfig::new(&cli.host, cli.port)
        .with_cors(!args.no_cors)
        .with_token(cli.token.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let push_task = match PushConfig::from_credentials(
        args.grafana_url.clone(),
        args.grafana_user.clone(),
        args.grafana_token.clone(),
    ) {
        Ok(Some(config)) => {
            let schedule = config
                .schedule
                .clone()
                .with_interval(Duration::from_secs(args.grafana_interval.max(1)));
            let config = config
                .with_health_url(web_config.health_url())
                .with_schedule(schedule);
            Some(start_push(&config, source.clone(), shutdown_rx.clone())?)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("{}; remote write push disabled", e);
            None
        }
    };

    let mut server_shutdown = shutdown_rx.clone();
    let server_stopped = async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
        let _ = shutdown_tx.send(true);
    });

    start_web_server(web_config, source, server_stopped).await?;

    if let Some(task) = push_task {
        task.await.context("push scheduler task failed")?;
    }

    Ok(())
}

async fn snapshot_command(args: &SnapshotArgs, source: VnstatCommand) -> anyhow::Result<()> {
    let raw = source.fetch_json().await?;

    match args.format {
        SnapshotFormat::Json => {
            println!("{}", String::from_utf8_lossy(&raw).trim_end());
        }
        SnapshotFormat::Prometheus => {
            print!("{}", render(&parse_snapshot(&raw)?));
        }
        SnapshotFormat::Pretty => {
            print_pretty_snapshot(&parse_snapshot(&raw)?);
        }
    }

    Ok(())
}

fn print_pretty_snapshot(snapshot: &TrafficSnapshot) {
    println!(
        "vnstat traffic ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("==========================================");

    if snapshot.is_empty() {
        println!("No interface data available");
        return;
    }

    for iface in snapshot.interfaces() {
        println!();
        println!("{}:", iface.name);
        for (label, counters) in [
            ("Total", iface.total),
            ("This month", iface.month),
            ("Today", iface.today),
        ] {
            match counters {
                Some(c) => println!(
                    "  {:<11} RX: {:>10}  TX: {:>10}",
                    label,
                    format_bytes(c.rx),
                    format_bytes(c.tx)
                ),
                None => println!("  {:<11} no data", label),
            }
        }
    }
}

fn format_bytes(bytes: Option<f64>) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let Some(mut value) = bytes else {
        return "-".to_string();
    };
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
