//! workq CLI: operator interface to a work-item queue.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use workq::config::{Config, QueueConfig};
use workq::queue::{Backend, Ordering, Queue};
use workq::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "workq", about = "Ordered work-item queues, in memory or on SQLite")]
struct Cli {
    /// TOML file with a [queue] table (overrides WORKQ_* variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Storage backend
    #[arg(long, global = true)]
    backend: Option<Backend>,
    /// Retrieval order
    #[arg(long, global = true)]
    order: Option<Ordering>,
    /// SQLite database file (implies --backend durable)
    #[arg(long, global = true)]
    path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Push items; each argument is one item, taken as raw bytes
    Push {
        items: Vec<OsString>,
        /// Push the raw contents of each file as one item
        #[arg(long = "file", conflicts_with = "items")]
        files: Vec<PathBuf>,
    },
    /// Remove and print the next item
    Pop,
    /// Remove and print a batch of items
    Pull {
        /// Maximum items to take (defaults to the configured batch size)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the number of queued items
    Size,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "workq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let queue_config = resolve_queue_config(&cli, config.queue)?;
    let mut queue = workq::open(&queue_config)?;

    let result = match cli.command {
        Command::Push { items, files } => cmd_push(queue.as_mut(), items, files),
        Command::Pop => cmd_pop(queue.as_mut()),
        Command::Pull { limit } => {
            cmd_pull(queue.as_mut(), limit.unwrap_or(queue_config.batch_size))
        }
        Command::Size => cmd_size(queue.as_ref()),
    };

    // Close even when the command failed, but report the command's error first.
    let closed = queue.close();
    result?;
    closed?;
    Ok(())
}

/// Layer CLI flags over the file or environment configuration.
fn resolve_queue_config(cli: &Cli, from_env: QueueConfig) -> anyhow::Result<QueueConfig> {
    let mut config = match cli.config {
        Some(ref file) => QueueConfig::load(file)?,
        None => from_env,
    };
    if let Some(ref path) = cli.path {
        config.path = Some(path.clone());
        config.backend = Backend::Durable;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(order) = cli.order {
        config.ordering = order;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_push(
    queue: &mut dyn Queue,
    items: Vec<OsString>,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut pushed = 0;
    for item in items {
        queue.push(item.as_encoded_bytes())?;
        pushed += 1;
    }
    for file in files {
        let bytes = std::fs::read(&file)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", file.display()))?;
        queue.push(&bytes)?;
        pushed += 1;
    }

    if pushed == 0 {
        anyhow::bail!("nothing to push: give items as arguments or --file");
    }
    eprintln!("pushed {pushed} item(s), {} queued", queue.size()?);
    Ok(())
}

fn cmd_pop(queue: &mut dyn Queue) -> anyhow::Result<()> {
    match queue.pop()? {
        Some(item) => println!("{}", String::from_utf8_lossy(&item)),
        None => eprintln!("queue is empty"),
    }
    Ok(())
}

fn cmd_pull(queue: &mut dyn Queue, limit: usize) -> anyhow::Result<()> {
    let items = queue.pull(limit)?;
    for item in &items {
        println!("{}", String::from_utf8_lossy(item));
    }
    eprintln!("pulled {} item(s)", items.len());
    Ok(())
}

fn cmd_size(queue: &dyn Queue) -> anyhow::Result<()> {
    println!("{}", queue.size()?);
    Ok(())
}
