//! Testbed daemon: `coordinator run` bootstraps and measures an experiment,
//! `node run` launches node instances against it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser};
use rapid_coordinator::{Coordinator, CoordinatorConfig};
use rapid_node::{launch_nodes, NodeLauncherConfig, TopologyMode};
use rapid_utils::{format_duration, init_logging, unix_now_secs, LogFormat, ShutdownController};

#[derive(Parser)]
#[command(name = "rapid-daemon", about = "Sharded ledger testbed coordinator and node launcher")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// Defaults to the config file's value, then "info".
    #[arg(long, env = "RAPID_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "RAPID_LOG_FORMAT", global = true)]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Bootstrap committees and collect telemetry.
    #[command(name = "coordinator")]
    Coordinator {
        #[command(subcommand)]
        action: CoordinatorAction,
    },
    /// Launch node instances.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand)]
enum CoordinatorAction {
    Run(CoordinatorArgs),
}

#[derive(clap::Subcommand)]
enum NodeAction {
    Run(NodeArgs),
}

#[derive(Args)]
struct CoordinatorArgs {
    /// Total number of nodes (N).
    #[arg(short = 'n', long, env = "RAPID_NODES")]
    nodes: Option<usize>,

    /// Number of committees (M).
    #[arg(short = 'm', long, env = "RAPID_COMMITTEES")]
    committees: Option<usize>,

    /// Total adversary tolerance as a divisor (1/x).
    #[arg(long = "total-f", env = "RAPID_TOTAL_F")]
    total_adversary_divisor: Option<usize>,

    /// Committee adversary tolerance as a divisor (1/x).
    #[arg(long = "committee-f", env = "RAPID_COMMITTEE_F")]
    committee_adversary_divisor: Option<usize>,

    /// Block size in bytes.
    #[arg(long, env = "RAPID_BLOCK_SIZE")]
    block_size: Option<usize>,

    /// Users in the genesis state.
    #[arg(long, env = "RAPID_USERS")]
    users: Option<usize>,

    /// Coins in the genesis state.
    #[arg(long, env = "RAPID_TOTAL_COINS")]
    total_coins: Option<u64>,

    /// Transactions per second.
    #[arg(long, env = "RAPID_TPS")]
    tps: Option<u64>,

    /// Round delta in milliseconds.
    #[arg(long, env = "RAPID_DELTA_MS")]
    delta_ms: Option<u64>,

    /// First node port.
    #[arg(long, env = "RAPID_BASE_PORT")]
    base_port: Option<u16>,

    /// Coordination port.
    #[arg(long, env = "RAPID_LISTEN_PORT")]
    listen_port: Option<u16>,

    /// Result stream directory.
    #[arg(long, env = "RAPID_RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Assignment seed; derived from the clock when absent.
    #[arg(long, env = "RAPID_SEED")]
    seed: Option<u64>,

    /// Abort bootstrap after this many seconds.
    #[arg(long, env = "RAPID_BOOTSTRAP_TIMEOUT")]
    bootstrap_timeout: Option<u64>,
}

#[derive(Args)]
struct NodeArgs {
    /// Instances to launch.
    #[arg(long, env = "RAPID_INSTANCES")]
    instances: Option<usize>,

    /// Port of the first instance.
    #[arg(long, env = "RAPID_BASE_PORT")]
    base_port: Option<u16>,

    /// "local" or "remote".
    #[arg(long, env = "RAPID_MODE")]
    mode: Option<String>,

    /// Coordinator address. Required in remote mode.
    #[arg(long, env = "RAPID_COORDINATOR")]
    coordinator: Option<SocketAddr>,

    /// Coordination port used with the local-mode default host.
    #[arg(long, default_value_t = 8080, env = "RAPID_LISTEN_PORT")]
    coordinator_port: u16,
}

impl CoordinatorArgs {
    fn apply(self, base: CoordinatorConfig) -> CoordinatorConfig {
        CoordinatorConfig {
            nodes: self.nodes.unwrap_or(base.nodes),
            committees: self.committees.unwrap_or(base.committees),
            total_adversary_divisor: self
                .total_adversary_divisor
                .unwrap_or(base.total_adversary_divisor),
            committee_adversary_divisor: self
                .committee_adversary_divisor
                .unwrap_or(base.committee_adversary_divisor),
            block_size: self.block_size.unwrap_or(base.block_size),
            users: self.users.unwrap_or(base.users),
            total_coins: self.total_coins.unwrap_or(base.total_coins),
            tps: self.tps.unwrap_or(base.tps),
            delta_ms: self.delta_ms.unwrap_or(base.delta_ms),
            base_port: self.base_port.unwrap_or(base.base_port),
            listen_port: self.listen_port.unwrap_or(base.listen_port),
            results_dir: self.results_dir.unwrap_or(base.results_dir),
            seed: self.seed.or(base.seed),
            bootstrap_timeout_secs: self.bootstrap_timeout.or(base.bootstrap_timeout_secs),
            ..base
        }
    }
}

impl NodeArgs {
    /// Overlay flags on `base`. A coordinator address from a config file is
    /// kept unless `--coordinator` overrides it.
    fn apply(self, base: NodeLauncherConfig, from_file: bool) -> anyhow::Result<NodeLauncherConfig> {
        let mode = match self.mode.as_deref() {
            Some(s) => TopologyMode::parse(s)
                .with_context(|| format!("unknown mode {s:?}, expected local or remote"))?,
            None => base.mode,
        };
        let coordinator = match self.coordinator {
            Some(addr) => addr,
            None if from_file => base.coordinator,
            None => match mode.default_coordinator(self.coordinator_port) {
                Some(addr) => addr,
                None => bail!("remote mode needs --coordinator"),
            },
        };
        Ok(NodeLauncherConfig {
            instances: self.instances.unwrap_or(base.instances),
            base_port: self.base_port.unwrap_or(base.base_port),
            coordinator,
            mode,
            ..base
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Coordinator {
            action: CoordinatorAction::Run(args),
        } => {
            let base = match &cli.config {
                Some(path) => CoordinatorConfig::from_toml_file(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => CoordinatorConfig::default(),
            };
            let mut config = args.apply(base);
            if let Some(level) = cli.log_level {
                config.log_level = level;
            }
            if let Some(format) = cli.log_format {
                config.log_format = format;
            }
            init_logging(LogFormat::parse(&config.log_format), &config.log_level);
            if let Some(path) = &cli.config {
                tracing::info!("Loaded config from {}", path.display());
            }
            run_coordinator(config).await
        }
        Command::Node {
            action: NodeAction::Run(args),
        } => {
            let base = match &cli.config {
                Some(path) => NodeLauncherConfig::from_toml_file(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => NodeLauncherConfig::default(),
            };
            let mut config = args.apply(base, cli.config.is_some())?;
            if let Some(level) = cli.log_level {
                config.log_level = level;
            }
            if let Some(format) = cli.log_format {
                config.log_format = format;
            }
            init_logging(LogFormat::parse(&config.log_format), &config.log_level);
            run_nodes(config).await
        }
    }
}

async fn run_coordinator(config: CoordinatorConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Starting coordinator on port {} for {} nodes in {} committees",
        config.listen_port,
        config.nodes,
        config.committees
    );
    let coordinator = Coordinator::new(config)?;
    let started = unix_now_secs();
    let shutdown = Arc::new(ShutdownController::new());
    let rx = shutdown.subscribe();
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let result = coordinator.run(rx).await;
    signals.abort();

    match coordinator.metrics().render() {
        Ok(text) => tracing::info!("final metrics:\n{text}"),
        Err(e) => tracing::warn!("failed to render metrics: {e}"),
    }
    let outcome = result?;
    tracing::info!(
        seed = outcome.seed,
        reconfiguration = %outcome.payload.reconfiguration.hash,
        "coordinator exited cleanly after {}",
        format_duration(unix_now_secs().saturating_sub(started))
    );
    Ok(())
}

async fn run_nodes(config: NodeLauncherConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Launching {} instances against {} ({:?} mode)",
        config.instances,
        config.coordinator,
        config.mode
    );
    let shutdown = Arc::new(ShutdownController::new());
    let rx = shutdown.subscribe();
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let launched = launch_nodes(&config, rx).await;
    signals.abort();
    let launched = launched?;
    tracing::info!("{} node instances stopped", launched.len());
    Ok(())
}
