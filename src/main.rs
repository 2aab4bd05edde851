use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use romonitor::api::ApiClient;
use romonitor::webhook::Webhook;
use romonitor::{Config, FreePolicy, Monitor, MonitorError, RunOutcome, Thresholds};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// RoMonitor - watches a Roblox item and alerts a Discord webhook when it changes.
#[derive(Parser, Debug)]
#[command(name = "romonitor")]
#[command(version, about, long_about = None)]
struct Args {
    /// The item ID to monitor
    #[arg(short, long)]
    item: u64,

    /// Discord user ID to mention when triggered (0 = nobody)
    #[arg(short = 'M', long, default_value_t = 0)]
    mention: u64,

    /// Seconds between checks (at least 5)
    #[arg(short, long, default_value_t = 60)]
    time: u64,

    /// Alert when the price drops to this many Robux or less (0 = off)
    #[arg(short = 'm', long, default_value_t = 0)]
    minprice: i64,

    /// Alert on every change to the item, including lone price changes
    #[arg(short = 'a', long)]
    allchanges: bool,

    /// Keep monitoring after a trigger
    #[arg(short, long)]
    runforever: bool,

    /// Whether an item going free always stops monitoring
    #[arg(long, value_enum, default_value_t = FreeArg::Stop)]
    free_policy: FreeArg,

    /// Path to the config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FreeArg {
    /// Stop even with --runforever
    Stop,
    /// Treat like any other trigger
    Follow,
}

impl From<FreeArg> for FreePolicy {
    fn from(arg: FreeArg) -> Self {
        match arg {
            FreeArg::Stop => FreePolicy::AlwaysStop,
            FreeArg::Follow => FreePolicy::FollowRunForever,
        }
    }
}

impl Args {
    fn thresholds(&self) -> Thresholds {
        let mut thresholds = Thresholds::default().with_interval(Duration::from_secs(self.time));
        thresholds.min_price = self.minprice;
        thresholds.mention = self.mention;
        thresholds.run_forever = self.runforever;
        thresholds.track_all = self.allchanges;
        thresholds.free_policy = self.free_policy.into();
        thresholds
    }
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = Config::load(&args.config);
    let filter = config.as_ref().map(|c| c.log_filter()).unwrap_or("info");
    if let Err(e) = init_tracing(filter) {
        eprintln!("{e}");
    }

    let code = match config {
        Ok(config) => match run(&args, config).await {
            Ok(outcome) => {
                info!("Monitoring ended: {:?}", outcome);
                0
            }
            Err(e) => {
                error!("{}", e);
                e.exit_code()
            }
        },
        Err(e) => {
            let e = MonitorError::from(e);
            error!("{}", e);
            e.exit_code()
        }
    };

    info!("Exiting RoMonitor. Have a nice day!");
    std::process::exit(code);
}

async fn run(args: &Args, config: Config) -> Result<RunOutcome, MonitorError> {
    let thresholds = args.thresholds();
    let client = ApiClient::new(&config.credentials.roblosecurity)?;
    let webhook = Webhook::new(config.webhook_url()?, thresholds.mention());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    let monitor = Monitor::initialize(client, webhook, args.item, thresholds).await?;
    Ok(monitor.run(shutdown_rx).await)
}
