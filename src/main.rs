//! Premium exchange arbitrage bot entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use exchange_arb::arbitrage::{find_opportunity, quote_resources, MarketScanner};
use exchange_arb::config::Config;
use exchange_arb::market::{Endpoints, ExchangeApi, GameClient, SessionCookie};
use exchange_arb::utils::ShutdownSignal;
use exchange_arb::{logging, metrics};

/// Premium exchange arbitrage bot.
#[derive(Parser, Debug)]
#[command(name = "exchange-arb")]
#[command(about = "Automated premium exchange arbitrage for a browser strategy game")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Env file to read before the environment (defaults to ./.env).
    #[arg(long, global = true, env = "EXCHANGE_ARB_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scan loop (default).
    Run {
        /// Milliseconds between cycles.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many cycles (0 = run forever).
        #[arg(long)]
        cycles: Option<u64>,

        /// Evaluate opportunities without trading.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check configuration, endpoint table and session file.
    CheckConfig,

    /// Poll the market once and print the quotes.
    Quote,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let config = match &args.env_file {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Quote) => {
            logging::init(&config, args.verbose)?;
            cmd_quote(&config).await
        }
        Some(Command::Run {
            interval_ms,
            cycles,
            dry_run,
        }) => {
            logging::init(&config, args.verbose)?;
            cmd_run(config, interval_ms, cycles, dry_run).await
        }
        None => {
            logging::init(&config, args.verbose)?;
            cmd_run(config, None, None, false).await
        }
    }
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("EXCHANGE ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Loading endpoint table ({})... ", config.urls_file);
    match Endpoints::load(&config.urls_file) {
        Ok(endpoints) => {
            println!("OK");
            println!("  Market:  {}", endpoints.check_market);
            println!("  Begin:   {}", endpoints.exchange_begin);
            println!("  Confirm: {}", endpoints.exchange_confirm);
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Endpoint table invalid"));
        }
    }

    print!("Reading session file ({})... ", config.session_file);
    match SessionCookie::new(&config.session_file).header_value() {
        Ok(_) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Session file unusable"));
        }
    }

    let params = config.trading_params();
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Trade Delta Threshold: {}", params.trade_delta_threshold);
    println!("  Min Merchants: {}", params.min_merchants);
    println!("  Min Points: {}", params.min_points);
    println!("  Max Change: {}", params.max_change);
    println!("  Buy Window: {}s", params.try_buy_for.as_secs());
    println!("  Poll Interval: {}ms", params.poll_interval.as_millis());
    println!(
        "  Max Cycles: {}",
        if params.max_cycles == 0 {
            "unbounded".to_string()
        } else {
            params.max_cycles.to_string()
        }
    );
    println!("  Dry Run: {}", params.dry_run);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Poll once and print the quotes and the would-be decision.
async fn cmd_quote(config: &Config) -> anyhow::Result<()> {
    let client = GameClient::new(config)?;
    let snapshot = client.poll_market().await?;
    let board = quote_resources(&snapshot)?;
    let village = &snapshot.village;

    println!("{}", board);
    println!(
        "merchants {}, pp {}, wood={} stone={} iron={}",
        village.merchants,
        village.points,
        village.available.wood,
        village.available.stone,
        village.available.iron
    );

    match find_opportunity(&board, config.trade_delta_threshold)? {
        Some(opportunity) => println!("{}", opportunity),
        None => println!(
            "no trade: delta {} below {}",
            board.spread()?,
            config.trade_delta_threshold
        ),
    }

    Ok(())
}

/// Run the scan loop.
async fn cmd_run(
    mut config: Config,
    interval_ms: Option<u64>,
    cycles: Option<u64>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let Some(interval_ms) = interval_ms {
        config.poll_interval_ms = interval_ms;
    }
    if let Some(cycles) = cycles {
        config.max_cycles = cycles;
    }
    config.dry_run |= dry_run;

    if let Err(e) = config.validate() {
        error!("Configuration invalid: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    // Registered before the first cycle: a signal mid-trade only ends the loop.
    let shutdown = ShutdownSignal::install()?;

    metrics::init_metrics();
    if config.metrics_enabled {
        metrics::install_exporter(config.metrics_port)?;
    }

    let client = GameClient::new(&config)?;
    let params = config.trading_params();

    info!("START");
    info!(
        threshold = params.trade_delta_threshold,
        interval_ms = config.poll_interval_ms,
        max_cycles = params.max_cycles,
        dry_run = params.dry_run,
        "Scanner starting"
    );

    let mut scanner = MarketScanner::new(client, params);
    let stats = scanner.run(shutdown.wait()).await;

    info!(
        cycles = stats.cycles,
        opportunities = stats.opportunities,
        trades = stats.trades_completed,
        scan_errors = stats.scan_errors,
        aborts = ?stats.aborts,
        "Scanner stopped"
    );

    Ok(())
}
