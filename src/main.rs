use analytics::{KellyConfig, kelly_simulation};
use backtester::{BacktestParams, BacktestResult};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::Config;
use execution::PaperBroker;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use trader::Trader;

mod data;

/// The main entry point for the Meridian trading application.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match configuration::load_config_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Backtest(args) => handle_backtest(args, &config),
        Commands::Replay(args) => handle_replay(args, &config).await,
        Commands::Kelly(args) => handle_kelly(args, &config),
    };
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A position- and risk-gated execution core for directional trading of one
/// asset pair.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an event-based backtest over historical bars and signals.
    Backtest(BacktestArgs),
    /// Replay historical bars through the full live order path on a
    /// simulated ledger.
    Replay(ReplayArgs),
    /// Monte-Carlo simulation of Kelly bet sizing under a biased coin.
    Kelly(KellyArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Target exposure in {0, +1}.
    LongOnly,
    /// Target exposure in {-1, 0, +1}.
    LongShort,
}

#[derive(Parser)]
struct BacktestArgs {
    /// CSV file of bars (timestamp,open,high,low,close,volume).
    #[arg(long)]
    bars: PathBuf,

    /// CSV file with one signal per bar.
    #[arg(long)]
    signals: PathBuf,

    /// Exposure variant to run.
    #[arg(long, value_enum, default_value_t = Mode::LongOnly)]
    mode: Mode,
}

#[derive(Parser)]
struct ReplayArgs {
    /// CSV file of bars (timestamp,open,high,low,close,volume).
    #[arg(long)]
    bars: PathBuf,

    /// CSV file with one signal per bar.
    #[arg(long)]
    signals: PathBuf,
}

#[derive(Parser)]
struct KellyArgs {
    /// Optional bar CSV; when given, prints optimal leverage and half-Kelly
    /// from the close series before running the simulation.
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Win probability of the biased coin.
    #[arg(long, default_value_t = 0.55)]
    win_probability: f64,

    /// Simulation paths per bet fraction.
    #[arg(long, default_value_t = 50)]
    n_trials: usize,

    /// Bets per path.
    #[arg(long, default_value_t = 100)]
    n_steps: usize,

    /// Seed for the pseudo-random source.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

// ==============================================================================
// Command Handlers
// ==============================================================================

fn handle_backtest(args: BacktestArgs, config: &Config) -> anyhow::Result<()> {
    let bars = data::load_bars(&args.bars)?;
    let signals = data::load_signals(&args.signals)?;

    let params = BacktestParams {
        initial_capital: config.backtest.initial_capital,
        costs: config.costs.model(),
        trading_days: config.backtest.trading_days,
    };

    tracing::info!(
        mode = ?args.mode,
        bars = bars.len(),
        capital = %params.initial_capital,
        "starting backtest"
    );
    let result = match args.mode {
        Mode::LongOnly => backtester::run_long_only(&bars, &signals, &params)?,
        Mode::LongShort => backtester::run_long_short(&bars, &signals, &params)?,
    };

    print_backtest_summary(&result)?;
    Ok(())
}

async fn handle_replay(args: ReplayArgs, config: &Config) -> anyhow::Result<()> {
    let bars = data::load_bars(&args.bars)?;
    let signals = data::load_signals(&args.signals)?;

    let broker = PaperBroker::new(config.trading.initial_capital, config.costs.model());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut trader = Trader::new(config, Box::new(broker))?.with_shutdown(shutdown_rx);
    let summary = trader.run_on_data(&bars, &signals).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Trades".to_string(), summary.n_trades.to_string()]);
    table.add_row(vec!["Total P&L".to_string(), round(summary.total_pnl)]);
    table.add_row(vec!["Win rate".to_string(), round(summary.win_rate)]);
    table.add_row(vec!["Avg win".to_string(), round(summary.avg_win)]);
    table.add_row(vec!["Avg loss".to_string(), round(summary.avg_loss)]);
    table.add_row(vec!["Largest win".to_string(), round(summary.largest_win)]);
    table.add_row(vec!["Largest loss".to_string(), round(summary.largest_loss)]);
    table.add_row(vec!["Final equity".to_string(), round(summary.final_equity)]);
    println!("{table}");
    Ok(())
}

fn handle_kelly(args: KellyArgs, config: &Config) -> anyhow::Result<()> {
    if let Some(path) = &args.bars {
        print_leverage_from_bars(path, config)?;
    }

    let kelly_config = KellyConfig {
        win_probability: args.win_probability,
        n_trials: args.n_trials,
        n_steps: args.n_steps,
        seed: args.seed,
        ..Default::default()
    };
    let ruin_threshold = kelly_config.initial_capital / Decimal::from(100);
    let results = kelly_simulation(&kelly_config)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Fraction",
        "Median final",
        "Mean final",
        "Min",
        "Max",
        "Ruin %",
    ]);
    for (fraction, paths) in &results {
        let mut finals: Vec<Decimal> = paths
            .iter()
            .filter_map(|path| path.last().copied())
            .collect();
        finals.sort();
        let median = finals[finals.len() / 2];
        let mean = finals.iter().sum::<Decimal>() / Decimal::from(finals.len());
        let ruined = finals.iter().filter(|f| **f < ruin_threshold).count();
        let ruin_pct =
            Decimal::from(ruined * 100) / Decimal::from(finals.len());
        table.add_row(vec![
            fraction.clone(),
            round(median),
            round(mean),
            round(finals[0]),
            round(finals[finals.len() - 1]),
            round(ruin_pct),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Optimal leverage and half-Kelly from a bar file's close series.
fn print_leverage_from_bars(path: &std::path::Path, config: &Config) -> anyhow::Result<()> {
    let bars = data::load_bars(path)?;
    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let returns = analytics::log_returns(&closes)?;
    let metrics = analytics::compute_metrics(
        &returns,
        config.backtest.trading_days,
        config.backtest.risk_free_rate,
        rust_decimal_macros::dec!(0.05),
    )?;

    let f_star = analytics::optimal_leverage(
        metrics.annualized_return,
        metrics.annualized_volatility,
        config.backtest.risk_free_rate,
    );
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        "Annualized return".to_string(),
        round(metrics.annualized_return),
    ]);
    table.add_row(vec![
        "Annualized volatility".to_string(),
        round(metrics.annualized_volatility),
    ]);
    table.add_row(vec!["Sharpe ratio".to_string(), round(metrics.sharpe_ratio)]);
    table.add_row(vec!["Optimal leverage".to_string(), round(f_star)]);
    table.add_row(vec![
        "Half Kelly".to_string(),
        round(f_star / Decimal::from(2)),
    ]);
    println!("{table}");
    Ok(())
}

fn print_backtest_summary(result: &BacktestResult) -> anyhow::Result<()> {
    let summary = result.summary()?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Bars".to_string(), summary.n_bars.to_string()]);
    table.add_row(vec!["Trades".to_string(), summary.n_trades.to_string()]);
    table.add_row(vec![
        "Initial capital".to_string(),
        round(summary.initial_capital),
    ]);
    table.add_row(vec!["Final value".to_string(), round(summary.final_value)]);
    table.add_row(vec!["Total return".to_string(), round(summary.total_return)]);
    table.add_row(vec![
        "Annualized return".to_string(),
        round(summary.annualized_return),
    ]);
    table.add_row(vec![
        "Annualized volatility".to_string(),
        round(summary.annualized_volatility),
    ]);
    table.add_row(vec!["Sharpe ratio".to_string(), round(summary.sharpe_ratio)]);
    table.add_row(vec!["Max drawdown".to_string(), round(summary.max_drawdown)]);
    println!("{table}");
    Ok(())
}

fn round(value: Decimal) -> String {
    value.round_dp(4).to_string()
}
