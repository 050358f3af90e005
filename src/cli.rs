//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::cached_data_port::CachedDataPort;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{backtest_instrument, InstrumentBacktest};
use crate::domain::config_validation::{
    build_portfolio_config, build_run_config, build_window_config, validate_config, RunConfig,
};
use crate::domain::error::CrosstraderError;
use crate::domain::metrics::{aligned_benchmark_growth, Metrics, MonthlyReturnTable};
use crate::domain::portfolio::{backtest_portfolio, PortfolioConfig, PortfolioResult};
use crate::domain::position::ClosedTrade;
use crate::domain::returns::{self, ReturnPoint};
use crate::domain::scan::{scan_universe, ScanEntry};
use crate::domain::signal::WindowConfig;
use crate::domain::universe::{display_name, load_universe, SkipReason};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "crosstrader",
    about = "Monthly moving-average crossover backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a single instrument
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Instrument code; defaults to the first configured code
        #[arg(long)]
        code: Option<String>,
        /// Directory for CSV exports
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest the equal-weight portfolio over the configured universe
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show this period's new buys, new sells and holdings
    Signals {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    pub fn config_path(&self) -> &Path {
        match &self.command {
            Command::Backtest { config, .. }
            | Command::Portfolio { config, .. }
            | Command::Signals { config }
            | Command::Validate { config }
            | Command::ListSymbols { config } => config,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match &cli.command {
        Command::Backtest {
            config,
            code,
            output,
        } => run_backtest(config, code.as_deref(), output.as_deref()),
        Command::Portfolio { config, output } => run_portfolio(config, output.as_deref()),
        Command::Signals { config } => run_signals(config),
        Command::Validate { config } => run_validate(config),
        Command::ListSymbols { config } => run_list_symbols(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, CrosstraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| CrosstraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `[log] level` from the config file, if it can be read.
pub fn configured_log_level(path: &Path) -> Option<String> {
    load_config(path).ok()?.get_string("log", "level")
}

/// Everything a run needs once the config is loaded and validated.
pub struct Session {
    pub run: RunConfig,
    pub windows: WindowConfig,
    pub data: CachedDataPort<CsvAdapter>,
}

pub fn open_session(config: &dyn ConfigPort) -> Result<Session, CrosstraderError> {
    validate_config(config)?;
    let run = build_run_config(config)?;
    let windows = build_window_config(config)?;
    let data = CachedDataPort::new(CsvAdapter::new(run.data_path.clone()), run.cache_ttl);

    info!(
        short = windows.short_window,
        long = windows.long_window,
        codes = run.codes.len(),
        data = %run.data_path.display(),
        "session ready"
    );

    Ok(Session { run, windows, data })
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    output: Option<&Path>,
) -> Result<(), CrosstraderError> {
    info!(config = %config_path.display(), "loading config");
    let adapter = load_config(config_path)?;
    let session = open_session(&adapter)?;

    let code = match code_override {
        Some(c) => c.trim().to_uppercase(),
        None => session
            .run
            .codes
            .first()
            .cloned()
            .ok_or_else(|| CrosstraderError::missing("backtest", "codes"))?,
    };

    let result = backtest_code(&session, &code)?;
    let benchmark = benchmark_returns(&session);

    println!("=== {} ===", describe(&code));
    if let (Some(first), Some(last)) = (result.signals.first(), result.signals.last()) {
        println!(
            "Period: {} to {} ({} months)",
            first.date,
            last.date,
            result.signals.len()
        );
    }

    match Metrics::compute(&result.returns, benchmark.as_deref()) {
        Some(metrics) => print_metrics(&metrics),
        None => println!("No defined returns"),
    }
    if let Some(bm) = &benchmark {
        print_growth_comparison(&result, bm);
    }
    print_trades(&result.trades);
    print_monthly_table(&MonthlyReturnTable::from_returns(&result.returns));

    if let Some(dir) = output {
        export_backtest(dir, &code, &result)?;
    }
    Ok(())
}

/// Fetch and backtest one instrument, treating short history as an error.
pub fn backtest_code(session: &Session, code: &str) -> Result<InstrumentBacktest, CrosstraderError> {
    let points = session
        .data
        .fetch_monthly_closes(code, session.run.start_date, session.run.end_date)?;
    if points.is_empty() {
        return Err(CrosstraderError::NoData {
            code: code.to_string(),
        });
    }

    let minimum = session.windows.min_periods();
    if points.len() < minimum {
        return Err(CrosstraderError::InsufficientData {
            code: code.to_string(),
            periods: points.len(),
            minimum,
        });
    }

    Ok(backtest_instrument(&points, &session.windows))
}

/// Benchmark returns when one is configured; a failed fetch only disables
/// the comparison.
fn benchmark_returns(session: &Session) -> Option<Vec<ReturnPoint>> {
    let code = session.run.benchmark.as_deref()?;
    match session
        .data
        .fetch_monthly_closes(code, session.run.start_date, session.run.end_date)
    {
        Ok(points) if !points.is_empty() => Some(returns::from_prices(&points)),
        Ok(_) => {
            warn!(benchmark = code, "benchmark has no data; comparison disabled");
            None
        }
        Err(e) => {
            warn!(benchmark = code, error = %e, "benchmark unavailable; comparison disabled");
            None
        }
    }
}

fn run_portfolio(config_path: &Path, output: Option<&Path>) -> Result<(), CrosstraderError> {
    info!(config = %config_path.display(), "loading config");
    let adapter = load_config(config_path)?;
    let session = open_session(&adapter)?;
    let portfolio_config = build_portfolio_config(&adapter)?;

    let result = portfolio_for(&session, &portfolio_config)?;
    let benchmark = benchmark_returns(&session);

    println!(
        "=== Equal-weight portfolio: {} instruments, {} slots ===",
        result.instruments.len(),
        portfolio_config.slots
    );
    if let (Some(first), Some(last)) = (result.returns.first(), result.returns.last()) {
        println!(
            "Period: {} to {} ({} months)",
            first.date,
            last.date,
            result.returns.len()
        );
    }
    println!("Max concurrent positions: {}", result.max_active());
    if let Some(latest) = result.active_counts.last() {
        println!("Active positions at {}: {}", latest.date, latest.count);
    }

    match Metrics::compute(&result.returns, benchmark.as_deref()) {
        Some(metrics) => print_metrics(&metrics),
        None => println!("No defined returns"),
    }
    print_monthly_table(&MonthlyReturnTable::from_returns(&result.returns));

    if let Some(dir) = output {
        export_portfolio(dir, &result)?;
    }
    Ok(())
}

/// Load the configured universe and run the equal-weight backtest on it.
pub fn portfolio_for(
    session: &Session,
    config: &PortfolioConfig,
) -> Result<PortfolioResult, CrosstraderError> {
    let loaded = load_universe(
        &session.data,
        &session.run.codes,
        session.run.start_date,
        session.run.end_date,
        session.windows.min_periods(),
    )?;
    for skipped in &loaded.skipped {
        println!(
            "Skipped {}: {}",
            describe(&skipped.code),
            skip_reason(&skipped.reason)
        );
    }

    Ok(backtest_portfolio(&loaded.series, &session.windows, config))
}

fn run_signals(config_path: &Path) -> Result<(), CrosstraderError> {
    let adapter = load_config(config_path)?;
    let session = open_session(&adapter)?;

    let loaded = load_universe(
        &session.data,
        &session.run.codes,
        session.run.start_date,
        session.run.end_date,
        session.windows.min_periods(),
    )?;
    let scan = scan_universe(&loaded.series, &session.windows);

    print_scan_section("New buys", &scan.new_buys);
    print_scan_section("New sells", &scan.new_sells);
    print_scan_section("Holding", &scan.holds);

    let skipped = loaded.skipped.len() + scan.skipped.len();
    if skipped > 0 {
        println!("\n{} instruments skipped", skipped);
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), CrosstraderError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;

    let run = build_run_config(&adapter)?;
    let windows = build_window_config(&adapter)?;
    let portfolio = build_portfolio_config(&adapter)?;

    println!("Configuration is valid");
    println!(
        "  windows:   SMA({}) / SMA({})",
        windows.short_window, windows.long_window
    );
    println!("  slots:     {}", portfolio.slots);
    println!("  codes:     {}", run.codes.join(", "));
    println!("  range:     {} to {}", run.start_date, run.end_date);
    println!("  data:      {}", run.data_path.display());
    if let Some(bm) = &run.benchmark {
        println!("  benchmark: {}", bm);
    }
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), CrosstraderError> {
    let adapter = load_config(config_path)?;
    let run = build_run_config(&adapter)?;
    let data = CsvAdapter::new(run.data_path);

    let symbols = data.list_symbols()?;
    if symbols.is_empty() {
        warn!("no symbols found");
    }
    for symbol in &symbols {
        match display_name(symbol) {
            Some(name) => println!("{}\t{}", symbol, name),
            None => println!("{}", symbol),
        }
    }
    info!(count = symbols.len(), "symbols listed");
    Ok(())
}

fn describe(code: &str) -> String {
    match display_name(code) {
        Some(name) => format!("{} {}", code, name),
        None => code.to_string(),
    }
}

fn skip_reason(reason: &SkipReason) -> String {
    match reason {
        SkipReason::NoData => "no data".to_string(),
        SkipReason::InsufficientPeriods { periods } => {
            format!("only {} monthly closes", periods)
        }
    }
}

fn print_metrics(metrics: &Metrics) {
    println!("\n=== Performance ===");
    for (name, value) in metrics.to_named() {
        println!("{:<36} {:>10.2}", name, value);
    }
}

fn print_growth_comparison(result: &InstrumentBacktest, benchmark: &[ReturnPoint]) {
    let aligned = aligned_benchmark_growth(&result.cumulative, benchmark);
    if let (Some(strategy), Some(bm)) = (result.cumulative.last(), aligned.last()) {
        println!(
            "Growth of 1 at {}: strategy {:.4}, benchmark {:.4}",
            strategy.date, strategy.equity, bm.equity
        );
    }
}

fn print_trades(trades: &[ClosedTrade]) {
    let wins = trades.iter().filter(|t| t.is_win()).count();
    println!("\n=== Trades ({}, {} winning) ===", trades.len(), wins);
    for t in trades {
        println!(
            "  {} -> {} ({:>3}m)  {:>10.2} -> {:>10.2}  {:+.2}%",
            t.entry_date,
            t.exit_date,
            t.holding_months(),
            t.entry_price,
            t.exit_price,
            t.return_pct
        );
    }
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn print_monthly_table(table: &MonthlyReturnTable) {
    if table.rows.is_empty() {
        return;
    }
    println!("\n=== Monthly Returns (%) ===");
    let header: Vec<String> = MONTHS.iter().map(|m| format!("{:>7}", m)).collect();
    println!("{:<6}{}", "Year", header.join(""));
    for (year, row) in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Some(v) => format!("{:>7.2}", v),
                None => format!("{:>7}", "-"),
            })
            .collect();
        println!("{:<6}{}", year, cells.join(""));
    }
}

fn print_scan_section(title: &str, entries: &[ScanEntry]) {
    println!("\n=== {} ({}) ===", title, entries.len());
    for e in entries {
        println!("  {:<32} {}  {:>12.2}", describe(&e.code), e.as_of, e.close);
    }
}

#[derive(Debug, Serialize)]
struct EquityRow {
    date: chrono::NaiveDate,
    #[serde(rename = "return")]
    value: Option<f64>,
    equity: f64,
}

#[derive(Debug, Serialize)]
struct PortfolioRow {
    date: chrono::NaiveDate,
    #[serde(rename = "return")]
    value: Option<f64>,
    equity: f64,
    active: usize,
}

const SIGNAL_HEADER: [&str; 8] = [
    "date", "close", "short_ma", "long_ma", "signal", "position", "buy", "sell",
];
const TRADE_HEADER: [&str; 5] = ["entry_date", "exit_date", "entry_price", "exit_price", "return_pct"];
const EQUITY_HEADER: [&str; 3] = ["date", "return", "equity"];
const PORTFOLIO_HEADER: [&str; 4] = ["date", "return", "equity", "active"];

/// Header is written up front so an empty export still names its columns.
fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), CrosstraderError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

pub fn export_backtest(
    dir: &Path,
    code: &str,
    result: &InstrumentBacktest,
) -> Result<(), CrosstraderError> {
    fs::create_dir_all(dir)?;
    write_csv(&dir.join(format!("{code}_signals.csv")), &SIGNAL_HEADER, &result.signals)?;
    write_csv(&dir.join(format!("{code}_trades.csv")), &TRADE_HEADER, &result.trades)?;

    let equity: Vec<EquityRow> = result
        .returns
        .iter()
        .zip(&result.cumulative)
        .map(|(r, e)| EquityRow {
            date: r.date,
            value: r.value,
            equity: e.equity,
        })
        .collect();
    write_csv(&dir.join(format!("{code}_equity.csv")), &EQUITY_HEADER, &equity)
}

pub fn export_portfolio(dir: &Path, result: &PortfolioResult) -> Result<(), CrosstraderError> {
    fs::create_dir_all(dir)?;
    let rows: Vec<PortfolioRow> = result
        .returns
        .iter()
        .zip(&result.cumulative)
        .zip(&result.active_counts)
        .map(|((r, e), a)| PortfolioRow {
            date: r.date,
            value: r.value,
            equity: e.equity,
            active: a.count,
        })
        .collect();
    write_csv(&dir.join("portfolio.csv"), &PORTFOLIO_HEADER, &rows)
}
