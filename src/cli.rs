//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{validate_data_path, validate_replay_config};
use crate::domain::error::ReplayError;
use crate::domain::indicator::{
    macd, peaks, rsi, sma, stochastic, IndicatorConfig, StochasticSignal,
};
use crate::domain::policy::DEFAULT_MAX_SIGNAL_AGE;
use crate::domain::price::{parse_timestamp, Series};
use crate::domain::session::{Session, SessionConfig, Snapshot, DEFAULT_LEDGER_TAIL};
use crate::domain::summary::LedgerSummary;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::ledger_export_port::LedgerExportPort;

#[derive(Parser, Debug)]
#[command(name = "replaytrader", about = "Replay historical prices and practice trading")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the configured window to the end and export the trade ledger
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_auto: bool,
    },
    /// Step through the replay with commands read from stdin
    Interactive {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Validate a replay configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show point count and time range of a data file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            output,
            no_auto,
        } => run_replay(&config, data.as_deref(), output.as_deref(), no_auto),
        Command::Interactive { config, data } => run_interactive(&config, data.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

fn fail(err: &ReplayError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_indicator_config(config: &dyn ConfigPort) -> IndicatorConfig {
    IndicatorConfig {
        ma_period: config.get_usize("indicators", "ma_period", sma::DEFAULT_PERIOD),
        rsi_period: config.get_usize("indicators", "rsi_period", rsi::DEFAULT_PERIOD),
        macd_fast: config.get_usize("indicators", "macd_fast", macd::DEFAULT_FAST),
        macd_slow: config.get_usize("indicators", "macd_slow", macd::DEFAULT_SLOW),
        macd_signal: config.get_usize("indicators", "macd_signal", macd::DEFAULT_SIGNAL),
        stoch_k: config.get_usize("indicators", "stoch_k", stochastic::DEFAULT_K_PERIOD),
        stoch_d: config.get_usize("indicators", "stoch_d", stochastic::DEFAULT_D_PERIOD),
        peak_distance: config.get_usize("indicators", "peak_distance", peaks::DEFAULT_DISTANCE),
        peak_prominence: config.get_double(
            "indicators",
            "peak_prominence",
            peaks::DEFAULT_PROMINENCE,
        ),
    }
}

/// Resolve the replay window against `series`.
///
/// `[data] start` / `end` timestamps, when present, take precedence over
/// `[playback] start_index` / `end_index`.
pub fn build_session_config(
    config: &dyn ConfigPort,
    series: &Series,
) -> Result<SessionConfig, ReplayError> {
    let start_index = match window_timestamp(config, "start")? {
        Some(ts) => series.index_at_or_after(ts).ok_or_else(|| {
            ReplayError::out_of_range(format!("no data at or after start {}", ts))
        })?,
        None => config.get_usize("playback", "start_index", 0),
    };
    let end_index = match window_timestamp(config, "end")? {
        Some(ts) => Some(series.index_at_or_before(ts).ok_or_else(|| {
            ReplayError::out_of_range(format!("no data at or before end {}", ts))
        })?),
        None => config
            .get_string("playback", "end_index")
            .map(|_| config.get_usize("playback", "end_index", 0)),
    };

    Ok(SessionConfig {
        start_index,
        end_index,
        step_size: config.get_usize("playback", "step_size", 1),
        auto_trade: config.get_bool("trading", "auto_trade", true),
        max_signal_age: config.get_usize("trading", "max_signal_age", DEFAULT_MAX_SIGNAL_AGE),
        ledger_tail: config.get_usize("trading", "ledger_tail", DEFAULT_LEDGER_TAIL),
        indicators: build_indicator_config(config),
    })
}

fn window_timestamp(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<chrono::NaiveDateTime>, ReplayError> {
    match config.get_string("data", key).filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| ReplayError::ConfigInvalid {
                section: "data".into(),
                key: key.into(),
                reason: format!("invalid timestamp {:?}", s),
            }),
    }
}

/// Command-line path wins over `[data] path`.
pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, ReplayError> {
    if let Some(path) = data_override {
        return Ok(path.to_path_buf());
    }
    validate_data_path(config)?;
    config
        .get_string("data", "path")
        .map(|p| PathBuf::from(p.trim()))
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

/// Load config and data and build a session. Shared by `run` and
/// `interactive`.
pub fn prepare_session(
    config: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<Session, ReplayError> {
    validate_replay_config(config)?;
    let data_path = resolve_data_path(data_override, config)?;
    eprintln!("Loading data from {}", data_path.display());
    let series = CsvAdapter::new().load_series(&data_path)?;
    if series.is_empty() {
        return Err(ReplayError::Data {
            reason: format!("{} contains no price points", data_path.display()),
        });
    }
    let session_config = build_session_config(config, &series)?;
    Session::with_default_policy(series, session_config)
}

fn run_replay(
    config_path: &Path,
    data: Option<&Path>,
    output: Option<&Path>,
    no_auto: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut session = match prepare_session(&adapter, data) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if no_auto {
        session.set_auto_trade(false);
    }

    let playback = session.playback();
    eprintln!(
        "Replaying indices {} to {} (step {})",
        playback.start_index, playback.end_index, playback.step_size
    );

    let snapshot = match session.run_to_end() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let mut stdout = io::stdout().lock();
    let printed = print_snapshot(&mut stdout, &snapshot)
        .and_then(|_| print_summary(&mut stdout, &session.summary()));
    if let Err(e) = printed {
        return fail(&e);
    }

    let export_path = output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("data", "output").map(PathBuf::from));
    match export_path {
        Some(path) => match CsvLedgerAdapter::new().export(session.ledger(), &path) {
            Ok(true) => {
                eprintln!("\nLedger written to: {}", path.display());
                ExitCode::SUCCESS
            }
            Ok(false) => {
                eprintln!("\nNo closed trades, ledger not written");
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
        None => ExitCode::SUCCESS,
    }
}

fn run_interactive(config_path: &Path, data: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut session = match prepare_session(&adapter, data) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("Type `help` for commands.");
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    match run_commands(&mut session, stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_replay_config(&adapter).and_then(|_| validate_data_path(&adapter));
    if let Err(e) = checked {
        return fail(&e);
    }

    let indicators = build_indicator_config(&adapter);
    eprintln!("\nIndicators:");
    eprintln!("  moving average: {}", indicators.ma_period);
    eprintln!("  rsi:            {}", indicators.rsi_period);
    eprintln!(
        "  macd:           {}/{}/{}",
        indicators.macd_fast, indicators.macd_slow, indicators.macd_signal
    );
    eprintln!(
        "  stochastic:     {}/{}",
        indicators.stoch_k, indicators.stoch_d
    );
    eprintln!(
        "  peaks:          distance {}, prominence {}",
        indicators.peak_distance, indicators.peak_prominence
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(data: &Path) -> ExitCode {
    let series = match CsvAdapter::new().load_series(data) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match (series.first_timestamp(), series.last_timestamp()) {
        (Some(first), Some(last)) => {
            println!("{}: {} points, {} to {}", data.display(), series.len(), first, last);
        }
        _ => println!("{}: no data", data.display()),
    }
    ExitCode::SUCCESS
}

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Start,
    Tick(usize),
    Pause,
    Resume,
    Reset,
    Buy,
    Sell,
    Close,
    Auto(bool),
    Status,
    Ledger,
    Summary,
    Export(PathBuf),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("empty command".into());
    };
    let arg = parts.next();

    let command = match (word.to_lowercase().as_str(), arg) {
        ("start", None) => ReplCommand::Start,
        ("tick", None) => ReplCommand::Tick(1),
        ("tick", Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Tick(n),
            _ => return Err(format!("invalid tick count {:?}", n)),
        },
        ("pause", None) => ReplCommand::Pause,
        ("resume", None) => ReplCommand::Resume,
        ("reset", None) => ReplCommand::Reset,
        ("buy", None) => ReplCommand::Buy,
        ("sell", None) => ReplCommand::Sell,
        ("close", None) => ReplCommand::Close,
        ("auto", Some("on")) => ReplCommand::Auto(true),
        ("auto", Some("off")) => ReplCommand::Auto(false),
        ("status", None) => ReplCommand::Status,
        ("ledger", None) => ReplCommand::Ledger,
        ("summary", None) => ReplCommand::Summary,
        ("export", Some(path)) => ReplCommand::Export(PathBuf::from(path)),
        ("help", None) => ReplCommand::Help,
        ("quit" | "exit", None) => ReplCommand::Quit,
        _ => return Err(format!("unrecognised command {:?}", line.trim())),
    };
    if parts.next().is_some() {
        return Err(format!("too many arguments in {:?}", line.trim()));
    }
    Ok(command)
}

const HELP: &str = "commands: start, tick [n], pause, resume, reset, buy, sell, close, \
auto on|off, status, ledger, summary, export <path>, help, quit";

/// Drive `session` from `input` until `quit` or end of input.
///
/// Rejected operations are reported on `out` and the loop continues; only
/// fatal errors end it.
pub fn run_commands<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    out: &mut W,
) -> Result<(), ReplayError> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(msg) => {
                writeln!(out, "error: {}", msg)?;
                continue;
            }
        };

        let result = match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => {
                writeln!(out, "{}", HELP)?;
                continue;
            }
            ReplCommand::Start => session.start().map(Some),
            ReplCommand::Tick(n) => tick_n(session, n),
            ReplCommand::Pause => session.pause().map(Some),
            ReplCommand::Resume => session.resume().map(Some),
            ReplCommand::Reset => session.reset().map(Some),
            ReplCommand::Buy => session.buy().map(Some),
            ReplCommand::Sell => session.sell().map(Some),
            ReplCommand::Close => session.close().map(Some),
            ReplCommand::Auto(enabled) => {
                session.set_auto_trade(enabled);
                writeln!(out, "auto trading {}", if enabled { "on" } else { "off" })?;
                continue;
            }
            ReplCommand::Status => session.snapshot().map(Some),
            ReplCommand::Ledger => {
                print_ledger(out, session.ledger())?;
                continue;
            }
            ReplCommand::Summary => {
                print_summary(out, &session.summary())?;
                continue;
            }
            ReplCommand::Export(path) => {
                match CsvLedgerAdapter::new().export(session.ledger(), &path) {
                    Ok(true) => writeln!(out, "ledger written to {}", path.display())?,
                    Ok(false) => writeln!(out, "no closed trades to export")?,
                    Err(e) => writeln!(out, "error: {}", e)?,
                }
                continue;
            }
        };

        match result {
            Ok(Some(snapshot)) => print_snapshot(out, &snapshot)?,
            Ok(None) => {}
            Err(e) if !e.is_fatal() => writeln!(out, "error: {}", e)?,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Up to `n` ticks, stopping early at the end of playback.
fn tick_n(session: &mut Session, n: usize) -> Result<Option<Snapshot>, ReplayError> {
    let mut last = None;
    for _ in 0..n {
        if session.is_finished() && last.is_some() {
            break;
        }
        last = Some(session.tick()?);
    }
    Ok(last)
}

pub fn print_snapshot<W: Write>(out: &mut W, snapshot: &Snapshot) -> Result<(), ReplayError> {
    let point = snapshot.current();
    let ind = &snapshot.indicators;

    write!(
        out,
        "[{}] {} {} close={:.5}",
        snapshot.playback.current_index, point.timestamp, snapshot.phase, point.close
    )?;
    if let Some(ma) = ind.moving_average {
        write!(out, " ma={:.5}", ma)?;
    }
    write!(out, " rsi={:.1}", ind.rsi)?;
    if let Some(m) = ind.macd {
        write!(out, " macd={:.5}/{:.5}", m.line, m.signal)?;
    }
    write!(
        out,
        " stoch={:.1}/{:.1}",
        ind.stochastic.k, ind.stochastic.d
    )?;
    if ind.stochastic.crossed_up {
        write!(out, " cross=up")?;
    } else if ind.stochastic.crossed_down {
        write!(out, " cross=down")?;
    }
    if ind.stochastic.signal != StochasticSignal::Neutral {
        write!(out, " stoch_signal={}", ind.stochastic.signal)?;
    }
    match (&snapshot.position, snapshot.unrealized_profit()) {
        (Some(p), Some(upl)) => write!(
            out,
            " position={}@{:.5} upl={:+.5}",
            p.direction, p.entry_price, upl
        )?,
        _ => write!(out, " position=none")?,
    }
    writeln!(out, " trades={}", snapshot.ledger_len)?;
    Ok(())
}

pub fn print_ledger<W: Write>(
    out: &mut W,
    ledger: &[crate::domain::position::TradeRecord],
) -> Result<(), ReplayError> {
    if ledger.is_empty() {
        writeln!(out, "no closed trades")?;
        return Ok(());
    }
    for (i, t) in ledger.iter().enumerate() {
        writeln!(
            out,
            "{:>3}  {:<4} {} @ {:.5} -> {} @ {:.5}  {:+.5}",
            i + 1,
            t.direction.trade_type(),
            t.entry_time,
            t.entry_price,
            t.exit_time,
            t.exit_price,
            t.profit
        )?;
    }
    Ok(())
}

pub fn print_summary<W: Write>(out: &mut W, summary: &LedgerSummary) -> Result<(), ReplayError> {
    writeln!(out, "\n=== Ledger Summary ===")?;
    writeln!(out, "Total Trades:     {}", summary.total_trades)?;
    writeln!(
        out,
        "Won/Lost/Even:    {}/{}/{}",
        summary.trades_won, summary.trades_lost, summary.trades_breakeven
    )?;
    writeln!(out, "Win Rate:         {:.1}%", summary.win_rate * 100.0)?;
    writeln!(out, "Total Profit:     {:+.5}", summary.total_profit)?;
    writeln!(out, "Profit Factor:    {:.2}", summary.profit_factor)?;
    writeln!(out, "Avg Win:          {:.5}", summary.avg_win)?;
    writeln!(out, "Avg Loss:         {:.5}", summary.avg_loss)?;
    writeln!(out, "Largest Win:      {:.5}", summary.largest_win)?;
    writeln!(out, "Largest Loss:     {:.5}", summary.largest_loss)?;
    writeln!(out, "Max Drawdown:     {:.5}", summary.max_drawdown)?;
    writeln!(
        out,
        "Avg Holding:      {:.0} min",
        summary.avg_holding_minutes
    )?;
    Ok(())
}
