use std::io::stdin;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossbeam_channel::{never, select, tick, Receiver, RecvTimeoutError};
use crossterm::tty::IsTty;
use ratatui::backend::Backend;
use tracing::{error, info, warn};

use typr::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    content::{self, Mode},
    controller::{Controller, EndReason},
    history::{HistoryStore, HistorySummary, HistoryWriter, JsonHistoryStore, Record, MAX_RECORDS},
    logging,
    metrics::Metrics,
    runtime::{
        cancel_on_signals, is_clean_shutdown, Canceller, CrosstermEventSource, EventSource,
        FixedTicker, InputEvent, SystemClock,
    },
    session::Session,
    terminal::TerminalGuard,
    ui::{HistoryPanel, SummaryView, TerminalRenderer, Theme},
    Error, Result,
};

/// Records shown under the results.
const RECENT_RUNS: usize = 5;
const SUMMARY_TICK: Duration = Duration::from_millis(100);
/// How long exit waits for an unfinished history save.
const HISTORY_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// real-time terminal typing speed test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A real-time terminal typing speed test. The timer starts on your first keystroke; \
                  live WPM, raw WPM and accuracy update as you type."
)]
pub struct Cli {
    /// text to type: quote or code
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// number of words in the test
    #[clap(short = 'w', long)]
    words: Option<usize>,

    /// time limit in seconds, 0 for none
    #[clap(short = 't', long = "time")]
    time_secs: Option<u64>,

    /// custom text to type instead of a generated one
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// refresh interval of the live view in milliseconds
    #[clap(long)]
    tick_ms: Option<u64>,

    /// do not record this run
    #[clap(long)]
    no_history: bool,

    /// print recent results and exit
    #[clap(long)]
    history: bool,

    /// remember mode, words, time and tick as the new defaults
    #[clap(long)]
    save_defaults: bool,
}

impl Cli {
    /// Flags win over stored defaults.
    fn resolve(&self, stored: Config) -> Config {
        Config {
            mode: self.mode.unwrap_or(stored.mode),
            word_count: self.words.unwrap_or(stored.word_count),
            time_limit_secs: self.time_secs.unwrap_or(stored.time_limit_secs),
            tick_ms: self.tick_ms.unwrap_or(stored.tick_ms),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init_tracing(&AppDirs::log_dir());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "typr exited with an error");
            eprintln!("error: {err}");
            if err.is_usage() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_store = FileConfigStore::new();
    let config = cli.resolve(config_store.load());
    if cli.save_defaults {
        if let Err(err) = config_store.save(&config) {
            warn!(%err, "failed to save defaults");
        }
    }

    let history = JsonHistoryStore::new();
    if cli.history {
        print_history(&history);
        return Ok(());
    }

    let (text, word_count) = match &cli.prompt {
        Some(prompt) => {
            let text = content::validate_prompt(prompt)?;
            let words = text.split(' ').count();
            (text, words)
        }
        None => (
            content::generate_text(&config.mode.to_string(), config.word_count)?,
            config.word_count,
        ),
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }
    info!(mode = %config.mode, word_count, time_limit = config.time_limit_secs, "starting test");

    let (canceller, cancel_rx) = Canceller::new();
    if let Err(err) = cancel_on_signals(canceller.clone()) {
        warn!(%err, "signals will not be caught");
    }

    let mut guard = TerminalGuard::enter()?;
    let renderer = TerminalRenderer::new(guard.terminal(), Theme::default(), config.mode, word_count);
    let mut controller = Controller::new(
        CrosstermEventSource::new(),
        FixedTicker::new(config.tick_interval()),
        SystemClock,
        renderer,
    )
    .with_cancel(cancel_rx.clone());

    let report = controller.run(Session::new(&text, config.time_limit()))?;
    let (source, mut renderer) = controller.into_parts();

    let (panel, pending) = if cli.no_history || !Record::worth_saving(&report.metrics) {
        (HistoryPanel::Disabled, None)
    } else {
        let record = Record::new(&report.metrics, config.mode, word_count, Local::now());
        let rx = HistoryWriter::new(history).submit(record, RECENT_RUNS);
        (HistoryPanel::Loading, Some(rx))
    };

    // a signal asks for exit, not for the results screen
    let wait_for_keys = report.reason != EndReason::InputClosed && !canceller.is_cancelled();
    show_summary(
        &source,
        &mut renderer,
        &cancel_rx,
        &report.metrics,
        panel,
        pending.clone(),
        wait_for_keys,
    )?;

    guard.restore()?;
    if let Some(rx) = pending {
        flush_history(&rx);
    }
    Ok(())
}

/// Gives a save still in flight a bounded chance to finish before exit.
fn flush_history(pending: &Receiver<Vec<Record>>) {
    match pending.recv_timeout(HISTORY_FLUSH_TIMEOUT) {
        Ok(_) | Err(RecvTimeoutError::Disconnected) => {}
        Err(RecvTimeoutError::Timeout) => warn!("history save still running at exit"),
    }
}

enum SummaryInput {
    History(Option<Vec<Record>>),
    Key(Option<InputEvent>),
    ReadError(Option<std::io::Error>),
    Cancel,
    Tick,
}

fn show_summary<E: EventSource, B: Backend>(
    source: &E,
    renderer: &mut TerminalRenderer<'_, B>,
    cancel: &Receiver<()>,
    metrics: &Metrics,
    mut panel: HistoryPanel,
    pending: Option<Receiver<Vec<Record>>>,
    wait_for_keys: bool,
) -> Result<()> {
    let theme = *renderer.theme();
    let ticks = tick(SUMMARY_TICK);
    let events = source.events().clone();
    let mut errors = source.errors().clone();
    let cancel = cancel.clone();
    let mut pending = pending.unwrap_or_else(never);
    let mut scroll: u16 = 0;

    loop {
        let view = SummaryView {
            metrics,
            history: &panel,
            theme: &theme,
            scroll,
        };
        renderer.draw_summary(&view)?;
        if !wait_for_keys {
            return Ok(());
        }
        let max_scroll = view.max_scroll(renderer.height()?);

        let input = select! {
            recv(pending) -> recent => SummaryInput::History(recent.ok()),
            recv(events) -> ev => SummaryInput::Key(ev.ok()),
            recv(errors) -> err => SummaryInput::ReadError(err.ok()),
            recv(cancel) -> _ => SummaryInput::Cancel,
            recv(ticks) -> _ => SummaryInput::Tick,
        };

        match input {
            SummaryInput::History(recent) => {
                panel = recent.map_or(HistoryPanel::Disabled, HistoryPanel::Ready);
                pending = never();
            }
            SummaryInput::Key(None) => return Ok(()),
            SummaryInput::Key(Some(key)) => match key {
                InputEvent::Enter
                | InputEvent::Escape
                | InputEvent::Interrupt
                | InputEvent::Char('q') => return Ok(()),
                InputEvent::Up => scroll = scroll.saturating_sub(1),
                InputEvent::Down => scroll = (scroll + 1).min(max_scroll),
                _ => {}
            },
            SummaryInput::ReadError(Some(err)) if !is_clean_shutdown(&err) => {
                return Err(Error::Input(err))
            }
            SummaryInput::ReadError(Some(_)) => return Ok(()),
            SummaryInput::ReadError(None) => errors = never(),
            SummaryInput::Cancel => return Ok(()),
            SummaryInput::Tick => {}
        }
    }
}

fn print_history<S: HistoryStore>(store: &S) {
    let records = store.recent(MAX_RECORDS);
    if records.is_empty() {
        println!("No previous sessions yet.");
        return;
    }

    println!(
        "{:<12} {:<6} {:>5} {:>6} {:>6} {:>7}  {}",
        "Date", "Mode", "Words", "WPM", "Raw", "Acc", "Tier"
    );
    for r in &records {
        println!(
            "{:<12} {:<6} {:>5} {:>6.1} {:>6.1} {:>6.1}%  {}",
            r.date.format("%b %d %H:%M").to_string(),
            r.mode.to_string(),
            r.word_count,
            r.wpm,
            r.raw_wpm,
            r.accuracy,
            r.tier
        );
    }
    if let Some(summary) = HistorySummary::from_records(&records) {
        println!();
        println!(
            "{} runs  avg {:.1}  best {:.1}  worst {:.1}  sd {:.2}",
            summary.runs, summary.mean_wpm, summary.best_wpm, summary.worst_wpm, summary.wpm_std_dev
        );
    }
}
