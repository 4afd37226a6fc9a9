use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};

/// Queue depth between the key reader and the loop. The reader blocks when
/// it is full rather than dropping keys.
pub const INPUT_QUEUE_CAPACITY: usize = 32;

/// Discrete input produced by the terminal driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Printable ASCII character
    Char(char),
    Backspace,
    /// Ctrl+C
    Interrupt,
    Escape,
    Enter,
    Up,
    Down,
    Resize,
}

impl InputEvent {
    /// Maps a raw crossterm event; `None` for everything the app ignores.
    pub fn from_crossterm(ev: CtEvent) -> Option<Self> {
        match ev {
            CtEvent::Key(key) => Self::from_key(key),
            CtEvent::Resize(_, _) => Some(InputEvent::Resize),
            _ => None,
        }
    }

    fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(InputEvent::Interrupt)
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => None,
            KeyCode::Char(c) if (' '..='~').contains(&c) => Some(InputEvent::Char(c)),
            KeyCode::Backspace => Some(InputEvent::Backspace),
            KeyCode::Esc => Some(InputEvent::Escape),
            KeyCode::Enter => Some(InputEvent::Enter),
            KeyCode::Up => Some(InputEvent::Up),
            KeyCode::Down => Some(InputEvent::Down),
            _ => None,
        }
    }
}

/// A reader failure is clean when the stream simply ended.
pub fn is_clean_shutdown(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe
    )
}

/// Source of terminal input: one queue for events, one for reader failures.
pub trait EventSource {
    fn events(&self) -> &Receiver<InputEvent>;
    fn errors(&self) -> &Receiver<io::Error>;
}

/// Production event source: a blocking crossterm reader on its own thread.
///
/// The reader thread is never joined. Its last `event::read()` only returns
/// when the process exits.
pub struct CrosstermEventSource {
    events: Receiver<InputEvent>,
    errors: Receiver<io::Error>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, events) = bounded(INPUT_QUEUE_CAPACITY);
        let (err_tx, errors) = bounded(1);

        std::thread::Builder::new()
            .name("typr-input".into())
            .spawn(move || read_loop(tx, err_tx))
            .map_err(|err| warn!(%err, "failed to spawn input reader"))
            .ok();

        Self { events, errors }
    }
}

fn read_loop(tx: Sender<InputEvent>, err_tx: Sender<io::Error>) {
    loop {
        match event::read() {
            Ok(raw) => {
                let Some(ev) = InputEvent::from_crossterm(raw) else {
                    continue;
                };
                if tx.send(ev).is_err() {
                    debug!("input queue closed, reader exiting");
                    break;
                }
            }
            Err(err) => {
                let _ = err_tx.send(err);
                break;
            }
        }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn events(&self) -> &Receiver<InputEvent> {
        &self.events
    }

    fn errors(&self) -> &Receiver<io::Error> {
        &self.errors
    }
}

/// Event source fed by the test through plain channels
pub struct TestEventSource {
    events: Receiver<InputEvent>,
    errors: Receiver<io::Error>,
}

impl TestEventSource {
    pub fn new(events: Receiver<InputEvent>, errors: Receiver<io::Error>) -> Self {
        Self { events, errors }
    }

    /// Source with its two senders, sized like the production queue.
    pub fn channel() -> (Sender<InputEvent>, Sender<io::Error>, Self) {
        let (tx, events) = bounded(INPUT_QUEUE_CAPACITY);
        let (err_tx, errors) = bounded(1);
        (tx, err_tx, Self::new(events, errors))
    }
}

impl EventSource for TestEventSource {
    fn events(&self) -> &Receiver<InputEvent> {
        &self.events
    }

    fn errors(&self) -> &Receiver<io::Error> {
        &self.errors
    }
}

/// Configurable ticker interface
pub trait Ticker {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Time source for the loop. Read once per event.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock for tests: advances by `step` after every read, and
/// can be moved forward by hand from another thread.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self::stepping(start, Duration::ZERO)
    }

    pub fn stepping(start: Instant, step: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        let current = *now;
        *now += self.step;
        current
    }
}

/// External cancellation source. Any clone can end the run.
#[derive(Clone, Debug)]
pub struct Canceller {
    tx: Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Canceller {
    pub fn new() -> (Self, Receiver<()>) {
        let (tx, rx) = bounded(1);
        let fired = Arc::new(AtomicBool::new(false));
        (Self { tx, fired }, rx)
    }

    pub fn cancel(&self) {
        self.fired.store(true, Ordering::SeqCst);
        // a full queue already carries a pending cancellation
        let _ = self.tx.try_send(());
    }

    /// True once any clone has called [`Canceller::cancel`].
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Routes SIGTERM, SIGINT and SIGHUP to `canceller` from a dedicated thread,
/// replacing their default action so the terminal is restored on the way out.
#[cfg(unix)]
pub fn cancel_on_signals(canceller: Canceller) -> io::Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

    forward_signals(&[SIGTERM, SIGINT, SIGHUP], canceller)
}

#[cfg(unix)]
fn forward_signals(kinds: &[std::ffi::c_int], canceller: Canceller) -> io::Result<()> {
    let mut signals = signal_hook::iterator::Signals::new(kinds)?;
    std::thread::Builder::new()
        .name("typr-signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                info!(signal, "termination signal received");
                canceller.cancel();
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub fn cancel_on_signals(_canceller: Canceller) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> CtEvent {
        CtEvent::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn maps_printable_ascii() {
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(InputEvent::Char('a'))
        );
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(InputEvent::Char('A'))
        );
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(InputEvent::Char(' '))
        );
    }

    #[test]
    fn drops_non_ascii_and_control_chords() {
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Char('é'), KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Tab, KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn maps_ctrl_c_to_interrupt() {
        assert_eq!(
            InputEvent::from_crossterm(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputEvent::Interrupt)
        );
    }

    #[test]
    fn maps_editing_and_navigation_keys() {
        let cases = [
            (KeyCode::Backspace, InputEvent::Backspace),
            (KeyCode::Esc, InputEvent::Escape),
            (KeyCode::Enter, InputEvent::Enter),
            (KeyCode::Up, InputEvent::Up),
            (KeyCode::Down, InputEvent::Down),
        ];
        for (code, expected) in cases {
            assert_eq!(
                InputEvent::from_crossterm(key(code, KeyModifiers::NONE)),
                Some(expected)
            );
        }
        assert_eq!(
            InputEvent::from_crossterm(CtEvent::Resize(80, 24)),
            Some(InputEvent::Resize)
        );
    }

    #[test]
    fn ignores_key_release() {
        let mut release = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(InputEvent::from_crossterm(CtEvent::Key(release)), None);
    }

    #[test]
    fn eof_is_clean_shutdown() {
        assert!(is_clean_shutdown(&io::Error::from(io::ErrorKind::UnexpectedEof)));
        assert!(!is_clean_shutdown(&io::Error::other("tty vanished")));
    }

    #[test]
    fn test_source_queue_is_bounded() {
        let (tx, _err_tx, source) = TestEventSource::channel();
        for _ in 0..INPUT_QUEUE_CAPACITY {
            tx.try_send(InputEvent::Char('a')).unwrap();
        }
        assert!(tx.try_send(InputEvent::Char('a')).is_err());
        assert_eq!(source.events().len(), INPUT_QUEUE_CAPACITY);
    }

    #[test]
    fn manual_clock_steps_and_advances() {
        let t0 = Instant::now();
        let clock = ManualClock::stepping(t0, Duration::from_millis(10));
        assert_eq!(clock.now(), t0);
        assert_eq!(clock.now(), t0 + Duration::from_millis(10));

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), t0 + Duration::from_millis(1020));
    }

    #[test]
    fn canceller_is_idempotent() {
        let (canceller, rx) = Canceller::new();
        canceller.cancel();
        canceller.clone().cancel();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn canceller_remembers_it_fired() {
        let (canceller, _rx) = Canceller::new();
        let other = canceller.clone();
        assert!(!canceller.is_cancelled());
        other.cancel();
        assert!(canceller.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn forwarded_signal_cancels() {
        use signal_hook::consts::SIGUSR1;

        let (canceller, rx) = Canceller::new();
        forward_signals(&[SIGUSR1], canceller.clone()).unwrap();

        signal_hook::low_level::raise(SIGUSR1).unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(canceller.is_cancelled());
    }

    #[test]
    fn fixed_ticker_reports_interval() {
        let ticker = FixedTicker::new(Duration::from_millis(50));
        assert_eq!(ticker.interval(), Duration::from_millis(50));
    }
}
