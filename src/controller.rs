//! The reconciliation loop for a single run.
//!
//! Input events, a periodic tick and an external cancellation queue are
//! multiplexed into one stream of session mutations. Each event is handled
//! to completion before the next one is taken, and the loop is the only code
//! path that mutates the [`Session`]: it takes the session by value and hands
//! it back in the [`RunReport`]. Adding a second mutation path would require
//! serialising it through this loop.

use std::io;
use std::time::{Duration, Instant};

use crossbeam_channel::{never, select, tick, Receiver};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::runtime::{is_clean_shutdown, Clock, EventSource, InputEvent, Ticker};
use crate::session::Session;

/// Everything the live view needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct LiveFrame<'a> {
    pub target: &'a [char],
    pub input: &'a [char],
    pub metrics: &'a Metrics,
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
}

/// Draws live frames. Nothing flows back into the loop.
pub trait Renderer {
    fn draw_live(&mut self, frame: &LiveFrame<'_>) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum EndReason {
    Completed,
    TimedOut,
    Cancelled,
    InputClosed,
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub reason: EndReason,
    /// Final snapshot with the flags of whichever condition ended the run
    pub metrics: Metrics,
    pub session: Session,
}

enum Step {
    Continue,
    End(EndReason),
}

/// Which queue woke the loop; `None`/`false` means it disconnected.
enum Fired {
    Tick,
    Cancel(bool),
    ReadError(Option<io::Error>),
    Input(Option<InputEvent>),
}

pub struct Controller<E, T, C, R> {
    source: E,
    ticker: T,
    clock: C,
    renderer: R,
    cancel: Receiver<()>,
}

impl<E, T, C, R> Controller<E, T, C, R>
where
    E: EventSource,
    T: Ticker,
    C: Clock,
    R: Renderer,
{
    pub fn new(source: E, ticker: T, clock: C, renderer: R) -> Self {
        Self {
            source,
            ticker,
            clock,
            renderer,
            cancel: never(),
        }
    }

    /// Adds an external cancellation queue, see [`crate::runtime::Canceller`].
    pub fn with_cancel(mut self, cancel: Receiver<()>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Gives back the input source and renderer once the run is over.
    pub fn into_parts(self) -> (E, R) {
        (self.source, self.renderer)
    }

    /// Drives `session` until it completes, times out, is cancelled or the
    /// input stream closes. Fatal input and render errors abort without a
    /// report.
    pub fn run(&mut self, mut session: Session) -> Result<RunReport> {
        let ticks = tick(self.ticker.interval());
        let events = self.source.events().clone();
        let mut errors = self.source.errors().clone();
        let mut cancel = self.cancel.clone();

        info!(
            target_len = session.target().len(),
            time_limit = ?session.time_limit(),
            "run started"
        );
        self.render(&session, self.clock.now())?;

        let reason = loop {
            let fired = select! {
                recv(ticks) -> _ => Fired::Tick,
                recv(cancel) -> msg => Fired::Cancel(msg.is_ok()),
                recv(errors) -> err => Fired::ReadError(err.ok()),
                recv(events) -> ev => Fired::Input(ev.ok()),
            };

            let step = match fired {
                Fired::Tick => {
                    let now = self.clock.now();
                    let timed_out = session.is_timed_out(now);
                    self.render(&session, now)?;
                    if timed_out {
                        Step::End(EndReason::TimedOut)
                    } else {
                        Step::Continue
                    }
                }
                Fired::Cancel(true) => Step::End(EndReason::Cancelled),
                Fired::Cancel(false) => {
                    // every canceller is gone; nothing can cancel any more
                    cancel = never();
                    Step::Continue
                }
                Fired::ReadError(Some(err)) if is_clean_shutdown(&err) => {
                    debug!(%err, "input stream closed");
                    Step::End(EndReason::InputClosed)
                }
                Fired::ReadError(Some(err)) => return Err(Error::Input(err)),
                Fired::ReadError(None) => {
                    // reader exited without reporting; the event queue tells us why
                    errors = never();
                    Step::Continue
                }
                Fired::Input(Some(ev)) => {
                    let now = self.clock.now();
                    self.on_event(&mut session, ev, now)?
                }
                Fired::Input(None) => Step::End(EndReason::InputClosed),
            };

            if let Step::End(reason) = step {
                break reason;
            }
        };

        let metrics = session.snapshot(
            self.clock.now(),
            reason == EndReason::TimedOut,
            reason == EndReason::Cancelled,
        );
        info!(
            %reason,
            wpm = metrics.wpm,
            accuracy = metrics.accuracy,
            errors = metrics.errors,
            "run ended"
        );

        Ok(RunReport {
            reason,
            metrics,
            session,
        })
    }

    fn on_event(&mut self, session: &mut Session, ev: InputEvent, now: Instant) -> Result<Step> {
        match ev {
            InputEvent::Interrupt | InputEvent::Escape => return Ok(Step::End(EndReason::Cancelled)),
            InputEvent::Char(c) => {
                session.apply_char(c, now);
            }
            InputEvent::Backspace => session.backspace(),
            InputEvent::Resize => {
                self.render(session, now)?;
                return Ok(Step::Continue);
            }
            InputEvent::Enter | InputEvent::Up | InputEvent::Down => return Ok(Step::Continue),
        }

        self.render(session, now)?;

        if session.is_completed() {
            Ok(Step::End(EndReason::Completed))
        } else if session.is_timed_out(now) {
            // a slow keystroke can cross the limit between ticks
            Ok(Step::End(EndReason::TimedOut))
        } else {
            Ok(Step::Continue)
        }
    }

    fn render(&mut self, session: &Session, now: Instant) -> Result<()> {
        let metrics = session.snapshot(now, false, false);
        let frame = LiveFrame {
            target: session.target(),
            input: session.input(),
            metrics: &metrics,
            elapsed: session.elapsed(now),
            remaining: session.remaining(now),
        };
        self.renderer.draw_live(&frame).map_err(Error::Terminal)
    }
}
