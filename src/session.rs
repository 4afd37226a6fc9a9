use std::time::{Duration, Instant};

use crate::metrics::Metrics;
use crate::scoring::{accuracy, count_correct_words, net_wpm, raw_wpm};

/// Keystroke history and timing for one run against a fixed target.
///
/// Every method is total: calls that make no sense in the current state
/// (typing past the end, backspacing at position 0) are no-ops. The session
/// never reads the clock; callers pass `now` in. It has no internal locking,
/// so exactly one owner may mutate it, which is the [`crate::controller::Controller`].
#[derive(Debug, Clone)]
pub struct Session {
    target: Vec<char>,
    input: Vec<char>,
    cursor: usize,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    time_limit: Option<Duration>,
    total_typed: usize,
    correct_typed: usize,
    errors: usize,
}

impl Session {
    /// A zero `time_limit` means unlimited.
    pub fn new(target: &str, time_limit: Option<Duration>) -> Self {
        Self {
            target: target.chars().collect(),
            input: Vec::new(),
            cursor: 0,
            started_at: None,
            ended_at: None,
            time_limit: time_limit.filter(|limit| !limit.is_zero()),
            total_typed: 0,
            correct_typed: 0,
            errors: 0,
        }
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    pub fn total_typed(&self) -> usize {
        self.total_typed
    }

    pub fn correct_typed(&self) -> usize {
        self.correct_typed
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Types `ch` at the cursor and reports whether it matched the target.
    ///
    /// The first accepted keystroke starts the clock; the one that reaches
    /// the end of the target freezes it.
    pub fn apply_char(&mut self, ch: char, now: Instant) -> bool {
        if self.is_completed() {
            return false;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }

        let correct = ch == self.target[self.cursor];
        self.total_typed += 1;
        if correct {
            self.correct_typed += 1;
        } else {
            self.errors += 1;
        }

        if self.cursor < self.input.len() {
            self.input[self.cursor] = ch;
        } else {
            self.input.push(ch);
        }
        self.cursor += 1;

        if self.is_completed() {
            self.ended_at = Some(now);
        }
        correct
    }

    /// Erases the last typed character, exactly undoing its accounting.
    ///
    /// Re-opens a completed session.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;

        if let Some(&typed) = self.input.get(self.cursor) {
            self.total_typed -= 1;
            if typed == self.target[self.cursor] {
                self.correct_typed -= 1;
            } else {
                self.errors -= 1;
            }
        }

        self.input.truncate(self.cursor);
        self.ended_at = None;
    }

    pub fn is_completed(&self) -> bool {
        self.cursor >= self.target.len()
    }

    /// Idle time before the first keystroke never counts toward the limit.
    pub fn is_timed_out(&self, now: Instant) -> bool {
        match (self.started_at, self.time_limit) {
            (Some(started), Some(limit)) => now.saturating_duration_since(started) >= limit,
            _ => false,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        match self.ended_at {
            Some(ended) => ended.saturating_duration_since(started),
            None => now.saturating_duration_since(started),
        }
    }

    /// Time left before the limit, `None` when unlimited.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.time_limit
            .map(|limit| limit.saturating_sub(self.elapsed(now)))
    }

    /// Pure projection of the current state; the two flags are copied verbatim.
    pub fn snapshot(&self, now: Instant, timed_out: bool, cancelled: bool) -> Metrics {
        let elapsed = self.elapsed(now);
        let (correct_words, total_words) = count_correct_words(&self.target, &self.input);

        Metrics {
            wpm: net_wpm(self.correct_typed, elapsed),
            raw_wpm: raw_wpm(self.total_typed, elapsed),
            accuracy: accuracy(self.correct_typed, self.total_typed),
            errors: self.errors,
            total_typed: self.total_typed,
            correct: self.correct_typed,
            correct_words,
            total_words,
            time_taken: elapsed,
            completed: self.is_completed(),
            timed_out,
            cancelled,
        }
    }
}
