use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time projection of a session. Never stored by the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub wpm: f64,
    pub raw_wpm: f64,
    pub accuracy: f64,
    pub errors: usize,
    pub total_typed: usize,
    pub correct: usize,
    pub correct_words: usize,
    pub total_words: usize,
    pub time_taken: Duration,
    pub completed: bool,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl Metrics {
    pub fn tier(&self) -> Tier {
        crate::scoring::performance_tier(self.wpm)
    }

    pub fn result_label(&self) -> &'static str {
        if self.cancelled {
            "Stopped by user"
        } else if self.timed_out {
            "Time limit reached"
        } else if self.completed {
            "Text completed"
        } else {
            "Input closed"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Tier {
    Beginner,
    Average,
    Fast,
    Elite,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Metrics {
        Metrics {
            wpm: 55.0,
            raw_wpm: 60.0,
            accuracy: 97.5,
            errors: 1,
            total_typed: 40,
            correct: 39,
            correct_words: 7,
            total_words: 8,
            time_taken: Duration::from_secs(9),
            completed: true,
            timed_out: false,
            cancelled: false,
        }
    }

    #[test]
    fn test_tier_follows_wpm() {
        assert_eq!(base().tier(), Tier::Fast);
    }

    #[test]
    fn test_result_label_precedence() {
        let mut m = base();
        assert_eq!(m.result_label(), "Text completed");
        m.timed_out = true;
        assert_eq!(m.result_label(), "Time limit reached");
        m.cancelled = true;
        assert_eq!(m.result_label(), "Stopped by user");
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Elite.to_string(), "Elite");
        assert_eq!(Tier::Beginner.to_string(), "Beginner");
    }
}
