use std::time::Duration;

use crate::metrics::Tier;

/// Characters per "word" in the usual typing-test convention.
pub const CHARS_PER_WORD: f64 = 5.0;

fn words_per_minute(chars: usize, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if chars == 0 || minutes <= 0.0 {
        return 0.0;
    }
    (chars as f64 / CHARS_PER_WORD) / minutes
}

/// WPM counting only correctly typed characters.
pub fn net_wpm(correct_chars: usize, elapsed: Duration) -> f64 {
    words_per_minute(correct_chars, elapsed)
}

/// WPM counting every typed character, mistakes included.
pub fn raw_wpm(total_chars: usize, elapsed: Duration) -> f64 {
    words_per_minute(total_chars, elapsed)
}

/// Percentage of correct keystrokes; nothing attempted counts as perfect.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (correct as f64 / total as f64) * 100.0
}

/// Counts `(correct_words, attempted_words)` of `target` against `input`.
///
/// Words are delimited by single spaces in `target`. A word is attempted once
/// `input` reaches its first character, and correct only when every character
/// matches and, for all but the last word, the following space was typed
/// correctly too. A word still being typed is therefore attempted but never
/// correct.
pub fn count_correct_words(target: &[char], input: &[char]) -> (usize, usize) {
    let mut correct_words = 0;
    let mut total_words = 0;
    let mut word_start = 0;

    for i in 0..=target.len() {
        let at_boundary = i == target.len() || target[i] == ' ';
        if !at_boundary {
            continue;
        }
        if word_start >= input.len() {
            break;
        }

        total_words += 1;

        let letters_match = (word_start..i).all(|j| input.get(j) == Some(&target[j]));
        let separator_ok = i == target.len() || input.get(i) == Some(&' ');
        if letters_match && separator_ok {
            correct_words += 1;
        }

        word_start = i + 1;
    }

    (correct_words, total_words)
}

pub fn performance_tier(wpm: f64) -> Tier {
    match wpm {
        w if w < 30.0 => Tier::Beginner,
        w if w < 50.0 => Tier::Average,
        w if w < 80.0 => Tier::Fast,
        _ => Tier::Elite,
    }
}
