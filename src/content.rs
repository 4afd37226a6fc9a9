use std::str::FromStr;

use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::from_str;

use crate::error::{Error, Result};

static POOL_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/pools");

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Quote,
    Code,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quote" => Ok(Mode::Quote),
            "code" => Ok(Mode::Code),
            _ => Err(Error::UnsupportedMode(s.to_string())),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Pool {
    pub name: String,
    pub entries: Vec<String>,
}

impl Pool {
    pub fn load(mode: Mode) -> Result<Self> {
        let file_name = format!("{mode}.json");
        let file = POOL_DIR
            .get_file(&file_name)
            .ok_or_else(|| Error::UnsupportedMode(mode.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| Error::UnsupportedMode(mode.to_string()))?;
        Ok(from_str(contents)?)
    }
}

/// Builds a target text of exactly `word_count` words for `mode`.
pub fn generate_text(mode: &str, word_count: usize) -> Result<String> {
    generate_text_with(mode, word_count, &mut rand::thread_rng())
}

pub fn generate_text_with<R: Rng + ?Sized>(
    mode: &str,
    word_count: usize,
    rng: &mut R,
) -> Result<String> {
    let mode: Mode = mode.parse()?;
    if word_count == 0 {
        return Err(Error::InvalidWordCount);
    }

    let pool = Pool::load(mode)?;
    let mut words: Vec<&str> = Vec::with_capacity(word_count);
    while words.len() < word_count {
        let entry = pool
            .entries
            .choose(rng)
            .ok_or_else(|| Error::UnsupportedMode(mode.to_string()))?;
        words.extend(entry.split_whitespace());
    }
    words.truncate(word_count);

    Ok(words.join(" "))
}

/// Normalises a user supplied target: trimmed, single spaces, printable ASCII.
pub fn validate_prompt(text: &str) -> Result<String> {
    if let Some(bad) = text
        .chars()
        .find(|c| !c.is_whitespace() && !(' '..='~').contains(c))
    {
        return Err(Error::NonAsciiPrompt(bad));
    }
    let prompt = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        return Err(Error::EmptyPrompt);
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pools_load() {
        for mode in [Mode::Quote, Mode::Code] {
            let pool = Pool::load(mode).unwrap();
            assert_eq!(pool.name, mode.to_string());
            assert!(!pool.entries.is_empty());
        }
    }

    #[test]
    fn test_pools_are_printable_ascii() {
        for mode in [Mode::Quote, Mode::Code] {
            for entry in Pool::load(mode).unwrap().entries {
                assert!(
                    entry.chars().all(|c| (' '..='~').contains(&c)),
                    "non-ascii entry: {entry}"
                );
            }
        }
    }

    #[test]
    fn test_generate_exact_word_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in [1, 5, 30, 60] {
            let text = generate_text_with("quote", count, &mut rng).unwrap();
            assert_eq!(text.split(' ').count(), count);
            assert!(!text.contains("  "));
        }
    }

    #[test]
    fn test_generate_code_mode() {
        let text = generate_text("code", 12).unwrap();
        assert_eq!(text.split(' ').count(), 12);
    }

    #[test]
    fn test_generate_rejects_unknown_mode() {
        assert_matches!(generate_text("poetry", 10), Err(Error::UnsupportedMode(m)) if m == "poetry");
    }

    #[test]
    fn test_generate_rejects_zero_words() {
        assert_matches!(generate_text("quote", 0), Err(Error::InvalidWordCount));
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("Quote".parse::<Mode>().unwrap(), Mode::Quote);
        assert_eq!(" code ".parse::<Mode>().unwrap(), Mode::Code);
        assert_eq!(Mode::Code.to_string(), "code");
    }

    #[test]
    fn test_validate_prompt() {
        assert_eq!(validate_prompt("  hello   world\n").unwrap(), "hello world");
        assert_matches!(validate_prompt("   "), Err(Error::EmptyPrompt));
        assert_matches!(validate_prompt("café"), Err(Error::NonAsciiPrompt('é')));
    }
}
