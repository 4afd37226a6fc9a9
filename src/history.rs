use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, Receiver};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::content::Mode;
use crate::error::{Error, Result};
use crate::metrics::{Metrics, Tier};

/// Records kept on disk; older ones are dropped on save.
pub const MAX_RECORDS: usize = 50;

/// Result of one finished run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub date: DateTime<Local>,
    pub mode: Mode,
    pub word_count: usize,
    pub wpm: f64,
    pub raw_wpm: f64,
    pub accuracy: f64,
    pub errors: usize,
    pub time_taken_sec: f64,
    pub completed: bool,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub cancelled: bool,
    pub tier: Tier,
}

impl Record {
    pub fn new(metrics: &Metrics, mode: Mode, word_count: usize, date: DateTime<Local>) -> Self {
        Self {
            date,
            mode,
            word_count,
            wpm: metrics.wpm,
            raw_wpm: metrics.raw_wpm,
            accuracy: metrics.accuracy,
            errors: metrics.errors,
            time_taken_sec: metrics.time_taken.as_secs_f64(),
            completed: metrics.completed,
            timed_out: metrics.timed_out,
            cancelled: metrics.cancelled,
            tier: metrics.tier(),
        }
    }

    /// A cancelled run with nothing typed is not worth remembering.
    pub fn worth_saving(metrics: &Metrics) -> bool {
        !(metrics.cancelled && metrics.total_typed == 0)
    }
}

pub trait HistoryStore: Send + 'static {
    fn load(&self) -> Result<Vec<Record>>;
    fn save(&self, record: Record) -> Result<()>;

    /// Last `n` records, oldest first. Unreadable history reads as empty.
    fn recent(&self, n: usize) -> Vec<Record> {
        let records = self.load().unwrap_or_default();
        let skip = records.len().saturating_sub(n);
        records.into_iter().skip(skip).collect()
    }
}

#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::history_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable history file is moved before the next save.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl Default for JsonHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> Result<Vec<Record>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::History(err.to_string())),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, record: Record) -> Result<()> {
        // an unreadable file is set aside, never overwritten
        let mut records = self.load().unwrap_or_else(|err| {
            let backup = self.backup_path();
            warn!(
                %err,
                path = %self.path.display(),
                backup = %backup.display(),
                "setting aside unreadable history"
            );
            if let Err(err) = fs::rename(&self.path, &backup) {
                warn!(%err, "failed to back up unreadable history");
            }
            Vec::new()
        });
        records.push(record);
        if records.len() > MAX_RECORDS {
            records.drain(..records.len() - MAX_RECORDS);
        }

        let data = serde_json::to_vec_pretty(&records)?;
        write_atomically(&self.path, &data).map_err(|e| Error::History(e.to_string()))
    }
}

/// Writes `data` to a sibling temp file and renames it over `path`, so a
/// reader sees either the old contents or the new ones.
fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Persists records off the UI thread. Failures are logged, never returned.
pub struct HistoryWriter<S> {
    store: S,
}

impl<S: HistoryStore + Clone> HistoryWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Saves `record` in the background. The receiver yields the last
    /// `recent` records once the save has been attempted.
    pub fn submit(&self, record: Record, recent: usize) -> Receiver<Vec<Record>> {
        let (tx, rx) = bounded(1);
        let store = self.store.clone();
        let spawned = std::thread::Builder::new()
            .name("typr-history".into())
            .spawn(move || {
                match store.save(record) {
                    Ok(()) => debug!("history saved"),
                    Err(err) => warn!(%err, "failed to save history"),
                }
                let _ = tx.send(store.recent(recent));
            });
        if let Err(err) = spawned {
            warn!(%err, "failed to spawn history writer");
        }
        rx
    }
}

/// Aggregates shown under the summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub runs: usize,
    pub mean_wpm: f64,
    pub best_wpm: f64,
    pub worst_wpm: f64,
    pub wpm_std_dev: f64,
}

impl HistorySummary {
    pub fn from_records(records: &[Record]) -> Option<Self> {
        let wpms: Vec<f64> = records.iter().map(|r| r.wpm).collect();
        let mean_wpm = mean(&wpms)?;
        let (worst_wpm, best_wpm) = match wpms.iter().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(w) => (w, w),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        Some(Self {
            runs: wpms.len(),
            mean_wpm,
            best_wpm,
            worst_wpm,
            wpm_std_dev: std_dev(&wpms).unwrap_or(0.0),
        })
    }
}

fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}
