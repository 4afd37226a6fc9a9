use std::time::Duration;

use chrono::{Local, TimeZone};
use tempfile::tempdir;

use typr::content::Mode;
use typr::history::{
    HistoryStore, HistorySummary, HistoryWriter, JsonHistoryStore, Record, MAX_RECORDS,
};
use typr::metrics::Tier;
use typr::Metrics;

fn metrics(wpm: f64) -> Metrics {
    Metrics {
        wpm,
        raw_wpm: wpm + 4.0,
        accuracy: 96.0,
        errors: 2,
        total_typed: 150,
        correct: 144,
        correct_words: 28,
        total_words: 30,
        time_taken: Duration::from_secs(36),
        completed: true,
        timed_out: false,
        cancelled: false,
    }
}

fn record(wpm: f64, minute: u32) -> Record {
    let date = Local.with_ymd_and_hms(2024, 3, 9, 12, minute, 0).unwrap();
    Record::new(&metrics(wpm), Mode::Quote, 30, date)
}

#[test]
fn writer_saves_in_background_and_reports_recent() {
    let dir = tempdir().unwrap();
    let store = JsonHistoryStore::with_path(dir.path().join("nested").join("history.json"));
    store.save(record(40.0, 0)).unwrap();

    let writer = HistoryWriter::new(store.clone());
    let recent = writer
        .submit(record(62.0, 1), 5)
        .recv_timeout(Duration::from_secs(5))
        .unwrap();

    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].wpm, 62.0);
    assert_eq!(recent[1].tier, Tier::Fast);
    assert_eq!(store.load().unwrap(), recent);
}

#[test]
fn history_is_capped_to_latest_records() {
    let dir = tempdir().unwrap();
    let store = JsonHistoryStore::with_path(dir.path().join("history.json"));
    for i in 0..(MAX_RECORDS + 7) {
        store.save(record(i as f64, (i % 60) as u32)).unwrap();
    }

    let all = store.load().unwrap();
    assert_eq!(all.len(), MAX_RECORDS);
    assert_eq!(all[0].wpm, 7.0);
    assert_eq!(all[MAX_RECORDS - 1].wpm, (MAX_RECORDS + 6) as f64);

    let last_three = store.recent(3);
    assert_eq!(
        last_three.iter().map(|r| r.wpm).collect::<Vec<_>>(),
        vec![54.0, 55.0, 56.0]
    );
}

#[test]
fn unreadable_history_reads_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "not json").unwrap();
    let store = JsonHistoryStore::with_path(&path);

    assert!(store.recent(5).is_empty());
    assert!(HistorySummary::from_records(&store.recent(5)).is_none());
}

#[test]
fn summary_over_saved_records() {
    let dir = tempdir().unwrap();
    let store = JsonHistoryStore::with_path(dir.path().join("history.json"));
    for (i, wpm) in [30.0, 50.0, 70.0].into_iter().enumerate() {
        store.save(record(wpm, i as u32)).unwrap();
    }

    let summary = HistorySummary::from_records(&store.load().unwrap()).unwrap();
    assert_eq!(summary.runs, 3);
    assert_eq!(summary.mean_wpm, 50.0);
    assert_eq!(summary.best_wpm, 70.0);
    assert_eq!(summary.worst_wpm, 30.0);
}
