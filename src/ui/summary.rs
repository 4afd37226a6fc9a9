use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Padding, Paragraph, Widget},
};

use crate::history::{HistorySummary, Record};
use crate::metrics::Metrics;

use super::{centered, format_duration, Theme};

const SUMMARY_WIDTH: u16 = 60;

/// State of the recent-sessions panel while the history writer works
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryPanel {
    Loading,
    Disabled,
    Ready(Vec<Record>),
}

pub struct SummaryView<'a> {
    pub metrics: &'a Metrics,
    pub history: &'a HistoryPanel,
    pub theme: &'a Theme,
    pub scroll: u16,
}

impl SummaryView<'_> {
    pub fn lines(&self) -> Vec<Line<'static>> {
        let m = self.metrics;
        let theme = self.theme;
        let mut lines = vec![
            Line::from(Span::styled("Typing Test Results", theme.title)),
            Line::raw(""),
            Line::raw(format!("WPM: {:.1}", m.wpm)),
            Line::raw(format!("Raw WPM: {:.1}", m.raw_wpm)),
            Line::raw(format!("Accuracy: {:.1}%", m.accuracy)),
            Line::raw(format!("Correct Words: {} / {}", m.correct_words, m.total_words)),
            Line::raw(format!("Total errors: {}", m.errors)),
            Line::raw(format!("Time taken: {}", format_duration(m.time_taken))),
            Line::raw(format!("Tier: {}", m.tier())),
            Line::raw(format!("Result: {}", m.result_label())),
            Line::raw(""),
        ];
        lines.extend(self.history_lines());
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "↑/↓ to scroll • Enter, q or Esc to exit",
            theme.hint,
        )));
        lines
    }

    fn history_lines(&self) -> Vec<Line<'static>> {
        let dim = self.theme.history;
        let records = match self.history {
            HistoryPanel::Disabled => return vec![],
            HistoryPanel::Loading => {
                return vec![Line::from(Span::styled("Saving result…", dim))];
            }
            HistoryPanel::Ready(records) if records.is_empty() => {
                return vec![Line::from(Span::styled("No previous sessions yet.", dim))];
            }
            HistoryPanel::Ready(records) => records,
        };

        let mut lines = vec![
            Line::from(Span::styled("Recent Sessions", self.theme.hint)),
            Line::from(Span::styled(
                format!("{:<12} {:>6} {:>6} {:>7} {}", "Date", "WPM", "Raw", "Acc", "Tier"),
                dim,
            )),
        ];
        lines.extend(records.iter().rev().map(|r| {
            Line::from(Span::styled(
                format!(
                    "{:<12} {:>6.1} {:>6.1} {:>6.1}% {}",
                    r.date.format("%b %d %H:%M").to_string(),
                    r.wpm,
                    r.raw_wpm,
                    r.accuracy,
                    r.tier
                ),
                dim,
            ))
        }));
        if let Some(summary) = HistorySummary::from_records(records) {
            lines.push(Line::from(Span::styled(
                format!(
                    "{} runs  •  avg {:.1}  •  best {:.1}  •  sd {:.2}",
                    summary.runs, summary.mean_wpm, summary.best_wpm, summary.wpm_std_dev
                ),
                dim,
            )));
        }
        lines
    }

    /// Largest useful scroll offset for a viewport of `height` rows.
    pub fn max_scroll(&self, height: u16) -> u16 {
        let content = self.lines().len() as u16 + 4;
        content.saturating_sub(height)
    }
}

impl Widget for &SummaryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.lines();
        // borders plus vertical padding
        let wanted = lines.len() as u16 + 4;
        let body = centered(area, SUMMARY_WIDTH, wanted);
        let scroll = self.scroll.min(self.max_scroll(area.height));

        Paragraph::new(lines)
            .alignment(Alignment::Left)
            .scroll((scroll, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(self.theme.summary_border)
                    .padding(Padding::new(3, 3, 1, 1)),
            )
            .render(body, buf);
    }
}
