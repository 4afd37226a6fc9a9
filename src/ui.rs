pub mod summary;

use std::io;
use std::time::Duration;

use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Padding, Paragraph, Widget, Wrap},
    Terminal,
};
use unicode_width::UnicodeWidthStr;

use crate::content::Mode;
use crate::controller::{LiveFrame, Renderer};

pub use summary::{HistoryPanel, SummaryView};

const PANEL_WIDTH: u16 = 72;
const STATS_ROWS: u16 = 7;

/// Style table for every screen. Built once and passed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub title: Style,
    pub hint: Style,
    pub correct: Style,
    pub wrong: Style,
    pub current: Style,
    pub remaining: Style,
    pub stats_border: Style,
    pub text_border: Style,
    pub summary_border: Style,
    pub history: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Indexed(39))
                .add_modifier(Modifier::BOLD),
            hint: Style::default().fg(Color::Indexed(244)),
            correct: Style::default().fg(Color::Indexed(42)),
            wrong: Style::default().fg(Color::Indexed(196)),
            current: Style::default()
                .fg(Color::Indexed(16))
                .bg(Color::Indexed(229))
                .add_modifier(Modifier::UNDERLINED),
            remaining: Style::default().fg(Color::Indexed(240)),
            stats_border: Style::default().fg(Color::Indexed(63)),
            text_border: Style::default().fg(Color::Indexed(238)),
            summary_border: Style::default().fg(Color::Indexed(69)),
            history: Style::default().fg(Color::Indexed(244)),
        }
    }
}

/// `MM:SS`, rounded to the nearest second
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs_f64().round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Rect of at most `width` x `height`, centered in `area`
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Per-character colouring of the target against what was typed
pub fn target_spans<'a>(target: &[char], input: &[char], theme: &Theme) -> Vec<Span<'a>> {
    let cursor = input.len();
    let mut spans: Vec<Span> = target
        .iter()
        .enumerate()
        .map(|(i, &expected)| {
            let visible = |c: char| if c == ' ' { "·".to_string() } else { c.to_string() };
            match input.get(i) {
                Some(&typed) if typed == expected => Span::styled(expected.to_string(), theme.correct),
                Some(_) => Span::styled(visible(expected), theme.wrong),
                None if i == cursor => Span::styled(visible(expected), theme.current),
                None => Span::styled(expected.to_string(), theme.remaining),
            }
        })
        .collect();

    if cursor >= target.len() {
        spans.push(Span::styled(" ", theme.current));
    }
    spans
}

/// The screen shown while a run is in progress
pub struct LiveView<'a> {
    pub frame: &'a LiveFrame<'a>,
    pub theme: &'a Theme,
    pub mode: Mode,
    pub word_count: usize,
}

impl LiveView<'_> {
    fn stats_lines(&self) -> Vec<Line<'static>> {
        let m = self.frame.metrics;
        let mut rows = vec![
            Line::raw(format!("WPM: {:.1}", m.wpm)),
            Line::raw(format!("Raw WPM: {:.1}", m.raw_wpm)),
            Line::raw(format!("Accuracy: {:.1}%", m.accuracy)),
            Line::raw(format!("Words: {}/{} correct", m.correct_words, m.total_words)),
            Line::raw(format!("Elapsed: {}", format_duration(self.frame.elapsed))),
            Line::raw(format!("Errors: {}", m.errors)),
        ];
        if let Some(remaining) = self.frame.remaining {
            rows.push(Line::raw(format!("Time Left: {}", format_duration(remaining))));
        }
        rows
    }
}

impl Widget for LiveView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = self.theme;
        let width = PANEL_WIDTH.min(area.width);
        // borders and horizontal padding
        let text_width = width.saturating_sub(4).max(1) as usize;
        let target: String = self.frame.target.iter().collect();
        let text_lines = (target.width() + 1).div_ceil(text_width) as u16;

        let text_height = text_lines + 4;
        let stats_height = STATS_ROWS + 2;
        let total_height = 2 + 1 + text_height + 1 + stats_height + 1 + 1;
        let body = centered(area, width, total_height);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(text_height),
                Constraint::Length(1),
                Constraint::Length(stats_height),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(body);

        let header = Paragraph::new(vec![
            Line::from(Span::styled("typr", theme.title)),
            Line::from(Span::styled(
                format!(
                    "Mode: {}  •  Words: {}  •  Start typing to begin timer",
                    self.mode, self.word_count
                ),
                theme.hint,
            )),
        ]);
        header.render(chunks[0], buf);

        let text = Paragraph::new(Line::from(target_spans(
            self.frame.target,
            self.frame.input,
            theme,
        )))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.text_border)
                .padding(Padding::uniform(1)),
        );
        text.render(chunks[2], buf);

        let stats = Paragraph::new(self.stats_lines()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(theme.stats_border)
                .padding(Padding::horizontal(1)),
        );
        stats.render(chunks[4], buf);

        let footer = Paragraph::new(Span::styled(
            "Backspace to correct • Esc or Ctrl+C to stop",
            theme.hint,
        ));
        footer.render(chunks[6], buf);
    }
}

/// Ratatui-backed renderer for live frames and the summary screen
pub struct TerminalRenderer<'t, B: Backend> {
    terminal: &'t mut Terminal<B>,
    theme: Theme,
    mode: Mode,
    word_count: usize,
}

impl<'t, B: Backend> TerminalRenderer<'t, B> {
    pub fn new(terminal: &'t mut Terminal<B>, theme: Theme, mode: Mode, word_count: usize) -> Self {
        Self {
            terminal,
            theme,
            mode,
            word_count,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn height(&self) -> io::Result<u16> {
        Ok(self.terminal.size()?.height)
    }

    pub fn draw_summary(&mut self, view: &SummaryView<'_>) -> io::Result<()> {
        self.terminal.draw(|f| f.render_widget(view, f.area()))?;
        Ok(())
    }
}

impl<B: Backend> Renderer for TerminalRenderer<'_, B> {
    fn draw_live(&mut self, frame: &LiveFrame<'_>) -> io::Result<()> {
        let view = LiveView {
            frame,
            theme: &self.theme,
            mode: self.mode,
            word_count: self.word_count,
        };
        self.terminal.draw(|f| f.render_widget(view, f.area()))?;
        Ok(())
    }
}
