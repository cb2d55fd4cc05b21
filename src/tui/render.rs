//! Frame layout and crossterm drawing.
//!
//! Two entrypoints:
//! - [`draw`] queues a laid-out screen onto a writer with colours.
//! - [`render_to_string`] returns the same screen as plain text for tests.

#![allow(missing_docs)]

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use super::input::FOOTER_BINDINGS;
use super::theme::Theme;
use crate::dashboard::Frame;
use crate::topics::dataset::direction_glyph;
use crate::topics::projection::{Cell, StyleTag};
use crate::topics::source::TopicState;

/// Rows used by banner, title, header and footer.
const CHROME_ROWS: usize = 5;

/// Semantic colour of a segment, resolved through the [`Theme`] when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Accent,
    Muted,
    Cell(StyleTag),
    Auth(bool),
    State(TopicState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub tone: Tone,
    pub bold: bool,
}

impl Segment {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            bold: false,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

pub type ScreenLine = Vec<Segment>;

fn state_label(state: TopicState) -> &'static str {
    match state {
        TopicState::Idle => "IDLE",
        TopicState::Fresh => "LIVE",
        TopicState::Stale => "STALE",
        TopicState::Fetching => "FETCHING",
        TopicState::Failed => "DEGRADED",
    }
}

fn banner(frame: &Frame, environment: &str) -> ScreenLine {
    let mut line = vec![
        Segment::new(
            format!(" SquAd v{}  ", env!("CARGO_PKG_VERSION")),
            Tone::Accent,
        )
        .bold(),
        Segment::new(format!("[{environment}]"), Tone::Accent),
    ];
    for status in &frame.auth {
        let mark = if status.authenticated { '\u{2713}' } else { '\u{2717}' };
        line.push(Segment::new(
            format!("  {} {mark}", status.backend.label()),
            Tone::Auth(status.authenticated),
        ));
    }
    line
}

fn title(frame: &Frame) -> ScreenLine {
    let mut line = vec![
        Segment::new(format!(" {}", frame.grid.title), Tone::Accent).bold(),
        Segment::new(
            format!("  [{}]", state_label(frame.state)),
            Tone::State(frame.state),
        ),
    ];
    if let Some(failure) = &frame.failure {
        line.push(Segment::new(
            format!("  \u{26a0} {failure}"),
            Tone::State(TopicState::Failed),
        ));
    }
    line
}

/// Header cells with the sort glyph on the sorted column, and widths grown to fit.
fn sorted_header(frame: &Frame) -> (Vec<Cell>, Vec<usize>) {
    let mut headers = frame.grid.headers.clone();
    let mut widths = frame.grid.widths.clone();
    // Grid column 0 is the row index.
    let slot = frame.sort.column + 1;
    if let Some(cell) = headers.get_mut(slot) {
        cell.text = format!("{}{}", cell.text, direction_glyph(frame.sort.ascending));
        if let Some(width) = widths.get_mut(slot) {
            *width = (*width).max(cell.text.chars().count());
        }
    }
    (headers, widths)
}

fn cells_line(cells: &[Cell], widths: &[usize], header: bool) -> ScreenLine {
    let mut line = Vec::with_capacity(cells.len());
    for (index, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let text = if index == 0 {
            cell.padded(*width)
        } else {
            format!(" {}", cell.padded(*width))
        };
        let segment = Segment::new(text, Tone::Cell(cell.style));
        line.push(if header { segment.bold() } else { segment });
    }
    line
}

fn footer(frame: &Frame) -> ScreenLine {
    let hints = FOOTER_BINDINGS
        .iter()
        .map(|binding| format!("{} {}", binding.keys, binding.description))
        .collect::<Vec<_>>()
        .join("  ");
    let updated = frame.last_success_at.map_or_else(
        || "never".to_string(),
        |at| at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
    );
    vec![Segment::new(
        format!(
            " {hints}  | updated {updated}, every {}s",
            frame.interval_secs
        ),
        Tone::Muted,
    )]
}

/// Lay out `frame` for a `width` x `height` terminal.
#[must_use]
pub fn layout(frame: &Frame, environment: &str, width: usize, height: usize) -> Vec<ScreenLine> {
    let mut lines = vec![banner(frame, environment), Vec::new(), title(frame)];

    if frame.grid.is_empty() {
        let hint = match frame.state {
            TopicState::Idle | TopicState::Fetching => "(loading)",
            _ => "(no rows)",
        };
        lines.push(vec![Segment::new(format!(" {hint}"), Tone::Muted)]);
    } else {
        let (headers, widths) = sorted_header(frame);
        lines.push(cells_line(&headers, &widths, true));
        let room = height.saturating_sub(CHROME_ROWS).max(1);
        let shown = frame.grid.rows.len().min(room);
        for cells in &frame.grid.rows[..shown] {
            lines.push(cells_line(cells, &widths, false));
        }
        if shown < frame.grid.rows.len() {
            lines.pop();
            lines.push(vec![Segment::new(
                format!(" ... {} more", frame.grid.rows.len() - shown + 1),
                Tone::Muted,
            )]);
        }
    }

    lines.push(footer(frame));
    lines.into_iter().map(|line| clip(line, width)).collect()
}

/// Drop characters beyond `width`.
fn clip(line: ScreenLine, width: usize) -> ScreenLine {
    let mut remaining = width;
    let mut clipped = Vec::with_capacity(line.len());
    for mut segment in line {
        if remaining == 0 {
            break;
        }
        let len = segment.text.chars().count();
        if len > remaining {
            segment.text = segment.text.chars().take(remaining).collect();
        }
        remaining -= segment.text.chars().count();
        clipped.push(segment);
    }
    clipped
}

fn tone_color(theme: Theme, tone: Tone) -> Color {
    match tone {
        Tone::Accent => theme.accent(),
        Tone::Muted => theme.muted(),
        Tone::Cell(style) => theme.cell(style),
        Tone::Auth(ok) => theme.auth(ok),
        Tone::State(state) => theme.state(state),
    }
}

/// Queue `lines` onto `out`; the banner and footer stick to the top and bottom.
pub fn draw<W: Write>(
    out: &mut W,
    lines: &[ScreenLine],
    theme: Theme,
    height: u16,
) -> io::Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    let last = lines.len().saturating_sub(1);
    for (index, line) in lines.iter().enumerate() {
        let row = if index == last {
            height.saturating_sub(1)
        } else {
            u16::try_from(index).unwrap_or(u16::MAX)
        };
        queue!(out, MoveTo(0, row))?;
        for segment in line {
            queue!(out, SetForegroundColor(tone_color(theme, segment.tone)))?;
            if segment.bold {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            write!(out, "{}", segment.text)?;
            queue!(out, SetAttribute(Attribute::Reset))?;
        }
    }
    queue!(out, ResetColor)?;
    out.flush()
}

/// Plain-text rendering, one terminal row per line, trailing spaces trimmed.
#[must_use]
pub fn render_to_string(frame: &Frame, environment: &str, width: usize, height: usize) -> String {
    layout(frame, environment, width, height)
        .iter()
        .map(|line| {
            line.iter()
                .map(|segment| segment.text.as_str())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
