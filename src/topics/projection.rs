//! Pure projection of rows plus column metadata into a display-ready grid.
//!
//! Nothing in here touches a terminal: the grid carries semantic style tags and
//! justification, and the renderer decides what those look like.

#![allow(missing_docs)]

use serde::Serialize;

use crate::topics::row::{Row, ValueKind};

/// Check mark used for `true` cells.
pub const TICK: &str = "\u{2713}";
/// Cross used for `false` cells and zero counts.
pub const CROSS: &str = "\u{2717}";
/// Ellipsis appended to truncated text.
pub const ELLIPSIS: char = '\u{2026}';

/// Horizontal alignment of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Justify {
    #[default]
    Left,
    Right,
    Center,
}

/// Renderer-agnostic style tag for a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleTag {
    #[default]
    Plain,
    Index,
    ItemKey,
    Name,
    User,
    Date,
    Size,
    Type,
    Used,
    Coin,
    CoinOverspend,
    CoinLimit,
    App,
    Job,
    Version,
    Collection,
    Rate,
    Merchant,
    Tick,
    Cross,
    Active,
    Done,
    Failed,
    Pending,
    Highlight,
    Neutral,
}

/// How a column picks its style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Fixed(StyleTag),
    /// Style looked up (case-insensitively) from the text of `source` in the row.
    ByValue {
        source: &'static str,
        table: &'static [(&'static str, StyleTag)],
        default: StyleTag,
    },
}

/// Value transform applied when a cell is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Plain,
    /// Keep at most `n` characters, the last replaced by an ellipsis.
    Truncate(usize),
    /// Keep the first `n` characters and append an ellipsis if any were dropped.
    Shorten(usize),
    /// Byte count rendered with binary units.
    HumanSize { blank_zero: bool },
    /// Number with thousands separators.
    IntComma { blank_zero: bool },
    /// Coins used, blank when not positive, styled against allowance and limit.
    Coins {
        allowance: &'static str,
        limit: &'static str,
    },
    /// Boolean as a tick or a cross.
    TickCross,
    /// Positive count as a number, zero as a cross.
    CountOrCross,
    /// Enumerated value mapped to a short display tag; unknown values pass through.
    Tag(&'static [(&'static str, &'static str)]),
}

/// Static description of one topic column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Row key; also the name used to select the column for sorting.
    pub key: &'static str,
    pub header: &'static str,
    pub kind: ValueKind,
    pub style: CellStyle,
    pub justify: Justify,
    pub format: CellFormat,
    /// Blank a value that repeats the one in the row above.
    pub group: bool,
}

impl ColumnSpec {
    #[must_use]
    pub const fn new(key: &'static str, header: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            header,
            kind,
            style: CellStyle::Fixed(StyleTag::Plain),
            justify: Justify::Left,
            format: CellFormat::Plain,
            group: false,
        }
    }

    #[must_use]
    pub const fn style(mut self, style: StyleTag) -> Self {
        self.style = CellStyle::Fixed(style);
        self
    }

    #[must_use]
    pub const fn styled_by(
        mut self,
        source: &'static str,
        table: &'static [(&'static str, StyleTag)],
        default: StyleTag,
    ) -> Self {
        self.style = CellStyle::ByValue {
            source,
            table,
            default,
        };
        self
    }

    #[must_use]
    pub const fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    #[must_use]
    pub const fn format(mut self, format: CellFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub const fn grouped(mut self) -> Self {
        self.group = true;
        self
    }

    fn base_style(&self, row: &Row) -> StyleTag {
        match self.style {
            CellStyle::Fixed(tag) => tag,
            CellStyle::ByValue {
                source,
                table,
                default,
            } => {
                let raw = row.get(source).to_string();
                table
                    .iter()
                    .find(|(value, _)| value.eq_ignore_ascii_case(&raw))
                    .map_or(default, |(_, tag)| *tag)
            }
        }
    }

    /// Formatted text and style for this column of `row`.
    #[must_use]
    pub fn render(&self, row: &Row) -> (String, StyleTag) {
        let value = row.get(self.key);
        let style = self.base_style(row);
        match self.format {
            CellFormat::Plain => (value.to_string(), style),
            CellFormat::Truncate(max) => (truncate(&value.to_string(), max), style),
            CellFormat::Shorten(keep) => (shorten(&value.to_string(), keep), style),
            CellFormat::HumanSize { blank_zero } => match value.as_f64() {
                Some(bytes) if blank_zero && bytes <= 0.0 => (String::new(), style),
                Some(bytes) => (human_size(bytes), style),
                None => (value.to_string(), style),
            },
            CellFormat::IntComma { blank_zero } => match value.as_f64() {
                Some(number) if blank_zero && number == 0.0 => (String::new(), style),
                Some(number) => (int_comma(number), style),
                None => (value.to_string(), style),
            },
            CellFormat::Coins { allowance, limit } => {
                let Some(used) = value.as_f64() else {
                    return (String::new(), style);
                };
                if used <= 0.0 {
                    return (String::new(), style);
                }
                let over = |key: &str| row.get(key).as_f64().is_some_and(|cap| used > cap);
                let style = if over(limit) {
                    StyleTag::CoinLimit
                } else if over(allowance) {
                    StyleTag::CoinOverspend
                } else {
                    style
                };
                (int_comma(used), style)
            }
            CellFormat::TickCross => match value.as_bool() {
                Some(true) => (TICK.to_string(), StyleTag::Tick),
                Some(false) => (CROSS.to_string(), StyleTag::Cross),
                None => (String::new(), style),
            },
            CellFormat::CountOrCross => match value.as_i64() {
                Some(count) if count > 0 => (count.to_string(), style),
                Some(_) => (CROSS.to_string(), StyleTag::Cross),
                None => (value.to_string(), style),
            },
            CellFormat::Tag(tags) => {
                let raw = value.to_string();
                let shown = tags
                    .iter()
                    .find(|(from, _)| *from == raw)
                    .map_or(raw.clone(), |(_, to)| (*to).to_string());
                (shown, style)
            }
        }
    }
}

/// One formatted cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    pub style: StyleTag,
    pub justify: Justify,
}

impl Cell {
    fn width(&self) -> usize {
        self.text.chars().count()
    }

    /// Text padded to `width` according to the cell's justification.
    #[must_use]
    pub fn padded(&self, width: usize) -> String {
        let pad = width.saturating_sub(self.width());
        match self.justify {
            Justify::Left => format!("{}{}", self.text, " ".repeat(pad)),
            Justify::Right => format!("{}{}", " ".repeat(pad), self.text),
            Justify::Center => {
                let left = pad / 2;
                format!(
                    "{}{}{}",
                    " ".repeat(left),
                    self.text,
                    " ".repeat(pad - left)
                )
            }
        }
    }
}

/// Display-ready table: header cells, formatted rows, and per-column widths.
///
/// Column 0 is always the 1-based row index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub title: String,
    pub headers: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
    pub widths: Vec<usize>,
}

impl Grid {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text lines: header first, then rows, columns separated by one space.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(&self.headers)
            .chain(self.rows.iter())
            .map(|cells| self.line(cells))
            .collect()
    }

    /// One padded line for `cells` with trailing whitespace removed.
    #[must_use]
    pub fn line(&self, cells: &[Cell]) -> String {
        cells
            .iter()
            .zip(&self.widths)
            .map(|(cell, width)| cell.padded(*width))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end()
            .to_string()
    }
}

/// Project `rows` (already in display order) through `columns`.
#[must_use]
pub fn project(columns: &[ColumnSpec], rows: &[Row]) -> Grid {
    let mut headers = Vec::with_capacity(columns.len() + 1);
    headers.push(Cell {
        text: String::new(),
        style: StyleTag::Index,
        justify: Justify::Right,
    });
    headers.extend(columns.iter().map(|column| Cell {
        text: column.header.to_string(),
        style: StyleTag::Index,
        justify: column.justify,
    }));

    let mut previous: Vec<Option<String>> = vec![None; columns.len()];
    let mut grid_rows = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(columns.len() + 1);
        cells.push(Cell {
            text: (index + 1).to_string(),
            style: StyleTag::Index,
            justify: Justify::Right,
        });
        for (slot, column) in columns.iter().enumerate() {
            let (text, style) = column.render(row);
            let repeated = column.group && previous[slot].as_deref() == Some(text.as_str());
            previous[slot] = Some(text.clone());
            cells.push(Cell {
                text: if repeated { String::new() } else { text },
                style,
                justify: column.justify,
            });
        }
        grid_rows.push(cells);
    }

    let mut widths: Vec<usize> = headers.iter().map(Cell::width).collect();
    for cells in &grid_rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.width());
        }
    }

    Grid {
        title: String::new(),
        headers,
        rows: grid_rows,
        widths,
    }
}

/// Extra text appended to a grid title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    None,
    /// Sum of the byte counts in `column`, rendered in binary units.
    TotalSize(&'static str),
}

/// A titled projection for one topic.
#[derive(Debug, Clone, Copy)]
pub struct TableProjection<'a> {
    pub label: &'a str,
    pub columns: &'a [ColumnSpec],
    pub summary: Summary,
}

impl TableProjection<'_> {
    /// Title such as `Datasets (4) [1.5 KiB]`.
    #[must_use]
    pub fn title(&self, rows: &[Row]) -> String {
        let base = format!("{} ({})", self.label, rows.len());
        match self.summary {
            Summary::None => base,
            Summary::TotalSize(column) => {
                let total: f64 = rows.iter().filter_map(|row| row.get(column).as_f64()).sum();
                format!("{base} [{}]", human_size(total))
            }
        }
    }

    #[must_use]
    pub fn project(&self, rows: &[Row]) -> Grid {
        let mut grid = project(self.columns, rows);
        grid.title = self.title(rows);
        grid
    }
}

/// Keep at most `max` characters, replacing the last kept one with an ellipsis.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Keep `keep` characters, then an ellipsis when anything was cut.
#[must_use]
pub fn shorten(text: &str, keep: usize) -> String {
    if text.chars().count() <= keep {
        return text.to_string();
    }
    let mut out: String = text.chars().take(keep).collect();
    out.push(ELLIPSIS);
    out
}

/// Binary-unit size: `1 Byte`, `512 Bytes`, `1.5 KiB`, `2.0 GiB`.
#[must_use]
pub fn human_size(bytes: f64) -> String {
    const UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];
    let magnitude = bytes.abs();
    if (magnitude - 1.0).abs() < f64::EPSILON {
        return format!("{bytes:.0} Byte");
    }
    if magnitude < 1024.0 {
        return format!("{bytes:.0} Bytes");
    }
    let mut scaled = bytes / 1024.0;
    for unit in UNITS {
        if scaled.abs() < 1024.0 || unit == "YiB" {
            return format!("{scaled:.1} {unit}");
        }
        scaled /= 1024.0;
    }
    format!("{scaled:.1} YiB")
}

/// Thousands separators; two decimals only when the value has a fraction.
#[must_use]
pub fn int_comma(number: f64) -> String {
    let formatted = if number.fract() == 0.0 {
        format!("{number:.0}")
    } else {
        format!("{number:.2}")
    };
    let (sign, unsigned) = formatted
        .strip_prefix('-')
        .map_or(("", formatted.as_str()), |rest| ("-", rest));
    let (integer, fraction) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (position, digit) in integer.chars().enumerate() {
        if position > 0 && (integer.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}
