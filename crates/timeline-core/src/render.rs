use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::layout::Layout;
use crate::layout::bars::Bar;
use crate::layout::scroll::ScrollController;

const CLOSED_COLOR: &str = "33";
const ONGOING_COLOR: &str = "32";
const TODAY_COLOR: &str = "31";
const HEADER_COLOR: &str = "1";

const CLOSED_FILL: char = '█';
const ONGOING_FILL: char = '▓';
const SINGLE_DAY_MARK: char = '◆';
const GRID_LINE: char = '┊';
const TODAY_LINE: char = '│';

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    /// Pixels represented by one terminal column.
    column_width: f64,
    sidebar_width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    color: Option<&'static str>,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        color: None,
    };
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        let column_width = cfg.get_f64("render.column_width")?.unwrap_or(15.0);
        if !(column_width.is_finite() && column_width > 0.0) {
            return Err(anyhow!(
                "render.column_width must be a positive number, got {column_width}"
            ));
        }
        let sidebar_width = cfg.get_u64("render.sidebar_width")?.unwrap_or(28) as usize;

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            column_width,
            sidebar_width: sidebar_width.max(8),
        })
    }

    pub fn plain(column_width: f64, sidebar_width: usize) -> Self {
        Self {
            color: false,
            column_width,
            sidebar_width,
        }
    }

    #[tracing::instrument(skip(self, layout))]
    pub fn print_item_table(&self, layout: &Layout) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_item_table(out, layout)
    }

    pub fn write_item_table<W: Write>(&self, out: W, layout: &Layout) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Group".to_string(),
            "Name".to_string(),
            "Period".to_string(),
            "Duration".to_string(),
        ];

        let mut rows = Vec::new();
        for group in &layout.groups {
            if group.collapsed {
                rows.push(vec![
                    String::new(),
                    self.paint(&group.name, HEADER_COLOR),
                    format!("({} hidden)", group.item_count),
                    String::new(),
                    String::new(),
                ]);
                continue;
            }
            for row in &group.rows {
                let id = self.paint(&row.item.id.to_string(), "33");
                let name = if row.item.is_ongoing() {
                    self.paint(&row.item.name, ONGOING_COLOR)
                } else {
                    row.item.name.clone()
                };
                rows.push(vec![
                    id,
                    group.name.clone(),
                    name,
                    row.period.clone(),
                    row.duration.clone(),
                ]);
            }
        }

        write_table(out, headers, rows)
    }

    /// Draws the chart. With `viewport_cols`, only that many chart columns are
    /// shown, scrolled so the today line sits in the middle.
    #[tracing::instrument(skip(self, layout))]
    pub fn print_chart(
        &self,
        layout: &Layout,
        viewport_cols: Option<usize>,
    ) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_chart(out, layout, viewport_cols)
    }

    pub fn write_chart<W: Write>(
        &self,
        mut out: W,
        layout: &Layout,
        viewport_cols: Option<usize>,
    ) -> anyhow::Result<()> {
        let total_cols = self.px_to_col(layout.total_width()).max(1);
        let (first_col, visible_cols) = self.visible_window(layout, total_cols, viewport_cols);
        let last_col = (first_col + visible_cols).min(total_cols);

        let mut year_line = vec![Cell::BLANK; total_cols];
        let mut month_line = vec![Cell::BLANK; total_cols];
        for year in &layout.grid.years {
            let col = self.px_to_col(year.left_px());
            let label = format!("{GRID_LINE}{}", year.year);
            put_text(&mut year_line, col, &label, Some(HEADER_COLOR));
            for month in &year.months {
                put_text(&mut month_line, self.px_to_col(month.left_px), month.label(), None);
            }
        }

        let background = self.background_row(layout, total_cols);

        let blank_sidebar = self.sidebar_cell("", false);
        writeln!(
            out,
            "{blank_sidebar}{}",
            self.render_cells(&year_line[first_col..last_col])
        )?;
        writeln!(
            out,
            "{blank_sidebar}{}",
            self.render_cells(&month_line[first_col..last_col])
        )?;

        for group in &layout.groups {
            let arrow = if group.collapsed { '►' } else { '▼' };
            let title = format!("{arrow} {} ({})", group.name, group.item_count);
            writeln!(
                out,
                "{}{}",
                self.sidebar_cell(&title, true),
                self.render_cells(&background[first_col..last_col])
            )?;

            for row in &group.rows {
                let mut cells = background.clone();
                if let Some(bar) = row.bar.as_ref() {
                    self.draw_bar(&mut cells, bar);
                }
                let label = format!("  {}", row.item.name);
                writeln!(
                    out,
                    "{}{}",
                    self.sidebar_cell(&label, false),
                    self.render_cells(&cells[first_col..last_col])
                )?;
            }
        }

        Ok(())
    }

    fn visible_window(
        &self,
        layout: &Layout,
        total_cols: usize,
        viewport_cols: Option<usize>,
    ) -> (usize, usize) {
        let Some(cols) = viewport_cols.filter(|cols| *cols > 0 && *cols < total_cols) else {
            return (0, total_cols);
        };
        let scroll = ScrollController::new(cols as f64 * self.column_width, layout.total_width());
        let scroll_left = scroll.scroll_to_today(&layout.today_marker).unwrap_or(0.0);
        let first = self.px_to_col(scroll_left).min(total_cols - cols);
        (first, cols)
    }

    fn background_row(&self, layout: &Layout, total_cols: usize) -> Vec<Cell> {
        let mut cells = vec![Cell::BLANK; total_cols];
        for line in 0..layout.grid_line_count() {
            let col = self.px_to_col(line as f64 * layout.grid.month_width);
            if let Some(cell) = cells.get_mut(col) {
                cell.ch = GRID_LINE;
            }
        }
        if let Some(left) = layout.today_marker.left_px() {
            let col = self.px_to_col(left).min(total_cols - 1);
            cells[col] = Cell {
                ch: TODAY_LINE,
                color: Some(TODAY_COLOR),
            };
        }
        cells
    }

    fn draw_bar(&self, cells: &mut [Cell], bar: &Bar) {
        let color = if bar.is_ongoing() { ONGOING_COLOR } else { CLOSED_COLOR };
        let start = self.px_to_col(bar.left_px.max(0.0));
        if bar.is_single_day() {
            if let Some(cell) = cells.get_mut(start) {
                *cell = Cell {
                    ch: SINGLE_DAY_MARK,
                    color: Some(color),
                };
            }
            return;
        }

        let fill = if bar.is_ongoing() { ONGOING_FILL } else { CLOSED_FILL };
        let end = self.px_to_col(bar.right_px()).max(start + 1).min(cells.len());
        for cell in cells.iter_mut().take(end).skip(start) {
            *cell = Cell {
                ch: fill,
                color: Some(color),
            };
        }
    }

    fn px_to_col(&self, px: f64) -> usize {
        (px / self.column_width).floor().max(0.0) as usize
    }

    fn sidebar_cell(&self, text: &str, header: bool) -> String {
        let clipped = clip_to_width(text, self.sidebar_width.saturating_sub(1));
        let padding = self.sidebar_width.saturating_sub(UnicodeWidthStr::width(clipped.as_str()));
        let label = if header {
            self.paint(&clipped, HEADER_COLOR)
        } else {
            clipped
        };
        format!("{label}{}", " ".repeat(padding))
    }

    fn render_cells(&self, cells: &[Cell]) -> String {
        let mut out = String::with_capacity(cells.len());
        let mut run = String::new();
        let mut run_color: Option<&'static str> = None;

        for cell in cells {
            if cell.color != run_color && !run.is_empty() {
                out.push_str(&self.paint_run(&run, run_color));
                run.clear();
            }
            run_color = cell.color;
            run.push(cell.ch);
        }
        out.push_str(&self.paint_run(&run, run_color));
        out
    }

    fn paint_run(&self, text: &str, color: Option<&str>) -> String {
        match color {
            Some(code) => self.paint(text, code),
            None => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn put_text(cells: &mut [Cell], col: usize, text: &str, color: Option<&'static str>) {
    for (offset, ch) in text.chars().enumerate() {
        if let Some(cell) = cells.get_mut(col + offset) {
            *cell = Cell { ch, color };
        }
    }
}

fn clip_to_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
