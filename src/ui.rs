use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::domain::{DbvConfig, InputMode};
use crate::inputter::InputResult;
use crate::model::Model;

pub const TABLE_HEADER_HEIGHT: usize = 1;
const COLUMN_WIDTH_MIN: usize = 4;
const COLUMN_WIDTH_MAX: usize = 32;

/// Renders the active tab straight from TableModel queries. The UI holds no
/// copy of row or column data, only scroll offsets.
pub struct TableUI {
    row_offset: usize,
    col_offset: usize,
}

impl TableUI {
    pub fn new(_cfg: &DbvConfig) -> Self {
        Self {
            row_offset: 0,
            col_offset: 0,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let [tabbar_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_tabbar(model, frame, tabbar_area);
        self.draw_table(model, frame, table_area);
        self.draw_statusline(model, frame, status_area);

        if let Some(message) = model.popup_message() {
            Self::draw_popup(message, frame);
        }
    }

    fn draw_tabbar(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = vec![Span::from(" dbv ").bold()];
        for (idx, tab) in model.tabs().iter().enumerate() {
            let label = format!(" {} ", tab.name);
            if idx == model.current_tab() {
                spans.push(Span::from(label).reversed());
            } else {
                spans.push(Span::from(label).dim());
            }
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&mut self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(tab) = model.active_tab() else {
            self.row_offset = 0;
            self.col_offset = 0;
            let hint = Paragraph::new("No file loaded - start with: dbv [-b BUILD] FILE...")
                .centered()
                .dim();
            frame.render_widget(hint, area);
            return;
        };

        let table_model = &tab.model;
        let nrows = table_model.row_count();
        let ncols = table_model.column_count();
        if nrows == 0 || ncols == 0 {
            frame.render_widget(Paragraph::new("0 rows").centered().dim(), area);
            return;
        }

        // Keep the cursor inside the visible row window
        let height = (area.height as usize)
            .saturating_sub(TABLE_HEADER_HEIGHT)
            .max(1);
        self.row_offset = self.row_offset.min(nrows.saturating_sub(1));
        if tab.cursor_row < self.row_offset {
            self.row_offset = tab.cursor_row;
        } else if tab.cursor_row >= self.row_offset + height {
            self.row_offset = tab.cursor_row + 1 - height;
        }
        let rend = (self.row_offset + height).min(nrows);

        // Same for columns, based on rendered widths over the visible window
        self.col_offset = self.col_offset.min(ncols.saturating_sub(1));
        if tab.cursor_column < self.col_offset {
            self.col_offset = tab.cursor_column;
        }
        let mut widths =
            Self::visible_widths(table_model, self.col_offset, self.row_offset, rend, area.width);
        while tab.cursor_column >= self.col_offset + widths.len() && self.col_offset < ncols - 1 {
            self.col_offset += 1;
            widths = Self::visible_widths(
                table_model,
                self.col_offset,
                self.row_offset,
                rend,
                area.width,
            );
        }
        let visible_cols = self.col_offset..(self.col_offset + widths.len()).min(ncols);

        let header = Row::new(visible_cols.clone().map(|c| {
            let label = table_model.header_label(c);
            if c == tab.cursor_column {
                Cell::from(label).bold().underlined()
            } else {
                Cell::from(label).bold()
            }
        }));

        let rows = (self.row_offset..rend).map(|r| {
            let cells = visible_cols.clone().map(|c| {
                let cell = Cell::from(table_model.cell_value(r, c));
                if r == tab.cursor_row && c == tab.cursor_column {
                    cell.reversed()
                } else {
                    cell
                }
            });
            let row = Row::new(cells);
            if r == tab.cursor_row {
                row.style(Style::new().add_modifier(Modifier::BOLD))
            } else {
                row
            }
        });

        let constraints: Vec<Constraint> = widths
            .iter()
            .map(|&w| Constraint::Length(w as u16))
            .collect();
        frame.render_widget(Table::new(rows, constraints).header(header), area);
    }

    // Column widths from the header and the currently visible rows, stopping
    // once the frame width is filled.
    fn visible_widths(
        model: &crate::table::TableModel,
        col_offset: usize,
        row_begin: usize,
        row_end: usize,
        frame_width: u16,
    ) -> Vec<usize> {
        let mut widths = Vec::new();
        let mut used = 0usize;
        for c in col_offset..model.column_count() {
            let mut w = model.header_label(c).chars().count();
            for r in row_begin..row_end {
                w = w.max(model.cell_value(r, c).chars().count());
            }
            let w = w.clamp(COLUMN_WIDTH_MIN, COLUMN_WIDTH_MAX);
            if used + w + 1 > frame_width as usize && !widths.is_empty() {
                break;
            }
            used += w + 1;
            widths.push(w);
        }
        widths
    }

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let line = match model.active_input() {
            Some((mode, input)) => {
                let label = match mode {
                    InputMode::BuildNumber => "Build number",
                    InputMode::ExportPath => "Export to",
                };
                Self::prompt_line(label, input)
            }
            None => Line::from(model.status_message().to_string()).dim(),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    // The reversed span marks the character under the editing cursor, or a
    // trailing blank when the cursor sits past the end of the input.
    fn prompt_line(label: &str, input: &InputResult) -> Line<'static> {
        let before: String = input.input.chars().take(input.cursor_pos).collect();
        let under: Option<char> = input.input.chars().nth(input.cursor_pos);
        let after: String = input.input.chars().skip(input.cursor_pos + 1).collect();

        let mut spans = vec![
            Span::from(format!("{label}: ")).bold(),
            Span::from(before),
        ];
        match under {
            Some(ch) => {
                spans.push(Span::from(ch.to_string()).reversed());
                spans.push(Span::from(after));
            }
            None => spans.push(Span::from(" ").reversed()),
        }
        Line::from(spans)
    }

    fn draw_popup(message: &str, frame: &mut Frame) {
        let area = Self::centered_rect(frame.area(), 60, 18);
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(message).block(Block::bordered().title(" Help ".bold()));
        frame.render_widget(popup, area);
    }

    fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width);
        let height = height.min(area.height);
        Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        }
    }
}
