use std::path::{Path, PathBuf};

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::domain::{DbvConfig, DbvError, HELP_TEXT, InputMode, Message};
use crate::export::export_csv;
use crate::inputter::{InputResult, Inputter};
use crate::loader::CacheSource;
use crate::table::{Table, TableModel};

#[derive(Debug, PartialEq)]
pub enum Status {
    RUNNING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Where a tab's table came from. Kept so "change build" can re-invoke the
/// source with the same origin and a new build number.
#[derive(Debug, Clone)]
pub enum Origin {
    Path(PathBuf),
    Env(String),
}

/// One open file: its presentation model plus cursor state.
pub struct Tab {
    pub name: String,
    origin: Origin,
    pub model: TableModel,
    pub cursor_row: usize,
    pub cursor_column: usize,
}

impl Tab {
    fn new(name: String, origin: Origin, model: TableModel) -> Self {
        Self {
            name,
            origin,
            model,
            cursor_row: 0,
            cursor_column: 0,
        }
    }
}

pub struct Model {
    config: DbvConfig,
    pub status: Status,
    modus: Modus,
    source: Box<dyn CacheSource>,
    tabs: Vec<Tab>,
    current_tab: usize,
    input: Inputter,
    input_mode: Option<InputMode>,
    last_input: InputResult,
    popup_message: String,
    status_message: String,
    page_size: usize,
}

impl Model {
    pub fn init(config: &DbvConfig, source: Box<dyn CacheSource>) -> Self {
        Self {
            config: config.clone(),
            status: Status::RUNNING,
            modus: Modus::TABLE,
            source,
            tabs: Vec::new(),
            current_tab: 0,
            input: Inputter::default(),
            input_mode: None,
            last_input: InputResult::default(),
            popup_message: String::new(),
            status_message: "Ready".to_string(),
            page_size: 25,
        }
    }

    // ------------------------- queries for the UI ------------------------- //

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn current_tab(&self) -> usize {
        self.current_tab
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.current_tab)
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn popup_message(&self) -> Option<&str> {
        if self.modus == Modus::POPUP {
            Some(&self.popup_message)
        } else {
            None
        }
    }

    pub fn active_input(&self) -> Option<(InputMode, &InputResult)> {
        match (self.modus, self.input_mode) {
            (Modus::CMDINPUT, Some(mode)) => Some((mode, &self.last_input)),
            _ => None,
        }
    }

    /// True while a prompt is collecting keystrokes; the controller then
    /// forwards keys raw instead of mapping them to actions.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    // ------------------------------ loading ------------------------------ //

    pub fn open_path(&mut self, path: &Path) {
        let build = self.config.default_build;
        match self.source.open(path, build) {
            Ok(table) => self.add_tab(Origin::Path(path.to_path_buf()), table),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    pub fn open_env(&mut self, name: &str) {
        let build = self.config.default_build;
        match self.source.open_env(name, build) {
            Ok(table) => self.add_tab(Origin::Env(name.to_string()), table),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn add_tab(&mut self, origin: Origin, table: Table) {
        let name = table.source_name.clone();
        let mut model = TableModel::new();
        model.set_file(table);
        let summary = model.status_summary();
        self.tabs.push(Tab::new(name, origin, model));
        self.current_tab = self.tabs.len() - 1;
        self.set_status_message(summary);
    }

    /// Re-open the active tab's origin under a different build and swap the
    /// result in. On failure the tab keeps its current table.
    fn change_build(&mut self, build: i64) {
        let Some(tab) = self.tabs.get_mut(self.current_tab) else {
            return;
        };
        if tab.model.build() == Some(build) {
            trace!("Build unchanged, nothing to reload");
            return;
        }
        let result = match &tab.origin {
            Origin::Path(path) => self.source.open(path, build),
            Origin::Env(name) => self.source.open_env(name, build),
        };
        match result {
            Ok(table) => {
                tab.model.set_file(table);
                tab.cursor_row = 0;
                let summary = tab.model.status_summary();
                self.set_status_message(summary);
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    // ------------------------------ updates ------------------------------ //

    pub fn update(&mut self, message: Message) -> Result<(), DbvError> {
        trace!("Update: modus {:?}, message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.status = Status::QUITTING,
                Message::MoveUp => self.move_cursor_up(1),
                Message::MoveDown => self.move_cursor_down(1),
                Message::MovePageUp => self.move_cursor_up(self.page_size),
                Message::MovePageDown => self.move_cursor_down(self.page_size),
                Message::MoveBeginning => self.move_cursor_beginning(),
                Message::MoveEnd => self.move_cursor_end(),
                Message::MoveLeft => self.move_cursor_left(),
                Message::MoveRight => self.move_cursor_right(),
                Message::SortAscending => self.sort_cursor_column(true),
                Message::SortDescending => self.sort_cursor_column(false),
                Message::Export => self.prompt_export(),
                Message::ChangeBuild => self.prompt_build(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::NextTab => self.switch_tab(1),
                Message::PrevTab => self.switch_tab(-1),
                Message::CloseTab => self.close_tab(),
                Message::Help => self.show_help(),
                Message::Resize(_, height) => self.resize(height),
                Message::Exit => {}
                Message::RawKey(_) => {}
            },
            Modus::POPUP => match message {
                Message::Quit => self.status = Status::QUITTING,
                Message::Exit | Message::Help => self.modus = Modus::TABLE,
                Message::Resize(_, height) => self.resize(height),
                _ => {}
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key);
                }
            }
        }
        Ok(())
    }

    fn resize(&mut self, height: usize) {
        // Tab bar, table header and status line eat into the page
        self.page_size = height.saturating_sub(3).max(1);
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        debug!("Status: {}", self.status_message);
    }

    fn show_help(&mut self) {
        self.popup_message = HELP_TEXT.to_string();
        self.modus = Modus::POPUP;
    }

    // ------------------------------ prompts ------------------------------ //

    fn prompt_build(&mut self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let current = tab.model.build().unwrap_or(self.config.default_build);
        self.enter_input_mode(InputMode::BuildNumber, &current.to_string());
    }

    fn prompt_export(&mut self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        // Default to the source name with a .csv extension
        let stem = tab
            .name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&tab.name);
        let default = format!("{stem}.csv");
        self.enter_input_mode(InputMode::ExportPath, &default);
    }

    fn enter_input_mode(&mut self, mode: InputMode, prefill: &str) {
        self.modus = Modus::CMDINPUT;
        self.input_mode = Some(mode);
        self.input.clear();
        self.input.set(prefill);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.finish_input();
        }
    }

    fn finish_input(&mut self) {
        self.modus = Modus::TABLE;
        let mode = self.input_mode.take();
        let result = std::mem::take(&mut self.last_input);
        if result.canceled {
            self.set_status_message("Canceled");
            return;
        }
        match mode {
            Some(InputMode::BuildNumber) => match result.input.trim().parse::<i64>() {
                Ok(build) => self.change_build(build),
                Err(_) => {
                    self.set_status_message(format!("Not a build number: {}", result.input))
                }
            },
            Some(InputMode::ExportPath) => self.export(&result.input),
            None => warn!("Finished input without a mode"),
        }
    }

    // ------------------------------- export ------------------------------ //

    fn export(&mut self, filename: &str) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let path = PathBuf::from(filename);
        match export_csv(&tab.model, &path) {
            Ok(()) => {
                let message = format!("Exported {} rows to {}", tab.model.row_count(), filename);
                self.set_status_message(message);
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    // ----------------------------- clipboard ----------------------------- //

    fn copy_to_clipboard(&mut self, content: String) {
        match Clipboard::new().and_then(|mut cb| cb.set_text(content)) {
            Ok(_) => self.set_status_message("Copied to clipboard"),
            Err(e) => {
                warn!("Clipboard unavailable: {e:?}");
                self.set_status_message("Clipboard unavailable");
            }
        }
    }

    fn copy_cell(&mut self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let cell = tab.model.cell_value(tab.cursor_row, tab.cursor_column);
        self.copy_to_clipboard(cell);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace("\"", "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_row(&mut self) {
        let Some(tab) = self.active_tab() else {
            return;
        };
        let columns = tab.model.column_count();
        let content: Vec<String> = (0..columns)
            .map(|c| Self::wrap_cell_content(&tab.model.cell_value(tab.cursor_row, c)))
            .collect();
        self.copy_to_clipboard(content.join(","));
    }

    // ------------------------------- tabs -------------------------------- //

    fn switch_tab(&mut self, step: i64) {
        if self.tabs.is_empty() {
            return;
        }
        let count = self.tabs.len() as i64;
        self.current_tab = ((self.current_tab as i64 + step).rem_euclid(count)) as usize;
    }

    fn close_tab(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        let closed = self.tabs.remove(self.current_tab);
        info!("Closed tab {}", closed.name);
        if self.current_tab >= self.tabs.len() && self.current_tab > 0 {
            self.current_tab -= 1;
        }
        if self.tabs.is_empty() {
            self.set_status_message("Ready");
        }
    }

    // ------------------------------ cursor ------------------------------- //

    fn move_cursor_up(&mut self, size: usize) {
        if let Some(tab) = self.tabs.get_mut(self.current_tab) {
            tab.cursor_row = tab.cursor_row.saturating_sub(size);
        }
    }

    fn move_cursor_down(&mut self, size: usize) {
        if let Some(tab) = self.tabs.get_mut(self.current_tab) {
            let last = tab.model.row_count().saturating_sub(1);
            tab.cursor_row = std::cmp::min(tab.cursor_row + size, last);
        }
    }

    fn move_cursor_beginning(&mut self) {
        if let Some(tab) = self.tabs.get_mut(self.current_tab) {
            tab.cursor_row = 0;
        }
    }

    fn move_cursor_end(&mut self) {
        if let Some(tab) = self.tabs.get_mut(self.current_tab) {
            tab.cursor_row = tab.model.row_count().saturating_sub(1);
        }
    }

    fn move_cursor_left(&mut self) {
        if let Some(tab) = self.tabs.get_mut(self.current_tab) {
            tab.cursor_column = tab.cursor_column.saturating_sub(1);
        }
    }

    fn move_cursor_right(&mut self) {
        if let Some(tab) = self.tabs.get_mut(self.current_tab) {
            let last = tab.model.column_count().saturating_sub(1);
            tab.cursor_column = std::cmp::min(tab.cursor_column + 1, last);
        }
    }

    // ------------------------------- sort -------------------------------- //

    fn sort_cursor_column(&mut self, ascending: bool) {
        let Some(tab) = self.tabs.get_mut(self.current_tab) else {
            return;
        };
        let column = tab.cursor_column;
        tab.model.sort(column, ascending);
        let direction = if ascending { "ascending" } else { "descending" };
        let label = tab.model.header_label(column);
        self.set_status_message(format!("Sorted by {label} {direction}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DbvError;
    use crate::format::FieldKind;
    use crate::loader::CacheSource;
    use crate::table::{FieldDescriptor, Table, Value};

    /// Source handing out canned tables, failing for the "missing" origin.
    struct FixtureSource;

    fn fixture_table(build: i64) -> Table {
        Table {
            descriptors: vec![
                FieldDescriptor::new("ID", FieldKind::Plain),
                FieldDescriptor::new("Cost", FieldKind::Money),
            ],
            rows: vec![
                vec![Value::Int(1), Value::Int(150)],
                vec![Value::Int(2), Value::Int(0)],
            ],
            source_name: "Item.dbc".to_string(),
            structure_name: "ItemCache".to_string(),
            build,
        }
    }

    impl CacheSource for FixtureSource {
        fn open(&self, path: &Path, build: i64) -> Result<Table, DbvError> {
            if path.to_string_lossy().contains("missing") {
                return Err(DbvError::FileNotFound(path.display().to_string()));
            }
            if build == 666 {
                return Err(DbvError::UnknownFormat(format!("no structure for {build}")));
            }
            Ok(fixture_table(build))
        }

        fn open_env(&self, name: &str, build: i64) -> Result<Table, DbvError> {
            self.open(Path::new(name), build)
        }
    }

    fn test_model() -> Model {
        let config = DbvConfig {
            event_poll_time: 100,
            default_build: 12340,
        };
        Model::init(&config, Box::new(FixtureSource))
    }

    #[test]
    fn opening_a_file_adds_a_tab_with_a_status_summary() {
        let mut model = test_model();
        model.open_path(Path::new("Item.dbc"));
        assert_eq!(model.tabs().len(), 1);
        assert_eq!(model.active_tab().unwrap().model.row_count(), 2);
        assert_eq!(
            model.status_message(),
            "2 rows - Using ItemCache build 12340"
        );
    }

    #[test]
    fn a_failed_open_adds_no_tab() {
        let mut model = test_model();
        model.open_path(Path::new("missing.dbc"));
        assert!(model.tabs().is_empty());
        assert!(model.status_message().contains("File not found"));
    }

    #[test]
    fn change_build_reopens_the_same_origin() {
        let mut model = test_model();
        model.open_path(Path::new("Item.dbc"));
        assert_eq!(model.active_tab().unwrap().model.build(), Some(12340));

        model.change_build(15595);
        assert_eq!(model.active_tab().unwrap().model.build(), Some(15595));
        assert!(model.status_message().contains("build 15595"));
    }

    #[test]
    fn a_failed_build_change_keeps_the_previous_table() {
        let mut model = test_model();
        model.open_path(Path::new("Item.dbc"));
        model.change_build(666);
        let tab = model.active_tab().unwrap();
        assert_eq!(tab.model.build(), Some(12340));
        assert_eq!(tab.model.row_count(), 2);
        assert!(model.status_message().contains("Unknown format"));
    }

    #[test]
    fn cursor_movement_stays_in_bounds() {
        let mut model = test_model();
        model.open_path(Path::new("Item.dbc"));
        model.update(Message::MoveDown).unwrap();
        model.update(Message::MoveDown).unwrap();
        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.active_tab().unwrap().cursor_row, 1);

        model.update(Message::MoveUp).unwrap();
        model.update(Message::MoveUp).unwrap();
        assert_eq!(model.active_tab().unwrap().cursor_row, 0);

        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveRight).unwrap();
        assert_eq!(model.active_tab().unwrap().cursor_column, 1);
    }

    #[test]
    fn sorting_goes_through_the_cursor_column() {
        let mut model = test_model();
        model.open_path(Path::new("Item.dbc"));
        model.update(Message::MoveRight).unwrap();
        model.update(Message::SortDescending).unwrap();
        let tab = model.active_tab().unwrap();
        assert_eq!(tab.model.raw_rows()[0], vec!["1", "150"]);
        assert!(model.status_message().contains("Sorted by Cost descending"));
    }

    #[test]
    fn closing_the_last_tab_leaves_an_empty_viewer() {
        let mut model = test_model();
        model.open_path(Path::new("Item.dbc"));
        model.open_path(Path::new("Item.dbc"));
        assert_eq!(model.current_tab(), 1);

        model.update(Message::CloseTab).unwrap();
        assert_eq!(model.tabs().len(), 1);
        assert_eq!(model.current_tab(), 0);

        model.update(Message::CloseTab).unwrap();
        assert!(model.active_tab().is_none());
        model.update(Message::MoveDown).unwrap(); // must not panic on empty
    }
}
