use std::fmt;
use std::io::Error;

use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum DbvError {
    IoError(Error),
    FileNotFound(String),
    PermissionDenied(String),
    /// Magic bytes or record layout were not understood by any source,
    /// or the requested build has no known structure.
    UnknownFormat(String),
    /// The file header was recognized but the record data is inconsistent
    /// with it (sizes, counts).
    CorruptFile(String),
    ExportFailed(String),
}

impl fmt::Display for DbvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbvError::IoError(e) => write!(f, "IO error: {e}"),
            DbvError::FileNotFound(p) => write!(f, "File not found: {p}"),
            DbvError::PermissionDenied(p) => write!(f, "Permission denied: {p}"),
            DbvError::UnknownFormat(m) => write!(f, "Unknown format: {m}"),
            DbvError::CorruptFile(m) => write!(f, "Corrupt file: {m}"),
            DbvError::ExportFailed(m) => write!(f, "Export failed: {m}"),
        }
    }
}

impl From<Error> for DbvError {
    fn from(err: Error) -> Self {
        DbvError::IoError(err)
    }
}

#[derive(Debug, Clone)]
pub struct DbvConfig {
    pub event_poll_time: u64,
    pub default_build: i64,
}

// What the inputter line is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    BuildNumber,
    ExportPath,
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    SortAscending,
    SortDescending,
    Export,
    ChangeBuild,
    CopyCell,
    CopyRow,
    NextTab,
    PrevTab,
    CloseTab,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "dbv - DBC/WDB/DB2 cache viewer

  arrows / PgUp / PgDn   move the cursor
  Home / End             jump to first / last row
  s / S                  sort by cursor column, ascending / descending
  b                      reopen the file under a different build
  e                      export the table to CSV
  y / Y                  copy cell / row to the clipboard
  Tab / Shift-Tab        switch tabs
  w                      close the current tab
  ?                      this help
  q                      quit
";
