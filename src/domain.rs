use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

pub const DEFAULT_DATA_PATH: &str = "public/films.json";

pub const HELP_TEXT: &str = "\
filmview - film table viewer

  /            Focus the search box, typing filters live
  Enter        Leave the search box, keep the filter
  Esc          Leave the search box and clear the filter / close popup
  x            Clear the filter
  j, Down      Move down
  k, Up        Move up
  PgDown/PgUp  Move a page down / up
  g, Home      Jump to the first row
  G, End       Jump to the last row
  c            Copy the selected row to the clipboard (CSV)
  ?            Show this help
  q            Quit";

#[derive(Debug)]
pub enum FVError {
    IoError(Error),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    LoggingFailed(String),
    HttpError(reqwest::Error),
    ScrapeFailed(String),
}

impl fmt::Display for FVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FVError::IoError(e) => write!(f, "I/O error: {e}"),
            FVError::JsonError(e) => write!(f, "Invalid film data: {e}"),
            FVError::LoadingFailed(msg) => write!(f, "Loading failed: {msg}"),
            FVError::FileNotFound => write!(f, "File not found"),
            FVError::PermissionDenied => write!(f, "Permission denied"),
            FVError::UnknownFileType => write!(f, "Unknown file type, expected a .json file"),
            FVError::LoggingFailed(msg) => write!(f, "Could not set up logging: {msg}"),
            FVError::HttpError(e) => write!(f, "Request failed: {e}"),
            FVError::ScrapeFailed(msg) => write!(f, "Scraping failed: {msg}"),
        }
    }
}

impl std::error::Error for FVError {}

impl From<Error> for FVError {
    fn from(err: Error) -> Self {
        FVError::IoError(err)
    }
}

impl From<serde_json::Error> for FVError {
    fn from(err: serde_json::Error) -> Self {
        FVError::JsonError(err)
    }
}

impl From<reqwest::Error> for FVError {
    fn from(err: reqwest::Error) -> Self {
        FVError::HttpError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct FVConfig {
    /// Milliseconds the controller waits for a terminal event per loop.
    pub event_poll_time: u64,
    /// Upper bound for the width of a table column.
    pub max_column_width: usize,
}

impl Default for FVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Search,
    ClearFilter,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
