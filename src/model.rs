use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::domain::{FVConfig, FVError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::loader::FilmSource;
use crate::table::{COLUMN_NAMES, Table};
use crate::ui::{
    COLUMN_WIDTH_MARGIN, SEARCHBOX_HEIGHT, STATUSLINE_HEIGHT, TABLE_BORDER_HEIGHT,
    TABLE_HEADER_HEIGHT,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    LOADING,
    READY,
    FAILED,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    SEARCH,
    POPUP,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
}

pub struct UIData {
    pub name: String,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<[String; 5]>, // Only the rows inside the current window
    pub nrows: usize,           // Number of visible (unfiltered) rows
    pub total_rows: usize,
    pub selected_row: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub search: InputResult,
    pub active_search: bool,
    pub status: Status,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            search: InputResult::default(),
            active_search: false,
            status: Status::LOADING,
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let chrome =
            SEARCHBOX_HEIGHT + STATUSLINE_HEIGHT + TABLE_BORDER_HEIGHT + TABLE_HEADER_HEIGHT;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            // Keep at least one row so the selection logic has a window to work with
            table_height: ui_height.saturating_sub(chrome).max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: FVConfig,
    name: String,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: Table,
    visible: Vec<usize>, // Indices into table rows that pass the current filter
    max_widths: [usize; 5],
    cursor_row: usize,
    offset_row: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    status_message: String,
    load_error: Option<FVError>,
}

impl Model {
    pub fn init(config: &FVConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            name: String::new(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            table: Table::default(),
            visible: Vec::new(),
            max_widths: [0; 5],
            cursor_row: 0,
            offset_row: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            status_message: String::new(),
            load_error: None,
        };
        model.set_status_message("Loading ...");
        model.update_table_data();
        model
    }

    /// Creates the model and runs the loader once. A failed load leaves an empty table behind.
    pub fn initialize(
        config: &FVConfig,
        source: &dyn FilmSource,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let mut model = Model::init(config, ui_width, ui_height);
        model.load(source);
        model
    }

    pub fn load(&mut self, source: &dyn FilmSource) {
        self.name = source.describe();
        match source.fetch() {
            Ok(films) => {
                let start_time = Instant::now();
                self.table.render(&films);
                self.max_widths = Self::calculate_max_widths(&self.table);
                self.status = Status::READY;
                debug!(
                    "Rendered {} rows in {}ms",
                    self.table.len(),
                    start_time.elapsed().as_millis()
                );

                let term = self.input.get().input;
                self.apply_filter(&term);
                self.set_status_message(format!("Loaded {} films", self.table.len()));
            }
            Err(e) => {
                error!("Loading {} failed: {}", self.name, e);
                self.status = Status::FAILED;
                self.set_status_message(format!("Loading {} failed: {}", self.name, e));
                self.load_error = Some(e);
            }
        }
        self.update_table_data();
    }

    /// The error of the last failed load, if it has not been taken yet.
    pub fn take_load_error(&mut self) -> Option<FVError> {
        self.load_error.take()
    }

    /// Replaces the search box content and filters with it.
    pub fn set_filter(&mut self, term: &str) {
        self.input.set(term);
        self.last_input = self.input.get();
        self.apply_filter(term);
        self.update_table_data();
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn filter_term(&self) -> &str {
        &self.last_input.input
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), FVError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(1),
                    Message::MoveUp => self.move_selection_up(1),
                    Message::MovePageDown => self.move_selection_down(self.uilayout.table_height),
                    Message::MovePageUp => self.move_selection_up(self.uilayout.table_height),
                    Message::MoveBeginning => self.select_row(0),
                    Message::MoveEnd => self.select_row(self.visible.len().saturating_sub(1)),
                    Message::Search => self.enter_search(),
                    Message::ClearFilter => self.set_filter(""),
                    Message::CopyRow => self.copy_selected_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::SEARCH => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        self.update_table_data();
        Ok(())
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn calculate_max_widths(table: &Table) -> [usize; 5] {
        let mut widths = COLUMN_NAMES.map(|name| name.chars().count());
        for row in table.rows() {
            for (width, cell) in widths.iter_mut().zip(row.cells()) {
                *width = std::cmp::max(*width, cell.chars().count());
            }
        }
        widths
    }

    fn apply_filter(&mut self, term: &str) {
        // The filter is only wired up after a successful load
        if self.status != Status::READY {
            trace!("Ignoring filter {term:?}, no data loaded");
            return;
        }
        let start_time = Instant::now();
        let shown = self.table.filter(term);
        self.visible = self.table.visible_indices();
        trace!(
            "Filter {:?} matched {} rows in {}us",
            term,
            shown,
            start_time.elapsed().as_micros()
        );

        let selected = self.offset_row + self.cursor_row;
        self.select_row(std::cmp::min(selected, shown.saturating_sub(1)));
        self.set_status_message(format!("Showing {} of {} films", shown, self.table.len()));
    }

    fn update_table_data(&mut self) {
        let rbegin = std::cmp::min(self.offset_row, self.visible.len());
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.visible.len());

        let rows = self.visible[rbegin..rend]
            .iter()
            .map(|&ridx| self.table.rows()[ridx].cells().clone())
            .collect();
        let columns = COLUMN_NAMES
            .iter()
            .zip(self.max_widths)
            .map(|(name, max_width)| ColumnView {
                name: name.to_string(),
                width: std::cmp::min(
                    std::cmp::max(name.len(), max_width) + COLUMN_WIDTH_MARGIN,
                    self.config.max_column_width,
                ),
            })
            .collect();

        self.uidata = UIData {
            name: self.name.clone(),
            columns,
            rows,
            nrows: self.visible.len(),
            total_rows: self.table.len(),
            selected_row: self.cursor_row,
            abs_selected_row: self.offset_row + self.cursor_row,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            search: self.last_input.clone(),
            active_search: self.modus == Modus::SEARCH,
            status: self.status,
            status_message: self.status_message.clone(),
        };
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.select_row(self.offset_row + self.cursor_row);
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn enter_search(&mut self) {
        trace!("Focus search box ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCH;
        self.input.resume();
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            let term = self.last_input.input.clone();
            self.apply_filter(&term);
        }
        if self.last_input.finished {
            trace!(
                "Leaving search box with {:?} (canceled: {})",
                self.last_input.input, self.last_input.canceled
            );
            self.modus = self.previous_modus;
            self.previous_modus = Modus::SEARCH;
        }
    }

    /// Moves the selection to the visible row `row`, scrolling the window if needed.
    fn select_row(&mut self, row: usize) {
        let height = self.uilayout.table_height;
        let max_offset = self.visible.len().saturating_sub(height);
        self.offset_row = std::cmp::min(self.offset_row, max_offset);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.cursor_row = row - self.offset_row;
    }

    fn move_selection_up(&mut self, size: usize) {
        let selected = self.offset_row + self.cursor_row;
        self.select_row(selected.saturating_sub(size));
    }

    fn move_selection_down(&mut self, size: usize) {
        if self.visible.is_empty() {
            return;
        }
        let selected = self.offset_row + self.cursor_row;
        self.select_row(std::cmp::min(selected + size, self.visible.len() - 1));
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn selected_row_csv(&self) -> Option<String> {
        let ridx = self.visible.get(self.offset_row + self.cursor_row)?;
        let content = self.table.rows()[*ridx]
            .cells()
            .iter()
            .map(|c| Model::wrap_cell_content(c))
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_selected_row(&mut self) {
        let Some(row_content) = self.selected_row_csv() else {
            self.set_status_message("Nothing to copy");
            return;
        };

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Cannot open clipboard: {:?}", e);
                    self.set_status_message("Clipboard not available");
                    return;
                }
            }
        }

        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(row_content) {
                Ok(_) => {
                    info!("Copied row to clipboard.");
                    self.set_status_message("Copied row to clipboard");
                }
                Err(e) => {
                    error!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copying to clipboard failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::Film;
    use crate::loader::parse_films;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    struct StaticSource(&'static str);

    impl FilmSource for StaticSource {
        fn describe(&self) -> String {
            "static".to_string()
        }

        fn fetch(&self) -> Result<Vec<Film>, FVError> {
            parse_films(self.0)
        }
    }

    struct BrokenSource;

    impl FilmSource for BrokenSource {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        fn fetch(&self) -> Result<Vec<Film>, FVError> {
            Err(FVError::LoadingFailed("connection reset".into()))
        }
    }

    const FILMS: &str = r#"[
        {"title": "Amélie", "year": 2001, "country": "France[1]", "director": "Jeunet", "revenue": 33200000},
        {"title": "A", "year": 2000, "country": "US[1]", "director": "Smith", "revenue": 1000000},
        {"title": "Oldboy", "year": 2003, "country": "South Korea", "director": "Park Chan-wook", "revenue": 15000000},
        {"title": "Heat", "year": 1995, "country": "US", "director": "Mann", "revenue": 187400000},
        {"title": "Ran", "year": 1985, "country": "Japan", "director": "Kurosawa", "revenue": 4000000}
    ]"#;

    // 7 lines of chrome leave 3 table rows
    fn model() -> Model {
        Model::initialize(&FVConfig::default(), &StaticSource(FILMS), 80, 10)
    }

    fn key(model: &mut Model, code: KeyCode) {
        model
            .update(Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE))))
            .unwrap();
    }

    fn type_str(model: &mut Model, s: &str) {
        for c in s.chars() {
            key(model, KeyCode::Char(c));
        }
    }

    #[test]
    fn initialize_renders_all_rows() {
        let model = model();
        assert_eq!(model.status, Status::READY);
        assert_eq!(model.table().len(), 5);
        let ui = model.get_uidata();
        assert_eq!(ui.nrows, 5);
        assert_eq!(ui.total_rows, 5);
        assert_eq!(ui.rows.len(), 3);
        assert_eq!(ui.rows[1][2], "US");
        assert_eq!(ui.status_message, "Loaded 5 films");
    }

    #[test]
    fn failed_load_keeps_pre_load_state() {
        let mut model = Model::initialize(&FVConfig::default(), &BrokenSource, 80, 10);
        assert_eq!(model.status, Status::FAILED);
        assert!(model.table().is_empty());
        assert!(model.get_uidata().status_message.contains("connection reset"));
        assert!(matches!(model.take_load_error(), Some(FVError::LoadingFailed(_))));
        assert!(model.take_load_error().is_none());

        // The filter is not wired, typing has no effect on the (empty) table
        model.update(Some(Message::Search)).unwrap();
        type_str(&mut model, "x");
        assert_eq!(model.get_uidata().nrows, 0);
        assert_eq!(model.status, Status::FAILED);
    }

    #[test]
    fn typing_filters_live() {
        let mut model = model();
        model.update(Some(Message::Search)).unwrap();
        assert!(model.raw_keyevents());

        type_str(&mut model, "u");
        assert_eq!(model.get_uidata().nrows, 5);
        type_str(&mut model, "s");
        assert_eq!(model.get_uidata().nrows, 2);
        assert_eq!(model.get_uidata().status_message, "Showing 2 of 5 films");

        key(&mut model, KeyCode::Backspace);
        assert_eq!(model.get_uidata().nrows, 5);
    }

    #[test]
    fn enter_keeps_filter_and_escape_clears_it() {
        let mut model = model();
        model.update(Some(Message::Search)).unwrap();
        type_str(&mut model, "jeun");
        key(&mut model, KeyCode::Enter);
        assert!(!model.raw_keyevents());
        assert_eq!(model.get_uidata().nrows, 1);
        assert_eq!(model.filter_term(), "jeun");

        model.update(Some(Message::Search)).unwrap();
        type_str(&mut model, "zzz");
        assert_eq!(model.get_uidata().nrows, 0);
        key(&mut model, KeyCode::Esc);
        assert!(!model.raw_keyevents());
        assert_eq!(model.get_uidata().nrows, 5);
    }

    #[test]
    fn clear_filter_shows_all_rows() {
        let mut model = model();
        model.set_filter("heat");
        assert_eq!(model.get_uidata().nrows, 1);
        model.update(Some(Message::ClearFilter)).unwrap();
        assert_eq!(model.get_uidata().nrows, 5);
        assert_eq!(model.filter_term(), "");
    }

    #[test]
    fn selection_scrolls_the_window() {
        let mut model = model();
        model.update(Some(Message::MoveEnd)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.abs_selected_row, 4);
        assert_eq!(ui.selected_row, 2);
        assert_eq!(ui.rows[2][0], "Ran");

        model.update(Some(Message::MoveUp)).unwrap();
        model.update(Some(Message::MoveUp)).unwrap();
        model.update(Some(Message::MoveUp)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.abs_selected_row, 1);
        assert_eq!(ui.selected_row, 0);
        assert_eq!(ui.rows[0][0], "A");

        model.update(Some(Message::MovePageDown)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 4);
        model.update(Some(Message::MoveBeginning)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        model.update(Some(Message::MoveUp)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn selection_is_clamped_by_filter() {
        let mut model = model();
        model.update(Some(Message::MoveEnd)).unwrap();
        model.set_filter("us");
        let ui = model.get_uidata();
        assert_eq!(ui.nrows, 2);
        assert_eq!(ui.abs_selected_row, 1);
        assert_eq!(ui.rows, vec![
            ["A", "2000", "US", "Smith", "$1,000,000"].map(String::from),
            ["Heat", "1995", "US", "Mann", "$187,400,000"].map(String::from),
        ]);
    }

    #[test]
    fn resize_changes_window_height() {
        let mut model = model();
        model.update(Some(Message::Resize(80, 20))).unwrap();
        assert_eq!(model.get_uidata().rows.len(), 5);
        model.update(Some(Message::Resize(80, 2))).unwrap();
        assert_eq!(model.get_uidata().rows.len(), 1);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = model();
        model.update(Some(Message::Help)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn quit_sets_status() {
        let mut model = model();
        model.update(Some(Message::Quit)).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn column_widths_are_capped() {
        let cfg = FVConfig::default().max_column_width(6);
        let model = Model::initialize(&cfg, &StaticSource(FILMS), 80, 10);
        let widths: Vec<usize> = model.get_uidata().columns.iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![6, 6, 6, 6, 6]);

        let model = Model::initialize(&FVConfig::default(), &StaticSource(FILMS), 80, 10);
        assert_eq!(model.get_uidata().columns[1].width, 4 + COLUMN_WIDTH_MARGIN);
    }

    #[test]
    fn selected_row_as_csv() {
        let mut model = model();
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(
            model.selected_row_csv().unwrap(),
            "Oldboy,2003,\"South Korea\",\"Park Chan-wook\",\"$15,000,000\""
        );
        assert_eq!(Model::wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");

        model.set_filter("zzz");
        assert_eq!(model.selected_row_csv(), None);
    }
}
