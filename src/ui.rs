use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::model::{Model, Status, UIData};

pub const SEARCHBOX_HEIGHT: usize = 3;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_BORDER_HEIGHT: usize = 2;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

#[derive(Debug, Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [search_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(SEARCHBOX_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.render_searchbox(uidata, frame, search_area);
        self.render_table(uidata, frame, table_area);
        self.render_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            self.render_popup(uidata, frame);
        }
    }

    fn render_searchbox(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let block = if uidata.active_search {
            Block::bordered()
                .title(" Search ".bold().yellow())
                .border_set(border::THICK)
        } else {
            Block::bordered().title(" Search (/) ")
        };
        let inner = block.inner(area);
        frame.render_widget(Paragraph::new(uidata.search.input.as_str()).block(block), area);

        if uidata.active_search {
            let cursor_pos = u16::try_from(uidata.search.cursor_pos).unwrap_or(u16::MAX);
            let cursor_x = inner.x.saturating_add(cursor_pos.min(inner.width));
            frame.set_cursor_position((cursor_x, inner.y));
        }
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = Line::from(format!(" {} ", uidata.name)).bold();
        let block = Block::bordered().title(title.centered());

        match uidata.status {
            Status::LOADING | Status::FAILED => {
                let text = if uidata.status == Status::LOADING {
                    "Loading ...".to_string()
                } else {
                    uidata.status_message.clone()
                };
                frame.render_widget(Paragraph::new(text).centered().block(block), area);
                return;
            }
            Status::READY | Status::QUITTING => {}
        }

        let header = Row::new(
            uidata
                .columns
                .iter()
                .map(|c| Cell::from(c.name.as_str()))
                .collect::<Vec<Cell>>(),
        )
        .bold()
        .underlined();

        let rows = uidata.rows.iter().map(|cells| {
            Row::new(cells.iter().map(|c| Cell::from(c.as_str())).collect::<Vec<Cell>>())
        });

        let widths = uidata
            .columns
            .iter()
            .map(|c| Constraint::Length(u16::try_from(c.width).unwrap_or(u16::MAX)));

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::new().reversed());

        self.table_state.select((!uidata.rows.is_empty()).then_some(uidata.selected_row));
        // Windowing is done by the model, the widget always starts at the first row it gets
        *self.table_state.offset_mut() = 0;
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [message_area, position_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(32)]).areas(area);

        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), message_area);

        let position = if uidata.nrows == 0 {
            format!("0/{}", uidata.total_rows)
        } else {
            format!("{}/{} ({})", uidata.abs_selected_row + 1, uidata.nrows, uidata.total_rows)
        };
        let position = Span::styled(position, Style::new().blue().bold());
        let line = if uidata.search.input.is_empty() {
            Line::from(position)
        } else {
            Line::from(vec![
                "filter: ".into(),
                uidata.search.input.as_str().yellow(),
                " ".into(),
                position,
            ])
        };
        frame.render_widget(Paragraph::new(line.right_aligned()), position_area);
    }

    fn render_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let [area] = Layout::vertical([Constraint::Percentage(70)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::horizontal([Constraint::Percentage(70)])
            .flex(Flex::Center)
            .areas(area);

        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(vec![" Close ".into(), "<Esc> ".blue().bold()]).centered())
            .border_set(border::THICK);

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(uidata.popup_message.as_str()).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FVConfig, FVError, Message};
    use crate::film::Film;
    use crate::loader::{FilmSource, parse_films};
    use ratatui::{Terminal, backend::TestBackend};

    struct StaticSource;

    impl FilmSource for StaticSource {
        fn describe(&self) -> String {
            "films.json".to_string()
        }

        fn fetch(&self) -> Result<Vec<Film>, FVError> {
            parse_films(
                r#"[
                    {"title": "Amélie", "year": 2001, "country": "France[1]", "director": "Jeunet", "revenue": 33200000},
                    {"title": "Heat", "year": 1995, "country": "US", "director": "Mann", "revenue": 187400000}
                ]"#,
            )
        }
    }

    struct WideSource;

    impl FilmSource for WideSource {
        fn describe(&self) -> String {
            "wide.json".to_string()
        }

        fn fetch(&self) -> Result<Vec<Film>, FVError> {
            let title = "A".repeat(70_000);
            parse_films(&format!(
                r#"[{{"title": "{title}", "year": 1999, "country": "US", "director": "Nobody", "revenue": 1}}]"#
            ))
        }
    }

    fn screen(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 14)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn draws_header_and_rows() {
        let model = Model::initialize(&FVConfig::default(), &StaticSource, 80, 14);
        let out = screen(&model);
        assert!(out.contains("Title"));
        assert!(out.contains("Revenue"));
        assert!(out.contains("Jeunet"));
        assert!(out.contains("$187,400,000"));
        assert!(out.contains("Loaded 2 films"));
    }

    #[test]
    fn hidden_rows_are_not_drawn() {
        let mut model = Model::initialize(&FVConfig::default(), &StaticSource, 80, 14);
        model.set_filter("mann");
        let out = screen(&model);
        assert!(out.contains("Heat"));
        assert!(!out.contains("Jeunet"));
        assert!(out.contains("filter: mann"));
    }

    #[test]
    fn draws_help_popup() {
        let mut model = Model::initialize(&FVConfig::default(), &StaticSource, 80, 14);
        model.update(Some(Message::Help)).unwrap();
        assert!(screen(&model).contains("Help"));
    }

    #[test]
    fn draws_loading_state() {
        let model = Model::init(&FVConfig::default(), 80, 14);
        assert!(screen(&model).contains("Loading ..."));
    }

    #[test]
    fn oversized_columns_and_cursor_are_clamped() {
        let cfg = FVConfig::default().max_column_width(100_000);
        let mut model = Model::initialize(&cfg, &WideSource, 80, 14);
        assert!(model.get_uidata().columns[0].width > usize::from(u16::MAX));
        assert!(screen(&model).contains("AAAA"));

        model.set_filter(&"a".repeat(70_000));
        model.update(Some(Message::Search)).unwrap();
        assert!(model.get_uidata().search.cursor_pos > usize::from(u16::MAX));
        assert!(screen(&model).contains("Search"));
    }
}
