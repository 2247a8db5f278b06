use rayon::prelude::*;

use crate::film::Film;
use crate::format::{clean_text, format_revenue};

pub const COLUMN_NAMES: [&str; 5] = ["Title", "Year", "Country", "Director", "Revenue"];

/// The rendered form of one film. Cells are fixed at render time, only `visible` changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: [String; 5],
    visible: bool,
}

impl Row {
    fn from_film(film: &Film) -> Self {
        Row {
            cells: [
                film.title.display_text(),
                film.year.display_text(),
                clean_text(&film.country.display_text()),
                clean_text(&film.director.display_text()),
                format_revenue(&film.revenue),
            ],
            visible: true,
        }
    }

    pub fn cells(&self) -> &[String; 5] {
        &self.cells
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// All cell texts joined by single spaces.
    pub fn text(&self) -> String {
        self.cells.join(" ")
    }

    fn matches(&self, needle: &str) -> bool {
        self.text().to_lowercase().contains(needle)
    }
}

/// Row container. Rows are only ever appended; filtering never reorders or drops them.
#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn render(&mut self, films: &[Film]) {
        self.rows.reserve(films.len());
        self.rows.extend(films.iter().map(Row::from_film));
    }

    /// Recomputes the visibility of every row against `term` and returns the number of visible rows.
    pub fn filter(&mut self, term: &str) -> usize {
        let needle = term.to_lowercase();
        self.rows
            .par_iter_mut()
            .for_each(|row| row.visible = row.matches(&needle));
        self.rows.iter().filter(|r| r.visible).count()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indices of the visible rows in display order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.visible)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_films;

    fn table_from(body: &str) -> Table {
        let mut table = Table::default();
        table.render(&parse_films(body).unwrap());
        table
    }

    fn sample() -> Table {
        table_from(
            r#"[
                {"title": "Amélie", "year": 2001, "country": "France[1]", "director": "Jeunet", "revenue": 33200000},
                {"title": "A", "year": 2000, "country": "US[1]", "director": "Smith", "revenue": 1000000},
                {"title": "Oldboy", "year": "2003", "country": "South Korea[2]", "director": "Park Chan-wook[3]", "revenue": 15000000}
            ]"#,
        )
    }

    #[test]
    fn renders_one_row_per_record_in_order() {
        let table = sample();
        assert_eq!(table.len(), 3);
        let titles: Vec<&str> = table.rows().iter().map(|r| r.cells()[0].as_str()).collect();
        assert_eq!(titles, vec!["Amélie", "A", "Oldboy"]);
        assert!(table.rows().iter().all(|r| r.is_visible()));
    }

    #[test]
    fn renders_cleaned_and_formatted_cells() {
        let table = sample();
        assert_eq!(
            table.rows()[1].cells(),
            &["A", "2000", "US", "Smith", "$1,000,000"].map(String::from)
        );
        assert_eq!(table.rows()[2].cells()[3], "Park Chan-wook");
        assert_eq!(
            table.rows()[0].text(),
            "Amélie 2001 France Jeunet $33,200,000"
        );
    }

    #[test]
    fn render_appends() {
        let mut table = sample();
        table.render(&parse_films(r#"[{"title": "Z"}]"#).unwrap());
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.rows()[3].cells(),
            &["Z", "undefined", "undefined", "undefined", "$NaN"].map(String::from)
        );
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let mut table = sample();
        assert_eq!(table.filter("jeun"), 1);
        assert!(table.rows()[0].is_visible());
        assert!(!table.rows()[1].is_visible());

        assert_eq!(table.filter("zzz"), 0);
        assert!(table.rows().iter().all(|r| !r.is_visible()));
    }

    #[test]
    fn filter_matches_across_cells_and_formatted_text() {
        let mut table = sample();
        assert_eq!(table.filter("france jeunet"), 1);
        assert_eq!(table.filter("$15,000"), 1);
        // citation markers are gone from the rendered text
        assert_eq!(table.filter("[1]"), 0);
    }

    #[test]
    fn empty_filter_shows_everything() {
        let mut table = sample();
        table.filter("oldboy");
        assert_eq!(table.visible_indices(), vec![2]);
        assert_eq!(table.filter(""), 3);
        assert_eq!(table.visible_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn filter_never_reorders_or_removes() {
        let mut table = sample();
        let before: Vec<[String; 5]> = table.rows().iter().map(|r| r.cells().clone()).collect();
        for term in ["a", "ZZZ", "2000", "", "k"] {
            table.filter(term);
            let after: Vec<[String; 5]> =
                table.rows().iter().map(|r| r.cells().clone()).collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn scenario_single_record() {
        let mut table = table_from(
            r#"[{"title":"A","year":2000,"country":"US[1]","director":"Smith","revenue":1000000}]"#,
        );
        assert_eq!(
            table.rows()[0].cells(),
            &["A", "2000", "US", "Smith", "$1,000,000"].map(String::from)
        );
        assert_eq!(table.filter("us"), 1);
        assert_eq!(table.filter("europe"), 0);
    }
}
