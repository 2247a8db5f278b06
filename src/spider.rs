//! Builds the film data file from Wikipedia's list of highest-grossing films.
//!
//! The list page provides title, year, worldwide gross and the link to each
//! film's article. Country and director come from the infobox of that article.
//! A value that cannot be found is written as `NONE`, so one broken article
//! never stops the whole run.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::FVError;

pub const LIST_URL: &str = "https://en.wikipedia.org/wiki/List_of_highest-grossing_films";
pub const WIKI_BASE_URL: &str = "https://en.wikipedia.org";

const MAX_RETRIES: usize = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("filmview/", env!("CARGO_PKG_VERSION"));
const UNKNOWN: &str = "NONE";

const COUNTRY_LABELS: [&str; 2] = ["Country", "Countries"];
const DIRECTOR_LABELS: [&str; 1] = ["Directed by"];

/// Articles whose infobox does not carry usable values: (title, country, director).
const CORRECTIONS: [(&str, &str, &str); 1] = [("Ne Zha 2", "China", "Jiaozi")];

/// One row of the list table, before the film's own article has been read.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedFilm {
    pub year: String,
    pub title: String,
    pub revenue: u64,
    pub href: String,
}

/// A complete record as written to the data file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedFilm {
    pub year: String,
    pub title: String,
    pub revenue: u64,
    pub href: String,
    pub country: String,
    pub director: String,
}

impl ScrapedFilm {
    fn from_listed(film: ListedFilm, country: Option<String>, director: Option<String>) -> Self {
        Self {
            country: country.unwrap_or_else(|| UNKNOWN.to_string()),
            director: director.unwrap_or_else(|| UNKNOWN.to_string()),
            year: film.year,
            title: film.title,
            revenue: film.revenue,
            href: film.href,
        }
    }
}

/// The HTML patterns used to pick values out of Wikipedia pages.
pub struct Patterns {
    wikitable: Regex,
    infobox: Regex,
    row: Regex,
    header_cell: Regex,
    data_cell: Regex,
    anchor: Regex,
    list_item: Regex,
    tag: Regex,
}

fn compile(pattern: &str) -> Result<Regex, FVError> {
    Regex::new(pattern).map_err(|e| FVError::ScrapeFailed(format!("Invalid pattern {pattern}: {e}")))
}

impl Patterns {
    pub fn new() -> Result<Self, FVError> {
        Ok(Self {
            wikitable: compile(r#"(?s)<table[^>]*class="[^"]*\bwikitable\b[^"]*"[^>]*>(.*?)</table>"#)?,
            infobox: compile(r#"<table[^>]*class="[^"]*\binfobox\b"#)?,
            row: compile(r"(?s)<tr\b[^>]*>(.*?)</tr>")?,
            header_cell: compile(r"(?s)<th\b[^>]*>(.*?)</th>")?,
            data_cell: compile(r"(?s)<td\b[^>]*>(.*?)</td>")?,
            anchor: compile(r#"(?s)<a\b[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)?,
            list_item: compile(r"(?s)<li\b[^>]*>(.*?)</li>")?,
            tag: compile(r"<[^>]+>")?,
        })
    }

    /// Reads the rows of the first `wikitable` on the list page.
    /// Rows without a linked title or a numeric gross are skipped.
    pub fn list_films(&self, html: &str) -> Result<Vec<ListedFilm>, FVError> {
        let table = self
            .wikitable
            .captures(html)
            .and_then(|c| c.get(1))
            .ok_or_else(|| FVError::ScrapeFailed("No wikitable on the list page".into()))?;

        let mut films = Vec::new();
        for row in self.row.captures_iter(table.as_str()) {
            let row = &row[1];
            let cells: Vec<&str> = self
                .data_cell
                .captures_iter(row)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            if cells.len() < 4 {
                continue; // header row
            }
            let Some(header) = self.header_cell.captures(row) else {
                continue;
            };
            let Some(anchor) = self.anchor.captures(&header[1]) else {
                debug!("Row without a film link: {}", self.text(&header[1]));
                continue;
            };

            let title = self.text(&anchor[2]);
            let Some(revenue) = parse_revenue(&self.text(cells[2])) else {
                warn!("Skipping {title}, no gross in {:?}", self.text(cells[2]));
                continue;
            };
            films.push(ListedFilm {
                year: self.text(cells[3]),
                title,
                revenue,
                href: decode_entities(&anchor[1]),
            });
        }
        Ok(films)
    }

    /// Value of the first infobox row whose label is one of `labels`.
    /// List items are joined with `, `, any other cell is taken as text.
    pub fn infobox_value(&self, html: &str, labels: &[&str]) -> Option<String> {
        let start = self.infobox.find(html).map_or(0, |m| m.start());
        self.row
            .captures_iter(&html[start..])
            .find_map(|row| {
                let row = &row[1];
                let label = self.header_cell.captures(row)?;
                if !labels.contains(&self.text(&label[1]).as_str()) {
                    return None;
                }
                let cell = self.data_cell.captures(row)?;
                Some(self.cell_value(&cell[1]))
            })
            .filter(|value| !value.is_empty())
    }

    fn cell_value(&self, cell: &str) -> String {
        let items: Vec<String> = self
            .list_item
            .captures_iter(cell)
            .map(|item| self.text(&item[1]))
            .collect();
        if items.is_empty() {
            self.text(cell)
        } else {
            items.join(", ")
        }
    }

    /// Visible text of an HTML fragment. Reference markers such as `[1]` are kept.
    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, "");
        decode_entities(&stripped).trim().to_string()
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Keeps the digits of a gross like `$2,923,706,026` and reads them as one number.
pub fn parse_revenue(s: &str) -> Option<u64> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Runs `op` up to `max_retries` times and returns the first success or the last error.
pub fn retry<T>(
    max_retries: usize,
    mut op: impl FnMut() -> Result<T, FVError>,
) -> Result<T, FVError> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_retries => return Err(e),
            Err(e) => {
                debug!("Attempt {attempt} of {max_retries} failed: {e}");
                attempt += 1;
            }
        }
    }
}

pub fn apply_corrections(films: &mut [ScrapedFilm]) {
    for film in films.iter_mut() {
        if let Some((_, country, director)) = CORRECTIONS.iter().find(|(t, _, _)| *t == film.title) {
            debug!("Correcting infobox values of {}", film.title);
            film.country = country.to_string();
            film.director = director.to_string();
        }
    }
}

pub struct Spider {
    client: reqwest::blocking::Client,
    list_url: String,
    base_url: String,
    patterns: Patterns,
}

impl Spider {
    pub fn new() -> Result<Self, FVError> {
        Self::with_urls(LIST_URL, WIKI_BASE_URL)
    }

    pub fn with_urls(list_url: &str, base_url: &str) -> Result<Self, FVError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            list_url: list_url.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            patterns: Patterns::new()?,
        })
    }

    fn get(&self, url: &str) -> Result<String, FVError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    /// Reads the list page, then every film article, in list order.
    #[instrument(skip(self), fields(url = %self.list_url))]
    pub fn crawl(&self) -> Result<Vec<ScrapedFilm>, FVError> {
        let start_time = Instant::now();
        let html = retry(MAX_RETRIES, || self.get(&self.list_url))?;
        let listed = self.patterns.list_films(&html)?;
        info!("Found {} films on the list page", listed.len());

        let mut films: Vec<ScrapedFilm> = listed
            .into_par_iter()
            .map(|film| self.complete(film))
            .collect();
        apply_corrections(&mut films);

        info!(
            "Crawled {} films in {}ms",
            films.len(),
            start_time.elapsed().as_millis()
        );
        Ok(films)
    }

    fn complete(&self, film: ListedFilm) -> ScrapedFilm {
        let url = format!("{}{}", self.base_url, film.href);
        let (country, director) = match retry(MAX_RETRIES, || self.get(&url)) {
            Ok(page) => (
                self.patterns.infobox_value(&page, &COUNTRY_LABELS),
                self.patterns.infobox_value(&page, &DIRECTOR_LABELS),
            ),
            Err(e) => {
                warn!("Cannot read {url}: {e}");
                (None, None)
            }
        };
        if country.is_none() {
            warn!("Failed to get country for {}", film.title);
        }
        if director.is_none() {
            warn!("Failed to get director for {}", film.title);
        }
        ScrapedFilm::from_listed(film, country, director)
    }
}

pub fn write_films(path: &Path, films: &[ScrapedFilm]) -> Result<(), FVError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(films)?)?;
    info!("Wrote {} films to {}", films.len(), path.display());
    Ok(())
}
