use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

mod controller;
mod domain;
mod film;
mod format;
mod html;
mod inputter;
mod loader;
mod logging;
mod model;
mod spider;
mod table;
mod ui;

use controller::Controller;
use domain::{DEFAULT_DATA_PATH, FVConfig, FVError};
use loader::JsonFile;
use model::{Model, Status};
use ui::TableUI;

/// A tui based film table viewer with live filtering.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file holding an array of films
    #[arg(default_value = DEFAULT_DATA_PATH)]
    path: String,

    /// Filter applied right after loading
    #[arg(short, long, default_value = "")]
    filter: String,

    /// Write the table as a standalone HTML page instead of starting the viewer
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,

    /// Download the film list from Wikipedia into the JSON file, then exit
    #[arg(long, conflicts_with = "html")]
    scrape: bool,

    /// Milliseconds to wait for terminal events per loop
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Upper bound for the width of a table column
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Defaults to filmview.log in the temp directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            error!("Fatal: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), FVError> {
    let log_file = args.log_file.clone().unwrap_or_else(logging::default_log_file);
    logging::init(&log_file)?;
    info!("Starting filmview {} ...", env!("CARGO_PKG_VERSION"));

    let cfg = FVConfig::default()
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_column_width);
    let source = JsonFile::from_arg(&args.path)?;

    if args.scrape {
        return scrape(source.path());
    }
    match &args.html {
        Some(out) => export(&cfg, &source, &args.filter, out),
        None => run_tui(&cfg, &source, &args.filter),
    }
}

fn scrape(out: &Path) -> Result<(), FVError> {
    let spider = spider::Spider::new()?;
    let films = spider.crawl()?;
    spider::write_films(out, &films)?;
    println!("Wrote {} films to {}", films.len(), out.display());
    Ok(())
}

fn export(cfg: &FVConfig, source: &JsonFile, filter: &str, out: &Path) -> Result<(), FVError> {
    let mut model = Model::initialize(cfg, source, 0, 0);
    // Without a terminal there is nobody to show the status line to
    if let Some(e) = model.take_load_error() {
        return Err(e);
    }
    model.set_filter(filter);

    let title = source
        .path()
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("films");
    html::write_page(out, model.table(), title, model.filter_term())
}

fn run_tui(cfg: &FVConfig, source: &JsonFile, filter: &str) -> Result<(), FVError> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, cfg, source, filter);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    cfg: &FVConfig,
    source: &JsonFile,
    filter: &str,
) -> Result<(), FVError> {
    let size = terminal.size()?;

    let mut model = Model::init(cfg, size.width as usize, size.height as usize);
    let mut ui = TableUI::new();
    let controller = Controller::new(cfg);

    // Show the loading state before the data is read
    terminal.draw(|f| ui.draw(&model, f))?;
    model.load(source);
    if !filter.is_empty() {
        model.set_filter(filter);
    }

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Quitting filmview");
    Ok(())
}
