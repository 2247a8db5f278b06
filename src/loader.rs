use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::domain::FVError;
use crate::film::Film;

/// Somewhere film records can be fetched from, once.
pub trait FilmSource {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Vec<Film>, FVError>;
}

#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Expands `~` and environment variables in a path given on the command line.
    pub fn from_arg(arg: &str) -> Result<Self, FVError> {
        let expanded = shellexpand::full(arg)
            .map_err(|e| FVError::LoadingFailed(format!("Cannot expand path {arg}: {e}")))?;
        Ok(Self::new(PathBuf::from(expanded.as_ref())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_file(&self) -> Result<u64, FVError> {
        let metadata = fs::metadata(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FVError::FileNotFound,
            ErrorKind::PermissionDenied => FVError::PermissionDenied,
            _ => FVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(FVError::LoadingFailed("Not a file!".into()));
        }

        match self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("JSON") => Ok(metadata.len()),
            _ => Err(FVError::UnknownFileType),
        }
    }
}

impl FilmSource for JsonFile {
    fn describe(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn fetch(&self) -> Result<Vec<Film>, FVError> {
        let start_time = Instant::now();
        let file_size = self.check_file()?;
        debug!("Reading {file_size} bytes ...");

        let body = fs::read_to_string(&self.path)?;
        let films = parse_films(&body)?;

        info!(
            "Loaded {} films in {}ms",
            films.len(),
            start_time.elapsed().as_millis()
        );
        Ok(films)
    }
}

/// The body has to be a JSON array of objects. A single bad entry fails the whole body.
pub fn parse_films(body: &str) -> Result<Vec<Film>, FVError> {
    Ok(serde_json::from_str::<Vec<Film>>(body)?)
}
