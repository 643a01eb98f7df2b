use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::thread::JoinHandle;

use csv::ReaderBuilder;

use crate::model::RawRecord;

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
    Text { label: String, body: String },
}

impl DataSource {
    /// `http(s)://` locations are fetched, anything else is read from disk.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    pub fn text(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Text {
            label: label.into(),
            body: body.into(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Text { label, .. } => label.clone(),
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io { origin: String, source: std::io::Error },
    Http { origin: String, source: reqwest::Error },
    Csv(csv::Error),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { origin, source } => write!(f, "failed to read {origin}: {source}"),
            Self::Http { origin, source } => write!(f, "failed to fetch {origin}: {source}"),
            Self::Csv(error) => write!(f, "malformed csv: {error}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<csv::Error> for LoadError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Result of a load that ran off the session thread.
#[derive(Debug)]
pub struct LoadCompletion {
    pub origin: String,
    pub result: Result<Vec<RawRecord>, LoadError>,
}

pub fn load(source: &DataSource) -> Result<Vec<RawRecord>, LoadError> {
    let text = read_source(source)?;
    parse_records(&text)
}

/// Runs [`load`] on a worker thread and hands the outcome to `on_complete`.
pub fn load_in_background<F>(source: DataSource, on_complete: F) -> JoinHandle<()>
where
    F: FnOnce(LoadCompletion) + Send + 'static,
{
    std::thread::spawn(move || {
        let origin = source.label();
        let result = load(&source);
        on_complete(LoadCompletion { origin, result });
    })
}

pub fn read_source(source: &DataSource) -> Result<String, LoadError> {
    match source {
        DataSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                origin: path.display().to_string(),
                source,
            })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        DataSource::Url(url) => fetch_text(url).map_err(|source| LoadError::Http {
            origin: url.clone(),
            source,
        }),
        DataSource::Text { body, .. } => Ok(body.clone()),
    }
}

fn fetch_text(url: &str) -> Result<String, reqwest::Error> {
    reqwest::blocking::get(url)?.error_for_status()?.text()
}

/// Header-driven parse. Blank lines are skipped, short rows yield absent cells and
/// cells past the header land under `__extra_<column>`.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, LoadError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        if is_blank_row(&row) {
            continue;
        }

        let mut record = RawRecord::default();
        for (column, value) in row.iter().enumerate() {
            match headers.get(column) {
                Some(header) => record.insert(header, value),
                None => record.insert(format!("__extra_{column}"), value),
            }
        }
        records.push(record);
    }

    Ok(records)
}

fn is_blank_row(row: &csv::StringRecord) -> bool {
    row.is_empty() || (row.len() == 1 && row.get(0).is_some_and(|cell| cell.trim().is_empty()))
}
