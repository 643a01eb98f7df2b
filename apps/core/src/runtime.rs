use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use crate::cache_store::SqliteCacheStore;
use crate::catalog::{Catalog, CatalogProfile, StartOrigin};
use crate::config::{self, Config, ConfigError};
use crate::contract::SearchResponse;
use crate::debounce::Debouncer;
use crate::export::{self, ArtifactSink, DirectorySink, ExportError};
use crate::loader::{self, DataSource, LoadCompletion};
use crate::model::CanonicalRecord;
use crate::normalize::format_currency;
use crate::search::{MatchMode, SearchOutcome};
use crate::selection::{EditKey, EntryEditor, SelectionList};

#[derive(Debug, Parser)]
#[command(name = "gestock")]
#[command(about = "Product price lookup and label list builder over CSV catalogs")]
pub struct Cli {
    /// Config file (TOML). Defaults live under the temp directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Look up the highest price per product
    Precios {
        #[arg(value_name = "QUERY")]
        query: Vec<String>,
        /// Replace the cached catalog with this CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
        /// Drop the cached catalog
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        json: bool,
    },
    /// Build label lists from the product catalog
    Labels {
        #[command(subcommand)]
        action: LabelsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum LabelsAction {
    /// One-shot fuzzy search
    Search {
        #[arg(value_name = "QUERY")]
        query: Vec<String>,
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Write etiquetas_nombres.csv for the given names
    Export {
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },
    /// Write the Google Sheets formatting script
    Script {
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
    },
    /// Interactive search and list editing over stdin
    Session {
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Export(ExportError),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Export(error) => write!(f, "export error: {error}"),
            Self::Json(error) => write!(f, "json error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ExportError> for RuntimeError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl RuntimeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

pub fn run(cli: Cli, config: &Config, out: &mut dyn Write) -> Result<(), RuntimeError> {
    if !config.config_path.exists() {
        config::save(config)?;
        log::info!("wrote default config to {}", config.config_path.display());
    }

    match cli.command {
        Commands::Precios {
            query,
            csv,
            clear,
            json,
        } => run_prices(config, &query.join(" "), csv, clear, json, out),
        Commands::Labels { action } => match action {
            LabelsAction::Search { query, csv, json } => {
                run_labels_search(config, &query.join(" "), csv, json, out)
            }
            LabelsAction::Export { out: dir, names } => {
                let mut selection = SelectionList::new();
                for name in &names {
                    selection.append(name.trim());
                }
                let path = DirectorySink::new(dir)
                    .offer(&export::labels_csv_artifact(selection.entries())?)?;
                writeln!(out, "Exportado: {}", path.display())?;
                Ok(())
            }
            LabelsAction::Script { out: dir } => {
                let path = DirectorySink::new(dir).offer(&export::formatting_script_artifact())?;
                writeln!(out, "Script: {}", path.display())?;
                Ok(())
            }
            LabelsAction::Session { csv, out: dir } => {
                let catalog = labels_catalog(config, csv);
                let sink = DirectorySink::new(dir.unwrap_or_else(|| config.output_dir.clone()));
                let mut session = LabelsSession::new(
                    catalog,
                    Box::new(sink),
                    Duration::from_millis(config.debounce_ms),
                );
                session.start(out)?;
                drive_session(&mut session, std::io::BufReader::new(std::io::stdin()), out)
            }
        },
    }
}

fn run_prices(
    config: &Config,
    query: &str,
    csv: Option<PathBuf>,
    clear: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), RuntimeError> {
    let mut catalog = Catalog::new(CatalogProfile::prices(config));
    match SqliteCacheStore::open_file(&config.cache_db_path) {
        Ok(store) => catalog = catalog.with_cache(Box::new(store)),
        Err(error) => log::warn!("price cache unavailable: {error}"),
    }

    if clear {
        catalog.clear();
        writeln!(out, "Datos de precios borrados.")?;
        if csv.is_none() {
            return Ok(());
        }
    }

    match csv {
        Some(path) => {
            catalog.load(&DataSource::Path(path));
        }
        None => {
            let origin = catalog.start(&DataSource::parse(&config.default_source));
            if origin == StartOrigin::Cache {
                log::info!("prices served from cache; pass --csv to refresh");
            }
        }
    }

    let outcome = catalog.search(query);
    if json {
        let response = SearchResponse::from_outcome(
            query,
            &outcome,
            catalog.loaded_count(),
            catalog.last_error(),
        );
        serde_json::to_writer_pretty(&mut *out, &response)?;
        writeln!(out)?;
    } else {
        let table = render_price_table(
            &outcome,
            catalog.loaded_count(),
            catalog.profile().limits.display_limit,
            catalog.last_error(),
        );
        out.write_all(table.as_bytes())?;
    }
    Ok(())
}

fn run_labels_search(
    config: &Config,
    query: &str,
    csv: Option<PathBuf>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), RuntimeError> {
    let catalog = labels_catalog(config, csv);
    let outcome = catalog.search(query);
    if json {
        let response = SearchResponse::from_outcome(query, &outcome, catalog.loaded_count(), None);
        serde_json::to_writer_pretty(&mut *out, &response)?;
        writeln!(out)?;
    } else {
        out.write_all(render_hits(&outcome.hits).as_bytes())?;
    }
    Ok(())
}

fn labels_catalog(config: &Config, csv: Option<PathBuf>) -> Catalog {
    let source = csv
        .map(DataSource::Path)
        .unwrap_or_else(|| DataSource::parse(&config.default_source));
    let mut catalog = Catalog::new(CatalogProfile::labels(config));
    catalog.load(&source);
    catalog
}

/// Price lookup table: summary, one row per product, truncation footer.
pub fn render_price_table(
    outcome: &SearchOutcome<'_>,
    loaded: usize,
    display_limit: usize,
    error: Option<&str>,
) -> String {
    let mut text = String::new();
    if let Some(error) = error {
        text.push_str(&format!("Error al leer el archivo: {error}\n"));
    }
    if loaded == 0 {
        text.push_str("Sin datos de precios. Cargá un CSV con --csv.\n");
        return text;
    }

    text.push_str(&format!(
        "{} productos (precio MÁXIMO por producto) — mostrando {display_limit}\n",
        outcome.total
    ));
    text.push_str(&format!(
        "{:<40} {:>14}  {}\n",
        "Nombre", "Precio", "Última actualización"
    ));
    for record in &outcome.hits {
        text.push_str(&format!(
            "{:<40} {:>14}  {}\n",
            record.display_name(),
            format_currency(record.price_amount()),
            record.display_last_updated()
        ));
    }
    if outcome.is_truncated() {
        text.push_str(&format!(
            "Mostrando {} de {}. Usa la búsqueda para afinar.\n",
            outcome.hits.len(),
            outcome.total
        ));
    }
    text
}

/// Numbered result rows with a code/barcode line when either exists.
pub fn render_hits(hits: &[&CanonicalRecord]) -> String {
    if hits.is_empty() {
        return "No hay coincidencias. Probá con menos palabras o sin acentos.\n".to_string();
    }

    let mut text = String::new();
    for (position, record) in hits.iter().enumerate() {
        text.push_str(&format!("{:>3}. {}\n", position + 1, record.name()));
        let detail = match (record.item_code(), record.barcode()) {
            ("", "") => continue,
            (code, "") => code.to_string(),
            (code, barcode) => format!("{code} · {barcode}").trim().to_string(),
        };
        text.push_str(&format!("     {detail}\n"));
    }
    text
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Query(String),
    Add(usize),
    Remove(usize),
    Edit { index: usize, text: String },
    List,
    Clear,
    Export,
    Script,
    Print,
    Load(String),
    Quit,
}

/// Lines starting with `:` are commands (1-based positions), anything else is a query.
pub fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let Some(command) = line.strip_prefix(':') else {
        return Ok(SessionCommand::Query(line.to_string()));
    };

    let (verb, rest) = match command.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (command, ""),
    };

    match verb {
        "add" => Ok(SessionCommand::Add(parse_position(rest)?)),
        "rm" => Ok(SessionCommand::Remove(parse_position(rest)?)),
        "edit" => {
            let (position, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Ok(SessionCommand::Edit {
                index: parse_position(position)?,
                text: text.to_string(),
            })
        }
        "list" => Ok(SessionCommand::List),
        "clear" => Ok(SessionCommand::Clear),
        "export" => Ok(SessionCommand::Export),
        "script" => Ok(SessionCommand::Script),
        "print" => Ok(SessionCommand::Print),
        "load" if !rest.trim().is_empty() => Ok(SessionCommand::Load(rest.trim().to_string())),
        "load" => Err("uso: :load ARCHIVO".to_string()),
        "quit" | "q" => Ok(SessionCommand::Quit),
        other => Err(format!("comando desconocido: :{other}")),
    }
}

fn parse_position(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .ok_or_else(|| format!("posición inválida: '{}'", raw.trim()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Quit,
    Load(DataSource),
}

/// Interactive label builder: debounced search over the catalog plus the editable list.
pub struct LabelsSession {
    catalog: Catalog,
    selection: SelectionList,
    debouncer: Debouncer<String>,
    sink: Box<dyn ArtifactSink>,
    hits: Vec<CanonicalRecord>,
    mode: MatchMode,
    query: String,
}

impl LabelsSession {
    pub fn new(catalog: Catalog, sink: Box<dyn ArtifactSink>, delay: Duration) -> Self {
        Self {
            catalog,
            selection: SelectionList::new(),
            debouncer: Debouncer::new(delay),
            sink,
            hits: Vec::new(),
            mode: MatchMode::Browse,
            query: String::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionList {
        &self.selection
    }

    pub fn hits(&self) -> &[CanonicalRecord] {
        &self.hits
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_searching(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn debounce_remaining(&self, now: Instant) -> Option<Duration> {
        self.debouncer.remaining(now)
    }

    pub fn start(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        self.apply_query(String::new(), out)
    }

    pub fn status_line(&self) -> String {
        let results = if self.is_searching() {
            "Buscando…".to_string()
        } else {
            format!("Resultados: {}", self.hits.len())
        };
        format!(
            "Cargados: {} · {results} · Lista: {}",
            self.catalog.loaded_count(),
            self.selection.len()
        )
    }

    pub fn handle_line(
        &mut self,
        line: &str,
        now: Instant,
        out: &mut dyn Write,
    ) -> Result<SessionFlow, RuntimeError> {
        let command = match parse_command(line) {
            Ok(SessionCommand::Query(query)) => {
                self.debouncer.push(query, now);
                writeln!(out, "{}", self.status_line())?;
                return Ok(SessionFlow::Continue);
            }
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                return Ok(SessionFlow::Continue);
            }
        };

        self.flush(out)?;
        match command {
            SessionCommand::Query(_) => {}
            SessionCommand::Add(position) => match self.hits.get(position) {
                Some(record) => {
                    let name = record.name().to_string();
                    if self.selection.append(&name) {
                        writeln!(out, "Agregado: {name}")?;
                    }
                }
                None => writeln!(out, "No hay resultado en la posición {}", position + 1)?,
            },
            SessionCommand::Remove(index) => match self.selection.remove_at(index) {
                Ok(name) => writeln!(out, "Quitado: {name}")?,
                Err(error) => writeln!(out, "{error}")?,
            },
            SessionCommand::Edit { index, text } => match self.edit_entry(index, &text) {
                Ok(()) => out.write_all(export::print_sheet(self.selection.entries()).as_bytes())?,
                Err(error) => writeln!(out, "{error}")?,
            },
            SessionCommand::List => {
                writeln!(
                    out,
                    "Lista ({}) · Se imprime en una sola columna hacia abajo",
                    self.selection.len()
                )?;
                self.write_sheet(out)?;
            }
            SessionCommand::Clear => {
                self.selection.clear();
                writeln!(out, "Lista vacía.")?;
            }
            SessionCommand::Export => {
                if self.selection.is_empty() {
                    writeln!(out, "La lista está vacía; no hay nada para exportar.")?;
                } else {
                    let artifact = export::labels_csv_artifact(self.selection.entries())?;
                    let path = self.sink.offer(&artifact)?;
                    writeln!(out, "Exportado: {}", path.display())?;
                }
            }
            SessionCommand::Script => {
                let path = self.sink.offer(&export::formatting_script_artifact())?;
                writeln!(out, "Script: {}", path.display())?;
            }
            SessionCommand::Print => self.write_sheet(out)?,
            SessionCommand::Load(location) => {
                writeln!(out, "Cargando {location}…")?;
                return Ok(SessionFlow::Load(DataSource::parse(&location)));
            }
            SessionCommand::Quit => return Ok(SessionFlow::Quit),
        }
        Ok(SessionFlow::Continue)
    }

    /// Runs the pending query once its debounce delay has elapsed.
    pub fn tick(&mut self, now: Instant, out: &mut dyn Write) -> Result<(), RuntimeError> {
        if let Some(query) = self.debouncer.poll(now) {
            self.apply_query(query, out)?;
        }
        Ok(())
    }

    /// Runs the pending query immediately.
    pub fn flush(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        if let Some(query) = self.debouncer.flush() {
            self.apply_query(query, out)?;
        }
        Ok(())
    }

    /// Replaces the catalog with a finished load and re-runs the current query.
    pub fn install(
        &mut self,
        completion: LoadCompletion,
        out: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        self.catalog.install(completion);
        let query = self.debouncer.flush().unwrap_or_else(|| self.query.clone());
        self.apply_query(query, out)
    }

    fn apply_query(&mut self, query: String, out: &mut dyn Write) -> Result<(), RuntimeError> {
        let outcome = self.catalog.search(&query);
        self.mode = outcome.mode;
        self.hits = outcome.hits.iter().map(|record| (*record).clone()).collect();
        out.write_all(render_hits(&outcome.hits).as_bytes())?;
        self.query = query;
        writeln!(out, "{}", self.status_line())?;
        Ok(())
    }

    fn edit_entry(&mut self, index: usize, text: &str) -> Result<(), crate::selection::SelectionError> {
        let mut editor = EntryEditor::begin(&self.selection, index)?;
        editor.replace_text("");
        for (line_number, line) in text.split("\\n").enumerate() {
            if line_number > 0 {
                editor.key(EditKey::ModifiedConfirm);
            }
            editor.type_text(line);
        }
        editor.key(EditKey::Confirm);
        editor.commit(&mut self.selection)
    }

    fn write_sheet(&self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        if self.selection.is_empty() {
            writeln!(out, "Sin elementos. Agregá desde el buscador.")?;
        } else {
            out.write_all(export::print_sheet(self.selection.entries()).as_bytes())?;
        }
        Ok(())
    }
}

enum SessionEvent {
    Line(String),
    InputClosed,
    Loaded(LoadCompletion),
}

/// Feeds `input` lines into the session, firing debounced queries and installing
/// background loads as they complete. Returns once input ends and no load is in flight.
pub fn drive_session<R>(
    session: &mut LabelsSession,
    input: R,
    out: &mut dyn Write,
) -> Result<(), RuntimeError>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let line_tx = tx.clone();
    std::thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else {
                break;
            };
            if line_tx.send(SessionEvent::Line(line)).is_err() {
                return;
            }
        }
        let _ = line_tx.send(SessionEvent::InputClosed);
    });

    let mut input_open = true;
    let mut loads_in_flight = 0_usize;
    loop {
        if !input_open && loads_in_flight == 0 {
            session.flush(out)?;
            break;
        }

        let event = match session.debounce_remaining(Instant::now()) {
            Some(wait) => match rx.recv_timeout(wait) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            None => session.tick(Instant::now(), out)?,
            Some(SessionEvent::Line(line)) => {
                match session.handle_line(&line, Instant::now(), out)? {
                    SessionFlow::Continue => {}
                    SessionFlow::Quit => break,
                    SessionFlow::Load(source) => {
                        loads_in_flight += 1;
                        let load_tx = tx.clone();
                        loader::load_in_background(source, move |completion| {
                            let _ = load_tx.send(SessionEvent::Loaded(completion));
                        });
                    }
                }
            }
            Some(SessionEvent::Loaded(completion)) => {
                loads_in_flight = loads_in_flight.saturating_sub(1);
                session.install(completion, out)?;
            }
            Some(SessionEvent::InputClosed) => input_open = false,
        }
        out.flush()?;
    }
    Ok(())
}
