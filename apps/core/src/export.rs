use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};

pub const LABELS_CSV_FILE_NAME: &str = "etiquetas_nombres.csv";
pub const FORMATTING_SCRIPT_FILE_NAME: &str = "formatear_hoja.gs";
pub const CSV_HEADERS: [&str; 3] = ["name", "$", "price"];

const FORMATTING_SCRIPT: &str = r#"function onOpen(){
  SpreadsheetApp.getUi().createMenu('Etiquetas')
    .addItem('Aplicar formato','applyFormat')
    .addToUi();
}
function applyFormat(){
  const sh = SpreadsheetApp.getActiveSheet();
  if (!sh) return;
  const lastRow = Math.max(sh.getLastRow(), 2);
  // Anchos: A=400px, B=15px, C=100px
  sh.setColumnWidths(1, 1, 400);
  sh.setColumnWidths(2, 1, 15);
  sh.setColumnWidths(3, 1, 100);
  // Encabezados
  sh.getRange(1,1,1,3).setBackground('#f0f0f0').setFontWeight('bold');
  // Columna A (desde fila 2): fondo negro, blanco, Roboto Mono 14
  const rangeA = sh.getRange(2,1,lastRow-1,1);
  rangeA.setBackground('#000000')
        .setFontColor('#ffffff')
        .setFontFamily('Roboto Mono')
        .setFontSize(14);
  // Columna B: centrado
  const rangeB = sh.getRange(2,2,lastRow-1,1);
  rangeB.setHorizontalAlignment('center');
  // Filas congeladas
  sh.setFrozenRows(1);
}"#;

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(error) => write!(f, "csv error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A file handed to the host to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub trait ArtifactSink {
    fn offer(&mut self, artifact: &Artifact) -> Result<PathBuf, ExportError>;
}

/// Writes artifacts into a directory, replacing files of the same name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn offer(&mut self, artifact: &Artifact) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)?;
        Ok(path)
    }
}

/// Three quoted columns `name`, `$`, `price` with CRLF between rows.
pub fn export_csv(entries: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for entry in entries {
        writer.write_record([entry.as_str(), "$", ""])?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|error| ExportError::Io(error.into_error()))?;
    if bytes.ends_with(b"\r\n") {
        bytes.truncate(bytes.len() - 2);
    }
    Ok(bytes)
}

pub fn labels_csv_artifact(entries: &[String]) -> Result<Artifact, ExportError> {
    Ok(Artifact {
        file_name: LABELS_CSV_FILE_NAME.to_string(),
        mime_type: "text/csv;charset=utf-8",
        bytes: export_csv(entries)?,
    })
}

pub fn formatting_script() -> &'static str {
    FORMATTING_SCRIPT
}

pub fn formatting_script_artifact() -> Artifact {
    Artifact {
        file_name: FORMATTING_SCRIPT_FILE_NAME.to_string(),
        mime_type: "text/plain;charset=utf-8",
        bytes: FORMATTING_SCRIPT.as_bytes().to_vec(),
    }
}

/// Single numbered column, the way the list is printed.
pub fn print_sheet(entries: &[String]) -> String {
    let mut sheet = String::new();
    for (position, entry) in entries.iter().enumerate() {
        let mut lines = entry.split('\n');
        let first = lines.next().unwrap_or_default();
        sheet.push_str(&format!("{:>3}. {first}\n", position + 1));
        for continuation in lines {
            sheet.push_str(&format!("     {continuation}\n"));
        }
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::{export_csv, formatting_script_artifact, print_sheet};

    #[test]
    fn quotes_every_cell_and_uses_crlf() {
        let entries = vec!["Café Ñandú".to_string(), "Agua".to_string()];
        let csv = String::from_utf8(export_csv(&entries).unwrap()).unwrap();

        assert_eq!(
            csv,
            "\"name\",\"$\",\"price\"\r\n\"Café Ñandú\",\"$\",\"\"\r\n\"Agua\",\"$\",\"\""
        );
    }

    #[test]
    fn embedded_quotes_commas_and_breaks_stay_in_one_cell() {
        let entries = vec!["Vino \"Tinto\", 750ml\nx6".to_string()];
        let csv = String::from_utf8(export_csv(&entries).unwrap()).unwrap();
        assert!(csv.ends_with("\"Vino \"\"Tinto\"\", 750ml\nx6\",\"$\",\"\""));
    }

    #[test]
    fn empty_list_exports_only_header() {
        let csv = String::from_utf8(export_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv, "\"name\",\"$\",\"price\"");
    }

    #[test]
    fn script_artifact_is_fixed_text() {
        let artifact = formatting_script_artifact();
        assert_eq!(artifact.file_name, "formatear_hoja.gs");
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.starts_with("function onOpen(){"));
        assert!(text.contains("setFrozenRows(1)"));
    }

    #[test]
    fn print_sheet_numbers_entries() {
        let sheet = print_sheet(&["Uno".to_string(), "Dos\nlinea".to_string()]);
        assert_eq!(sheet, "  1. Uno\n  2. Dos\n     linea\n");
    }
}
