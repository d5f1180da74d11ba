use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ContabilError, Result};

/// Values below this magnitude are skipped, not persisted and not errors.
pub const VALUE_EPSILON: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Raw cells and rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }
}

/// One spreadsheet row. `line` is 1-based and matches the source file, so
/// audit entries point at the row a human would find.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn get(&self, col: usize) -> &Cell {
        self.cells.get(col).unwrap_or(&Cell::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

// ---------------------------------------------------------------------------
// Field mapping and the logical-key → column-index table
// ---------------------------------------------------------------------------

fn default_idconta() -> String {
    "idconta".to_string()
}
fn default_valor() -> String {
    "valor".to_string()
}
fn default_natureza() -> String {
    "natureza".to_string()
}
fn default_data() -> String {
    "data".to_string()
}
fn default_cnpj() -> String {
    "cnpj".to_string()
}
fn default_erp() -> String {
    "erp".to_string()
}
fn default_siglacr() -> String {
    "siglacr".to_string()
}
fn default_historico() -> String {
    "historico".to_string()
}

/// Logical field keys mapped to source column names. Loaded from a JSON file
/// via --mapping, otherwise the defaults match the standard export headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default = "default_idconta")]
    pub idconta: String,
    #[serde(default = "default_valor")]
    pub valor: String,
    #[serde(default = "default_natureza")]
    pub natureza: String,
    #[serde(default = "default_data")]
    pub data: String,
    #[serde(default = "default_cnpj")]
    pub cnpj: String,
    #[serde(default = "default_erp")]
    pub erp_code: String,
    #[serde(default = "default_siglacr")]
    pub siglacr: String,
    #[serde(default = "default_historico")]
    pub historico: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        FieldMapping {
            idconta: default_idconta(),
            valor: default_valor(),
            natureza: default_natureza(),
            data: default_data(),
            cnpj: default_cnpj(),
            erp_code: default_erp(),
            siglacr: default_siglacr(),
            historico: default_historico(),
        }
    }
}

impl FieldMapping {
    pub fn from_file(path: &Path) -> Result<FieldMapping> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ContabilError::Mapping(format!("{}: {e}", path.display())))
    }

    /// Pre-flight check: every required key must name a column; the company
    /// pair (cnpj, erp_code) requires at least one of the two.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("idconta", &self.idconta),
            ("valor", &self.valor),
            ("natureza", &self.natureza),
            ("data", &self.data),
            ("siglacr", &self.siglacr),
            ("historico", &self.historico),
        ];
        for (key, column) in required {
            if column.trim().is_empty() {
                return Err(ContabilError::Mapping(format!(
                    "campo obrigatório sem coluna: {key}"
                )));
            }
        }
        if self.cnpj.trim().is_empty() && self.erp_code.trim().is_empty() {
            return Err(ContabilError::Mapping(
                "informe a coluna de cnpj ou de código ERP".to_string(),
            ));
        }
        Ok(())
    }
}

/// Column mapping for the monthly trial-balance layout: one row per account
/// with one value column per month, month columns matched by canonical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceMapping {
    #[serde(default = "default_idconta")]
    pub idconta: String,
    #[serde(default = "default_cnpj")]
    pub cnpj: String,
    #[serde(default = "default_erp")]
    pub erp_code: String,
}

impl Default for BalanceMapping {
    fn default() -> Self {
        BalanceMapping {
            idconta: default_idconta(),
            cnpj: default_cnpj(),
            erp_code: default_erp(),
        }
    }
}

impl BalanceMapping {
    pub fn from_file(path: &Path) -> Result<BalanceMapping> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ContabilError::Mapping(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.idconta.trim().is_empty() {
            return Err(ContabilError::Mapping(
                "campo obrigatório sem coluna: idconta".to_string(),
            ));
        }
        if self.cnpj.trim().is_empty() && self.erp_code.trim().is_empty() {
            return Err(ContabilError::Mapping(
                "informe a coluna de cnpj ou de código ERP".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fold a header for matching: lowercase, Portuguese accents flattened,
/// everything outside [a-z0-9] removed.
pub fn normalize_header(header: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]").unwrap());

    let folded: String = header
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            _ => c,
        })
        .collect();
    re.replace_all(&folded, "").to_string()
}

/// Logical-key → column-index table, built once per import. Row accessors go
/// through this table; rows themselves stay positional.
pub struct ColumnMap {
    headers: Vec<String>,
}

impl ColumnMap {
    pub fn new(headers: &[String]) -> ColumnMap {
        ColumnMap {
            headers: headers.iter().map(|h| normalize_header(h)).collect(),
        }
    }

    pub fn find(&self, column_name: &str) -> Option<usize> {
        let wanted = normalize_header(column_name);
        if wanted.is_empty() {
            return None;
        }
        self.headers.iter().position(|h| *h == wanted)
    }

    /// Resolve a mapped column or fail pre-flight.
    pub fn require(&self, key: &str, column_name: &str) -> Result<usize> {
        self.find(column_name).ok_or_else(|| {
            ContabilError::Mapping(format!("coluna não encontrada para {key}: {column_name}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// Parse a monetary value. Numeric cells pass through; textual cells keep
/// only digits, comma, dot and minus, then apply the Latin locale rule:
/// comma-only means comma is the decimal separator, comma plus dot means dot
/// is a thousands separator. None means unparseable (an error upstream,
/// never a silent zero).
pub fn parse_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Empty => None,
        Cell::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            let has_comma = cleaned.contains(',');
            let has_dot = cleaned.contains('.');
            let normalized = if has_comma && !has_dot {
                cleaned.replace(',', ".")
            } else if has_comma && has_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned
            };
            normalized.parse::<f64>().ok().filter(|v| !v.is_nan())
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum DateParse {
    /// Cell absent or blank. Distinct audit message from Invalid.
    Missing,
    Invalid,
    Parsed(NaiveDate),
}

/// Excel epoch is 1899-12-30, accounting for the 1900 leap year bug.
/// Serials outside the spreadsheet date range (1 through 2958465, which is
/// 9999-12-31) are corrupt cells, not dates.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial as i64))
}

/// Numeric cells are spreadsheet date serials; textual cells have `/`
/// replaced with `-` and are tried against the usual calendar formats.
pub fn parse_date(cell: &Cell) -> DateParse {
    match cell {
        Cell::Empty => DateParse::Missing,
        Cell::Number(serial) => match excel_serial_to_date(*serial) {
            Some(date) => DateParse::Parsed(date),
            None => DateParse::Invalid,
        },
        Cell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return DateParse::Missing;
            }
            let normalized = trimmed.replace('/', "-");
            for format in ["%Y-%m-%d", "%d-%m-%Y"] {
                if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
                    return DateParse::Parsed(date);
                }
            }
            DateParse::Invalid
        }
    }
}

/// Stringify and trim a code cell. Numeric codes lose the float formatting
/// a spreadsheet gives them ("341101.0" is the code "341101").
pub fn normalize_code(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
    }
}

/// Strip everything that is not a digit.
pub fn normalize_cnpj(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Leading-zero strip, floored at "0" so a code never normalizes to empty.
pub fn strip_leading_zeros(code: &str) -> String {
    let stripped = code.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

// ---------------------------------------------------------------------------
// Entry-row normalization
// ---------------------------------------------------------------------------

/// Resolved column indices for the accounting-entry layout.
pub struct EntryColumns {
    pub idconta: usize,
    pub valor: usize,
    pub natureza: usize,
    pub data: usize,
    pub cnpj: Option<usize>,
    pub erp_code: Option<usize>,
    pub siglacr: usize,
    pub historico: usize,
}

impl EntryColumns {
    pub fn resolve(cols: &ColumnMap, mapping: &FieldMapping) -> Result<EntryColumns> {
        let optional = |name: &str| {
            if name.trim().is_empty() {
                None
            } else {
                cols.find(name)
            }
        };
        let cnpj = optional(&mapping.cnpj);
        let erp_code = optional(&mapping.erp_code);
        if cnpj.is_none() && erp_code.is_none() {
            return Err(ContabilError::Mapping(
                "nenhuma coluna de identificação de empresa (cnpj/erp) encontrada".to_string(),
            ));
        }
        Ok(EntryColumns {
            idconta: cols.require("idconta", &mapping.idconta)?,
            valor: cols.require("valor", &mapping.valor)?,
            natureza: cols.require("natureza", &mapping.natureza)?,
            data: cols.require("data", &mapping.data)?,
            cnpj,
            erp_code,
            siglacr: cols.require("siglacr", &mapping.siglacr)?,
            historico: cols.require("historico", &mapping.historico)?,
        })
    }
}

/// Typed, validated fields for one entry row, before resolution.
#[derive(Debug, Clone)]
pub struct NormalizedEntryRow {
    pub line: usize,
    pub cnpj: String,
    pub erp_code: String,
    pub account_code: String,
    pub cost_center_code: String,
    pub natureza: String,
    pub date: NaiveDate,
    pub value: f64,
    pub history: String,
}

#[derive(Debug)]
pub enum RowOutcome {
    /// Every cell blank: a warning, excluded from further processing.
    Empty,
    /// Value below the near-zero threshold: counted, never an error.
    Zero,
    /// Validation failure with a human-readable reason.
    Invalid(String),
    Ok(NormalizedEntryRow),
}

/// Convert one raw row into typed fields or a terminal skip/error decision.
/// Touches no index: resolution is the next stage's job.
pub fn normalize_entry_row(row: &RawRow, cols: &EntryColumns) -> RowOutcome {
    if row.is_empty() {
        return RowOutcome::Empty;
    }

    let value = match parse_value(row.get(cols.valor)) {
        Some(v) => v,
        None => return RowOutcome::Invalid("Valor inválido".to_string()),
    };
    if value.abs() < VALUE_EPSILON {
        return RowOutcome::Zero;
    }

    let date = match parse_date(row.get(cols.data)) {
        DateParse::Parsed(d) => d,
        DateParse::Missing => return RowOutcome::Invalid("Data ausente".to_string()),
        DateParse::Invalid => return RowOutcome::Invalid("Data inválida".to_string()),
    };

    let account_code = normalize_code(row.get(cols.idconta));
    if account_code.is_empty() {
        return RowOutcome::Invalid("Conta ausente".to_string());
    }

    let cost_center_code = normalize_code(row.get(cols.siglacr));
    if cost_center_code.is_empty() {
        return RowOutcome::Invalid("Centro de custo ausente".to_string());
    }

    let natureza = normalize_code(row.get(cols.natureza)).to_uppercase();
    let natureza = match natureza.chars().next() {
        Some('D') => "D".to_string(),
        Some('C') => "C".to_string(),
        _ => return RowOutcome::Invalid("Natureza inválida".to_string()),
    };

    let cnpj = cols
        .cnpj
        .map(|i| normalize_cnpj(&normalize_code(row.get(i))))
        .unwrap_or_default();
    let erp_code = cols
        .erp_code
        .map(|i| normalize_code(row.get(i)))
        .unwrap_or_default();
    if cnpj.is_empty() && erp_code.is_empty() {
        return RowOutcome::Invalid("Empresa ausente (cnpj/erp)".to_string());
    }

    let history = match row.get(cols.historico) {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => format!("{n}"),
        Cell::Empty => String::new(),
    };

    RowOutcome::Ok(NormalizedEntryRow {
        line: row.line,
        cnpj,
        erp_code,
        account_code,
        cost_center_code,
        natureza,
        date,
        value,
        history,
    })
}

// ---------------------------------------------------------------------------
// Sheet loading
// ---------------------------------------------------------------------------

pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub fn load_sheet(path: &Path) -> Result<Sheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => load_csv(path),
        #[cfg(feature = "xlsx")]
        "xlsx" | "xls" | "xlsm" => load_xlsx(path),
        _ => Err(ContabilError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}

fn load_csv(path: &Path) -> Result<Sheet> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        if i == 0 {
            headers = record.iter().map(|f| f.to_string()).collect();
            continue;
        }
        let cells = record
            .iter()
            .map(|f| {
                let trimmed = f.trim();
                if trimmed.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(trimmed.to_string())
                }
            })
            .collect();
        rows.push(RawRow { line: i + 1, cells });
    }
    Ok(Sheet { headers, rows })
}

#[cfg(feature = "xlsx")]
fn load_xlsx(path: &Path) -> Result<Sheet> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| ContabilError::Other(format!("Falha ao abrir XLSX: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ContabilError::Other("planilha vazia".to_string()))?
        .map_err(|e| ContabilError::Other(format!("Falha ao ler planilha: {e}")))?;

    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for (i, row) in range.rows().enumerate() {
        if i == 0 {
            headers = row
                .iter()
                .map(|c| match c {
                    Data::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            continue;
        }
        let cells = row
            .iter()
            .map(|c| match c {
                Data::Empty => Cell::Empty,
                Data::Float(f) => Cell::Number(*f),
                Data::Int(n) => Cell::Number(*n as f64),
                Data::String(s) => Cell::Text(s.clone()),
                Data::Bool(b) => Cell::Text(b.to_string()),
                Data::DateTime(dt) => Cell::Number(dt.as_f64()),
                Data::DateTimeIso(s) => Cell::Text(s.clone()),
                Data::DurationIso(s) => Cell::Text(s.clone()),
                Data::Error(_) => Cell::Empty,
            })
            .collect();
        rows.push(RawRow { line: i + 1, cells });
    }
    Ok(Sheet { headers, rows })
}
