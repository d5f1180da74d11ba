use std::io::Write;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Warning,
    Error,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Warning => "warning",
            AuditStatus::Error => "error",
        }
    }
}

/// One diagnostic record per problematic source row. Never persisted to the
/// main store; exported on demand only.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// 1-based, matching the source file.
    pub line: usize,
    pub status: AuditStatus,
    pub reason: String,
    pub cnpj: String,
    pub account_code: String,
    pub cost_center_code: String,
    pub company_found: bool,
    pub account_found: bool,
    pub cost_center_found: bool,
}

impl AuditEntry {
    /// Validation failure: no resolution was attempted.
    pub fn invalid(line: usize, reason: impl Into<String>) -> AuditEntry {
        AuditEntry {
            line,
            status: AuditStatus::Error,
            reason: reason.into(),
            cnpj: String::new(),
            account_code: String::new(),
            cost_center_code: String::new(),
            company_found: true,
            account_found: true,
            cost_center_found: true,
        }
    }

    pub fn warning(line: usize, reason: impl Into<String>) -> AuditEntry {
        AuditEntry {
            status: AuditStatus::Warning,
            ..AuditEntry::invalid(line, reason)
        }
    }
}

/// Cumulative counters for one import run. Conservation invariant:
/// success + zero_values + invalid_data == total_rows (monthly-balance runs
/// add account_not_found to the left-hand side).
#[derive(Debug, Default, Clone)]
pub struct ImportStats {
    pub total_rows: usize,
    pub success: usize,
    pub zero_values: usize,
    pub invalid_data: usize,
    pub company_not_found: usize,
    pub account_not_found: usize,
    pub cost_center_not_found: usize,
    pub deleted_records: usize,
}

// ---------------------------------------------------------------------------
// Audit log export: semicolon-delimited, summary block then row table
// ---------------------------------------------------------------------------

pub fn write_audit_log<W: Write>(
    mut w: W,
    stats: &ImportStats,
    entries: &[AuditEntry],
) -> Result<()> {
    writeln!(w, "Resumo da importação")?;
    writeln!(w, "Linhas no arquivo;{}", stats.total_rows)?;
    writeln!(w, "Sucesso;{}", stats.success)?;
    writeln!(w, "Valores zerados/vazios;{}", stats.zero_values)?;
    writeln!(w, "Dados inválidos;{}", stats.invalid_data)?;
    writeln!(w, "Empresa não encontrada;{}", stats.company_not_found)?;
    writeln!(w, "Conta não encontrada;{}", stats.account_not_found)?;
    writeln!(w, "Centro de custo não encontrado;{}", stats.cost_center_not_found)?;
    if stats.deleted_records > 0 {
        writeln!(w, "Registros substituídos;{}", stats.deleted_records)?;
    }
    writeln!(w)?;

    let mut csv = csv::WriterBuilder::new().delimiter(b';').from_writer(w);
    csv.write_record([
        "linha",
        "status",
        "motivo",
        "cnpj",
        "conta",
        "centro_custo",
        "empresa_ok",
        "conta_ok",
        "centro_custo_ok",
    ])?;
    for e in entries {
        csv.write_record([
            e.line.to_string(),
            e.status.as_str().to_string(),
            e.reason.clone(),
            e.cnpj.clone(),
            e.account_code.clone(),
            e.cost_center_code.clone(),
            e.company_found.to_string(),
            e.account_found.to_string(),
            e.cost_center_found.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn export_audit_log(path: &Path, stats: &ImportStats, entries: &[AuditEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_audit_log(std::io::BufWriter::new(file), stats, entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_log_format() {
        let stats = ImportStats {
            total_rows: 3,
            success: 1,
            zero_values: 1,
            invalid_data: 1,
            company_not_found: 1,
            ..Default::default()
        };
        let entries = vec![AuditEntry {
            line: 2,
            status: AuditStatus::Error,
            reason: "Empresa não encontrada (12345678000190)".to_string(),
            cnpj: "12345678000190".to_string(),
            account_code: "341101".to_string(),
            cost_center_code: "ADM".to_string(),
            company_found: false,
            account_found: true,
            cost_center_found: true,
        }];
        let mut buf = Vec::new();
        write_audit_log(&mut buf, &stats, &entries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Resumo da importação\n"));
        assert!(text.contains("Linhas no arquivo;3"));
        assert!(text.contains("linha;status;motivo"));
        assert!(text.contains("2;error;Empresa não encontrada (12345678000190)"));
    }

    #[test]
    fn test_audit_log_quotes_embedded_delimiters() {
        let stats = ImportStats::default();
        let entries = vec![AuditEntry::invalid(4, "motivo; com ponto e vírgula")];
        let mut buf = Vec::new();
        write_audit_log(&mut buf, &stats, &entries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"motivo; com ponto e vírgula\""));
    }
}
