use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::audit::{AuditEntry, ImportStats};
use crate::db;
use crate::error::Result;
use crate::indexes::ReferenceIndex;
use crate::models::{BalanceRow, Month, ALL_MONTHS};
use crate::resolver::resolve_entry;
use crate::rows::{
    load_sheet, normalize_cnpj, normalize_code, normalize_entry_row, parse_value, BalanceMapping,
    ColumnMap, EntryColumns, FieldMapping, RowOutcome,
};

/// Batch sizes are tunables, not contracts. Batches run strictly in order;
/// the progress callback between them is the cooperative yield point.
pub const ENTRY_BATCH_SIZE: usize = 5000;
pub const BALANCE_BATCH_SIZE: usize = 3000;

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

pub struct ImportOutcome {
    pub stats: ImportStats,
    pub audit: Vec<AuditEntry>,
    pub duplicate_file: bool,
}

impl ImportOutcome {
    fn duplicate() -> ImportOutcome {
        ImportOutcome {
            stats: ImportStats::default(),
            audit: Vec::new(),
            duplicate_file: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Accounting entries
// ---------------------------------------------------------------------------

/// Stream an entry spreadsheet in fixed-size batches. Row-level problems are
/// counted and logged, never fatal; a sink failure aborts the run and leaves
/// prior batches committed.
pub fn import_entries(
    conn: &Connection,
    tenant_id: i64,
    file_path: &Path,
    mapping: &FieldMapping,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<ImportOutcome> {
    mapping.validate()?;

    let checksum = compute_checksum(file_path)?;
    if db::is_duplicate_import(conn, tenant_id, &checksum)? {
        return Ok(ImportOutcome::duplicate());
    }

    let sheet = load_sheet(file_path)?;
    let cols = ColumnMap::new(&sheet.headers);
    let entry_cols = EntryColumns::resolve(&cols, mapping)?;

    let refs = db::load_reference_collections(conn, tenant_id)?;
    let index = ReferenceIndex::build(&refs.companies, &refs.accounts, &refs.cost_centers);

    let mut stats = ImportStats::default();
    let mut audit = Vec::new();
    let total = sheet.rows.len();
    let mut processed = 0usize;

    for chunk in sheet.rows.chunks(ENTRY_BATCH_SIZE) {
        let mut batch = Vec::new();
        for row in chunk {
            stats.total_rows += 1;
            match normalize_entry_row(row, &entry_cols) {
                RowOutcome::Empty => {
                    stats.zero_values += 1;
                    audit.push(AuditEntry::warning(row.line, "Linha vazia"));
                }
                RowOutcome::Zero => {
                    stats.zero_values += 1;
                    audit.push(AuditEntry::warning(row.line, "Valor zerado"));
                }
                RowOutcome::Invalid(reason) => {
                    stats.invalid_data += 1;
                    audit.push(AuditEntry::invalid(row.line, reason));
                }
                RowOutcome::Ok(normalized) => {
                    if let Some(entry) = resolve_entry(&normalized, &index, &mut stats, &mut audit)
                    {
                        batch.push(entry);
                    }
                }
            }
        }
        if !batch.is_empty() {
            // Not caught here: a sink failure aborts the whole run.
            db::bulk_save_entries(conn, tenant_id, &batch)?;
        }
        processed += chunk.len();
        on_progress(processed, total);
    }

    db::record_import(
        conn,
        tenant_id,
        file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
        "entries",
        stats.success,
        &checksum,
    )?;

    Ok(ImportOutcome {
        stats,
        audit,
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// Monthly balances
// ---------------------------------------------------------------------------

/// Stream a trial-balance spreadsheet. Each present (row, month-column) cell
/// is one counted unit, so one sheet row can contribute to several periods.
/// Company resolution happens here; account-code resolution happens inside
/// the balance sink, which returns its own per-batch stats to merge.
pub fn import_balances(
    conn: &Connection,
    tenant_id: i64,
    file_path: &Path,
    mapping: &BalanceMapping,
    year: i32,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<ImportOutcome> {
    mapping.validate()?;

    let checksum = compute_checksum(file_path)?;
    if db::is_duplicate_import(conn, tenant_id, &checksum)? {
        return Ok(ImportOutcome::duplicate());
    }

    let sheet = load_sheet(file_path)?;
    let cols = ColumnMap::new(&sheet.headers);
    let idconta_col = cols.require("idconta", &mapping.idconta)?;
    let cnpj_col = if mapping.cnpj.trim().is_empty() { None } else { cols.find(&mapping.cnpj) };
    let erp_col = if mapping.erp_code.trim().is_empty() { None } else { cols.find(&mapping.erp_code) };
    if cnpj_col.is_none() && erp_col.is_none() {
        return Err(crate::error::ContabilError::Mapping(
            "nenhuma coluna de identificação de empresa (cnpj/erp) encontrada".to_string(),
        ));
    }
    let month_cols: Vec<(Month, usize)> = ALL_MONTHS
        .iter()
        .filter_map(|m| cols.find(m.name()).map(|i| (*m, i)))
        .collect();
    if month_cols.is_empty() {
        return Err(crate::error::ContabilError::Mapping(
            "nenhuma coluna de mês encontrada no cabeçalho".to_string(),
        ));
    }

    let refs = db::load_reference_collections(conn, tenant_id)?;
    let index = ReferenceIndex::build(&refs.companies, &refs.accounts, &refs.cost_centers);

    let mut stats = ImportStats::default();
    let mut audit = Vec::new();
    let total = sheet.rows.len();
    let mut processed = 0usize;

    for chunk in sheet.rows.chunks(BALANCE_BATCH_SIZE) {
        let mut batch: Vec<BalanceRow> = Vec::new();
        let mut batch_lines: Vec<usize> = Vec::new();

        for row in chunk {
            if row.is_empty() {
                stats.total_rows += 1;
                stats.zero_values += 1;
                audit.push(AuditEntry::warning(row.line, "Linha vazia"));
                continue;
            }

            let cnpj = cnpj_col
                .map(|i| normalize_cnpj(&normalize_code(row.get(i))))
                .unwrap_or_default();
            let erp = erp_col.map(|i| normalize_code(row.get(i))).unwrap_or_default();
            let company_id = if !cnpj.is_empty() {
                index.company_by_cnpj(&cnpj).or_else(|| index.company_by_erp(&erp))
            } else {
                index.company_by_erp(&erp)
            };
            let Some(company_id) = company_id else {
                stats.total_rows += 1;
                stats.invalid_data += 1;
                stats.company_not_found += 1;
                let shown = if cnpj.is_empty() { &erp } else { &cnpj };
                let mut entry =
                    AuditEntry::invalid(row.line, format!("Empresa não encontrada ({shown})"));
                entry.cnpj = cnpj.clone();
                entry.company_found = false;
                audit.push(entry);
                continue;
            };

            let account_code = normalize_code(row.get(idconta_col));
            if account_code.is_empty() {
                stats.total_rows += 1;
                stats.invalid_data += 1;
                audit.push(AuditEntry::invalid(row.line, "Conta ausente"));
                continue;
            }

            for (month, col) in &month_cols {
                let cell = row.get(*col);
                stats.total_rows += 1;
                if cell.is_blank() {
                    stats.zero_values += 1;
                    continue;
                }
                let Some(value) = parse_value(cell) else {
                    stats.invalid_data += 1;
                    let mut entry = AuditEntry::invalid(
                        row.line,
                        format!("Valor inválido ({})", month.name()),
                    );
                    entry.account_code = account_code.clone();
                    audit.push(entry);
                    continue;
                };
                // Near-zero values are the sink's call to skip and count.
                batch.push(BalanceRow {
                    company_id,
                    account_code: account_code.clone(),
                    fiscal_year: year,
                    month: *month,
                    value,
                });
                batch_lines.push(row.line);
            }
        }

        if !batch.is_empty() {
            let batch_stats = db::bulk_save_balances(conn, tenant_id, &batch)?;
            stats.success += batch_stats.success;
            stats.zero_values += batch_stats.zero_values;
            stats.account_not_found += batch_stats.account_not_found;
            stats.deleted_records += batch_stats.deleted_records;
            for (idx, code) in batch_stats.account_errors {
                let mut entry = AuditEntry::invalid(
                    batch_lines[idx],
                    format!("Conta não encontrada ({code})"),
                );
                entry.account_code = code;
                entry.account_found = false;
                audit.push(entry);
            }
        }
        processed += chunk.len();
        on_progress(processed, total);
    }

    db::record_import(
        conn,
        tenant_id,
        file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
        "balances",
        stats.success,
        &checksum,
    )?;

    Ok(ImportOutcome {
        stats,
        audit,
        duplicate_file: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditStatus;
    use crate::db::test_db;

    fn seed_refs(conn: &Connection) -> i64 {
        let t = db::add_tenant(conn, "matriz").unwrap();
        db::add_company(conn, t, "Alfa", Some("12.345.678/0001-90"), Some("A01")).unwrap();
        db::add_account(conn, t, "341101", "Receita de serviços").unwrap();
        db::add_account(conn, t, "451020", "Despesa administrativa").unwrap();
        db::add_cost_center(conn, t, "ADM", "Administrativo").unwrap();
        t
    }

    fn write_entries_csv(dir: &Path, name: &str, body: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut content =
            String::from("cnpj,erp,idconta,siglacr,data,natureza,valor,historico\n");
        for line in body {
            content.push_str(line);
            content.push('\n');
        }
        std::fs::write(&path, &content).unwrap();
        path
    }

    #[test]
    fn test_import_entries_end_to_end() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = write_entries_csv(
            dir.path(),
            "lanc.csv",
            &[
                "12.345.678/0001-90,,341101,ADM,15/01/2024,D,\"1.234,56\",Receita",
                "12345678000190,,451020,ADM,20/01/2024,C,\"-200,00\",Despesa",
                ",,,,,,,",                                            // empty row
                "12345678000190,,341101,ADM,21/01/2024,D,\"0,00\",Zerado", // zero skip
                "12345678000190,,999999,ADM,22/01/2024,D,\"10,00\",Conta errada",
                "12345678000190,,341101,ADM,,D,\"10,00\",Sem data",
            ],
        );
        let mut progress = Vec::new();
        let outcome = import_entries(&conn, t, &path, &FieldMapping::default(), &mut |p, tot| {
            progress.push((p, tot))
        })
        .unwrap();

        let s = &outcome.stats;
        assert_eq!(s.total_rows, 6);
        assert_eq!(s.success, 2);
        assert_eq!(s.zero_values, 2);
        assert_eq!(s.invalid_data, 2);
        assert_eq!(s.account_not_found, 1);
        assert_eq!(s.success + s.zero_values + s.invalid_data, s.total_rows);
        assert_eq!(progress, vec![(6, 6)]);

        let count: i64 = conn
            .query_row("SELECT count(*) FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
        let value: f64 = conn
            .query_row("SELECT value FROM entries WHERE account_id = (SELECT id FROM accounts WHERE code='341101')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(value, 1234.56);
    }

    #[test]
    fn test_import_entries_audit_lines_match_source() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = write_entries_csv(
            dir.path(),
            "lanc.csv",
            &[
                "12345678000190,,341101,ADM,15/01/2024,D,\"10,00\",ok",
                "12345678000190,,999999,XX,16/01/2024,D,\"10,00\",ruim",
            ],
        );
        let outcome =
            import_entries(&conn, t, &path, &FieldMapping::default(), &mut |_, _| {}).unwrap();
        assert_eq!(outcome.audit.len(), 1);
        let e = &outcome.audit[0];
        // Header is line 1, first data row is line 2.
        assert_eq!(e.line, 3);
        assert_eq!(e.status, AuditStatus::Error);
        assert!(e.reason.contains("Conta não encontrada (999999)"));
        assert!(e.reason.contains("Centro de custo não encontrado (XX)"));
        assert_eq!(outcome.stats.invalid_data, 1);
        assert_eq!(outcome.stats.account_not_found, 1);
        assert_eq!(outcome.stats.cost_center_not_found, 1);
    }

    #[test]
    fn test_import_entries_duplicate_file_is_refused() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = write_entries_csv(
            dir.path(),
            "lanc.csv",
            &["12345678000190,,341101,ADM,15/01/2024,D,\"10,00\",ok"],
        );
        let first =
            import_entries(&conn, t, &path, &FieldMapping::default(), &mut |_, _| {}).unwrap();
        assert!(!first.duplicate_file);
        let second =
            import_entries(&conn, t, &path, &FieldMapping::default(), &mut |_, _| {}).unwrap();
        assert!(second.duplicate_file);
        assert_eq!(second.stats.total_rows, 0);
    }

    #[test]
    fn test_import_entries_partial_failure_batches_only_successes() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = write_entries_csv(
            dir.path(),
            "lanc.csv",
            &[
                "12345678000190,,341101,ADM,15/01/2024,D,\"10,00\",um",
                "12345678000190,,341101,ADM,xx/yy/zzzz,D,\"10,00\",quebrada",
                "12345678000190,,451020,ADM,17/01/2024,C,\"20,00\",dois",
            ],
        );
        let outcome =
            import_entries(&conn, t, &path, &FieldMapping::default(), &mut |_, _| {}).unwrap();
        assert_eq!(outcome.stats.success, 2);
        assert_eq!(outcome.stats.invalid_data, 1);
        let count: i64 = conn
            .query_row("SELECT count(*) FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_import_entries_preflight_rejects_bad_mapping() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = write_entries_csv(dir.path(), "lanc.csv", &[]);
        let mut mapping = FieldMapping::default();
        mapping.valor = "coluna_inexistente".to_string();
        let result = import_entries(&conn, t, &path, &mapping, &mut |_, _| {});
        assert!(result.is_err());
        // No partial state: nothing recorded for the refused run.
        let imports: i64 = conn
            .query_row("SELECT count(*) FROM imports", [], |r| r.get(0))
            .unwrap();
        assert_eq!(imports, 0);
    }

    fn write_balances_csv(dir: &Path, name: &str, body: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut content = String::from("cnpj,idconta,JANEIRO,FEVEREIRO\n");
        for line in body {
            content.push_str(line);
            content.push('\n');
        }
        std::fs::write(&path, &content).unwrap();
        path
    }

    #[test]
    fn test_import_balances_counts_per_period_value() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = write_balances_csv(
            dir.path(),
            "bal.csv",
            &[
                "12345678000190,341101,\"1.000,00\",\"2.000,00\"",
                "12345678000190,999999,\"50,00\",",
                "99999999999999,341101,\"10,00\",\"10,00\"",
            ],
        );
        let outcome = import_balances(
            &conn,
            t,
            &path,
            &BalanceMapping::default(),
            2024,
            &mut |_, _| {},
        )
        .unwrap();
        let s = &outcome.stats;
        // Row 1: two period values (success). Row 2: one value (account not
        // found) + one blank (zero). Row 3: one unit for the company failure.
        assert_eq!(s.success, 2);
        assert_eq!(s.account_not_found, 1);
        assert_eq!(s.zero_values, 1);
        assert_eq!(s.invalid_data, 1);
        assert_eq!(s.company_not_found, 1);
        assert_eq!(
            s.success + s.account_not_found + s.zero_values + s.invalid_data,
            s.total_rows
        );
        let count: i64 = conn
            .query_row("SELECT count(*) FROM monthly_balances", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_import_balances_upsert_tracks_replacements() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let p1 = write_balances_csv(dir.path(), "b1.csv", &["12345678000190,341101,\"1.000,00\","]);
        let p2 = write_balances_csv(dir.path(), "b2.csv", &["12345678000190,341101,\"3.000,00\",x"]);
        import_balances(&conn, t, &p1, &BalanceMapping::default(), 2024, &mut |_, _| {}).unwrap();
        let outcome =
            import_balances(&conn, t, &p2, &BalanceMapping::default(), 2024, &mut |_, _| {})
                .unwrap();
        assert_eq!(outcome.stats.deleted_records, 1);
        assert_eq!(outcome.stats.invalid_data, 1); // the "x" cell
        let value: f64 = conn
            .query_row(
                "SELECT value FROM monthly_balances WHERE month = 'JANEIRO'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(value, 3000.0);
    }

    #[test]
    fn test_import_balances_requires_month_columns() {
        let (dir, conn) = test_db();
        let t = seed_refs(&conn);
        let path = dir.path().join("sem_mes.csv");
        std::fs::write(&path, "cnpj,idconta\n12345678000190,341101\n").unwrap();
        let result = import_balances(
            &conn,
            t,
            &path,
            &BalanceMapping::default(),
            2024,
            &mut |_, _| {},
        );
        assert!(result.is_err());
    }
}
