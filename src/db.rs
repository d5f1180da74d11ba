use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::indexes::account_code_variants;
use crate::models::{
    Account, AccountingEntry, BalanceRow, Company, CostCenter, LineKind, Month, ReportLine, Tenant,
};
use crate::rows::{strip_leading_zeros, VALUE_EPSILON};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tenants (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    last_closed_year INTEGER,
    last_closed_month TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    cnpj TEXT,
    erp_code TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
);

CREATE TABLE IF NOT EXISTS cost_centers (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
);

CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    company_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    cost_center_id INTEGER NOT NULL,
    fiscal_year INTEGER NOT NULL,
    month TEXT NOT NULL,
    date TEXT NOT NULL,
    natureza TEXT NOT NULL,
    value REAL NOT NULL,
    history TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (tenant_id) REFERENCES tenants(id),
    FOREIGN KEY (company_id) REFERENCES companies(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (cost_center_id) REFERENCES cost_centers(id)
);

CREATE TABLE IF NOT EXISTS monthly_balances (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    company_id INTEGER NOT NULL,
    account_code TEXT NOT NULL,
    fiscal_year INTEGER NOT NULL,
    month TEXT NOT NULL,
    value REAL NOT NULL,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id),
    FOREIGN KEY (company_id) REFERENCES companies(id),
    UNIQUE (tenant_id, company_id, account_code, fiscal_year, month)
);

CREATE TABLE IF NOT EXISTS report_lines (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    line_type TEXT NOT NULL,
    sign INTEGER NOT NULL DEFAULT 1,
    parent_id INTEGER,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_base INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id),
    FOREIGN KEY (parent_id) REFERENCES report_lines(id)
);

CREATE TABLE IF NOT EXISTS account_mappings (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    report_line_id INTEGER NOT NULL,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (report_line_id) REFERENCES report_lines(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    import_kind TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT,
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

pub fn add_tenant(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO tenants (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_tenant(conn: &Connection, name: &str) -> Result<Option<Tenant>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, last_closed_year, last_closed_month FROM tenants WHERE name = ?1",
    )?;
    let tenant = stmt
        .query_row([name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i32>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .map(|(id, name, year, month)| Tenant {
            id,
            name,
            last_closed_year: year,
            last_closed_month: month.as_deref().and_then(Month::parse),
        });
    match tenant {
        Ok(t) => Ok(Some(t)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_tenants(conn: &Connection) -> Result<Vec<Tenant>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, last_closed_year, last_closed_month FROM tenants ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<i32>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, name, year, month) = row?;
        out.push(Tenant {
            id,
            name,
            last_closed_year: year,
            last_closed_month: month.as_deref().and_then(Month::parse),
        });
    }
    Ok(out)
}

pub fn set_closing_lock(conn: &Connection, tenant_id: i64, year: i32, month: Month) -> Result<()> {
    conn.execute(
        "UPDATE tenants SET last_closed_year = ?1, last_closed_month = ?2 WHERE id = ?3",
        rusqlite::params![year, month.name(), tenant_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

pub fn add_company(
    conn: &Connection,
    tenant_id: i64,
    name: &str,
    cnpj: Option<&str>,
    erp_code: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO companies (tenant_id, name, cnpj, erp_code) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![tenant_id, name, cnpj, erp_code],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn add_account(conn: &Connection, tenant_id: i64, code: &str, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (tenant_id, code, name) VALUES (?1, ?2, ?3)",
        rusqlite::params![tenant_id, code, name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn add_cost_center(conn: &Connection, tenant_id: i64, code: &str, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO cost_centers (tenant_id, code, name) VALUES (?1, ?2, ?3)",
        rusqlite::params![tenant_id, code, name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct ReferenceCollections {
    pub companies: Vec<Company>,
    pub accounts: Vec<Account>,
    pub cost_centers: Vec<CostCenter>,
}

/// Load all reference records for one tenant. No pagination: the reference
/// index assumes full in-memory collections.
pub fn load_reference_collections(conn: &Connection, tenant_id: i64) -> Result<ReferenceCollections> {
    let mut stmt =
        conn.prepare("SELECT id, name, cnpj, erp_code FROM companies WHERE tenant_id = ?1")?;
    let companies = stmt
        .query_map([tenant_id], |row| {
            Ok(Company {
                id: row.get(0)?,
                name: row.get(1)?,
                cnpj: row.get(2)?,
                erp_code: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT id, code, name FROM accounts WHERE tenant_id = ?1")?;
    let accounts = stmt
        .query_map([tenant_id], |row| {
            Ok(Account {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT id, code, name FROM cost_centers WHERE tenant_id = ?1")?;
    let cost_centers = stmt
        .query_map([tenant_id], |row| {
            Ok(CostCenter {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ReferenceCollections {
        companies,
        accounts,
        cost_centers,
    })
}

pub fn list_companies(conn: &Connection, tenant_id: i64) -> Result<Vec<Company>> {
    Ok(load_reference_collections(conn, tenant_id)?.companies)
}

pub fn list_accounts(conn: &Connection, tenant_id: i64) -> Result<Vec<Account>> {
    Ok(load_reference_collections(conn, tenant_id)?.accounts)
}

pub fn list_cost_centers(conn: &Connection, tenant_id: i64) -> Result<Vec<CostCenter>> {
    Ok(load_reference_collections(conn, tenant_id)?.cost_centers)
}

// ---------------------------------------------------------------------------
// Report lines & account mappings
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn add_report_line(
    conn: &Connection,
    tenant_id: i64,
    name: &str,
    kind: LineKind,
    sign: i64,
    parent_id: Option<i64>,
    display_order: i64,
    is_base: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO report_lines (tenant_id, name, line_type, sign, parent_id, display_order, is_base) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![tenant_id, name, kind.as_str(), sign, parent_id, display_order, is_base],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_report_lines(conn: &Connection, tenant_id: i64) -> Result<Vec<ReportLine>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, line_type, sign, parent_id, display_order, is_base \
         FROM report_lines WHERE tenant_id = ?1 ORDER BY display_order, id",
    )?;
    let rows = stmt.query_map([tenant_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, Option<i64>>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, bool>(6)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, name, line_type, sign, parent_id, display_order, is_base) = row?;
        out.push(ReportLine {
            id,
            name,
            kind: LineKind::parse(&line_type).unwrap_or(LineKind::Header),
            sign,
            parent_id,
            display_order,
            is_base,
        });
    }
    Ok(out)
}

pub fn map_account(conn: &Connection, tenant_id: i64, account_id: i64, line_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO account_mappings (tenant_id, account_id, report_line_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![tenant_id, account_id, line_id],
    )?;
    Ok(())
}

/// Account-id → report-line-ids multimap, queried once per aggregation call.
pub fn load_account_mappings(conn: &Connection, tenant_id: i64) -> Result<HashMap<i64, Vec<i64>>> {
    let mut stmt = conn.prepare(
        "SELECT account_id, report_line_id FROM account_mappings WHERE tenant_id = ?1",
    )?;
    let rows = stmt.query_map([tenant_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        let (account_id, line_id) = row?;
        map.entry(account_id).or_default().push(line_id);
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Entry sink (all-or-nothing per batch)
// ---------------------------------------------------------------------------

pub fn bulk_save_entries(
    conn: &Connection,
    tenant_id: i64,
    entries: &[AccountingEntry],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO entries (tenant_id, company_id, account_id, cost_center_id, \
             fiscal_year, month, date, natureza, value, history) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for e in entries {
            stmt.execute(rusqlite::params![
                tenant_id,
                e.company_id,
                e.account_id,
                e.cost_center_id,
                e.fiscal_year,
                e.month.name(),
                e.date,
                e.natureza,
                e.value,
                e.history,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Balance sink: resolves account codes itself and reports per-batch stats
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BalanceBatchStats {
    pub success: usize,
    pub account_not_found: usize,
    pub zero_values: usize,
    pub deleted_records: usize,
    /// (index into the submitted batch, raw account code) per unresolved row.
    pub account_errors: Vec<(usize, String)>,
}

/// Account-code → id lookup with the same padding tolerance the reference
/// index uses. Both the balance sink and the statement loader resolve through
/// this table, so a code the sink accepted always resolves again at read time.
fn account_variant_lookup(conn: &Connection, tenant_id: i64) -> Result<HashMap<String, i64>> {
    let mut by_code: HashMap<String, i64> = HashMap::new();
    let mut stmt = conn.prepare("SELECT id, code FROM accounts WHERE tenant_id = ?1")?;
    let accounts = stmt.query_map([tenant_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for acc in accounts {
        let (id, code) = acc?;
        for variant in account_code_variants(code.trim()) {
            by_code.insert(variant, id);
        }
    }
    Ok(by_code)
}

/// Upsert monthly balances. Account-code resolution happens here, not in the
/// caller: codes are matched against the tenant's chart with the same
/// zero-padding tolerance the entry index uses. Replaced rows are reported as
/// deleted_records.
pub fn bulk_save_balances(
    conn: &Connection,
    tenant_id: i64,
    rows: &[BalanceRow],
) -> Result<BalanceBatchStats> {
    let by_code = account_variant_lookup(conn, tenant_id)?;

    let mut stats = BalanceBatchStats::default();
    let tx = conn.unchecked_transaction()?;
    {
        let mut exists_stmt = tx.prepare_cached(
            "SELECT 1 FROM monthly_balances WHERE tenant_id = ?1 AND company_id = ?2 \
             AND account_code = ?3 AND fiscal_year = ?4 AND month = ?5",
        )?;
        let mut upsert_stmt = tx.prepare_cached(
            "INSERT INTO monthly_balances (tenant_id, company_id, account_code, fiscal_year, month, value) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT (tenant_id, company_id, account_code, fiscal_year, month) \
             DO UPDATE SET value = excluded.value",
        )?;
        for (i, row) in rows.iter().enumerate() {
            if row.value.abs() < VALUE_EPSILON {
                stats.zero_values += 1;
                continue;
            }
            let code = row.account_code.trim();
            let resolved = by_code
                .get(code)
                .or_else(|| by_code.get(strip_leading_zeros(code).as_str()));
            if resolved.is_none() {
                stats.account_not_found += 1;
                stats.account_errors.push((i, code.to_string()));
                continue;
            }
            let replaced = exists_stmt.exists(rusqlite::params![
                tenant_id,
                row.company_id,
                code,
                row.fiscal_year,
                row.month.name(),
            ])?;
            if replaced {
                stats.deleted_records += 1;
            }
            upsert_stmt.execute(rusqlite::params![
                tenant_id,
                row.company_id,
                code,
                row.fiscal_year,
                row.month.name(),
                row.value,
            ])?;
            stats.success += 1;
        }
    }
    tx.commit()?;
    Ok(stats)
}

/// Balances resolved against the chart at read time: (account_id, year,
/// month, value). Codes are stored raw, so resolution applies the same
/// variant tolerance the sink used to accept them; rows whose code no longer
/// matches an account are dropped here, not errored.
pub fn load_balances_for_statement(
    conn: &Connection,
    tenant_id: i64,
    years: &[i32],
) -> Result<Vec<(i64, i32, String, f64)>> {
    let by_code = account_variant_lookup(conn, tenant_id)?;

    let mut out = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT account_code, fiscal_year, month, value \
         FROM monthly_balances WHERE tenant_id = ?1 AND fiscal_year = ?2",
    )?;
    for year in years {
        let rows = stmt.query_map(rusqlite::params![tenant_id, year], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;
        for row in rows {
            let (code, fiscal_year, month, value) = row?;
            let code = code.trim();
            let resolved = by_code
                .get(code)
                .or_else(|| by_code.get(strip_leading_zeros(code).as_str()));
            if let Some(&account_id) = resolved {
                out.push((account_id, fiscal_year, month, value));
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tenant status
// ---------------------------------------------------------------------------

pub struct TenantStatus {
    pub companies: i64,
    pub accounts: i64,
    pub cost_centers: i64,
    pub entries: i64,
    pub balances: i64,
    pub report_lines: i64,
    pub imports: i64,
}

pub fn tenant_status(conn: &Connection, tenant_id: i64) -> Result<TenantStatus> {
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(
            &format!("SELECT count(*) FROM {table} WHERE tenant_id = ?1"),
            [tenant_id],
            |r| r.get(0),
        )?)
    };
    Ok(TenantStatus {
        companies: count("companies")?,
        accounts: count("accounts")?,
        cost_centers: count("cost_centers")?,
        entries: count("entries")?,
        balances: count("monthly_balances")?,
        report_lines: count("report_lines")?,
        imports: count("imports")?,
    })
}

// ---------------------------------------------------------------------------
// Import checksum registry
// ---------------------------------------------------------------------------

pub fn is_duplicate_import(conn: &Connection, tenant_id: i64, checksum: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM imports WHERE tenant_id = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![tenant_id, checksum])?)
}

pub fn record_import(
    conn: &Connection,
    tenant_id: i64,
    filename: &str,
    kind: &str,
    record_count: usize,
    checksum: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO imports (tenant_id, filename, import_kind, record_count, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![tenant_id, filename, kind, record_count as i64, checksum],
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
