use std::collections::HashMap;

use comfy_table::{Cell, Table};

use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::{ContabilError, Result};
use crate::models::LineKind;
use crate::settings::db_path;

#[allow(clippy::too_many_arguments)]
pub fn add(
    name: &str,
    kind: &str,
    sign: i64,
    parent: Option<i64>,
    order: i64,
    base: bool,
    tenant: Option<&str>,
) -> Result<()> {
    let kind = LineKind::parse(kind).ok_or_else(|| {
        ContabilError::Other(format!(
            "invalid line kind '{kind}' (expected data_bucket, header or total)"
        ))
    })?;
    if sign != 1 && sign != -1 {
        return Err(ContabilError::Other(format!(
            "invalid sign {sign} (expected 1 or -1)"
        )));
    }

    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    if let Some(parent_id) = parent {
        let lines = db::list_report_lines(&conn, t.id)?;
        if !lines.iter().any(|l| l.id == parent_id) {
            return Err(ContabilError::UnknownReportLine(parent_id.to_string()));
        }
    }
    let id = db::add_report_line(&conn, t.id, name, kind, sign, parent, order, base)?;
    println!("Added report line '{name}' (id {id})");
    Ok(())
}

pub fn list(tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    let lines = db::list_report_lines(&conn, t.id)?;
    if lines.is_empty() {
        println!("No report lines for tenant '{}'.", t.name);
        return Ok(());
    }

    // Depth by walking parent links; list_report_lines orders parents before
    // siblings only within one level, so resolve depth per line instead.
    let parents: HashMap<i64, Option<i64>> = lines.iter().map(|l| (l.id, l.parent_id)).collect();
    let depth = |mut id: i64| {
        let mut d = 0usize;
        while let Some(Some(parent)) = parents.get(&id) {
            d += 1;
            id = *parent;
            if d > parents.len() {
                break; // cycle in hand-edited data
            }
        }
        d
    };

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Kind", "Sign", "Order", "Base"]);
    for l in &lines {
        table.add_row(vec![
            Cell::new(l.id),
            Cell::new(format!("{}{}", "  ".repeat(depth(l.id)), l.name)),
            Cell::new(l.kind.as_str()),
            Cell::new(l.sign),
            Cell::new(l.display_order),
            Cell::new(if l.is_base { "*" } else { "" }),
        ]);
    }
    println!("Report lines ({})\n{table}", t.name);
    Ok(())
}

pub fn map(account_code: &str, line_id: i64, tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;

    let accounts = db::list_accounts(&conn, t.id)?;
    let account = accounts
        .iter()
        .find(|a| a.code == account_code)
        .ok_or_else(|| ContabilError::UnknownAccount(account_code.to_string()))?;
    let lines = db::list_report_lines(&conn, t.id)?;
    let line = lines
        .iter()
        .find(|l| l.id == line_id)
        .ok_or_else(|| ContabilError::UnknownReportLine(line_id.to_string()))?;

    db::map_account(&conn, t.id, account.id, line.id)?;
    println!("Mapped account {account_code} to line '{}'", line.name);
    Ok(())
}
