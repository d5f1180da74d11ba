use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::analysis::{horizontal_analysis, vertical_analysis, visible_periods};
use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::{ContabilError, Result};
use crate::fmt::{money, pct};
use crate::models::{LineKind, Month, Period, Role};
use crate::settings::db_path;
use crate::statement::build_statement;

pub fn dre(
    years: &[i32],
    role: &str,
    vertical: bool,
    horizontal: bool,
    tenant: Option<&str>,
) -> Result<()> {
    let role = Role::parse(role)
        .ok_or_else(|| ContabilError::Other(format!("unknown role '{role}'")))?;
    let years: Vec<i32> = if years.is_empty() {
        vec![chrono::Datelike::year(&chrono::Local::now().date_naive())]
    } else {
        years.to_vec()
    };

    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;

    let lines = db::list_report_lines(&conn, t.id)?;
    if lines.is_empty() {
        println!("No report lines for tenant '{}'.", t.name);
        return Ok(());
    }
    let mappings = db::load_account_mappings(&conn, t.id)?;
    let balances = db::load_balances_for_statement(&conn, t.id, &years)?;
    let stmt = build_statement(&lines, &mappings, &balances, &years);

    let candidates: Vec<Period> = balances
        .iter()
        .filter_map(|(_, year, month, _)| Month::parse(month).map(|m| Period::new(*year, m)))
        .collect();
    let lock = t
        .last_closed_year
        .zip(t.last_closed_month)
        .map(|(year, month)| Period::new(year, month));
    let periods = visible_periods(&candidates, role, lock);
    if periods.is_empty() {
        println!("No visible periods for tenant '{}'.", t.name);
        return Ok(());
    }

    let va = vertical.then(|| vertical_analysis(&stmt, &periods));
    let ha = horizontal.then(|| horizontal_analysis(&stmt, &periods));

    let mut table = Table::new();
    let mut header = vec![Cell::new("Line")];
    for p in &periods {
        header.push(Cell::new(p.to_string()));
        if vertical {
            header.push(Cell::new("AV%"));
        }
        if horizontal {
            header.push(Cell::new("AH%"));
        }
    }
    table.set_header(header);

    for line in &stmt.lines {
        let name = format!("{}{}", "  ".repeat(line.depth), line.name);
        let name = match line.kind {
            LineKind::Total => name.bold().to_string(),
            LineKind::Header => name,
            LineKind::DataBucket => name,
        };
        let mut row = vec![Cell::new(name)];
        for (i, p) in periods.iter().enumerate() {
            let value = line.effective(*p);
            let shown = if value < 0.0 {
                money(value).red().to_string()
            } else {
                money(value)
            };
            row.push(Cell::new(shown));
            if let Some(va) = &va {
                row.push(Cell::new(pct(va.get(&line.id).and_then(|cells| cells[i]))));
            }
            if let Some(ha) = &ha {
                row.push(Cell::new(pct(ha.get(&line.id).and_then(|cells| cells[i]))));
            }
        }
        table.add_row(row);
    }

    println!("DRE ({})\n{table}", t.name);
    Ok(())
}
