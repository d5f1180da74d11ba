use comfy_table::{Cell, Table};

use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn run(tenant: Option<&str>) -> Result<()> {
    let path = db_path();
    let conn = get_connection(&path)?;
    let t = resolve_tenant(&conn, tenant)?;
    let status = db::tenant_status(&conn, t.id)?;
    println!("Database: {}", path.display());

    let mut table = Table::new();
    table.set_header(vec!["Records", "Count"]);
    table.add_row(vec![Cell::new("Companies"), Cell::new(status.companies)]);
    table.add_row(vec![Cell::new("Accounts"), Cell::new(status.accounts)]);
    table.add_row(vec![Cell::new("Cost centers"), Cell::new(status.cost_centers)]);
    table.add_row(vec![Cell::new("Entries"), Cell::new(status.entries)]);
    table.add_row(vec![Cell::new("Monthly balances"), Cell::new(status.balances)]);
    table.add_row(vec![Cell::new("Report lines"), Cell::new(status.report_lines)]);
    table.add_row(vec![Cell::new("Imports"), Cell::new(status.imports)]);
    println!("Status ({})\n{table}", t.name);

    match (t.last_closed_year, t.last_closed_month) {
        (Some(year), Some(month)) => println!("\nClosing lock: {month}/{year}"),
        _ => println!("\nNo closing lock."),
    }
    Ok(())
}
