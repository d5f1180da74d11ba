use comfy_table::{Cell, Table};

use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn add(code: &str, name: &str, tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    db::add_cost_center(&conn, t.id, code, name)?;
    println!("Added cost center {code} '{name}' to tenant '{}'", t.name);
    Ok(())
}

pub fn list(tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    let centers = db::list_cost_centers(&conn, t.id)?;
    if centers.is_empty() {
        println!("No cost centers for tenant '{}'.", t.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Name"]);
    for c in &centers {
        table.add_row(vec![Cell::new(c.id), Cell::new(&c.code), Cell::new(&c.name)]);
    }
    println!("Cost centers ({})\n{table}", t.name);
    Ok(())
}
