use comfy_table::{Cell, Table};

use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn add(code: &str, name: &str, tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    db::add_account(&conn, t.id, code, name)?;
    println!("Added account {code} '{name}' to tenant '{}'", t.name);
    Ok(())
}

pub fn list(tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    let accounts = db::list_accounts(&conn, t.id)?;
    if accounts.is_empty() {
        println!("No accounts for tenant '{}'.", t.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Name"]);
    for a in &accounts {
        table.add_row(vec![Cell::new(a.id), Cell::new(&a.code), Cell::new(&a.name)]);
    }
    println!("Chart of accounts ({})\n{table}", t.name);
    Ok(())
}
