use comfy_table::{Cell, Table};

use crate::db;
use crate::db::get_connection;
use crate::error::{ContabilError, Result};
use crate::settings::{db_path, load_settings, save_settings};

pub fn add(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let id = db::add_tenant(&conn, name)?;
    println!("Added tenant '{name}' (id {id})");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let tenants = db::list_tenants(&conn)?;
    if tenants.is_empty() {
        println!("No tenants yet. Add one with 'contabil tenants add <name>'.");
        return Ok(());
    }

    let default = load_settings().default_tenant;
    let mut table = Table::new();
    table.set_header(vec!["Tenant", "Closing lock", "Default"]);
    for t in &tenants {
        let lock = match (t.last_closed_year, t.last_closed_month) {
            (Some(y), Some(m)) => format!("{m}/{y}"),
            _ => String::new(),
        };
        let mark = if t.name == default { "*" } else { "" };
        table.add_row(vec![Cell::new(&t.name), Cell::new(lock), Cell::new(mark)]);
    }
    println!("Tenants\n{table}");
    Ok(())
}

pub fn set_default(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    if db::get_tenant(&conn, name)?.is_none() {
        return Err(ContabilError::UnknownTenant(name.to_string()));
    }
    let mut settings = load_settings();
    settings.default_tenant = name.to_string();
    save_settings(&settings)?;
    println!("Default tenant set to '{name}'");
    Ok(())
}
