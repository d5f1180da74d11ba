use comfy_table::{Cell, Table};

use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn add(
    name: &str,
    cnpj: Option<&str>,
    erp_code: Option<&str>,
    tenant: Option<&str>,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    db::add_company(&conn, t.id, name, cnpj, erp_code)?;
    println!("Added company '{name}' to tenant '{}'", t.name);
    Ok(())
}

pub fn list(tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    let companies = db::list_companies(&conn, t.id)?;
    if companies.is_empty() {
        println!("No companies for tenant '{}'.", t.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "CNPJ", "ERP"]);
    for c in &companies {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(c.cnpj.as_deref().unwrap_or("")),
            Cell::new(c.erp_code.as_deref().unwrap_or("")),
        ]);
    }
    println!("Companies ({})\n{table}", t.name);
    Ok(())
}
