use crate::cli::resolve_tenant;
use crate::db;
use crate::db::get_connection;
use crate::error::{ContabilError, Result};
use crate::models::Month;
use crate::settings::db_path;

pub fn set(year: i32, month: &str, tenant: Option<&str>) -> Result<()> {
    let month = Month::parse(month)
        .ok_or_else(|| ContabilError::Other(format!("unknown month '{month}'")))?;
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    db::set_closing_lock(&conn, t.id, year, month)?;
    println!("Closing lock for '{}' set to {month}/{year}", t.name);
    Ok(())
}

pub fn show(tenant: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    match (t.last_closed_year, t.last_closed_month) {
        (Some(year), Some(month)) => {
            println!("Closing lock for '{}': {month}/{year}", t.name)
        }
        _ => println!("No closing lock for '{}'.", t.name),
    }
    Ok(())
}
