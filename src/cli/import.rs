use std::io::Write;
use std::path::Path;

use colored::Colorize;

use crate::audit::{export_audit_log, ImportStats};
use crate::cli::resolve_tenant;
use crate::db::get_connection;
use crate::error::Result;
use crate::importer;
use crate::rows::{BalanceMapping, FieldMapping};
use crate::settings::db_path;

pub fn entries(
    file: &str,
    mapping: Option<&str>,
    audit: Option<&str>,
    tenant: Option<&str>,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    let mapping = match mapping {
        Some(path) => FieldMapping::from_file(Path::new(path))?,
        None => FieldMapping::default(),
    };

    let outcome = importer::import_entries(&conn, t.id, Path::new(file), &mapping, &mut progress)?;
    println!();
    if outcome.duplicate_file {
        println!("{}", "File already imported (same checksum); nothing to do.".yellow());
        return Ok(());
    }

    print_summary(&outcome.stats, false);
    if let Some(path) = audit {
        export_audit_log(Path::new(path), &outcome.stats, &outcome.audit)?;
        println!("Audit log written to {path}");
    }
    Ok(())
}

pub fn balances(
    file: &str,
    year: i32,
    mapping: Option<&str>,
    audit: Option<&str>,
    tenant: Option<&str>,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let t = resolve_tenant(&conn, tenant)?;
    let mapping = match mapping {
        Some(path) => BalanceMapping::from_file(Path::new(path))?,
        None => BalanceMapping::default(),
    };

    let outcome =
        importer::import_balances(&conn, t.id, Path::new(file), &mapping, year, &mut progress)?;
    println!();
    if outcome.duplicate_file {
        println!("{}", "File already imported (same checksum); nothing to do.".yellow());
        return Ok(());
    }

    print_summary(&outcome.stats, true);
    if let Some(path) = audit {
        export_audit_log(Path::new(path), &outcome.stats, &outcome.audit)?;
        println!("Audit log written to {path}");
    }
    Ok(())
}

fn progress(processed: usize, total: usize) {
    print!("\rProcessing {processed}/{total} rows");
    let _ = std::io::stdout().flush();
}

fn print_summary(stats: &ImportStats, balances: bool) {
    let unit = if balances { "period values" } else { "rows" };
    println!("Imported {} {unit}", stats.success.to_string().green().bold());
    if stats.zero_values > 0 {
        println!("  {} zero/empty", stats.zero_values.to_string().yellow());
    }
    if stats.invalid_data > 0 {
        println!("  {} invalid", stats.invalid_data.to_string().red());
    }
    if stats.company_not_found > 0 {
        println!("  {} company not found", stats.company_not_found.to_string().red());
    }
    if stats.account_not_found > 0 {
        println!("  {} account not found", stats.account_not_found.to_string().red());
    }
    if stats.cost_center_not_found > 0 {
        println!(
            "  {} cost center not found",
            stats.cost_center_not_found.to_string().red()
        );
    }
    if stats.deleted_records > 0 {
        println!("  {} replaced", stats.deleted_records.to_string().yellow());
    }
    println!("  {} rows read", stats.total_rows);
}
