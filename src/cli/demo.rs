use crate::db;
use crate::db::get_connection;
use crate::error::{ContabilError, Result};
use crate::models::{BalanceRow, LineKind, Month};
use crate::settings::db_path;

/// Seed a 'demo' tenant with a small but complete setup: one company, a few
/// accounts and cost centers, a two-level DRE tree with mappings, and three
/// months of balances. Enough to run every report command against.
pub fn run() -> Result<()> {
    let conn = get_connection(&db_path())?;
    if db::get_tenant(&conn, "demo")?.is_some() {
        return Err(ContabilError::Other(
            "tenant 'demo' already exists".to_string(),
        ));
    }
    let t = db::add_tenant(&conn, "demo")?;

    let company = db::add_company(
        &conn,
        t,
        "Alfa Serviços Ltda",
        Some("12.345.678/0001-90"),
        Some("A01"),
    )?;
    let receita = db::add_account(&conn, t, "341101", "Receita de serviços")?;
    let impostos = db::add_account(&conn, t, "341201", "Impostos sobre serviços")?;
    let despesas = db::add_account(&conn, t, "451020", "Despesas administrativas")?;
    db::add_cost_center(&conn, t, "ADM", "Administrativo")?;
    db::add_cost_center(&conn, t, "OPR", "Operacional")?;

    let resultado =
        db::add_report_line(&conn, t, "RESULTADO", LineKind::Total, 1, None, 0, true)?;
    let l_receita =
        db::add_report_line(&conn, t, "RECEITA BRUTA", LineKind::DataBucket, 1, Some(resultado), 1, false)?;
    let l_deducoes =
        db::add_report_line(&conn, t, "DEDUCOES", LineKind::DataBucket, -1, Some(resultado), 2, false)?;
    let l_despesas =
        db::add_report_line(&conn, t, "DESPESAS", LineKind::DataBucket, -1, Some(resultado), 3, false)?;
    db::map_account(&conn, t, receita, l_receita)?;
    db::map_account(&conn, t, impostos, l_deducoes)?;
    db::map_account(&conn, t, despesas, l_despesas)?;

    let mut rows = Vec::new();
    let months = [
        (Month::Janeiro, 10000.0, 1200.0, 3500.0),
        (Month::Fevereiro, 11500.0, 1380.0, 3600.0),
        (Month::Marco, 9800.0, 1176.0, 3450.0),
    ];
    for (month, rec, imp, desp) in months {
        for (code, value) in [("341101", rec), ("341201", imp), ("451020", desp)] {
            rows.push(BalanceRow {
                company_id: company,
                account_code: code.to_string(),
                fiscal_year: 2024,
                month,
                value,
            });
        }
    }
    db::bulk_save_balances(&conn, t, &rows)?;

    println!("Seeded tenant 'demo' with 3 months of 2024 balances.");
    println!("Try: contabil report dre --tenant demo --year 2024 --vertical");
    Ok(())
}
