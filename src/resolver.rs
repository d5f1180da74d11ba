use crate::audit::{AuditEntry, AuditStatus, ImportStats};
use crate::indexes::ReferenceIndex;
use crate::models::{AccountingEntry, Month};
use crate::rows::NormalizedEntryRow;

/// Resolve a normalized row's foreign keys against the reference index and
/// classify the outcome. Success increments the success counter and yields a
/// persistable entry; any resolution failure increments invalid_data once,
/// every matching not-found counter, and emits one audit entry enumerating
/// each failed dimension. No other side effects: safe to call repeatedly
/// against the same index.
pub fn resolve_entry(
    row: &NormalizedEntryRow,
    index: &ReferenceIndex,
    stats: &mut ImportStats,
    audit: &mut Vec<AuditEntry>,
) -> Option<AccountingEntry> {
    // CNPJ first, ERP code as fallback; either is sufficient.
    let company_id = if !row.cnpj.is_empty() {
        index
            .company_by_cnpj(&row.cnpj)
            .or_else(|| index.company_by_erp(&row.erp_code))
    } else {
        index.company_by_erp(&row.erp_code)
    };
    let account_id = index.account_by_code(&row.account_code);
    let cost_center_id = index.cost_center_by_code(&row.cost_center_code);

    if let (Some(company_id), Some(account_id), Some(cost_center_id)) =
        (company_id, account_id, cost_center_id)
    {
        stats.success += 1;
        return Some(AccountingEntry {
            company_id,
            account_id,
            cost_center_id,
            fiscal_year: chrono::Datelike::year(&row.date),
            month: Month::from_date(row.date),
            date: row.date.format("%Y-%m-%d").to_string(),
            natureza: row.natureza.clone(),
            value: row.value,
            history: row.history.clone(),
        });
    }

    let mut reasons = Vec::new();
    if company_id.is_none() {
        stats.company_not_found += 1;
        let shown = if row.cnpj.is_empty() { &row.erp_code } else { &row.cnpj };
        reasons.push(format!("Empresa não encontrada ({shown})"));
    }
    if account_id.is_none() {
        stats.account_not_found += 1;
        reasons.push(format!("Conta não encontrada ({})", row.account_code));
    }
    if cost_center_id.is_none() {
        stats.cost_center_not_found += 1;
        reasons.push(format!(
            "Centro de custo não encontrado ({})",
            row.cost_center_code
        ));
    }
    stats.invalid_data += 1;
    audit.push(AuditEntry {
        line: row.line,
        status: AuditStatus::Error,
        reason: reasons.join("; "),
        cnpj: row.cnpj.clone(),
        account_code: row.account_code.clone(),
        cost_center_code: row.cost_center_code.clone(),
        company_found: company_id.is_some(),
        account_found: account_id.is_some(),
        cost_center_found: cost_center_id.is_some(),
    });
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Company, CostCenter};
    use chrono::NaiveDate;

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(
            &[Company {
                id: 10,
                name: "Alfa".to_string(),
                cnpj: Some("12.345.678/0001-90".to_string()),
                erp_code: Some("A01".to_string()),
            }],
            &[Account {
                id: 20,
                code: "341101".to_string(),
                name: "Receita".to_string(),
            }],
            &[CostCenter {
                id: 30,
                code: "ADM".to_string(),
                name: "Administrativo".to_string(),
            }],
        )
    }

    fn row() -> NormalizedEntryRow {
        NormalizedEntryRow {
            line: 2,
            cnpj: "12345678000190".to_string(),
            erp_code: String::new(),
            account_code: "341101".to_string(),
            cost_center_code: "ADM".to_string(),
            natureza: "D".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            value: 150.0,
            history: "teste".to_string(),
        }
    }

    #[test]
    fn test_resolves_all_three_dimensions() {
        let idx = index();
        let mut stats = ImportStats::default();
        let mut audit = Vec::new();
        let entry = resolve_entry(&row(), &idx, &mut stats, &mut audit).unwrap();
        assert_eq!(entry.company_id, 10);
        assert_eq!(entry.account_id, 20);
        assert_eq!(entry.cost_center_id, 30);
        assert_eq!(entry.fiscal_year, 2024);
        assert_eq!(entry.month, Month::Janeiro);
        assert_eq!(entry.date, "2024-01-15");
        assert_eq!(stats.success, 1);
        assert!(audit.is_empty());
    }

    #[test]
    fn test_erp_fallback_when_cnpj_unknown() {
        let idx = index();
        let mut stats = ImportStats::default();
        let mut audit = Vec::new();
        let mut r = row();
        r.cnpj = "99999999999999".to_string();
        r.erp_code = "A01".to_string();
        let entry = resolve_entry(&r, &idx, &mut stats, &mut audit).unwrap();
        assert_eq!(entry.company_id, 10);
    }

    #[test]
    fn test_multiple_failures_count_once_under_invalid_data() {
        let idx = index();
        let mut stats = ImportStats::default();
        let mut audit = Vec::new();
        let mut r = row();
        r.cnpj = "99999999999999".to_string();
        r.account_code = "000000".to_string();
        assert!(resolve_entry(&r, &idx, &mut stats, &mut audit).is_none());
        assert_eq!(stats.invalid_data, 1);
        assert_eq!(stats.company_not_found, 1);
        assert_eq!(stats.account_not_found, 1);
        assert_eq!(stats.cost_center_not_found, 0);
        assert_eq!(audit.len(), 1);
        let e = &audit[0];
        assert!(e.reason.contains("Empresa não encontrada (99999999999999)"));
        assert!(e.reason.contains("; Conta não encontrada (000000)"));
        assert!(!e.company_found);
        assert!(!e.account_found);
        assert!(e.cost_center_found);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let idx = index();
        let r = row();
        let mut stats = ImportStats::default();
        let mut audit = Vec::new();
        let first = resolve_entry(&r, &idx, &mut stats, &mut audit).unwrap();
        let second = resolve_entry(&r, &idx, &mut stats, &mut audit).unwrap();
        assert_eq!(first.company_id, second.company_id);
        assert_eq!(first.account_id, second.account_id);
        assert_eq!(first.cost_center_id, second.cost_center_id);
        assert_eq!(stats.success, 2);
    }

    #[test]
    fn test_zero_padded_code_resolves_via_index_variants() {
        let idx = index();
        let mut stats = ImportStats::default();
        let mut audit = Vec::new();
        let mut r = row();
        r.account_code = "341101000".to_string();
        assert!(resolve_entry(&r, &idx, &mut stats, &mut audit).is_some());
        r.account_code = "0341101".to_string();
        assert!(resolve_entry(&r, &idx, &mut stats, &mut audit).is_some());
    }
}
