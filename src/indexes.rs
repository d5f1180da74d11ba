use std::collections::HashMap;

use crate::models::{Account, Company, CostCenter};
use crate::rows::{normalize_cnpj, strip_leading_zeros};

/// Longest account code the padded-variant generation covers. Spreadsheet
/// exports right-pad numeric-looking codes with zeros up to this width.
const MAX_PADDED_CODE_LEN: usize = 15;

/// Every key an account code is registered under: the exact code, the code
/// with leading zeros stripped, and each right-zero-padded variant up to
/// MAX_PADDED_CODE_LEN. Trades index memory for resolution robustness.
pub fn account_code_variants(code: &str) -> Vec<String> {
    let code = code.trim();
    if code.is_empty() {
        return Vec::new();
    }
    let mut variants = vec![code.to_string()];
    let stripped = strip_leading_zeros(code);
    if stripped != code {
        variants.push(stripped);
    }
    for len in (code.len() + 1)..=MAX_PADDED_CODE_LEN {
        let mut padded = code.to_string();
        padded.push_str(&"0".repeat(len - code.len()));
        variants.push(padded);
    }
    variants
}

/// Lookup structures built once per import run and read-only afterwards.
/// Key collisions are last-write-wins: duplicate registry codes are a known
/// condition in source data, warned about, never fatal.
pub struct ReferenceIndex {
    company_by_cnpj: HashMap<String, i64>,
    company_by_erp: HashMap<String, i64>,
    account_by_code: HashMap<String, i64>,
    cost_center_by_code: HashMap<String, i64>,
}

impl ReferenceIndex {
    pub fn build(
        companies: &[Company],
        accounts: &[Account],
        cost_centers: &[CostCenter],
    ) -> ReferenceIndex {
        let mut company_by_cnpj = HashMap::new();
        let mut company_by_erp = HashMap::new();
        for company in companies {
            if let Some(cnpj) = &company.cnpj {
                let normalized = normalize_cnpj(cnpj);
                if !normalized.is_empty() {
                    if company_by_cnpj.insert(normalized.clone(), company.id).is_some() {
                        eprintln!("Aviso: CNPJ duplicado no cadastro de empresas: {normalized}");
                    }
                }
            }
            if let Some(erp) = &company.erp_code {
                let trimmed = erp.trim();
                if !trimmed.is_empty() {
                    if company_by_erp.insert(trimmed.to_string(), company.id).is_some() {
                        eprintln!("Aviso: código ERP duplicado no cadastro de empresas: {trimmed}");
                    }
                }
            }
        }

        let mut account_by_code = HashMap::new();
        for account in accounts {
            let code = account.code.trim();
            if code.is_empty() {
                continue;
            }
            if account_by_code.contains_key(code) {
                eprintln!("Aviso: conta duplicada no plano de contas: {code}");
            }
            for variant in account_code_variants(code) {
                account_by_code.insert(variant, account.id);
            }
        }

        let mut cost_center_by_code = HashMap::new();
        for cc in cost_centers {
            let code = cc.code.trim();
            if code.is_empty() {
                continue;
            }
            if cost_center_by_code.contains_key(code) {
                eprintln!("Aviso: centro de custo duplicado: {code}");
            }
            cost_center_by_code.insert(code.to_string(), cc.id);
            let stripped = strip_leading_zeros(code);
            if stripped != code {
                cost_center_by_code.insert(stripped, cc.id);
            }
        }

        ReferenceIndex {
            company_by_cnpj,
            company_by_erp,
            account_by_code,
            cost_center_by_code,
        }
    }

    /// Expects a digits-only CNPJ (see rows::normalize_cnpj).
    pub fn company_by_cnpj(&self, cnpj: &str) -> Option<i64> {
        self.company_by_cnpj.get(cnpj).copied()
    }

    pub fn company_by_erp(&self, erp_code: &str) -> Option<i64> {
        self.company_by_erp.get(erp_code.trim()).copied()
    }

    /// Single lookup from the resolver's point of view; the zero-stripped
    /// retry lives here with the rest of the code normalization, next to the
    /// variants registered at build time.
    pub fn account_by_code(&self, code: &str) -> Option<i64> {
        let code = code.trim();
        self.account_by_code
            .get(code)
            .or_else(|| self.account_by_code.get(strip_leading_zeros(code).as_str()))
            .copied()
    }

    pub fn cost_center_by_code(&self, code: &str) -> Option<i64> {
        let code = code.trim();
        self.cost_center_by_code
            .get(code)
            .or_else(|| self.cost_center_by_code.get(strip_leading_zeros(code).as_str()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(id: i64, cnpj: Option<&str>, erp: Option<&str>) -> Company {
        Company {
            id,
            name: format!("Empresa {id}"),
            cnpj: cnpj.map(String::from),
            erp_code: erp.map(String::from),
        }
    }

    fn account(id: i64, code: &str) -> Account {
        Account {
            id,
            code: code.to_string(),
            name: format!("Conta {id}"),
        }
    }

    fn cost_center(id: i64, code: &str) -> CostCenter {
        CostCenter {
            id,
            code: code.to_string(),
            name: format!("CC {id}"),
        }
    }

    #[test]
    fn test_cnpj_lookup_ignores_formatting() {
        let idx = ReferenceIndex::build(
            &[company(1, Some("12.345.678/0001-90"), None)],
            &[],
            &[],
        );
        assert_eq!(idx.company_by_cnpj(&normalize_cnpj("12345678000190")), Some(1));
        assert_eq!(
            idx.company_by_cnpj(&normalize_cnpj("12.345.678/0001-90")),
            Some(1)
        );
        assert_eq!(idx.company_by_cnpj("00000000000000"), None);
    }

    #[test]
    fn test_erp_code_is_trimmed() {
        let idx = ReferenceIndex::build(&[company(2, None, Some("  A01 "))], &[], &[]);
        assert_eq!(idx.company_by_erp("A01"), Some(2));
        assert_eq!(idx.company_by_erp(" A01  "), Some(2));
    }

    #[test]
    fn test_account_zero_padded_variants_resolve() {
        let idx = ReferenceIndex::build(&[], &[account(7, "341101")], &[]);
        assert_eq!(idx.account_by_code("341101"), Some(7));
        assert_eq!(idx.account_by_code("341101000"), Some(7));
        assert_eq!(idx.account_by_code("34110100000000"), Some(7));
        assert_eq!(idx.account_by_code("341101000000000"), Some(7)); // 15 chars
        assert_eq!(idx.account_by_code("3411010000000000"), None); // 16 chars
    }

    #[test]
    fn test_account_leading_zero_variant_resolves() {
        let idx = ReferenceIndex::build(&[], &[account(7, "0341101")], &[]);
        assert_eq!(idx.account_by_code("0341101"), Some(7));
        assert_eq!(idx.account_by_code("341101"), Some(7));
    }

    #[test]
    fn test_account_leading_zero_lookup_resolves() {
        let idx = ReferenceIndex::build(&[], &[account(7, "341101")], &[]);
        assert_eq!(idx.account_by_code("0341101"), Some(7));
    }

    #[test]
    fn test_zero_strip_floors_at_zero() {
        assert_eq!(strip_leading_zeros("000"), "0");
        let idx = ReferenceIndex::build(&[], &[account(9, "000")], &[]);
        assert_eq!(idx.account_by_code("0"), Some(9));
    }

    #[test]
    fn test_cost_center_zero_stripped_fallback() {
        let idx = ReferenceIndex::build(&[], &[], &[cost_center(3, "012")]);
        assert_eq!(idx.cost_center_by_code("012"), Some(3));
        assert_eq!(idx.cost_center_by_code("12"), Some(3));
        assert_eq!(idx.cost_center_by_code("13"), None);
    }

    #[test]
    fn test_duplicate_codes_keep_last_value() {
        let idx = ReferenceIndex::build(
            &[],
            &[account(1, "341101"), account(2, "341101")],
            &[],
        );
        assert_eq!(idx.account_by_code("341101"), Some(2));
    }
}
