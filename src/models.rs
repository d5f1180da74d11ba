use std::fmt;

/// Canonical month order used for chronology and closing-lock comparisons.
pub const MONTH_NAMES: [&str; 12] = [
    "JANEIRO",
    "FEVEREIRO",
    "MARCO",
    "ABRIL",
    "MAIO",
    "JUNHO",
    "JULHO",
    "AGOSTO",
    "SETEMBRO",
    "OUTUBRO",
    "NOVEMBRO",
    "DEZEMBRO",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    Janeiro,
    Fevereiro,
    Marco,
    Abril,
    Maio,
    Junho,
    Julho,
    Agosto,
    Setembro,
    Outubro,
    Novembro,
    Dezembro,
}

pub const ALL_MONTHS: [Month; 12] = [
    Month::Janeiro,
    Month::Fevereiro,
    Month::Marco,
    Month::Abril,
    Month::Maio,
    Month::Junho,
    Month::Julho,
    Month::Agosto,
    Month::Setembro,
    Month::Outubro,
    Month::Novembro,
    Month::Dezembro,
];

impl Month {
    /// 1-based calendar index.
    pub fn index(self) -> u32 {
        ALL_MONTHS.iter().position(|m| *m == self).unwrap() as u32 + 1
    }

    pub fn from_index(index: u32) -> Option<Month> {
        if (1..=12).contains(&index) {
            Some(ALL_MONTHS[(index - 1) as usize])
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        MONTH_NAMES[(self.index() - 1) as usize]
    }

    pub fn from_date(date: chrono::NaiveDate) -> Month {
        ALL_MONTHS[chrono::Datelike::month0(&date) as usize]
    }

    /// Case-insensitive parse against the canonical names; the cedilla in
    /// "MARÇO" is tolerated.
    pub fn parse(s: &str) -> Option<Month> {
        let up = s.trim().to_uppercase().replace('Ç', "C");
        MONTH_NAMES
            .iter()
            .position(|n| *n == up)
            .map(|i| ALL_MONTHS[i])
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A (fiscal year, month) pair, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub month: Month,
}

impl Period {
    pub fn new(year: i32, month: Month) -> Self {
        Period { year, month }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// Caller role for the period-visibility filter. Role is a display concern:
/// it never gates writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrador,
    Gerente,
    Analista,
    Leitor,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "administrador" | "admin" => Some(Role::Administrador),
            "gerente" => Some(Role::Gerente),
            "analista" => Some(Role::Analista),
            "leitor" => Some(Role::Leitor),
            _ => None,
        }
    }

    /// Restricted roles cannot see periods past the closing lock.
    pub fn is_restricted(self) -> bool {
        matches!(self, Role::Analista | Role::Leitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    DataBucket,
    Header,
    Total,
}

impl LineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LineKind::DataBucket => "data_bucket",
            LineKind::Header => "header",
            LineKind::Total => "total",
        }
    }

    pub fn parse(s: &str) -> Option<LineKind> {
        match s {
            "data_bucket" => Some(LineKind::DataBucket),
            "header" => Some(LineKind::Header),
            "total" => Some(LineKind::Total),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub last_closed_year: Option<i32>,
    pub last_closed_month: Option<Month>,
}

#[derive(Debug, Clone)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub cnpj: Option<String>,
    pub erp_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CostCenter {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// One row of the report-line tree as persisted.
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub id: i64,
    pub name: String,
    pub kind: LineKind,
    pub sign: i64,
    pub parent_id: Option<i64>,
    pub display_order: i64,
    pub is_base: bool,
}

/// A fully resolved accounting entry, ready to persist.
#[derive(Debug, Clone)]
pub struct AccountingEntry {
    pub company_id: i64,
    pub account_id: i64,
    pub cost_center_id: i64,
    pub fiscal_year: i32,
    pub month: Month,
    pub date: String,
    pub natureza: String,
    pub value: f64,
    pub history: String,
}

/// A monthly trial-balance value. The account code is carried raw: resolution
/// to an account id happens inside the balance sink, not before it.
#[derive(Debug, Clone)]
pub struct BalanceRow {
    pub company_id: i64,
    pub account_code: String,
    pub fiscal_year: i32,
    pub month: Month,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_parse_case_insensitive() {
        assert_eq!(Month::parse("janeiro"), Some(Month::Janeiro));
        assert_eq!(Month::parse("JANEIRO"), Some(Month::Janeiro));
        assert_eq!(Month::parse("  Dezembro "), Some(Month::Dezembro));
        assert_eq!(Month::parse("março"), Some(Month::Marco));
        assert_eq!(Month::parse("smarch"), None);
    }

    #[test]
    fn test_month_index_roundtrip() {
        for m in ALL_MONTHS {
            assert_eq!(Month::from_index(m.index()), Some(m));
        }
        assert_eq!(Month::from_index(0), None);
        assert_eq!(Month::from_index(13), None);
    }

    #[test]
    fn test_period_ordering_is_chronological() {
        let a = Period::new(2024, Month::Dezembro);
        let b = Period::new(2025, Month::Janeiro);
        assert!(a < b);
        assert!(Period::new(2024, Month::Junho) < Period::new(2024, Month::Julho));
    }

    #[test]
    fn test_role_restriction() {
        assert!(Role::Leitor.is_restricted());
        assert!(Role::Analista.is_restricted());
        assert!(!Role::Administrador.is_restricted());
        assert!(!Role::Gerente.is_restricted());
    }
}
