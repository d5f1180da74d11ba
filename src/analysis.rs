use std::collections::HashMap;

use crate::models::{LineKind, Period, Role};
use crate::statement::Statement;

/// Filter the candidate periods for one caller. Unrestricted roles see
/// everything; restricted roles stop at the tenant's closing lock. No lock
/// recorded means nothing is closed yet, so restricted callers see every
/// period too. Output is sorted chronologically either way.
pub fn visible_periods(candidates: &[Period], role: Role, lock: Option<Period>) -> Vec<Period> {
    let mut periods: Vec<Period> = match (role.is_restricted(), lock) {
        (true, Some(lock)) => candidates.iter().filter(|p| **p <= lock).copied().collect(),
        _ => candidates.to_vec(),
    };
    periods.sort();
    periods.dedup();
    periods
}

/// Each line's effective value as a share of the base line, per period.
/// The base is the line flagged as such, falling back to the first
/// total-kind line; if neither exists the analysis is empty. A zero base
/// leaves that period's column undefined rather than dividing by it.
pub fn vertical_analysis(
    statement: &Statement,
    periods: &[Period],
) -> HashMap<i64, Vec<Option<f64>>> {
    let base = statement
        .lines
        .iter()
        .find(|l| l.is_base)
        .or_else(|| statement.lines.iter().find(|l| l.kind == LineKind::Total));
    let Some(base) = base else {
        return HashMap::new();
    };
    let base_values: Vec<f64> = periods.iter().map(|p| base.effective(*p)).collect();

    let mut out = HashMap::new();
    for line in &statement.lines {
        let cells = periods
            .iter()
            .zip(&base_values)
            .map(|(p, b)| {
                if *b == 0.0 {
                    None
                } else {
                    Some(line.effective(*p) / b * 100.0)
                }
            })
            .collect();
        out.insert(line.id, cells);
    }
    out
}

/// Percentage change of each line against the previous displayed period.
/// "Previous" means previous in the caller-visible sequence, not the
/// previous calendar month: hidden periods do not anchor comparisons. The
/// first column, and any column whose predecessor is zero, is undefined.
pub fn horizontal_analysis(
    statement: &Statement,
    periods: &[Period],
) -> HashMap<i64, Vec<Option<f64>>> {
    let mut out = HashMap::new();
    for line in &statement.lines {
        let values: Vec<f64> = periods.iter().map(|p| line.effective(*p)).collect();
        let cells = (0..values.len())
            .map(|i| {
                if i == 0 {
                    return None;
                }
                let prev = values[i - 1];
                if prev == 0.0 {
                    None
                } else {
                    Some((values[i] - prev) / prev * 100.0)
                }
            })
            .collect();
        out.insert(line.id, cells);
    }
    out
}
