use std::collections::HashMap;

use crate::models::{LineKind, Month, Period, ReportLine};

/// The five additive components of one report cell plus the separate budget
/// figure. The sum of the five is the cell's effective result.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MonthlyData {
    pub balancete: f64,
    pub transf_gerencial: f64,
    pub ajuste_contabil: f64,
    pub cg_gerencial: f64,
    pub cg: f64,
    pub orcado: f64,
}

impl MonthlyData {
    pub fn effective(&self) -> f64 {
        self.balancete + self.transf_gerencial + self.ajuste_contabil + self.cg_gerencial + self.cg
    }

    fn add_weighted(&mut self, other: &MonthlyData, sign: f64) {
        self.balancete += other.balancete * sign;
        self.transf_gerencial += other.transf_gerencial * sign;
        self.ajuste_contabil += other.ajuste_contabil * sign;
        self.cg_gerencial += other.cg_gerencial * sign;
        self.cg += other.cg * sign;
        self.orcado += other.orcado * sign;
    }
}

/// One statement line after aggregation, in display order with its depth in
/// the tree. Lines with no balances keep all-zero cells: hiding them is a
/// presentation choice, not this layer's.
#[derive(Debug, Clone)]
pub struct StatementLine {
    pub id: i64,
    pub name: String,
    pub kind: LineKind,
    pub sign: i64,
    pub depth: usize,
    pub is_base: bool,
    cells: HashMap<Period, MonthlyData>,
}

impl StatementLine {
    pub fn monthly(&self, period: Period) -> MonthlyData {
        self.cells.get(&period).cloned().unwrap_or_default()
    }

    pub fn effective(&self, period: Period) -> f64 {
        self.cells.get(&period).map(MonthlyData::effective).unwrap_or(0.0)
    }
}

/// A fully aggregated statement: lines flattened depth-first in display
/// order. Rebuilt on every read; a pure function of the line definitions,
/// the mapping table and the balances.
#[derive(Debug)]
pub struct Statement {
    pub lines: Vec<StatementLine>,
}

impl Statement {
    pub fn line(&self, id: i64) -> Option<&StatementLine> {
        self.lines.iter().find(|l| l.id == id)
    }
}

struct Node {
    line: ReportLine,
    cells: HashMap<Period, MonthlyData>,
    children: Vec<usize>,
}

/// Build the statement in three passes over an id-indexed arena: bucket
/// balances into data lines, wire parent→children edges, then roll sums up
/// bottom-up weighting each child by the child's own sign.
///
/// `mappings` is the account-id → report-line-ids table; `balances` is
/// (account_id, fiscal_year, month_name, value) with month names matched
/// case-insensitively. Balances with no mapping, or mapped to a line that is
/// not a data bucket, are dropped without error: reconciling them is the
/// mapping screen's job.
pub fn build_statement(
    lines: &[ReportLine],
    mappings: &HashMap<i64, Vec<i64>>,
    balances: &[(i64, i32, String, f64)],
    years: &[i32],
) -> Statement {
    // Pass 1: nodes into an id-indexed arena.
    let mut arena: Vec<Node> = lines
        .iter()
        .map(|line| Node {
            line: line.clone(),
            cells: HashMap::new(),
            children: Vec::new(),
        })
        .collect();
    let by_id: HashMap<i64, usize> = arena
        .iter()
        .enumerate()
        .map(|(i, n)| (n.line.id, i))
        .collect();

    // Bucket balances into data lines. Fan-out to every mapped line.
    for (account_id, year, month_name, value) in balances {
        if !years.contains(year) {
            continue;
        }
        let Some(month) = Month::parse(month_name) else {
            continue;
        };
        let Some(line_ids) = mappings.get(account_id) else {
            continue;
        };
        for line_id in line_ids {
            let Some(&idx) = by_id.get(line_id) else {
                continue;
            };
            if arena[idx].line.kind != LineKind::DataBucket {
                continue;
            }
            arena[idx]
                .cells
                .entry(Period::new(*year, month))
                .or_default()
                .balancete += value;
        }
    }

    // Pass 2: parent→children edges, children sorted by display order.
    let mut roots: Vec<usize> = Vec::new();
    for i in 0..arena.len() {
        match arena[i].line.parent_id.and_then(|p| by_id.get(&p).copied()) {
            Some(parent) => arena[parent].children.push(i),
            None => roots.push(i),
        }
    }
    let order_key = |arena: &[Node], i: usize| (arena[i].line.display_order, arena[i].line.id);
    roots.sort_by_key(|&i| order_key(&arena, i));
    for i in 0..arena.len() {
        let mut children = std::mem::take(&mut arena[i].children);
        children.sort_by_key(|&c| order_key(&arena, c));
        arena[i].children = children;
    }

    // Pass 3: post-order rollup. Data buckets keep their bucketed cells and
    // never derive from children; everything else is the sign-weighted sum
    // of its children.
    for &root in &roots {
        rollup(&mut arena, root);
    }

    let mut out = Vec::new();
    for &root in &roots {
        flatten(&arena, root, 0, &mut out);
    }
    Statement { lines: out }
}

fn rollup(arena: &mut [Node], idx: usize) {
    let children = arena[idx].children.clone();
    for &child in &children {
        rollup(arena, child);
    }
    if arena[idx].line.kind == LineKind::DataBucket {
        return;
    }
    let mut summed: HashMap<Period, MonthlyData> = HashMap::new();
    for &child in &children {
        let sign = arena[child].line.sign as f64;
        for (period, data) in &arena[child].cells {
            summed.entry(*period).or_default().add_weighted(data, sign);
        }
    }
    arena[idx].cells = summed;
}

fn flatten(arena: &[Node], idx: usize, depth: usize, out: &mut Vec<StatementLine>) {
    let node = &arena[idx];
    out.push(StatementLine {
        id: node.line.id,
        name: node.line.name.clone(),
        kind: node.line.kind,
        sign: node.line.sign,
        depth,
        is_base: node.line.is_base,
        cells: node.cells.clone(),
    });
    for &child in &node.children {
        flatten(arena, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(
        id: i64,
        name: &str,
        kind: LineKind,
        sign: i64,
        parent_id: Option<i64>,
        display_order: i64,
    ) -> ReportLine {
        ReportLine {
            id,
            name: name.to_string(),
            kind,
            sign,
            parent_id,
            display_order,
            is_base: false,
        }
    }

    fn receita_despesa_tree() -> Vec<ReportLine> {
        vec![
            line(1, "TOTAL", LineKind::Total, 1, None, 0),
            line(2, "RECEITA", LineKind::DataBucket, 1, Some(1), 1),
            line(3, "DESPESA", LineKind::DataBucket, -1, Some(1), 2),
        ]
    }

    #[test]
    fn test_sign_aware_rollup() {
        let lines = receita_despesa_tree();
        let mappings: HashMap<i64, Vec<i64>> =
            [(100, vec![2]), (200, vec![3])].into_iter().collect();
        let balances = vec![
            (100, 2024, "JANEIRO".to_string(), 1000.0),
            (200, 2024, "JANEIRO".to_string(), 300.0),
        ];
        let stmt = build_statement(&lines, &mappings, &balances, &[2024]);
        let p = Period::new(2024, Month::Janeiro);
        assert_eq!(stmt.line(2).unwrap().monthly(p).balancete, 1000.0);
        assert_eq!(stmt.line(3).unwrap().monthly(p).balancete, 300.0);
        // DESPESA's own sign flips its contribution to the parent.
        assert_eq!(stmt.line(1).unwrap().monthly(p).balancete, 700.0);
        assert_eq!(stmt.line(1).unwrap().effective(p), 700.0);
    }

    #[test]
    fn test_month_matching_is_case_insensitive() {
        let lines = receita_despesa_tree();
        let mappings: HashMap<i64, Vec<i64>> = [(100, vec![2])].into_iter().collect();
        let balances = vec![(100, 2024, "janeiro".to_string(), 50.0)];
        let stmt = build_statement(&lines, &mappings, &balances, &[2024]);
        let p = Period::new(2024, Month::Janeiro);
        assert_eq!(stmt.line(2).unwrap().monthly(p).balancete, 50.0);
    }

    #[test]
    fn test_unmapped_balances_are_dropped_silently() {
        let lines = receita_despesa_tree();
        let mappings = HashMap::new();
        let balances = vec![(100, 2024, "JANEIRO".to_string(), 1000.0)];
        let stmt = build_statement(&lines, &mappings, &balances, &[2024]);
        let p = Period::new(2024, Month::Janeiro);
        assert_eq!(stmt.line(1).unwrap().effective(p), 0.0);
    }

    #[test]
    fn test_fan_out_to_lines_sharing_an_account() {
        let mut lines = receita_despesa_tree();
        lines.push(line(4, "RECEITA ESPELHO", LineKind::DataBucket, 1, Some(1), 3));
        let mappings: HashMap<i64, Vec<i64>> = [(100, vec![2, 4])].into_iter().collect();
        let balances = vec![(100, 2024, "JANEIRO".to_string(), 500.0)];
        let stmt = build_statement(&lines, &mappings, &balances, &[2024]);
        let p = Period::new(2024, Month::Janeiro);
        assert_eq!(stmt.line(2).unwrap().monthly(p).balancete, 500.0);
        assert_eq!(stmt.line(4).unwrap().monthly(p).balancete, 500.0);
        assert_eq!(stmt.line(1).unwrap().monthly(p).balancete, 1000.0);
    }

    #[test]
    fn test_lines_without_balances_stay_with_zero_cells() {
        let lines = receita_despesa_tree();
        let stmt = build_statement(&lines, &HashMap::new(), &[], &[2024]);
        assert_eq!(stmt.lines.len(), 3);
        let p = Period::new(2024, Month::Janeiro);
        for l in &stmt.lines {
            assert_eq!(l.effective(p), 0.0);
        }
    }

    #[test]
    fn test_display_order_and_depth() {
        let lines = vec![
            line(1, "RAIZ", LineKind::Total, 1, None, 0),
            line(3, "SEGUNDO", LineKind::Header, 1, Some(1), 2),
            line(2, "PRIMEIRO", LineKind::Header, 1, Some(1), 1),
            line(4, "FOLHA", LineKind::DataBucket, 1, Some(2), 1),
        ];
        let stmt = build_statement(&lines, &HashMap::new(), &[], &[2024]);
        let names: Vec<&str> = stmt.lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["RAIZ", "PRIMEIRO", "FOLHA", "SEGUNDO"]);
        let depths: Vec<usize> = stmt.lines.iter().map(|l| l.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
    }

    #[test]
    fn test_multi_level_rollup() {
        let lines = vec![
            line(1, "RESULTADO", LineKind::Total, 1, None, 0),
            line(2, "OPERACIONAL", LineKind::Header, 1, Some(1), 1),
            line(3, "RECEITA", LineKind::DataBucket, 1, Some(2), 1),
            line(4, "CUSTO", LineKind::DataBucket, -1, Some(2), 2),
            line(5, "DEDUCOES", LineKind::DataBucket, -1, Some(1), 2),
        ];
        let mappings: HashMap<i64, Vec<i64>> =
            [(10, vec![3]), (20, vec![4]), (30, vec![5])].into_iter().collect();
        let balances = vec![
            (10, 2024, "MARCO".to_string(), 900.0),
            (20, 2024, "MARCO".to_string(), 200.0),
            (30, 2024, "MARCO".to_string(), 100.0),
        ];
        let stmt = build_statement(&lines, &mappings, &balances, &[2024]);
        let p = Period::new(2024, Month::Marco);
        assert_eq!(stmt.line(2).unwrap().effective(p), 700.0); // 900 - 200
        assert_eq!(stmt.line(1).unwrap().effective(p), 600.0); // 700 - 100
    }

    #[test]
    fn test_balances_outside_requested_years_ignored() {
        let lines = receita_despesa_tree();
        let mappings: HashMap<i64, Vec<i64>> = [(100, vec![2])].into_iter().collect();
        let balances = vec![
            (100, 2023, "JANEIRO".to_string(), 1.0),
            (100, 2024, "JANEIRO".to_string(), 2.0),
        ];
        let stmt = build_statement(&lines, &mappings, &balances, &[2024]);
        assert_eq!(
            stmt.line(2).unwrap().monthly(Period::new(2024, Month::Janeiro)).balancete,
            2.0
        );
        assert_eq!(
            stmt.line(2).unwrap().monthly(Period::new(2023, Month::Janeiro)).balancete,
            0.0
        );
    }
}
