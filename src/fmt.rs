/// Format a float as Brazilian currency with thousands separators: R$ 1.234,56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-R$ {with_dots},{dec_part}")
    } else {
        format!("R$ {with_dots},{dec_part}")
    }
}

/// Format an analysis percentage; an undefined result (zero base/previous)
/// renders as a placeholder, never as zero.
pub fn pct(val: Option<f64>) -> String {
    match val {
        Some(v) => format!("{:.1}%", v).replace('.', ","),
        None => "\u{2014}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "R$ 1.234,56");
        assert_eq!(money(-500.00), "-R$ 500,00");
        assert_eq!(money(0.0), "R$ 0,00");
        assert_eq!(money(1000000.99), "R$ 1.000.000,99");
        assert_eq!(money(42.10), "R$ 42,10");
    }

    #[test]
    fn test_pct_placeholder() {
        assert_eq!(pct(Some(12.345)), "12,3%");
        assert_eq!(pct(Some(-8.0)), "-8,0%");
        assert_eq!(pct(None), "\u{2014}");
    }
}
