//! # CIF 数值与标准不确定度
//!
//! 解析与格式化 CIF 的 `value(su)` 记法。
//!
//! ## 规则
//! - `1.234(5)` -> 1.234 ± 0.005
//! - `12(3)`    -> 12 ± 3
//! - `1.5()`    -> 1.5，不确定度未知，但标记为可精修
//! - `?` 与 `.` 为缺失值
//!
//! ## 依赖关系
//! - 被 `core/parameter.rs`、`core/cif.rs` 和各模型的 CIF 读取使用

/// 解析后的 CIF 数值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CifNumber {
    pub value: f64,
    pub uncertainty: Option<f64>,
    /// 是否带有括号（可精修标记）
    pub marked: bool,
}

/// 判断 CIF 值是否为缺失值
pub fn is_missing(raw: &str) -> bool {
    matches!(raw.trim(), "?" | ".")
}

/// 解析 CIF 数值，返回 None 表示缺失或非数值
pub fn parse_number(raw: &str) -> Option<CifNumber> {
    let raw = raw.trim();
    if raw.is_empty() || is_missing(raw) {
        return None;
    }

    let (mantissa_part, su_part) = match raw.find('(') {
        Some(open) => {
            let close = raw[open..].find(')')? + open;
            (&raw[..open], Some(&raw[open + 1..close]))
        }
        None => (raw, None),
    };

    let value: f64 = mantissa_part.parse().ok()?;
    let Some(su_digits) = su_part else {
        return Some(CifNumber {
            value,
            uncertainty: None,
            marked: false,
        });
    };

    if su_digits.trim().is_empty() {
        return Some(CifNumber {
            value,
            uncertainty: None,
            marked: true,
        });
    }

    let su_int: f64 = su_digits.trim().parse().ok()?;

    // 不确定度作用在尾数的最后一位小数上
    let (mantissa, exponent) = split_exponent(mantissa_part);
    let decimals = mantissa
        .find('.')
        .map(|dot| mantissa.len() - dot - 1)
        .unwrap_or(0) as i32;
    let uncertainty = su_int * 10f64.powi(exponent - decimals);

    Some(CifNumber {
        value,
        uncertainty: Some(uncertainty),
        marked: true,
    })
}

fn split_exponent(s: &str) -> (&str, i32) {
    match s.find(|c| c == 'e' || c == 'E') {
        Some(pos) => (&s[..pos], s[pos + 1..].parse().unwrap_or(0)),
        None => (s, 0),
    }
}

/// 格式化普通数值（最短可往返表示，至少保留一位小数）
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "?".to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }
    if value.abs() >= 1e9 || value.abs() < 1e-6 {
        return format!("{:e}", value);
    }
    let mut s = format!("{}", value);
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

/// 以 `value(su)` 记法格式化数值
///
/// 不确定度保留两位有效数字（首位为 1 时）或一位有效数字。
pub fn format_with_uncertainty(value: f64, uncertainty: f64) -> String {
    if !uncertainty.is_finite() || uncertainty <= 0.0 {
        return format!("{}()", format_number(value));
    }

    let exponent = uncertainty.log10().floor() as i32;
    let leading = uncertainty / 10f64.powi(exponent);
    let significant = if leading < 2.0 { 2 } else { 1 };
    let decimals = (significant - 1 - exponent).max(0);
    let su_scaled = (uncertainty * 10f64.powi(decimals)).round() as i64;

    format!(
        "{:.prec$}({})",
        value,
        su_scaled.max(1),
        prec = decimals as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        let n = parse_number("5.4315").unwrap();
        assert_eq!(n.value, 5.4315);
        assert_eq!(n.uncertainty, None);
        assert!(!n.marked);
    }

    #[test]
    fn test_parse_with_uncertainty() {
        let n = parse_number("1.234(5)").unwrap();
        assert!((n.value - 1.234).abs() < 1e-12);
        assert!((n.uncertainty.unwrap() - 0.005).abs() < 1e-12);
        assert!(n.marked);

        let n = parse_number("12(3)").unwrap();
        assert!((n.uncertainty.unwrap() - 3.0).abs() < 1e-12);

        let n = parse_number("0.12(15)").unwrap();
        assert!((n.uncertainty.unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_parse_empty_parentheses() {
        let n = parse_number("1.5()").unwrap();
        assert_eq!(n.value, 1.5);
        assert_eq!(n.uncertainty, None);
        assert!(n.marked);
    }

    #[test]
    fn test_parse_missing() {
        assert!(parse_number("?").is_none());
        assert!(parse_number(".").is_none());
        assert!(parse_number("abc").is_none());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10.0");
        assert_eq!(format_number(1.5406), "1.5406");
        assert_eq!(format_number(-0.0), "0.0");
        assert_eq!(format_number(1.23456789e-5), "0.0000123456789");
        assert_eq!(format_number(2.5e10), "2.5e10");
    }

    #[test]
    fn test_format_number_round_trips() {
        for v in [
            1.23456789e-5,
            -3.3e-4,
            0.1 + 0.2,
            1.0 / 3.0,
            7.5e-7,
            123456.789012345,
            -8.0e9,
            2.0,
        ] {
            let text = format_number(v);
            assert_eq!(parse_number(&text).unwrap().value, v, "{} -> {}", v, text);
        }
    }

    #[test]
    fn test_format_with_uncertainty() {
        assert_eq!(format_with_uncertainty(5.43146, 0.00012), "5.43146(12)");
        assert_eq!(format_with_uncertainty(0.1254, 0.003), "0.125(3)");
        assert_eq!(format_with_uncertainty(120.4, 12.0), "120(12)");
        assert_eq!(format_with_uncertainty(1.5, 0.0), "1.5()");
    }
}
