//! # 对称操作
//!
//! 以 (R, t) 表示的空间群对称操作，支持 Jones 记法 (`-x+1/2,y,z+1/4`)
//! 的解析与输出、操作复合、生成元闭包及等效位置展开。
//!
//! ## 约定
//! - 平移分量约化到 [0, 1)
//! - 等效位置按周期距离去重，容差 [`POSITION_TOLERANCE`]
//!
//! ## 依赖关系
//! - 被 `crystallography/space_groups.rs` 使用
//! - 被 `sample_models/sample_model.rs` 展开晶胞内原子

use crate::error::{DiffError, Result};

use std::fmt;

/// 等效位置去重容差（分数坐标）
pub const POSITION_TOLERANCE: f64 = 1e-4;

const TRANSLATION_TOLERANCE: f64 = 1e-6;

/// 闭包运算的操作数上限（Fd-3m 含心化为 192）
const MAX_GROUP_ORDER: usize = 192;

/// 对称操作 x' = R x + t
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymOp {
    pub rotation: [[i32; 3]; 3],
    pub translation: [f64; 3],
}

impl SymOp {
    pub fn identity() -> Self {
        Self {
            rotation: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
            translation: [0.0; 3],
        }
    }

    /// 解析 Jones 记法
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: String| DiffError::InvalidSymmetryOperator {
            op: text.to_string(),
            reason,
        };

        let components: Vec<&str> = text.split(',').collect();
        if components.len() != 3 {
            return Err(invalid(format!(
                "expected 3 components, found {}",
                components.len()
            )));
        }

        let mut op = SymOp {
            rotation: [[0; 3]; 3],
            translation: [0.0; 3],
        };
        for (row, component) in components.iter().enumerate() {
            let (rot, trans) = parse_component(component).map_err(invalid)?;
            op.rotation[row] = rot;
            op.translation[row] = trans;
        }
        Ok(op.normalized())
    }

    /// 复合 self ∘ other：先作用 other 再作用 self
    pub fn compose(&self, other: &SymOp) -> SymOp {
        let mut rotation = [[0; 3]; 3];
        let mut translation = self.translation;
        for i in 0..3 {
            for j in 0..3 {
                rotation[i][j] = (0..3)
                    .map(|k| self.rotation[i][k] * other.rotation[k][j])
                    .sum();
                translation[i] += self.rotation[i][j] as f64 * other.translation[j];
            }
        }
        SymOp {
            rotation,
            translation,
        }
        .normalized()
    }

    /// 作用于分数坐标
    pub fn apply(&self, p: &[f64; 3]) -> [f64; 3] {
        let mut out = self.translation;
        for (i, row) in self.rotation.iter().enumerate() {
            out[i] += row[0] as f64 * p[0] + row[1] as f64 * p[1] + row[2] as f64 * p[2];
        }
        out
    }

    /// 附加平移（心化矢量）
    pub fn translated(&self, t: &[f64; 3]) -> SymOp {
        let mut op = *self;
        for (dst, src) in op.translation.iter_mut().zip(t.iter()) {
            *dst += src;
        }
        op.normalized()
    }

    /// 平移约化到 [0, 1)
    pub fn normalized(mut self) -> Self {
        for t in self.translation.iter_mut() {
            *t = wrap_unit(*t);
        }
        self
    }

    /// 在晶格平移意义下相等
    pub fn equivalent(&self, other: &SymOp) -> bool {
        self.rotation == other.rotation
            && self
                .translation
                .iter()
                .zip(other.translation.iter())
                .all(|(a, b)| periodic_distance(*a, *b) < TRANSLATION_TOLERANCE)
    }

    /// 旋转部分的行列式（+1 为纯旋转，-1 含反演）
    pub fn determinant(&self) -> i32 {
        let m = &self.rotation;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}

impl fmt::Display for SymOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = (0..3)
            .map(|i| format_component(&self.rotation[i], self.translation[i]))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// 解析单个分量，如 `-x+1/2`、`x-y`、`1/4+z`
fn parse_component(expr: &str) -> std::result::Result<([i32; 3], f64), String> {
    let chars: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Err("empty component".to_string());
    }

    let mut rot = [0i32; 3];
    let mut trans = 0.0;
    let mut pos = 0;

    while pos < chars.len() {
        let mut sign = 1.0;
        while pos < chars.len() && (chars[pos] == '+' || chars[pos] == '-') {
            if chars[pos] == '-' {
                sign = -sign;
            }
            pos += 1;
        }
        if pos >= chars.len() {
            return Err("dangling sign".to_string());
        }

        let start = pos;
        while pos < chars.len()
            && (chars[pos].is_ascii_digit() || chars[pos] == '.' || chars[pos] == '/')
        {
            pos += 1;
        }
        let number = if pos > start {
            let text: String = chars[start..pos].iter().collect();
            Some(parse_fraction(&text)?)
        } else {
            None
        };

        if pos < chars.len() && chars[pos] == '*' {
            pos += 1;
        }

        let axis = chars
            .get(pos)
            .and_then(|c| match c.to_ascii_lowercase() {
                'x' => Some(0),
                'y' => Some(1),
                'z' => Some(2),
                _ => None,
            });

        match (axis, number) {
            (Some(axis), coef) => {
                let coef = sign * coef.unwrap_or(1.0);
                if coef.fract() != 0.0 {
                    return Err(format!("non-integer coefficient {}", coef));
                }
                rot[axis] += coef as i32;
                pos += 1;
            }
            (None, Some(value)) => trans += sign * value,
            (None, None) => {
                return Err(format!("unexpected character '{}'", chars[pos]));
            }
        }
    }

    Ok((rot, trans))
}

fn parse_fraction(text: &str) -> std::result::Result<f64, String> {
    let bad = || format!("invalid number '{}'", text);
    match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().map_err(|_| bad())?;
            let den: f64 = den.parse().map_err(|_| bad())?;
            if den == 0.0 {
                return Err(bad());
            }
            Ok(num / den)
        }
        None => text.parse().map_err(|_| bad()),
    }
}

fn format_component(row: &[i32; 3], t: f64) -> String {
    let mut s = String::new();
    for (coef, axis) in row.iter().zip(['x', 'y', 'z']) {
        match *coef {
            0 => {}
            1 => {
                if !s.is_empty() {
                    s.push('+');
                }
                s.push(axis);
            }
            -1 => {
                s.push('-');
                s.push(axis);
            }
            c => {
                if c > 0 && !s.is_empty() {
                    s.push('+');
                }
                s.push_str(&format!("{}{}", c, axis));
            }
        }
    }
    if t.abs() > TRANSLATION_TOLERANCE {
        s.push('+');
        s.push_str(&format_fraction(t));
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}

fn format_fraction(t: f64) -> String {
    for den in [2, 3, 4, 6, 8, 12] {
        let num = t * den as f64;
        if (num - num.round()).abs() < 1e-6 {
            return format!("{}/{}", num.round() as i64, den);
        }
    }
    format!("{:.4}", t)
}

/// 约化到 [0, 1)
pub fn wrap_unit(v: f64) -> f64 {
    let w = v - v.floor();
    if w > 1.0 - TRANSLATION_TOLERANCE {
        0.0
    } else {
        w
    }
}

fn periodic_distance(a: f64, b: f64) -> f64 {
    let d = a - b;
    (d - d.round()).abs()
}

/// 由生成元与心化矢量生成完整操作集
pub fn generate_group(generators: &[SymOp], centring: &[[f64; 3]]) -> Vec<SymOp> {
    let mut ops = vec![SymOp::identity()];
    for g in generators {
        let g = g.normalized();
        if !ops.iter().any(|o| o.equivalent(&g)) {
            ops.push(g);
        }
    }

    loop {
        let snapshot = ops.clone();
        let mut added = false;
        for a in &snapshot {
            for b in &snapshot {
                let c = a.compose(b);
                if !ops.iter().any(|o| o.equivalent(&c)) {
                    ops.push(c);
                    added = true;
                }
            }
        }
        if !added || ops.len() > MAX_GROUP_ORDER {
            break;
        }
    }

    let mut full: Vec<SymOp> = Vec::with_capacity(ops.len() * (centring.len() + 1));
    for t in std::iter::once(&[0.0; 3]).chain(centring.iter()) {
        for op in &ops {
            let shifted = op.translated(t);
            if !full.iter().any(|o| o.equivalent(&shifted)) {
                full.push(shifted);
            }
        }
    }
    full
}

/// 展开等效位置（约化到 [0, 1) 并去重）
pub fn equivalent_positions(ops: &[SymOp], position: &[f64; 3]) -> Vec<[f64; 3]> {
    let mut positions: Vec<[f64; 3]> = Vec::new();
    for op in ops {
        let p = op.apply(position);
        let p = [wrap_unit(p[0]), wrap_unit(p[1]), wrap_unit(p[2])];
        let duplicate = positions.iter().any(|q| {
            q.iter()
                .zip(p.iter())
                .all(|(a, b)| periodic_distance(*a, *b) < POSITION_TOLERANCE)
        });
        if !duplicate {
            positions.push(p);
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let op = SymOp::parse("-x+1/2, y, z+1/4").unwrap();
        assert_eq!(op.rotation, [[-1, 0, 0], [0, 1, 0], [0, 0, 1]]);
        assert_eq!(op.translation, [0.5, 0.0, 0.25]);
        assert_eq!(op.to_string(), "-x+1/2,y,z+1/4");

        let op = SymOp::parse("x-y,x,1/2+z").unwrap();
        assert_eq!(op.rotation, [[1, -1, 0], [1, 0, 0], [0, 0, 1]]);
        assert_eq!(op.to_string(), "x-y,x,z+1/2");
    }

    #[test]
    fn test_parse_negative_translation_wraps() {
        let op = SymOp::parse("x-1/4,y,z").unwrap();
        assert!((op.translation[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_parse_errors() {
        assert!(SymOp::parse("x,y").is_err());
        assert!(SymOp::parse("x,y,q").is_err());
        assert!(SymOp::parse("x,y,z+").is_err());
    }

    #[test]
    fn test_compose_inversion_squared_is_identity() {
        let inv = SymOp::parse("-x,-y,-z").unwrap();
        assert!(inv.compose(&inv).equivalent(&SymOp::identity()));
        assert_eq!(inv.determinant(), -1);
    }

    #[test]
    fn test_group_order_p4_mmm() {
        let gens: Vec<SymOp> = ["-y,x,z", "x,-y,-z", "-x,-y,-z"]
            .iter()
            .map(|s| SymOp::parse(s).unwrap())
            .collect();
        assert_eq!(generate_group(&gens, &[]).len(), 16);
    }

    #[test]
    fn test_equivalent_positions_dedup() {
        let gens = vec![SymOp::parse("-x,-y,-z").unwrap()];
        let ops = generate_group(&gens, &[]);
        assert_eq!(equivalent_positions(&ops, &[0.0, 0.0, 0.0]).len(), 1);
        assert_eq!(equivalent_positions(&ops, &[0.5, 0.0, 0.0]).len(), 1);
        assert_eq!(equivalent_positions(&ops, &[0.1, 0.2, 0.3]).len(), 2);
    }
}
