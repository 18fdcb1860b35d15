//! # 背景类别
//!
//! 两种背景：
//! - 折线背景：控制点 (x, 强度)，按 x 排序线性插值，两端外推为常数
//! - Chebyshev 多项式：(阶数, 系数)，x 先按数据范围映射到 [-1, 1]
//!
//! 切换背景类型会清空已有的点或项。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 与 `analysis/calculators/` 使用

use crate::core::cif::{format_value, CifWriter};
use crate::core::uncertainty::{format_number, parse_number};
use crate::core::{Collection, Keyed, Parameter};
use crate::error::{DiffError, Result};
use crate::experiments::enums::BackgroundType;
use crate::parsers::CifBlock;
use crate::utils::output::print_debug;

pub const CATEGORY: &str = "background";
const TAG_TYPE: &str = "_pd_background.type";
const TAG_LINE_X: &str = "_pd_background.line_segment_X";
const TAG_LINE_Y: &str = "_pd_background.line_segment_intensity";
const TAG_CHEB_ORDER: &str = "_pd_background.Chebyshev_order";
const TAG_CHEB_COEF: &str = "_pd_background.Chebyshev_coef";

/// 折线背景控制点
#[derive(Debug, Clone)]
pub struct LineSegmentPoint {
    id: String,
    pub x: Parameter,
    pub y: Parameter,
}

impl LineSegmentPoint {
    pub fn new(x: f64, y: f64) -> Self {
        let id = format_number(x).replace(|c: char| c == '.' || c == '-', "_");
        let mut point = Self {
            id: id.clone(),
            x: Parameter::new("x", x)
                .cif(TAG_LINE_X)
                .descriptor()
                .with_description("Background point position")
                .category(CATEGORY),
            y: Parameter::new("y", y)
                .cif(TAG_LINE_Y)
                .with_description("Background intensity")
                .category(CATEGORY),
        };
        point.x.set_entry(&id);
        point.y.set_entry(&id);
        point
    }
}

impl Keyed for LineSegmentPoint {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Chebyshev 多项式项
#[derive(Debug, Clone)]
pub struct ChebyshevTerm {
    id: String,
    order: usize,
    pub coef: Parameter,
}

impl ChebyshevTerm {
    pub fn new(order: usize, coef: f64) -> Self {
        let id = order.to_string();
        let mut coef = Parameter::new("coef", coef)
            .cif(TAG_CHEB_COEF)
            .with_description("Chebyshev coefficient")
            .category(CATEGORY);
        coef.set_entry(&id);
        Self { id, order, coef }
    }

    pub fn order(&self) -> usize {
        self.order
    }
}

impl Keyed for ChebyshevTerm {
    fn key(&self) -> &str {
        &self.id
    }
}

/// 背景
#[derive(Debug, Clone, Default)]
pub struct Background {
    background_type: BackgroundType,
    points: Collection<LineSegmentPoint>,
    terms: Collection<ChebyshevTerm>,
    datablock: String,
}

impl Background {
    pub fn new(background_type: BackgroundType) -> Self {
        Self {
            background_type,
            ..Self::default()
        }
    }

    pub fn background_type(&self) -> BackgroundType {
        self.background_type
    }

    /// 切换类型并清空已有内容
    pub fn set_type(&mut self, background_type: BackgroundType) {
        self.background_type = background_type;
        self.points.clear();
        self.terms.clear();
    }

    pub fn points(&self) -> impl Iterator<Item = &LineSegmentPoint> {
        self.points.iter()
    }

    pub fn terms(&self) -> impl Iterator<Item = &ChebyshevTerm> {
        self.terms.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len() + self.terms.len()
    }

    /// 添加折线控制点；同一 x 的点被替换
    pub fn add_point(&mut self, x: f64, y: f64) -> Result<()> {
        if self.background_type != BackgroundType::LineSegment {
            return Err(DiffError::InvalidArgument(format!(
                "background type is '{}', cannot add a line-segment point",
                self.background_type
            )));
        }
        let mut point = LineSegmentPoint::new(x, y);
        point.x.bind(&self.datablock);
        point.y.bind(&self.datablock);
        self.points.add(point);
        self.points
            .sort_by(|a, b| a.x.value().total_cmp(&b.x.value()));
        Ok(())
    }

    /// 添加 Chebyshev 项；同阶的项被替换
    pub fn add_term(&mut self, order: usize, coef: f64) -> Result<()> {
        if self.background_type != BackgroundType::ChebyshevPolynomial {
            return Err(DiffError::InvalidArgument(format!(
                "background type is '{}', cannot add a Chebyshev term",
                self.background_type
            )));
        }
        let mut term = ChebyshevTerm::new(order, coef);
        term.coef.bind(&self.datablock);
        self.terms.add(term);
        self.terms.sort_by(|a, b| a.order.cmp(&b.order));
        Ok(())
    }

    /// 在给定 x 上计算背景
    pub fn calculate(&self, x: &[f64]) -> Vec<f64> {
        if self.is_empty() {
            print_debug("No background points found, background set to zero");
            return vec![0.0; x.len()];
        }
        match self.background_type {
            BackgroundType::LineSegment => self.interpolate(x),
            BackgroundType::ChebyshevPolynomial => self.chebyshev(x),
        }
    }

    fn interpolate(&self, x: &[f64]) -> Vec<f64> {
        let nodes: Vec<(f64, f64)> = self
            .points
            .iter()
            .map(|p| (p.x.value(), p.y.value()))
            .collect();
        let (first, last) = (nodes[0], nodes[nodes.len() - 1]);
        x.iter()
            .map(|&xi| {
                if xi.is_nan() || xi <= first.0 {
                    return first.1;
                }
                if xi >= last.0 {
                    return last.1;
                }
                let i = nodes
                    .partition_point(|n| n.0 <= xi)
                    .clamp(1, nodes.len() - 1);
                let (x0, y0) = nodes[i - 1];
                let (x1, y1) = nodes[i];
                if x1 == x0 {
                    y0
                } else {
                    y0 + (y1 - y0) * (xi - x0) / (x1 - x0)
                }
            })
            .collect()
    }

    fn chebyshev(&self, x: &[f64]) -> Vec<f64> {
        let (min, max) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let span = max - min;
        let max_order = self.terms.iter().map(|t| t.order).max().unwrap_or(0);
        let mut coefs = vec![0.0; max_order + 1];
        for term in self.terms.iter() {
            coefs[term.order] = term.coef.value();
        }
        x.iter()
            .map(|&xi| {
                let u = if span > 0.0 {
                    2.0 * (xi - min) / span - 1.0
                } else {
                    0.0
                };
                chebyshev_sum(&coefs, u)
            })
            .collect()
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        self.points
            .iter()
            .map(|p| &p.y)
            .chain(self.terms.iter().map(|t| &t.coef))
            .collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params: Vec<&mut Parameter> = self.points.iter_mut().map(|p| &mut p.y).collect();
        params.extend(self.terms.iter_mut().map(|t| &mut t.coef));
        params
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<()> {
        if let Some(raw) = block.find_value(TAG_TYPE) {
            self.set_type(raw.parse()?);
        }
        if let Some(lp) = block.find_loop(TAG_LINE_X) {
            if block.find_value(TAG_TYPE).is_none() {
                self.set_type(BackgroundType::LineSegment);
            }
            let (Some(cx), Some(cy)) = (lp.column(TAG_LINE_X), lp.column(TAG_LINE_Y)) else {
                return Err(DiffError::MissingCifItem {
                    block: block.name.clone(),
                    tag: TAG_LINE_Y.to_string(),
                });
            };
            for row in &lp.rows {
                let x = parse_number(&row[cx])
                    .map(|n| n.value)
                    .ok_or_else(|| DiffError::ParseError {
                        format: "CIF".to_string(),
                        path: block.name.clone(),
                        reason: format!("invalid background position '{}'", row[cx]),
                    })?;
                let mut point = LineSegmentPoint::new(x, 0.0);
                point.y.load_cif(&row[cy])?;
                point.x.bind(&self.datablock);
                point.y.bind(&self.datablock);
                self.points.add(point);
            }
            self.points
                .sort_by(|a, b| a.x.value().total_cmp(&b.x.value()));
        }
        if let Some(lp) = block.find_loop(TAG_CHEB_ORDER) {
            if block.find_value(TAG_TYPE).is_none() {
                self.set_type(BackgroundType::ChebyshevPolynomial);
            }
            let (Some(co), Some(cc)) = (lp.column(TAG_CHEB_ORDER), lp.column(TAG_CHEB_COEF)) else {
                return Err(DiffError::MissingCifItem {
                    block: block.name.clone(),
                    tag: TAG_CHEB_COEF.to_string(),
                });
            };
            for row in &lp.rows {
                let order = parse_order(&row[co]).ok_or_else(|| DiffError::ParseError {
                    format: "CIF".to_string(),
                    path: block.name.clone(),
                    reason: format!("invalid Chebyshev order '{}'", row[co]),
                })?;
                let mut term = ChebyshevTerm::new(order, 0.0);
                term.coef.load_cif(&row[cc])?;
                term.coef.bind(&self.datablock);
                self.terms.add(term);
            }
            self.terms.sort_by(|a, b| a.order.cmp(&b.order));
        }
        Ok(())
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        w.item(TAG_TYPE, &format_value(self.background_type.as_str()));
        match self.background_type {
            BackgroundType::LineSegment => {
                let rows: Vec<Vec<String>> = self
                    .points
                    .iter()
                    .map(|p| vec![format_number(p.x.value()), p.y.cif_value()])
                    .collect();
                w.loop_table(&[TAG_LINE_X, TAG_LINE_Y], &rows, None);
            }
            BackgroundType::ChebyshevPolynomial => {
                let rows: Vec<Vec<String>> = self
                    .terms
                    .iter()
                    .map(|t| vec![t.order.to_string(), t.coef.cif_value()])
                    .collect();
                w.loop_table(&[TAG_CHEB_ORDER, TAG_CHEB_COEF], &rows, None);
            }
        }
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        self.datablock = datablock.to_string();
        for p in self.points.iter_mut() {
            p.x.bind(datablock);
            p.y.bind(datablock);
        }
        for t in self.terms.iter_mut() {
            t.coef.bind(datablock);
        }
    }
}

fn parse_order(raw: &str) -> Option<usize> {
    let value: f64 = raw.trim().parse().ok()?;
    if value < 0.0 || value.fract() != 0.0 {
        return None;
    }
    Some(value as usize)
}

/// Clenshaw 递推求 Σ cₙ Tₙ(u)
fn chebyshev_sum(coefs: &[f64], u: f64) -> f64 {
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for &c in coefs.iter().skip(1).rev() {
        let b0 = c + 2.0 * u * b1 - b2;
        b2 = b1;
        b1 = b0;
    }
    coefs.first().copied().unwrap_or(0.0) + u * b1 - b2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    #[test]
    fn test_line_segment_interpolation() {
        let mut bkg = Background::new(BackgroundType::LineSegment);
        bkg.add_point(30.0, 20.0).unwrap();
        bkg.add_point(10.0, 10.0).unwrap();
        let y = bkg.calculate(&[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(y, vec![10.0, 10.0, 15.0, 20.0, 20.0]);
        assert!(bkg.add_term(0, 1.0).is_err());
    }

    #[test]
    fn test_interpolation_handles_any_abscissa() {
        let mut bkg = Background::new(BackgroundType::LineSegment);
        bkg.add_point(10.0, 5.0).unwrap();
        let y = bkg.calculate(&[f64::NAN, 0.0, 10.0, 20.0]);
        assert_eq!(y, vec![5.0; 4]);

        bkg.add_point(20.0, 15.0).unwrap();
        let y = bkg.calculate(&[f64::NAN, f64::NEG_INFINITY, 15.0, f64::INFINITY]);
        assert_eq!(y, vec![5.0, 5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_empty_background_is_zero() {
        let bkg = Background::new(BackgroundType::ChebyshevPolynomial);
        assert_eq!(bkg.calculate(&[1.0, 2.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_chebyshev_honours_order() {
        let mut bkg = Background::new(BackgroundType::ChebyshevPolynomial);
        bkg.add_term(2, 1.0).unwrap();
        // T2(u) = 2u² - 1, u = -1, 0, 1
        let y = bkg.calculate(&[0.0, 5.0, 10.0]);
        assert!((y[0] - 1.0).abs() < 1e-12);
        assert!((y[1] + 1.0).abs() < 1e-12);
        assert!((y[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_switch_type_clears() {
        let mut bkg = Background::new(BackgroundType::LineSegment);
        bkg.add_point(1.0, 1.0).unwrap();
        bkg.set_type(BackgroundType::ChebyshevPolynomial);
        assert!(bkg.is_empty());
    }

    #[test]
    fn test_cif_round_trip() {
        let mut bkg = Background::new(BackgroundType::LineSegment);
        bkg.add_point(10.0, 170.0).unwrap();
        bkg.add_point(165.0, 190.0).unwrap();
        bkg.parameters_mut()[0].set_free(true).unwrap();
        let mut w = CifWriter::new();
        w.data_block("e");
        bkg.write_cif(&mut w);
        let doc = parse_cif_content(&w.finish()).unwrap();
        let mut again = Background::default();
        again.load_cif(&doc.blocks[0]).unwrap();
        assert_eq!(again.len(), 2);
        assert!(again.parameters()[0].is_free());
        assert_eq!(again.calculate(&[87.5]), vec![180.0]);
    }
}
