//! # 别名与用户约束
//!
//! 别名把短标签映射到参数全名；约束 `lhs = expr` 把左侧别名对应的
//! 参数设为右侧表达式的值，并将其标记为受约束（不再自由）。
//!
//! CIF 表示（写入 `analysis.cif`）：
//! ```text
//! loop_
//! _alias.label
//! _alias.param_uid
//! biso_La  lbco.atom_site.La.b_iso
//! loop_
//! _constraint.lhs_alias
//! _constraint.rhs_expr
//! biso_Ba  biso_La
//! ```
//!
//! ## 依赖关系
//! - 被 `analysis/workflow.rs` 与 `analysis/fitting/fitter.rs` 使用
//! - 使用 `analysis/expression.rs` 解析右侧表达式

use super::expression::Expr;
use crate::core::cif::{format_value, CifWriter};
use crate::core::collection::{Collection, Keyed};
use crate::core::parameter::{HasParameters, Parameter};
use crate::error::{DiffError, Result};
use crate::experiments::Experiments;
use crate::parsers::CifBlock;
use crate::sample_models::SampleModels;

use regex::Regex;
use std::sync::OnceLock;

const ALIAS_TAGS: [&str; 2] = ["_alias.label", "_alias.param_uid"];
const CONSTRAINT_TAGS: [&str; 2] = ["_constraint.lhs_alias", "_constraint.rhs_expr"];

/// 参数别名
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    label: String,
    param: String,
}

impl Alias {
    pub fn new(label: &str, param: &str) -> Result<Self> {
        validate_label(label)?;
        if param.trim().is_empty() {
            return Err(DiffError::InvalidArgument(format!(
                "alias '{}' must reference a parameter",
                label
            )));
        }
        Ok(Self {
            label: label.to_string(),
            param: param.trim().to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// 参数全名
    pub fn param(&self) -> &str {
        &self.param
    }
}

impl Keyed for Alias {
    fn key(&self) -> &str {
        &self.label
    }
}

fn validate_label(label: &str) -> Result<()> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let valid = RE
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(label));
    if !valid || label == "pi" {
        return Err(DiffError::InvalidArgument(format!(
            "alias label '{}' must be an identifier (letters, digits, '_')",
            label
        )));
    }
    Ok(())
}

/// 用户约束 `lhs_alias = rhs_expr`
#[derive(Debug, Clone)]
pub struct Constraint {
    lhs_alias: String,
    rhs_expr: String,
    expr: Expr,
}

impl Constraint {
    pub fn new(lhs_alias: &str, rhs_expr: &str) -> Result<Self> {
        validate_label(lhs_alias)?;
        let expr = Expr::parse(rhs_expr)?;
        if expr.variables().iter().any(|v| v == lhs_alias) {
            return Err(DiffError::InvalidExpression {
                expr: rhs_expr.to_string(),
                reason: format!("'{}' cannot depend on itself", lhs_alias),
            });
        }
        Ok(Self {
            lhs_alias: lhs_alias.to_string(),
            rhs_expr: rhs_expr.trim().to_string(),
            expr,
        })
    }

    /// 解析 `lhs = rhs` 形式的方程
    pub fn from_equation(equation: &str) -> Result<Self> {
        let Some((lhs, rhs)) = equation.split_once('=') else {
            return Err(DiffError::InvalidExpression {
                expr: equation.to_string(),
                reason: "expected 'alias = expression'".to_string(),
            });
        };
        Self::new(lhs.trim(), rhs.trim())
    }

    pub fn lhs_alias(&self) -> &str {
        &self.lhs_alias
    }

    pub fn rhs_expr(&self) -> &str {
        &self.rhs_expr
    }
}

impl Keyed for Constraint {
    fn key(&self) -> &str {
        &self.lhs_alias
    }
}

/// 别名与约束集合
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    aliases: Collection<Alias>,
    constraints: Collection<Constraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_alias(&mut self, label: &str, param: &str) -> Result<()> {
        self.aliases.add(Alias::new(label, param)?);
        Ok(())
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<()> {
        for name in std::iter::once(constraint.lhs_alias.clone()).chain(constraint.expr.variables()) {
            if !self.aliases.contains(&name) {
                return Err(DiffError::not_found("alias", &name));
            }
        }
        self.constraints.add(constraint);
        Ok(())
    }

    /// 移除约束并返回其左侧参数的全名
    pub fn remove_constraint(&mut self, lhs_alias: &str) -> Result<Option<String>> {
        self.constraints
            .remove(lhs_alias)
            .ok_or_else(|| DiffError::not_found("constraint", lhs_alias))?;
        Ok(self.aliases.get(lhs_alias).map(|a| a.param.clone()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.iter()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.aliases.is_empty()
    }

    /// 约束左侧参数的全名
    pub fn constrained_parameters(&self) -> Vec<String> {
        self.constraints
            .iter()
            .filter_map(|c| self.aliases.get(&c.lhs_alias).map(|a| a.param.clone()))
            .collect()
    }

    /// 按顺序应用所有约束
    pub fn apply(&self, models: &mut SampleModels, experiments: &mut Experiments) -> Result<()> {
        for constraint in self.constraints.iter() {
            let lookup = |label: &str| -> Option<f64> {
                let alias = self.aliases.get(label)?;
                find_parameter(models, experiments, &alias.param).map(Parameter::value)
            };
            let value = constraint.expr.evaluate(&lookup)?;
            let target = self
                .aliases
                .get(&constraint.lhs_alias)
                .ok_or_else(|| DiffError::not_found("alias", &constraint.lhs_alias))?;
            let param = find_parameter_mut(models, experiments, &target.param)
                .ok_or_else(|| DiffError::not_found("parameter", &target.param))?;
            param.set_constrained(true);
            param.set_value(value)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<()> {
        if let (Some(labels), Some(params)) = (
            block.find_values(ALIAS_TAGS[0]),
            block.find_values(ALIAS_TAGS[1]),
        ) {
            for (label, param) in labels.iter().zip(&params) {
                self.add_alias(label, param)?;
            }
        }
        if let (Some(lhs), Some(rhs)) = (
            block.find_values(CONSTRAINT_TAGS[0]),
            block.find_values(CONSTRAINT_TAGS[1]),
        ) {
            for (l, r) in lhs.iter().zip(&rhs) {
                self.add_constraint(Constraint::new(l, r)?)?;
            }
        }
        Ok(())
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        let alias_rows: Vec<Vec<String>> = self
            .aliases
            .iter()
            .map(|a| vec![format_value(&a.label), format_value(&a.param)])
            .collect();
        if !alias_rows.is_empty() {
            w.blank().loop_table(&ALIAS_TAGS, &alias_rows, None);
        }
        let constraint_rows: Vec<Vec<String>> = self
            .constraints
            .iter()
            .map(|c| vec![format_value(&c.lhs_alias), format_value(&c.rhs_expr)])
            .collect();
        if !constraint_rows.is_empty() {
            w.blank().loop_table(&CONSTRAINT_TAGS, &constraint_rows, None);
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 参数查找
// ─────────────────────────────────────────────────────────────

/// 在样品模型与实验中按全名查找参数
pub fn find_parameter<'a>(
    models: &'a SampleModels,
    experiments: &'a Experiments,
    full_name: &str,
) -> Option<&'a Parameter> {
    models
        .find_parameter(full_name)
        .or_else(|| experiments.find_parameter(full_name))
}

pub fn find_parameter_mut<'a>(
    models: &'a mut SampleModels,
    experiments: &'a mut Experiments,
    full_name: &str,
) -> Option<&'a mut Parameter> {
    if let Some(p) = models.find_parameter_mut(full_name) {
        return Some(p);
    }
    experiments.find_parameter_mut(full_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    const MODEL: &str = "data_lbco
_space_group.name_H-M_alt 'P m -3 m'
_cell.length_a 3.89
loop_
_atom_site.label
_atom_site.type_symbol
_atom_site.fract_x
_atom_site.fract_y
_atom_site.fract_z
_atom_site.occupancy
_atom_site.B_iso_or_equiv
La La 0 0 0 0.5 0.5()
Ba Ba 0 0 0 0.5 0.2
";

    fn setup() -> (SampleModels, Experiments, Constraints) {
        let mut models = SampleModels::new();
        models.add_from_cif_str(MODEL).unwrap();
        let mut c = Constraints::new();
        c.add_alias("biso_La", "lbco.atom_site.La.b_iso").unwrap();
        c.add_alias("biso_Ba", "lbco.atom_site.Ba.b_iso").unwrap();
        (models, Experiments::new(), c)
    }

    #[test]
    fn test_apply_sets_value_and_flag() {
        let (mut models, mut expts, mut c) = setup();
        c.add_constraint(Constraint::from_equation("biso_Ba = 2 * biso_La").unwrap())
            .unwrap();
        c.apply(&mut models, &mut expts).unwrap();
        let p = find_parameter(&models, &expts, "lbco.atom_site.Ba.b_iso").unwrap();
        assert_eq!(p.value(), 1.0);
        assert!(p.is_constrained());
        assert!(!p.is_free());
    }

    #[test]
    fn test_unknown_alias_rejected() {
        let (_, _, mut c) = setup();
        let err = c.add_constraint(Constraint::new("biso_Ba", "biso_X + 1").unwrap());
        assert!(matches!(err, Err(DiffError::NotFound { .. })));
        assert!(Constraint::new("biso_Ba", "biso_Ba * 2").is_err());
        assert!(Alias::new("1abc", "x.y").is_err());
    }

    #[test]
    fn test_remove_returns_target() {
        let (_, _, mut c) = setup();
        c.add_constraint(Constraint::new("biso_Ba", "biso_La").unwrap())
            .unwrap();
        assert_eq!(
            c.remove_constraint("biso_Ba").unwrap().as_deref(),
            Some("lbco.atom_site.Ba.b_iso")
        );
        assert!(c.remove_constraint("biso_Ba").is_err());
    }

    #[test]
    fn test_cif_round_trip() {
        let (_, _, mut c) = setup();
        c.add_constraint(Constraint::new("biso_Ba", "biso_La / 2 + 0.1").unwrap())
            .unwrap();
        let mut w = CifWriter::new();
        w.data_block("analysis");
        c.write_cif(&mut w);
        let text = w.finish();
        assert!(text.contains("\"biso_La / 2 + 0.1\""));

        let doc = parse_cif_content(&text).unwrap();
        let mut loaded = Constraints::new();
        loaded.load_cif(doc.first().unwrap()).unwrap();
        assert_eq!(loaded.constraints().count(), 1);
        assert_eq!(
            loaded.constraints().next().unwrap().rhs_expr(),
            "biso_La / 2 + 0.1"
        );
    }
}
