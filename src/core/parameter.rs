//! # 参数与描述符
//!
//! 模型中所有数值量都是 [`Parameter`]：带不确定度、可精修标志、
//! 物理范围与拟合范围，以及由 `数据块.类别[.条目].名称` 组成的唯一全名。
//! 文本量使用 [`StringDescriptor`]，可限定允许值或匹配模式。
//!
//! ## 依赖关系
//! - 被 `sample_models/`、`experiments/`、`analysis/` 使用
//! - 使用 `core/uncertainty.rs` 处理 `value(su)` 记法
//! - 使用 `regex` 校验标签格式

use crate::core::cif::format_value;
use crate::core::uncertainty::{self, format_number, format_with_uncertainty};
use crate::error::{DiffError, Result};

use regex::Regex;
use serde::Serialize;

/// 参数在项目中的位置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// 数据块名称（样品模型或实验名）
    pub datablock: String,
    /// 类别代码，例如 `cell`、`atom_site`
    pub category: String,
    /// 集合类别中的条目名，例如原子标签
    pub entry: Option<String>,
}

/// 开区间端点向内偏移一个相对机器精度
fn inside(bound: f64, direction: f64) -> f64 {
    if bound.is_finite() {
        bound + direction * f64::EPSILON * bound.abs().max(1.0)
    } else {
        bound
    }
}

/// 数值参数
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    name: &'static str,
    cif_names: Vec<&'static str>,
    value: f64,
    uncertainty: Option<f64>,
    free: bool,
    constrained: bool,
    refinable: bool,
    physical_min: f64,
    physical_max: f64,
    min_open: bool,
    max_open: bool,
    fit_min: f64,
    fit_max: f64,
    units: &'static str,
    description: &'static str,
    start_value: Option<f64>,
    identity: Identity,
}

impl Parameter {
    /// 创建可精修参数，范围不受限
    pub fn new(name: &'static str, value: f64) -> Self {
        Self {
            name,
            cif_names: Vec::new(),
            value,
            uncertainty: None,
            free: false,
            constrained: false,
            refinable: true,
            physical_min: f64::NEG_INFINITY,
            physical_max: f64::INFINITY,
            min_open: false,
            max_open: false,
            fit_min: f64::NEG_INFINITY,
            fit_max: f64::INFINITY,
            units: "",
            description: "",
            start_value: None,
            identity: Identity::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // 构建器
    // ─────────────────────────────────────────────────────────────

    /// 追加 CIF 标签（第一个为规范标签）
    pub fn cif(mut self, tag: &'static str) -> Self {
        self.cif_names.push(tag);
        self
    }

    pub fn with_units(mut self, units: &'static str) -> Self {
        self.units = units;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// 设置物理范围，拟合范围同步
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.physical_min = min;
        self.physical_max = max;
        self.fit_min = min;
        self.fit_max = max;
        self
    }

    /// 物理下限不可取到；拟合下限移到其内侧
    pub fn open_min(mut self) -> Self {
        self.min_open = true;
        self.fit_min = inside(self.physical_min, 1.0);
        self
    }

    /// 物理上限不可取到
    pub fn open_max(mut self) -> Self {
        self.max_open = true;
        self.fit_max = inside(self.physical_max, -1.0);
        self
    }

    /// 标记为不可精修的数值描述符
    pub fn descriptor(mut self) -> Self {
        self.refinable = false;
        self
    }

    pub fn category(mut self, code: &str) -> Self {
        self.identity.category = code.to_string();
        self
    }

    // ─────────────────────────────────────────────────────────────
    // 访问器
    // ─────────────────────────────────────────────────────────────

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn uncertainty(&self) -> Option<f64> {
        self.uncertainty
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained
    }

    pub fn is_refinable(&self) -> bool {
        self.refinable
    }

    pub fn units(&self) -> &'static str {
        self.units
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn physical_range(&self) -> (f64, f64) {
        (self.physical_min, self.physical_max)
    }

    pub fn fit_range(&self) -> (f64, f64) {
        (self.fit_min, self.fit_max)
    }

    pub fn start_value(&self) -> Option<f64> {
        self.start_value
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// 规范 CIF 标签
    pub fn cif_name(&self) -> &'static str {
        self.cif_names.first().copied().unwrap_or(self.name)
    }

    /// 全部 CIF 标签（含别名）
    pub fn cif_names(&self) -> &[&'static str] {
        &self.cif_names
    }

    /// 唯一全名：`datablock.category[.entry].name`
    pub fn full_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if !self.identity.datablock.is_empty() {
            parts.push(&self.identity.datablock);
        }
        if !self.identity.category.is_empty() {
            parts.push(&self.identity.category);
        }
        if let Some(entry) = &self.identity.entry {
            parts.push(entry);
        }
        parts.push(self.name);
        parts.join(".")
    }

    /// 供最小化器使用的标识符
    pub fn minimizer_uid(&self) -> String {
        self.full_name().replace('.', "__")
    }

    // ─────────────────────────────────────────────────────────────
    // 修改
    // ─────────────────────────────────────────────────────────────

    /// 设置数值，超出物理范围时报错
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        if value == self.value {
            return Ok(());
        }
        if !value.is_finite() || !self.within_physical(value) {
            return Err(DiffError::OutOfRange {
                name: self.full_name(),
                value,
                min: self.physical_min,
                max: self.physical_max,
            });
        }
        self.value = value;
        Ok(())
    }

    pub fn set_uncertainty(&mut self, uncertainty: Option<f64>) {
        self.uncertainty = uncertainty.filter(|u| u.is_finite() && *u >= 0.0);
    }

    /// 设置是否参与精修
    pub fn set_free(&mut self, free: bool) -> Result<()> {
        if free && !self.refinable {
            return Err(DiffError::NotRefinable(self.full_name()));
        }
        self.free = free;
        if free {
            self.constrained = false;
        }
        Ok(())
    }

    /// 约束参数不能同时为自由参数
    pub fn set_constrained(&mut self, constrained: bool) {
        self.constrained = constrained;
        if constrained {
            self.free = false;
        }
    }

    /// 设置拟合范围，必须落在物理范围内
    pub fn set_fit_range(&mut self, min: f64, max: f64) -> Result<()> {
        if min >= max || !self.within_physical(min) || !self.within_physical(max) {
            return Err(DiffError::InvalidRange(format!(
                "fit range [{}, {}] for '{}' must satisfy {} <= min < max <= {}",
                min,
                max,
                self.full_name(),
                self.physical_min,
                self.physical_max
            )));
        }
        self.fit_min = min;
        self.fit_max = max;
        Ok(())
    }

    fn within_physical(&self, value: f64) -> bool {
        let above = if self.min_open {
            value > self.physical_min
        } else {
            value >= self.physical_min
        };
        let below = if self.max_open {
            value < self.physical_max
        } else {
            value <= self.physical_max
        };
        above && below
    }

    pub fn set_start_value(&mut self, value: Option<f64>) {
        self.start_value = value;
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        self.identity.datablock = datablock.to_string();
    }

    pub(crate) fn set_entry(&mut self, entry: &str) {
        self.identity.entry = Some(entry.to_string());
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    /// CIF 值：自由参数带括号以保留精修标志
    pub fn cif_value(&self) -> String {
        if self.free {
            match self.uncertainty {
                Some(su) => format_with_uncertainty(self.value, su),
                None => format!("{}()", format_number(self.value)),
            }
        } else {
            format_number(self.value)
        }
    }

    /// 从 CIF 原始值载入
    pub fn load_cif(&mut self, raw: &str) -> Result<()> {
        let Some(number) = uncertainty::parse_number(raw) else {
            if uncertainty::is_missing(raw) {
                return Ok(());
            }
            return Err(DiffError::ParseError {
                format: "CIF".to_string(),
                path: self.cif_name().to_string(),
                reason: format!("'{}' is not a number", raw),
            });
        };
        self.set_value(number.value)?;
        self.set_uncertainty(number.uncertainty);
        self.free = number.marked && self.refinable;
        Ok(())
    }
}

/// 文本描述符
#[derive(Debug, Clone, Serialize)]
pub struct StringDescriptor {
    name: &'static str,
    cif_names: Vec<&'static str>,
    value: String,
    #[serde(skip)]
    allowed: Option<&'static [&'static str]>,
    #[serde(skip)]
    pattern: Option<&'static str>,
    description: &'static str,
    identity: Identity,
}

impl StringDescriptor {
    pub fn new(name: &'static str, value: &str) -> Self {
        Self {
            name,
            cif_names: Vec::new(),
            value: value.to_string(),
            allowed: None,
            pattern: None,
            description: "",
            identity: Identity::default(),
        }
    }

    pub fn cif(mut self, tag: &'static str) -> Self {
        self.cif_names.push(tag);
        self
    }

    pub fn allowed(mut self, values: &'static [&'static str]) -> Self {
        self.allowed = Some(values);
        self
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn category(mut self, code: &str) -> Self {
        self.identity.category = code.to_string();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn cif_name(&self) -> &'static str {
        self.cif_names.first().copied().unwrap_or(self.name)
    }

    pub fn cif_names(&self) -> &[&'static str] {
        &self.cif_names
    }

    pub fn full_name(&self) -> String {
        let mut name = format!("{}.{}", self.identity.datablock, self.identity.category);
        if let Some(entry) = &self.identity.entry {
            name.push('.');
            name.push_str(entry);
        }
        name.push('.');
        name.push_str(self.name);
        name
    }

    /// 设置值，校验允许值（大小写不敏感）与匹配模式
    pub fn set_value(&mut self, value: &str) -> Result<()> {
        let value = value.trim();
        if let Some(allowed) = self.allowed {
            let canonical = allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(value))
                .ok_or_else(|| DiffError::InvalidChoice {
                    name: self.name.to_string(),
                    value: value.to_string(),
                    allowed: allowed.join(", "),
                })?;
            self.value = canonical.to_string();
            return Ok(());
        }
        if let Some(pattern) = self.pattern {
            let re = Regex::new(pattern).map_err(|e| DiffError::Other(e.to_string()))?;
            if !re.is_match(value) {
                return Err(DiffError::InvalidChoice {
                    name: self.name.to_string(),
                    value: value.to_string(),
                    allowed: format!("values matching {}", pattern),
                });
            }
        }
        self.value = value.to_string();
        Ok(())
    }

    pub fn cif_value(&self) -> String {
        format_value(&self.value)
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        self.identity.datablock = datablock.to_string();
    }

    pub(crate) fn set_entry(&mut self, entry: &str) {
        self.identity.entry = Some(entry.to_string());
    }
}

/// 持有参数的组件
pub trait HasParameters {
    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// 按全名查找参数
    fn find_parameter(&self, full_name: &str) -> Option<&Parameter> {
        self.parameters()
            .into_iter()
            .find(|p| p.full_name() == full_name)
    }

    /// 按全名查找可变参数
    fn find_parameter_mut(&mut self, full_name: &str) -> Option<&mut Parameter> {
        self.parameters_mut()
            .into_iter()
            .find(|p| p.full_name() == full_name)
    }

    fn free_parameters(&self) -> Vec<&Parameter> {
        self.parameters().into_iter().filter(|p| p.is_free()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length_a() -> Parameter {
        let mut p = Parameter::new("length_a", 10.0)
            .cif("_cell.length_a")
            .with_units("Å")
            .range(0.0, 1000.0)
            .category("cell");
        p.bind("si");
        p
    }

    #[test]
    fn test_full_name_and_uid() {
        let mut p = length_a();
        assert_eq!(p.full_name(), "si.cell.length_a");
        assert_eq!(p.minimizer_uid(), "si__cell__length_a");
        p.set_entry("Si1");
        assert_eq!(p.full_name(), "si.cell.Si1.length_a");
    }

    #[test]
    fn test_set_value_respects_physical_range() {
        let mut p = length_a();
        assert!(p.set_value(5.43).is_ok());
        assert!(p.set_value(-1.0).is_err());
        assert!(p.set_value(f64::NAN).is_err());
        assert_eq!(p.value(), 5.43);
    }

    #[test]
    fn test_open_bounds_exclude_endpoints() {
        let mut p = Parameter::new("angle", 90.0).range(0.0, 180.0).open_min().open_max();
        assert!(p.set_value(0.0).is_err());
        assert!(p.set_value(180.0).is_err());
        assert!(p.set_value(179.9).is_ok());
        let (lo, hi) = p.fit_range();
        assert!(lo > 0.0 && hi < 180.0);
        assert!(p.set_value(lo).is_ok());
        assert!(p.set_fit_range(0.0, 100.0).is_err());
    }

    #[test]
    fn test_builders_and_accessors() {
        let p = Parameter::new("wavelength", 1.494)
            .with_units("Å")
            .with_description("Incident wavelength");
        assert_eq!(p.units(), "Å");
        assert_eq!(p.description(), "Incident wavelength");
        let d = StringDescriptor::new("label", "Si").with_description("Atom label");
        assert_eq!(d.description(), "Atom label");
    }

    #[test]
    fn test_descriptor_cannot_be_freed() {
        let mut p = Parameter::new("order", 0.0).descriptor();
        assert!(matches!(p.set_free(true), Err(DiffError::NotRefinable(_))));
    }

    #[test]
    fn test_constrained_is_never_free() {
        let mut p = length_a();
        p.set_free(true).unwrap();
        p.set_constrained(true);
        assert!(!p.is_free());
    }

    #[test]
    fn test_cif_round_trip_keeps_free_flag() {
        let mut p = length_a();
        p.load_cif("5.4315(12)").unwrap();
        assert!(p.is_free());
        assert_eq!(p.cif_value(), "5.4315(12)");

        p.load_cif("5.4").unwrap();
        assert!(!p.is_free());
        assert_eq!(p.cif_value(), "5.4");

        p.load_cif("5.4()").unwrap();
        assert!(p.is_free());
        assert_eq!(p.cif_value(), "5.4()");
    }

    #[test]
    fn test_fit_range_within_physical() {
        let mut p = length_a();
        assert!(p.set_fit_range(5.0, 6.0).is_ok());
        assert!(p.set_fit_range(6.0, 5.0).is_err());
        assert!(p.set_fit_range(-1.0, 5.0).is_err());
    }

    #[test]
    fn test_string_descriptor_allowed_values() {
        let mut d = StringDescriptor::new("sample_form", "powder")
            .allowed(&["powder", "single crystal"]);
        d.set_value("Single Crystal").unwrap();
        assert_eq!(d.value(), "single crystal");
        assert!(d.set_value("liquid").is_err());
    }

    #[test]
    fn test_string_descriptor_pattern() {
        let mut d = StringDescriptor::new("label", "Si").pattern(r"^[A-Za-z0-9_]+$");
        assert!(d.set_value("O1").is_ok());
        assert!(d.set_value("bad label").is_err());
    }
}
