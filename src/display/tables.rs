//! # 表格输出
//!
//! 使用 `tabled` 渲染参数、晶胞、原子位置、背景与反射列表。
//!
//! ## 依赖关系
//! - 被 `commands/` 与 `project/summary.rs` 使用

use crate::analysis::EngineInfo;
use crate::core::uncertainty::{format_number, format_with_uncertainty};
use crate::core::Parameter;
use crate::experiments::{BackgroundType, Experiment, Reflections};
use crate::sample_models::SampleModel;

use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Units")]
    units: String,
    #[tabled(rename = "Free")]
    free: String,
    #[tabled(rename = "Fit range")]
    range: String,
}

fn range_text(min: f64, max: f64) -> String {
    let bound = |v: f64| match v {
        v if v == f64::NEG_INFINITY => "-inf".to_string(),
        v if v == f64::INFINITY => "inf".to_string(),
        v => format_number(v),
    };
    format!("[{}, {}]", bound(min), bound(max))
}

/// 参数表
pub fn parameter_table(params: &[&Parameter]) -> String {
    let rows: Vec<ParameterRow> = params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (min, max) = p.fit_range();
            ParameterRow {
                index: i + 1,
                name: p.full_name(),
                value: match p.uncertainty() {
                    Some(su) => format_with_uncertainty(p.value(), su),
                    None => format_number(p.value()),
                },
                units: p.units().to_string(),
                free: if p.is_constrained() {
                    "constrained".to_string()
                } else if p.is_free() {
                    "yes".to_string()
                } else {
                    String::new()
                },
                range: range_text(min, max),
            }
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct KeyValueRow {
    #[tabled(rename = "Parameter")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// 两列键值表
pub fn key_value_table(rows: &[(String, String)]) -> String {
    let rows: Vec<KeyValueRow> = rows
        .iter()
        .map(|(k, v)| KeyValueRow {
            key: k.clone(),
            value: v.clone(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

/// 晶胞参数表
pub fn cell_table(model: &SampleModel) -> String {
    let names = ["a", "b", "c", "alpha", "beta", "gamma"];
    let rows: Vec<(String, String)> = names
        .iter()
        .zip(model.cell.values())
        .map(|(n, v)| (n.to_string(), format!("{:.4}", v)))
        .collect();
    key_value_table(&rows)
}

#[derive(Tabled)]
struct AtomSiteRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Type")]
    type_symbol: String,
    #[tabled(rename = "fract_x")]
    x: String,
    #[tabled(rename = "fract_y")]
    y: String,
    #[tabled(rename = "fract_z")]
    z: String,
    #[tabled(rename = "Occupancy")]
    occupancy: String,
    #[tabled(rename = "B_iso")]
    b_iso: String,
}

/// 原子位置表
pub fn atom_site_table(model: &SampleModel) -> String {
    let rows: Vec<AtomSiteRow> = model
        .atom_sites
        .iter()
        .map(|site| AtomSiteRow {
            label: site.label.value().to_string(),
            type_symbol: site.type_symbol.value().to_string(),
            x: format!("{:.5}", site.fract_x.value()),
            y: format!("{:.5}", site.fract_y.value()),
            z: format!("{:.5}", site.fract_z.value()),
            occupancy: format!("{:.5}", site.occupancy.value()),
            b_iso: format!("{:.5}", site.b_iso.value()),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

/// 背景表（线段点或 Chebyshev 系数）
pub fn background_table(experiment: &Experiment) -> String {
    let background = &experiment.background;
    let rows: Vec<(String, String)> = match background.background_type() {
        BackgroundType::LineSegment => background
            .points()
            .map(|p| (format_number(p.x.value()), format_number(p.y.value())))
            .collect(),
        BackgroundType::ChebyshevPolynomial => background
            .terms()
            .map(|t| (t.order().to_string(), format_number(t.coef.value())))
            .collect(),
    };
    let (k, v) = match background.background_type() {
        BackgroundType::LineSegment => ("X", "Intensity"),
        BackgroundType::ChebyshevPolynomial => ("Order", "Coefficient"),
    };
    let mut builder = tabled::builder::Builder::default();
    builder.push_record([k, v]);
    for (a, b) in rows {
        builder.push_record([a, b]);
    }
    builder.build().with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct ReflectionRow {
    #[tabled(rename = "(hkl)")]
    hkl: String,
    #[tabled(rename = "d (Å)")]
    d: String,
    #[tabled(rename = "I meas")]
    meas: String,
    #[tabled(rename = "σ")]
    su: String,
    #[tabled(rename = "I calc")]
    calc: String,
}

/// 单晶反射表，`max_rows` 限制输出行数
pub fn reflection_table(reflections: &Reflections, max_rows: usize) -> String {
    let rows: Vec<ReflectionRow> = reflections
        .items
        .iter()
        .take(max_rows)
        .map(|r| ReflectionRow {
            hkl: format!("({} {} {})", r.hkl[0], r.hkl[1], r.hkl[2]),
            d: format!("{:.4}", r.d_spacing),
            meas: format!("{:.2}", r.intensity_meas),
            su: format!("{:.2}", r.intensity_meas_su),
            calc: format!("{:.2}", r.intensity_calc),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct EngineRow {
    #[tabled(rename = "Engine")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Available")]
    available: String,
}

pub fn engine_table(engines: &[EngineInfo], current: Option<&str>) -> String {
    let rows: Vec<EngineRow> = engines
        .iter()
        .map(|e| EngineRow {
            name: if Some(e.name) == current {
                format!("{} *", e.name)
            } else {
                e.name.to_string()
            },
            description: e.description.to_string(),
            available: if e.available { "yes" } else { "no" }.to_string(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_table_marks_state() {
        let mut free = Parameter::new("length_a", 3.89).with_units("Å").range(0.0, 1000.0);
        free.set_free(true).unwrap();
        let mut tied = Parameter::new("length_b", 3.89);
        tied.set_constrained(true);
        let table = parameter_table(&[&free, &tied]);
        assert!(table.contains("length_a"));
        assert!(table.contains("yes"));
        assert!(table.contains("constrained"));
        assert!(table.contains("[0.0, 1000.0]"));
        assert!(table.contains("[-inf, inf]"));
    }

    #[test]
    fn test_cell_table() {
        let model = SampleModel::new("m").unwrap();
        let table = cell_table(&model);
        assert!(table.contains("gamma"));
        assert!(table.contains("90.0000"));
    }
}
