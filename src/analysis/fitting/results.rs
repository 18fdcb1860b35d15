//! # 拟合结果
//!
//! 汇总拟合状态、χ²ᵣ、耗时、各参数的起始值/拟合值/不确定度，
//! 以及可靠性因子。可序列化为 JSON，也可以表格形式输出。

use super::metrics::ReliabilityFactors;
use crate::core::uncertainty::{format_number, format_with_uncertainty};
use crate::utils::output::{print_block, print_header, print_info, print_success, print_warning};

use serde::Serialize;
use tabled::{Table, Tabled};

/// 单个拟合参数
#[derive(Debug, Clone, Serialize)]
pub struct FittedParameter {
    pub full_name: String,
    pub units: String,
    pub start: f64,
    pub value: f64,
    pub uncertainty: Option<f64>,
}

impl FittedParameter {
    /// 相对起始值的变化（百分比），起始值为 0 时为 `None`
    pub fn change_percent(&self) -> Option<f64> {
        (self.start != 0.0).then(|| (self.value - self.start) / self.start.abs() * 100.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FitResults {
    pub success: bool,
    pub message: String,
    /// 目标函数求值次数
    pub iterations: usize,
    pub minimizer: String,
    pub reduced_chi_square: f64,
    pub fitting_time_s: f64,
    pub parameters: Vec<FittedParameter>,
    pub reliability: ReliabilityFactors,
    pub experiments: Vec<String>,
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Fitted")]
    fitted: String,
    #[tabled(rename = "Units")]
    units: String,
    #[tabled(rename = "Change (%)")]
    change: String,
}

impl FitResults {
    /// 参数结果表
    pub fn parameter_table(&self) -> String {
        let rows: Vec<ParameterRow> = self
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| ParameterRow {
                index: i + 1,
                name: p.full_name.clone(),
                start: format_number(p.start),
                fitted: match p.uncertainty {
                    Some(su) => format_with_uncertainty(p.value, su),
                    None => format_number(p.value),
                },
                units: p.units.clone(),
                change: p
                    .change_percent()
                    .map(|c| format!("{:+.2}", c))
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        Table::new(&rows).to_string()
    }

    pub fn show(&self) {
        print_header("Fit results");
        if self.success {
            print_success(&format!("Fit succeeded: {}", self.message));
        } else {
            print_warning(&format!("Fit did not converge: {}", self.message));
        }
        print_info(&format!("Minimizer: {}", self.minimizer));
        print_info(&format!("Experiments: {}", self.experiments.join(", ")));
        print_info(&format!("Iterations: {}", self.iterations));
        print_info(&format!("Fitting time: {:.2} seconds", self.fitting_time_s));
        print_info(&format!(
            "Goodness-of-fit (reduced χ²): {:.2}",
            self.reduced_chi_square
        ));
        let rf = &self.reliability;
        print_info(&format!("R-factor (Rf): {:.2}%", rf.r_factor * 100.0));
        print_info(&format!(
            "R-factor squared (Rf²): {:.2}%",
            rf.r_factor_squared * 100.0
        ));
        print_info(&format!(
            "Weighted R-factor (wR): {:.2}%",
            rf.weighted_r_factor * 100.0
        ));
        print_block(&self.parameter_table());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> FitResults {
        FitResults {
            success: true,
            message: "fit converged".to_string(),
            iterations: 12,
            minimizer: "lm".to_string(),
            reduced_chi_square: 1.2,
            fitting_time_s: 0.1,
            parameters: vec![FittedParameter {
                full_name: "lbco.cell.length_a".to_string(),
                units: "Å".to_string(),
                start: 3.88,
                value: 3.8909,
                uncertainty: Some(0.0003),
            }],
            reliability: ReliabilityFactors::default(),
            experiments: vec!["hrpt".to_string()],
        }
    }

    #[test]
    fn test_change_percent() {
        let r = results();
        let p = &r.parameters[0];
        assert!((p.change_percent().unwrap() - 0.2809).abs() < 1e-3);
    }

    #[test]
    fn test_table_contains_fitted_value() {
        let table = results().parameter_table();
        assert!(table.contains("lbco.cell.length_a"));
        assert!(table.contains("3.8909(3)"));
    }

    #[test]
    fn test_json() {
        let json = serde_json::to_string(&results()).unwrap();
        assert!(json.contains("\"reduced_chi_square\":1.2"));
    }
}
