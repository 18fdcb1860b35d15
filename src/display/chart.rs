//! # 图表数据模型
//!
//! 将实验数据整理为与绘图后端无关的 `Chart`：标题、坐标轴标签、横坐标与若干数据系列。
//!
//! ## 功能
//! - 坐标轴标签按散射类型与光束模式选取
//! - 横坐标范围过滤（`x_min`、`x_max`）
//! - 可选残差与背景系列
//! - 单晶实验生成 I_calc / I_meas 对比图
//!
//! ## 依赖关系
//! - 被 `display/ascii.rs`、`display/image.rs` 与 `commands/plot.rs` 使用

use crate::error::{DiffError, Result};
use crate::experiments::{BeamMode, Experiment, ExperimentData, ScatteringType};

/// 数据系列类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Meas,
    Calc,
    Residual,
    Background,
}

impl SeriesKind {
    /// 图例名称
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Meas => "Measured (Imeas)",
            SeriesKind::Calc => "Total calculated (Icalc)",
            SeriesKind::Residual => "Residual (Imeas - Icalc)",
            SeriesKind::Background => "Background (Ibkg)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Series {
    pub kind: SeriesKind,
    pub y: Vec<f64>,
}

/// 图表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// 粉末图样：强度随横坐标变化的折线
    Pattern,
    /// 单晶对比：横坐标为计算强度，测量强度为散点
    Comparison,
}

/// 图表构建选项
#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub x_min: f64,
    pub x_max: f64,
    pub residual: bool,
    pub background: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            x_min: f64::NEG_INFINITY,
            x_max: f64::INFINITY,
            residual: false,
            background: false,
        }
    }
}

/// 与后端无关的图表
#[derive(Debug, Clone)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

/// 按散射类型与光束模式选择坐标轴标签
pub fn axes_labels(scattering: ScatteringType, beam: BeamMode) -> (&'static str, &'static str) {
    match (scattering, beam) {
        (ScatteringType::Bragg, BeamMode::ConstantWavelength) => {
            ("2θ (degree)", "Intensity (arb. units)")
        }
        (ScatteringType::Bragg, BeamMode::TimeOfFlight) => ("TOF (µs)", "Intensity (arb. units)"),
        (ScatteringType::Total, _) => ("r (Å)", "G(r) (Å)"),
    }
}

impl Chart {
    /// 由实验构建图表
    pub fn from_experiment(experiment: &Experiment, options: &ChartOptions) -> Result<Self> {
        if options.x_min > options.x_max {
            return Err(DiffError::InvalidRange(format!(
                "x-min {} is larger than x-max {}",
                options.x_min, options.x_max
            )));
        }
        match &experiment.data {
            ExperimentData::Powder(data) => {
                let keep: Vec<usize> = (0..data.len())
                    .filter(|&i| data.x[i] >= options.x_min && data.x[i] <= options.x_max)
                    .collect();
                if keep.is_empty() {
                    return Err(DiffError::InvalidRange(format!(
                        "no data points of '{}' lie in the selected x-range",
                        experiment.name()
                    )));
                }
                let pick = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();

                let meas = pick(&data.intensity_meas);
                let calc = pick(&data.intensity_calc);
                let has_calc = calc.iter().any(|v| *v != 0.0);

                let mut series = vec![Series {
                    kind: SeriesKind::Meas,
                    y: meas.clone(),
                }];
                if has_calc {
                    series.push(Series {
                        kind: SeriesKind::Calc,
                        y: calc.clone(),
                    });
                }
                if options.residual && has_calc {
                    series.push(Series {
                        kind: SeriesKind::Residual,
                        y: meas.iter().zip(&calc).map(|(m, c)| m - c).collect(),
                    });
                }
                if options.background {
                    series.push(Series {
                        kind: SeriesKind::Background,
                        y: pick(&data.intensity_bkg),
                    });
                }

                let expt_type = experiment.expt_type();
                let (x_label, y_label) =
                    axes_labels(expt_type.scattering_type, expt_type.beam_mode);
                Ok(Self {
                    kind: ChartKind::Pattern,
                    title: format!(
                        "Measured vs calculated data of experiment '{}'",
                        experiment.name()
                    ),
                    x_label: x_label.to_string(),
                    y_label: y_label.to_string(),
                    x: pick(&data.x),
                    series,
                })
            }
            ExperimentData::SingleCrystal(refl) => {
                if refl.items.is_empty() {
                    return Err(DiffError::InvalidRange(format!(
                        "experiment '{}' has no reflections",
                        experiment.name()
                    )));
                }
                let mut items: Vec<_> = refl.items.iter().collect();
                items.sort_by(|a, b| a.intensity_calc.total_cmp(&b.intensity_calc));
                Ok(Self {
                    kind: ChartKind::Comparison,
                    title: format!(
                        "Measured vs calculated intensities of experiment '{}'",
                        experiment.name()
                    ),
                    x_label: "F²calc".to_string(),
                    y_label: "F²meas".to_string(),
                    x: items.iter().map(|r| r.intensity_calc).collect(),
                    series: vec![Series {
                        kind: SeriesKind::Meas,
                        y: items.iter().map(|r| r.intensity_meas).collect(),
                    }],
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 横坐标范围
    pub fn x_range(&self) -> (f64, f64) {
        min_max(self.x.iter().copied())
    }

    /// 所有系列的纵坐标范围
    pub fn y_range(&self) -> (f64, f64) {
        min_max(self.series.iter().flat_map(|s| s.y.iter().copied()))
    }
}

/// 有限值的最小与最大值；无有限值时返回 (0, 1)，两者相等时展开为单位区间
pub fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::{ExperimentType, PowderData, XKind};
    use crate::parsers::MeasuredColumns;

    fn experiment() -> Experiment {
        let mut expt = Experiment::new("hrpt", ExperimentType::default()).unwrap();
        let mut data = PowderData::from_columns(
            XKind::TwoTheta,
            MeasuredColumns {
                x: vec![10.0, 10.5, 11.0, 11.5],
                y: vec![100.0, 120.0, 300.0, 110.0],
                sy: vec![10.0, 11.0, 17.0, 10.5],
            },
        );
        data.intensity_calc = vec![98.0, 125.0, 290.0, 112.0];
        expt.data = ExperimentData::Powder(data);
        expt
    }

    #[test]
    fn test_axes_labels() {
        assert_eq!(
            axes_labels(ScatteringType::Bragg, BeamMode::TimeOfFlight).0,
            "TOF (µs)"
        );
        assert_eq!(
            axes_labels(ScatteringType::Total, BeamMode::ConstantWavelength).1,
            "G(r) (Å)"
        );
    }

    #[test]
    fn test_range_filter_and_residual() {
        let options = ChartOptions {
            x_min: 10.4,
            x_max: 11.2,
            residual: true,
            ..ChartOptions::default()
        };
        let chart = Chart::from_experiment(&experiment(), &options).unwrap();
        assert_eq!(chart.x, vec![10.5, 11.0]);
        assert_eq!(chart.series.len(), 3);
        assert_eq!(chart.series[2].kind, SeriesKind::Residual);
        assert_eq!(chart.series[2].y, vec![-5.0, 10.0]);
        assert_eq!(chart.x_label, "2θ (degree)");
    }

    #[test]
    fn test_empty_range_is_error() {
        let options = ChartOptions {
            x_min: 50.0,
            x_max: 60.0,
            ..ChartOptions::default()
        };
        assert!(Chart::from_experiment(&experiment(), &options).is_err());
        let reversed = ChartOptions {
            x_min: 12.0,
            x_max: 10.0,
            ..ChartOptions::default()
        };
        assert!(Chart::from_experiment(&experiment(), &reversed).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max([3.0, f64::NAN, -1.0].into_iter()), (-1.0, 3.0));
        assert_eq!(min_max(std::iter::empty()), (0.0, 1.0));
        assert_eq!(min_max([2.0].into_iter()), (1.5, 2.5));
    }
}
