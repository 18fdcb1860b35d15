//! # 图片图表
//!
//! 使用 `plotters` 将图表渲染为 PNG 或 SVG 文件。
//!
//! ## 功能
//! - 粉末图样：测量、计算、残差与背景折线，带图例
//! - 单晶对比：I_calc / I_meas 散点与 y = x 参考线
//!
//! ## 依赖关系
//! - 实现 `display::Plotter`
//! - 使用 `plotters` 渲染图表

use crate::display::chart::{Chart, ChartKind, SeriesKind};
use crate::display::Plotter;
use crate::error::{DiffError, Result};
use crate::utils::output::print_success;

use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 800;

/// 图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

fn series_color(kind: SeriesKind) -> RGBColor {
    match kind {
        SeriesKind::Meas => RGBColor(0, 102, 204),
        SeriesKind::Calc => RGBColor(214, 39, 40),
        SeriesKind::Residual => RGBColor(44, 160, 44),
        SeriesKind::Background => RGBColor(127, 127, 127),
    }
}

fn plot_err<E: std::fmt::Debug>(e: E) -> DiffError {
    DiffError::PlotError(format!("{:?}", e))
}

/// 图片绘图器
#[derive(Debug, Clone)]
pub struct ImagePlotter {
    output: PathBuf,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ImagePlotter {
    pub fn new(output: &Path, format: ImageFormat) -> Self {
        Self {
            output: output.to_path_buf(),
            format,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(200);
        self.height = height.max(150);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Plotter for ImagePlotter {
    fn name(&self) -> &'static str {
        self.format.extension()
    }

    fn plot(&self, chart: &Chart) -> Result<()> {
        match self.format {
            ImageFormat::Svg => {
                let root = SVGBackend::new(&self.output, (self.width, self.height))
                    .into_drawing_area();
                draw_chart(&root, chart)?;
                root.present().map_err(plot_err)?;
            }
            ImageFormat::Png => {
                let root = BitMapBackend::new(&self.output, (self.width, self.height))
                    .into_drawing_area();
                draw_chart(&root, chart)?;
                root.present().map_err(plot_err)?;
            }
        }
        print_success(&format!("Chart written to {}", self.output.display()));
        Ok(())
    }
}

/// 绘制图表的核心逻辑
fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    chart: &Chart,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (x0, x1) = chart.x_range();
    let (y0, y1) = chart.y_range();
    let pad = (y1 - y0) * 0.05;
    let (y0, y1) = (y0 - pad, y1 + pad);

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 24).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    match chart.kind {
        ChartKind::Pattern => {
            for series in &chart.series {
                let color = series_color(series.kind);
                ctx.draw_series(LineSeries::new(
                    chart
                        .x
                        .iter()
                        .zip(&series.y)
                        .map(|(x, y)| (*x, *y)),
                    color.stroke_width(2),
                ))
                .map_err(plot_err)?
                .label(series.kind.label())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }
        ChartKind::Comparison => {
            let lo = x0.max(y0);
            let hi = x1.min(y1);
            if hi > lo {
                ctx.draw_series(LineSeries::new(
                    vec![(lo, lo), (hi, hi)],
                    BLACK.mix(0.4).stroke_width(1),
                ))
                .map_err(plot_err)?;
            }
            for series in &chart.series {
                let color = series_color(series.kind);
                ctx.draw_series(
                    chart
                        .x
                        .iter()
                        .zip(&series.y)
                        .map(|(x, y)| Circle::new((*x, *y), 3, color.filled())),
                )
                .map_err(plot_err)?
                .label(series.kind.label())
                .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
            }
        }
    }

    ctx.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name_follows_format() {
        let png = ImagePlotter::new(Path::new("out.png"), ImageFormat::Png);
        let svg = ImagePlotter::new(Path::new("out.svg"), ImageFormat::Svg).with_size(10, 10);
        assert_eq!(png.name(), "png");
        assert_eq!(svg.name(), "svg");
        assert_eq!(svg.output(), Path::new("out.svg"));
        assert_eq!((svg.width, svg.height), (200, 150));
    }
}
