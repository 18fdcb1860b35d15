//! # 显示模块
//!
//! 图表与表格输出。
//!
//! ## 子模块
//! - `chart`：后端无关的图表数据模型
//! - `ascii`：终端 braille 图表
//! - `image`：PNG / SVG 图片
//! - `tables`：`tabled` 表格
//!
//! ## 依赖关系
//! - 被 `commands/` 与 `project/summary.rs` 使用

pub mod ascii;
pub mod chart;
pub mod image;
pub mod tables;

pub use ascii::AsciiPlotter;
pub use chart::{Chart, ChartKind, ChartOptions, Series, SeriesKind};
pub use image::{ImageFormat, ImagePlotter};

use crate::error::Result;

use std::fmt;
use std::path::Path;

/// 绘图后端
pub trait Plotter {
    fn name(&self) -> &'static str;

    fn plot(&self, chart: &Chart) -> Result<()>;
}

/// 可选的绘图后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PlotBackend {
    /// Braille chart in the terminal
    #[default]
    Ascii,
    /// PNG image
    Png,
    /// SVG image
    Svg,
}

impl fmt::Display for PlotBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlotBackend::Ascii => "ascii",
            PlotBackend::Png => "png",
            PlotBackend::Svg => "svg",
        };
        write!(f, "{}", name)
    }
}

impl PlotBackend {
    /// 图片后端的格式，终端后端返回 `None`
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            PlotBackend::Ascii => None,
            PlotBackend::Png => Some(ImageFormat::Png),
            PlotBackend::Svg => Some(ImageFormat::Svg),
        }
    }

    /// 创建绘图器
    ///
    /// `height` 对终端后端是字符行数，对图片后端是像素高度；
    /// 图片后端写入 `output`。
    pub fn create(&self, output: &Path, height: Option<u32>) -> Box<dyn Plotter> {
        match self.image_format() {
            None => Box::new(AsciiPlotter::new(
                height.map(|h| h as usize).unwrap_or(ascii::DEFAULT_HEIGHT),
            )),
            Some(format) => {
                let h = height.unwrap_or(image::DEFAULT_HEIGHT);
                let w = h * image::DEFAULT_WIDTH / image::DEFAULT_HEIGHT;
                Box::new(ImagePlotter::new(output, format).with_size(w, h))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_factory() {
        let ascii = PlotBackend::Ascii.create(Path::new("unused"), None);
        assert_eq!(ascii.name(), "ascii");
        let svg = PlotBackend::Svg.create(Path::new("chart.svg"), Some(600));
        assert_eq!(svg.name(), "svg");
        assert_eq!(PlotBackend::Png.to_string(), "png");
    }
}
