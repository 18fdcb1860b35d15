//! # 终端图表
//!
//! 使用 braille 点阵（`drawille`）在终端绘制图样，各系列分别栅格化后逐字符合并，
//! 重叠处按系列顺序着色。
//!
//! ## 依赖关系
//! - 实现 `display::Plotter`
//! - 使用 `drawille` 栅格化，`colored` 着色，`console` 获取终端宽度

use crate::display::chart::{Chart, ChartKind, SeriesKind};
use crate::display::Plotter;
use crate::error::Result;
use crate::utils::output::print_block;

use colored::{Color, Colorize};
use drawille::Canvas;

/// 默认图表高度（字符行）
pub const DEFAULT_HEIGHT: usize = 25;

/// y 轴刻度列宽
const Y_AXIS_WIDTH: usize = 10;

const MIN_WIDTH: usize = 20;
const MAX_WIDTH: usize = 240;

const BRAILLE_BASE: u32 = 0x2800;

fn series_color(kind: SeriesKind) -> Color {
    match kind {
        SeriesKind::Meas => Color::Blue,
        SeriesKind::Calc => Color::Red,
        SeriesKind::Residual => Color::Green,
        SeriesKind::Background => Color::Yellow,
    }
}

/// 终端绘图器
#[derive(Debug, Clone)]
pub struct AsciiPlotter {
    height: usize,
    width: Option<usize>,
}

impl Default for AsciiPlotter {
    fn default() -> Self {
        Self::new(DEFAULT_HEIGHT)
    }
}

impl AsciiPlotter {
    pub fn new(height: usize) -> Self {
        Self {
            height: height.max(3),
            width: None,
        }
    }

    /// 固定图表宽度（字符列），不再查询终端
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width.clamp(MIN_WIDTH, MAX_WIDTH));
        self
    }

    fn chart_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            let (_, cols) = console::Term::stdout().size();
            (cols as usize)
                .saturating_sub(Y_AXIS_WIDTH + 2)
                .clamp(MIN_WIDTH, MAX_WIDTH)
        })
    }

    /// 渲染为多行字符串
    pub fn render(&self, chart: &Chart) -> String {
        let cols = self.chart_width();
        let rows = self.height;
        let px_w = (cols * 2) as u32;
        let px_h = (rows * 4) as u32;

        let (x0, x1) = chart.x_range();
        let (y0, y1) = chart.y_range();
        let to_px = |x: f64| (((x - x0) / (x1 - x0)) * (px_w - 1) as f64).round().max(0.0) as u32;
        let to_py = |y: f64| (((y1 - y) / (y1 - y0)) * (px_h - 1) as f64).round().max(0.0) as u32;

        // 每个单元格：braille 点位 + 最后落笔的系列
        let mut grid: Vec<Vec<(u8, Option<SeriesKind>)>> = vec![vec![(0, None); cols]; rows];

        for series in &chart.series {
            let mut canvas = Canvas::new(px_w, px_h);
            let points: Vec<(u32, u32)> = chart
                .x
                .iter()
                .zip(&series.y)
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(x, y)| (to_px(*x).min(px_w - 1), to_py(*y).min(px_h - 1)))
                .collect();
            match chart.kind {
                ChartKind::Pattern if points.len() > 1 => {
                    for pair in points.windows(2) {
                        canvas.line(pair[0].0, pair[0].1, pair[1].0, pair[1].1);
                    }
                }
                _ => {
                    for (x, y) in &points {
                        canvas.set(*x, *y);
                    }
                }
            }
            merge_layer(&mut grid, &canvas.frame(), series.kind);
        }

        let mut out = String::new();
        for (r, row) in grid.iter().enumerate() {
            let label = if r == 0 {
                format_tick(y1)
            } else if r == rows - 1 {
                format_tick(y0)
            } else if r == rows / 2 {
                format_tick((y0 + y1) / 2.0)
            } else {
                String::new()
            };
            out.push_str(&format!("{:>width$} ┤", label, width = Y_AXIS_WIDTH));
            for (bits, kind) in row {
                let ch = char::from_u32(BRAILLE_BASE + *bits as u32).unwrap_or(' ');
                match kind {
                    Some(kind) if *bits != 0 => {
                        out.push_str(&ch.to_string().color(series_color(*kind)).to_string())
                    }
                    _ => out.push(' '),
                }
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "{:>width$} └{}\n",
            "",
            "─".repeat(cols),
            width = Y_AXIS_WIDTH
        ));
        let left = format_tick(x0);
        let right = format_tick(x1);
        let gap = cols.saturating_sub(left.chars().count() + right.chars().count());
        out.push_str(&format!(
            "{:>width$}  {}{}{}\n",
            "",
            left,
            " ".repeat(gap),
            right,
            width = Y_AXIS_WIDTH
        ));
        out.push_str(&format!(
            "{:>width$}  {}",
            "",
            chart.x_label,
            width = Y_AXIS_WIDTH
        ));
        out
    }

    /// 图例与范围说明
    pub fn legend(&self, chart: &Chart) -> String {
        let (x0, x1) = match (chart.x.first(), chart.x.last()) {
            (Some(a), Some(b)) => (*a, *b),
            _ => (0.0, 0.0),
        };
        let mut lines = vec![
            chart.title.bold().to_string(),
            format!(
                "Displaying data for selected x-range from {} to {} ({} points)",
                format_tick(x0),
                format_tick(x1),
                chart.len()
            ),
            "Legend:".to_string(),
        ];
        for series in &chart.series {
            lines.push(format!(
                "{} {}",
                "────".color(series_color(series.kind)),
                series.kind.label()
            ));
        }
        lines.join("\n")
    }
}

impl Plotter for AsciiPlotter {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn plot(&self, chart: &Chart) -> Result<()> {
        print_block(&self.legend(chart));
        print_block(&self.render(chart));
        Ok(())
    }
}

/// 将单个系列的 braille 帧按位或合并到网格
fn merge_layer(grid: &mut [Vec<(u8, Option<SeriesKind>)>], frame: &str, kind: SeriesKind) {
    for (r, line) in frame.lines().enumerate() {
        let Some(row) = grid.get_mut(r) else { break };
        for (c, ch) in line.chars().enumerate() {
            let Some(cell) = row.get_mut(c) else { break };
            let bits = braille_bits(ch);
            if bits != 0 {
                cell.0 |= bits;
                cell.1 = Some(kind);
            }
        }
    }
}

fn braille_bits(ch: char) -> u8 {
    let code = ch as u32;
    if (BRAILLE_BASE..=BRAILLE_BASE + 0xFF).contains(&code) {
        (code - BRAILLE_BASE) as u8
    } else {
        0
    }
}

/// 刻度文本：极大或极小的值用科学计数法
fn format_tick(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-2..1e5).contains(&a) {
        format!("{:.2e}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::chart::Series;

    fn chart() -> Chart {
        Chart {
            kind: ChartKind::Pattern,
            title: "test".to_string(),
            x_label: "2θ (degree)".to_string(),
            y_label: "Intensity (arb. units)".to_string(),
            x: vec![10.0, 20.0, 30.0, 40.0],
            series: vec![
                Series {
                    kind: SeriesKind::Meas,
                    y: vec![0.0, 10.0, 5.0, 0.0],
                },
                Series {
                    kind: SeriesKind::Calc,
                    y: vec![1.0, 9.0, 5.0, 1.0],
                },
            ],
        }
    }

    #[test]
    fn test_render_dimensions() {
        colored::control::set_override(false);
        let plotter = AsciiPlotter::new(8).with_width(40);
        let text = plotter.render(&chart());
        let lines: Vec<&str> = text.lines().collect();
        // 8 行图 + x 轴 + 刻度 + 轴标签
        assert_eq!(lines.len(), 11);
        assert!(lines[0].trim_start().starts_with("10.00"));
        assert!(lines[7].trim_start().starts_with("0.00"));
        assert!(lines[9].contains("10.00") && lines[9].contains("40.00"));
        assert!(text.chars().any(|c| braille_bits(c) != 0));
    }

    #[test]
    fn test_legend() {
        colored::control::set_override(false);
        let legend = AsciiPlotter::default().legend(&chart());
        assert!(legend.contains("from 10.00 to 40.00 (4 points)"));
        assert!(legend.contains("Measured (Imeas)"));
        assert!(legend.contains("Total calculated (Icalc)"));
    }

    #[test]
    fn test_braille_bits() {
        assert_eq!(braille_bits(' '), 0);
        assert_eq!(braille_bits('\u{2801}'), 1);
        assert_eq!(braille_bits('\u{28FF}'), 0xFF);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(12.5), "12.50");
        assert_eq!(format_tick(250000.0), "2.50e5");
    }
}
