//! # 排除区间类别
//!
//! `_excluded_region.start/end`：闭区间内的数据点不参与拟合。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 使用

use crate::core::uncertainty::{format_number, parse_number};
use crate::core::cif::CifWriter;
use crate::error::{DiffError, Result};
use crate::parsers::CifBlock;

use serde::Serialize;

const TAG_START: &str = "_excluded_region.start";
const TAG_END: &str = "_excluded_region.end";

/// 排除区间 [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExcludedRegion {
    pub start: f64,
    pub end: f64,
}

impl ExcludedRegion {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if start.is_nan() || end.is_nan() || start > end {
            return Err(DiffError::InvalidRange(format!(
                "excluded region start {} is greater than end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.start && x <= self.end
    }
}

/// 排除区间列表
#[derive(Debug, Clone, Default)]
pub struct ExcludedRegions {
    regions: Vec<ExcludedRegion>,
}

impl ExcludedRegions {
    pub fn add(&mut self, region: ExcludedRegion) {
        self.regions.push(region);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExcludedRegion> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// x 是否落在任一排除区间内
    pub fn excludes(&self, x: f64) -> bool {
        self.regions.iter().any(|r| r.contains(x))
    }

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<()> {
        let Some(lp) = block.find_loop(TAG_START) else {
            return Ok(());
        };
        let (Some(cs), Some(ce)) = (lp.column(TAG_START), lp.column(TAG_END)) else {
            return Err(DiffError::MissingCifItem {
                block: block.name.clone(),
                tag: TAG_END.to_string(),
            });
        };
        let number = |raw: &str| {
            parse_number(raw)
                .map(|n| n.value)
                .ok_or_else(|| DiffError::ParseError {
                    format: "CIF".to_string(),
                    path: block.name.clone(),
                    reason: format!("invalid excluded region bound '{}'", raw),
                })
        };
        for row in &lp.rows {
            self.add(ExcludedRegion::new(number(&row[cs])?, number(&row[ce])?)?);
        }
        Ok(())
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        let rows: Vec<Vec<String>> = self
            .regions
            .iter()
            .map(|r| vec![format_number(r.start), format_number(r.end)])
            .collect();
        w.loop_table(&[TAG_START, TAG_END], &rows, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_interval() {
        let region = ExcludedRegion::new(10.0, 20.0).unwrap();
        assert!(region.contains(10.0));
        assert!(region.contains(20.0));
        assert!(!region.contains(20.01));
        assert!(ExcludedRegion::new(5.0, 1.0).is_err());
    }

    #[test]
    fn test_cif_loop() {
        let doc = crate::parsers::parse_cif_content(
            "data_e\nloop_\n_excluded_region.start\n_excluded_region.end\n0 5\n160 180\n",
        )
        .unwrap();
        let mut regions = ExcludedRegions::default();
        regions.load_cif(&doc.blocks[0]).unwrap();
        assert_eq!(regions.len(), 2);
        assert!(regions.excludes(170.0));
        assert!(!regions.excludes(50.0));
    }
}
