//! # 空间群表
//!
//! 常用空间群的 Hermann-Mauguin 符号、国际表编号、坐标系代码与生成元。
//!
//! ## 功能
//! - 按 H-M 符号查找（忽略空格与大小写，支持别名）
//! - 由编号推断晶系
//! - 按晶系给出晶胞参数约束
//!
//! ## 依赖关系
//! - 被 `sample_models/space_group.rs`、`sample_models/cell.rs` 使用
//! - 使用 `crystallography/symmetry.rs` 生成操作集

use crate::crystallography::symmetry::{generate_group, SymOp};
use crate::error::{DiffError, Result};

use serde::Serialize;
use std::fmt;

const P: &[[f64; 3]] = &[];
const C: &[[f64; 3]] = &[[0.5, 0.5, 0.0]];
const I: &[[f64; 3]] = &[[0.5, 0.5, 0.5]];
const F: &[[f64; 3]] = &[[0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0]];
const R_HEX: &[[f64; 3]] = &[[2.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], [1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0]];

/// 空间群表条目
#[derive(Debug, Clone, Copy)]
pub struct SpaceGroupEntry {
    pub name_hm: &'static str,
    pub aliases: &'static [&'static str],
    pub it_number: u16,
    pub coordinate_code: &'static str,
    pub generators: &'static [&'static str],
    pub centring: &'static [[f64; 3]],
}

/// 内置空间群表
pub static SPACE_GROUPS: &[SpaceGroupEntry] = &[
    SpaceGroupEntry {
        name_hm: "P 1",
        aliases: &[],
        it_number: 1,
        coordinate_code: "",
        generators: &[],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "P -1",
        aliases: &[],
        it_number: 2,
        coordinate_code: "",
        generators: &["-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "P 21/c",
        aliases: &["P 1 21/c 1"],
        it_number: 14,
        coordinate_code: "b1",
        generators: &["-x,y+1/2,-z+1/2", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "C 2/c",
        aliases: &["C 1 2/c 1"],
        it_number: 15,
        coordinate_code: "b1",
        generators: &["-x,y,-z+1/2", "-x,-y,-z"],
        centring: C,
    },
    SpaceGroupEntry {
        name_hm: "P 21 21 21",
        aliases: &[],
        it_number: 19,
        coordinate_code: "",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "P b c a",
        aliases: &["P 21/b 21/c 21/a"],
        it_number: 61,
        coordinate_code: "abc",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "P n m a",
        aliases: &["P 21/n 21/m 21/a"],
        it_number: 62,
        coordinate_code: "abc",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "C m c m",
        aliases: &["C 2/m 2/c 21/m"],
        it_number: 63,
        coordinate_code: "abc",
        generators: &["-x,-y,z+1/2", "-x,y,-z+1/2", "-x,-y,-z"],
        centring: C,
    },
    SpaceGroupEntry {
        name_hm: "P 4/m m m",
        aliases: &["P 4/m 2/m 2/m"],
        it_number: 123,
        coordinate_code: "",
        generators: &["-y,x,z", "x,-y,-z", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "I 4/m m m",
        aliases: &["I 4/m 2/m 2/m"],
        it_number: 139,
        coordinate_code: "",
        generators: &["-y,x,z", "x,-y,-z", "-x,-y,-z"],
        centring: I,
    },
    SpaceGroupEntry {
        name_hm: "I 41/a m d",
        aliases: &["I 41/a 2/m 2/d"],
        it_number: 141,
        coordinate_code: "2",
        generators: &["-y+1/4,x+3/4,z+1/4", "x,-y,-z", "-x,-y,-z"],
        centring: I,
    },
    SpaceGroupEntry {
        name_hm: "P -3 m 1",
        aliases: &["P -3 2/m 1"],
        it_number: 164,
        coordinate_code: "",
        generators: &["-y,x-y,z", "y,x,-z", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "R -3 m",
        aliases: &["R -3 2/m", "R -3 m H"],
        it_number: 166,
        coordinate_code: "h",
        generators: &["-y,x-y,z", "y,x,-z", "-x,-y,-z"],
        centring: R_HEX,
    },
    SpaceGroupEntry {
        name_hm: "R -3 c",
        aliases: &["R -3 2/c", "R -3 c H"],
        it_number: 167,
        coordinate_code: "h",
        generators: &["-y,x-y,z", "y,x,-z+1/2", "-x,-y,-z"],
        centring: R_HEX,
    },
    SpaceGroupEntry {
        name_hm: "P 6/m m m",
        aliases: &["P 6/m 2/m 2/m"],
        it_number: 191,
        coordinate_code: "",
        generators: &["-y,x-y,z", "-x,-y,z", "y,x,-z", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "P 63/m m c",
        aliases: &["P 63/m 2/m 2/c"],
        it_number: 194,
        coordinate_code: "",
        generators: &["-y,x-y,z", "-x,-y,z+1/2", "y,x,-z", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "P a -3",
        aliases: &["P 21/a -3"],
        it_number: 205,
        coordinate_code: "",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2", "z,x,y", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "I a -3",
        aliases: &["I 21/a -3"],
        it_number: 206,
        coordinate_code: "",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2", "z,x,y", "-x,-y,-z"],
        centring: I,
    },
    SpaceGroupEntry {
        name_hm: "P m -3 m",
        aliases: &["P 4/m -3 2/m"],
        it_number: 221,
        coordinate_code: "",
        generators: &["z,x,y", "-y,x,z", "-x,-y,-z"],
        centring: P,
    },
    SpaceGroupEntry {
        name_hm: "F m -3 m",
        aliases: &["F 4/m -3 2/m"],
        it_number: 225,
        coordinate_code: "",
        generators: &["z,x,y", "-y,x,z", "-x,-y,-z"],
        centring: F,
    },
    SpaceGroupEntry {
        name_hm: "F d -3 m",
        aliases: &["F 41/d -3 2/m"],
        it_number: 227,
        coordinate_code: "2",
        generators: &[
            "-x+3/4,-y+1/4,z+1/2",
            "-x+1/4,y+1/2,-z+3/4",
            "z,x,y",
            "y+3/4,x+1/4,-z+1/2",
            "-x,-y,-z",
        ],
        centring: F,
    },
    SpaceGroupEntry {
        name_hm: "I m -3 m",
        aliases: &["I 4/m -3 2/m"],
        it_number: 229,
        coordinate_code: "",
        generators: &["z,x,y", "-y,x,z", "-x,-y,-z"],
        centring: I,
    },
];

/// 晶系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrystalSystem {
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Tetragonal,
    Trigonal,
    Hexagonal,
    Cubic,
}

impl CrystalSystem {
    /// 由国际表编号推断晶系
    pub fn from_it_number(number: u16) -> Option<Self> {
        match number {
            1..=2 => Some(Self::Triclinic),
            3..=15 => Some(Self::Monoclinic),
            16..=74 => Some(Self::Orthorhombic),
            75..=142 => Some(Self::Tetragonal),
            143..=167 => Some(Self::Trigonal),
            168..=194 => Some(Self::Hexagonal),
            195..=230 => Some(Self::Cubic),
            _ => None,
        }
    }
}

impl fmt::Display for CrystalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Triclinic => "triclinic",
            Self::Monoclinic => "monoclinic",
            Self::Orthorhombic => "orthorhombic",
            Self::Tetragonal => "tetragonal",
            Self::Trigonal => "trigonal",
            Self::Hexagonal => "hexagonal",
            Self::Cubic => "cubic",
        };
        write!(f, "{}", name)
    }
}

/// 晶胞参数之间的约束关系
///
/// `Follows(i)` 表示等于第 i 个参数（顺序 a, b, c, alpha, beta, gamma），
/// `Fixed(v)` 表示固定为 v（度）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellRule {
    Free,
    Follows(usize),
    Fixed(f64),
}

impl CrystalSystem {
    /// 六个晶胞参数的约束
    pub fn cell_rules(&self) -> [CellRule; 6] {
        use CellRule::*;
        match self {
            Self::Cubic => [Free, Follows(0), Follows(0), Fixed(90.0), Fixed(90.0), Fixed(90.0)],
            Self::Tetragonal => [Free, Follows(0), Free, Fixed(90.0), Fixed(90.0), Fixed(90.0)],
            Self::Orthorhombic => [Free, Free, Free, Fixed(90.0), Fixed(90.0), Fixed(90.0)],
            Self::Trigonal | Self::Hexagonal => {
                [Free, Follows(0), Free, Fixed(90.0), Fixed(90.0), Fixed(120.0)]
            }
            Self::Monoclinic => [Free, Free, Free, Fixed(90.0), Free, Fixed(90.0)],
            Self::Triclinic => [Free; 6],
        }
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

impl SpaceGroupEntry {
    pub fn crystal_system(&self) -> CrystalSystem {
        CrystalSystem::from_it_number(self.it_number).unwrap_or(CrystalSystem::Triclinic)
    }

    /// 完整对称操作集（含心化平移）
    pub fn operations(&self) -> Result<Vec<SymOp>> {
        let generators = self
            .generators
            .iter()
            .map(|g| SymOp::parse(g))
            .collect::<Result<Vec<_>>>()?;
        Ok(generate_group(&generators, self.centring))
    }

    /// 心化字母
    pub fn lattice_centring(&self) -> char {
        self.name_hm.chars().next().unwrap_or('P')
    }
}

/// 按 H-M 符号查找空间群
pub fn lookup(symbol: &str) -> Result<&'static SpaceGroupEntry> {
    let key = normalize_symbol(symbol);
    SPACE_GROUPS
        .iter()
        .find(|sg| {
            normalize_symbol(sg.name_hm) == key
                || sg.aliases.iter().any(|a| normalize_symbol(a) == key)
        })
        .ok_or_else(|| DiffError::UnknownSpaceGroup(symbol.to_string()))
}

/// 按国际表编号查找
pub fn lookup_number(number: u16) -> Option<&'static SpaceGroupEntry> {
    SPACE_GROUPS.iter().find(|sg| sg.it_number == number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystallography::symmetry::equivalent_positions;

    #[test]
    fn test_lookup_ignores_spacing_and_case() {
        assert_eq!(lookup("Fd-3m").unwrap().it_number, 227);
        assert_eq!(lookup("f d -3 m").unwrap().it_number, 227);
        assert_eq!(lookup("P 1 21/c 1").unwrap().it_number, 14);
        assert!(lookup("X 99").is_err());
    }

    #[test]
    fn test_all_entries_generate() {
        for sg in SPACE_GROUPS {
            let ops = sg.operations().unwrap();
            assert!(!ops.is_empty(), "{} has no operations", sg.name_hm);
        }
    }

    #[test]
    fn test_group_orders() {
        let order = |s: &str| lookup(s).unwrap().operations().unwrap().len();
        assert_eq!(order("P 1"), 1);
        assert_eq!(order("P -1"), 2);
        assert_eq!(order("P 21/c"), 4);
        assert_eq!(order("P n m a"), 8);
        assert_eq!(order("P 63/m m c"), 24);
        assert_eq!(order("R -3 m"), 36);
        assert_eq!(order("P m -3 m"), 48);
        assert_eq!(order("F m -3 m"), 192);
        assert_eq!(order("F d -3 m"), 192);
    }

    #[test]
    fn test_wyckoff_multiplicities() {
        let ops = lookup("F d -3 m").unwrap().operations().unwrap();
        // 8a 位 (1/8, 1/8, 1/8)
        assert_eq!(equivalent_positions(&ops, &[0.125, 0.125, 0.125]).len(), 8);

        let ops = lookup("F m -3 m").unwrap().operations().unwrap();
        assert_eq!(equivalent_positions(&ops, &[0.0, 0.0, 0.0]).len(), 4);
        assert_eq!(equivalent_positions(&ops, &[0.25, 0.25, 0.25]).len(), 8);

        let ops = lookup("P m -3 m").unwrap().operations().unwrap();
        assert_eq!(equivalent_positions(&ops, &[0.5, 0.0, 0.0]).len(), 3);
    }

    #[test]
    fn test_crystal_system() {
        assert_eq!(CrystalSystem::from_it_number(227), Some(CrystalSystem::Cubic));
        assert_eq!(CrystalSystem::from_it_number(166), Some(CrystalSystem::Trigonal));
        assert_eq!(CrystalSystem::from_it_number(0), None);
        assert_eq!(
            CrystalSystem::Hexagonal.cell_rules()[5],
            CellRule::Fixed(120.0)
        );
    }
}
