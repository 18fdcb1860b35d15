//! # space-group / engines 命令实现
//!
//! 只读查询：空间群表与可用的计算、最小化引擎。
//!
//! ## 依赖关系
//! - 使用 `crystallography/space_groups.rs`, `analysis/`, `display/tables.rs`

use crate::analysis::{CalculatorFactory, MinimizerFactory};
use crate::cli::lookup::SpaceGroupArgs;
use crate::crystallography::space_groups::{self, SpaceGroupEntry};
use crate::display::tables::{engine_table, key_value_table};
use crate::error::{DiffError, Result};
use crate::utils::output;

/// 按符号或国际表编号查找
fn resolve(symbol: &str) -> Result<&'static SpaceGroupEntry> {
    match symbol.trim().parse::<u16>() {
        Ok(number) => space_groups::lookup_number(number)
            .ok_or_else(|| DiffError::UnknownSpaceGroup(symbol.to_string())),
        Err(_) => space_groups::lookup(symbol),
    }
}

/// 执行 space-group 命令
pub fn execute_space_group(args: SpaceGroupArgs) -> Result<()> {
    let entry = resolve(&args.symbol)?;
    let operations = entry.operations()?;

    output::print_header(&format!("Space group {}", entry.name_hm));
    let mut rows = vec![
        ("Hermann-Mauguin".to_string(), entry.name_hm.to_string()),
        ("IT number".to_string(), entry.it_number.to_string()),
        ("Crystal system".to_string(), entry.crystal_system().to_string()),
        ("Centring".to_string(), entry.lattice_centring().to_string()),
        ("Operators".to_string(), operations.len().to_string()),
    ];
    if !entry.coordinate_code.is_empty() {
        rows.push(("Coordinate code".to_string(), entry.coordinate_code.to_string()));
    }
    if !entry.aliases.is_empty() {
        rows.push(("Aliases".to_string(), entry.aliases.join(", ")));
    }
    output::print_block(&key_value_table(&rows));

    if !args.no_operators {
        output::print_section("Symmetry operators");
        let lines: Vec<String> = operations
            .iter()
            .enumerate()
            .map(|(i, op)| format!("{:>4}  {}", i + 1, op))
            .collect();
        output::print_block(&lines.join("\n"));
    }
    Ok(())
}

/// 执行 engines 命令
pub fn execute_engines() -> Result<()> {
    output::print_header("Calculation engines");
    output::print_block(&engine_table(
        CalculatorFactory::catalogue(),
        Some(CalculatorFactory::DEFAULT),
    ));
    output::print_header("Minimization engines");
    output::print_block(&engine_table(
        MinimizerFactory::catalogue(),
        Some(MinimizerFactory::DEFAULT),
    ));
    output::print_info("Entries marked with * are the defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_symbol_or_number() {
        assert_eq!(resolve("F d -3 m").unwrap().it_number, 227);
        assert_eq!(resolve("227").unwrap().name_hm, resolve("Fd-3m").unwrap().name_hm);
        assert!(resolve("999").is_err());
        assert!(resolve("X 1").is_err());
    }
}
