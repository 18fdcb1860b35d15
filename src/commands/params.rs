//! # params / set / constrain 命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/params.rs` 定义的参数
//! - 使用 `project/`, `analysis/constraints.rs`, `display/tables.rs`

use crate::analysis::constraints::find_parameter_mut;
use crate::analysis::{Analysis, Constraint, Constraints};
use crate::cli::params::{ConstrainArgs, ParamsArgs, SetArgs};
use crate::display::tables::{key_value_table, parameter_table};
use crate::error::{DiffError, Result};
use crate::project::Project;
use crate::utils::output;

/// 别名与约束表
pub fn constraint_table(constraints: &Constraints) -> String {
    let mut rows: Vec<(String, String)> = constraints
        .aliases()
        .map(|a| (format!("alias {}", a.label()), a.param().to_string()))
        .collect();
    rows.extend(
        constraints
            .constraints()
            .map(|c| (format!("{} =", c.lhs_alias()), c.rhs_expr().to_string())),
    );
    key_value_table(&rows)
}

/// 执行 params 命令
pub fn execute_params(args: ParamsArgs) -> Result<()> {
    let project = Project::load(&args.dir)?;
    let params: Vec<_> = Analysis::all_parameters(&project.sample_models, &project.experiments)
        .into_iter()
        .filter(|p| !args.free || p.is_free())
        .filter(|p| {
            args.filter
                .as_deref()
                .map_or(true, |f| p.full_name().contains(f))
        })
        .collect();

    if params.is_empty() {
        output::print_warning("No parameters match the selection");
        return Ok(());
    }
    output::print_header(&format!(
        "{} parameters of project '{}'",
        if args.free { "Free" } else { "All" },
        project.info.name()
    ));
    output::print_block(&parameter_table(&params));
    Ok(())
}

/// 执行 set 命令
pub fn execute_set(args: SetArgs) -> Result<()> {
    let mut project = Project::load(&args.dir)?;
    if args.value.is_none()
        && !args.free
        && !args.fix
        && args.fit_min.is_none()
        && args.fit_max.is_none()
    {
        return Err(DiffError::InvalidArgument(
            "nothing to change, give --value, --free, --fix, --fit-min or --fit-max".to_string(),
        ));
    }

    let constrained = project
        .analysis
        .constraints
        .constrained_parameters()
        .contains(&args.name);
    let param = find_parameter_mut(
        &mut project.sample_models,
        &mut project.experiments,
        &args.name,
    )
    .ok_or_else(|| DiffError::not_found("parameter", &args.name))?;

    if let Some(value) = args.value {
        param.set_value(value)?;
        if constrained {
            output::print_warning(&format!(
                "'{}' is constrained, its value is recomputed on the next calculation",
                args.name
            ));
        }
    }
    if args.fit_min.is_some() || args.fit_max.is_some() {
        let (lo, hi) = param.fit_range();
        param.set_fit_range(args.fit_min.unwrap_or(lo), args.fit_max.unwrap_or(hi))?;
    }
    if args.free {
        if constrained {
            return Err(DiffError::NotRefinable(format!(
                "'{}' is constrained, remove its constraint first",
                args.name
            )));
        }
        param.set_free(true)?;
    }
    if args.fix {
        param.set_free(false)?;
    }

    let summary = parameter_table(&[&*param]);
    project.save()?;
    output::print_block(&summary);
    output::print_done(&format!("Updated {}", args.name));
    Ok(())
}

/// 执行 constrain 命令
pub fn execute_constrain(args: ConstrainArgs) -> Result<()> {
    let mut project = Project::load(&args.dir)?;

    for lhs in &args.remove {
        if let Some(full_name) = project.analysis.constraints.remove_constraint(lhs)? {
            if let Some(param) = find_parameter_mut(
                &mut project.sample_models,
                &mut project.experiments,
                &full_name,
            ) {
                param.set_constrained(false);
            }
            output::print_info(&format!("Removed constraint on '{}'", full_name));
        }
    }

    for (label, full_name) in &args.aliases {
        if crate::analysis::constraints::find_parameter(
            &project.sample_models,
            &project.experiments,
            full_name,
        )
        .is_none()
        {
            return Err(DiffError::not_found("parameter", full_name));
        }
        project.analysis.constraints.add_alias(label, full_name)?;
    }

    for equation in &args.expressions {
        let constraint = Constraint::from_equation(equation)?;
        project.analysis.constraints.add_constraint(constraint)?;
    }

    // 立即应用，尽早暴露无法求值的表达式
    project
        .analysis
        .constraints
        .apply(&mut project.sample_models, &mut project.experiments)?;

    project.save()?;
    if project.analysis.constraints.is_empty() {
        output::print_info("Project has no aliases or constraints");
    } else {
        output::print_block(&constraint_table(&project.analysis.constraints));
    }
    Ok(())
}
