//! # 项目管理
//!
//! `Project` 聚合样品模型、实验与分析设置，负责目录形式的读写：
//!
//! ```text
//! <dir>/project.cif
//! <dir>/sample_models/<name>.cif
//! <dir>/experiments/<name>.cif
//! <dir>/analysis.cif
//! <dir>/summary.cif
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `batch/collector.rs` 收集模型与实验文件

use crate::analysis::constraints::find_parameter_mut;
use crate::analysis::{Analysis, FitResults};
use crate::batch::FileCollector;
use crate::error::{DiffError, Result};
use crate::experiments::Experiments;
use crate::parsers::parse_cif_file;
use crate::project::info::ProjectInfo;
use crate::project::summary::Summary;
use crate::sample_models::SampleModels;
use crate::utils::output::{print_debug, print_success, print_warning};

use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE: &str = "project.cif";
pub const ANALYSIS_FILE: &str = "analysis.cif";
pub const SUMMARY_FILE: &str = "summary.cif";
pub const MODELS_DIR: &str = "sample_models";
pub const EXPERIMENTS_DIR: &str = "experiments";

/// 衍射分析项目
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub info: ProjectInfo,
    pub sample_models: SampleModels,
    pub experiments: Experiments,
    pub analysis: Analysis,
    fit_results: Vec<FitResults>,
}

impl Project {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            info: ProjectInfo::new(name)?,
            ..Self::default()
        })
    }

    /// 从项目目录加载
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(DiffError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }
        let project_file = dir.join(PROJECT_FILE);
        if !project_file.is_file() {
            return Err(DiffError::FileNotFound {
                path: project_file.display().to_string(),
            });
        }

        let doc = parse_cif_file(&project_file)?;
        let block = doc.first().ok_or_else(|| DiffError::MissingCifItem {
            block: PROJECT_FILE.to_string(),
            tag: "data_".to_string(),
        })?;
        let mut info = ProjectInfo::from_cif_block(block)?;
        info.set_path(dir);

        let mut sample_models = SampleModels::new();
        for path in FileCollector::new(&dir.join(MODELS_DIR))
            .with_pattern("*.cif")
            .collect()
        {
            let names = sample_models.add_from_cif_path(&path)?;
            print_debug(&format!("Loaded sample model(s) {:?} from {}", names, path.display()));
        }

        let mut experiments = Experiments::new();
        for path in FileCollector::new(&dir.join(EXPERIMENTS_DIR))
            .with_pattern("*.cif")
            .collect()
        {
            let names = experiments.add_from_cif_path(&path)?;
            print_debug(&format!("Loaded experiment(s) {:?} from {}", names, path.display()));
        }

        let analysis_file = dir.join(ANALYSIS_FILE);
        let analysis = if analysis_file.is_file() {
            let text = fs::read_to_string(&analysis_file)
                .map_err(|e| DiffError::read(&analysis_file, e))?;
            Analysis::from_cif_str(&text)?
        } else {
            Analysis::new()
        };

        let mut project = Self {
            info,
            sample_models,
            experiments,
            analysis,
            fit_results: Vec::new(),
        };
        project.mark_constrained();
        Ok(project)
    }

    /// 约束标记不写入 CIF，加载后按约束表恢复
    fn mark_constrained(&mut self) {
        for full_name in self.analysis.constraints.constrained_parameters() {
            match find_parameter_mut(&mut self.sample_models, &mut self.experiments, &full_name) {
                Some(param) => param.set_constrained(true),
                None => print_warning(&format!(
                    "Constrained parameter '{}' does not exist in the project",
                    full_name
                )),
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.info.path()
    }

    /// 保存到当前路径
    pub fn save(&mut self) -> Result<()> {
        let dir = self
            .info
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                DiffError::InvalidArgument(
                    "project has no directory yet, save it with save_as first".to_string(),
                )
            })?;

        let models_dir = dir.join(MODELS_DIR);
        let experiments_dir = dir.join(EXPERIMENTS_DIR);
        for d in [&dir, &models_dir, &experiments_dir] {
            fs::create_dir_all(d).map_err(|e| DiffError::write(d, e))?;
        }

        self.info.touch();
        write_file(&dir.join(PROJECT_FILE), &self.info.to_cif())?;

        let model_names = self.sample_models.names();
        remove_stale(&models_dir, &model_names)?;
        for model in self.sample_models.iter() {
            write_file(
                &models_dir.join(format!("{}.cif", model.name())),
                &model.to_cif(),
            )?;
        }

        let experiment_ids = self.experiments.ids();
        remove_stale(&experiments_dir, &experiment_ids)?;
        for experiment in self.experiments.iter() {
            write_file(
                &experiments_dir.join(format!("{}.cif", experiment.name())),
                &experiment.to_cif(None),
            )?;
        }

        write_file(&dir.join(ANALYSIS_FILE), &self.analysis.to_cif())?;
        write_file(&dir.join(SUMMARY_FILE), &self.summary().to_cif())?;
        Ok(())
    }

    /// 保存到新目录并记录为当前路径
    pub fn save_as(&mut self, dir: &Path) -> Result<()> {
        self.info.set_path(dir);
        self.save()
    }

    // ─────────────────────────────────────────────────────────────
    // 分析
    // ─────────────────────────────────────────────────────────────

    pub fn calculate_all(&mut self) -> Result<()> {
        self.analysis
            .calculate_all(&self.sample_models, &mut self.experiments)
    }

    /// 按当前分析设置拟合，结果保留供摘要使用
    pub fn fit(&mut self, echo_progress: bool) -> Result<&[FitResults]> {
        let results = self.analysis.fit(
            &mut self.sample_models,
            &mut self.experiments,
            echo_progress,
        )?;
        self.fit_results = results;
        Ok(&self.fit_results)
    }

    pub fn fit_results(&self) -> &[FitResults] {
        &self.fit_results
    }

    pub fn summary(&self) -> Summary {
        Summary::new(
            &self.info,
            &self.sample_models,
            &self.experiments,
            &self.analysis,
            &self.fit_results,
        )
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| DiffError::write(path, e))?;
    print_success(&format!("Saved {}", path.display()));
    Ok(())
}

/// 删除目录中不再属于项目的 `.cif` 文件
fn remove_stale(dir: &Path, keep: &[String]) -> Result<()> {
    let stale: Vec<PathBuf> = FileCollector::new(dir)
        .with_pattern("*.cif")
        .collect()
        .into_iter()
        .filter(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map_or(true, |stem| !keep.iter().any(|k| k == stem))
        })
        .collect();
    for path in stale {
        fs::remove_file(&path).map_err(|e| DiffError::write(&path, e))?;
        print_debug(&format!("Removed {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_models::SampleModel;
    use tempfile::tempdir;

    fn demo_project() -> Project {
        let mut project = Project::new("demo").unwrap();
        project.info.set_title("Silicon demo");
        let mut model = SampleModel::new("si").unwrap();
        model.set_space_group("F d -3 m").unwrap();
        model.cell.length_a.set_value(5.43).unwrap();
        project.sample_models.add(model);
        project
    }

    #[test]
    fn test_save_requires_path() {
        let mut project = demo_project();
        assert!(project.save().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("demo");
        let mut project = demo_project();
        project.save_as(&root).unwrap();

        assert!(root.join("project.cif").is_file());
        assert!(root.join("sample_models").join("si.cif").is_file());
        assert!(root.join("analysis.cif").is_file());
        assert!(root.join("summary.cif").is_file());

        let loaded = Project::load(&root).unwrap();
        assert_eq!(loaded.info.name(), "demo");
        assert_eq!(loaded.info.title(), "Silicon demo");
        assert_eq!(loaded.path(), Some(root.as_path()));
        let si = loaded.sample_models.get("si").unwrap();
        assert!((si.cell.length_a.value() - 5.43).abs() < 1e-9);
        assert_eq!(loaded.analysis.calculator(), "kinematic");
    }

    #[test]
    fn test_removed_model_file_is_deleted() {
        let dir = tempdir().unwrap();
        let mut project = demo_project();
        project.sample_models.add(SampleModel::new("extra").unwrap());
        project.save_as(dir.path()).unwrap();
        assert!(dir.path().join("sample_models").join("extra.cif").is_file());

        project.sample_models.remove("extra").unwrap();
        project.save().unwrap();
        assert!(!dir.path().join("sample_models").join("extra.cif").exists());
    }

    #[test]
    fn test_load_missing_project_file() {
        let dir = tempdir().unwrap();
        let err = Project::load(dir.path()).unwrap_err();
        assert!(matches!(err, DiffError::FileNotFound { .. }));
        assert!(Project::load(&dir.path().join("missing")).is_err());
    }
}
