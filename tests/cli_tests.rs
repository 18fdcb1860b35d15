//! Command-line integration tests
//!
//! Each test drives the built binary against a project in a temporary directory.

mod common;

use common::{diffrefine, setup_project, write_inputs};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Lookup Commands
// ============================================================================

#[test]
fn test_engines_lists_defaults() {
    diffrefine()
        .arg("engines")
        .assert()
        .success()
        .stdout(predicate::str::contains("kinematic"))
        .stdout(predicate::str::contains("lm"))
        .stdout(predicate::str::contains("simplex"));
}

#[test]
fn test_space_group_by_symbol() {
    diffrefine()
        .args(["space-group", "F d -3 m"])
        .assert()
        .success()
        .stdout(predicate::str::contains("227"))
        .stdout(predicate::str::contains("cubic"))
        .stdout(predicate::str::contains("192"));
}

#[test]
fn test_space_group_by_number_without_operators() {
    diffrefine()
        .args(["space-group", "221", "--no-operators"])
        .assert()
        .success()
        .stdout(predicate::str::contains("P m -3 m"))
        .stdout(predicate::str::contains("Symmetry operators").not());
}

#[test]
fn test_unknown_space_group_fails() {
    diffrefine()
        .args(["space-group", "Q 9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown space group"));
}

// ============================================================================
// Project Commands
// ============================================================================

#[test]
fn test_new_creates_project_files() {
    let (_tmp, project) = setup_project();
    assert!(project.join("project.cif").exists());
    assert!(project.join("analysis.cif").exists());
    assert!(project.join("sample_models").join("si.cif").exists());
    assert!(project.join("experiments").join("hrpt.cif").exists());
}

#[test]
fn test_new_refuses_existing_project() {
    let (tmp, project) = setup_project();
    let model = tmp.path().join("si.cif");
    diffrefine()
        .arg("new")
        .arg(&project)
        .arg("--model")
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_new_without_inputs_in_empty_dir() {
    let tmp = TempDir::new().unwrap();
    write_inputs(tmp.path());
    let empty = tmp.path().join("nothing");
    fs::create_dir(&empty).unwrap();
    diffrefine()
        .arg("new")
        .arg(tmp.path().join("proj"))
        .arg("--model")
        .arg(&empty)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_new_with_excluded_region() {
    let tmp = TempDir::new().unwrap();
    let (model, data) = write_inputs(tmp.path());
    let project = tmp.path().join("silicon");
    diffrefine()
        .arg("new")
        .arg(&project)
        .arg("--model")
        .arg(&model)
        .arg("--data")
        .arg(format!("hrpt={}", data.display()))
        .args(["--exclude", "20:29.95"])
        .assert()
        .success()
        .stdout(predicate::str::contains("401 points, 301 in fit"));

    let saved = fs::read_to_string(project.join("experiments").join("hrpt.cif")).unwrap();
    assert!(saved.contains("_excluded_region.start"));
    assert!(saved.contains("excl"));
}

#[test]
fn test_new_rejects_reversed_region() {
    let tmp = TempDir::new().unwrap();
    let (model, data) = write_inputs(tmp.path());
    diffrefine()
        .arg("new")
        .arg(tmp.path().join("silicon"))
        .arg("--model")
        .arg(&model)
        .arg("--data")
        .arg(format!("hrpt={}", data.display()))
        .args(["--exclude", "30:20"])
        .assert()
        .failure();
}

#[test]
fn test_info_json() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("info")
        .arg(&project)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"silicon\""))
        .stdout(predicate::str::contains("\"hrpt\""))
        .stdout(predicate::str::contains("kinematic"));
}

#[test]
fn test_info_missing_project_fails() {
    let tmp = TempDir::new().unwrap();
    diffrefine()
        .arg("info")
        .arg(tmp.path().join("missing"))
        .assert()
        .failure()
        .code(1);
}

// ============================================================================
// Parameter Commands
// ============================================================================

#[test]
fn test_params_lists_cell_and_instrument() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("params")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("si.cell.length_a"))
        .stdout(predicate::str::contains("hrpt.instrument.wavelength"));
}

#[test]
fn test_set_marks_parameter_free() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("set")
        .arg(&project)
        .arg("hrpt.linked_phases.si.scale")
        .args(["--value", "2.5", "--free"])
        .assert()
        .success();

    diffrefine()
        .arg("params")
        .arg(&project)
        .args(["--free", "--filter", "scale"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hrpt.linked_phases.si.scale"))
        .stdout(predicate::str::contains("2.5"));
}

#[test]
fn test_set_unknown_parameter_fails() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("set")
        .arg(&project)
        .arg("si.cell.length_q")
        .args(["--value", "1"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_constrain_and_remove() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("constrain")
        .arg(&project)
        .args(["--alias", "a=si.cell.length_a"])
        .args(["--alias", "wl=hrpt.instrument.wavelength"])
        .args(["--expr", "wl = a / 4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a / 4"));

    diffrefine()
        .arg("params")
        .arg(&project)
        .args(["--filter", "wavelength"])
        .assert()
        .success()
        .stdout(predicate::str::contains("constrained"));

    diffrefine()
        .arg("constrain")
        .arg(&project)
        .args(["--remove", "wl"])
        .assert()
        .success();

    diffrefine()
        .arg("params")
        .arg(&project)
        .args(["--filter", "wavelength"])
        .assert()
        .success()
        .stdout(predicate::str::contains("constrained").not());
}

// ============================================================================
// Analysis Commands
// ============================================================================

#[test]
fn test_calc_reports_agreement() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("calc")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("hrpt"))
        .stdout(predicate::str::contains("Rf (%)"));
}

#[test]
fn test_calc_unknown_calculator_fails() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("calc")
        .arg(&project)
        .args(["--calculator", "nope"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_fit_json_without_saving() {
    let (_tmp, project) = setup_project();
    let before = fs::read_to_string(project.join("sample_models").join("si.cif")).unwrap();
    diffrefine()
        .arg("fit")
        .arg(&project)
        .args(["--max-iterations", "5", "--no-save", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reduced_chi_square"))
        .stdout(predicate::str::contains("si.cell.length_a"));
    let after = fs::read_to_string(project.join("sample_models").join("si.cif")).unwrap();
    assert_eq!(before, after);
}

// ============================================================================
// Output Commands
// ============================================================================

#[test]
fn test_plot_ascii() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("plot")
        .arg(&project)
        .args(["--x-min", "25", "--x-max", "30", "--height", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Legend:"))
        .stdout(predicate::str::contains("Measured (Imeas)"));
}

#[test]
fn test_plot_invalid_range_fails() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("plot")
        .arg(&project)
        .args(["--x-min", "50", "--x-max", "30"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_export_csv_and_skip_existing() {
    let (_tmp, project) = setup_project();
    diffrefine()
        .arg("export")
        .arg(&project)
        .args(["--jobs", "1"])
        .assert()
        .success();

    let csv = project.join("export").join("hrpt.csv");
    let content = fs::read_to_string(&csv).unwrap();
    assert!(content.starts_with("2theta,intensity_meas"));
    assert_eq!(content.lines().count(), 402);

    diffrefine()
        .arg("export")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped: 1"));
}
