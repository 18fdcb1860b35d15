//! Shared helpers for the command-line integration tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SI_CIF: &str = "data_si
_space_group.name_H-M_alt 'F d -3 m'
_space_group.IT_coordinate_system_code 2
_cell.length_a 5.43(1)
loop_
_atom_site.label
_atom_site.type_symbol
_atom_site.fract_x
_atom_site.fract_y
_atom_site.fract_z
_atom_site.Wyckoff_letter
_atom_site.occupancy
_atom_site.B_iso_or_equiv
_atom_site.adp_type
Si Si 0.125 0.125 0.125 a 1.0 0.5 Biso
";

/// Helper to get a diffrefine command with colours disabled
pub fn diffrefine() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("diffrefine"));
    cmd.env("NO_COLOR", "1").env_remove("DIFFREFINE_PLOT_BACKEND");
    cmd
}

/// Synthetic powder pattern with two Gaussian peaks on a flat background
pub fn synthetic_pattern() -> String {
    let mut out = String::from("# 2theta intensity su\n");
    for i in 0..=400 {
        let x = 20.0 + i as f64 * 0.1;
        let y = 50.0
            + 1000.0 * (-((x - 27.7) / 0.3f64).powi(2)).exp()
            + 600.0 * (-((x - 46.2) / 0.3f64).powi(2)).exp();
        out.push_str(&format!("{:.2} {:.3} {:.3}\n", x, y, y.sqrt()));
    }
    out
}

/// Write the silicon model and data files into `dir`
pub fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let model = dir.join("si.cif");
    let data = dir.join("si.xye");
    fs::write(&model, SI_CIF).unwrap();
    fs::write(&data, synthetic_pattern()).unwrap();
    (model, data)
}

/// Create a project with one model and one data experiment; returns (tempdir, project dir)
pub fn setup_project() -> (TempDir, PathBuf) {
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
        .args(["--wavelength", "1.5"])
        .assert()
        .success();
    (tmp, project)
}
