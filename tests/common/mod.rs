//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use csi_panel::config::PipelineConfig;
use tempfile::TempDir;

/// Header row of an interconnection application export.
pub fn application_header() -> String {
    let mut cols = vec![
        "Application Id".to_string(),
        "Utility".into(),
        "Application Status".into(),
        "App Received Date".into(),
        "App Complete Date".into(),
        "Self Installer".into(),
        "Installer Name".into(),
        "System Size DC".into(),
        "System Size AC".into(),
    ];
    for prefix in ["Inverter Quantity", "Generator Quantity"] {
        for i in 1..=5 {
            cols.push(format!("{prefix} {i}"));
        }
    }
    cols.join(",")
}

/// One application row. Slot arrays hold raw cell text ("" for missing).
pub struct Row<'a> {
    pub id: &'a str,
    pub utility: &'a str,
    pub received: &'a str,
    pub completed: &'a str,
    pub self_installer: &'a str,
    pub size_dc: &'a str,
    pub inverter: [&'a str; 5],
    pub generator: [&'a str; 5],
}

impl Row<'_> {
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},Completed,{},{},{},Acme Solar,{},,{},{}",
            self.id,
            self.utility,
            self.received,
            self.completed,
            self.self_installer,
            self.size_dc,
            self.inverter.join(","),
            self.generator.join(",")
        )
    }
}

/// Writes `contents` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(path, contents).expect("write fixture");
}

fn applications_rel(upper: &str) -> String {
    format!(
        "Interconnected_Project_Sites_2021-09-30/{upper}_Interconnected_Project_Sites_2021-09-30.csv"
    )
}

/// Writes an application export at the default location for `upper` (e.g. `PGE`).
pub fn write_applications(root: &Path, upper: &str, rows: &[String]) {
    let mut body = application_header();
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    write(root, &applications_rel(upper), &body);
}

/// Cutoff tables for the three utilities, each using a different header style.
pub fn write_cutoffs(root: &Path) {
    write(
        root,
        "cutoffs/pgecutoffs.csv",
        "year,month,pge_day,subsidyperwatt\n\
         2007,1,1,2.5\n\
         2007,7,15,2.2\n\
         2008,3,1,1.9\n\
         2008,9,1,1.55\n",
    );
    write(
        root,
        "cutoffs/scecutoffs.csv",
        "year,month,sce_day,subsidyperwatt\n\
         2007,1,1,2.5\n\
         2007,10,1,2.2\n\
         2008,6,1,1.9\n",
    );
    write(
        root,
        "cutoffs/sdgecutoffs.csv",
        "Year,Month,Day,SubsidyPerWatt\n\
         2007,1,1,2.6\n\
         2008,1,1,2.3\n\
         2008,8,1,2.0\n",
    );
}

/// Three applications per month from January 2007 for `months` months.
///
/// Completion follows receipt by one to three months. Sizes and generator
/// counts vary with the row index so fits are not exact. Every tenth row is
/// self-installed.
pub fn synthetic_rows(upper: &str, months: u32) -> Vec<String> {
    let mut rows = Vec::new();
    for m in 0..months {
        for k in 0..3_u32 {
            let year = 2007 + m / 12;
            let month = m % 12 + 1;
            let day = [5, 12, 20][k as usize];
            let done = m + 1 + (m + k) % 3;
            let (c_year, c_month) = (2007 + done / 12, done % 12 + 1);
            let idx = m * 3 + k;
            let size = 3.0 + f64::from((m * 3 + k * 5) % 7) * 0.5;
            let generator = 8 + (m * 7 + k * 3) % 5;
            let inverter = 1 + (m + k) % 2;
            let id = format!("{upper}-{idx:04}");
            let received = format!("{month:02}/{day:02}/{year}");
            let completed = format!("{c_year}-{c_month:02}-15");
            let size = size.to_string();
            let generator = generator.to_string();
            let inverter = inverter.to_string();
            rows.push(
                Row {
                    id: &id,
                    utility: upper,
                    received: &received,
                    completed: &completed,
                    self_installer: if idx % 10 == 9 { "Yes" } else { "No" },
                    size_dc: &size,
                    inverter: [&inverter, "", "", "", ""],
                    generator: [&generator, "", "", "", ""],
                }
                .to_csv(),
            );
        }
    }
    rows
}

/// Full three-utility data directory with synthetic applications.
pub fn synthetic_layout() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    write_cutoffs(dir.path());
    for upper in ["PGE", "SCE", "SDGE"] {
        write_applications(dir.path(), upper, &synthetic_rows(upper, 20));
    }
    let config = config_for(&dir);
    (dir, config)
}

/// Default layout rooted at `dir`, writing outputs to `dir/out`.
pub fn config_for(dir: &TempDir) -> PipelineConfig {
    let mut config = PipelineConfig::csi_default();
    config.data_dir = dir.path().to_path_buf();
    config.output.dir = dir.path().join("out");
    config
}
