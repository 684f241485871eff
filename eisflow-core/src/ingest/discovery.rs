//! Measurement-file discovery across dataset layout conventions
//!
//! Two conventions are recognized:
//!
//! 1. Hioki analyzer exports anywhere under the root, named
//!    `Hk_<model>_SoC_<n>_<date>.csv`; these default to battery `B01`,
//!    test `Test_1`.
//! 2. The curated tree `B<nn>/**/<*EIS*>/Test_<n>/<soc>%.csv`, where the
//!    battery directory gives the battery id and the file stem gives the
//!    SoC.
//!
//! Results are sorted by (battery, test, SoC) so sweeps are deterministic
//! regardless of filesystem enumeration order.

use std::fs;
use std::path::{Path, PathBuf};

/// A discovered measurement file with its session identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MeasurementFile {
    /// Battery under test.
    pub battery_id: String,
    /// Test identifier.
    pub test_id: String,
    /// State of charge parsed from the name, percent.
    pub soc_percent: i32,
    /// Full path to the CSV.
    pub path: PathBuf,
    /// File name, for session descriptors.
    pub file_name: String,
}

/// Discover every measurement CSV under `root`, sorted.
pub fn discover_measurement_files(root: &Path) -> Vec<MeasurementFile> {
    let mut files = Vec::new();

    if !root.is_dir() {
        log::warn!("dataset root does not exist: {}", root.display());
        return files;
    }

    let mut csvs = Vec::new();
    collect_csv_files(root, &mut csvs);

    for path in csvs {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(found) =
            hioki_entry(&path, &file_name).or_else(|| layout_entry(&path, &file_name, root))
        {
            files.push(found);
        }
    }

    files.sort();
    files
}

/// Count the data rows of a measurement CSV, excluding a header line.
///
/// `total_rows` is informational, so an unreadable file counts as zero.
pub fn count_data_rows(path: &Path) -> u32 {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            log::warn!("failed to count rows of {}: {error}", path.display());
            return 0;
        }
    };

    let mut lines = contents.lines();
    let Some(first) = lines.next() else { return 0 };
    let rest = lines.count() as u32;
    if super::is_header_line(first) {
        rest
    } else {
        rest + 1
    }
}

fn collect_csv_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        log::warn!("failed to read directory: {}", dir.display());
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            collect_csv_files(&path, out);
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            out.push(path);
        }
    }
}

fn hioki_entry(path: &Path, file_name: &str) -> Option<MeasurementFile> {
    if !file_name.starts_with("Hk_") {
        return None;
    }

    let stem = file_name.strip_suffix(".csv")?;
    let after = &stem[stem.find("_SoC_")? + "_SoC_".len()..];
    let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
    let soc: i32 = digits.parse().ok()?;
    if !(5..=100).contains(&soc) {
        return None;
    }

    Some(MeasurementFile {
        battery_id: "B01".into(),
        test_id: "Test_1".into(),
        soc_percent: soc,
        path: path.to_path_buf(),
        file_name: file_name.into(),
    })
}

fn layout_entry(path: &Path, file_name: &str, root: &Path) -> Option<MeasurementFile> {
    let test_dir = path.parent()?;
    let test_id = test_dir.file_name()?.to_str()?;
    if !test_id.starts_with("Test_") {
        return None;
    }

    let eis_dir = test_dir.parent()?;
    if !eis_dir.file_name()?.to_str()?.contains("EIS") {
        return None;
    }

    let battery_id = eis_dir
        .ancestors()
        .take_while(|dir| dir.starts_with(root))
        .filter_map(|dir| dir.file_name()?.to_str())
        .find(|name| is_battery_dir(name))?;

    let soc = soc_from_stem(file_name.strip_suffix(".csv")?)?;

    Some(MeasurementFile {
        battery_id: battery_id.into(),
        test_id: test_id.into(),
        soc_percent: soc,
        path: path.to_path_buf(),
        file_name: file_name.into(),
    })
}

/// Battery directories are named `B` plus two digits.
fn is_battery_dir(name: &str) -> bool {
    name.len() == 3 && name.starts_with('B') && name[1..].chars().all(|c| c.is_ascii_digit())
}

/// SoC from a file stem like `50%` or `50`, multiples of five only.
fn soc_from_stem(stem: &str) -> Option<i32> {
    let digits: String = stem.chars().take_while(char::is_ascii_digit).collect();
    let soc: i32 = digits.parse().ok()?;
    if (5..=100).contains(&soc) && soc % 5 == 0 {
        Some(soc)
    } else {
        None
    }
}
