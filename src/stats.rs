//! The benchmark statistics store: a CSV file with one header row and one
//! row per processed case.
//!
//! The file is recreated when a run starts and every row is written through
//! a handle opened and closed for that row alone, so an interrupted run
//! keeps every row written before the interruption.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::instance::VariantKind;
use crate::report::SolveStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    pub case_file: String,
    pub variant: VariantKind,
    /// In the order of the variant's size header
    pub sizes: Vec<usize>,
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub time_s: f64,
    pub variables: Option<usize>,
    pub constraints: Option<usize>,
    pub availability_pct: Option<f64>,
}

impl BenchmarkRecord {
    fn to_row(&self) -> String {
        let mut fields = vec![self.case_file.clone()];
        fields.extend(self.sizes.iter().map(|s| s.to_string()));
        fields.push(self.status.to_string());
        fields.push(optional(self.objective));
        fields.push(format!("{:.6}", self.time_s));
        fields.push(optional(self.variables));
        fields.push(optional(self.constraints));
        fields.push(optional(self.availability_pct));
        fields.join(",")
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    /// Truncates `path` and writes the header for `variant`.
    pub fn create(path: &Path, variant: VariantKind) -> io::Result<Self> {
        let mut header = vec!["case_file".to_string()];
        header.extend(variant.size_names().iter().map(|n| format!("n_{n}")));
        header.extend(
            ["status", "optimal_cost", "time_s", "variables", "constraints", "availability_pct"]
                .iter()
                .map(|c| c.to_string()),
        );

        let mut file = File::create(path)?;
        writeln!(file, "{}", header.join(","))?;
        Ok(StatsStore { path: path.to_path_buf() })
    }

    pub fn append(&self, record: &BenchmarkRecord) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record.to_row())?;
        file.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn record(case: usize, objective: Option<f64>) -> BenchmarkRecord {
        BenchmarkRecord {
            case_file: format!("random_case_{case}.in"),
            variant: VariantKind::Schedule,
            sizes: vec![3, 2, 1],
            status: if objective.is_some() { SolveStatus::Optimal } else { SolveStatus::Infeasible },
            objective,
            time_s: 0.25,
            variables: objective.map(|_| 18),
            constraints: objective.map(|_| 9),
            availability_pct: Some(50.0),
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let store = StatsStore::create(&path, VariantKind::Schedule).unwrap();
        store.append(&record(1, Some(12.5))).unwrap();
        store.append(&record(2, None)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "case_file,n_slots,n_buses,n_workshops,status,optimal_cost,time_s,variables,constraints,availability_pct"
        );
        assert_eq!(lines[1], "random_case_1.in,3,2,1,OPTIMAL,12.5,0.250000,18,9,50");
        assert_eq!(lines[2], "random_case_2.in,3,2,1,INFEASIBLE,,0.250000,,,50");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let store = StatsStore::create(&path, VariantKind::Workshop).unwrap();
        store.append(&record(1, Some(1.0))).unwrap();

        StatsStore::create(&path, VariantKind::Workshop).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
