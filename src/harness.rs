//! Batch benchmarking: generate, solve and record many random cases.
//!
//! Cases run strictly one after the other. A case that fails is logged,
//! cleaned up and skipped; only a missing solver or an unwritable
//! statistics store stops the batch.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use derivative::Derivative;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generate::{InstanceGenerator, SizeBounds};
use crate::instance::VariantKind;
use crate::pipeline::{solve_instance, PipelineError};
use crate::solver::{SolveRequest, Solver, SolverConfig};
use crate::stats::{BenchmarkRecord, StatsStore};

#[derive(Debug, Clone, PartialEq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct HarnessConfig {
    #[derivative(Default(value = "VariantKind::Schedule"))]
    pub variant: VariantKind,
    #[derivative(Default(value = "10"))]
    pub cases: usize,
    /// The statistics store, recreated at the start of the run
    #[derivative(Default(value = "PathBuf::from(\"stats.csv\")"))]
    pub output: PathBuf,
    /// Model file handed to the solver
    pub model: PathBuf,
    /// Directory receiving the per-case instance, dataset and report files
    #[derivative(Default(value = "PathBuf::from(\".\")"))]
    pub work_dir: PathBuf,
    /// Keep the per-case files instead of deleting them after each case
    pub keep_files: bool,
    pub seed: Option<u64>,
    /// Size bounds, the variant's defaults when absent
    pub bounds: Option<SizeBounds>,
    pub solver: SolverConfig,
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("cannot create work directory `{path}`")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write statistics store `{path}`")]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("batch aborted at case {case}")]
    Aborted {
        case: usize,
        #[source]
        source: PipelineError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseFailure {
    pub case: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub cases: usize,
    pub recorded: usize,
    pub failures: Vec<CaseFailure>,
}

pub struct BenchmarkHarness<S> {
    config: HarnessConfig,
    solver: S,
}

impl<S: Solver> BenchmarkHarness<S> {
    pub fn new(config: HarnessConfig, solver: S) -> Self {
        BenchmarkHarness { config, solver }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn run(&self) -> Result<BatchSummary, HarnessError> {
        let config = &self.config;
        fs::create_dir_all(&config.work_dir).map_err(|source| HarnessError::WorkDir {
            path: config.work_dir.clone(),
            source,
        })?;
        let store = StatsStore::create(&config.output, config.variant).map_err(|source| HarnessError::Store {
            path: config.output.clone(),
            source,
        })?;

        let bounds = config.bounds.unwrap_or_else(|| SizeBounds::for_variant(config.variant));
        let mut generator = InstanceGenerator::new(config.variant, bounds, config.seed.map(u128::from));
        let mut summary = BatchSummary { cases: config.cases, ..BatchSummary::default() };

        for case in 1..=config.cases {
            match self.run_case(case, &mut generator) {
                Ok(record) => {
                    store.append(&record).map_err(|source| HarnessError::Store {
                        path: store.path().to_path_buf(),
                        source,
                    })?;
                    summary.recorded += 1;
                }
                Err(e) if e.is_fatal() => {
                    error!("[{case}] {e}");
                    return Err(HarnessError::Aborted { case, source: e });
                }
                Err(e) => {
                    error!("[{case}] case skipped: {e}");
                    if let PipelineError::Solver(solver_error) = &e {
                        if let Some(stderr) = solver_error.stderr().filter(|s| !s.trim().is_empty()) {
                            error!("[{case}] solver stderr: {}", stderr.trim());
                        }
                    }
                    summary.failures.push(CaseFailure { case, reason: e.to_string() });
                }
            }
        }

        info!(
            "{} of {} cases recorded in {}",
            summary.recorded,
            summary.cases,
            store.path().display()
        );
        Ok(summary)
    }

    fn run_case(&self, case: usize, generator: &mut InstanceGenerator) -> Result<BenchmarkRecord, PipelineError> {
        let instance = generator.generate();
        let artifacts = CaseArtifacts::new(&self.config.work_dir, case, self.config.keep_files);

        fs::write(&artifacts.instance, instance.to_instance_file()).map_err(|source| PipelineError::Write {
            path: artifacts.instance.clone(),
            source,
        })?;
        info!(
            "[{case}] {} generated with {:?} = {:?}",
            artifacts.instance.display(),
            generator.kind().size_names(),
            instance.sizes()
        );

        let request = SolveRequest {
            model: &self.config.model,
            dataset: &artifacts.dataset,
            report: &artifacts.report,
        };
        let result = solve_instance(&self.solver, &instance, &request)?;
        let report = result.report;
        if !report.is_optimal() {
            warn!("[{case}] no optimal solution (status {})", report.status);
        }
        info!(
            "[{case}] cost: {:?}, time: {:.4}s, variables: {:?}, constraints: {:?}",
            report.objective,
            result.elapsed.as_secs_f64(),
            report.variables,
            report.constraints
        );

        Ok(BenchmarkRecord {
            case_file: file_name(&artifacts.instance),
            variant: instance.kind(),
            sizes: instance.sizes(),
            status: report.status,
            objective: report.objective,
            time_s: result.elapsed.as_secs_f64(),
            variables: report.variables,
            constraints: report.constraints,
            availability_pct: instance.availability_pct(),
        })
    }
}

/// The files of one case, removed when dropped unless they are kept.
struct CaseArtifacts {
    instance: PathBuf,
    dataset: PathBuf,
    report: PathBuf,
    keep: bool,
}

impl CaseArtifacts {
    fn new(dir: &Path, case: usize, keep: bool) -> Self {
        CaseArtifacts {
            instance: dir.join(format!("random_case_{case}.in")),
            dataset: dir.join(format!("random_output_{case}.dat")),
            report: dir.join(format!("random_output_{case}.out")),
            keep,
        }
    }
}

impl Drop for CaseArtifacts {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in [&self.instance, &self.dataset, &self.report] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("cannot remove {}: {e}", path.display()),
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::ScriptedSolver;

    fn config(dir: &Path, cases: usize) -> HarnessConfig {
        HarnessConfig {
            cases,
            output: dir.join("stats.csv"),
            work_dir: dir.join("work"),
            model: dir.join("model.mod"),
            seed: Some(2024),
            ..HarnessConfig::default()
        }
    }

    fn rows(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_one_failure_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScriptedSolver { fail_on: vec![3], ..ScriptedSolver::optimal() };
        let harness = BenchmarkHarness::new(config(dir.path(), 5), &solver);

        let summary = harness.run().unwrap();
        assert_eq!(summary.cases, 5);
        assert_eq!(summary.recorded, 4);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].case, 3);
        assert_eq!(solver.calls.get(), 5);

        let rows = rows(&dir.path().join("stats.csv"));
        assert_eq!(rows.len(), 5);
        assert!(rows[0].starts_with("case_file,n_slots,n_buses,n_workshops,status"));
        let cases = rows[1..].iter().map(|r| r.split(',').next().unwrap().to_string()).collect::<Vec<_>>();
        assert_eq!(
            cases,
            vec!["random_case_1.in", "random_case_2.in", "random_case_4.in", "random_case_5.in"]
        );
        assert!(rows[1..].iter().all(|r| r.contains(",OPTIMAL,17,")));

        // temporary files are gone, the failed case included
        assert_eq!(fs::read_dir(dir.path().join("work")).unwrap().count(), 0);
    }

    #[test]
    fn test_keep_files() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScriptedSolver { fail_on: vec![2], ..ScriptedSolver::optimal() };
        let config = HarnessConfig { keep_files: true, ..config(dir.path(), 2) };
        BenchmarkHarness::new(config, &solver).run().unwrap();

        let work = dir.path().join("work");
        assert!(work.join("random_case_1.in").exists());
        assert!(work.join("random_output_1.dat").exists());
        assert!(work.join("random_output_1.out").exists());
        assert!(work.join("random_case_2.in").exists());
        assert!(work.join("random_output_2.dat").exists());
        assert!(!work.join("random_output_2.out").exists());
    }

    #[test]
    fn test_missing_solver_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScriptedSolver { unavailable: true, ..ScriptedSolver::optimal() };
        let err = BenchmarkHarness::new(config(dir.path(), 5), &solver).run().unwrap_err();
        assert!(matches!(err, HarnessError::Aborted { case: 1, .. }));
        assert_eq!(solver.calls.get(), 1);
        assert_eq!(rows(&dir.path().join("stats.csv")).len(), 1);
    }

    #[test]
    fn test_non_optimal_cases_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ScriptedSolver {
            report: "Rows: 3\nColumns: 2\n".to_string(),
            log: "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION".to_string(),
            ..ScriptedSolver::optimal()
        };
        let summary = BenchmarkHarness::new(config(dir.path(), 2), &solver).run().unwrap();
        assert_eq!(summary.recorded, 2);
        let rows = rows(&dir.path().join("stats.csv"));
        assert!(rows[1].contains(",INFEASIBLE,,"));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let sizes = |dir: &Path| {
            let solver = ScriptedSolver::optimal();
            BenchmarkHarness::new(config(dir, 6), &solver).run().unwrap();
            rows(&dir.join("stats.csv"))
                .iter()
                .map(|r| r.split(',').take(4).collect::<Vec<_>>().join(","))
                .collect::<Vec<_>>()
        };
        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        assert_eq!(sizes(a.path()), sizes(b.path()));
    }

    #[test]
    fn test_config_from_json() {
        let config: HarnessConfig =
            serde_json::from_str(r#"{"variant": "workshop", "cases": 3, "bounds": {"min": 2, "max": 4}}"#).unwrap();
        assert_eq!(config.variant, VariantKind::Workshop);
        assert_eq!(config.cases, 3);
        assert_eq!(config.bounds, Some(SizeBounds { min: 2, max: 4 }));
        assert_eq!(config.output, PathBuf::from("stats.csv"));
        assert_eq!(config.solver.timeout_secs, 60);
    }
}
