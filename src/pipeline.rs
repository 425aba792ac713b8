//! serialize -> solve -> parse for a single instance.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use log::{debug, warn};
use thiserror::Error;

use crate::dataset::{DatasetDocument, DatasetError};
use crate::instance::ProblemInstance;
use crate::report::{parse_report, ParsedReport};
use crate::solver::{SolveRequest, Solver, SolverError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot build dataset")]
    Dataset(#[from] DatasetError),
    #[error("cannot write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Solver(e) if e.is_fatal())
    }
}

#[derive(Debug, Clone)]
pub struct SolveResult {
    pub report: ParsedReport,
    /// Wall-clock time of the solver process alone
    pub elapsed: Duration,
    pub stdout: String,
}

/// Serializes `instance` and writes the document to `path`.
pub fn write_dataset(instance: &ProblemInstance, path: &Path) -> Result<DatasetDocument, PipelineError> {
    let document = instance.to_dataset()?;
    fs::write(path, document.to_string()).map_err(|source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("dataset written to {}", path.display());
    Ok(document)
}

/// Writes the dataset of `instance`, runs `solver` on it and parses the
/// outcome. A report file missing after a clean exit degrades to parsing
/// the captured stdout alone.
pub fn solve_instance<S: Solver + ?Sized>(
    solver: &S,
    instance: &ProblemInstance,
    request: &SolveRequest<'_>,
) -> Result<SolveResult, PipelineError> {
    write_dataset(instance, request.dataset)?;

    let started = Instant::now();
    let run = solver.solve(request)?;
    let elapsed = started.elapsed();

    let report = match fs::read_to_string(&run.report) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("cannot read report {}: {e}; falling back to the solver log", run.report.display());
            None
        }
    };
    let parsed = parse_report(report.as_deref(), &run.stdout, &instance.kind().shape());

    Ok(SolveResult { report: parsed, elapsed, stdout: run.stdout })
}
