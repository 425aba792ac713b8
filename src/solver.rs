//! Invocation of the external solver.

use std::{
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use derivative::Derivative;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::process::{run_bounded, ProcessError};

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("solver executable `{0}` is not available")]
    ToolUnavailable(String),
    #[error("solver exited with {status}: {stderr}")]
    Failed {
        status: String,
        stdout: String,
        stderr: String,
    },
    #[error("solver did not finish within {timeout:?}")]
    TimedOut {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl SolverError {
    /// Errors that make every further solve pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SolverError::ToolUnavailable(_))
    }

    /// Captured standard error of the failed run, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            SolverError::Failed { stderr, .. } | SolverError::TimedOut { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

/// Files involved in one solver run.
#[derive(Debug, Clone, Copy)]
pub struct SolveRequest<'a> {
    pub model: &'a Path,
    pub dataset: &'a Path,
    /// Where the solver writes its report
    pub report: &'a Path,
}

/// What a successful solver run leaves behind.
#[derive(Debug, Clone)]
pub struct SolverRun {
    pub stdout: String,
    pub stderr: String,
    pub report: PathBuf,
}

pub trait Solver {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<SolverRun, SolverError>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<SolverRun, SolverError> {
        (**self).solve(request)
    }
}

#[derive(Debug, Clone, PartialEq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver executable, looked up on the `PATH` when relative
    #[derivative(Default(value = "PathBuf::from(\"glpsol\")"))]
    pub program: PathBuf,
    /// Seconds a single solve may take
    #[derivative(Default(value = "60"))]
    pub timeout_secs: u64,
}

/// The GLPK command line solver, `glpsol --model M --data D -o R`.
#[derive(Debug, Clone, Default)]
pub struct Glpsol {
    config: SolverConfig,
}

impl Glpsol {
    pub fn new(config: SolverConfig) -> Self {
        Glpsol { config }
    }
}

impl Solver for Glpsol {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<SolverRun, SolverError> {
        let mut command = Command::new(&self.config.program);
        command
            .arg("--model")
            .arg(request.model)
            .arg("--data")
            .arg(request.dataset)
            .arg("-o")
            .arg(request.report);
        debug!("running {:?}", command);

        let output = match run_bounded(&mut command, Duration::from_secs(self.config.timeout_secs)) {
            Ok(output) => output,
            Err(ProcessError::NotFound(program)) => return Err(SolverError::ToolUnavailable(program)),
            Err(ProcessError::TimedOut { timeout, stdout, stderr, .. }) => {
                return Err(SolverError::TimedOut { timeout, stdout, stderr })
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status.to_string(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        info!("solver finished, report at {}", request.report.display());
        Ok(SolverRun {
            stdout: output.stdout,
            stderr: output.stderr,
            report: request.report.to_path_buf(),
        })
    }
}
