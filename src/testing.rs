//! Solver doubles shared by the unit tests.

use std::{cell::Cell, fs};

use crate::solver::{SolveRequest, Solver, SolverError, SolverRun};

pub const OPTIMAL_REPORT: &str = "\
Rows:       4
Columns:    6 (6 integer, 6 binary)
Status:     INTEGER OPTIMAL
Objective:  z = 17 (MINimum)
";

/// Writes a canned report for every call except the (1-based) calls listed
/// in `fail_on`, which fail like a crashing solver.
pub struct ScriptedSolver {
    pub report: String,
    pub log: String,
    pub fail_on: Vec<usize>,
    pub unavailable: bool,
    pub calls: Cell<usize>,
}

impl ScriptedSolver {
    pub fn optimal() -> Self {
        ScriptedSolver {
            report: OPTIMAL_REPORT.to_string(),
            log: String::new(),
            fail_on: vec![],
            unavailable: false,
            calls: Cell::new(0),
        }
    }
}

impl Solver for ScriptedSolver {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<SolverRun, SolverError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);

        if self.unavailable {
            return Err(SolverError::ToolUnavailable("glpsol".to_string()));
        }
        assert!(request.dataset.exists(), "dataset must be written before solving");
        if self.fail_on.contains(&call) {
            return Err(SolverError::Failed {
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: format!("scripted failure on call {call}"),
            });
        }
        if !self.report.is_empty() {
            fs::write(request.report, &self.report).unwrap();
        }
        Ok(SolverRun {
            stdout: self.log.clone(),
            stderr: String::new(),
            report: request.report.to_path_buf(),
        })
    }
}
