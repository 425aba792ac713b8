use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use lpbench::instance::VariantKind;
use lpbench::loader;
use lpbench::pipeline::solve_instance;
use lpbench::solver::{Glpsol, SolveRequest, SolverConfig};

#[derive(Debug, Args)]
pub struct Solve {
    #[arg(long, value_enum, default_value_t = VariantKind::Schedule)]
    variant: VariantKind,
    /// The path to the instance file
    input: PathBuf,
    /// Where to write the dataset handed to the solver
    output: PathBuf,
    /// The model file
    #[arg(short, long)]
    model: PathBuf,
    /// Where the solver writes its report, OUTPUT with an `.out` extension by default
    #[arg(short, long)]
    report: Option<PathBuf>,
    /// The solver executable
    #[arg(long, default_value = "glpsol")]
    solver: PathBuf,
    /// Seconds the solver may run before the case is abandoned
    #[arg(short, long, default_value = "60")]
    timeout: u64,
    /// Print the parsed report as JSON
    #[arg(long)]
    json: bool,
}

impl Solve {
    pub fn solve(&self) -> Result<()> {
        let instance = loader::load(&self.input, self.variant)?;
        let report = self.report.clone().unwrap_or_else(|| self.output.with_extension("out"));
        let solver = Glpsol::new(SolverConfig { program: self.solver.clone(), timeout_secs: self.timeout });

        let request = SolveRequest { model: &self.model, dataset: &self.output, report: &report };
        let result = solve_instance(&solver, &instance, &request)
            .with_context(|| format!("cannot solve `{}`", self.input.display()))?;
        info!("solved in {:.4}s", result.elapsed.as_secs_f64());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result.report)?);
        } else {
            print!("{}", result.report.summary(&self.variant.shape()));
        }
        Ok(())
    }
}
