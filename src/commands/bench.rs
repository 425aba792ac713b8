use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use lpbench::generate::SizeBounds;
use lpbench::harness::{BenchmarkHarness, HarnessConfig};
use lpbench::instance::VariantKind;
use lpbench::solver::Glpsol;

/// Generates, solves and records a batch of random cases.
#[derive(Debug, Args)]
pub struct Bench {
    /// Number of cases
    cases: Option<usize>,
    /// The statistics file, recreated at the start of the run
    output: Option<PathBuf>,
    #[arg(long, value_enum)]
    variant: Option<VariantKind>,
    /// The model file
    #[arg(short, long)]
    model: Option<PathBuf>,
    /// An optional seed making the batch reproducible
    #[arg(short, long)]
    seed: Option<u64>,
    /// Keep the instance, dataset and report files of every case
    #[arg(long)]
    keep_files: bool,
    /// Directory receiving the per-case files
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Seconds a single solve may take
    #[arg(short, long)]
    timeout: Option<u64>,
    #[arg(long)]
    min: Option<usize>,
    #[arg(long)]
    max: Option<usize>,
    /// JSON run configuration, overridden by the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Bench {
    pub fn bench(&self) -> Result<()> {
        let config = self.config()?;
        if config.model.as_os_str().is_empty() {
            bail!("no model file given (use --model or the `model` config key)");
        }
        let solver = Glpsol::new(config.solver.clone());
        let summary = BenchmarkHarness::new(config, solver).run()?;

        println!("{} of {} cases recorded", summary.recorded, summary.cases);
        for failure in &summary.failures {
            println!("case {} skipped: {}", failure.case, failure.reason);
        }
        Ok(())
    }

    fn config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("cannot open `{}`", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("cannot read configuration `{}`", path.display()))?
            }
            None => HarnessConfig::default(),
        };

        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(cases) = self.cases {
            config.cases = cases;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.solver.timeout_secs = timeout;
        }
        config.seed = self.seed.or(config.seed);
        config.keep_files |= self.keep_files;

        if self.min.is_some() || self.max.is_some() {
            let base = config.bounds.unwrap_or_else(|| SizeBounds::for_variant(config.variant));
            config.bounds = Some(SizeBounds::new(self.min.unwrap_or(base.min), self.max.unwrap_or(base.max)));
        }
        Ok(config)
    }
}
