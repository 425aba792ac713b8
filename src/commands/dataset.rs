use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use lpbench::instance::VariantKind;
use lpbench::loader;

/// Validates an instance file and writes its solver dataset.
#[derive(Debug, Args)]
pub struct Dataset {
    #[arg(long, value_enum, default_value_t = VariantKind::Schedule)]
    variant: VariantKind,
    /// The instance file to read
    input: PathBuf,
    /// Where to write the dataset, stdout when absent
    output: Option<PathBuf>,
}

impl Dataset {
    pub fn dataset(&self) -> Result<()> {
        let instance = loader::load(&self.input, self.variant)?;
        let document = instance
            .to_dataset()
            .with_context(|| format!("cannot serialize `{}`", self.input.display()))?;
        super::emit(&document.to_string(), self.output.as_deref())
    }
}
