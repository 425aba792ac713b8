use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;

use lpbench::generate::{InstanceGenerator, SizeBounds};
use lpbench::instance::VariantKind;

#[derive(Debug, Args)]
pub struct Generate {
    /// The problem variant to generate
    #[arg(long, value_enum, default_value_t = VariantKind::Schedule)]
    variant: VariantKind,
    /// An optional seed to kickstart the instance generation
    #[arg(short, long)]
    seed: Option<u128>,
    /// Smallest value of every size parameter
    #[arg(long)]
    min: Option<usize>,
    /// Largest value of every size parameter
    #[arg(long)]
    max: Option<usize>,
    /// Name of the file where to write the instance
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Generate {
    pub fn generate(&self) -> Result<()> {
        let defaults = SizeBounds::for_variant(self.variant);
        let bounds = SizeBounds::new(self.min.unwrap_or(defaults.min), self.max.unwrap_or(defaults.max));
        let mut generator = InstanceGenerator::new(self.variant, bounds, self.seed);

        let instance = generator.generate();
        info!("generated {} instance with sizes {:?}", self.variant, instance.sizes());
        super::emit(&instance.to_instance_file(), self.output.as_deref())
    }
}
