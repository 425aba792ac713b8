use std::{fs, path::Path};

use anyhow::{Context, Result};

mod bench;
mod dataset;
mod generate;
mod solve;

pub use bench::Bench;
pub use dataset::Dataset;
pub use generate::Generate;
pub use solve::Solve;

/// Writes `text` to `output`, or prints it when there is no output file.
fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text).with_context(|| format!("cannot write `{}`", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
