pub mod dataset;
pub mod generate;
pub mod harness;
pub mod instance;
pub mod loader;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod solver;
pub mod stats;

#[cfg(test)]
mod testing;
