//! This module defines an abstract representation of the problem instances
//! handled by the tool, one concrete type per problem variant.

use std::fmt;

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::{format_number, DatasetBuilder, DatasetDocument, DatasetError};
use crate::generate::SizeBounds;
use crate::loader::{InstanceReader, ValidationError};

pub mod schedule;
pub mod slots;
pub mod workshop;

pub use schedule::ScheduleInstance;
pub use slots::SlotsInstance;
pub use workshop::WorkshopInstance;

/// The problem types the tool knows how to load, generate and serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Buses assigned to workshops under a cost matrix
    Workshop,
    /// Buses assigned to time slots with delay and penalty constants
    Slots,
    /// Buses assigned to (slot, workshop) pairs under an availability matrix
    Schedule,
}

/// Field separator used by the data rows of an instance file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Whitespace,
    Comma,
}

impl Delimiter {
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Comma => line.split(',').map(str::trim).collect(),
        }
    }

    pub fn separator(&self) -> &'static str {
        match self {
            Delimiter::Whitespace => " ",
            Delimiter::Comma => ", ",
        }
    }
}

/// How the decision variable of a variant looks in the solver report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentShape {
    /// Name of the decision variable, e.g. `x` in `x[T1,A2]`
    pub variable: &'static str,
    /// Label prefix expected at each bracketed position, primary entity first
    pub tags: &'static [&'static str],
    /// Human readable role of each bracketed position
    pub roles: &'static [&'static str],
    /// Absolute distance to 1.0 under which a value counts as assigned
    pub tolerance: f64,
}

/// Capabilities every problem variant provides.
pub trait Variant: Sized {
    const KIND: VariantKind;
    /// Names of the integers on the size header, in file order
    const SIZE_NAMES: &'static [&'static str];
    const DELIMITER: Delimiter;
    const SHAPE: AssignmentShape;

    /// Reads and validates the instance body once the reader is positioned
    /// on the size header.
    fn parse(reader: &mut InstanceReader<'_>) -> Result<Self, ValidationError>;

    /// Declares the sets and parameters of the dataset document.
    fn describe(&self, dataset: &mut DatasetBuilder) -> Result<(), DatasetError>;

    /// The data rows of the instance file, header excluded.
    fn rows(&self) -> Vec<Vec<f64>>;

    /// Values of the size header, in `SIZE_NAMES` order.
    fn sizes(&self) -> Vec<usize>;

    /// Builds a random instance that is solvable by construction.
    fn generate(rng: &mut impl Rng, bounds: &SizeBounds) -> Self;

    fn availability_pct(&self) -> Option<f64> {
        None
    }
}

impl VariantKind {
    pub fn size_names(&self) -> &'static [&'static str] {
        match self {
            VariantKind::Workshop => WorkshopInstance::SIZE_NAMES,
            VariantKind::Slots => SlotsInstance::SIZE_NAMES,
            VariantKind::Schedule => ScheduleInstance::SIZE_NAMES,
        }
    }

    pub fn delimiter(&self) -> Delimiter {
        match self {
            VariantKind::Workshop => WorkshopInstance::DELIMITER,
            VariantKind::Slots => SlotsInstance::DELIMITER,
            VariantKind::Schedule => ScheduleInstance::DELIMITER,
        }
    }

    pub fn shape(&self) -> AssignmentShape {
        match self {
            VariantKind::Workshop => WorkshopInstance::SHAPE,
            VariantKind::Slots => SlotsInstance::SHAPE,
            VariantKind::Schedule => ScheduleInstance::SHAPE,
        }
    }

    /// Parses the text of an instance file for this variant.
    pub fn parse(&self, text: &str) -> Result<ProblemInstance, ValidationError> {
        let mut reader = InstanceReader::new(text, self.delimiter())?;
        let instance = match self {
            VariantKind::Workshop => ProblemInstance::Workshop(WorkshopInstance::parse(&mut reader)?),
            VariantKind::Slots => ProblemInstance::Slots(SlotsInstance::parse(&mut reader)?),
            VariantKind::Schedule => ProblemInstance::Schedule(ScheduleInstance::parse(&mut reader)?),
        };
        reader.finish()?;
        Ok(instance)
    }

    pub fn generate(&self, rng: &mut impl Rng, bounds: &SizeBounds) -> ProblemInstance {
        match self {
            VariantKind::Workshop => ProblemInstance::Workshop(WorkshopInstance::generate(rng, bounds)),
            VariantKind::Slots => ProblemInstance::Slots(SlotsInstance::generate(rng, bounds)),
            VariantKind::Schedule => ProblemInstance::Schedule(ScheduleInstance::generate(rng, bounds)),
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariantKind::Workshop => "workshop",
            VariantKind::Slots => "slots",
            VariantKind::Schedule => "schedule",
        };
        f.write_str(name)
    }
}

/// A validated instance of any variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum ProblemInstance {
    Workshop(WorkshopInstance),
    Slots(SlotsInstance),
    Schedule(ScheduleInstance),
}

impl ProblemInstance {
    pub fn kind(&self) -> VariantKind {
        match self {
            ProblemInstance::Workshop(_) => WorkshopInstance::KIND,
            ProblemInstance::Slots(_) => SlotsInstance::KIND,
            ProblemInstance::Schedule(_) => ScheduleInstance::KIND,
        }
    }

    pub fn sizes(&self) -> Vec<usize> {
        match self {
            ProblemInstance::Workshop(i) => i.sizes(),
            ProblemInstance::Slots(i) => i.sizes(),
            ProblemInstance::Schedule(i) => i.sizes(),
        }
    }

    pub fn availability_pct(&self) -> Option<f64> {
        match self {
            ProblemInstance::Workshop(i) => i.availability_pct(),
            ProblemInstance::Slots(i) => i.availability_pct(),
            ProblemInstance::Schedule(i) => i.availability_pct(),
        }
    }

    /// Renders the dataset document consumed by the solver.
    pub fn to_dataset(&self) -> Result<DatasetDocument, DatasetError> {
        let mut dataset = DatasetBuilder::new();
        match self {
            ProblemInstance::Workshop(i) => i.describe(&mut dataset)?,
            ProblemInstance::Slots(i) => i.describe(&mut dataset)?,
            ProblemInstance::Schedule(i) => i.describe(&mut dataset)?,
        }
        Ok(dataset.build())
    }

    /// Renders the instance back to the instance-file format of its variant.
    pub fn to_instance_file(&self) -> String {
        let rows = match self {
            ProblemInstance::Workshop(i) => i.rows(),
            ProblemInstance::Slots(i) => i.rows(),
            ProblemInstance::Schedule(i) => i.rows(),
        };
        let separator = self.kind().delimiter().separator();

        let mut out = self.sizes().iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ");
        out.push('\n');
        for row in rows.iter().filter(|r| !r.is_empty()) {
            let line = row.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(separator);
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parsed_instances_know_their_kind() {
        let files = [
            (VariantKind::Workshop, "1 1\n3\n"),
            (VariantKind::Slots, "1 1\n1, 2\n3\n4\n"),
            (VariantKind::Schedule, "1 1 1\n0\n1\n"),
        ];
        for (kind, text) in files {
            let instance = kind.parse(text).unwrap();
            assert_eq!(instance.kind(), kind);
            assert_eq!(instance.sizes().len(), kind.size_names().len());
        }
    }
}
