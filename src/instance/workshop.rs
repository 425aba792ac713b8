//! Buses assigned to workshops under a workshop x bus cost matrix.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{AssignmentShape, Delimiter, Variant, VariantKind};
use crate::dataset::{DatasetBuilder, DatasetError};
use crate::generate::{integral_costs, SizeBounds};
use crate::loader::{ensure_non_negative, InstanceReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopInstance {
    pub nb_workshops: usize,
    pub nb_buses: usize,
    /// `cost[t][a]`: one row per workshop, one column per bus
    pub cost: Vec<Vec<f64>>,
}

impl Variant for WorkshopInstance {
    const KIND: VariantKind = VariantKind::Workshop;
    const SIZE_NAMES: &'static [&'static str] = &["workshops", "buses"];
    const DELIMITER: Delimiter = Delimiter::Whitespace;
    const SHAPE: AssignmentShape = AssignmentShape {
        variable: "x",
        tags: &["T", "A"],
        roles: &["Workshop", "Bus"],
        tolerance: 1e-8,
    };

    fn parse(reader: &mut InstanceReader<'_>) -> Result<Self, ValidationError> {
        let sizes = reader.header(Self::SIZE_NAMES)?;
        let (nb_workshops, nb_buses) = (sizes[0], sizes[1]);
        let cost = reader.matrix("COST", nb_workshops, nb_buses)?;

        ensure_non_negative("COST", &cost)?;

        Ok(WorkshopInstance { nb_workshops, nb_buses, cost })
    }

    fn describe(&self, dataset: &mut DatasetBuilder) -> Result<(), DatasetError> {
        dataset.comment("--- Sets ---");
        dataset.set("TALLER", "T", self.nb_workshops)?;
        dataset.set("AUTOBUS", "A", self.nb_buses)?;
        dataset.comment("--- Cost of servicing bus a in workshop t ---");
        dataset.table("COST", "TALLER", "AUTOBUS", &self.cost)
    }

    fn rows(&self) -> Vec<Vec<f64>> {
        self.cost.clone()
    }

    fn sizes(&self) -> Vec<usize> {
        vec![self.nb_workshops, self.nb_buses]
    }

    fn generate(rng: &mut impl Rng, bounds: &SizeBounds) -> Self {
        let nb_workshops = bounds.sample(rng);
        // every bus needs a workshop of its own
        let nb_buses = bounds.sample(rng).min(nb_workshops);
        let cost = integral_costs(rng, nb_workshops, nb_buses);

        WorkshopInstance { nb_workshops, nb_buses, cost }
    }
}

#[cfg(test)]
mod test {
    use crate::instance::{ProblemInstance, VariantKind};
    use crate::loader::ValidationError;

    #[test]
    fn test_parse_and_serialize() {
        let instance = VariantKind::Workshop.parse("2 3\n4 5 6\n1 2.5 3\n").unwrap();
        let ProblemInstance::Workshop(ref workshop) = instance else {
            panic!("wrong variant");
        };
        assert_eq!(workshop.cost[1], vec![1.0, 2.5, 3.0]);

        let text = instance.to_dataset().unwrap().to_string();
        assert!(text.contains("set TALLER := T1 T2;\n"));
        assert!(text.contains("set AUTOBUS := A1 A2 A3;\n"));
        assert!(text.contains("param COST : A1 A2 A3 :=\nT1 4 5 6\nT2 1 2.5 3\n;\n"));
    }

    #[test]
    fn test_negative_cost_is_rejected() {
        let err = VariantKind::Workshop.parse("1 2\n4 -5\n").unwrap_err();
        assert!(matches!(err, ValidationError::Negative { row: 1, column: 2, .. }));
    }

    #[test]
    fn test_zero_sizes() {
        let instance = VariantKind::Workshop.parse("0 0\n").unwrap();
        assert_eq!(instance.sizes(), vec![0, 0]);
        let text = instance.to_dataset().unwrap().to_string();
        assert!(text.contains("set TALLER := ;"));
        assert!(text.contains("param COST := ;"));

        // workshops without buses have no cost lines at all
        let instance = VariantKind::Workshop.parse("3 0\n").unwrap();
        assert_eq!(instance.sizes(), vec![3, 0]);
    }
}
