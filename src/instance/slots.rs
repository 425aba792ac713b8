//! Buses assigned to time slots, with a delay constant `kd`, a penalty
//! constant `kp` and per-bus delay and passenger figures.
//!
//! Data rows of this variant are comma separated: `kd, kp` on the first
//! line, then the `d` list and the `p` list.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use super::{AssignmentShape, Delimiter, Variant, VariantKind};
use crate::dataset::{DatasetBuilder, DatasetError};
use crate::generate::{round2, SizeBounds};
use crate::loader::{ensure_non_negative, InstanceReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsInstance {
    pub nb_slots: usize,
    pub nb_buses: usize,
    pub kd: f64,
    pub kp: f64,
    /// Delay figure of each bus
    pub delay: Vec<f64>,
    /// Passenger figure of each bus
    pub passengers: Vec<f64>,
}

impl Variant for SlotsInstance {
    const KIND: VariantKind = VariantKind::Slots;
    const SIZE_NAMES: &'static [&'static str] = &["slots", "buses"];
    const DELIMITER: Delimiter = Delimiter::Comma;
    const SHAPE: AssignmentShape = AssignmentShape {
        variable: "x",
        tags: &["A", "S"],
        roles: &["Bus", "Slot"],
        tolerance: 1e-6,
    };

    fn parse(reader: &mut InstanceReader<'_>) -> Result<Self, ValidationError> {
        let sizes = reader.header(Self::SIZE_NAMES)?;
        let (nb_slots, nb_buses) = (sizes[0], sizes[1]);
        let constants = reader.row("kd, kp", 0, 2)?;
        let delay = reader.row("d", 0, nb_buses)?;
        let passengers = reader.row("p", 0, nb_buses)?;

        ensure_non_negative("kd, kp", &[constants.clone()])?;
        ensure_non_negative("d", &[delay.clone()])?;
        ensure_non_negative("p", &[passengers.clone()])?;

        Ok(SlotsInstance {
            nb_slots,
            nb_buses,
            kd: constants[0],
            kp: constants[1],
            delay,
            passengers,
        })
    }

    fn describe(&self, dataset: &mut DatasetBuilder) -> Result<(), DatasetError> {
        dataset.set("AUTOBUSES", "A", self.nb_buses)?;
        dataset.set("FRANJAS", "S", self.nb_slots)?;
        dataset.scalar("kd", self.kd)?;
        dataset.scalar("kp", self.kp)?;
        dataset.list("d", "AUTOBUSES", &self.delay)?;
        dataset.list("p", "AUTOBUSES", &self.passengers)
    }

    fn rows(&self) -> Vec<Vec<f64>> {
        vec![vec![self.kd, self.kp], self.delay.clone(), self.passengers.clone()]
    }

    fn sizes(&self) -> Vec<usize> {
        vec![self.nb_slots, self.nb_buses]
    }

    fn generate(rng: &mut impl Rng, bounds: &SizeBounds) -> Self {
        let nb_slots = bounds.sample(rng);
        // a slot holds a single bus
        let nb_buses = bounds.sample(rng).min(nb_slots);

        let rand_constant = Uniform::new_inclusive(0.1, 10.0);
        let kd = round2(rand_constant.sample(rng));
        let kp = round2(rand_constant.sample(rng));

        let rand_figure = Uniform::new_inclusive(1.0, 50.0);
        let delay = (0..nb_buses).map(|_| round2(rand_figure.sample(rng))).collect();
        let passengers = (0..nb_buses).map(|_| round2(rand_figure.sample(rng))).collect();

        SlotsInstance { nb_slots, nb_buses, kd, kp, delay, passengers }
    }
}
