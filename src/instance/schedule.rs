//! Buses assigned to (slot, workshop) pairs.
//!
//! The instance file holds the symmetric passenger overlap matrix `C`
//! (buses x buses) followed by the availability matrix `O` with one row per
//! workshop and one column per slot. The dataset declares `o` indexed the
//! other way round, `o[s,t]`.

use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};

use super::{AssignmentShape, Delimiter, Variant, VariantKind};
use crate::dataset::{DatasetBuilder, DatasetError};
use crate::generate::{repair_availability, symmetric_costs, SizeBounds};
use crate::loader::{
    ensure_binary, ensure_integral, ensure_non_negative, ensure_symmetric, InstanceReader,
    ValidationError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInstance {
    pub nb_slots: usize,
    pub nb_buses: usize,
    pub nb_workshops: usize,
    /// `overlap[i][j]`: passengers shared by buses i and j, symmetric
    pub overlap: Vec<Vec<f64>>,
    /// `availability[t][s]`: whether workshop t is open during slot s
    pub availability: Vec<Vec<bool>>,
}

impl Variant for ScheduleInstance {
    const KIND: VariantKind = VariantKind::Schedule;
    const SIZE_NAMES: &'static [&'static str] = &["slots", "buses", "workshops"];
    const DELIMITER: Delimiter = Delimiter::Whitespace;
    const SHAPE: AssignmentShape = AssignmentShape {
        variable: "x",
        tags: &["A", "S", "T"],
        roles: &["Bus", "Slot", "Workshop"],
        tolerance: 1e-6,
    };

    fn parse(reader: &mut InstanceReader<'_>) -> Result<Self, ValidationError> {
        let sizes = reader.header(Self::SIZE_NAMES)?;
        let (nb_slots, nb_buses, nb_workshops) = (sizes[0], sizes[1], sizes[2]);
        let overlap = reader.matrix("C", nb_buses, nb_buses)?;
        let availability = reader.matrix("O", nb_workshops, nb_slots)?;

        ensure_non_negative("C", &overlap)?;
        ensure_integral("C", &overlap)?;

        ensure_symmetric("C", &overlap)?;
        ensure_binary("O", &availability)?;

        let availability = availability
            .into_iter()
            .map(|row| row.into_iter().map(|v| v == 1.0).collect())
            .collect();

        Ok(ScheduleInstance { nb_slots, nb_buses, nb_workshops, overlap, availability })
    }

    fn describe(&self, dataset: &mut DatasetBuilder) -> Result<(), DatasetError> {
        dataset.comment("--- Sets ---");
        dataset.set("AUTOBUSES", "A", self.nb_buses)?;
        dataset.set("TALLERES", "T", self.nb_workshops)?;
        dataset.set("FRANJAS", "S", self.nb_slots)?;

        dataset.comment("--- Passenger overlap (c[i,j]) ---");
        dataset.table("c", "AUTOBUSES", "AUTOBUSES", &self.overlap)?;

        dataset.comment("--- Workshop availability per slot (o[s,t]) ---");
        dataset.table("o", "FRANJAS", "TALLERES", &self.availability_by_slot()?)
    }

    fn rows(&self) -> Vec<Vec<f64>> {
        let availability = self.availability.iter().map(|row| flags(row));
        self.overlap.iter().cloned().chain(availability).collect()
    }

    fn sizes(&self) -> Vec<usize> {
        vec![self.nb_slots, self.nb_buses, self.nb_workshops]
    }

    fn generate(rng: &mut impl Rng, bounds: &SizeBounds) -> Self {
        let nb_slots = bounds.sample(rng);
        let nb_buses = bounds.sample(rng);
        let nb_workshops = bounds.sample(rng);

        let cells = nb_slots * nb_workshops;
        let mut availability = vec![vec![false; nb_slots]; nb_workshops];
        for pos in index::sample(rng, cells, (nb_buses + 2).min(cells)) {
            availability[pos / nb_slots][pos % nb_slots] = true;
        }

        let capacity = repair_availability(rng, &mut availability);
        let nb_buses = nb_buses.min(capacity);
        let overlap = symmetric_costs(rng, nb_buses);

        ScheduleInstance { nb_slots, nb_buses, nb_workshops, overlap, availability }
    }

    /// Share of slots served by at least one workshop, in percent.
    fn availability_pct(&self) -> Option<f64> {
        if self.nb_slots == 0 {
            return Some(0.0);
        }
        let open = (0..self.nb_slots)
            .filter(|&s| self.availability.iter().any(|row| row[s]))
            .count();
        Some(open as f64 / self.nb_slots as f64 * 100.0)
    }
}

impl ScheduleInstance {
    fn availability_by_slot(&self) -> Result<Vec<Vec<f64>>, DatasetError> {
        if let Some(r) = self.availability.iter().position(|row| row.len() != self.nb_slots) {
            return Err(DatasetError::RowMismatch {
                param: "o".to_string(),
                set: "FRANJAS".to_string(),
                row: r + 1,
                expected: self.nb_slots,
                found: self.availability[r].len(),
            });
        }
        Ok((0..self.nb_slots)
            .map(|s| self.availability.iter().map(|row| if row[s] { 1.0 } else { 0.0 }).collect())
            .collect())
    }
}

fn flags(row: &[bool]) -> Vec<f64> {
    row.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()
}
