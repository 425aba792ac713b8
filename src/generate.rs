//! Random instances that are solvable by construction.
//!
//! The generator owns a single `ChaChaRng` seeded once, so a seeded batch
//! replays the same instances in the same case order.

use std::time::{SystemTime, UNIX_EPOCH};

use derivative::Derivative;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::instance::{ProblemInstance, VariantKind};

/// Inclusive range every size parameter of a generated instance is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
pub struct SizeBounds {
    #[derivative(Default(value = "1"))]
    pub min: usize,
    #[derivative(Default(value = "10"))]
    pub max: usize,
}

impl SizeBounds {
    pub fn new(min: usize, max: usize) -> Self {
        SizeBounds { min: min.min(max), max: min.max(max) }
    }

    /// Default bounds of each variant.
    pub fn for_variant(kind: VariantKind) -> Self {
        match kind {
            VariantKind::Slots => SizeBounds::new(0, 15),
            VariantKind::Workshop | VariantKind::Schedule => SizeBounds::default(),
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(self.min..=self.max.max(self.min))
    }
}

#[derive(Debug, Clone)]
pub struct InstanceGenerator {
    kind: VariantKind,
    bounds: SizeBounds,
    rng: ChaChaRng,
}

impl InstanceGenerator {
    pub fn new(kind: VariantKind, bounds: SizeBounds, seed: Option<u128>) -> Self {
        InstanceGenerator { kind, bounds, rng: rng(seed) }
    }

    pub fn kind(&self) -> VariantKind {
        self.kind
    }

    pub fn generate(&mut self) -> ProblemInstance {
        self.kind.generate(&mut self.rng, &self.bounds)
    }
}

/// Upper bound, inclusive, of generated integral costs.
pub const MAX_COST: u32 = 100;

/// A `rows` x `cols` matrix of whole costs in `1..=MAX_COST`.
pub fn integral_costs(rng: &mut impl Rng, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    let rand_cost = Uniform::new_inclusive(1, MAX_COST);
    (0..rows)
        .map(|_| (0..cols).map(|_| rand_cost.sample(rng) as f64).collect())
        .collect()
}

/// A symmetric `size` x `size` cost matrix with a zero diagonal. Only the
/// upper triangle is sampled and then mirrored.
pub fn symmetric_costs(rng: &mut impl Rng, size: usize) -> Vec<Vec<f64>> {
    let rand_cost = Uniform::new_inclusive(1, MAX_COST);
    let mut costs = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in (i + 1)..size {
            let cost = rand_cost.sample(rng) as f64;
            costs[i][j] = cost;
            costs[j][i] = cost;
        }
    }
    costs
}

/// Forces one random cell open when no cell of `availability` is, and
/// returns the number of open cells. A matrix without any cell stays
/// closed and has no capacity.
pub fn repair_availability(rng: &mut impl Rng, availability: &mut [Vec<bool>]) -> usize {
    let open = availability.iter().flatten().filter(|&&b| b).count();
    if open > 0 {
        return open;
    }
    let rows = availability.len();
    let cols = availability.first().map_or(0, |r| r.len());
    if rows == 0 || cols == 0 {
        return 0;
    }
    let (r, c) = (rng.gen_range(0..rows), rng.gen_range(0..cols));
    availability[r][c] = true;
    1
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds the batch generator; without a seed the current time is used.
pub fn rng(seed: Option<u128>) -> ChaChaRng {
    let init = seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    });
    let mut seed = [0_u8; 32];
    seed.iter_mut().zip(init.to_be_bytes().into_iter()).for_each(|(s, i)| *s = i);
    seed.iter_mut().rev().zip(init.to_le_bytes().into_iter()).for_each(|(s, i)| *s = i);
    ChaChaRng::from_seed(seed)
}
