use crate::error::{GenError, GenResult};

use rand::{prelude::*, rngs::SmallRng};
use serde::{Deserialize, Serialize};

/// The one generator threaded through a whole floor.
pub fn small_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Inclusive integer range `[min, max]`, as written in configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RandRange {
    pub min: i32,
    pub max: i32,
}

impl RandRange {
    pub const fn new(min: i32, max: i32) -> Self {
        RandRange { min, max }
    }

    pub const fn exact(value: i32) -> Self {
        RandRange {
            min: value,
            max: value,
        }
    }

    pub fn validate(&self) -> GenResult<()> {
        if self.min > self.max {
            Err(GenError::EmptyRange {
                min: self.min,
                max: self.max,
            })
        } else {
            Ok(())
        }
    }

    /// Draws exactly one value, even when the range is a single point, so the draw sequence
    /// doesn't depend on the configured values.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> GenResult<i32> {
        self.validate()?;

        Ok(rng.gen_range(self.min, self.max + 1))
    }
}

/// A weighted pool of spawnable things (room shapes, items, monsters, ...).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpawnList<T> {
    entries: Vec<(T, u32)>,
}

impl<T> Default for SpawnList<T> {
    fn default() -> Self {
        SpawnList {
            entries: Vec::new(),
        }
    }
}

impl<T> SpawnList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: T, weight: u32) -> Self {
        self.add(item, weight);

        self
    }

    pub fn add(&mut self, item: T, weight: u32) {
        self.entries.push((item, weight));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_weight() == 0
    }

    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|(_, w)| *w).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(T, u32)> {
        self.entries.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> GenResult<U>) -> GenResult<SpawnList<U>> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (item, weight) in self.entries.iter() {
            entries.push((f(item)?, *weight));
        }

        Ok(SpawnList { entries })
    }

    pub fn pick_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }

        let mut roll = rng.gen_range(0, total);
        for (i, (_, weight)) in self.entries.iter().enumerate() {
            if roll < *weight {
                return Some(i);
            }
            roll -= *weight;
        }

        None
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        self.pick_index(rng).map(|i| &self.entries[i].0)
    }
}

/// Removes and returns up to `count` uniformly chosen elements of `pool`.
pub fn take_random<T, R: Rng + ?Sized>(rng: &mut R, pool: &mut Vec<T>, count: usize) -> Vec<T> {
    let mut taken = Vec::with_capacity(count.min(pool.len()));
    while taken.len() < count && !pool.is_empty() {
        let i = rng.gen_range(0, pool.len());
        taken.push(pool.swap_remove(i));
    }

    taken
}

/// Percentage of `available`, floored, never less than one.
pub fn percent_of(available: usize, percent: i32) -> usize {
    ((available as i64 * percent.max(0) as i64) / 100).max(1) as usize
}
