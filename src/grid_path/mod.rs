//! Randomized room placement on a `GridPlan`.
//!
//! Every template seeds some starting rooms and then grows the layout with a `PathExpander`:
//! a pool of *terminals* (locations the main thread may continue from) and a pool of
//! *branchables* (locations that still had a spare direction when they were used). Each
//! extension adds the sampled branch ratio to a credit; every full 100 of credit forces one
//! extra room off a branchable instead of continuing the thread.

pub mod branch;
pub mod edge;
pub mod pyramid;
pub mod tread;

pub use branch::GridPathBranch;
pub use edge::GridPathEdge;
pub use pyramid::GridPathPyramid;
pub use tread::GridPathTread;

use crate::{
    error::{GenError, GenResult},
    floor_plan::RecordKind,
    geometry::{Dir4, Loc, Rect},
    grid_plan::GridPlan,
    room_gen::RoomGen,
    sampling::SpawnList,
    tags::TagSet,
};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Shapes handed out to the rooms and halls a template places.
#[derive(Clone, Debug, Default)]
pub struct PathPools {
    pub rooms: SpawnList<Box<dyn RoomGen>>,
    pub halls: SpawnList<Box<dyn RoomGen>>,
}

impl PathPools {
    pub fn pick_room(&self, rng: &mut impl Rng) -> GenResult<Box<dyn RoomGen>> {
        self.rooms
            .pick(rng)
            .cloned()
            .ok_or(GenError::EmptyPool("rooms"))
    }

    pub fn pick_hall(&self, rng: &mut impl Rng) -> GenResult<Box<dyn RoomGen>> {
        self.halls
            .pick(rng)
            .cloned()
            .ok_or(GenError::EmptyPool("halls"))
    }
}

/// How many rooms a template meant to place and how many it did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PathOutcome {
    pub target: usize,
    pub placed: usize,
}

impl PathOutcome {
    pub fn is_complete(&self) -> bool {
        self.placed >= self.target
    }
}

pub trait GridPathGen {
    /// Populates an empty `plan`. Falling short of the target is reported in the outcome, not
    /// as an error.
    fn apply_to_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &mut GridPlan,
        pools: &PathPools,
    ) -> GenResult<PathOutcome>;
}

/// Data form of the built-in templates.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GridPathSpec {
    Edge(GridPathEdge),
    Pyramid(GridPathPyramid),
    Tread(GridPathTread),
    Branch(GridPathBranch),
}

impl GridPathGen for GridPathSpec {
    fn apply_to_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &mut GridPlan,
        pools: &PathPools,
    ) -> GenResult<PathOutcome> {
        match self {
            GridPathSpec::Edge(p) => p.apply_to_plan(rng, plan, pools),
            GridPathSpec::Pyramid(p) => p.apply_to_plan(rng, plan, pools),
            GridPathSpec::Tread(p) => p.apply_to_plan(rng, plan, pools),
            GridPathSpec::Branch(p) => p.apply_to_plan(rng, plan, pools),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Weighting {
    Uniform,
    /// Favor locations with more open neighbors; see `GridPlan::organic_weight`.
    Organic,
}

fn pick_weighted(rng: &mut impl Rng, weights: &[u64]) -> Option<usize> {
    let total: u64 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0, total);
    for (i, w) in weights.iter().enumerate() {
        if roll < *w {
            return Some(i);
        }
        roll -= *w;
    }

    None
}

pub struct PathExpander<'a> {
    pools: &'a PathPools,
    pub terminals: Vec<Loc>,
    pub branchables: Vec<Loc>,
    pub target: usize,
    pub placed: usize,
    /// Cells new rooms may go in. `None` allows the whole grid.
    pub region: Option<Rect>,
    branch_ratio: i32,
    credit: i32,
    weighting: Weighting,
    force_branches: bool,
}

impl<'a> PathExpander<'a> {
    pub fn new(
        pools: &'a PathPools,
        target: usize,
        branch_ratio: i32,
        weighting: Weighting,
        force_branches: bool,
    ) -> Self {
        PathExpander {
            pools,
            terminals: Vec::new(),
            branchables: Vec::new(),
            target,
            placed: 0,
            region: None,
            branch_ratio: branch_ratio.max(0),
            credit: 0,
            weighting,
            force_branches,
        }
    }

    pub fn outcome(&self) -> PathOutcome {
        PathOutcome {
            target: self.target,
            placed: self.placed,
        }
    }

    /// Open directions out of `loc` that stay inside the region.
    fn open_dirs(&self, plan: &GridPlan, loc: Loc) -> Vec<Dir4> {
        let mut dirs = plan.open_dirs(loc);
        if let Some(region) = self.region {
            dirs.retain(|d| plan.neighbor(loc, d.offset()).map_or(false, |n| region.contains(n)));
        }

        dirs
    }

    fn prune(&mut self, plan: &GridPlan) {
        let terminals = std::mem::take(&mut self.terminals);
        self.terminals = terminals
            .into_iter()
            .filter(|l| !self.open_dirs(plan, *l).is_empty())
            .collect();
        let branchables = std::mem::take(&mut self.branchables);
        self.branchables = branchables
            .into_iter()
            .filter(|l| !self.open_dirs(plan, *l).is_empty())
            .collect();
    }

    fn location_weight(&self, plan: &GridPlan, loc: Loc) -> u64 {
        match self.weighting {
            Weighting::Uniform => 1,
            Weighting::Organic => plan.organic_weight(loc),
        }
    }

    fn pick_location(&self, plan: &GridPlan, rng: &mut impl Rng, pool: &[Loc]) -> Option<usize> {
        let weights: Vec<u64> = pool
            .iter()
            .map(|l| self.location_weight(plan, *l))
            .collect();

        pick_weighted(rng, &weights)
    }

    fn pick_dir(&self, plan: &GridPlan, rng: &mut impl Rng, from: Loc) -> Option<Dir4> {
        let dirs = self.open_dirs(plan, from);
        let weights: Vec<u64> = dirs
            .iter()
            .map(|d| match plan.neighbor(from, d.offset()) {
                Some(to) => self.location_weight(plan, to),
                None => 0,
            })
            .collect();

        pick_weighted(rng, &weights).map(|i| dirs[i])
    }

    /// Adds a 1x1 room next to `from` and a hall between them.
    pub fn extend(
        &mut self,
        plan: &mut GridPlan,
        rng: &mut impl Rng,
        from: Loc,
        dir: Dir4,
    ) -> GenResult<Loc> {
        let to = plan
            .neighbor(from, dir.offset())
            .ok_or(GenError::NotNeighbors(from, from + dir.offset()))?;
        let gen = self.pools.pick_room(rng)?;
        plan.add_room(Rect::from_start_size(to, Loc::new(1, 1)), gen, TagSet::new(), RecordKind::Room)?;
        let hall = self.pools.pick_hall(rng)?;
        plan.set_hall(from, to, hall)?;
        self.placed += 1;

        Ok(to)
    }

    /// Grows one extra room off a random branchable. Returns false when none is left.
    pub fn branch_once(&mut self, plan: &mut GridPlan, rng: &mut impl Rng) -> GenResult<bool> {
        self.prune(plan);
        let i = match self.pick_location(plan, rng, &self.branchables) {
            Some(i) => i,
            None => return Ok(false),
        };
        let from = self.branchables[i];
        let dir = match self.pick_dir(plan, rng, from) {
            Some(d) => d,
            None => return Ok(false),
        };
        let to = self.extend(plan, rng, from, dir)?;
        self.branchables.push(to);
        log::debug!("Branched from {:?} to {:?}", from, to);

        Ok(true)
    }

    /// Spends whatever branch credit one more extension earned.
    pub fn accrue_branch_credit(&mut self, plan: &mut GridPlan, rng: &mut impl Rng) -> GenResult<()> {
        self.credit += self.branch_ratio;
        while self.credit >= 100 && self.placed < self.target {
            self.credit -= 100;
            if !self.branch_once(plan, rng)? {
                break;
            }
        }

        Ok(())
    }

    /// Runs the main thread until the target is met or every pool is exhausted.
    pub fn expand(&mut self, plan: &mut GridPlan, rng: &mut impl Rng) -> GenResult<PathOutcome> {
        while self.placed < self.target {
            self.prune(plan);
            if self.terminals.is_empty() {
                if !self.force_branches || self.branchables.is_empty() {
                    break;
                }
                let i = rng.gen_range(0, self.branchables.len());
                let loc = self.branchables.swap_remove(i);
                log::debug!("Terminals exhausted, forcing a branch from {:?}", loc);
                self.terminals.push(loc);
                continue;
            }

            let i = match self.pick_location(plan, rng, &self.terminals) {
                Some(i) => i,
                None => break,
            };
            let from = self.terminals.swap_remove(i);
            let dir = match self.pick_dir(plan, rng, from) {
                Some(d) => d,
                None => continue,
            };
            let to = self.extend(plan, rng, from, dir)?;
            if !self.open_dirs(plan, from).is_empty() && !self.branchables.contains(&from) {
                self.branchables.push(from);
            }
            self.terminals.push(to);
            self.accrue_branch_credit(plan, rng)?;
        }

        let outcome = self.outcome();
        if !outcome.is_complete() {
            log::info!(
                "Path expansion placed {} of {} rooms before running out of room",
                outcome.placed,
                outcome.target
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::{
        room_gen::{RoomGenHall, RoomGenSquare},
        sampling::RandRange,
    };

    pub fn pools() -> PathPools {
        PathPools {
            rooms: SpawnList::new().with(
                Box::new(RoomGenSquare::new(RandRange::new(2, 4), RandRange::new(2, 4)))
                    as Box<dyn RoomGen>,
                1,
            ),
            halls: SpawnList::new().with(Box::new(RoomGenHall::default()) as Box<dyn RoomGen>, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::small_rng;

    #[test]
    fn test_organic_expansion_meets_target() {
        let pools = test_util::pools();
        let mut rng = small_rng(5);
        let mut plan = GridPlan::new(6, 6, Loc::new(4, 4));
        let start = Loc::new(2, 2);
        plan.add_room(
            Rect::from_start_size(start, Loc::new(1, 1)),
            pools.pick_room(&mut rng).unwrap(),
            TagSet::new(),
            RecordKind::Room,
        )
        .unwrap();

        let mut expander = PathExpander::new(&pools, 20, 50, Weighting::Organic, true);
        expander.terminals.push(start);
        let outcome = expander.expand(&mut plan, &mut rng).unwrap();

        assert!(outcome.is_complete());
        assert_eq!(plan.room_count(), 21);
        assert_eq!(plan.hall_count(), 20);
    }

    #[test]
    fn test_dead_end_without_forced_branches_falls_short() {
        let pools = test_util::pools();
        let mut rng = small_rng(5);
        let mut plan = GridPlan::new(3, 1, Loc::new(4, 4));
        let start = Loc::new(0, 0);
        plan.add_room(
            Rect::from_start_size(start, Loc::new(1, 1)),
            pools.pick_room(&mut rng).unwrap(),
            TagSet::new(),
            RecordKind::Room,
        )
        .unwrap();

        let mut expander = PathExpander::new(&pools, 5, 0, Weighting::Uniform, false);
        expander.terminals.push(start);
        let outcome = expander.expand(&mut plan, &mut rng).unwrap();

        assert_eq!(outcome, PathOutcome { target: 5, placed: 2 });
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_empty_room_pool_is_structural() {
        let pools = PathPools::default();
        let mut rng = small_rng(0);
        let mut plan = GridPlan::new(2, 1, Loc::new(4, 4));
        let mut expander = PathExpander::new(&pools, 1, 0, Weighting::Uniform, false);

        assert_eq!(
            expander.extend(&mut plan, &mut rng, Loc::new(0, 0), Dir4::Right),
            Err(GenError::EmptyPool("rooms"))
        );
    }
}
