use super::{GridPathGen, PathExpander, PathOutcome, PathPools, Weighting};
use crate::{
    error::GenResult,
    floor_plan::RecordKind,
    geometry::{Loc, Rect},
    grid_plan::GridPlan,
    sampling::{percent_of, RandRange},
    tags::TagSet,
};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Grows organically from one random starting room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GridPathBranch {
    pub room_ratio: RandRange,
    pub branch_ratio: RandRange,
    /// Keep going off earlier rooms when the main thread dead-ends.
    pub force_branches: bool,
}

impl GridPathGen for GridPathBranch {
    fn apply_to_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &mut GridPlan,
        pools: &PathPools,
    ) -> GenResult<PathOutcome> {
        let start = Loc::new(rng.gen_range(0, plan.width()), rng.gen_range(0, plan.height()));
        plan.add_room(Rect::from_start_size(start, Loc::new(1, 1)), pools.pick_room(rng)?, TagSet::new(), RecordKind::Room)?;
        log::debug!("Starting branch layout from {:?}", start);

        let available = plan.cell_count() - 1;
        let target = percent_of(available, self.room_ratio.pick(rng)?).min(available);
        let branch_ratio = self.branch_ratio.pick(rng)?;

        let mut expander = PathExpander::new(
            pools,
            target,
            branch_ratio,
            Weighting::Organic,
            self.force_branches,
        );
        expander.terminals.push(start);

        expander.expand(plan, rng)
    }
}
