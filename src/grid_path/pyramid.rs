use super::{GridPathGen, PathExpander, PathOutcome, PathPools, Weighting};
use crate::{
    error::GenResult,
    floor_plan::RecordKind,
    geometry::{Loc, Rect, DIAGONALS},
    grid_plan::GridPlan,
    sampling::{percent_of, RandRange},
    tags::{RoomTag, TagSet},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A giant room in the middle of the grid with rooms radiating organically from it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GridPathPyramid {
    /// Footprint of the giant room, in cells.
    pub giant_width: RandRange,
    pub giant_height: RandRange,
    /// Percent of the cells left around the giant room that become rooms.
    pub room_ratio: RandRange,
    pub branch_ratio: RandRange,
}

impl GridPathGen for GridPathPyramid {
    fn apply_to_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &mut GridPlan,
        pools: &PathPools,
    ) -> GenResult<PathOutcome> {
        let w = self.giant_width.pick(rng)?.max(1).min(plan.width());
        let h = self.giant_height.pick(rng)?.max(1).min(plan.height());
        let bounds = Rect::new((plan.width() - w) / 2, (plan.height() - h) / 2, w, h);
        let giant = plan.add_room(bounds, pools.pick_room(rng)?, TagSet::new(), RecordKind::Room)?;
        log::debug!("Placed the giant room over cells {:?}", bounds);

        let available = plan.cell_count() - bounds.area() as usize;
        let target = percent_of(available, self.room_ratio.pick(rng)?).min(available);
        let branch_ratio = self.branch_ratio.pick(rng)?;

        let mut expander = PathExpander::new(pools, target, branch_ratio, Weighting::Organic, true);
        expander.terminals = bounds.iter().collect();
        let outcome = expander.expand(plan, rng)?;

        tag_diagonal_extremes(plan, giant);

        Ok(outcome)
    }
}

/// Tags the room furthest toward each diagonal, skipping `exclude`.
fn tag_diagonal_extremes(plan: &mut GridPlan, exclude: usize) {
    for diagonal in DIAGONALS.iter() {
        let toward = diagonal.offset();
        let mut best: Option<(i32, usize)> = None;
        for (i, room) in plan.rooms().iter().enumerate() {
            if i == exclude || room.kind != RecordKind::Room {
                continue;
            }
            let Loc { x, y } = room.bounds.start;
            let score = x * toward.x + y * toward.y;
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, i));
            }
        }
        if let Some((_, i)) = best {
            plan.room_mut(i).tags.set(RoomTag::CornerRoom);
        }
    }
}
