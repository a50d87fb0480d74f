use super::{GridPathGen, PathExpander, PathOutcome, PathPools, Weighting};
use crate::{
    error::{GenError, GenResult},
    floor_plan::RecordKind,
    geometry::{Loc, Rect},
    grid_plan::GridPlan,
    sampling::{percent_of, take_random, RandRange},
    tags::TagSet,
};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Two long "tread" rooms on opposite edges of the grid, joined by legs: straight chains of
/// rooms running from one tread to the other. Branch rooms grow off the legs.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GridPathTread {
    /// Treads on the left and right columns instead of the top and bottom rows.
    pub vertical: bool,
    /// Percent of the tread length that gets a leg.
    pub leg_ratio: RandRange,
    /// Branch credit earned per leg room, in percent.
    pub branch_ratio: RandRange,
}

impl GridPathTread {
    /// Maps (position along the treads, position between them) to a cell.
    fn cell(&self, along: i32, between: i32) -> Loc {
        if self.vertical {
            Loc::new(between, along)
        } else {
            Loc::new(along, between)
        }
    }

    fn tread_rect(&self, span: i32, between: i32) -> Rect {
        Rect::from_start_size(self.cell(0, between), self.cell(span, 1))
    }
}

impl GridPathGen for GridPathTread {
    fn apply_to_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &mut GridPlan,
        pools: &PathPools,
    ) -> GenResult<PathOutcome> {
        let (span, depth) = if self.vertical {
            (plan.height(), plan.width())
        } else {
            (plan.width(), plan.height())
        };
        if depth < 3 {
            return Err(GenError::Config(format!(
                "treads need at least three cells between them, got {}",
                depth
            )));
        }

        let near = self.tread_rect(span, 0);
        let far = self.tread_rect(span, depth - 1);
        plan.add_room(near, pools.pick_room(rng)?, TagSet::new(), RecordKind::Room)?;
        plan.add_room(far, pools.pick_room(rng)?, TagSet::new(), RecordKind::Room)?;

        let mut columns: Vec<i32> = (0..span).collect();
        let leg_count = percent_of(columns.len(), self.leg_ratio.pick(rng)?).min(columns.len());
        let mut legs = take_random(rng, &mut columns, leg_count);
        legs.sort_unstable();
        let branch_ratio = self.branch_ratio.pick(rng)?;

        let target = legs.len() * (depth - 2) as usize;
        let mut leg_cells = Vec::with_capacity(target);
        for &along in legs.iter() {
            let mut prev = self.cell(along, 0);
            for between in 1..depth - 1 {
                let cell = self.cell(along, between);
                plan.add_room(Rect::from_start_size(cell, Loc::new(1, 1)), pools.pick_room(rng)?, TagSet::new(), RecordKind::Room)?;
                plan.set_hall(prev, cell, pools.pick_hall(rng)?)?;
                leg_cells.push(cell);
                prev = cell;
            }
            plan.set_hall(prev, self.cell(along, depth - 1), pools.pick_hall(rng)?)?;
        }
        log::debug!("Linked the treads with legs at {:?}", legs);

        let placed = leg_cells.len();
        let mut expander = PathExpander::new(pools, 0, branch_ratio, Weighting::Organic, false);
        expander.branchables = leg_cells;
        let mut credit = branch_ratio.max(0) * placed as i32;
        while credit >= 100 {
            credit -= 100;
            if !expander.branch_once(plan, rng)? {
                log::debug!("No room left to branch off the legs");
                break;
            }
        }

        Ok(PathOutcome { target, placed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid_path::test_util::pools, sampling::small_rng};

    #[test]
    fn test_legs_join_both_treads() {
        let pools = pools();
        let mut rng = small_rng(8);
        let mut plan = GridPlan::new(6, 5, Loc::new(4, 4));
        let path = GridPathTread {
            vertical: false,
            leg_ratio: RandRange::exact(50),
            branch_ratio: RandRange::exact(0),
        };

        let outcome = path.apply_to_plan(&mut rng, &mut plan, &pools).unwrap();

        assert_eq!(outcome, PathOutcome { target: 9, placed: 9 });
        assert_eq!(plan.room_count(), 11);
        assert_eq!(plan.room(0).bounds, Rect::new(0, 0, 6, 1));
        assert_eq!(plan.room(1).bounds, Rect::new(0, 4, 6, 1));
        let legs: Vec<i32> = (0..6)
            .filter(|x| plan.room_at(Loc::new(*x, 2)).is_some())
            .collect();
        assert_eq!(legs.len(), 3);
        for x in legs {
            for y in 0..4 {
                assert!(plan.has_hall(Loc::new(x, y), Loc::new(x, y + 1)));
            }
        }
    }

    #[test]
    fn test_vertical_treads_with_branches() {
        let pools = pools();
        let mut rng = small_rng(21);
        let mut plan = GridPlan::new(5, 8, Loc::new(4, 4));
        let path = GridPathTread {
            vertical: true,
            leg_ratio: RandRange::exact(25),
            branch_ratio: RandRange::exact(100),
        };

        let outcome = path.apply_to_plan(&mut rng, &mut plan, &pools).unwrap();

        assert_eq!(plan.room(0).bounds, Rect::new(0, 0, 1, 8));
        assert_eq!(plan.room(1).bounds, Rect::new(4, 0, 1, 8));
        assert_eq!(outcome, PathOutcome { target: 6, placed: 6 });
        // One branch per leg room, and there is space for all of them.
        assert_eq!(plan.room_count(), 2 + 6 + 6);
    }

    #[test]
    fn test_too_shallow_is_rejected() {
        let pools = pools();
        let mut rng = small_rng(1);
        let mut plan = GridPlan::new(6, 2, Loc::new(4, 4));
        let path = GridPathTread {
            vertical: false,
            leg_ratio: RandRange::exact(50),
            branch_ratio: RandRange::exact(0),
        };

        assert!(path.apply_to_plan(&mut rng, &mut plan, &pools).is_err());
    }
}
