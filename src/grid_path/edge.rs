use super::{GridPathGen, PathExpander, PathOutcome, PathPools, Weighting};
use crate::{
    error::{GenError, GenResult},
    floor_plan::RecordKind,
    geometry::{Dir4, Loc, Rect},
    grid_plan::GridPlan,
    sampling::{percent_of, RandRange},
    tags::{RoomTag, TagSet},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rooms strung along one edge of the grid. Each room gets a hall leading one cell inward to a
/// spine of hall cells that links them all; branches grow off the spine and never reach back
/// into the edge row.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GridPathEdge {
    pub edge: Dir4,
    /// Percent of the edge's cells that become rooms.
    pub room_ratio: RandRange,
    /// Branch credit earned per edge room, in percent.
    pub branch_ratio: RandRange,
}

impl GridPathEdge {
    /// Every cell of the grid except the edge row.
    fn interior(&self, plan: &GridPlan) -> Rect {
        let (w, h) = (plan.width(), plan.height());
        match self.edge {
            Dir4::Up => Rect::new(0, 1, w, h - 1),
            Dir4::Down => Rect::new(0, 0, w, h - 1),
            Dir4::Left => Rect::new(1, 0, w - 1, h),
            Dir4::Right => Rect::new(0, 0, w - 1, h),
        }
    }

    fn edge_cells(&self, plan: &GridPlan) -> Vec<Loc> {
        let (w, h) = (plan.width(), plan.height());
        match self.edge {
            Dir4::Up => (0..w).map(|x| Loc::new(x, 0)).collect(),
            Dir4::Down => (0..w).map(|x| Loc::new(x, h - 1)).collect(),
            Dir4::Left => (0..h).map(|y| Loc::new(0, y)).collect(),
            Dir4::Right => (0..h).map(|y| Loc::new(w - 1, y)).collect(),
        }
    }
}

impl GridPathGen for GridPathEdge {
    fn apply_to_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &mut GridPlan,
        pools: &PathPools,
    ) -> GenResult<PathOutcome> {
        let depth = if self.edge.is_vertical() {
            plan.height()
        } else {
            plan.width()
        };
        if depth < 2 {
            return Err(GenError::Config(format!(
                "an edge path along {:?} needs at least two cells of depth",
                self.edge
            )));
        }

        let mut terminals = self.edge_cells(plan);
        let available = terminals.len();
        let target = percent_of(available, self.room_ratio.pick(rng)?).min(available);
        let branch_ratio = self.branch_ratio.pick(rng)?;

        let mut chosen = Vec::with_capacity(target);
        while chosen.len() < target && !terminals.is_empty() {
            let i = rng.gen_range(0, terminals.len());
            let cell = terminals.swap_remove(i);
            let gen = pools.pick_room(rng)?;
            plan.add_room(Rect::from_start_size(cell, Loc::new(1, 1)), gen, TagSet::new(), RecordKind::Room)?;
            chosen.push(cell);
        }
        chosen.sort_by_key(|c| c.across(self.edge));
        log::debug!("Placed {} rooms along the {:?} edge", chosen.len(), self.edge);

        // The rooms at either end of the edge are the structurally extremal ones.
        for cell in [chosen.first(), chosen.last()].iter().flatten() {
            if let Some(room) = plan.room_at(**cell) {
                plan.room_mut(room).tags.set(RoomTag::CornerRoom);
            }
        }

        let inward = self.edge.reverse().offset();
        let mut spine = Vec::new();
        if let (Some(first), Some(last)) = (chosen.first(), chosen.last()) {
            let (lo, hi) = (first.across(self.edge), last.across(self.edge));
            for a in lo..=hi {
                let edge_cell = if self.edge.is_vertical() {
                    Loc::new(a, first.y)
                } else {
                    Loc::new(first.x, a)
                };
                let cell = edge_cell + inward;
                let gen = pools.pick_hall(rng)?;
                plan.add_room(Rect::from_start_size(cell, Loc::new(1, 1)), gen, TagSet::new(), RecordKind::Hall)?;
                if let Some(prev) = spine.last() {
                    plan.set_hall(*prev, cell, pools.pick_hall(rng)?)?;
                }
                spine.push(cell);
            }
        }
        for cell in chosen.iter() {
            plan.set_hall(*cell, *cell + inward, pools.pick_hall(rng)?)?;
        }

        let mut expander = PathExpander::new(pools, 0, branch_ratio, Weighting::Uniform, false);
        expander.branchables = spine;
        expander.region = Some(self.interior(plan));
        let mut credit = branch_ratio.max(0) * chosen.len() as i32;
        while credit >= 100 {
            credit -= 100;
            if !expander.branch_once(plan, rng)? {
                break;
            }
        }
        log::debug!("Grew {} branch rooms off the spine", expander.placed);

        Ok(PathOutcome {
            target,
            placed: chosen.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid_path::test_util::pools, sampling::small_rng, tags::TagKind};

    #[test]
    fn test_down_edge_scenario() {
        let pools = pools();
        let mut rng = small_rng(2020);
        let mut plan = GridPlan::new(20, 4, Loc::new(4, 4));
        let path = GridPathEdge {
            edge: Dir4::Down,
            room_ratio: RandRange::new(40, 40),
            branch_ratio: RandRange::exact(0),
        };

        let outcome = path.apply_to_plan(&mut rng, &mut plan, &pools).unwrap();

        assert_eq!(outcome, PathOutcome { target: 8, placed: 8 });
        assert_eq!(plan.room_count(), 8);
        for (i, room) in plan.rooms().iter().enumerate() {
            let cell = room.bounds.start;
            match room.kind {
                RecordKind::Room => {
                    assert_eq!(cell.y, 3);
                    assert!(plan.has_hall(cell, cell + Loc::new(0, -1)), "room {}", i);
                }
                RecordKind::Hall => assert_eq!(cell.y, 2),
            }
        }
        // No branches: nothing above the spine.
        for x in 0..20 {
            assert_eq!(plan.room_at(Loc::new(x, 0)), None);
            assert_eq!(plan.room_at(Loc::new(x, 1)), None);
        }
        let corners = plan
            .rooms()
            .iter()
            .filter(|r| r.tags.has(TagKind::CornerRoom))
            .count();
        assert_eq!(corners, 2);
    }

    #[test]
    fn test_branch_credit_adds_rooms() {
        let pools = pools();
        let mut rng = small_rng(1);
        let mut plan = GridPlan::new(10, 5, Loc::new(4, 4));
        let path = GridPathEdge {
            edge: Dir4::Up,
            room_ratio: RandRange::exact(50),
            branch_ratio: RandRange::exact(100),
        };

        path.apply_to_plan(&mut rng, &mut plan, &pools).unwrap();

        // Five edge rooms earn five branches, all of them below the edge row.
        let edge_rooms = (0..10)
            .filter_map(|x| plan.room_at(Loc::new(x, 0)))
            .filter(|r| plan.rooms()[*r].kind == RecordKind::Room)
            .count();
        assert_eq!(edge_rooms, 5);
        let branches = plan
            .rooms()
            .iter()
            .filter(|r| r.kind == RecordKind::Room && r.bounds.start.y >= 1)
            .count();
        assert_eq!(branches, 5);
        assert_eq!(plan.room_count(), 10);
    }

    #[test]
    fn test_single_row_grid_is_rejected() {
        let pools = pools();
        let mut rng = small_rng(1);
        let mut plan = GridPlan::new(10, 1, Loc::new(4, 4));
        let path = GridPathEdge {
            edge: Dir4::Down,
            room_ratio: RandRange::exact(50),
            branch_ratio: RandRange::exact(0),
        };

        assert!(matches!(
            path.apply_to_plan(&mut rng, &mut plan, &pools),
            Err(GenError::Config(_))
        ));
    }
}
