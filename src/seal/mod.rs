//! Locking a group of rooms (the vault) behind a boundary that only a mechanism can open.
//!
//! Sealing is two passes. `classify` decides, for every tile on the vault's boundary, whether
//! it is already `Blocked`, must become a `Locked` door, or is a `Key` candidate: an open tile
//! where the unlock mechanism could go. Where the vault meets another record the boundary
//! runs along the vault's own border tiles. A `SealMechanism` then rewrites those tiles.

mod classify;
mod materialize;

pub use classify::classify;

use crate::{
    error::GenResult,
    filter::{passes_all, RoomFilter},
    floor_plan::FloorPlan,
    geometry::{Loc, Rect},
    tile_map::TileMap,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered from least to most restrictive; a classification only ever moves up.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SealType {
    /// Open now; a candidate for the unlock point.
    Key,
    /// Becomes a door that opens with the mechanism.
    Locked,
    /// Already impassable; left as it is.
    Blocked,
}

pub type SealMap = BTreeMap<Loc, SealType>;

#[derive(Clone, Debug, PartialEq)]
pub enum SealMechanism {
    /// Permanent walls; the vault is never opened.
    Wall,
    /// One door opened by consuming `item`.
    Key { item: String },
    /// `amount` switches placed in rooms passing `switch_filters`; all must be pressed.
    Switch {
        amount: usize,
        time_limit: Option<u32>,
        switch_filters: Vec<RoomFilter>,
    },
    /// Defeating the boss encountered in a room passing `boss_filters` opens the vault.
    Boss { boss_filters: Vec<RoomFilter> },
    /// A guard stands in the one gap left open.
    Guard { mob: String },
    /// Open boundary tiles become special terrain; the rest becomes wall.
    Terrain { terrain: u16 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SealStep {
    pub filters: Vec<RoomFilter>,
    pub mechanism: SealMechanism,
}

/// What a seal step wrote.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SealResult {
    pub seals: SealMap,
    /// Tiles carrying the unlock mechanism.
    pub unlocks: Vec<Loc>,
    /// Tiles that became doors.
    pub doors: Vec<Loc>,
}

/// Rects of the records passing `filters`.
pub(crate) fn vault_rects(plan: &FloorPlan, filters: &[RoomFilter]) -> Vec<Rect> {
    plan.records()
        .iter()
        .filter(|r| passes_all(filters, *r))
        .map(|r| r.rect)
        .collect()
}

impl SealStep {
    /// Seals every record passing the step's filters. Returns `None`, and leaves `map` alone,
    /// when nothing passes or the mechanism has nowhere to go.
    pub fn apply<M: TileMap>(
        &self,
        rng: &mut impl Rng,
        plan: &FloorPlan,
        map: &mut M,
    ) -> GenResult<Option<SealResult>> {
        let vault = vault_rects(plan, &self.filters);
        if vault.is_empty() {
            log::info!("No record passes the seal filters");
            return Ok(None);
        }
        let seals = classify(plan, map, &self.filters);
        log::debug!(
            "Classified {} boundary tiles around {} vault records",
            seals.len(),
            vault.len()
        );

        let result = materialize::materialize(rng, plan, map, &vault, seals, &self.mechanism)?;
        if result.is_none() {
            log::info!("Seal mechanism {:?} found no place to go", self.mechanism);
        }

        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::{
        floor_plan::{FloorPlan, RecordKind},
        geometry::{Loc, Rect},
        room_gen::{RoomGen, RoomGenHall, RoomGenSquare},
        sampling::{small_rng, RandRange},
        tags::{RoomTag, TagSet},
        tile_map::{FloorMap, TileMap},
    };

    fn prepared(mut gen: Box<dyn RoomGen>, size: Loc) -> Box<dyn RoomGen> {
        gen.prepare_size(&mut small_rng(0), size).unwrap();
        gen
    }

    fn square(size: Loc) -> Box<dyn RoomGen> {
        prepared(
            Box::new(RoomGenSquare::new(RandRange::exact(size.x), RandRange::exact(size.y))),
            size,
        )
    }

    /// Room, hall, vault in a row: `A` at x 1..6, a hall of `hall_height` rows ending at x 8,
    /// and the vault at x 9..14, all drawn on a 16x8 map.
    pub fn row_of_three(hall_height: i32) -> (FloorPlan, FloorMap) {
        let mut plan = FloorPlan::new(Loc::new(16, 8));
        let a = plan.add_record(Rect::new(1, 1, 5, 5), square(Loc::new(5, 5)), TagSet::new(), RecordKind::Room, &[]);
        let hall_rect = Rect::new(6, 3 - hall_height / 2, 3, hall_height);
        let h = plan.add_record(
            hall_rect,
            prepared(Box::new(RoomGenHall::default()), hall_rect.size),
            TagSet::new(),
            RecordKind::Hall,
            &[a],
        );
        plan.add_record(
            Rect::new(9, 1, 5, 5),
            square(Loc::new(5, 5)),
            TagSet::new().with(RoomTag::Vault),
            RecordKind::Room,
            &[h],
        );

        let mut map = FloorMap::new(plan.size());
        map.set_entrance(Loc::new(2, 2));
        plan.draw(&mut map);

        (plan, map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::ALL_DIR8,
        sampling::small_rng,
        tags::TagKind,
        tile_map::{Tile, TileEffect},
    };

    fn vault_filter() -> Vec<RoomFilter> {
        vec![RoomFilter::HasTag(TagKind::Vault)]
    }

    #[test]
    fn test_zero_matches_is_a_no_op() {
        let (plan, mut map) = test_util::row_of_three(1);
        let before = map.clone();
        let step = SealStep {
            filters: vec![RoomFilter::HasTag(TagKind::BossRoom)],
            mechanism: SealMechanism::Wall,
        };

        assert_eq!(step.apply(&mut small_rng(0), &plan, &mut map), Ok(None));
        assert_eq!(map, before);
    }

    #[test]
    fn test_key_seal_leaves_one_unlock_tile() {
        let (plan, mut map) = test_util::row_of_three(1);
        let step = SealStep {
            filters: vault_filter(),
            mechanism: SealMechanism::Key { item: "key".into() },
        };

        let result = step.apply(&mut small_rng(5), &plan, &mut map).unwrap().unwrap();

        let key = Loc::new(9, 3);
        assert_eq!(result.unlocks, vec![key]);
        let mut others = result.doors.clone();
        others.retain(|d| *d != key);
        assert_eq!(
            map.effect(key),
            Some(&TileEffect::KeyDoor {
                key_item: "key".into(),
                seals: others.clone(),
            })
        );
        for door in others {
            assert_eq!(
                map.effect(door),
                Some(&TileEffect::SealedDoor {
                    unlocked_by: vec![key]
                })
            );
            assert_eq!(map.tile(door), Tile::Unbreakable);
        }

        // No open tile outside the vault touches an open tile inside it, even diagonally.
        let vault = plan.record(2).rect;
        for loc in vault.iter().filter(|l| map.is_walkable(*l)) {
            for dir in ALL_DIR8.iter() {
                let next = loc + dir.offset();
                if !vault.contains(next) {
                    assert!(!map.is_walkable(next), "{:?} leaks into the vault", next);
                }
            }
        }
        assert!(!map.reachable_from_entrance().contains(&vault.center()));
    }

    #[test]
    fn test_seal_leaves_the_other_records_alone() {
        let (plan, mut map) = test_util::row_of_three(1);
        let step = SealStep {
            filters: vault_filter(),
            mechanism: SealMechanism::Key { item: "key".into() },
        };

        let result = step.apply(&mut small_rng(5), &plan, &mut map).unwrap().unwrap();

        let reachable = map.reachable_from_entrance();
        for i in 0..2 {
            let rect = plan.record(i).rect;
            for loc in map.free_tiles(rect) {
                assert!(reachable.contains(&loc), "{:?} in record {} is cut off", loc, i);
            }
            for loc in result.doors.iter().chain(result.unlocks.iter()) {
                assert!(!rect.contains(*loc), "{:?} sealed inside record {}", loc, i);
            }
        }
        assert_eq!(map.tile(Loc::new(8, 3)), Tile::Floor);
        assert!(!reachable.contains(&plan.record(2).rect.inflate(-1).center()));
    }

    #[test]
    fn test_switch_seal_places_exact_amount() {
        let (plan, mut map) = test_util::row_of_three(1);
        let step = SealStep {
            filters: vault_filter(),
            mechanism: SealMechanism::Switch {
                amount: 2,
                time_limit: None,
                switch_filters: vec![RoomFilter::LacksTag(TagKind::Vault)],
            },
        };

        let result = step.apply(&mut small_rng(8), &plan, &mut map).unwrap().unwrap();

        assert_eq!(result.unlocks.len(), 2);
        let switches: Vec<(Loc, &TileEffect)> = map
            .effects()
            .filter(|(_, e)| matches!(e, TileEffect::Switch { .. }))
            .collect();
        assert_eq!(switches.len(), 2);
        for (loc, effect) in switches {
            assert!(result.unlocks.contains(&loc));
            assert_eq!(
                effect,
                &TileEffect::Switch {
                    switches: result.unlocks.clone(),
                    doors: result.doors.clone(),
                    time_limit: None,
                }
            );
        }
        for door in result.doors.iter() {
            assert_eq!(
                map.effect(*door),
                Some(&TileEffect::SealedDoor {
                    unlocked_by: result.unlocks.clone()
                })
            );
        }
        // The vault's open seam toward the hall is one of the doors now.
        assert!(result.doors.contains(&Loc::new(9, 3)));
    }

    #[test]
    fn test_switch_seal_without_enough_spots_is_untouched() {
        let (plan, mut map) = test_util::row_of_three(1);
        let before = map.clone();
        let step = SealStep {
            filters: vault_filter(),
            mechanism: SealMechanism::Switch {
                amount: 500,
                time_limit: None,
                switch_filters: Vec::new(),
            },
        };

        assert_eq!(step.apply(&mut small_rng(8), &plan, &mut map), Ok(None));
        assert_eq!(map, before);
    }

    #[test]
    fn test_guard_keeps_one_gap() {
        let (plan, mut map) = test_util::row_of_three(3);
        let step = SealStep {
            filters: vault_filter(),
            mechanism: SealMechanism::Guard { mob: "sentry".into() },
        };

        let result = step.apply(&mut small_rng(2), &plan, &mut map).unwrap().unwrap();

        assert_eq!(result.unlocks.len(), 1);
        let guard = result.unlocks[0];
        assert!(map.is_walkable(guard));
        assert_eq!(map.mobs.len(), 1);
        assert_eq!(map.mobs[0].loc, guard);
        assert_eq!(map.mobs[0].guard_for, result.doors);

        // The other open seam tiles next to the guard are walled for good.
        let seam = [Loc::new(9, 2), Loc::new(9, 3), Loc::new(9, 4)];
        let open = seam.iter().filter(|l| map.is_walkable(**l)).count();
        assert_eq!(open, 1);
        for loc in seam.iter().filter(|l| **l != guard) {
            assert_eq!(map.tile(*loc), Tile::Unbreakable);
        }
    }

    #[test]
    fn test_terrain_seal() {
        let (plan, mut map) = test_util::row_of_three(1);
        let step = SealStep {
            filters: vault_filter(),
            mechanism: SealMechanism::Terrain { terrain: 3 },
        };

        let result = step.apply(&mut small_rng(0), &plan, &mut map).unwrap().unwrap();

        assert_eq!(map.tile(Loc::new(9, 3)), Tile::Terrain(3));
        assert_eq!(map.tile(Loc::new(9, 2)), Tile::Unbreakable);
        assert_eq!(map.tile(Loc::new(8, 3)), Tile::Floor);
        assert!(result.unlocks.is_empty());
    }
}
