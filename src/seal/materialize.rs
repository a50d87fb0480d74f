use super::{SealMap, SealMechanism, SealResult, SealType};
use crate::{
    error::GenResult,
    filter::{passes_all, RoomFilter},
    floor_plan::FloorPlan,
    geometry::{Loc, Rect, ALL_DIR4},
    graph::is_choke_point,
    sampling::take_random,
    tile_map::{MobSpawn, Tile, TileEffect, TileMap},
};

use rand::Rng;

fn with_seal(seals: &SealMap, seal: SealType) -> Vec<Loc> {
    seals
        .iter()
        .filter(|(_, s)| **s == seal)
        .map(|(l, _)| *l)
        .collect()
}

/// Every tile that has to close, in location order.
fn closing(seals: &SealMap) -> Vec<Loc> {
    seals
        .iter()
        .filter(|(_, s)| **s != SealType::Blocked)
        .map(|(l, _)| *l)
        .collect()
}

fn seal_doors<M: TileMap>(map: &mut M, doors: &[Loc], unlocked_by: &[Loc]) {
    for door in doors.iter() {
        map.set_tile(*door, Tile::Unbreakable);
        map.set_effect(
            *door,
            Some(TileEffect::SealedDoor {
                unlocked_by: unlocked_by.to_vec(),
            }),
        );
    }
}

/// Free floor in records passing `filters`, away from the vault and its boundary.
fn spots<M: TileMap>(
    plan: &FloorPlan,
    map: &M,
    filters: &[RoomFilter],
    vault: &[Rect],
    seals: &SealMap,
) -> Vec<Loc> {
    let mut spots: Vec<Loc> = plan
        .records()
        .iter()
        .filter(|r| passes_all(filters, *r))
        .flat_map(|r| map.free_tiles(r.rect))
        .filter(|l| !seals.contains_key(l) && !vault.iter().any(|v| v.contains(*l)))
        .collect();
    spots.sort();
    spots.dedup();

    spots
}

fn pick<R: Rng>(rng: &mut R, locs: &[Loc]) -> Option<Loc> {
    if locs.is_empty() {
        None
    } else {
        Some(locs[rng.gen_range(0, locs.len())])
    }
}

/// Writes `seals` to `map` as `mechanism` dictates. Nothing is written when the mechanism
/// cannot be placed.
pub(super) fn materialize<M: TileMap, R: Rng>(
    rng: &mut R,
    plan: &FloorPlan,
    map: &mut M,
    vault: &[Rect],
    seals: SealMap,
    mechanism: &SealMechanism,
) -> GenResult<Option<SealResult>> {
    let (unlocks, doors) = match mechanism {
        SealMechanism::Wall => {
            for loc in closing(&seals) {
                map.set_tile(loc, Tile::Unbreakable);
            }

            (Vec::new(), Vec::new())
        }
        SealMechanism::Key { item } => {
            let key = match pick(rng, &with_seal(&seals, SealType::Key)) {
                Some(k) => k,
                None => return Ok(None),
            };
            let doors: Vec<Loc> = closing(&seals).into_iter().filter(|l| *l != key).collect();
            seal_doors(map, &doors, &[key]);
            map.set_tile(key, Tile::Unbreakable);
            map.set_effect(
                key,
                Some(TileEffect::KeyDoor {
                    key_item: item.clone(),
                    seals: doors.clone(),
                }),
            );

            (vec![key], doors)
        }
        SealMechanism::Switch {
            amount,
            time_limit,
            switch_filters,
        } => {
            let mut candidates = spots(plan, map, switch_filters, vault, &seals);
            if *amount == 0 || candidates.len() < *amount {
                return Ok(None);
            }
            let mut switches = take_random(rng, &mut candidates, *amount);
            switches.sort();
            let doors = closing(&seals);
            seal_doors(map, &doors, &switches);
            for switch in switches.iter() {
                map.set_effect(
                    *switch,
                    Some(TileEffect::Switch {
                        switches: switches.clone(),
                        doors: doors.clone(),
                        time_limit: *time_limit,
                    }),
                );
            }

            (switches, doors)
        }
        SealMechanism::Boss { boss_filters } => {
            let trigger = match pick(rng, &spots(plan, map, boss_filters, vault, &seals)) {
                Some(t) => t,
                None => return Ok(None),
            };
            let doors = closing(&seals);
            seal_doors(map, &doors, &[trigger]);
            map.set_effect(
                trigger,
                Some(TileEffect::BossTrigger {
                    doors: doors.clone(),
                }),
            );

            (vec![trigger], doors)
        }
        SealMechanism::Guard { mob } => {
            let guard = match pick(rng, &with_seal(&seals, SealType::Key)) {
                Some(g) => g,
                None => return Ok(None),
            };
            // Open tiles beside the guard are walled for good unless that would cut the floor
            // in two.
            let view: &M = map;
            let (walls, doors): (Vec<Loc>, Vec<Loc>) = closing(&seals)
                .into_iter()
                .filter(|l| *l != guard)
                .partition(|l| {
                    view.is_walkable(*l)
                        && ALL_DIR4.iter().any(|d| *l + d.offset() == guard)
                        && !is_choke_point(view, *l)
                });
            for wall in walls.iter() {
                map.set_tile(*wall, Tile::Unbreakable);
            }
            seal_doors(map, &doors, &[guard]);
            map.place_mob(MobSpawn {
                loc: guard,
                mob: mob.clone(),
                guard_for: doors.clone(),
            });
            log::debug!("Guard at {:?}, {} tiles walled beside it", guard, walls.len());

            (vec![guard], doors)
        }
        SealMechanism::Terrain { terrain } => {
            for loc in with_seal(&seals, SealType::Key) {
                map.set_tile(loc, Tile::Terrain(*terrain));
            }
            for loc in with_seal(&seals, SealType::Locked) {
                map.set_tile(loc, Tile::Unbreakable);
            }

            (Vec::new(), Vec::new())
        }
    };
    log::debug!("Sealed {} doors behind {} unlock tiles", doors.len(), unlocks.len());

    Ok(Some(SealResult {
        seals,
        unlocks,
        doors,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sampling::small_rng,
        seal::{classify, test_util::row_of_three},
        tags::TagKind,
    };

    #[test]
    fn test_boss_trigger_lists_every_door() {
        let (plan, mut map) = row_of_three(1);
        let filters = [RoomFilter::HasTag(TagKind::Vault)];
        let vault = [plan.record(2).rect];
        let seals = classify(&plan, &map, &filters);
        let closing_count = closing(&seals).len();
        let mechanism = SealMechanism::Boss {
            boss_filters: vec![RoomFilter::IsRoom, RoomFilter::LacksTag(TagKind::Vault)],
        };

        let result = materialize(&mut small_rng(1), &plan, &mut map, &vault, seals, &mechanism)
            .unwrap()
            .unwrap();

        assert_eq!(result.unlocks.len(), 1);
        let trigger = result.unlocks[0];
        assert!(plan.record(0).rect.contains(trigger));
        assert_eq!(result.doors.len(), closing_count);
        assert_eq!(
            map.effect(trigger),
            Some(&TileEffect::BossTrigger {
                doors: result.doors.clone()
            })
        );
    }

    #[test]
    fn test_key_mechanism_needs_an_open_tile() {
        let (plan, mut map) = row_of_three(1);
        // Close the seam first so no Key tile is left.
        map.set_tile(Loc::new(9, 3), Tile::Wall);
        let before = map.clone();
        let filters = [RoomFilter::HasTag(TagKind::Vault)];
        let seals = classify(&plan, &map, &filters);
        let mechanism = SealMechanism::Key { item: "key".into() };

        let result = materialize(&mut small_rng(1), &plan, &mut map, &[plan.record(2).rect], seals, &mechanism);

        assert_eq!(result, Ok(None));
        assert_eq!(map, before);
    }

    #[test]
    fn test_wall_mechanism_closes_everything() {
        let (plan, mut map) = row_of_three(1);
        let filters = [RoomFilter::HasTag(TagKind::Vault)];
        let seals = classify(&plan, &map, &filters);

        materialize(&mut small_rng(1), &plan, &mut map, &[plan.record(2).rect], seals, &SealMechanism::Wall)
            .unwrap()
            .unwrap();

        assert_eq!(map.tile(Loc::new(9, 3)), Tile::Unbreakable);
        assert_eq!(map.effect(Loc::new(9, 3)), None);
        assert_eq!(map.tile(Loc::new(8, 3)), Tile::Floor);
        assert!(!map.reachable_from_entrance().contains(&Loc::new(10, 3)));
    }
}
