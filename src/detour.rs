//! Hidden rooms dug out of solid rock next to the reachable floor, behind a locked door.
//!
//! A detour is a tunnel running straight out from a wall tile that touches reachable floor,
//! with a room at its far end. The tunnel's flanks and the ring around the room become
//! unbreakable, so the only way in is the doorway, which is itself unbreakable and carries the
//! lock effect.

use crate::{
    error::{GenError, GenResult},
    geometry::{Dir4, Loc, LocRay4, Rect, ALL_DIR4},
    room_gen::{BorderOpening, RoomGen},
    sampling::{take_random, RandRange, SpawnList},
    tile_map::{ItemSpawn, MobSpawn, Tile, TileEffect, TileMap},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MAX_DETOUR_RAYS: usize = 500;
pub const MAX_DETOUR_ROOM_TRIES: usize = 100;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum DetourLock {
    /// One door that opens by consuming `item`.
    Key { item: String },
    /// Up to `amount` doors, all opened by one shared switch.
    Switch {
        amount: usize,
        time_limit: Option<u32>,
    },
}

/// What gets scattered in a finished detour room, in this order.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DetourSpawns {
    pub effects: SpawnList<TileEffect>,
    pub effect_count: RandRange,
    pub items: SpawnList<String>,
    pub item_count: RandRange,
    pub guards: SpawnList<String>,
    pub guard_count: RandRange,
}

#[derive(Clone, Debug)]
pub struct DetourStep {
    pub room_pool: SpawnList<Box<dyn RoomGen>>,
    /// Tiles of open tunnel between the doorway and the room.
    pub hall_length: RandRange,
    pub lock: DetourLock,
    pub spawns: DetourSpawns,
    /// For key locks, also drop the key on reachable floor.
    pub place_key: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DetourPlacement {
    /// The doorway tile and the direction the tunnel runs from it.
    pub ray: LocRay4,
    pub tunnel: Vec<Loc>,
    pub room: Rect,
}

impl DetourPlacement {
    pub fn door(&self) -> Loc {
        self.ray.loc
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DetourResult {
    pub placements: Vec<DetourPlacement>,
    pub switch: Option<Loc>,
    pub key: Option<Loc>,
}

/// Walls that touch reachable floor, each with the direction pointing away from that floor.
pub fn candidate_rays<M: TileMap + ?Sized>(map: &M) -> Vec<LocRay4> {
    let mut reachable: Vec<Loc> = map.reachable_from_entrance().into_iter().collect();
    reachable.sort();
    let mut rays = Vec::new();
    for floor in reachable {
        for dir in ALL_DIR4.iter() {
            if let Some(wall) = map.normalize(floor + dir.offset()) {
                if map.is_diggable(wall) {
                    rays.push(LocRay4::new(wall, *dir));
                }
            }
        }
    }

    rays
}

/// Reachable tiles nothing has claimed yet, sorted.
fn reachable_free_tiles<M: TileMap + ?Sized>(map: &M) -> Vec<Loc> {
    let reachable = map.reachable_from_entrance();
    let whole = Rect::from_start_size(Loc::ZERO, map.size());

    map.free_tiles(whole)
        .into_iter()
        .filter(|l| reachable.contains(l))
        .collect()
}

fn all_diggable<M: TileMap + ?Sized>(map: &M, mut locs: impl Iterator<Item = Loc>) -> bool {
    locs.all(|l| map.is_diggable(l))
}

/// A validated detour that has not touched the map yet.
struct DetourPlan {
    ray: LocRay4,
    tunnel: Vec<Loc>,
    room: Rect,
    gen: Box<dyn RoomGen>,
    entry: BorderOpening,
}

impl DetourStep {
    pub fn apply<M: TileMap>(
        &self,
        rng: &mut impl Rng,
        map: &mut M,
    ) -> GenResult<Option<DetourResult>> {
        self.hall_length.validate()?;
        let free = reachable_free_tiles(map);

        match &self.lock {
            DetourLock::Key { item } => {
                let door = TileEffect::KeyDoor {
                    key_item: item.clone(),
                    seals: Vec::new(),
                };
                let placement = match self.carve(rng, map, door)? {
                    Some(p) => p,
                    None => return Ok(None),
                };
                let mut key = None;
                if self.place_key {
                    if free.is_empty() {
                        log::info!("Nowhere reachable to drop the key for {:?}", placement.door());
                    } else {
                        let loc = free[rng.gen_range(0, free.len())];
                        map.place_item(ItemSpawn {
                            loc,
                            item: item.clone(),
                        });
                        key = Some(loc);
                    }
                }

                Ok(Some(DetourResult {
                    placements: vec![placement],
                    switch: None,
                    key,
                }))
            }
            DetourLock::Switch { amount, time_limit } => {
                // Without a place for the switch, nothing may be dug.
                if free.is_empty() {
                    log::info!("No reachable floor for a detour switch");
                    return Ok(None);
                }
                let mut placements = Vec::new();
                for _ in 0..*amount {
                    let sealed = TileEffect::SealedDoor {
                        unlocked_by: Vec::new(),
                    };
                    match self.carve(rng, map, sealed)? {
                        Some(p) => placements.push(p),
                        None => break,
                    }
                }
                if placements.is_empty() {
                    return Ok(None);
                }

                let switch = free[rng.gen_range(0, free.len())];
                let doors: Vec<Loc> = placements.iter().map(|p| p.door()).collect();
                for door in doors.iter() {
                    map.set_effect(
                        *door,
                        Some(TileEffect::SealedDoor {
                            unlocked_by: vec![switch],
                        }),
                    );
                }
                map.set_effect(
                    switch,
                    Some(TileEffect::Switch {
                        switches: vec![switch],
                        doors,
                        time_limit: *time_limit,
                    }),
                );
                log::debug!("Wired {} detour doors to a switch at {:?}", placements.len(), switch);

                Ok(Some(DetourResult {
                    placements,
                    switch: Some(switch),
                    key: None,
                }))
            }
        }
    }

    /// Digs one detour sealed with `door_effect`. `None` means nothing fit and the map is
    /// unchanged.
    pub fn carve<M: TileMap>(
        &self,
        rng: &mut impl Rng,
        map: &mut M,
        door_effect: TileEffect,
    ) -> GenResult<Option<DetourPlacement>> {
        if self.room_pool.is_empty() {
            return Err(GenError::EmptyPool("detour rooms"));
        }
        let mut rays = candidate_rays(map);
        if rays.is_empty() {
            log::info!("No wall next to reachable floor to dig a detour from");
            return Ok(None);
        }

        for _ in 0..MAX_DETOUR_RAYS {
            if rays.is_empty() {
                break;
            }
            let ray = rays.swap_remove(rng.gen_range(0, rays.len()));
            if !self.has_room_for_tunnel(map, ray) {
                continue;
            }
            for _ in 0..MAX_DETOUR_ROOM_TRIES {
                if let Some(plan) = self.try_room(rng, map, ray)? {
                    let placement = draw(map, plan, door_effect);
                    self.spawn(rng, map, placement.room)?;
                    log::debug!("Dug a detour from {:?} to {:?}", placement.ray, placement.room);

                    return Ok(Some(placement));
                }
            }
        }
        log::info!("No detour fit after {} rays", MAX_DETOUR_RAYS);

        Ok(None)
    }

    /// The doorway's flanks must not be open floor, and at least one tunnel tile with its
    /// flanks must be diggable.
    fn has_room_for_tunnel<M: TileMap + ?Sized>(&self, map: &M, ray: LocRay4) -> bool {
        let flanks_closed = ray
            .dir
            .perpendicular()
            .iter()
            .all(|p| !map.is_walkable(ray.loc + p.offset()));
        let first = ray.traverse(1);

        flanks_closed && all_diggable(map, tunnel_band(ray.dir, &[first]).into_iter())
    }

    fn try_room<M: TileMap + ?Sized>(
        &self,
        rng: &mut impl Rng,
        map: &M,
        ray: LocRay4,
    ) -> GenResult<Option<DetourPlan>> {
        let mut gen = match self.room_pool.pick(rng) {
            Some(g) => g.clone(),
            None => return Ok(None),
        };
        let size = gen.propose_size(rng)?;
        gen.prepare_size(rng, size)?;

        let back = ray.dir.reverse();
        let entries: Vec<i32> = gen
            .fulfillable_border(back)
            .iter()
            .enumerate()
            .filter(|(_, ok)| **ok)
            .map(|(i, _)| i as i32)
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }
        let index = entries[rng.gen_range(0, entries.len())];
        let length = self.hall_length.pick(rng)?.max(1);

        let tunnel: Vec<Loc> = (1..=length).map(|i| ray.traverse(i)).collect();
        let room = Rect::beyond(ray.traverse(length + 1), ray.dir, size, index);
        if !all_diggable(map, room.inflate(1).iter())
            || !all_diggable(map, tunnel_band(ray.dir, &tunnel).into_iter())
        {
            return Ok(None);
        }

        Ok(Some(DetourPlan {
            ray,
            tunnel,
            room,
            gen,
            entry: BorderOpening { dir: back, index },
        }))
    }

    /// Effects, then items, then guards, each on distinct free tiles of the room.
    fn spawn<M: TileMap + ?Sized>(&self, rng: &mut impl Rng, map: &mut M, room: Rect) -> GenResult<()> {
        let spawns = &self.spawns;
        let mut free = map.free_tiles(room);

        if !spawns.effects.is_empty() {
            let count = spawns.effect_count.pick(rng)?.max(0) as usize;
            for loc in take_random(rng, &mut free, count) {
                if let Some(effect) = spawns.effects.pick(rng) {
                    map.set_effect(loc, Some(effect.clone()));
                }
            }
        }
        if !spawns.items.is_empty() {
            let count = spawns.item_count.pick(rng)?.max(0) as usize;
            for loc in take_random(rng, &mut free, count) {
                if let Some(item) = spawns.items.pick(rng) {
                    map.place_item(ItemSpawn {
                        loc,
                        item: item.clone(),
                    });
                }
            }
        }
        if !spawns.guards.is_empty() {
            let count = spawns.guard_count.pick(rng)?.max(0) as usize;
            for loc in take_random(rng, &mut free, count) {
                if let Some(mob) = spawns.guards.pick(rng) {
                    map.place_mob(MobSpawn {
                        loc,
                        mob: mob.clone(),
                        guard_for: Vec::new(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// `tunnel` plus the tiles on either side of it.
fn tunnel_band(dir: Dir4, tunnel: &[Loc]) -> Vec<Loc> {
    let mut band = tunnel.to_vec();
    band.extend(flanks(dir, tunnel));

    band
}

fn flanks(dir: Dir4, tunnel: &[Loc]) -> Vec<Loc> {
    let [a, b] = dir.perpendicular();

    tunnel
        .iter()
        .flat_map(|t| vec![*t + a.offset(), *t + b.offset()])
        .collect()
}

fn draw<M: TileMap>(map: &mut M, plan: DetourPlan, door_effect: TileEffect) -> DetourPlacement {
    let DetourPlan {
        ray,
        tunnel,
        room,
        gen,
        entry,
    } = plan;

    for loc in room.inflate(1).iter().filter(|l| !room.contains(*l)) {
        map.set_tile(loc, Tile::Unbreakable);
    }
    gen.draw(map, room, &[entry]);
    for loc in flanks(ray.dir, &tunnel) {
        map.set_tile(loc, Tile::Unbreakable);
    }
    for loc in tunnel.iter() {
        map.set_tile(*loc, Tile::Floor);
    }
    for loc in flanks(ray.dir, &[ray.loc]) {
        if map.tile(loc) == Tile::Wall {
            map.set_tile(loc, Tile::Unbreakable);
        }
    }
    map.set_tile(ray.loc, Tile::Unbreakable);
    map.set_effect(ray.loc, Some(door_effect));

    DetourPlacement { ray, tunnel, room }
}
