//! The rendered floor as later steps see it. Generation steps only talk to a `TileMap`; the
//! game supplies its own implementation, and `FloorMap` is the plain one used by the pipeline.

use crate::geometry::{Loc, Rect, ALL_DIR4};

use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Tile {
    /// Ordinary rock; steps may dig through it.
    Wall,
    Floor,
    Unbreakable,
    /// Impassable special terrain (water, lava, ...) identified by the data layer.
    Terrain(u16),
}

impl Tile {
    pub fn is_walkable(self) -> bool {
        self == Tile::Floor
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TileEffect {
    Trap(String),
    /// A wall that disappears once every location in `unlocked_by` has been triggered.
    SealedDoor { unlocked_by: Vec<Loc> },
    /// Opens with a consumed `key_item`, also opening every sealed tile in `seals`.
    KeyDoor { key_item: String, seals: Vec<Loc> },
    /// Every switch in `switches` must be triggered (within `time_limit` turns, if set).
    Switch {
        switches: Vec<Loc>,
        doors: Vec<Loc>,
        time_limit: Option<u32>,
    },
    /// The boss fight starts here; its defeat opens `doors`.
    BossTrigger { doors: Vec<Loc> },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ItemSpawn {
    pub loc: Loc,
    pub item: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MobSpawn {
    pub loc: Loc,
    pub mob: String,
    /// Sealed tiles that open when this guard is defeated. Empty for ordinary monsters.
    pub guard_for: Vec<Loc>,
}

/// Implement this to let the generation steps read and write your map.
pub trait TileMap {
    fn size(&self) -> Loc;
    fn wraps(&self) -> bool;
    /// Where the player arrives; reachability is measured from here.
    fn entrance(&self) -> Loc;

    /// Out-of-bounds locations on a non-wrapping map read as `Tile::Unbreakable`.
    fn tile(&self, loc: Loc) -> Tile;
    fn set_tile(&mut self, loc: Loc, tile: Tile);
    fn effect(&self, loc: Loc) -> Option<&TileEffect>;
    fn set_effect(&mut self, loc: Loc, effect: Option<TileEffect>);

    fn place_item(&mut self, spawn: ItemSpawn);
    fn place_mob(&mut self, spawn: MobSpawn);
    fn has_item(&self, loc: Loc) -> bool;
    fn has_mob(&self, loc: Loc) -> bool;

    fn normalize(&self, loc: Loc) -> Option<Loc> {
        if self.wraps() {
            Some(loc.wrap(self.size()))
        } else if loc.in_bounds(self.size()) {
            Some(loc)
        } else {
            None
        }
    }

    fn is_walkable(&self, loc: Loc) -> bool {
        self.tile(loc).is_walkable()
    }

    fn is_blocked(&self, loc: Loc) -> bool {
        !self.is_walkable(loc)
    }

    /// Diggable rock that is not part of a non-wrapping map's outer frame.
    fn is_diggable(&self, loc: Loc) -> bool {
        if self.tile(loc) != Tile::Wall {
            return false;
        }
        if self.wraps() {
            return true;
        }
        let size = self.size();

        loc.x > 0 && loc.y > 0 && loc.x < size.x - 1 && loc.y < size.y - 1
    }

    /// Walkable tiles in `rect` with nothing on them yet, in row-major order.
    fn free_tiles(&self, rect: Rect) -> Vec<Loc> {
        rect.iter()
            .filter_map(|loc| self.normalize(loc))
            .filter(|loc| {
                self.is_walkable(*loc)
                    && self.effect(*loc).is_none()
                    && !self.has_item(*loc)
                    && !self.has_mob(*loc)
            })
            .collect()
    }

    /// 4-connected walkable flood fill from `start`.
    fn reachable_from(&self, start: Loc) -> FnvHashSet<Loc> {
        let mut seen = FnvHashSet::default();
        let start = match self.normalize(start) {
            Some(s) if self.is_walkable(s) => s,
            _ => return seen,
        };
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(loc) = queue.pop_front() {
            for dir in ALL_DIR4.iter() {
                if let Some(next) = self.normalize(loc + dir.offset()) {
                    if self.is_walkable(next) && seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        seen
    }

    fn reachable_from_entrance(&self) -> FnvHashSet<Loc> {
        self.reachable_from(self.entrance())
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FloorMap {
    size: Loc,
    wrap: bool,
    entrance: Loc,
    tiles: Vec<Tile>,
    effects: Vec<Option<TileEffect>>,
    pub items: Vec<ItemSpawn>,
    pub mobs: Vec<MobSpawn>,
}

impl FloorMap {
    /// A map of solid rock.
    pub fn new(size: Loc) -> Self {
        let n = (size.x.max(0) * size.y.max(0)) as usize;
        FloorMap {
            size,
            wrap: false,
            entrance: Loc::ZERO,
            tiles: vec![Tile::Wall; n],
            effects: vec![None; n],
            items: Vec::new(),
            mobs: Vec::new(),
        }
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    pub fn set_entrance(&mut self, entrance: Loc) {
        self.entrance = entrance;
    }

    /// Builds a map from rows of `#` (wall), `.` (floor), `X` (unbreakable), `~` (terrain 0)
    /// and `@` (floor, the entrance).
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut map = FloorMap::new(Loc::new(width, height));
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let loc = Loc::new(x as i32, y as i32);
                let tile = match c {
                    '.' => Tile::Floor,
                    '@' => {
                        map.entrance = loc;
                        Tile::Floor
                    }
                    'X' => Tile::Unbreakable,
                    '~' => Tile::Terrain(0),
                    _ => Tile::Wall,
                };
                map.set_tile(loc, tile);
            }
        }

        map
    }

    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.size.x + 1) * self.size.y) as usize);
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let loc = Loc::new(x, y);
                let c = if self.mobs.iter().any(|m| m.loc == loc) {
                    'g'
                } else if self.items.iter().any(|i| i.loc == loc) {
                    '$'
                } else {
                    match self.effect(loc) {
                        Some(TileEffect::Trap(_)) => '^',
                        Some(TileEffect::SealedDoor { .. }) => 'D',
                        Some(TileEffect::KeyDoor { .. }) => 'K',
                        Some(TileEffect::Switch { .. }) => 'S',
                        Some(TileEffect::BossTrigger { .. }) => 'B',
                        None => match self.tile(loc) {
                            Tile::Wall => '#',
                            Tile::Floor => '.',
                            Tile::Unbreakable => 'X',
                            Tile::Terrain(_) => '~',
                        },
                    }
                };
                out.push(c);
            }
            out.push('\n');
        }

        out
    }

    pub fn effects(&self) -> impl Iterator<Item = (Loc, &TileEffect)> {
        let width = self.size.x;
        self.effects.iter().enumerate().filter_map(move |(i, e)| {
            e.as_ref()
                .map(|e| (Loc::new(i as i32 % width, i as i32 / width), e))
        })
    }

    fn index(&self, loc: Loc) -> Option<usize> {
        self.normalize(loc)
            .map(|l| (l.y * self.size.x + l.x) as usize)
    }
}

impl TileMap for FloorMap {
    fn size(&self) -> Loc {
        self.size
    }

    fn wraps(&self) -> bool {
        self.wrap
    }

    fn entrance(&self) -> Loc {
        self.entrance
    }

    fn tile(&self, loc: Loc) -> Tile {
        self.index(loc)
            .map(|i| self.tiles[i])
            .unwrap_or(Tile::Unbreakable)
    }

    fn set_tile(&mut self, loc: Loc, tile: Tile) {
        if let Some(i) = self.index(loc) {
            self.tiles[i] = tile;
        }
    }

    fn effect(&self, loc: Loc) -> Option<&TileEffect> {
        self.index(loc).and_then(|i| self.effects[i].as_ref())
    }

    fn set_effect(&mut self, loc: Loc, effect: Option<TileEffect>) {
        if let Some(i) = self.index(loc) {
            self.effects[i] = effect;
        }
    }

    fn place_item(&mut self, spawn: ItemSpawn) {
        self.items.push(spawn);
    }

    fn place_mob(&mut self, spawn: MobSpawn) {
        self.mobs.push(spawn);
    }

    fn has_item(&self, loc: Loc) -> bool {
        self.items.iter().any(|i| i.loc == loc)
    }

    fn has_mob(&self, loc: Loc) -> bool {
        self.mobs.iter().any(|m| m.loc == loc)
    }
}
