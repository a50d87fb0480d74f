//! Abstract cell-grid layout. Each cell is empty or belongs to one room (a room may span a
//! block of cells); halls live on the edges between orthogonally neighbouring cells.

use crate::{
    error::{GenError, GenResult},
    filter::Filterable,
    floor_plan::{FloorPlan, RecordKind},
    geometry::{Dir4, Loc, Rect, ALL_DIR4, DIAGONALS},
    room_gen::RoomGen,
    symmetric_map::SymmetricMap,
    tags::TagSet,
};

use rand::Rng;

#[derive(Clone, Debug)]
pub struct GridRoomPlan {
    /// Footprint in cells.
    pub bounds: Rect,
    pub gen: Box<dyn RoomGen>,
    pub tags: TagSet,
    pub kind: RecordKind,
}

impl Filterable for GridRoomPlan {
    fn tags(&self) -> &TagSet {
        &self.tags
    }

    fn is_hall(&self) -> bool {
        self.kind == RecordKind::Hall
    }

    fn footprint(&self) -> Loc {
        self.bounds.size
    }
}

#[derive(Clone, Debug)]
pub struct GridHall {
    pub gen: Box<dyn RoomGen>,
}

#[derive(Clone, Debug)]
pub struct GridPlan {
    width: i32,
    height: i32,
    /// Tiles per cell, not counting the one-tile wall between cells.
    cell_size: Loc,
    wrap: bool,
    cells: Vec<Option<usize>>,
    rooms: Vec<GridRoomPlan>,
    halls: SymmetricMap<GridHall>,
}

impl GridPlan {
    pub fn new(width: i32, height: i32, cell_size: Loc) -> Self {
        GridPlan {
            width,
            height,
            cell_size,
            wrap: false,
            cells: vec![None; (width.max(0) * height.max(0)) as usize],
            rooms: Vec::new(),
            halls: SymmetricMap::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> Loc {
        Loc::new(self.width, self.height)
    }

    pub fn wraps(&self) -> bool {
        self.wrap
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn rooms(&self) -> &[GridRoomPlan] {
        &self.rooms
    }

    pub fn room(&self, index: usize) -> &GridRoomPlan {
        &self.rooms[index]
    }

    pub fn room_mut(&mut self, index: usize) -> &mut GridRoomPlan {
        &mut self.rooms[index]
    }

    /// Rooms of kind `Room`, not counting hall cells.
    pub fn room_count(&self) -> usize {
        self.rooms
            .iter()
            .filter(|r| r.kind == RecordKind::Room)
            .count()
    }

    pub fn hall_count(&self) -> usize {
        self.halls.len()
    }

    pub fn clear(&mut self) {
        for c in self.cells.iter_mut() {
            *c = None;
        }
        self.rooms.clear();
        self.halls.clear();
    }

    fn in_grid(&self, loc: Loc) -> bool {
        loc.in_bounds(self.size())
    }

    fn cell_index(&self, loc: Loc) -> usize {
        (loc.y * self.width + loc.x) as usize
    }

    /// The cell one step from `loc`, wrapping on toroidal grids.
    pub fn neighbor(&self, loc: Loc, offset: Loc) -> Option<Loc> {
        let next = loc + offset;
        if self.wrap {
            Some(next.wrap(self.size()))
        } else if self.in_grid(next) {
            Some(next)
        } else {
            None
        }
    }

    pub fn room_at(&self, loc: Loc) -> Option<usize> {
        if self.in_grid(loc) {
            self.cells[self.cell_index(loc)]
        } else {
            None
        }
    }

    pub fn is_open(&self, loc: Loc) -> bool {
        self.in_grid(loc) && self.cells[self.cell_index(loc)].is_none()
    }

    /// Places a room over `bounds`. Every cell must be inside the grid and empty.
    pub fn add_room(
        &mut self,
        bounds: Rect,
        gen: Box<dyn RoomGen>,
        tags: TagSet,
        kind: RecordKind,
    ) -> GenResult<usize> {
        let grid = Rect::new(0, 0, self.width, self.height);
        if bounds.is_empty() || !grid.contains_rect(&bounds) {
            return Err(GenError::GridOutOfBounds {
                bounds,
                width: self.width,
                height: self.height,
            });
        }
        if let Some(taken) = bounds.iter().find(|l| !self.is_open(*l)) {
            return Err(GenError::CellOccupied(taken));
        }

        let index = self.rooms.len();
        for loc in bounds.iter() {
            let i = self.cell_index(loc);
            self.cells[i] = Some(index);
        }
        self.rooms.push(GridRoomPlan {
            bounds,
            gen,
            tags,
            kind,
        });

        Ok(index)
    }

    fn dir_between(&self, a: Loc, b: Loc) -> Option<Dir4> {
        ALL_DIR4
            .iter()
            .copied()
            .find(|d| self.neighbor(a, d.offset()) == Some(b))
    }

    pub fn set_hall(&mut self, a: Loc, b: Loc, gen: Box<dyn RoomGen>) -> GenResult<()> {
        if !self.in_grid(a) || !self.in_grid(b) || self.dir_between(a, b).is_none() {
            return Err(GenError::NotNeighbors(a, b));
        }
        let (ia, ib) = (self.cell_index(a), self.cell_index(b));
        self.halls.insert(ia, ib, GridHall { gen });

        Ok(())
    }

    pub fn has_hall(&self, a: Loc, b: Loc) -> bool {
        self.in_grid(a) && self.in_grid(b) && self.halls.contains(self.cell_index(a), self.cell_index(b))
    }

    /// Directions from `loc` leading to empty cells, in `ALL_DIR4` order.
    pub fn open_dirs(&self, loc: Loc) -> Vec<Dir4> {
        ALL_DIR4
            .iter()
            .copied()
            .filter(|d| {
                self.neighbor(loc, d.offset())
                    .map_or(false, |n| self.is_open(n))
            })
            .collect()
    }

    /// `(1 + open diagonal neighbors) * 2^(open cardinal neighbors)`: cardinal openness
    /// dominates.
    pub fn organic_weight(&self, loc: Loc) -> u64 {
        let is_open = |offset: Loc| {
            self.neighbor(loc, offset)
                .map_or(false, |n| self.is_open(n))
        };
        let diagonals = DIAGONALS.iter().filter(|d| is_open(d.offset())).count() as u64;
        let cardinals = ALL_DIR4.iter().filter(|d| is_open(d.offset())).count() as u32;

        (1 + diagonals) * 2u64.pow(cardinals)
    }

    fn cell_stride(&self) -> Loc {
        self.cell_size + Loc::new(1, 1)
    }

    /// Size of the tile map this grid renders to.
    pub fn tile_size(&self) -> Loc {
        let stride = self.cell_stride();

        Loc::new(self.width * stride.x + 1, self.height * stride.y + 1)
    }

    /// The tiles available to a room covering `bounds`.
    pub fn block_rect(&self, bounds: &Rect) -> Rect {
        let stride = self.cell_stride();

        Rect::new(
            1 + bounds.x() * stride.x,
            1 + bounds.y() * stride.y,
            bounds.width() * stride.x - 1,
            bounds.height() * stride.y - 1,
        )
    }

    fn cell_center(&self, loc: Loc) -> Loc {
        self.block_rect(&Rect::new(loc.x, loc.y, 1, 1)).center()
    }

    fn room_rect(&self, room: &GridRoomPlan, rng: &mut impl Rng) -> GenResult<Rect> {
        let block = self.block_rect(&room.bounds);
        if room.bounds.area() > 1 {
            return Ok(block);
        }
        let center = block.center();
        if room.kind == RecordKind::Hall {
            return Ok(Rect::from_start_size(center, Loc::new(1, 1)));
        }

        let proposed = room.gen.propose_size(rng)?;
        let size = Loc::new(
            proposed.x.max(1).min(block.width()),
            proposed.y.max(1).min(block.height()),
        );
        // Any placement inside the block that still covers the cell's center.
        let x_lo = block.x().max(center.x - size.x + 1);
        let x_hi = (block.right() - size.x).min(center.x);
        let y_lo = block.y().max(center.y - size.y + 1);
        let y_hi = (block.bottom() - size.y).min(center.y);
        let x = rng.gen_range(x_lo, x_hi + 1);
        let y = rng.gen_range(y_lo, y_hi + 1);

        Ok(Rect::from_start_size(Loc::new(x, y), size))
    }

    /// Renders the abstract layout to concrete rectangles: rooms inside their cell blocks,
    /// 1-tile-wide halls running along cell centers. Room `i` becomes record `i`.
    pub fn to_floor_plan(&self, rng: &mut impl Rng) -> GenResult<FloorPlan> {
        let mut floor = FloorPlan::new(self.tile_size());
        floor.set_wrap(self.wrap);

        for room in self.rooms.iter() {
            let rect = self.room_rect(room, rng)?;
            let mut gen = room.gen.clone();
            gen.prepare_size(rng, rect.size)?;
            floor.add_record(rect, gen, room.tags.clone(), room.kind, &[]);
        }

        let map_size = floor.size();
        for ((ia, ib), hall) in self.halls.sorted_entries() {
            let a = Loc::new(ia as i32 % self.width, ia as i32 / self.width);
            let b = Loc::new(ib as i32 % self.width, ib as i32 / self.width);
            let (ra, rb) = match (self.room_at(a), self.room_at(b)) {
                (Some(ra), Some(rb)) if ra != rb => (ra, rb),
                _ => continue,
            };
            let dir = match self.dir_between(a, b) {
                Some(d) => d,
                None => continue,
            };
            // Work from the upper/left cell so the hall always runs in a positive direction.
            let (a, b, ra, rb, dir) = if matches!(dir, Dir4::Up | Dir4::Left) {
                (b, a, rb, ra, dir.reverse())
            } else {
                (a, b, ra, rb, dir)
            };
            let rect_a = floor.record(ra).rect;
            let rect_b = floor.record(rb).rect;
            let across = self.cell_center(a).across(dir);
            let wrapped = b.along(dir) < a.along(dir);

            let segments = if !wrapped {
                let from = end_along(&rect_a, dir);
                vec![(from, start_along(&rect_b, dir) - from)]
            } else {
                // The edge crosses the map seam: one piece up to the seam, one after it.
                let from = end_along(&rect_a, dir);
                vec![
                    (from, map_size.along(dir) - from),
                    (0, start_along(&rect_b, dir)),
                ]
            };

            let mut pieces = Vec::new();
            for (from, len) in segments.into_iter().filter(|(_, len)| *len > 0) {
                let rect = if dir.is_vertical() {
                    Rect::new(across, from, 1, len)
                } else {
                    Rect::new(from, across, len, 1)
                };
                let mut gen = hall.gen.clone();
                gen.prepare_size(rng, rect.size)?;
                pieces.push(floor.add_record(rect, gen, TagSet::new(), RecordKind::Hall, &[]));
            }
            match pieces.as_slice() {
                [] => floor.connect(ra, rb),
                [only] => {
                    floor.connect(ra, *only);
                    floor.connect(*only, rb);
                }
                [first, .., last] => {
                    floor.connect(ra, *first);
                    floor.connect(*first, *last);
                    floor.connect(*last, rb);
                }
            }
        }
        log::debug!(
            "Rendered grid plan to {} floor records ({} rooms, {} halls)",
            floor.len(),
            self.rooms.len(),
            self.halls.len()
        );

        Ok(floor)
    }
}

fn start_along(rect: &Rect, dir: Dir4) -> i32 {
    rect.start.along(dir)
}

fn end_along(rect: &Rect, dir: Dir4) -> i32 {
    rect.end().along(dir)
}
