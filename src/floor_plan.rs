//! Free-form floor plan: rooms and halls as concrete rectangles, each owning its shape, with
//! adjacency recorded whenever two records are attached along a shared border.

use crate::{
    filter::Filterable,
    geometry::{Dir4, Loc, Rect},
    graph::{graph_from_adjacency, is_connected},
    room_gen::{BorderOpening, RoomGen},
    tags::TagSet,
    tile_map::TileMap,
};

use petgraph::graph::UnGraph;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RecordKind {
    Room,
    Hall,
}

#[derive(Clone, Debug)]
pub struct FloorRecord {
    pub rect: Rect,
    /// Prepared to `rect.size`.
    pub gen: Box<dyn RoomGen>,
    pub tags: TagSet,
    pub kind: RecordKind,
    adjacents: Vec<usize>,
}

impl FloorRecord {
    pub fn adjacents(&self) -> &[usize] {
        &self.adjacents
    }
}

impl Filterable for FloorRecord {
    fn tags(&self) -> &TagSet {
        &self.tags
    }

    fn is_hall(&self) -> bool {
        self.kind == RecordKind::Hall
    }

    fn footprint(&self) -> Loc {
        self.rect.size
    }
}

/// Returns the side of `ra` that `rb` lies against, with the coordinates along that side where
/// both shapes accept a connection.
pub fn mutual_border(
    ra: &Rect,
    ga: &dyn RoomGen,
    rb: &Rect,
    gb: &dyn RoomGen,
) -> Option<(Dir4, Vec<i32>)> {
    let (dir, from, to) = ra.touching_side(rb)?;
    let fa = ga.fulfillable_border(dir);
    let fb = gb.fulfillable_border(dir.reverse());
    let a0 = ra.side_start(dir);
    let b0 = rb.side_start(dir.reverse());
    let coords = (from..to)
        .filter(|c| {
            let a_ok = fa.get((c - a0) as usize).copied().unwrap_or(false);
            let b_ok = fb.get((c - b0) as usize).copied().unwrap_or(false);
            a_ok && b_ok
        })
        .collect();

    Some((dir, coords))
}

#[derive(Clone, Debug)]
pub struct FloorPlan {
    size: Loc,
    wrap: bool,
    records: Vec<FloorRecord>,
}

impl FloorPlan {
    pub fn new(size: Loc) -> Self {
        FloorPlan {
            size,
            wrap: false,
            records: Vec::new(),
        }
    }

    pub fn size(&self) -> Loc {
        self.size
    }

    pub fn wraps(&self) -> bool {
        self.wrap
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FloorRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> &FloorRecord {
        &self.records[index]
    }

    pub fn record_mut(&mut self, index: usize) -> &mut FloorRecord {
        &mut self.records[index]
    }

    /// Adds a record attached to every index in `attach_to`. `gen` must already be prepared
    /// to `rect.size`.
    pub fn add_record(
        &mut self,
        rect: Rect,
        gen: Box<dyn RoomGen>,
        tags: TagSet,
        kind: RecordKind,
        attach_to: &[usize],
    ) -> usize {
        let index = self.records.len();
        self.records.push(FloorRecord {
            rect,
            gen,
            tags,
            kind,
            adjacents: Vec::new(),
        });
        for &other in attach_to {
            self.connect(index, other);
        }

        index
    }

    /// Records adjacency both ways.
    pub fn connect(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if !self.records[a].adjacents.contains(&b) {
            self.records[a].adjacents.push(b);
        }
        if !self.records[b].adjacents.contains(&a) {
            self.records[b].adjacents.push(a);
        }
    }

    /// Removes the most recently added record and every reference to it.
    pub fn pop_record(&mut self) -> Option<FloorRecord> {
        let record = self.records.pop()?;
        let index = self.records.len();
        for &other in record.adjacents.iter() {
            if let Some(r) = self.records.get_mut(other) {
                r.adjacents.retain(|a| *a != index);
            }
        }

        Some(record)
    }

    /// Keeps a one-tile frame of rock around the whole plan.
    pub fn in_bounds(&self, rect: &Rect) -> bool {
        Rect::new(1, 1, self.size.x - 2, self.size.y - 2).contains_rect(rect)
    }

    pub fn collides(&self, rect: &Rect) -> bool {
        self.records.iter().any(|r| r.rect.intersects(rect))
    }

    /// Indices of the records whose rectangles contain `loc`.
    pub fn owners_of(&self, loc: Loc) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.rect.contains(loc))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn room_graph(&self) -> UnGraph<usize, ()> {
        let lists: Vec<&[usize]> = self.records.iter().map(|r| r.adjacents()).collect();

        graph_from_adjacency(&lists)
    }

    pub fn is_connected(&self) -> bool {
        is_connected(&self.room_graph())
    }

    /// The border openings record `index` needs so it joins each of its neighbors. Prefers the
    /// middle mutually fulfillable tile; falls back to the middle of the shared span.
    pub fn openings_of(&self, index: usize) -> Vec<BorderOpening> {
        let rec = &self.records[index];
        let mut openings = Vec::new();
        for &other in rec.adjacents.iter() {
            let o = &self.records[other];
            let (dir, from, to) = match rec.rect.touching_side(&o.rect) {
                Some(t) => t,
                None => continue,
            };
            let coord = match mutual_border(&rec.rect, rec.gen.as_ref(), &o.rect, o.gen.as_ref())
            {
                Some((_, coords)) if !coords.is_empty() => coords[coords.len() / 2],
                _ => (from + to - 1) / 2,
            };
            openings.push(BorderOpening {
                dir,
                index: coord - rec.rect.side_start(dir),
            });
        }

        openings
    }

    /// Paints every record onto `map`, rooms first so halls overwrite any shape detail at the
    /// joins.
    pub fn draw(&self, map: &mut dyn TileMap) {
        let order = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == RecordKind::Room)
            .chain(
                self.records
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.kind == RecordKind::Hall),
            );
        for (i, rec) in order {
            let openings = self.openings_of(i);
            rec.gen.draw(map, rec.rect, &openings);
        }
        log::debug!("Drew {} floor plan records", self.records.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        room_gen::{RoomGenCross, RoomGenHall, RoomGenSquare},
        sampling::{small_rng, RandRange},
        tile_map::FloorMap,
    };

    fn square(size: Loc) -> Box<dyn RoomGen> {
        let mut rng = small_rng(0);
        let mut gen = RoomGenSquare::new(RandRange::exact(size.x), RandRange::exact(size.y));
        gen.prepare_size(&mut rng, size).unwrap();

        Box::new(gen)
    }

    fn hall(size: Loc) -> Box<dyn RoomGen> {
        let mut rng = small_rng(0);
        let mut gen = RoomGenHall::default();
        gen.prepare_size(&mut rng, size).unwrap();

        Box::new(gen)
    }

    #[test]
    fn test_adjacency_is_symmetric_and_pop_cleans_up() {
        let mut plan = FloorPlan::new(Loc::new(20, 10));
        let a = plan.add_record(Rect::new(1, 1, 4, 4), square(Loc::new(4, 4)), TagSet::new(), RecordKind::Room, &[]);
        let h = plan.add_record(Rect::new(5, 2, 3, 1), hall(Loc::new(3, 1)), TagSet::new(), RecordKind::Hall, &[a]);
        let b = plan.add_record(Rect::new(8, 1, 4, 4), square(Loc::new(4, 4)), TagSet::new(), RecordKind::Room, &[h]);

        assert_eq!(plan.record(a).adjacents(), &[h]);
        assert_eq!(plan.record(h).adjacents(), &[a, b]);
        assert!(plan.is_connected());

        plan.pop_record();
        assert_eq!(plan.record(h).adjacents(), &[a]);
    }

    #[test]
    fn test_mutual_border_respects_both_shapes() {
        let mut rng = small_rng(0);
        let mut cross = RoomGenCross::new(RandRange::exact(5), RandRange::exact(5), RandRange::exact(1));
        cross.prepare_size(&mut rng, Loc::new(5, 5)).unwrap();
        let room = Rect::new(1, 1, 5, 5);
        let wide_hall = Rect::new(6, 1, 2, 5);

        let (dir, coords) = mutual_border(&room, &cross, &wide_hall, hall(Loc::new(2, 5)).as_ref()).unwrap();
        assert_eq!(dir, Dir4::Right);
        assert_eq!(coords, vec![3]);
    }

    #[test]
    fn test_draw_joins_records() {
        let mut plan = FloorPlan::new(Loc::new(14, 7));
        let a = plan.add_record(Rect::new(1, 1, 4, 4), square(Loc::new(4, 4)), TagSet::new(), RecordKind::Room, &[]);
        let h = plan.add_record(Rect::new(5, 2, 3, 1), hall(Loc::new(3, 1)), TagSet::new(), RecordKind::Hall, &[a]);
        plan.add_record(Rect::new(8, 1, 4, 4), square(Loc::new(4, 4)), TagSet::new(), RecordKind::Room, &[h]);

        let mut map = FloorMap::new(plan.size());
        map.set_entrance(Loc::new(1, 1));
        plan.draw(&mut map);

        assert_eq!(map.reachable_from_entrance().len(), 16 + 3 + 16);
    }
}
