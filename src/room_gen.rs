//! Room shapes. A shape is asked for a size, fixed to a size, asked which border tiles can
//! take a connection, then drawn into its rectangle.

use crate::{
    error::{GenError, GenResult},
    geometry::{Dir4, Loc, Rect},
    sampling::RandRange,
    tile_map::{Tile, TileMap},
};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A border tile of a room that must end up connected to the room's body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BorderOpening {
    pub dir: Dir4,
    pub index: i32,
}

pub trait RoomGen: fmt::Debug {
    fn propose_size(&self, rng: &mut dyn RngCore) -> GenResult<Loc>;

    /// Fixes the size the shape draws at. Must be called before `fulfillable_border`.
    fn prepare_size(&mut self, rng: &mut dyn RngCore, size: Loc) -> GenResult<()>;

    fn size(&self) -> Loc;

    /// One flag per tile along the `dir` side of the prepared size.
    fn fulfillable_border(&self, dir: Dir4) -> Vec<bool>;

    fn draw(&self, map: &mut dyn TileMap, rect: Rect, openings: &[BorderOpening]);

    fn box_clone(&self) -> Box<dyn RoomGen>;
}

impl Clone for Box<dyn RoomGen> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Paints floor from an opening inward until it meets the shape's body.
fn carve_to_body(
    map: &mut dyn TileMap,
    rect: Rect,
    opening: BorderOpening,
    in_body: impl Fn(Loc) -> bool,
) {
    let inward = opening.dir.reverse().offset();
    let mut loc = rect.border_loc(opening.dir, opening.index);
    while rect.contains(loc) && !in_body(loc - rect.start) {
        map.set_tile(loc, Tile::Floor);
        loc += inward;
    }
}

fn check_positive(size: Loc) -> GenResult<()> {
    if size.x < 1 || size.y < 1 {
        Err(GenError::UnsupportedSize(size))
    } else {
        Ok(())
    }
}

/// A solid rectangle of floor.
#[derive(Clone, Debug)]
pub struct RoomGenSquare {
    pub width: RandRange,
    pub height: RandRange,
    size: Loc,
}

impl RoomGenSquare {
    pub fn new(width: RandRange, height: RandRange) -> Self {
        RoomGenSquare {
            width,
            height,
            size: Loc::ZERO,
        }
    }
}

impl RoomGen for RoomGenSquare {
    fn propose_size(&self, rng: &mut dyn RngCore) -> GenResult<Loc> {
        Ok(Loc::new(self.width.pick(rng)?, self.height.pick(rng)?))
    }

    fn prepare_size(&mut self, _rng: &mut dyn RngCore, size: Loc) -> GenResult<()> {
        check_positive(size)?;
        self.size = size;

        Ok(())
    }

    fn size(&self) -> Loc {
        self.size
    }

    fn fulfillable_border(&self, dir: Dir4) -> Vec<bool> {
        let len = if dir.is_vertical() {
            self.size.x
        } else {
            self.size.y
        };

        vec![true; len.max(0) as usize]
    }

    fn draw(&self, map: &mut dyn TileMap, rect: Rect, _openings: &[BorderOpening]) {
        for loc in rect.iter() {
            map.set_tile(loc, Tile::Floor);
        }
    }

    fn box_clone(&self) -> Box<dyn RoomGen> {
        Box::new(self.clone())
    }
}

/// Corridor filler. Its size is always decided by whoever places it.
#[derive(Clone, Debug, Default)]
pub struct RoomGenHall {
    size: Loc,
}

impl RoomGen for RoomGenHall {
    fn propose_size(&self, _rng: &mut dyn RngCore) -> GenResult<Loc> {
        Ok(Loc::new(1, 1))
    }

    fn prepare_size(&mut self, _rng: &mut dyn RngCore, size: Loc) -> GenResult<()> {
        check_positive(size)?;
        self.size = size;

        Ok(())
    }

    fn size(&self) -> Loc {
        self.size
    }

    fn fulfillable_border(&self, dir: Dir4) -> Vec<bool> {
        let len = if dir.is_vertical() {
            self.size.x
        } else {
            self.size.y
        };

        vec![true; len.max(0) as usize]
    }

    fn draw(&self, map: &mut dyn TileMap, rect: Rect, _openings: &[BorderOpening]) {
        for loc in rect.iter() {
            map.set_tile(loc, Tile::Floor);
        }
    }

    fn box_clone(&self) -> Box<dyn RoomGen> {
        Box::new(self.clone())
    }
}

/// A plus sign: a horizontal and a vertical bar crossing in the middle. Only the ends of the
/// bars can take connections; other openings get a spur dug to the nearest bar.
#[derive(Clone, Debug)]
pub struct RoomGenCross {
    pub width: RandRange,
    pub height: RandRange,
    /// Thickness of each bar.
    pub arm: RandRange,
    size: Loc,
    bar_x: (i32, i32),
    bar_y: (i32, i32),
}

impl RoomGenCross {
    pub fn new(width: RandRange, height: RandRange, arm: RandRange) -> Self {
        RoomGenCross {
            width,
            height,
            arm,
            size: Loc::ZERO,
            bar_x: (0, 0),
            bar_y: (0, 0),
        }
    }

    fn in_body(&self, local: Loc) -> bool {
        let in_vertical = local.x >= self.bar_x.0 && local.x < self.bar_x.1;
        let in_horizontal = local.y >= self.bar_y.0 && local.y < self.bar_y.1;

        in_vertical || in_horizontal
    }
}

impl RoomGen for RoomGenCross {
    fn propose_size(&self, rng: &mut dyn RngCore) -> GenResult<Loc> {
        Ok(Loc::new(self.width.pick(rng)?, self.height.pick(rng)?))
    }

    fn prepare_size(&mut self, rng: &mut dyn RngCore, size: Loc) -> GenResult<()> {
        check_positive(size)?;
        let arm_x = self.arm.pick(rng)?.max(1).min(size.x);
        let arm_y = self.arm.pick(rng)?.max(1).min(size.y);
        let x0 = (size.x - arm_x) / 2;
        let y0 = (size.y - arm_y) / 2;
        self.size = size;
        self.bar_x = (x0, x0 + arm_x);
        self.bar_y = (y0, y0 + arm_y);

        Ok(())
    }

    fn size(&self) -> Loc {
        self.size
    }

    fn fulfillable_border(&self, dir: Dir4) -> Vec<bool> {
        let (len, bar) = if dir.is_vertical() {
            (self.size.x, self.bar_x)
        } else {
            (self.size.y, self.bar_y)
        };

        (0..len).map(|i| i >= bar.0 && i < bar.1).collect()
    }

    fn draw(&self, map: &mut dyn TileMap, rect: Rect, openings: &[BorderOpening]) {
        for loc in rect.iter() {
            if self.in_body(loc - rect.start) {
                map.set_tile(loc, Tile::Floor);
            }
        }
        for opening in openings {
            carve_to_body(map, rect, *opening, |l| self.in_body(l));
        }
    }

    fn box_clone(&self) -> Box<dyn RoomGen> {
        Box::new(self.clone())
    }
}

/// A fixed hand-drawn room. Rows use `.` for floor, `X` for unbreakable and `#` for rock.
#[derive(Clone, Debug)]
pub struct RoomGenTemplate {
    pub declared: Loc,
    pub rows: Vec<String>,
}

impl RoomGenTemplate {
    pub fn new(declared: Loc, rows: Vec<String>) -> Self {
        RoomGenTemplate { declared, rows }
    }

    fn content_size(&self) -> Loc {
        let width = self
            .rows
            .iter()
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0);

        Loc::new(width as i32, self.rows.len() as i32)
    }

    fn cell(&self, local: Loc) -> char {
        self.rows
            .get(local.y as usize)
            .and_then(|r| r.chars().nth(local.x as usize))
            .unwrap_or('#')
    }
}

impl RoomGen for RoomGenTemplate {
    fn propose_size(&self, _rng: &mut dyn RngCore) -> GenResult<Loc> {
        Ok(self.declared)
    }

    fn prepare_size(&mut self, _rng: &mut dyn RngCore, size: Loc) -> GenResult<()> {
        let actual = self.content_size();
        if actual != self.declared {
            return Err(GenError::TemplateSizeMismatch {
                declared: self.declared,
                actual,
            });
        }
        if size != self.declared {
            return Err(GenError::UnsupportedSize(size));
        }

        Ok(())
    }

    fn size(&self) -> Loc {
        self.declared
    }

    fn fulfillable_border(&self, dir: Dir4) -> Vec<bool> {
        let rect = Rect::from_start_size(Loc::ZERO, self.declared);

        rect.border(dir)
            .into_iter()
            .map(|l| self.cell(l) == '.')
            .collect()
    }

    fn draw(&self, map: &mut dyn TileMap, rect: Rect, openings: &[BorderOpening]) {
        for loc in rect.iter() {
            match self.cell(loc - rect.start) {
                '.' => map.set_tile(loc, Tile::Floor),
                'X' => map.set_tile(loc, Tile::Unbreakable),
                _ => {}
            }
        }
        for opening in openings {
            carve_to_body(map, rect, *opening, |l| self.cell(l) == '.');
        }
    }

    fn box_clone(&self) -> Box<dyn RoomGen> {
        Box::new(self.clone())
    }
}

/// Data form of the built-in shapes.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum RoomGenSpec {
    Square {
        width: RandRange,
        height: RandRange,
    },
    Cross {
        width: RandRange,
        height: RandRange,
        arm: RandRange,
    },
    Hall,
    Template {
        size: Loc,
        rows: Vec<String>,
    },
}

impl RoomGenSpec {
    pub fn build(&self) -> GenResult<Box<dyn RoomGen>> {
        Ok(match self {
            RoomGenSpec::Square { width, height } => {
                width.validate()?;
                height.validate()?;
                Box::new(RoomGenSquare::new(*width, *height))
            }
            RoomGenSpec::Cross { width, height, arm } => {
                width.validate()?;
                height.validate()?;
                arm.validate()?;
                Box::new(RoomGenCross::new(*width, *height, *arm))
            }
            RoomGenSpec::Hall => Box::new(RoomGenHall::default()),
            RoomGenSpec::Template { size, rows } => {
                Box::new(RoomGenTemplate::new(*size, rows.clone()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sampling::small_rng, tile_map::FloorMap};

    #[test]
    fn test_cross_border_only_at_bar_ends() {
        let mut rng = small_rng(0);
        let mut cross = RoomGenCross::new(RandRange::exact(5), RandRange::exact(5), RandRange::exact(1));
        cross.prepare_size(&mut rng, Loc::new(5, 5)).unwrap();

        assert_eq!(
            cross.fulfillable_border(Dir4::Up),
            vec![false, false, true, false, false]
        );
    }

    #[test]
    fn test_cross_draws_spur_to_unfulfillable_opening() {
        let mut rng = small_rng(0);
        let mut cross = RoomGenCross::new(RandRange::exact(5), RandRange::exact(5), RandRange::exact(1));
        cross.prepare_size(&mut rng, Loc::new(5, 5)).unwrap();
        let mut map = FloorMap::new(Loc::new(7, 7));
        cross.draw(
            &mut map,
            Rect::new(1, 1, 5, 5),
            &[BorderOpening {
                dir: Dir4::Up,
                index: 0,
            }],
        );

        assert_eq!(
            map.render_ascii(),
            "#######\n#.#.###\n#.#.###\n#.....#\n###.###\n###.###\n#######\n"
        );
    }

    #[test]
    fn test_template_size_mismatch_is_structural() {
        let mut rng = small_rng(0);
        let mut t = RoomGenTemplate::new(Loc::new(3, 2), vec!["...".into(), "..".into(), "...".into()]);

        assert_eq!(
            t.prepare_size(&mut rng, Loc::new(3, 2)),
            Err(GenError::TemplateSizeMismatch {
                declared: Loc::new(3, 2),
                actual: Loc::new(3, 3),
            })
        );
    }

    #[test]
    fn test_boxed_clones_are_independent() {
        let mut rng = small_rng(0);
        let mut original: Box<dyn RoomGen> = Box::new(RoomGenSquare::new(
            RandRange::new(2, 4),
            RandRange::new(2, 4),
        ));
        original.prepare_size(&mut rng, Loc::new(3, 3)).unwrap();
        let mut copy = original.clone();
        copy.prepare_size(&mut rng, Loc::new(2, 4)).unwrap();

        assert_eq!(original.size(), Loc::new(3, 3));
        assert_eq!(copy.size(), Loc::new(2, 4));
    }
}
