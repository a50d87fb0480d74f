//! Integer 2-D primitives shared by every stage: locations, rectangles, 4- and 8-way
//! directions and outward-pointing rays.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Loc {
    pub x: i32,
    pub y: i32,
}

impl Loc {
    pub const ZERO: Loc = Loc { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Loc { x, y }
    }

    /// Wraps into `[0, size)` on both axes, for toroidal maps.
    pub fn wrap(self, size: Loc) -> Self {
        Loc {
            x: self.x.rem_euclid(size.x),
            y: self.y.rem_euclid(size.y),
        }
    }

    pub fn in_bounds(self, size: Loc) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < size.x && self.y < size.y
    }

    /// Chebyshev distance.
    pub fn dist8(self, other: Loc) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Component along the direction of travel for `dir`.
    pub fn along(self, dir: Dir4) -> i32 {
        if dir.is_vertical() {
            self.y
        } else {
            self.x
        }
    }

    /// Component perpendicular to the direction of travel for `dir`.
    pub fn across(self, dir: Dir4) -> i32 {
        if dir.is_vertical() {
            self.x
        } else {
            self.y
        }
    }
}

impl From<(i32, i32)> for Loc {
    fn from((x, y): (i32, i32)) -> Self {
        Loc { x, y }
    }
}

impl Add for Loc {
    type Output = Loc;

    fn add(self, rhs: Loc) -> Loc {
        Loc::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Loc {
    fn add_assign(&mut self, rhs: Loc) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Loc {
    type Output = Loc;

    fn sub(self, rhs: Loc) -> Loc {
        Loc::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for Loc {
    type Output = Loc;

    fn mul(self, rhs: i32) -> Loc {
        Loc::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Loc {
    type Output = Loc;

    fn neg(self) -> Loc {
        Loc::new(-self.x, -self.y)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Dir4 {
    Up,
    Right,
    Down,
    Left,
}

pub const ALL_DIR4: [Dir4; 4] = [Dir4::Up, Dir4::Right, Dir4::Down, Dir4::Left];

impl Dir4 {
    pub fn offset(self) -> Loc {
        match self {
            Dir4::Up => Loc::new(0, -1),
            Dir4::Right => Loc::new(1, 0),
            Dir4::Down => Loc::new(0, 1),
            Dir4::Left => Loc::new(-1, 0),
        }
    }

    pub fn reverse(self) -> Dir4 {
        match self {
            Dir4::Up => Dir4::Down,
            Dir4::Right => Dir4::Left,
            Dir4::Down => Dir4::Up,
            Dir4::Left => Dir4::Right,
        }
    }

    pub fn clockwise(self) -> Dir4 {
        match self {
            Dir4::Up => Dir4::Right,
            Dir4::Right => Dir4::Down,
            Dir4::Down => Dir4::Left,
            Dir4::Left => Dir4::Up,
        }
    }

    /// The two directions at right angles, in clockwise-then-counterclockwise order.
    pub fn perpendicular(self) -> [Dir4; 2] {
        [self.clockwise(), self.clockwise().reverse()]
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Dir4::Up | Dir4::Down)
    }

    pub fn to_dir8(self) -> Dir8 {
        match self {
            Dir4::Up => Dir8::Up,
            Dir4::Right => Dir8::Right,
            Dir4::Down => Dir8::Down,
            Dir4::Left => Dir8::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Dir8 {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

pub const ALL_DIR8: [Dir8; 8] = [
    Dir8::Up,
    Dir8::UpRight,
    Dir8::Right,
    Dir8::DownRight,
    Dir8::Down,
    Dir8::DownLeft,
    Dir8::Left,
    Dir8::UpLeft,
];

pub const DIAGONALS: [Dir8; 4] = [Dir8::UpRight, Dir8::DownRight, Dir8::DownLeft, Dir8::UpLeft];

impl Dir8 {
    pub fn offset(self) -> Loc {
        match self {
            Dir8::Up => Loc::new(0, -1),
            Dir8::UpRight => Loc::new(1, -1),
            Dir8::Right => Loc::new(1, 0),
            Dir8::DownRight => Loc::new(1, 1),
            Dir8::Down => Loc::new(0, 1),
            Dir8::DownLeft => Loc::new(-1, 1),
            Dir8::Left => Loc::new(-1, 0),
            Dir8::UpLeft => Loc::new(-1, -1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        self.split().is_some()
    }

    /// Splits a diagonal into its (vertical, horizontal) cardinal components.
    pub fn split(self) -> Option<(Dir4, Dir4)> {
        match self {
            Dir8::UpRight => Some((Dir4::Up, Dir4::Right)),
            Dir8::DownRight => Some((Dir4::Down, Dir4::Right)),
            Dir8::DownLeft => Some((Dir4::Down, Dir4::Left)),
            Dir8::UpLeft => Some((Dir4::Up, Dir4::Left)),
            _ => None,
        }
    }

    pub fn reverse(self) -> Dir8 {
        let idx = ALL_DIR8.iter().position(|d| *d == self).unwrap_or(0);
        ALL_DIR8[(idx + 4) % 8]
    }
}

impl From<Dir4> for Dir8 {
    fn from(dir: Dir4) -> Self {
        dir.to_dir8()
    }
}

/// An opening at `loc` pointing outward along `dir`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct LocRay4 {
    pub loc: Loc,
    pub dir: Dir4,
}

impl LocRay4 {
    pub fn new(loc: Loc, dir: Dir4) -> Self {
        LocRay4 { loc, dir }
    }

    /// The location `dist` steps along the ray.
    pub fn traverse(&self, dist: i32) -> Loc {
        self.loc + self.dir.offset() * dist
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct LocRay8 {
    pub loc: Loc,
    pub dir: Dir8,
}

impl LocRay8 {
    pub fn new(loc: Loc, dir: Dir8) -> Self {
        LocRay8 { loc, dir }
    }

    pub fn traverse(&self, dist: i32) -> Loc {
        self.loc + self.dir.offset() * dist
    }
}

impl From<LocRay4> for LocRay8 {
    fn from(ray: LocRay4) -> Self {
        LocRay8::new(ray.loc, ray.dir.to_dir8())
    }
}

/// Axis-aligned rectangle; `start` is inclusive, `start + size` is exclusive.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Rect {
    pub start: Loc,
    pub size: Loc,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect {
            start: Loc::new(x, y),
            size: Loc::new(w, h),
        }
    }

    pub fn from_start_size(start: Loc, size: Loc) -> Self {
        Rect { start, size }
    }

    pub fn x(&self) -> i32 {
        self.start.x
    }

    pub fn y(&self) -> i32 {
        self.start.y
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    pub fn end(&self) -> Loc {
        self.start + self.size
    }

    pub fn right(&self) -> i32 {
        self.start.x + self.size.x
    }

    pub fn bottom(&self) -> i32 {
        self.start.y + self.size.y
    }

    pub fn area(&self) -> i32 {
        self.size.x.max(0) * self.size.y.max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn center(&self) -> Loc {
        self.start + Loc::new(self.size.x / 2, self.size.y / 2)
    }

    pub fn contains(&self, loc: Loc) -> bool {
        loc.x >= self.start.x && loc.y >= self.start.y && loc.x < self.right() && loc.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.start.x >= self.start.x
            && other.start.y >= self.start.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True when the two rectangles share at least one tile.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.start.x < other.right()
            && other.start.x < self.right()
            && self.start.y < other.bottom()
            && other.start.y < self.bottom()
    }

    /// Grows (or shrinks, for negative `amount`) every side by `amount`.
    pub fn inflate(&self, amount: i32) -> Rect {
        Rect {
            start: self.start - Loc::new(amount, amount),
            size: self.size + Loc::new(amount * 2, amount * 2),
        }
    }

    /// Number of tiles along the side facing `dir`.
    pub fn side_len(&self, dir: Dir4) -> i32 {
        if dir.is_vertical() {
            self.size.x
        } else {
            self.size.y
        }
    }

    /// The first coordinate of the side facing `dir`, on the axis that side runs along.
    pub fn side_start(&self, dir: Dir4) -> i32 {
        self.start.across(dir)
    }

    /// The tile inside the rect at `index` along its `dir` side.
    pub fn border_loc(&self, dir: Dir4, index: i32) -> Loc {
        match dir {
            Dir4::Up => Loc::new(self.start.x + index, self.start.y),
            Dir4::Down => Loc::new(self.start.x + index, self.bottom() - 1),
            Dir4::Left => Loc::new(self.start.x, self.start.y + index),
            Dir4::Right => Loc::new(self.right() - 1, self.start.y + index),
        }
    }

    /// The tiles inside the rect along its `dir` side.
    pub fn border(&self, dir: Dir4) -> Vec<Loc> {
        (0..self.side_len(dir))
            .map(|i| self.border_loc(dir, i))
            .collect()
    }

    /// The inside corner tile between two perpendicular sides.
    pub fn corner(&self, diagonal: Dir8) -> Option<Loc> {
        let (v, h) = diagonal.split()?;
        let x = if h == Dir4::Left {
            self.start.x
        } else {
            self.right() - 1
        };
        let y = if v == Dir4::Up {
            self.start.y
        } else {
            self.bottom() - 1
        };

        Some(Loc::new(x, y))
    }

    /// If `other` lies flush against one side of `self` with a shared span, returns that side
    /// and the shared span `[from, to)` along the side's axis.
    pub fn touching_side(&self, other: &Rect) -> Option<(Dir4, i32, i32)> {
        let dir = if other.bottom() == self.start.y {
            Dir4::Up
        } else if other.start.y == self.bottom() {
            Dir4::Down
        } else if other.right() == self.start.x {
            Dir4::Left
        } else if other.start.x == self.right() {
            Dir4::Right
        } else {
            return None;
        };

        let (from, to) = if dir.is_vertical() {
            (self.start.x.max(other.start.x), self.right().min(other.right()))
        } else {
            (self.start.y.max(other.start.y), self.bottom().min(other.bottom()))
        };

        if from < to {
            Some((dir, from, to))
        } else {
            None
        }
    }

    /// The rect of `size` lying past `entry` in direction `dir`, whose side facing back along
    /// `dir` contains `entry` at `index`.
    pub fn beyond(entry: Loc, dir: Dir4, size: Loc, index: i32) -> Rect {
        let across = entry.across(dir) - index;
        let start = match dir {
            Dir4::Right => Loc::new(entry.x, across),
            Dir4::Down => Loc::new(across, entry.y),
            Dir4::Left => Loc::new(entry.x - size.x + 1, across),
            Dir4::Up => Loc::new(across, entry.y - size.y + 1),
        };

        Rect::from_start_size(start, size)
    }

    pub fn iter(&self) -> impl Iterator<Item = Loc> {
        let Rect { start, size } = *self;
        (start.y..start.y + size.y)
            .flat_map(move |y| (start.x..start.x + size.x).map(move |x| Loc::new(x, y)))
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_side_shares_span() {
        let r1 = Rect::new(2, 2, 4, 4);
        let r2 = Rect::new(6, 4, 3, 5);

        assert_eq!(r1.touching_side(&r2), Some((Dir4::Right, 4, 6)));
        assert_eq!(r2.touching_side(&r1), Some((Dir4::Left, 4, 6)));
    }

    #[test]
    fn test_corner_contact_is_not_touching() {
        let r1 = Rect::new(0, 0, 3, 3);
        let r2 = Rect::new(3, 3, 3, 3);

        assert_eq!(r1.touching_side(&r2), None);
        assert!(!r1.intersects(&r2));
    }

    #[test]
    fn test_border_and_corner() {
        let r = Rect::new(1, 1, 3, 2);

        assert_eq!(
            r.border(Dir4::Down),
            vec![Loc::new(1, 2), Loc::new(2, 2), Loc::new(3, 2)]
        );
        assert_eq!(r.corner(Dir8::UpRight), Some(Loc::new(3, 1)));
        assert_eq!(r.corner(Dir8::Up), None);
    }

    #[test]
    fn test_rect_beyond_entry() {
        let entry = Loc::new(10, 5);

        assert_eq!(Rect::beyond(entry, Dir4::Right, Loc::new(3, 4), 1), Rect::new(10, 4, 3, 4));
        assert_eq!(Rect::beyond(entry, Dir4::Up, Loc::new(3, 4), 2), Rect::new(8, 2, 3, 4));
        assert!(Rect::beyond(entry, Dir4::Left, Loc::new(2, 2), 0).contains(entry));
    }

    #[test]
    fn test_dir8_offsets_and_reverse() {
        assert_eq!(Dir8::DownLeft.offset(), Loc::new(-1, 1));
        assert_eq!(Dir8::UpRight.reverse(), Dir8::DownLeft);
        assert_eq!(Dir8::Left.offset(), Loc::new(-1, 0));
    }

    #[test]
    fn test_wrap() {
        let size = Loc::new(5, 4);
        assert_eq!(Loc::new(-1, 4).wrap(size), Loc::new(4, 0));
    }
}
