use super::{vault_rects, SealMap, SealType};
use crate::{
    filter::RoomFilter,
    floor_plan::FloorPlan,
    geometry::{Dir4, Loc, LocRay4, LocRay8, Rect, ALL_DIR4, DIAGONALS},
    tile_map::TileMap,
};

struct Classifier<'a, M: ?Sized> {
    plan: &'a FloorPlan,
    map: &'a M,
    vault: Vec<Rect>,
    seals: SealMap,
}

impl<'a, M: TileMap + ?Sized> Classifier<'a, M> {
    fn in_vault(&self, loc: Loc) -> bool {
        self.vault.iter().any(|r| r.contains(loc))
    }

    /// Only ever raises a classification.
    fn raise(&mut self, loc: Loc, seal: SealType) {
        let entry = self.seals.entry(loc).or_insert(seal);
        if seal > *entry {
            *entry = seal;
        }
    }

    /// Seals the step from vault tile `inner` to `next`. Bare rock past the vault is locked
    /// where it lies. A record past the vault stays untouched and `inner` is sealed instead,
    /// in which case `inner` is returned as a seam tile.
    fn seal_step(&mut self, inner: Loc, next: Loc) -> Option<Loc> {
        let out = self.outside(next)?;
        if self.plan.owners_of(out).is_empty() {
            self.raise(out, SealType::Locked);
            return None;
        }
        let seal = if self.map.is_walkable(inner) && self.map.is_walkable(out) {
            SealType::Key
        } else {
            SealType::Locked
        };
        self.raise(inner, seal);

        Some(inner)
    }

    fn cast4(&mut self, ray: LocRay4) -> Option<Loc> {
        self.seal_step(ray.loc, ray.traverse(1))
    }

    fn cast8(&mut self, ray: LocRay8) {
        self.seal_step(ray.loc, ray.traverse(1));
    }

    /// The map location of `loc` if it is on the map and not part of the vault.
    fn outside(&self, loc: Loc) -> Option<Loc> {
        let loc = self.map.normalize(loc)?;
        if self.in_vault(loc) {
            None
        } else {
            Some(loc)
        }
    }

    /// Vault tiles on either side of a seam tile along the boundary become doors too, so the
    /// seam cannot be slipped through diagonally. Other `Key` tiles keep their candidacy.
    fn lock_seam_flanks(&mut self, seam: &[(Loc, Dir4)]) {
        for (loc, dir) in seam {
            for side in dir.perpendicular().iter() {
                let flank = match self.map.normalize(*loc + side.offset()) {
                    Some(f) if self.in_vault(f) => f,
                    _ => continue,
                };
                if self.seals.get(&flank) != Some(&SealType::Key) {
                    self.raise(flank, SealType::Locked);
                }
            }
        }
    }

    /// Tiles that cannot be walked or dug are walls already.
    fn block_impassable(&mut self) {
        let map = self.map;
        for (loc, seal) in self.seals.iter_mut() {
            if !map.is_walkable(*loc) && !map.is_diggable(*loc) {
                *seal = SealType::Blocked;
            }
        }
    }
}

/// Classifies the boundary of the records that pass `filters`. Where the vault meets another
/// record, the vault's own border tile is sealed and the other record is left alone. Where it
/// meets bare rock, the rock tile just outside is sealed.
pub fn classify<M: TileMap + ?Sized>(plan: &FloorPlan, map: &M, filters: &[RoomFilter]) -> SealMap {
    let mut c = Classifier {
        plan,
        map,
        vault: vault_rects(plan, filters),
        seals: SealMap::new(),
    };

    let mut seam = Vec::new();
    for rect in c.vault.clone().iter() {
        for dir in ALL_DIR4.iter() {
            for loc in rect.border(*dir) {
                if let Some(inner) = c.cast4(LocRay4::new(loc, *dir)) {
                    seam.push((inner, *dir));
                }
            }
        }
        for diagonal in DIAGONALS.iter() {
            let corner = match rect.corner(*diagonal) {
                Some(l) => l,
                None => continue,
            };
            let (v, h) = match diagonal.split() {
                Some(parts) => parts,
                None => continue,
            };
            // Only a corner whose both sides face bare rock needs its own diagonal ray.
            let exterior = |d: Dir4| {
                c.outside(corner + d.offset())
                    .map_or(false, |l| c.plan.owners_of(l).is_empty())
            };
            if exterior(v) && exterior(h) {
                c.cast8(LocRay8::new(corner, *diagonal));
            }
        }
    }
    c.lock_seam_flanks(&seam);
    c.block_impassable();

    c.seals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{seal::test_util::row_of_three, tags::TagKind};

    fn vault_tiles(seals: &SealMap, vault: Rect) -> Vec<Loc> {
        seals.keys().copied().filter(|l| vault.contains(*l)).collect()
    }

    #[test]
    fn test_row_of_three_classification() {
        let (plan, map) = row_of_three(1);
        let seals = classify(&plan, &map, &[RoomFilter::HasTag(TagKind::Vault)]);

        // The seam is sealed on the vault's side; the hall keeps its last tile.
        assert_eq!(seals.get(&Loc::new(9, 3)), Some(&SealType::Key));
        assert_eq!(seals.get(&Loc::new(9, 2)), Some(&SealType::Locked));
        assert_eq!(seals.get(&Loc::new(9, 4)), Some(&SealType::Locked));
        assert_eq!(seals.get(&Loc::new(8, 3)), None);
        // Rock beside the vault is sealed where it lies.
        assert_eq!(seals.get(&Loc::new(8, 2)), Some(&SealType::Locked));
        assert_eq!(seals.get(&Loc::new(14, 3)), Some(&SealType::Locked));
        // The top row is the map's frame.
        assert_eq!(seals.get(&Loc::new(10, 0)), Some(&SealType::Blocked));
        assert_eq!(seals.get(&Loc::new(8, 0)), Some(&SealType::Blocked));
        assert_eq!(seals.get(&Loc::new(14, 6)), Some(&SealType::Locked));

        let vault = plan.record(2).rect;
        assert_eq!(
            vault_tiles(&seals, vault),
            vec![Loc::new(9, 2), Loc::new(9, 3), Loc::new(9, 4)]
        );
        // Every ring tile but the hall's is classified.
        let ring = vault.inflate(1);
        assert_eq!(seals.len() as i32, ring.area() - vault.area() - 1 + 3);
    }

    #[test]
    fn test_neighbouring_records_are_never_classified() {
        let (plan, map) = row_of_three(3);
        let seals = classify(&plan, &map, &[RoomFilter::HasTag(TagKind::Vault)]);

        for loc in seals.keys() {
            let owners = plan.owners_of(*loc);
            assert!(owners.iter().all(|i| *i == 2), "{:?} belongs to {:?}", loc, owners);
        }
    }

    #[test]
    fn test_wide_seam_keeps_every_open_tile_as_key() {
        let (plan, map) = row_of_three(3);
        let seals = classify(&plan, &map, &[RoomFilter::HasTag(TagKind::Vault)]);

        for y in 2..=4 {
            assert_eq!(seals.get(&Loc::new(9, y)), Some(&SealType::Key));
            assert_eq!(seals.get(&Loc::new(8, y)), None);
        }
        assert_eq!(seals.get(&Loc::new(9, 1)), Some(&SealType::Locked));
        assert_eq!(seals.get(&Loc::new(9, 5)), Some(&SealType::Locked));
        assert_eq!(seals.get(&Loc::new(8, 1)), Some(&SealType::Locked));
    }

    #[test]
    fn test_seam_onto_a_wall_is_locked() {
        let (plan, mut map) = row_of_three(1);
        map.set_tile(Loc::new(8, 3), crate::tile_map::Tile::Wall);
        let seals = classify(&plan, &map, &[RoomFilter::HasTag(TagKind::Vault)]);

        assert_eq!(seals.get(&Loc::new(9, 3)), Some(&SealType::Locked));
        assert!(seals.values().all(|s| *s != SealType::Key));
    }

    #[test]
    fn test_classification_only_rises() {
        let (plan, map) = row_of_three(1);
        let mut c = Classifier {
            plan: &plan,
            map: &map,
            vault: Vec::new(),
            seals: SealMap::new(),
        };
        c.raise(Loc::new(1, 1), SealType::Locked);
        c.raise(Loc::new(1, 1), SealType::Key);
        assert_eq!(c.seals[&Loc::new(1, 1)], SealType::Locked);
        c.raise(Loc::new(1, 1), SealType::Blocked);
        assert_eq!(c.seals[&Loc::new(1, 1)], SealType::Blocked);
    }
}
