//! Grows a boss room off an existing record of a finished floor plan, with a vault behind it
//! that can only be entered through the boss room.

use crate::{
    error::{GenError, GenResult},
    filter::{passes_all, RoomFilter},
    floor_plan::{FloorPlan, RecordKind},
    geometry::{Dir4, Loc, Rect, ALL_DIR4},
    room_gen::RoomGen,
    sampling::{RandRange, SpawnList},
    tags::{ConnectivityKind, RoomTag, TagSet},
};

use rand::{seq::SliceRandom, Rng};

pub const MAX_BOSS_ATTEMPTS: usize = 10;

#[derive(Clone, Debug)]
pub struct BossVaultStep {
    pub boss_pool: SpawnList<Box<dyn RoomGen>>,
    pub vault_pool: SpawnList<Box<dyn RoomGen>>,
    pub hall_pool: SpawnList<Box<dyn RoomGen>>,
    /// Length of the hall between the anchor and the boss room; zero attaches directly.
    pub hall_length: RandRange,
    pub anchor_filters: Vec<RoomFilter>,
}

/// Record indices of what a successful attachment added.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BossVaultPlacement {
    pub anchor: usize,
    pub hall: Option<usize>,
    pub boss: usize,
    pub vault: usize,
}

/// A room rectangle (and optional hall) that fits against one side of an anchor.
struct Attachment {
    rect: Rect,
    gen: Box<dyn RoomGen>,
    hall: Option<(Rect, Box<dyn RoomGen>)>,
}

impl BossVaultStep {
    /// Returns `None`, leaving `plan` untouched, when every attempt fails.
    pub fn apply(&self, rng: &mut impl Rng, plan: &mut FloorPlan) -> GenResult<Option<BossVaultPlacement>> {
        self.hall_length.validate()?;
        let anchors: Vec<usize> = plan
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| passes_all(&self.anchor_filters, *r))
            .map(|(i, _)| i)
            .collect();
        if anchors.is_empty() {
            log::info!("No record can anchor a boss room");
            return Ok(None);
        }

        for attempt in 0..MAX_BOSS_ATTEMPTS {
            let anchor = anchors[rng.gen_range(0, anchors.len())];
            let dir = ALL_DIR4[rng.gen_range(0, 4)];
            let length = self.hall_length.pick(rng)?.max(0);
            let boss_gen = pick_gen(&self.boss_pool, rng, "boss rooms")?;
            let boss = match self.fit(rng, plan, anchor, dir, length, boss_gen, &[])? {
                Some(a) => a,
                None => continue,
            };
            let (hall, boss) = commit(
                plan,
                anchor,
                boss,
                TagSet::new()
                    .with(RoomTag::BossRoom)
                    .with(RoomTag::Connectivity(ConnectivityKind::BossSealed)),
            );
            log::debug!("Attempt {}: boss room {} off record {}", attempt, boss, anchor);

            // The vault may touch nothing but the boss room.
            let mut dirs = ALL_DIR4;
            dirs.shuffle(rng);
            let mut vault = None;
            for dir in dirs.iter() {
                let gen = pick_gen(&self.vault_pool, rng, "vault rooms")?;
                let allowed = [boss];
                if let Some(a) = self.fit(rng, plan, boss, *dir, 0, gen, &allowed)? {
                    vault = Some(a);
                    break;
                }
            }
            match vault {
                Some(v) => {
                    let (_, vault) = commit(
                        plan,
                        boss,
                        v,
                        TagSet::new()
                            .with(RoomTag::Vault)
                            .with(RoomTag::Connectivity(ConnectivityKind::BossSealed))
                            .with(RoomTag::Unvaultable),
                    );
                    log::debug!("Vault {} placed behind boss room {}", vault, boss);

                    return Ok(Some(BossVaultPlacement {
                        anchor,
                        hall,
                        boss,
                        vault,
                    }));
                }
                None => {
                    plan.pop_record();
                    if hall.is_some() {
                        plan.pop_record();
                    }
                    log::debug!("Attempt {}: no room for a vault, removed the boss room", attempt);
                }
            }
        }
        log::info!("Gave up placing a boss room after {} attempts", MAX_BOSS_ATTEMPTS);

        Ok(None)
    }

    /// Finds a placement for `gen` on the `dir` side of record `anchor`, `length` tiles away.
    /// When `exclusive_to` is non-empty, the room may not touch any other record.
    #[allow(clippy::too_many_arguments)]
    fn fit(
        &self,
        rng: &mut impl Rng,
        plan: &FloorPlan,
        anchor: usize,
        dir: Dir4,
        length: i32,
        mut gen: Box<dyn RoomGen>,
        exclusive_to: &[usize],
    ) -> GenResult<Option<Attachment>> {
        let base = plan.record(anchor);
        let anchor_side = base.gen.fulfillable_border(dir);
        let exits: Vec<i32> = (0..anchor_side.len() as i32)
            .filter(|i| anchor_side[*i as usize])
            .collect();
        let exit_index = match exits.choose(rng) {
            Some(i) => *i,
            None => return Ok(None),
        };

        let size = gen.propose_size(rng)?;
        gen.prepare_size(rng, size)?;
        let entry_side = gen.fulfillable_border(dir.reverse());
        let entries: Vec<i32> = (0..entry_side.len() as i32)
            .filter(|i| entry_side[*i as usize])
            .collect();
        let entry = match entries.choose(rng) {
            Some(i) => *i,
            None => return Ok(None),
        };

        let step = dir.offset();
        let first = base.rect.border_loc(dir, exit_index) + step;
        let hall_rect = if length > 0 {
            let last = first + step * (length - 1);
            Some(span_rect(first, last))
        } else {
            None
        };

        // The room's facing side starts right after the hall.
        let rect = Rect::beyond(first + step * length, dir, size, entry);

        let mut footprint = vec![rect];
        footprint.extend(hall_rect);
        if footprint.iter().any(|r| !plan.in_bounds(r) || plan.collides(r)) {
            return Ok(None);
        }
        // Unrelated records may not share a wall with anything new.
        let touches_stranger = plan.records().iter().enumerate().any(|(i, r)| {
            let related = if exclusive_to.is_empty() {
                i == anchor
            } else {
                exclusive_to.contains(&i)
            };
            !related && footprint.iter().any(|f| r.rect.intersects(&f.inflate(1)))
        });
        if touches_stranger {
            return Ok(None);
        }

        let hall = match hall_rect {
            Some(r) => {
                let mut hall_gen = pick_gen(&self.hall_pool, rng, "halls")?;
                hall_gen.prepare_size(rng, r.size)?;
                Some((r, hall_gen))
            }
            None => None,
        };

        Ok(Some(Attachment { rect, gen, hall }))
    }
}

fn pick_gen(
    pool: &SpawnList<Box<dyn RoomGen>>,
    rng: &mut impl Rng,
    what: &'static str,
) -> GenResult<Box<dyn RoomGen>> {
    pool.pick(rng).cloned().ok_or(GenError::EmptyPool(what))
}

/// Smallest rect containing both corners.
fn span_rect(a: Loc, b: Loc) -> Rect {
    let start = Loc::new(a.x.min(b.x), a.y.min(b.y));
    let end = Loc::new(a.x.max(b.x), a.y.max(b.y));

    Rect::from_start_size(start, end - start + Loc::new(1, 1))
}

fn commit(plan: &mut FloorPlan, anchor: usize, a: Attachment, tags: TagSet) -> (Option<usize>, usize) {
    let hall = a
        .hall
        .map(|(rect, gen)| plan.add_record(rect, gen, TagSet::new(), RecordKind::Hall, &[anchor]));
    let attach_to = [hall.unwrap_or(anchor)];
    let room = plan.add_record(a.rect, a.gen, tags, RecordKind::Room, &attach_to);

    (hall, room)
}
