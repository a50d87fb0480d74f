use crate::{
    boss_vault::{BossVaultPlacement, BossVaultStep},
    detour::{DetourLock, DetourResult, DetourSpawns, DetourStep},
    error::{GenError, GenResult},
    filter::{compile_filters, FilterSpec},
    floor_plan::{FloorPlan, RecordKind},
    geometry::Loc,
    grid_path::{GridPathGen, GridPathSpec, PathOutcome, PathPools},
    grid_plan::GridPlan,
    room_gen::{RoomGen, RoomGenSpec},
    sampling::{small_rng, RandRange, SpawnList},
    seal::{SealMechanism, SealResult, SealStep},
    tags::TagKind,
    tile_map::{FloorMap, TileMap},
};

use rand::prelude::*;
use serde::{Deserialize, Serialize};

pub const MAX_PATH_RETRIES: usize = 10;

fn build_pool(pool: &SpawnList<RoomGenSpec>) -> GenResult<SpawnList<Box<dyn RoomGen>>> {
    pool.map(RoomGenSpec::build)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GridSpec {
    pub width: i32,
    pub height: i32,
    /// Tiles per cell.
    pub cell_size: Loc,
    #[serde(default)]
    pub wrap: bool,
    pub path: GridPathSpec,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BossVaultSpec {
    pub boss_pool: SpawnList<RoomGenSpec>,
    pub vault_pool: SpawnList<RoomGenSpec>,
    pub hall_pool: SpawnList<RoomGenSpec>,
    pub hall_length: RandRange,
    #[serde(default)]
    pub anchor_filters: Vec<FilterSpec>,
}

impl BossVaultSpec {
    pub fn build(&self) -> GenResult<BossVaultStep> {
        Ok(BossVaultStep {
            boss_pool: build_pool(&self.boss_pool)?,
            vault_pool: build_pool(&self.vault_pool)?,
            hall_pool: build_pool(&self.hall_pool)?,
            hall_length: self.hall_length,
            anchor_filters: compile_filters(&self.anchor_filters)?,
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DetourSpec {
    pub room_pool: SpawnList<RoomGenSpec>,
    pub hall_length: RandRange,
    pub lock: DetourLock,
    #[serde(default)]
    pub spawns: DetourSpawns,
    #[serde(default)]
    pub place_key: bool,
}

impl DetourSpec {
    pub fn build(&self) -> GenResult<DetourStep> {
        Ok(DetourStep {
            room_pool: build_pool(&self.room_pool)?,
            hall_length: self.hall_length,
            lock: self.lock.clone(),
            spawns: self.spawns.clone(),
            place_key: self.place_key,
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum SealMechanismSpec {
    Wall,
    Key {
        item: String,
    },
    Switch {
        amount: usize,
        #[serde(default)]
        time_limit: Option<u32>,
        #[serde(default)]
        switch_filters: Vec<FilterSpec>,
    },
    Boss {
        boss_filters: Vec<FilterSpec>,
    },
    Guard {
        mob: String,
    },
    Terrain {
        terrain: u16,
    },
}

impl SealMechanismSpec {
    pub fn compile(&self) -> GenResult<SealMechanism> {
        Ok(match self {
            SealMechanismSpec::Wall => SealMechanism::Wall,
            SealMechanismSpec::Key { item } => SealMechanism::Key { item: item.clone() },
            SealMechanismSpec::Switch {
                amount,
                time_limit,
                switch_filters,
            } => SealMechanism::Switch {
                amount: *amount,
                time_limit: *time_limit,
                switch_filters: compile_filters(switch_filters)?,
            },
            SealMechanismSpec::Boss { boss_filters } => SealMechanism::Boss {
                boss_filters: compile_filters(boss_filters)?,
            },
            SealMechanismSpec::Guard { mob } => SealMechanism::Guard { mob: mob.clone() },
            SealMechanismSpec::Terrain { terrain } => SealMechanism::Terrain { terrain: *terrain },
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SealSpec {
    pub filters: Vec<FilterSpec>,
    pub mechanism: SealMechanismSpec,
}

impl SealSpec {
    pub fn build(&self) -> GenResult<SealStep> {
        Ok(SealStep {
            filters: compile_filters(&self.filters)?,
            mechanism: self.mechanism.compile()?,
        })
    }
}

/// Everything needed to generate one floor.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FloorGenSpec {
    pub seed: u64,
    pub grid: GridSpec,
    pub rooms: SpawnList<RoomGenSpec>,
    pub halls: SpawnList<RoomGenSpec>,
    #[serde(default)]
    pub boss_vault: Option<BossVaultSpec>,
    #[serde(default)]
    pub detours: Vec<DetourSpec>,
    #[serde(default)]
    pub seals: Vec<SealSpec>,
}

/// How each optional step turned out. `None` entries are steps that found no placement.
#[derive(Clone, Debug)]
pub struct FloorOutcomes {
    pub path: PathOutcome,
    pub boss_vault: Option<BossVaultPlacement>,
    pub detours: Vec<Option<DetourResult>>,
    pub seals: Vec<Option<SealResult>>,
}

#[derive(Clone, Debug)]
pub struct GeneratedFloor {
    pub grid: GridPlan,
    pub plan: FloorPlan,
    pub map: FloorMap,
    pub outcomes: FloorOutcomes,
}

/// Every step of a floor, compiled from a `FloorGenSpec`. Compiling up front surfaces bad
/// configuration before any random draw.
struct FloorSteps {
    pools: PathPools,
    boss_vault: Option<BossVaultStep>,
    detours: Vec<DetourStep>,
    seals: Vec<SealStep>,
}

impl FloorGenSpec {
    pub fn from_ron(text: &str) -> GenResult<Self> {
        ron::de::from_str(text).map_err(|e| GenError::Config(e.to_string()))
    }

    pub fn to_ron(&self) -> GenResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GenError::Config(e.to_string()))
    }

    fn compile(&self) -> GenResult<FloorSteps> {
        if self.grid.width < 1 || self.grid.height < 1 {
            return Err(GenError::Config(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }
        let cell = self.grid.cell_size;
        if cell.x < 1 || cell.y < 1 {
            return Err(GenError::Config(format!(
                "cells must be at least 1x1 tiles, got {}x{}",
                cell.x, cell.y
            )));
        }

        Ok(FloorSteps {
            pools: PathPools {
                rooms: build_pool(&self.rooms)?,
                halls: build_pool(&self.halls)?,
            },
            boss_vault: self.boss_vault.as_ref().map(|b| b.build()).transpose()?,
            detours: self
                .detours
                .iter()
                .map(DetourSpec::build)
                .collect::<GenResult<_>>()?,
            seals: self.seals.iter().map(SealSpec::build).collect::<GenResult<_>>()?,
        })
    }

    fn new_grid(&self) -> GridPlan {
        let mut grid = GridPlan::new(self.grid.width, self.grid.height, self.grid.cell_size);
        grid.set_wrap(self.grid.wrap);

        grid
    }

    /// Runs the grid template until it meets its quota, keeping the fullest attempt if it
    /// never does.
    fn layout_grid(
        &self,
        rng: &mut impl Rng,
        pools: &PathPools,
    ) -> GenResult<(GridPlan, PathOutcome)> {
        let mut best: Option<(GridPlan, PathOutcome)> = None;
        for attempt in 0..MAX_PATH_RETRIES {
            let mut grid = self.new_grid();
            let outcome = self.grid.path.apply_to_plan(rng, &mut grid, pools)?;
            if outcome.is_complete() {
                log::debug!("Grid layout met its quota on attempt {}", attempt);
                return Ok((grid, outcome));
            }
            match &best {
                Some((_, b)) if b.placed >= outcome.placed => (),
                _ => best = Some((grid, outcome)),
            }
        }

        let (grid, outcome) = best.ok_or_else(|| GenError::Config("no grid layout attempts".into()))?;
        log::warn!(
            "Grid layout fell short after {} tries; keeping {} of {} rooms",
            MAX_PATH_RETRIES,
            outcome.placed,
            outcome.target
        );

        Ok((grid, outcome))
    }

    /// Generates the floor with the spec's own seed.
    pub fn generate(&self) -> GenResult<GeneratedFloor> {
        let mut rng = small_rng(self.seed);

        self.generate_with(&mut rng)
    }

    pub fn generate_with(&self, rng: &mut impl Rng) -> GenResult<GeneratedFloor> {
        log::debug!("Generating floor from seed {}", self.seed);
        let steps = self.compile()?;

        let (grid, path) = self.layout_grid(rng, &steps.pools)?;
        let mut plan = grid.to_floor_plan(rng)?;

        let boss_vault = match &steps.boss_vault {
            Some(step) => step.apply(rng, &mut plan)?,
            None => None,
        };

        let mut map = FloorMap::new(plan.size());
        map.set_wrap(plan.wraps());
        plan.draw(&mut map);
        map.set_entrance(choose_entrance(&plan, &map));
        log::debug!("Entrance at {:?}", map.entrance());

        let mut detours = Vec::with_capacity(steps.detours.len());
        for step in steps.detours.iter() {
            detours.push(step.apply(rng, &mut map)?);
        }
        let mut seals = Vec::with_capacity(steps.seals.len());
        for step in steps.seals.iter() {
            seals.push(step.apply(rng, &plan, &mut map)?);
        }

        Ok(GeneratedFloor {
            grid,
            plan,
            map,
            outcomes: FloorOutcomes {
                path,
                boss_vault,
                detours,
                seals,
            },
        })
    }
}

/// The first open tile of the first ordinary room.
fn choose_entrance(plan: &FloorPlan, map: &FloorMap) -> Loc {
    let ordinary = plan.records().iter().find(|r| {
        r.kind == RecordKind::Room && !r.tags.has(TagKind::BossRoom) && !r.tags.has(TagKind::Vault)
    });
    let rect = match ordinary.or_else(|| plan.records().first()) {
        Some(r) => r.rect,
        None => return Loc::ZERO,
    };

    map.free_tiles(rect)
        .first()
        .copied()
        .unwrap_or_else(|| rect.center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_path::GridPathBranch;

    fn small_spec(seed: u64) -> FloorGenSpec {
        FloorGenSpec {
            seed,
            grid: GridSpec {
                width: 4,
                height: 3,
                cell_size: Loc::new(6, 6),
                wrap: false,
                path: GridPathSpec::Branch(GridPathBranch {
                    room_ratio: RandRange::exact(60),
                    branch_ratio: RandRange::exact(30),
                    force_branches: true,
                }),
            },
            rooms: SpawnList::new().with(
                RoomGenSpec::Square {
                    width: RandRange::new(3, 6),
                    height: RandRange::new(3, 6),
                },
                1,
            ),
            halls: SpawnList::new().with(RoomGenSpec::Hall, 1),
            boss_vault: None,
            detours: Vec::new(),
            seals: Vec::new(),
        }
    }

    #[test]
    fn test_plain_floor_is_connected() {
        let floor = small_spec(17).generate().unwrap();

        assert!(floor.outcomes.path.is_complete());
        assert!(floor.plan.is_connected());
        let reach = floor.map.reachable_from_entrance();
        for record in floor.plan.records() {
            if record.kind == RecordKind::Room {
                let tiles = floor.map.free_tiles(record.rect);
                assert!(tiles.iter().any(|t| reach.contains(t)));
            }
        }
    }

    #[test]
    fn test_unknown_tag_surfaces_before_generation() {
        let mut spec = small_spec(1);
        spec.seals.push(SealSpec {
            filters: vec![FilterSpec::HasTag("Treasure".into())],
            mechanism: SealMechanismSpec::Wall,
        });

        assert!(matches!(spec.generate(), Err(GenError::UnknownTag(name)) if name == "Treasure"));
    }

    #[test]
    fn test_ron_round_trip() {
        let spec = small_spec(5);
        let text = spec.to_ron().unwrap();
        let back = FloorGenSpec::from_ron(&text).unwrap();

        assert_eq!(back.seed, 5);
        assert_eq!(back.grid.path, spec.grid.path);
    }

    #[test]
    fn test_bad_ron_is_a_config_error() {
        assert!(matches!(
            FloorGenSpec::from_ron("(seed: \"nope\")"),
            Err(GenError::Config(_))
        ));
    }

    #[test]
    fn test_zero_cell_size_is_a_config_error() {
        let mut spec = small_spec(3);
        spec.grid.cell_size = Loc::new(0, 6);
        assert!(matches!(spec.generate(), Err(GenError::Config(_))));

        spec.grid.cell_size = Loc::new(6, -1);
        assert!(matches!(spec.generate(), Err(GenError::Config(_))));
    }
}
