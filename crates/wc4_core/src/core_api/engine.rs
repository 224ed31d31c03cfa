use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::grid::{TileOwnerGrid, UNOWNED, grid_position};
use crate::patch::{self, FieldWidth};
use crate::registry::{OffsetKey, OffsetRegistry};
use crate::save::types::{
    CITY_LAYOUT, CITY_UNIT_TYPE, COUNTRY_LAYOUT, GameMode, MAX_CURRENCY, MAX_TECH_LEVEL,
    TECH_LEVEL_COUNT,
};
use crate::save::{Document, SaveGame};

use super::types::{
    CityEntry, EditReport, GridPos, OffsetEntry, PlayerEntry, Summary, TileEntry, UnitEntry,
};

const PLAYER: usize = 0;
const PLAYER_OWNER: u8 = 0;
const WEAKENED_HEALTH: u16 = 1;
const U32_WIDTH: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

/// A decoded save file plus the path it was read from.
///
/// Every edit writes straight to the file. Edits that change the file's
/// length re-decode it before returning, so the registry always describes
/// the bytes on disk.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    document: Document,
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn open_path<P: AsRef<Path>>(&self, path: P) -> Result<Session> {
        let path = path.as_ref().to_path_buf();
        let document = Document::open(&path)?;
        debug!(
            path = %path.display(),
            offsets = document.registry.len(),
            "opened save"
        );
        Ok(Session { path, document })
    }
}

impl Session {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> &SaveGame {
        &self.document.save
    }

    pub fn registry(&self) -> &OffsetRegistry {
        &self.document.registry
    }

    pub fn game_mode(&self) -> GameMode {
        self.document.save.header.game_mode
    }

    /// Decode the file again, replacing the model and the registry.
    pub fn reload(&mut self) -> Result<()> {
        self.document = Document::open(&self.path)?;
        Ok(())
    }

    // --- Queries ---

    pub fn summary(&self) -> Summary {
        let save = self.save();
        Summary {
            game_mode: save.header.game_mode,
            map_id: save.header.map_id,
            turn_number: save.header.turn_number,
            map_width: save.header.map_width,
            map_height: save.header.map_height,
            country_count: save.countries.len(),
            city_count: save.cities.len(),
            unit_count: save.units.len(),
            landmine_count: save.header.landmine_count,
            decoded_bytes: self.document.consumed(),
            trailing_bytes: self.document.trailing_len(),
        }
    }

    /// Grid position of a packed coordinate code on this save's map.
    pub fn position_of(&self, code: u16) -> Option<GridPos> {
        let owners = &self.save().tile_owners;
        grid_position(code, owners.width(), owners.height(), self.game_mode())
            .map(|(row, col)| GridPos { row, col })
    }

    pub fn owner_at(&self, pos: GridPos) -> Option<u8> {
        self.save().tile_owners.get(pos.col, pos.row)
    }

    pub fn players(&self) -> Vec<PlayerEntry> {
        let save = self.save();
        save.countries
            .iter()
            .enumerate()
            .map(|(index, country)| PlayerEntry {
                index,
                country_id: country.country_id,
                team_id: country.team_id,
                bot: country.bot_flag != 0,
                currency: country.currency,
                tiles_owned: u8::try_from(index)
                    .map(|owner| save.tile_owners.owned_count(owner))
                    .unwrap_or(0),
            })
            .collect()
    }

    /// Tiles owned by `player`. Unowned tiles and player 0's own tiles are
    /// never listed.
    pub fn player_tiles(&self, player: u8) -> Vec<TileEntry> {
        self.save()
            .tile_owners
            .iter()
            .filter(|&(_, _, owner)| owner == player && owner != UNOWNED && owner != PLAYER_OWNER)
            .map(|(col, row, owner)| TileEntry {
                pos: GridPos { row, col },
                owner,
            })
            .collect()
    }

    pub fn cities(&self) -> Vec<CityEntry> {
        self.save()
            .cities
            .iter()
            .enumerate()
            .map(|(index, city)| {
                let pos = self.position_of(city.coordinate_code);
                CityEntry {
                    index,
                    pos,
                    owner: pos.and_then(|p| self.owner_at(p)),
                    city: city.clone(),
                }
            })
            .collect()
    }

    pub fn units(&self) -> Vec<UnitEntry> {
        self.save()
            .units
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                let pos = self.position_of(unit.coordinate_code);
                UnitEntry {
                    index,
                    pos,
                    owner: pos.and_then(|p| self.owner_at(p)),
                    unit: unit.clone(),
                }
            })
            .collect()
    }

    pub fn generals(&self) -> Vec<UnitEntry> {
        self.units()
            .into_iter()
            .filter(|entry| entry.unit.has_general())
            .collect()
    }

    pub fn offsets(&self) -> Vec<OffsetEntry> {
        self.registry()
            .iter()
            .map(|(key, offset)| OffsetEntry {
                key: key.to_string(),
                offset,
            })
            .collect()
    }

    // --- Raw patches ---

    /// Fixed-width writes never move data, so the registry stays valid;
    /// call `reload` to see the new value in the model.
    pub fn write_at_offset(
        &mut self,
        offset: usize,
        value: u64,
        width: FieldWidth,
    ) -> Result<EditReport> {
        let mut report = EditReport::new("write");
        let patch = patch::write_fixed_width(&self.path, offset, value, width)?;
        report.push_raw(format!("offset {offset}"), value);
        report.patches.push(patch);
        Ok(report)
    }

    pub fn write_at_key(
        &mut self,
        key: OffsetKey,
        value: u64,
        width: FieldWidth,
    ) -> Result<EditReport> {
        let mut report = EditReport::new("write");
        let patch =
            patch::write_fixed_width_at_key(&self.path, self.registry(), key, value, width)?;
        report.push_raw(key.to_string(), value);
        report.patches.push(patch);
        Ok(report)
    }

    // --- Edit recipes ---

    pub fn max_money(&mut self, country: usize) -> Result<EditReport> {
        let current = self
            .save()
            .countries
            .get(country)
            .map(|c| c.currency)
            .ok_or_else(|| {
                CoreError::invariant(format!(
                    "country {country} does not exist, save has {}",
                    self.save().countries.len()
                ))
            })?;
        let start = self.registry().lookup(OffsetKey::CountryStart(country))?;
        let currency_offset = COUNTRY_LAYOUT.offset_of("currency")?;

        let mut report = EditReport::new("max-money");
        for (slot, &old) in current.iter().enumerate() {
            let offset = start + currency_offset + slot * U32_WIDTH;
            let patch = patch::write_fixed_width(
                &self.path,
                offset,
                MAX_CURRENCY as u64,
                FieldWidth::DWord,
            )?;
            report.patches.push(patch);
            report.push(
                format!("country {country} currency {slot}"),
                old as u64,
                MAX_CURRENCY as u64,
            );
            self.document.save.countries[country].currency[slot] = MAX_CURRENCY;
        }
        Ok(report)
    }

    pub fn max_city_tech(&mut self, owner: u8) -> Result<EditReport> {
        let tech_offset = CITY_LAYOUT.offset_of("tech_levels")?;
        let targets: Vec<(usize, [u8; TECH_LEVEL_COUNT])> = self
            .cities()
            .into_iter()
            .filter(|entry| entry.owner == Some(owner))
            .map(|entry| (entry.index, entry.city.tech_levels))
            .collect();

        let mut report = EditReport::new("max-city-tech");
        for (index, levels) in targets {
            let start = self.registry().lookup(OffsetKey::CityStart(index))?;
            for (slot, &old) in levels.iter().enumerate() {
                if old == MAX_TECH_LEVEL {
                    continue;
                }
                let patch = patch::write_fixed_width(
                    &self.path,
                    start + tech_offset + slot,
                    MAX_TECH_LEVEL as u64,
                    FieldWidth::Byte,
                )?;
                report.patches.push(patch);
                report.push(
                    format!("city {index} tech {slot}"),
                    old as u64,
                    MAX_TECH_LEVEL as u64,
                );
                self.document.save.cities[index].tech_levels[slot] = MAX_TECH_LEVEL;
            }
        }
        Ok(report)
    }

    /// Heal every unit on the player's team to full health.
    pub fn restore_allies(&mut self) -> Result<EditReport> {
        let team = self.player_team()?;
        let targets: Vec<(usize, u16, u16)> = self
            .units()
            .into_iter()
            .filter(|entry| self.team_of(entry.owner) == Some(team))
            .filter(|entry| entry.unit.current_health != entry.unit.max_health)
            .map(|entry| {
                (
                    entry.index,
                    entry.unit.current_health,
                    entry.unit.max_health,
                )
            })
            .collect();

        let mut report = EditReport::new("restore-allies");
        for (index, old, new) in targets {
            self.set_unit_health(index, old, new, &mut report)?;
        }
        Ok(report)
    }

    /// Drop every enemy unit to 1 health, and enemy city garrisons to 0.
    pub fn weaken_enemies(&mut self) -> Result<EditReport> {
        let team = self.player_team()?;
        let mut targets = Vec::new();
        for entry in self.units() {
            let Some(enemy_team) = self.team_of(entry.owner) else {
                warn!(
                    unit = entry.index,
                    owner = ?entry.owner,
                    "unit has no valid owner, skipping"
                );
                continue;
            };
            if enemy_team == team {
                continue;
            }
            let new = if entry.unit.unit_type == CITY_UNIT_TYPE {
                0
            } else {
                WEAKENED_HEALTH
            };
            if entry.unit.current_health != new {
                targets.push((entry.index, entry.unit.current_health, new));
            }
        }

        let mut report = EditReport::new("weaken-enemy");
        for (index, old, new) in targets {
            self.set_unit_health(index, old, new, &mut report)?;
        }
        Ok(report)
    }

    /// Put every other country on the player's team.
    pub fn convert_team(&mut self) -> Result<EditReport> {
        let team = self.player_team()?;
        let team_offset = COUNTRY_LAYOUT.offset_of("team_id")?;
        let targets: Vec<(usize, u32)> = self
            .save()
            .countries
            .iter()
            .enumerate()
            .skip(PLAYER + 1)
            .filter(|(_, c)| c.team_id != team)
            .map(|(i, c)| (i, c.team_id))
            .collect();

        let mut report = EditReport::new("convert-team");
        for (index, old) in targets {
            let start = self.registry().lookup(OffsetKey::CountryStart(index))?;
            let patch = patch::write_fixed_width(
                &self.path,
                start + team_offset,
                team as u64,
                FieldWidth::DWord,
            )?;
            report.patches.push(patch);
            report.push(format!("country {index} team"), old as u64, team as u64);
            self.document.save.countries[index].team_id = team;
        }
        Ok(report)
    }

    /// Change the owner of a single tile in place.
    pub fn convert_tile(&mut self, x: usize, y: usize, new_owner: u8) -> Result<EditReport> {
        self.check_owner(new_owner)?;
        let offset = self.registry().lookup(OffsetKey::TileOwner { x, y })?;
        let old = self
            .save()
            .tile_owners
            .get(x, y)
            .ok_or_else(|| CoreError::invariant(format!("tile ({x}, {y}) is off the map")))?;
        if old == UNOWNED {
            return Err(CoreError::invariant(format!(
                "tile ({x}, {y}) has no owner and cannot be converted"
            )));
        }

        let mut report = EditReport::new("convert-tile");
        let patch =
            patch::write_fixed_width(&self.path, offset, new_owner as u64, FieldWidth::Byte)?;
        report.patches.push(patch);
        report.push(tile_label(x, y), old as u64, new_owner as u64);
        self.document.save.tile_owners.set(x, y, new_owner);
        Ok(report)
    }

    /// Hand every tile owned by `old_owner` to `new_owner`.
    pub fn convert_player(&mut self, old_owner: u8, new_owner: u8) -> Result<EditReport> {
        self.check_owner(new_owner)?;
        self.rewrite_tile_owners("convert-player", |owner| {
            (owner == old_owner).then_some(new_owner)
        })
    }

    /// Hand every tile held by the player's allies to the player.
    pub fn convert_all_allies(&mut self) -> Result<EditReport> {
        let team = self.player_team()?;
        let teams: Vec<u32> = self.save().countries.iter().map(|c| c.team_id).collect();
        self.rewrite_tile_owners("convert-all-allies", |owner| {
            let ally = teams.get(owner as usize).is_some_and(|&t| t == team);
            ally.then_some(PLAYER_OWNER)
        })
    }

    /// Hand every owned tile to the player.
    pub fn convert_all_players(&mut self) -> Result<EditReport> {
        self.rewrite_tile_owners("convert-all-players", |_| Some(PLAYER_OWNER))
    }

    // --- Helpers ---

    fn player_team(&self) -> Result<u32> {
        self.save()
            .countries
            .get(PLAYER)
            .map(|c| c.team_id)
            .ok_or_else(|| CoreError::invariant("save has no countries"))
    }

    fn team_of(&self, owner: Option<u8>) -> Option<u32> {
        owner.and_then(|o| self.save().countries.get(o as usize).map(|c| c.team_id))
    }

    fn check_owner(&self, owner: u8) -> Result<()> {
        let count = self.save().countries.len();
        if owner != UNOWNED && owner as usize >= count {
            return Err(CoreError::invariant(format!(
                "owner {owner} is neither {UNOWNED} nor a country index below {count}"
            )));
        }
        Ok(())
    }

    fn set_unit_health(
        &mut self,
        index: usize,
        old: u16,
        new: u16,
        report: &mut EditReport,
    ) -> Result<()> {
        let patch = patch::write_fixed_width_at_key(
            &self.path,
            self.registry(),
            OffsetKey::UnitHealth(index),
            new as u64,
            FieldWidth::Word,
        )?;
        report.patches.push(patch);
        report.push(format!("unit {index} health"), old as u64, new as u64);
        self.document.save.units[index].current_health = new;
        Ok(())
    }

    /// Apply `remap` to every owned tile other than the player's and commit
    /// the grid as one block. `remap` returns the new owner, or `None` to
    /// leave the tile alone.
    fn rewrite_tile_owners(
        &mut self,
        action: &'static str,
        mut remap: impl FnMut(u8) -> Option<u8>,
    ) -> Result<EditReport> {
        let mut grid: TileOwnerGrid = self.save().tile_owners.clone();
        let mut report = EditReport::new(action);

        for (x, y, owner) in self.save().tile_owners.iter() {
            if owner == UNOWNED || owner == PLAYER_OWNER {
                continue;
            }
            let Some(new_owner) = remap(owner) else {
                continue;
            };
            if new_owner == owner {
                continue;
            }
            grid.set(x, y, new_owner);
            report.push(tile_label(x, y), owner as u64, new_owner as u64);
        }

        if report.changed == 0 {
            return Ok(report);
        }

        let shift = patch::replace_region(
            &self.path,
            self.registry(),
            OffsetKey::TileOwnerStart,
            OffsetKey::TileOwnerEnd,
            &grid.to_bytes(),
        )?;
        report.shift = Some(shift);
        self.reload()?;
        Ok(report)
    }
}

fn tile_label(x: usize, y: usize) -> String {
    format!("tile (row {y}, col {x})")
}
