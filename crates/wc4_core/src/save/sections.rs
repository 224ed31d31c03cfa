use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{CoreError, Result};
use crate::grid::{CityTileGrid, Grid, TileOwnerGrid};
use crate::layout::{FieldCursor, Record, RecordLayout};
use crate::reader::LittleEndianReader;
use crate::registry::{OffsetKey, OffsetRegistry};

use super::types::{
    CITY_LAYOUT, COUNTRY_LAYOUT, LANDMINE_LAYOUT, TECH_LEVEL_COUNT, UNIT_LAYOUT,
};

// --- Records ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub turn_order: u32,
    pub country_id: u32,
    pub currency: [u32; 3],
    pub bot_flag: u32,
    pub team_id: u32,
    pub unknown_arr2: [u8; 4],
    pub unknown_colors: [u8; 8],
    pub primary_color: [u8; 4],
    pub unknown_arr4: [u8; 16],
    #[serde(skip)]
    pub unknown_arr5: [u8; 460],
}

impl Record for Country {
    const LAYOUT: &'static RecordLayout = &COUNTRY_LAYOUT;

    fn from_fields(f: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            turn_order: f.scalar("turn_order")?,
            country_id: f.scalar("country_id")?,
            currency: f.array("currency")?,
            bot_flag: f.scalar("bot_flag")?,
            team_id: f.scalar("team_id")?,
            unknown_arr2: f.opaque("unknown_arr2")?,
            unknown_colors: f.opaque("unknown_colors")?,
            primary_color: f.opaque("primary_color")?,
            unknown_arr4: f.opaque("unknown_arr4")?,
            unknown_arr5: f.opaque("unknown_arr5")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct City {
    pub coordinate_code: u16,
    pub city_id: u16,
    pub building_type: u8,
    pub appearance: u8,
    pub unknown_byte1: u8,
    pub wonders: u8,
    pub unknown_arr2: [u8; 6],
    pub unknown_arr3: [u8; 8],
    pub anti_air_weapon_type: u8,
    pub anti_air_range: u8,
    pub tech_levels: [u8; TECH_LEVEL_COUNT],
    pub unknown_arr4: [u8; 2],
}

impl Record for City {
    const LAYOUT: &'static RecordLayout = &CITY_LAYOUT;

    fn from_fields(f: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            coordinate_code: f.scalar("coordinate_code")?,
            city_id: f.scalar("city_id")?,
            building_type: f.scalar("building_type")?,
            appearance: f.scalar("appearance")?,
            unknown_byte1: f.scalar("unknown_byte1")?,
            wonders: f.scalar("wonders")?,
            unknown_arr2: f.opaque("unknown_arr2")?,
            unknown_arr3: f.opaque("unknown_arr3")?,
            anti_air_weapon_type: f.scalar("anti_air_weapon_type")?,
            anti_air_range: f.scalar("anti_air_range")?,
            tech_levels: f.array("tech_levels")?,
            unknown_arr4: f.opaque("unknown_arr4")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub coordinate_code: u16,
    pub unit_type: u8,
    pub level: u8,
    pub personnel: u8,
    /// 0 faces left, 1 faces right.
    pub direction: u8,
    pub movement: u16,
    pub experience: u16,
    pub unknown_health: u16,
    pub current_health: u16,
    pub max_health: u16,
    pub general_id: u16,
    pub general_military_rank: u8,
    pub general_title: u8,
    pub general_badges: [u8; 3],
    pub general_skill_levels: [u8; 5],
    pub unknown_arr5: [u8; 12],
    pub morale_value: i8,
    pub morale_turns_left: u16,
    pub unknown_arr6: [u8; 5],
}

impl Record for Unit {
    const LAYOUT: &'static RecordLayout = &UNIT_LAYOUT;

    fn from_fields(f: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            coordinate_code: f.scalar("coordinate_code")?,
            unit_type: f.scalar("unit_type")?,
            level: f.scalar("level")?,
            personnel: f.scalar("personnel")?,
            direction: f.scalar("direction")?,
            movement: f.scalar("movement")?,
            experience: f.scalar("experience")?,
            unknown_health: f.scalar("unknown_health")?,
            current_health: f.scalar("current_health")?,
            max_health: f.scalar("max_health")?,
            general_id: f.scalar("general_id")?,
            general_military_rank: f.scalar("general_military_rank")?,
            general_title: f.scalar("general_title")?,
            general_badges: f.opaque("general_badges")?,
            general_skill_levels: f.array("general_skill_levels")?,
            unknown_arr5: f.opaque("unknown_arr5")?,
            morale_value: f.scalar("morale_value")?,
            morale_turns_left: f.scalar("morale_turns_left")?,
            unknown_arr6: f.opaque("unknown_arr6")?,
        })
    }
}

impl Unit {
    pub fn has_general(&self) -> bool {
        self.general_id > 0
    }
}

/// Decoded only to keep the stream aligned; never part of the model.
#[derive(Debug)]
struct Landmine {
    coordinate_code: u16,
    owner: u16,
    health: u16,
}

impl Record for Landmine {
    const LAYOUT: &'static RecordLayout = &LANDMINE_LAYOUT;

    fn from_fields(f: &mut FieldCursor<'_>) -> Result<Self> {
        let coordinate_code = f.scalar("coordinate_code")?;
        let owner = f.scalar("owner")?;
        f.opaque::<2>("unknown_arr1")?;
        let health = f.scalar("health")?;
        f.opaque::<4>("unknown_arr2")?;
        Ok(Self {
            coordinate_code,
            owner,
            health,
        })
    }
}

// --- Generic record decoding ---

pub fn decode_record<T: Record>(r: &mut LittleEndianReader<'_>) -> Result<T> {
    let bytes = r.read_bytes(T::LAYOUT.size())?;
    let mut fields = FieldCursor::new(T::LAYOUT, bytes)?;
    let record = T::from_fields(&mut fields)?;
    fields.finish()?;
    Ok(record)
}

/// Decode `count` consecutive records, calling `on_start(index, offset)`
/// before each one.
pub fn decode_records<T: Record>(
    r: &mut LittleEndianReader<'_>,
    count: usize,
    mut on_start: impl FnMut(usize, usize),
) -> Result<Vec<T>> {
    ensure_block_available(r, count, T::LAYOUT.size(), T::LAYOUT.name)?;

    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        on_start(index, r.position());
        out.push(decode_record(r)?);
    }
    Ok(out)
}

fn ensure_block_available(
    r: &LittleEndianReader<'_>,
    count: usize,
    element_size: usize,
    label: &str,
) -> Result<()> {
    let total = count.checked_mul(element_size).ok_or_else(|| {
        CoreError::invariant(format!(
            "{label} block size overflows: {count} x {element_size} bytes"
        ))
    })?;
    r.ensure_available(total)
}

// --- Sections ---

pub fn decode_countries(
    r: &mut LittleEndianReader<'_>,
    count: usize,
    mut registry: Option<&mut OffsetRegistry>,
) -> Result<Vec<Country>> {
    let countries: Vec<Country> = decode_records(r, count, |index, offset| {
        if let Some(reg) = registry.as_deref_mut() {
            reg.record(OffsetKey::CountryStart(index), offset);
        }
    })?;
    for (index, country) in countries.iter().enumerate() {
        trace!(
            index,
            country_id = country.country_id,
            team_id = country.team_id,
            "country"
        );
    }
    Ok(countries)
}

pub fn decode_cities(
    r: &mut LittleEndianReader<'_>,
    count: usize,
    mut registry: Option<&mut OffsetRegistry>,
) -> Result<Vec<City>> {
    let cities: Vec<City> = decode_records(r, count, |index, offset| {
        if let Some(reg) = registry.as_deref_mut() {
            reg.record(OffsetKey::CityStart(index), offset);
        }
    })?;

    // Only the first city may sit on coordinate 0.
    if let Some(index) = cities
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(i, city)| (city.coordinate_code == 0).then_some(i))
    {
        return Err(CoreError::invariant(format!(
            "city {index} has coordinate code 0"
        )));
    }
    Ok(cities)
}

pub fn decode_units(
    r: &mut LittleEndianReader<'_>,
    count: usize,
    mut registry: Option<&mut OffsetRegistry>,
) -> Result<Vec<Unit>> {
    let health_offset = UNIT_LAYOUT.offset_of("current_health")?;
    let units: Vec<Unit> = decode_records(r, count, |index, offset| {
        if let Some(reg) = registry.as_deref_mut() {
            reg.record(OffsetKey::UnitHealth(index), offset + health_offset);
        }
    })?;
    for (index, unit) in units.iter().enumerate() {
        trace!(
            index,
            unit_type = unit.unit_type,
            coordinate = unit.coordinate_code,
            health = unit.current_health,
            "unit"
        );
    }
    Ok(units)
}

pub fn skip_landmines(r: &mut LittleEndianReader<'_>, count: usize) -> Result<()> {
    let mines: Vec<Landmine> = decode_records(r, count, |_, _| {})?;
    for mine in &mines {
        trace!(
            coordinate = mine.coordinate_code,
            owner = mine.owner,
            health = mine.health,
            "landmine"
        );
    }
    Ok(())
}

pub fn decode_city_tiles(
    r: &mut LittleEndianReader<'_>,
    width: usize,
    height: usize,
) -> Result<CityTileGrid> {
    let area = checked_area(width, height)?;
    ensure_block_available(r, area, 2, "city tile")?;

    let mut cells = Vec::with_capacity(area);
    for _ in 0..area {
        cells.push(r.read_u16()?);
    }
    Grid::from_cells(width, height, cells)
}

/// Decode the tile-owner grid, recording the offset of every cell.
pub fn decode_tile_owners(
    r: &mut LittleEndianReader<'_>,
    width: usize,
    height: usize,
    mut registry: Option<&mut OffsetRegistry>,
) -> Result<TileOwnerGrid> {
    let area = checked_area(width, height)?;
    ensure_block_available(r, area, 1, "tile owner")?;

    let mut cells = Vec::with_capacity(area);
    for y in 0..height {
        for x in 0..width {
            if let Some(reg) = registry.as_deref_mut() {
                reg.record(OffsetKey::TileOwner { x, y }, r.position());
            }
            cells.push(r.read_u8()?);
        }
    }
    Grid::from_cells(width, height, cells)
}

/// Consume `count` opaque blocks of `size` bytes each.
pub fn skip_blocks(
    r: &mut LittleEndianReader<'_>,
    count: usize,
    size: usize,
    label: &str,
) -> Result<()> {
    ensure_block_available(r, count, size, label)?;
    let start = r.position();
    r.skip(count * size)?;
    debug!(label, count, size, start, "skipped opaque blocks");
    Ok(())
}

fn checked_area(width: usize, height: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .ok_or_else(|| CoreError::invariant(format!("map area {width}x{height} overflows")))
}
