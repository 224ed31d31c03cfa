pub mod header;
pub mod sections;
pub mod types;

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::grid::{CityTileGrid, TileOwnerGrid};
use crate::reader::LittleEndianReader;
use crate::registry::{OffsetKey, OffsetRegistry};
use header::SaveHeader;
use sections::{
    City, Country, Unit, decode_cities, decode_city_tiles, decode_countries, decode_record,
    decode_tile_owners, decode_units, skip_blocks, skip_landmines,
};
use types::{
    CAMPAIGN_CHUNK_SIZE, IMPORTANT_CITY_SIZE, POST_OWNER_FILLER, PRE_OWNER_FILLER, UNKNOWN2_SIZE,
    UNKNOWN3_SIZE, UNKNOWN4_SIZE, UNKNOWN5_SIZE, UNKNOWN7_SIZE,
};

/// The decoded, addressable part of a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveGame {
    pub header: SaveHeader,
    pub countries: Vec<Country>,
    pub city_tiles: CityTileGrid,
    pub tile_owners: TileOwnerGrid,
    pub cities: Vec<City>,
    pub units: Vec<Unit>,
}

/// A decoded save plus the offsets needed to patch it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub save: SaveGame,
    pub registry: OffsetRegistry,
    consumed: usize,
    file_len: usize,
}

impl SaveGame {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = LittleEndianReader::new(bytes);
        parse_internal(&mut r, None)
    }
}

impl Document {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut registry = OffsetRegistry::new();
        let mut r = LittleEndianReader::new(bytes);
        let save = parse_internal(&mut r, Some(&mut registry))?;

        Ok(Self {
            save,
            registry,
            consumed: r.position(),
            file_len: bytes.len(),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| CoreError::io(format!("failed to read {}", path.display()), e))?;
        Self::parse(&bytes)
    }

    /// Bytes the decoder walked over.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes after the last decoded block; left untouched by every patch.
    pub fn trailing_len(&self) -> usize {
        self.file_len - self.consumed
    }
}

fn parse_internal(
    r: &mut LittleEndianReader<'_>,
    mut registry: Option<&mut OffsetRegistry>,
) -> Result<SaveGame> {
    let header: SaveHeader = decode_record(r)?;
    let width = header.width();
    let height = header.height();
    let area = header.map_area()?;
    debug!(
        mode = %header.game_mode,
        width,
        height,
        countries = header.country_count,
        cities = header.city_count,
        units = header.unit_count,
        "decoded header"
    );

    let countries = decode_countries(r, header.country_count as usize, registry.as_deref_mut())?;
    debug!(count = countries.len(), end = r.position(), "decoded countries");

    if header.has_campaign_block() {
        skip_blocks(r, area, CAMPAIGN_CHUNK_SIZE, "campaign block")?;
    }

    let city_tiles = decode_city_tiles(r, width, height)?;
    debug!(end = r.position(), "decoded city tile grid");

    let owner_filler = header.has_owner_filler()?;
    if owner_filler {
        skip_blocks(r, 1, PRE_OWNER_FILLER, "pre-owner filler")?;
    }

    record(&mut registry, OffsetKey::TileOwnerStart, r.position());
    let tile_owners = decode_tile_owners(r, width, height, registry.as_deref_mut())?;
    record(&mut registry, OffsetKey::TileOwnerEnd, r.position());
    debug!(end = r.position(), "decoded tile owner grid");

    if owner_filler {
        skip_blocks(r, 1, POST_OWNER_FILLER, "post-owner filler")?;
    }

    let cities = decode_cities(r, header.city_count as usize, registry.as_deref_mut())?;
    debug!(count = cities.len(), end = r.position(), "decoded cities");

    let units = decode_units(r, header.unit_count as usize, registry.as_deref_mut())?;
    debug!(count = units.len(), end = r.position(), "decoded units");

    skip_landmines(r, header.landmine_count as usize)?;

    let trailing_blocks = [
        (header.unknown_count1, UNKNOWN2_SIZE, "unknown block 2"),
        (header.unknown_count2, UNKNOWN3_SIZE, "unknown block 3"),
        (header.unknown_count3, UNKNOWN4_SIZE, "unknown block 4"),
        (header.unknown_count5, UNKNOWN5_SIZE, "unknown block 5"),
        (header.unknown_count6, UNKNOWN5_SIZE, "unknown block 6"),
        (
            header.important_city_count,
            IMPORTANT_CITY_SIZE,
            "important cities",
        ),
        (header.unknown_count9, UNKNOWN7_SIZE, "unknown block 7"),
    ];
    for (count, size, label) in trailing_blocks {
        skip_blocks(r, count as usize, size, label)?;
    }
    debug!(end = r.position(), len = r.len(), "decode complete");

    Ok(SaveGame {
        header,
        countries,
        city_tiles,
        tile_owners,
        cities,
        units,
    })
}

fn record(registry: &mut Option<&mut OffsetRegistry>, key: OffsetKey, offset: usize) {
    if let Some(reg) = registry.as_deref_mut() {
        reg.record(key, offset);
    }
}
