#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use wc4_core::layout::RecordLayout;
use wc4_core::save::types::{
    CAMPAIGN_CHUNK_SIZE, CITY_LAYOUT, CITY_SIZE, COUNTRY_LAYOUT, COUNTRY_SIZE, GameMode,
    HEADER_LAYOUT, HEADER_SIZE, IMPORTANT_CITY_SIZE, LANDMINE_SIZE, POST_OWNER_FILLER,
    PRE_OWNER_FILLER, UNIT_LAYOUT, UNIT_SIZE, UNKNOWN2_SIZE, UNKNOWN3_SIZE, UNKNOWN4_SIZE,
    UNKNOWN5_SIZE, UNKNOWN7_SIZE,
};

pub const UNOWNED: u8 = 255;

#[derive(Debug, Clone)]
pub struct CountrySpec {
    pub country_id: u32,
    pub team_id: u32,
    pub currency: [u32; 3],
    pub bot: bool,
}

#[derive(Debug, Clone)]
pub struct CitySpec {
    pub coordinate_code: u16,
    pub city_id: u16,
    pub tech_levels: [u8; 6],
}

#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub coordinate_code: u16,
    pub unit_type: u8,
    pub current_health: u16,
    pub max_health: u16,
    pub general_id: u16,
}

/// Emits byte-exact saves for any header configuration.
#[derive(Debug, Clone)]
pub struct SaveBuilder {
    pub mode: u32,
    pub width: u32,
    pub height: u32,
    pub unknown_int7: u32,
    pub unknown_int10: Option<u32>,
    pub countries: Vec<CountrySpec>,
    pub city_tiles: Vec<u16>,
    pub owners: Vec<u8>,
    pub cities: Vec<CitySpec>,
    pub units: Vec<UnitSpec>,
    pub landmines: u32,
    pub trailing_counts: Vec<(&'static str, u32)>,
    pub tail: Vec<u8>,
}

impl SaveBuilder {
    pub fn new(mode: GameMode, width: u32, height: u32) -> Self {
        let area = (width * height) as usize;
        Self {
            mode: mode.raw(),
            width,
            height,
            unknown_int7: 0,
            unknown_int10: None,
            countries: Vec::new(),
            city_tiles: (0..area as u16).collect(),
            owners: vec![UNOWNED; area],
            cities: Vec::new(),
            units: Vec::new(),
            landmines: 0,
            trailing_counts: Vec::new(),
            tail: Vec::new(),
        }
    }

    pub fn conquest(width: u32, height: u32) -> Self {
        Self::new(GameMode::Conquest, width, height)
    }

    pub fn country(mut self, team_id: u32) -> Self {
        let index = self.countries.len() as u32;
        self.countries.push(CountrySpec {
            country_id: 100 + index,
            team_id,
            currency: [100 * (index + 1), 20, 3],
            bot: index > 0,
        });
        self
    }

    pub fn owner(mut self, x: usize, y: usize, owner: u8) -> Self {
        let width = self.width as usize;
        self.owners[y * width + x] = owner;
        self
    }

    pub fn city(mut self, coordinate_code: u16, tech_levels: [u8; 6]) -> Self {
        let city_id = self.cities.len() as u16 + 1;
        self.cities.push(CitySpec {
            coordinate_code,
            city_id,
            tech_levels,
        });
        self
    }

    pub fn unit(mut self, coordinate_code: u16, unit_type: u8, health: u16, max: u16) -> Self {
        self.units.push(UnitSpec {
            coordinate_code,
            unit_type,
            current_health: health,
            max_health: max,
            general_id: 0,
        });
        self
    }

    pub fn general(mut self, general_id: u16) -> Self {
        if let Some(unit) = self.units.last_mut() {
            unit.general_id = general_id;
        }
        self
    }

    pub fn landmines(mut self, count: u32) -> Self {
        self.landmines = count;
        self
    }

    /// Set one of the header counts that size the trailing opaque blocks.
    pub fn trailing(mut self, field: &'static str, count: u32) -> Self {
        self.trailing_counts.push((field, count));
        self
    }

    pub fn tail(mut self, bytes: &[u8]) -> Self {
        self.tail.extend_from_slice(bytes);
        self
    }

    /// Packed coordinate code for `(row, col)` as the game stores it.
    pub fn code(&self, row: usize, col: usize) -> u16 {
        let row = if self.mode == GameMode::Conquest.raw() {
            row + 2
        } else {
            row
        };
        (row * self.width as usize + col) as u16
    }

    pub fn area(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn has_campaign_block(&self) -> bool {
        self.mode != GameMode::Conquest.raw() && self.unknown_int7 == 0
    }

    pub fn has_owner_filler(&self) -> bool {
        self.mode != GameMode::Conquest.raw() && self.unknown_int10() as usize != self.area()
    }

    fn unknown_int10(&self) -> u32 {
        self.unknown_int10.unwrap_or(self.width * self.height)
    }

    /// Offset of the first tile-owner byte in the emitted file.
    pub fn tile_owner_start(&self) -> usize {
        let mut offset = HEADER_SIZE + self.countries.len() * COUNTRY_SIZE;
        if self.has_campaign_block() {
            offset += self.area() * CAMPAIGN_CHUNK_SIZE;
        }
        offset += self.area() * 2;
        if self.has_owner_filler() {
            offset += PRE_OWNER_FILLER;
        }
        offset
    }

    /// Length of everything the decoder should consume.
    pub fn decoded_len(&self) -> usize {
        let mut len = self.tile_owner_start() + self.area();
        if self.has_owner_filler() {
            len += POST_OWNER_FILLER;
        }
        len += self.cities.len() * CITY_SIZE;
        len += self.units.len() * UNIT_SIZE;
        len += self.landmines as usize * LANDMINE_SIZE;
        for &(field, count) in &self.trailing_counts {
            len += count as usize * trailing_block_size(field);
        }
        len
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header();
        for country in &self.countries {
            out.extend(country_bytes(country));
        }
        if self.has_campaign_block() {
            out.extend(std::iter::repeat_n(0xC4, self.area() * CAMPAIGN_CHUNK_SIZE));
        }
        for tile in &self.city_tiles {
            out.extend(tile.to_le_bytes());
        }
        if self.has_owner_filler() {
            out.extend([0xF1; PRE_OWNER_FILLER]);
        }
        out.extend(&self.owners);
        if self.has_owner_filler() {
            out.extend([0xF2; POST_OWNER_FILLER]);
        }
        for city in &self.cities {
            out.extend(city_bytes(city));
        }
        for unit in &self.units {
            out.extend(unit_bytes(unit));
        }
        out.extend(std::iter::repeat_n(0x3A, self.landmines as usize * LANDMINE_SIZE));
        for &(field, count) in &self.trailing_counts {
            out.extend(std::iter::repeat_n(
                0x7B,
                count as usize * trailing_block_size(field),
            ));
        }
        out.extend(&self.tail);
        assert_eq!(out.len(), self.decoded_len() + self.tail.len());
        out
    }

    pub fn write_to(&self, path: &Path) {
        fs::write(path, self.build()).expect("failed to write synthesized save");
    }

    fn header(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[..4].copy_from_slice(b"WC4S");
        put_u32(&mut buf, &HEADER_LAYOUT, "map_id", 17);
        put_u32(&mut buf, &HEADER_LAYOUT, "game_mode", self.mode);
        put_u32(&mut buf, &HEADER_LAYOUT, "turn_number", 12);
        put_u32(&mut buf, &HEADER_LAYOUT, "unknown_int7", self.unknown_int7);
        put_u32(&mut buf, &HEADER_LAYOUT, "map_width", self.width);
        put_u32(&mut buf, &HEADER_LAYOUT, "map_height", self.height);
        put_u32(
            &mut buf,
            &HEADER_LAYOUT,
            "country_count",
            self.countries.len() as u32,
        );
        put_u32(&mut buf, &HEADER_LAYOUT, "city_count", self.cities.len() as u32);
        put_u32(&mut buf, &HEADER_LAYOUT, "unit_count", self.units.len() as u32);
        put_u32(&mut buf, &HEADER_LAYOUT, "unknown_int10", self.unknown_int10());
        put_u32(&mut buf, &HEADER_LAYOUT, "landmine_count", self.landmines);
        for &(field, count) in &self.trailing_counts {
            put_u32(&mut buf, &HEADER_LAYOUT, field, count);
        }
        buf
    }
}

fn trailing_block_size(field: &str) -> usize {
    match field {
        "unknown_count1" => UNKNOWN2_SIZE,
        "unknown_count2" => UNKNOWN3_SIZE,
        "unknown_count3" => UNKNOWN4_SIZE,
        "unknown_count5" | "unknown_count6" => UNKNOWN5_SIZE,
        "important_city_count" => IMPORTANT_CITY_SIZE,
        "unknown_count9" => UNKNOWN7_SIZE,
        other => panic!("{other} does not size a trailing block"),
    }
}

fn country_bytes(country: &CountrySpec) -> Vec<u8> {
    let mut buf = vec![0u8; COUNTRY_SIZE];
    put_u32(&mut buf, &COUNTRY_LAYOUT, "country_id", country.country_id);
    let currency = COUNTRY_LAYOUT.offset_of("currency").expect("currency");
    for (slot, value) in country.currency.iter().enumerate() {
        let at = currency + slot * 4;
        buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
    put_u32(&mut buf, &COUNTRY_LAYOUT, "bot_flag", country.bot as u32);
    put_u32(&mut buf, &COUNTRY_LAYOUT, "team_id", country.team_id);
    buf
}

fn city_bytes(city: &CitySpec) -> Vec<u8> {
    let mut buf = vec![0u8; CITY_SIZE];
    put_u16(&mut buf, &CITY_LAYOUT, "coordinate_code", city.coordinate_code);
    put_u16(&mut buf, &CITY_LAYOUT, "city_id", city.city_id);
    let tech = CITY_LAYOUT.offset_of("tech_levels").expect("tech_levels");
    buf[tech..tech + 6].copy_from_slice(&city.tech_levels);
    buf
}

fn unit_bytes(unit: &UnitSpec) -> Vec<u8> {
    let mut buf = vec![0u8; UNIT_SIZE];
    put_u16(&mut buf, &UNIT_LAYOUT, "coordinate_code", unit.coordinate_code);
    let unit_type = UNIT_LAYOUT.offset_of("unit_type").expect("unit_type");
    buf[unit_type] = unit.unit_type;
    put_u16(&mut buf, &UNIT_LAYOUT, "current_health", unit.current_health);
    put_u16(&mut buf, &UNIT_LAYOUT, "max_health", unit.max_health);
    put_u16(&mut buf, &UNIT_LAYOUT, "general_id", unit.general_id);
    buf
}

fn put_u32(buf: &mut [u8], layout: &RecordLayout, field: &str, value: u32) {
    let at = layout.offset_of(field).expect("field in layout");
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u16(buf: &mut [u8], layout: &RecordLayout, field: &str, value: u16) {
    let at = layout.offset_of(field).expect("field in layout");
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn temp_save_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}.sav", std::process::id(), nanos))
}

/// The save most recipe tests run against: a 4x4 conquest map with two
/// teams.
///
/// Countries 0 and 1 share team 1, country 2 is on team 2. Row 0 holds
/// `[0, 1, 1, -]`, row 1 holds `[2, 2, -, -]`, the rest is unowned.
pub fn skirmish() -> SaveBuilder {
    let base = SaveBuilder::conquest(4, 4)
        .country(1)
        .country(1)
        .country(2)
        .owner(0, 0, 0)
        .owner(1, 0, 1)
        .owner(2, 0, 1)
        .owner(0, 1, 2)
        .owner(1, 1, 2);
    let city_a = base.code(0, 1);
    let city_b = base.code(1, 0);
    let u0 = base.code(0, 0);
    let u1 = base.code(0, 2);
    let u2 = base.code(1, 1);
    let u4 = base.code(3, 3);
    base.city(city_a, [1, 2, 3, 4, 0, 0])
        .city(city_b, [0; 6])
        .unit(u0, 5, 30, 100)
        .unit(u1, 5, 50, 100)
        .general(7)
        .unit(u2, 5, 80, 100)
        .unit(city_b, 39, 40, 40)
        .unit(u4, 5, 10, 100)
}
