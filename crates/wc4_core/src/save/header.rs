use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::layout::{FieldCursor, Record, RecordLayout};

use super::types::{GameMode, HEADER_LAYOUT};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveHeader {
    pub magic: [u8; 4],
    pub unknown_int1: u32,
    pub map_id: u32,
    pub game_mode: GameMode,
    pub unknown_int2: u32,
    pub unknown_int3: u32,
    pub camera: [f32; 3],
    pub unknown_int4: u32,
    pub turn_number: u32,
    pub unknown_arr2: [u8; 12],
    pub save_timestamp: [u32; 5],
    pub unknown_arr3: [u8; 16],
    /// Only seen non-zero in the last frontier mission. When zero on a
    /// non-conquest save, a campaign block precedes the city-tile grid.
    pub unknown_int7: u32,
    pub unknown_int8: u32,
    pub map_width: u32,
    pub map_height: u32,
    pub country_count: u32,
    pub city_count: u32,
    pub unit_count: u32,
    pub unknown_count1: u32,
    pub unknown_count2: u32,
    pub unknown_arr4: [u8; 8],
    pub turn_count1: u32,
    pub turn_count2: u32,
    pub unknown_count3: u32,
    pub unknown_count4: u32,
    pub unknown_count5: u32,
    pub unknown_count6: u32,
    pub important_city_count: u32,
    pub unknown_arr5: [u8; 4],
    pub unknown_int9: u32,
    /// Compared against the map area to detect the filler around the
    /// tile-owner grid.
    pub unknown_int10: u32,
    pub unknown_arr6: [u8; 12],
    pub landmine_count: u32,
    pub unknown_arr7: [u8; 16],
    pub unknown_count9: u32,
}

impl Record for SaveHeader {
    const LAYOUT: &'static RecordLayout = &HEADER_LAYOUT;

    fn from_fields(f: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            magic: f.opaque("magic")?,
            unknown_int1: f.scalar("unknown_int1")?,
            map_id: f.scalar("map_id")?,
            game_mode: GameMode::from_raw(f.scalar("game_mode")?),
            unknown_int2: f.scalar("unknown_int2")?,
            unknown_int3: f.scalar("unknown_int3")?,
            camera: f.array("camera")?,
            unknown_int4: f.scalar("unknown_int4")?,
            turn_number: f.scalar("turn_number")?,
            unknown_arr2: f.opaque("unknown_arr2")?,
            save_timestamp: f.array("save_timestamp")?,
            unknown_arr3: f.opaque("unknown_arr3")?,
            unknown_int7: f.scalar("unknown_int7")?,
            unknown_int8: f.scalar("unknown_int8")?,
            map_width: f.scalar("map_width")?,
            map_height: f.scalar("map_height")?,
            country_count: f.scalar("country_count")?,
            city_count: f.scalar("city_count")?,
            unit_count: f.scalar("unit_count")?,
            unknown_count1: f.scalar("unknown_count1")?,
            unknown_count2: f.scalar("unknown_count2")?,
            unknown_arr4: f.opaque("unknown_arr4")?,
            turn_count1: f.scalar("turn_count1")?,
            turn_count2: f.scalar("turn_count2")?,
            unknown_count3: f.scalar("unknown_count3")?,
            unknown_count4: f.scalar("unknown_count4")?,
            unknown_count5: f.scalar("unknown_count5")?,
            unknown_count6: f.scalar("unknown_count6")?,
            important_city_count: f.scalar("important_city_count")?,
            unknown_arr5: f.opaque("unknown_arr5")?,
            unknown_int9: f.scalar("unknown_int9")?,
            unknown_int10: f.scalar("unknown_int10")?,
            unknown_arr6: f.opaque("unknown_arr6")?,
            landmine_count: f.scalar("landmine_count")?,
            unknown_arr7: f.opaque("unknown_arr7")?,
            unknown_count9: f.scalar("unknown_count9")?,
        })
    }
}

impl SaveHeader {
    pub fn width(&self) -> usize {
        self.map_width as usize
    }

    pub fn height(&self) -> usize {
        self.map_height as usize
    }

    pub fn map_area(&self) -> Result<usize> {
        self.width().checked_mul(self.height()).ok_or_else(|| {
            CoreError::invariant(format!(
                "map area {}x{} overflows",
                self.map_width, self.map_height
            ))
        })
    }

    /// Campaign saves sometimes carry a per-cell block before the
    /// city-tile grid.
    pub fn has_campaign_block(&self) -> bool {
        !self.game_mode.is_conquest() && self.unknown_int7 == 0
    }

    /// Some maps pad the tile-owner grid when the map area differs from
    /// `unknown_int10`.
    pub fn has_owner_filler(&self) -> Result<bool> {
        Ok(!self.game_mode.is_conquest() && self.map_area()? != self.unknown_int10 as usize)
    }
}
