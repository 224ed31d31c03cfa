use std::fmt;

use serde::Serialize;

use crate::layout::ScalarKind::{F32, I8, U8, U16, U32};
use crate::layout::{Endian, Field, RecordLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameMode {
    Campaign,
    Conquest,
    Frontier,
    Unknown(u32),
}

impl GameMode {
    pub const CAMPAIGN_RAW: u32 = 1;
    pub const CONQUEST_RAW: u32 = 2;
    pub const FRONTIER_RAW: u32 = 6;

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::CAMPAIGN_RAW => Self::Campaign,
            Self::CONQUEST_RAW => Self::Conquest,
            Self::FRONTIER_RAW => Self::Frontier,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u32 {
        match *self {
            Self::Campaign => Self::CAMPAIGN_RAW,
            Self::Conquest => Self::CONQUEST_RAW,
            Self::Frontier => Self::FRONTIER_RAW,
            Self::Unknown(other) => other,
        }
    }

    pub fn is_conquest(&self) -> bool {
        *self == Self::Conquest
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Campaign => f.write_str("Campaign"),
            Self::Conquest => f.write_str("Conquest"),
            Self::Frontier => f.write_str("Frontier"),
            Self::Unknown(v) => write!(f, "Unknown ({v})"),
        }
    }
}

// Opaque block sizes, in file order after the landmines.
pub const CAMPAIGN_CHUNK_SIZE: usize = 16;
pub const UNKNOWN2_SIZE: usize = 16;
pub const UNKNOWN3_SIZE: usize = 44;
pub const UNKNOWN4_SIZE: usize = 80;
pub const UNKNOWN5_SIZE: usize = 8;
pub const IMPORTANT_CITY_SIZE: usize = 4;
pub const UNKNOWN7_SIZE: usize = 16;

// Filler around the tile-owner grid on maps whose area disagrees with
// `unknown_int10`.
pub const PRE_OWNER_FILLER: usize = 8;
pub const POST_OWNER_FILLER: usize = 4;

/// Unit type used for city garrisons; weakening drops these to zero health.
pub const CITY_UNIT_TYPE: u8 = 39;
pub const MAX_CURRENCY: u32 = 9999;
pub const MAX_TECH_LEVEL: u8 = 4;
pub const TECH_LEVEL_COUNT: usize = 6;

pub static HEADER_LAYOUT: RecordLayout = RecordLayout {
    name: "header",
    endian: Endian::Little,
    fields: &[
        Field::opaque("magic", 4),
        Field::scalar("unknown_int1", U32),
        Field::scalar("map_id", U32),
        Field::scalar("game_mode", U32),
        Field::scalar("unknown_int2", U32),
        Field::scalar("unknown_int3", U32),
        Field::array("camera", F32, 3),
        Field::scalar("unknown_int4", U32),
        Field::scalar("turn_number", U32),
        Field::opaque("unknown_arr2", 12),
        Field::array("save_timestamp", U32, 5),
        Field::opaque("unknown_arr3", 16),
        Field::scalar("unknown_int7", U32),
        Field::scalar("unknown_int8", U32),
        Field::scalar("map_width", U32),
        Field::scalar("map_height", U32),
        Field::scalar("country_count", U32),
        Field::scalar("city_count", U32),
        Field::scalar("unit_count", U32),
        Field::scalar("unknown_count1", U32),
        Field::scalar("unknown_count2", U32),
        Field::opaque("unknown_arr4", 8),
        Field::scalar("turn_count1", U32),
        Field::scalar("turn_count2", U32),
        Field::scalar("unknown_count3", U32),
        Field::scalar("unknown_count4", U32),
        Field::scalar("unknown_count5", U32),
        Field::scalar("unknown_count6", U32),
        Field::scalar("important_city_count", U32),
        Field::opaque("unknown_arr5", 4),
        Field::scalar("unknown_int9", U32),
        Field::scalar("unknown_int10", U32),
        Field::opaque("unknown_arr6", 12),
        Field::scalar("landmine_count", U32),
        Field::opaque("unknown_arr7", 16),
        Field::scalar("unknown_count9", U32),
    ],
};

pub static COUNTRY_LAYOUT: RecordLayout = RecordLayout {
    name: "country",
    endian: Endian::Little,
    fields: &[
        Field::scalar("turn_order", U32),
        Field::scalar("country_id", U32),
        Field::array("currency", U32, 3),
        Field::scalar("bot_flag", U32),
        Field::scalar("team_id", U32),
        Field::opaque("unknown_arr2", 4),
        Field::opaque("unknown_colors", 8),
        Field::opaque("primary_color", 4),
        Field::opaque("unknown_arr4", 16),
        Field::opaque("unknown_arr5", 460),
    ],
};

pub static CITY_LAYOUT: RecordLayout = RecordLayout {
    name: "city",
    endian: Endian::Little,
    fields: &[
        Field::scalar("coordinate_code", U16),
        Field::scalar("city_id", U16),
        Field::scalar("building_type", U8),
        Field::scalar("appearance", U8),
        Field::scalar("unknown_byte1", U8),
        Field::scalar("wonders", U8),
        Field::opaque("unknown_arr2", 6),
        Field::opaque("unknown_arr3", 8),
        Field::scalar("anti_air_weapon_type", U8),
        Field::scalar("anti_air_range", U8),
        Field::array("tech_levels", U8, TECH_LEVEL_COUNT),
        Field::opaque("unknown_arr4", 2),
    ],
};

pub static UNIT_LAYOUT: RecordLayout = RecordLayout {
    name: "unit",
    endian: Endian::Little,
    fields: &[
        Field::scalar("coordinate_code", U16),
        Field::scalar("unit_type", U8),
        Field::scalar("level", U8),
        Field::scalar("personnel", U8),
        Field::scalar("direction", U8),
        Field::scalar("movement", U16),
        Field::scalar("experience", U16),
        Field::scalar("unknown_health", U16),
        Field::scalar("current_health", U16),
        Field::scalar("max_health", U16),
        Field::scalar("general_id", U16),
        Field::scalar("general_military_rank", U8),
        Field::scalar("general_title", U8),
        Field::opaque("general_badges", 3),
        Field::array("general_skill_levels", U8, 5),
        Field::opaque("unknown_arr5", 12),
        Field::scalar("morale_value", I8),
        Field::scalar("morale_turns_left", U16),
        Field::opaque("unknown_arr6", 5),
    ],
};

pub static LANDMINE_LAYOUT: RecordLayout = RecordLayout {
    name: "landmine",
    endian: Endian::Little,
    fields: &[
        Field::scalar("coordinate_code", U16),
        Field::scalar("owner", U16),
        Field::opaque("unknown_arr1", 2),
        Field::scalar("health", U16),
        Field::opaque("unknown_arr2", 4),
    ],
};

pub const HEADER_SIZE: usize = HEADER_LAYOUT.size();
pub const COUNTRY_SIZE: usize = COUNTRY_LAYOUT.size();
pub const CITY_SIZE: usize = CITY_LAYOUT.size();
pub const UNIT_SIZE: usize = UNIT_LAYOUT.size();
pub const LANDMINE_SIZE: usize = LANDMINE_LAYOUT.size();
