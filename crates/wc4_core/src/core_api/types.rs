use serde::Serialize;

use crate::patch::{PatchReport, ShiftReport};
use crate::save::sections::{City, Unit};
use crate::save::types::GameMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub game_mode: GameMode,
    pub map_id: u32,
    pub turn_number: u32,
    pub map_width: u32,
    pub map_height: u32,
    pub country_count: usize,
    pub city_count: usize,
    pub unit_count: usize,
    pub landmine_count: u32,
    pub decoded_bytes: usize,
    pub trailing_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerEntry {
    pub index: usize,
    pub country_id: u32,
    pub team_id: u32,
    pub bot: bool,
    pub currency: [u32; 3],
    pub tiles_owned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileEntry {
    pub pos: GridPos,
    pub owner: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityEntry {
    pub index: usize,
    pub pos: Option<GridPos>,
    pub owner: Option<u8>,
    pub city: City,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitEntry {
    pub index: usize,
    pub pos: Option<GridPos>,
    pub owner: Option<u8>,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetEntry {
    pub key: String,
    pub offset: usize,
}

/// One logical value an edit changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditChange {
    pub target: String,
    /// `None` for raw writes, where the previous value was never decoded.
    pub old: Option<u64>,
    pub new: u64,
}

/// What an edit did to the file, for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditReport {
    pub action: &'static str,
    pub changed: usize,
    pub changes: Vec<EditChange>,
    pub patches: Vec<PatchReport>,
    pub shift: Option<ShiftReport>,
}

impl EditReport {
    pub(crate) fn new(action: &'static str) -> Self {
        Self {
            action,
            changed: 0,
            changes: Vec::new(),
            patches: Vec::new(),
            shift: None,
        }
    }

    pub(crate) fn push(&mut self, target: String, old: u64, new: u64) {
        self.changed += 1;
        self.changes.push(EditChange {
            target,
            old: Some(old),
            new,
        });
    }

    pub(crate) fn push_raw(&mut self, target: String, new: u64) {
        self.changed += 1;
        self.changes.push(EditChange {
            target,
            old: None,
            new,
        });
    }
}
