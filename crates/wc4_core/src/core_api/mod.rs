mod engine;
mod types;

pub use crate::error::{CoreError, CoreErrorCode};
pub use engine::{Engine, Session};
pub use types::{
    CityEntry, EditChange, EditReport, GridPos, OffsetEntry, PlayerEntry, Summary, TileEntry,
    UnitEntry,
};
