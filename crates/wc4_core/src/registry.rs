use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreErrorCode, Result};

/// Names one addressable byte position recorded while decoding a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OffsetKey {
    CountryStart(usize),
    CityStart(usize),
    UnitHealth(usize),
    TileOwnerStart,
    TileOwnerEnd,
    /// One tile-owner cell, `x` being the column and `y` the row.
    TileOwner { x: usize, y: usize },
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CountryStart(i) => write!(f, "CountryStart{i}"),
            Self::CityStart(i) => write!(f, "CityStart{i}"),
            Self::UnitHealth(i) => write!(f, "UnitHealth{i}"),
            Self::TileOwnerStart => f.write_str("TileOwnerStart"),
            Self::TileOwnerEnd => f.write_str("TileOwnerEnd"),
            Self::TileOwner { x, y } => write!(f, "TileOwner{x},{y}"),
        }
    }
}

impl FromStr for OffsetKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Digits only, no leading zeros, so every key has one spelling.
        let index = |rest: &str| {
            let canonical = !rest.is_empty()
                && rest.bytes().all(|b| b.is_ascii_digit())
                && (rest == "0" || !rest.starts_with('0'));
            rest.parse::<usize>()
                .ok()
                .filter(|_| canonical)
                .ok_or_else(|| format!("invalid index in offset key '{s}'"))
        };

        match s {
            "TileOwnerStart" => return Ok(Self::TileOwnerStart),
            "TileOwnerEnd" => return Ok(Self::TileOwnerEnd),
            _ => {}
        }
        if let Some(rest) = s.strip_prefix("CountryStart") {
            return index(rest).map(Self::CountryStart);
        }
        if let Some(rest) = s.strip_prefix("CityStart") {
            return index(rest).map(Self::CityStart);
        }
        if let Some(rest) = s.strip_prefix("UnitHealth") {
            return index(rest).map(Self::UnitHealth);
        }
        if let Some(rest) = s.strip_prefix("TileOwner")
            && let Some((x, y)) = rest.split_once(',')
        {
            return Ok(Self::TileOwner {
                x: index(x)?,
                y: index(y)?,
            });
        }

        Err(format!(
            "unknown offset key '{s}', expected CountryStartN, CityStartN, UnitHealthN, \
             TileOwnerStart, TileOwnerEnd or TileOwnerX,Y"
        ))
    }
}

/// Absolute file offsets recorded during one decode pass.
///
/// Entries describe the file as it was decoded. A size-changing rewrite
/// invalidates every offset after the rewritten region, so callers must
/// decode again before trusting the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetRegistry {
    entries: BTreeMap<OffsetKey, usize>,
}

impl OffsetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: OffsetKey, offset: usize) {
        self.entries.insert(key, offset);
    }

    pub fn lookup(&self, key: OffsetKey) -> Result<usize> {
        self.entries.get(&key).copied().ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::UnknownOffsetKey,
                format!("no offset recorded for {key}"),
            )
        })
    }

    pub fn contains(&self, key: OffsetKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OffsetKey, usize)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::{OffsetKey, OffsetRegistry};
    use crate::error::CoreErrorCode;

    #[test]
    fn record_overwrites_and_lookup_misses_are_typed() {
        let mut registry = OffsetRegistry::new();
        registry.record(OffsetKey::CityStart(0), 10);
        registry.record(OffsetKey::CityStart(0), 42);

        assert_eq!(registry.lookup(OffsetKey::CityStart(0)).unwrap(), 42);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(OffsetKey::CityStart(1)).unwrap_err().code,
            CoreErrorCode::UnknownOffsetKey
        );
    }

    #[test]
    fn keys_parse_from_their_display_form() {
        for key in [
            OffsetKey::CountryStart(3),
            OffsetKey::CityStart(0),
            OffsetKey::UnitHealth(17),
            OffsetKey::TileOwnerStart,
            OffsetKey::TileOwnerEnd,
            OffsetKey::TileOwner { x: 4, y: 2 },
        ] {
            assert_eq!(key.to_string().parse::<OffsetKey>(), Ok(key));
        }
        assert!("UnitHealth".parse::<OffsetKey>().is_err());
        assert!("Bogus1".parse::<OffsetKey>().is_err());
    }

    #[test]
    fn indices_have_a_single_spelling() {
        for text in ["CountryStart+3", "CountryStart03", "UnitHealth 1", "TileOwner01,2"] {
            assert!(text.parse::<OffsetKey>().is_err(), "{text} should be rejected");
        }
        assert_eq!("CityStart0".parse::<OffsetKey>(), Ok(OffsetKey::CityStart(0)));
    }
}
