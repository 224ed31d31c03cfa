use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Value as JsonValue};
use wc4_core::core_api::{
    CityEntry, EditReport, GridPos, OffsetEntry, PlayerEntry, Session, TileEntry, UnitEntry,
};

const LABEL_WIDTH: usize = 15;

// --- JSON ---

pub fn render_json_summary(session: &Session) -> JsonValue {
    let summary = session.summary();
    let mut out = JsonMap::new();
    out.insert(
        "game_mode".to_string(),
        JsonValue::String(summary.game_mode.to_string()),
    );
    out.insert("map_id".to_string(), JsonValue::from(summary.map_id));
    out.insert("turn".to_string(), JsonValue::from(summary.turn_number));
    out.insert("map_width".to_string(), JsonValue::from(summary.map_width));
    out.insert("map_height".to_string(), JsonValue::from(summary.map_height));
    out.insert(
        "countries".to_string(),
        JsonValue::from(summary.country_count),
    );
    out.insert("cities".to_string(), JsonValue::from(summary.city_count));
    out.insert("units".to_string(), JsonValue::from(summary.unit_count));
    out.insert(
        "landmines".to_string(),
        JsonValue::from(summary.landmine_count),
    );
    out.insert(
        "decoded_bytes".to_string(),
        JsonValue::from(summary.decoded_bytes),
    );
    out.insert(
        "trailing_bytes".to_string(),
        JsonValue::from(summary.trailing_bytes),
    );
    JsonValue::Object(out)
}

pub fn render_json_players(players: &[PlayerEntry]) -> JsonValue {
    JsonValue::Array(players.iter().map(player_to_json).collect())
}

pub fn render_json_tiles(tiles: &[TileEntry]) -> JsonValue {
    JsonValue::Array(
        tiles
            .iter()
            .map(|t| {
                let mut m = pos_fields(Some(t.pos));
                m.insert("owner".to_string(), JsonValue::from(t.owner));
                JsonValue::Object(m)
            })
            .collect(),
    )
}

pub fn render_json_cities(cities: &[CityEntry]) -> JsonValue {
    JsonValue::Array(cities.iter().map(city_to_json).collect())
}

pub fn render_json_units(units: &[UnitEntry]) -> JsonValue {
    JsonValue::Array(units.iter().map(unit_to_json).collect())
}

pub fn render_json_offsets(offsets: &[OffsetEntry]) -> JsonValue {
    let mut out = JsonMap::new();
    for entry in offsets {
        out.insert(entry.key.clone(), JsonValue::from(entry.offset));
    }
    JsonValue::Object(out)
}

pub fn render_json_report(report: &EditReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "action".to_string(),
        JsonValue::String(report.action.to_string()),
    );
    out.insert("changed".to_string(), JsonValue::from(report.changed));
    out.insert(
        "changes".to_string(),
        JsonValue::Array(
            report
                .changes
                .iter()
                .map(|c| {
                    let mut m = JsonMap::new();
                    m.insert("target".to_string(), JsonValue::String(c.target.clone()));
                    m.insert(
                        "old".to_string(),
                        c.old.map_or(JsonValue::Null, JsonValue::from),
                    );
                    m.insert("new".to_string(), JsonValue::from(c.new));
                    JsonValue::Object(m)
                })
                .collect(),
        ),
    );
    out.insert(
        "patched_bytes".to_string(),
        JsonValue::from(report.patches.iter().map(|p| p.range.len()).sum::<usize>()),
    );
    out.insert(
        "shift".to_string(),
        match &report.shift {
            Some(shift) => {
                let mut m = JsonMap::new();
                m.insert("start".to_string(), JsonValue::from(shift.replaced.start));
                m.insert("old_end".to_string(), JsonValue::from(shift.replaced.end));
                m.insert("new_end".to_string(), JsonValue::from(shift.written.end));
                m.insert("moved".to_string(), JsonValue::from(shift.moved));
                m.insert("delta".to_string(), JsonValue::from(shift.delta));
                m.insert("stale_tail".to_string(), JsonValue::from(shift.stale_tail));
                JsonValue::Object(m)
            }
            None => JsonValue::Null,
        },
    );
    JsonValue::Object(out)
}

fn player_to_json(p: &PlayerEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(p.index));
    m.insert("country_id".to_string(), JsonValue::from(p.country_id));
    m.insert("team".to_string(), JsonValue::from(p.team_id));
    m.insert("bot".to_string(), JsonValue::Bool(p.bot));
    m.insert(
        "currency".to_string(),
        JsonValue::Array(p.currency.iter().map(|&c| JsonValue::from(c)).collect()),
    );
    m.insert("tiles".to_string(), JsonValue::from(p.tiles_owned));
    JsonValue::Object(m)
}

fn city_to_json(c: &CityEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(c.index));
    m.insert("city_id".to_string(), JsonValue::from(c.city.city_id));
    m.extend(pos_fields(c.pos));
    m.insert("owner".to_string(), owner_json(c.owner));
    m.insert(
        "building_type".to_string(),
        JsonValue::from(c.city.building_type),
    );
    m.insert(
        "tech_levels".to_string(),
        JsonValue::Array(
            c.city
                .tech_levels
                .iter()
                .map(|&t| JsonValue::from(t))
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn unit_to_json(u: &UnitEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(u.index));
    m.extend(pos_fields(u.pos));
    m.insert("owner".to_string(), owner_json(u.owner));
    m.insert("unit_type".to_string(), JsonValue::from(u.unit.unit_type));
    m.insert("level".to_string(), JsonValue::from(u.unit.level));
    m.insert("health".to_string(), JsonValue::from(u.unit.current_health));
    m.insert("max_health".to_string(), JsonValue::from(u.unit.max_health));
    m.insert("morale".to_string(), JsonValue::from(u.unit.morale_value));
    m.insert(
        "general".to_string(),
        if u.unit.has_general() {
            let mut g = JsonMap::new();
            g.insert("id".to_string(), JsonValue::from(u.unit.general_id));
            g.insert(
                "rank".to_string(),
                JsonValue::from(u.unit.general_military_rank),
            );
            g.insert("title".to_string(), JsonValue::from(u.unit.general_title));
            g.insert(
                "skills".to_string(),
                JsonValue::Array(
                    u.unit
                        .general_skill_levels
                        .iter()
                        .map(|&s| JsonValue::from(s))
                        .collect(),
                ),
            );
            JsonValue::Object(g)
        } else {
            JsonValue::Null
        },
    );
    JsonValue::Object(m)
}

fn pos_fields(pos: Option<GridPos>) -> JsonMap<String, JsonValue> {
    let mut m = JsonMap::new();
    match pos {
        Some(p) => {
            m.insert("row".to_string(), JsonValue::from(p.row));
            m.insert("col".to_string(), JsonValue::from(p.col));
        }
        None => {
            m.insert("row".to_string(), JsonValue::Null);
            m.insert("col".to_string(), JsonValue::Null);
        }
    }
    m
}

fn owner_json(owner: Option<u8>) -> JsonValue {
    owner.map_or(JsonValue::Null, JsonValue::from)
}

// --- Text ---

pub fn render_summary_text(session: &Session) -> String {
    let s = session.summary();
    let mut out = String::new();
    let rows = [
        ("Game mode", s.game_mode.to_string()),
        ("Map", s.map_id.to_string()),
        ("Turn", s.turn_number.to_string()),
        ("Map size", format!("{} x {}", s.map_width, s.map_height)),
        ("Countries", s.country_count.to_string()),
        ("Cities", s.city_count.to_string()),
        ("Units", s.unit_count.to_string()),
        ("Landmines", s.landmine_count.to_string()),
        (
            "Decoded bytes",
            format!("{} ({} trailing)", s.decoded_bytes, s.trailing_bytes),
        ),
    ];
    for (label, value) in rows {
        writeln!(out, "{:<LABEL_WIDTH$}{value}", format!("{label}:"))
            .expect("writing to String cannot fail");
    }
    out
}

pub fn render_players_text(players: &[PlayerEntry]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:>3}  {:>7}  {:>4}  {:<3}  {:<18}  {:>5}",
        "#", "Country", "Team", "Bot", "Money", "Tiles"
    )
    .expect("writing to String cannot fail");
    for p in players {
        let money = format!("{}/{}/{}", p.currency[0], p.currency[1], p.currency[2]);
        writeln!(
            out,
            "{:>3}  {:>7}  {:>4}  {:<3}  {:<18}  {:>5}",
            p.index,
            p.country_id,
            p.team_id,
            if p.bot { "yes" } else { "no" },
            money,
            p.tiles_owned
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_tiles_text(tiles: &[TileEntry]) -> String {
    let mut out = String::new();
    for t in tiles {
        writeln!(
            out,
            "row {:>3}, col {:>3}: owner {}",
            t.pos.row, t.pos.col, t.owner
        )
        .expect("writing to String cannot fail");
    }
    if tiles.is_empty() {
        out.push_str("no tiles\n");
    }
    out
}

pub fn render_cities_text(cities: &[CityEntry]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:>3}  {:>5}  {:<9}  {:>5}  Tech",
        "#", "Id", "Position", "Owner"
    )
    .expect("writing to String cannot fail");
    for c in cities {
        let tech = c
            .city
            .tech_levels
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            out,
            "{:>3}  {:>5}  {:<9}  {:>5}  {tech}",
            c.index,
            c.city.city_id,
            format_pos(c.pos),
            format_owner(c.owner)
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_units_text(units: &[UnitEntry]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:>3}  {:<9}  {:>5}  {:>4}  {:>9}  General",
        "#", "Position", "Owner", "Type", "Health"
    )
    .expect("writing to String cannot fail");
    for u in units {
        let health = format!("{}/{}", u.unit.current_health, u.unit.max_health);
        let general = if u.unit.has_general() {
            format!(
                "{} (rank {}, title {})",
                u.unit.general_id, u.unit.general_military_rank, u.unit.general_title
            )
        } else {
            "-".to_string()
        };
        writeln!(
            out,
            "{:>3}  {:<9}  {:>5}  {:>4}  {:>9}  {general}",
            u.index,
            format_pos(u.pos),
            format_owner(u.owner),
            u.unit.unit_type,
            health
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_offsets_text(offsets: &[OffsetEntry]) -> String {
    let width = offsets.iter().map(|e| e.key.len()).max().unwrap_or(0);
    let mut out = String::new();
    for e in offsets {
        writeln!(out, "{:<width$}  {:>8}  0x{:06x}", e.key, e.offset, e.offset)
            .expect("writing to String cannot fail");
    }
    out
}

pub fn render_report_text(report: &EditReport) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{}: {} value(s) changed",
        report.action, report.changed
    )
    .expect("writing to String cannot fail");
    for c in &report.changes {
        let written = match c.old {
            Some(old) => writeln!(out, "  {}: {old} -> {}", c.target, c.new),
            None => writeln!(out, "  {}: {}", c.target, c.new),
        };
        written.expect("writing to String cannot fail");
    }
    if let Some(shift) = &report.shift {
        writeln!(
            out,
            "  rewrote bytes {}..{} as {}..{}, moved {} byte(s)",
            shift.replaced.start,
            shift.replaced.end,
            shift.written.start,
            shift.written.end,
            shift.moved
        )
        .expect("writing to String cannot fail");
        if shift.stale_tail > 0 {
            writeln!(
                out,
                "  {} stale byte(s) left at end of file",
                shift.stale_tail
            )
            .expect("writing to String cannot fail");
        }
    }
    out
}

fn format_pos(pos: Option<GridPos>) -> String {
    match pos {
        Some(p) => format!("{},{}", p.row, p.col),
        None => "-".to_string(),
    }
}

fn format_owner(owner: Option<u8>) -> String {
    match owner {
        Some(255) => "none".to_string(),
        Some(o) => o.to_string(),
        None => "-".to_string(),
    }
}
