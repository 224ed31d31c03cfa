mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{UNOWNED, skirmish, temp_save_path};
use wc4_core::core_api::{CoreErrorCode, Engine, GridPos, Session};
use wc4_core::patch::FieldWidth;
use wc4_core::registry::OffsetKey;
use wc4_core::save::types::{MAX_CURRENCY, MAX_TECH_LEVEL};

struct Fixture {
    path: PathBuf,
}

impl Fixture {
    fn skirmish(prefix: &str) -> Self {
        let path = temp_save_path(prefix);
        skirmish().write_to(&path);
        Self { path }
    }

    fn open(&self) -> Session {
        Engine::new()
            .open_path(&self.path)
            .expect("failed to open synthesized save")
    }

    fn len(&self) -> u64 {
        file_len(&self.path)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).expect("stat save").len()
}

#[test]
fn summary_reflects_header_and_decode_extent() {
    let fx = Fixture::skirmish("wc4_session_summary");
    let session = fx.open();
    let summary = session.summary();
    assert_eq!(summary.map_width, 4);
    assert_eq!(summary.country_count, 3);
    assert_eq!(summary.city_count, 2);
    assert_eq!(summary.unit_count, 5);
    assert_eq!(summary.decoded_bytes as u64, fx.len());
    assert_eq!(summary.trailing_bytes, 0);
}

#[test]
fn players_list_teams_and_tile_counts() {
    let fx = Fixture::skirmish("wc4_session_players");
    let players = fx.open().players();
    assert_eq!(players.len(), 3);
    assert_eq!(
        players.iter().map(|p| p.team_id).collect::<Vec<_>>(),
        vec![1, 1, 2]
    );
    assert_eq!(
        players.iter().map(|p| p.tiles_owned).collect::<Vec<_>>(),
        vec![1, 2, 2]
    );
    assert!(!players[0].bot);
    assert!(players[2].bot);
}

#[test]
fn player_tiles_skip_the_player_and_unowned_cells() {
    let fx = Fixture::skirmish("wc4_session_tiles");
    let session = fx.open();
    let tiles = session.player_tiles(1);
    assert_eq!(
        tiles.iter().map(|t| t.pos).collect::<Vec<_>>(),
        vec![GridPos { row: 0, col: 1 }, GridPos { row: 0, col: 2 }]
    );
    assert!(session.player_tiles(0).is_empty());
    assert!(session.player_tiles(UNOWNED).is_empty());
}

#[test]
fn cities_and_units_resolve_positions_and_owners() {
    let fx = Fixture::skirmish("wc4_session_positions");
    let session = fx.open();

    let cities = session.cities();
    assert_eq!(cities[0].pos, Some(GridPos { row: 0, col: 1 }));
    assert_eq!(cities[0].owner, Some(1));
    assert_eq!(cities[1].owner, Some(2));

    let units = session.units();
    assert_eq!(units[2].pos, Some(GridPos { row: 1, col: 1 }));
    assert_eq!(units[2].owner, Some(2));
    assert_eq!(units[4].owner, Some(UNOWNED));

    let generals = session.generals();
    assert_eq!(generals.len(), 1);
    assert_eq!(generals[0].index, 1);
    assert_eq!(generals[0].unit.general_id, 7);
}

#[test]
fn offsets_cover_every_recorded_key() {
    let fx = Fixture::skirmish("wc4_session_offsets");
    let offsets = fx.open().offsets();
    // 3 countries, 2 cities, 5 units, 2 grid markers, 16 cells.
    assert_eq!(offsets.len(), 28);
    assert!(offsets.iter().any(|e| e.key == "TileOwner3,3"));
}

#[test]
fn max_money_sets_every_currency_slot() {
    let fx = Fixture::skirmish("wc4_session_money");
    let mut session = fx.open();
    let report = session.max_money(1).expect("max money");
    assert_eq!(report.changed, 3);
    assert_eq!(report.changes[0].old, Some(200));
    assert_eq!(session.save().countries[1].currency, [MAX_CURRENCY; 3]);

    let reopened = fx.open();
    assert_eq!(reopened.save().countries[1].currency, [MAX_CURRENCY; 3]);
    assert_eq!(reopened.save().countries[0].currency, [100, 20, 3]);
}

#[test]
fn max_money_for_missing_country_fails() {
    let fx = Fixture::skirmish("wc4_session_money_missing");
    let err = fx.open().max_money(9).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::InvariantViolation);
}

#[test]
fn max_city_tech_only_touches_the_owners_cities() {
    let fx = Fixture::skirmish("wc4_session_tech");
    let mut session = fx.open();
    let report = session.max_city_tech(1).expect("max city tech");
    assert_eq!(report.changed, 5);

    let reopened = fx.open();
    assert_eq!(
        reopened.save().cities[0].tech_levels,
        [MAX_TECH_LEVEL; 6]
    );
    assert_eq!(reopened.save().cities[1].tech_levels, [0; 6]);
}

#[test]
fn restore_allies_heals_the_players_team() {
    let fx = Fixture::skirmish("wc4_session_restore");
    let mut session = fx.open();
    let report = session.restore_allies().expect("restore allies");
    assert_eq!(report.changed, 2);

    let units = fx.open().save().units.clone();
    assert_eq!(units[0].current_health, 100);
    assert_eq!(units[1].current_health, 100);
    assert_eq!(units[2].current_health, 80);
    assert_eq!(units[4].current_health, 10);
}

#[test]
fn weaken_enemies_spares_allies_and_empties_garrisons() {
    let fx = Fixture::skirmish("wc4_session_weaken");
    let mut session = fx.open();
    let report = session.weaken_enemies().expect("weaken enemies");
    assert_eq!(report.changed, 2);

    let units = fx.open().save().units.clone();
    assert_eq!(units[0].current_health, 30);
    assert_eq!(units[2].current_health, 1);
    assert_eq!(units[3].current_health, 0);
    assert_eq!(units[4].current_health, 10);
}

#[test]
fn convert_team_moves_every_country_to_the_players_team() {
    let fx = Fixture::skirmish("wc4_session_team");
    let mut session = fx.open();
    let report = session.convert_team().expect("convert team");
    assert_eq!(report.changed, 1);
    assert_eq!(report.changes[0].old, Some(2));

    let teams: Vec<u32> = fx.open().players().iter().map(|p| p.team_id).collect();
    assert_eq!(teams, vec![1, 1, 1]);
}

#[test]
fn convert_tile_patches_one_cell_in_place() {
    let fx = Fixture::skirmish("wc4_session_tile");
    let before = fx.len();
    let mut session = fx.open();
    let report = session.convert_tile(1, 0, 2).expect("convert tile");
    assert_eq!(report.changed, 1);
    assert!(report.shift.is_none());
    assert_eq!(fx.len(), before);

    let reopened = fx.open();
    assert_eq!(reopened.save().tile_owners.get(1, 0), Some(2));
    assert_eq!(reopened.save().tile_owners.get(2, 0), Some(1));
}

#[test]
fn convert_tile_rejects_bad_targets() {
    let fx = Fixture::skirmish("wc4_session_tile_bad");
    let mut session = fx.open();

    let err = session.convert_tile(3, 0, 1).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::InvariantViolation);

    let err = session.convert_tile(9, 9, 1).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::UnknownOffsetKey);

    let err = session.convert_tile(1, 0, 7).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::InvariantViolation);
    assert_eq!(fx.open().save().tile_owners.get(1, 0), Some(1));
}

#[test]
fn convert_player_rewrites_the_grid_and_reloads() {
    let fx = Fixture::skirmish("wc4_session_convert_player");
    let before = fx.len();
    let mut session = fx.open();
    let report = session.convert_player(2, 1).expect("convert player");
    assert_eq!(report.changed, 2);
    let shift = report.shift.expect("grid rewrite");
    assert_eq!(shift.delta, 0);
    assert_eq!(shift.stale_tail, 0);
    assert_eq!(fx.len(), before);

    assert_eq!(session.save().tile_owners.owned_count(1), 4);
    assert_eq!(session.save().tile_owners.owned_count(2), 0);
    assert_eq!(session.save().cities.len(), 2);
    assert_eq!(session.summary().decoded_bytes as u64, before);
}

#[test]
fn convert_player_with_nothing_to_change_leaves_the_file_alone() {
    let fx = Fixture::skirmish("wc4_session_convert_noop");
    let bytes = fs::read(&fx.path).expect("read save");
    let mut session = fx.open();
    let report = session.convert_player(1, 1).expect("convert player");
    assert_eq!(report.changed, 0);
    assert!(report.shift.is_none());
    assert_eq!(fs::read(&fx.path).expect("read save"), bytes);
}

#[test]
fn convert_all_allies_hands_allied_tiles_to_the_player() {
    let fx = Fixture::skirmish("wc4_session_allies");
    let mut session = fx.open();
    let report = session.convert_all_allies().expect("convert allies");
    assert_eq!(report.changed, 2);

    let owners = &session.save().tile_owners;
    assert_eq!(owners.owned_count(0), 3);
    assert_eq!(owners.owned_count(1), 0);
    assert_eq!(owners.owned_count(2), 2);
}

#[test]
fn convert_all_players_hands_every_owned_tile_to_the_player() {
    let fx = Fixture::skirmish("wc4_session_all_players");
    let mut session = fx.open();
    let report = session.convert_all_players().expect("convert all players");
    assert_eq!(report.changed, 4);

    let reopened = fx.open();
    assert_eq!(reopened.save().tile_owners.owned_count(0), 5);
    assert_eq!(reopened.save().tile_owners.owned_count(UNOWNED), 11);
}

#[test]
fn raw_writes_resolve_keys_and_offsets() {
    let fx = Fixture::skirmish("wc4_session_raw");
    let mut session = fx.open();
    let health = session
        .registry()
        .lookup(OffsetKey::UnitHealth(4))
        .expect("unit 4 health offset");

    let report = session
        .write_at_key(OffsetKey::UnitHealth(4), 55, FieldWidth::Word)
        .expect("write at key");
    assert_eq!(report.changes[0].old, None);
    assert_eq!(report.patches[0].range.start, health);

    session
        .write_at_offset(health + 2, 60, FieldWidth::Word)
        .expect("write at offset");
    session.reload().expect("reload");
    assert_eq!(session.save().units[4].current_health, 55);
    assert_eq!(session.save().units[4].max_health, 60);
}
