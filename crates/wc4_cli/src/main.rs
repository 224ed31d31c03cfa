use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wc4_core::core_api::{CoreError, EditReport, Engine};
use wc4_core::patch::FieldWidth;
use wc4_core::registry::OffsetKey;
use wc4_render::{
    render_cities_text, render_json_cities, render_json_offsets, render_json_players,
    render_json_report, render_json_summary, render_json_tiles, render_json_units,
    render_offsets_text, render_players_text, render_report_text, render_summary_text,
    render_tiles_text, render_units_text,
};

const DEFAULT_LOG_FILTER: &str = "wc4_se=warn,wc4_core=warn";

/// Inspect and patch World Conqueror 4 save files in place.
///
/// Every edit writes straight to SAVE. Running two edits against the same
/// file at once is unsupported.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE")]
    path: PathBuf,
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize the header and decode extent.
    Info,
    ListPlayers,
    /// List tiles owned by one country.
    ListPlayerTiles {
        #[arg(value_name = "PLAYER")]
        player: u8,
    },
    ListCities,
    ListUnits,
    ListGenerals,
    /// Dump every recorded registry key and its file offset.
    Offsets,
    /// Set a country's three currency slots to 9999.
    MaxMoney {
        #[arg(long, default_value_t = 0)]
        player: usize,
    },
    /// Raise every tech level of the cities a country owns.
    MaxCityTech {
        #[arg(long, default_value_t = 0)]
        player: u8,
    },
    /// Heal every unit on the player's team.
    RestoreAllies,
    /// Drop every enemy unit to 1 health.
    WeakenEnemy,
    /// Hand all of one owner's tiles to another.
    ConvertPlayer {
        #[arg(long)]
        old: u8,
        #[arg(long)]
        new: u8,
    },
    /// Change the owner of a single tile (x is the column, y the row).
    ConvertTile {
        #[arg(long)]
        x: usize,
        #[arg(long)]
        y: usize,
        #[arg(long)]
        value: u8,
    },
    ConvertAllAllies,
    ConvertTeam,
    ConvertAllPlayers,
    /// Write a raw little-endian value at an offset or registry key.
    Write {
        #[arg(
            long,
            value_parser = parse_offset,
            conflicts_with = "key",
            required_unless_present = "key"
        )]
        offset: Option<usize>,
        /// Registry key, e.g. `UnitHealth17` or `TileOwner4,2`.
        #[arg(long, value_parser = parse_offset_key)]
        key: Option<OffsetKey>,
        #[arg(long)]
        value: u64,
        #[arg(long, value_name = "1|2|4", value_parser = parse_width)]
        width: FieldWidth,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();
    debug!(path = %cli.path.display(), command = ?cli.command, "starting");

    let engine = Engine::new();
    let mut session = engine.open_path(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error parsing save file: {}", cli.path.display());
        eprintln!("  {e}");
        process::exit(1);
    });

    let (json, text) = match cli.command {
        Command::Info => (
            render_json_summary(&session),
            render_summary_text(&session),
        ),
        Command::ListPlayers => {
            let players = session.players();
            (render_json_players(&players), render_players_text(&players))
        }
        Command::ListPlayerTiles { player } => {
            let tiles = session.player_tiles(player);
            (render_json_tiles(&tiles), render_tiles_text(&tiles))
        }
        Command::ListCities => {
            let cities = session.cities();
            (render_json_cities(&cities), render_cities_text(&cities))
        }
        Command::ListUnits => {
            let units = session.units();
            (render_json_units(&units), render_units_text(&units))
        }
        Command::ListGenerals => {
            let generals = session.generals();
            (render_json_units(&generals), render_units_text(&generals))
        }
        Command::Offsets => {
            let offsets = session.offsets();
            (render_json_offsets(&offsets), render_offsets_text(&offsets))
        }
        Command::MaxMoney { player } => edited(&cli.path, session.max_money(player)),
        Command::MaxCityTech { player } => edited(&cli.path, session.max_city_tech(player)),
        Command::RestoreAllies => edited(&cli.path, session.restore_allies()),
        Command::WeakenEnemy => edited(&cli.path, session.weaken_enemies()),
        Command::ConvertPlayer { old, new } => {
            edited(&cli.path, session.convert_player(old, new))
        }
        Command::ConvertTile { x, y, value } => {
            edited(&cli.path, session.convert_tile(x, y, value))
        }
        Command::ConvertAllAllies => edited(&cli.path, session.convert_all_allies()),
        Command::ConvertTeam => edited(&cli.path, session.convert_team()),
        Command::ConvertAllPlayers => edited(&cli.path, session.convert_all_players()),
        Command::Write {
            offset,
            key,
            value,
            width,
        } => {
            let result = match (key, offset) {
                (Some(key), _) => session.write_at_key(key, value, width),
                (None, Some(offset)) => session.write_at_offset(offset, value, width),
                (None, None) => {
                    eprintln!("write requires --offset or --key");
                    process::exit(2);
                }
            };
            edited(&cli.path, result)
        }
    };

    if cli.json {
        print_json(&json);
    } else {
        print!("{text}");
    }
}

/// Render an edit's outcome, or exit with its error.
fn edited(path: &Path, result: Result<EditReport, CoreError>) -> (JsonValue, String) {
    let report = result.unwrap_or_else(|e| {
        eprintln!("Error editing {}: {e}", path.display());
        process::exit(1);
    });
    (render_json_report(&report), render_report_text(&report))
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn print_json(json: &JsonValue) {
    let rendered = serde_json::to_string_pretty(json).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

fn parse_offset(value: &str) -> Result<usize, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{value}': {e}"))
}

fn parse_offset_key(value: &str) -> Result<OffsetKey, String> {
    value.parse()
}

fn parse_width(value: &str) -> Result<FieldWidth, String> {
    value
        .parse::<usize>()
        .ok()
        .and_then(FieldWidth::from_bytes)
        .ok_or_else(|| format!("invalid width '{value}' (use 1, 2 or 4)"))
}
