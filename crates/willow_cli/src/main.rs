use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::debug;
use serde_json::{Map as JsonMap, Value as JsonValue};
use willow_core::core_api::{CoreError, CoreErrorCode, Engine, Snapshot};
use willow_core::layout::FileLayout;
use willow_core::{DecodeOptions, Loaded, Platform};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a character summary.
    Info {
        #[arg(long)]
        json: bool,
        #[arg(value_name = "SAVE")]
        path: PathBuf,
    },
    /// Print the byte range of every decoded section.
    Layout {
        #[arg(long)]
        json: bool,
        #[arg(value_name = "SAVE")]
        path: PathBuf,
    },
    /// Drop damaged sections and invalid inventory objects.
    Repair {
        #[arg(long)]
        output: PathBuf,
        #[arg(value_name = "SAVE")]
        path: PathBuf,
    },
    /// Re-target a save at another platform.
    Convert {
        #[arg(long, value_name = "PC|PS3|X360|X360JP", value_parser = parse_platform)]
        platform: Platform,
        #[arg(long, value_name = "CON")]
        container: Option<PathBuf>,
        #[arg(long = "discard-raw")]
        discard_raw: bool,
        #[arg(long)]
        output: PathBuf,
        #[arg(value_name = "SAVE")]
        path: PathBuf,
    },
    /// Print the profile and device ids of an Xbox 360 container.
    Identity {
        #[arg(value_name = "CON")]
        path: PathBuf,
    },
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));
    let cli = Cli::parse();

    match cli.command {
        Command::Info { json, path } => {
            let loaded = read_or_exit(&Engine::new(), &path);
            let snapshot = Engine::new().snapshot(&loaded.save);
            if json {
                print_json(&JsonValue::Object(snapshot_json(&snapshot)));
            } else {
                print_summary(&snapshot);
            }
        }
        Command::Layout { json, path } => {
            let loaded = read_or_exit(&Engine::new(), &path);
            if json {
                let value = serde_json::to_value(&loaded.layout).unwrap_or_else(|e| {
                    eprintln!("Error rendering JSON output: {e}");
                    process::exit(1);
                });
                print_json(&value);
            } else {
                print_layout(&loaded.layout);
            }
        }
        Command::Repair { output, path } => {
            let engine = Engine::with_options(DecodeOptions { auto_repair: true });
            let loaded = read_or_exit(&engine, &path);
            for repair in &loaded.repairs {
                println!("{repair}");
            }
            write_or_exit(&engine, &loaded, &output);
            if loaded.required_repair {
                println!(
                    "Removed {} damaged unit(s); wrote {}",
                    loaded.repairs.len(),
                    output.display()
                );
            } else {
                println!("No repairs needed; wrote {}", output.display());
            }
        }
        Command::Convert {
            platform,
            container,
            discard_raw,
            output,
            path,
        } => {
            let engine = Engine::new();
            let mut loaded = read_or_exit(&engine, &path);
            if discard_raw {
                let dropped = engine.discard_raw_data(&mut loaded.save);
                println!("Discarded {dropped} bytes of raw data");
            }
            engine
                .select_platform(&mut loaded.save, platform, container.as_deref())
                .unwrap_or_else(|e| {
                    eprintln!("Error converting {}: {e}", path.display());
                    if e.code == CoreErrorCode::RawDataPresentOnConversion {
                        eprintln!("  rerun with --discard-raw to drop the uninterpreted bytes");
                    }
                    process::exit(1);
                });
            write_or_exit(&engine, &loaded, &output);
            println!("Wrote {platform} save to {}", output.display());
        }
        Command::Identity { path } => {
            let identity = Engine::new().resolve_xbox_identity(&path).unwrap_or_else(|e| {
                eprintln!("Error reading container {}: {e}", path.display());
                process::exit(1);
            });
            println!("{identity}");
        }
    }
}

fn read_or_exit(engine: &Engine, path: &Path) -> Loaded {
    engine.read(path).unwrap_or_else(|e: CoreError| {
        eprintln!("Error parsing save file: {}", path.display());
        eprintln!("  {e}");
        if e.code == CoreErrorCode::RequiresRepair {
            eprintln!("  run `willow-save repair` to drop the damaged data");
        }
        process::exit(1);
    })
}

fn write_or_exit(engine: &Engine, loaded: &Loaded, output: &Path) {
    debug!("writing {} save", loaded.save.platform);
    engine.write(&loaded.save, output).unwrap_or_else(|e| {
        eprintln!("Error writing {}: {e}", output.display());
        process::exit(1);
    });
}

fn parse_platform(value: &str) -> Result<Platform, String> {
    Platform::parse(value).ok_or_else(|| format!("unknown platform {value:?}; expected PC, PS3, X360 or X360JP"))
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn snapshot_json(snapshot: &Snapshot) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "platform".to_string(),
        JsonValue::String(snapshot.platform.to_string()),
    );
    out.insert(
        "byte_order".to_string(),
        JsonValue::String(snapshot.byte_order.to_string()),
    );
    out.insert("revision".to_string(), JsonValue::from(snapshot.revision));
    out.insert(
        "name".to_string(),
        JsonValue::String(snapshot.character_name.clone()),
    );
    out.insert("class".to_string(), JsonValue::String(snapshot.class.clone()));
    out.insert("level".to_string(), JsonValue::from(snapshot.level));
    out.insert("xp".to_string(), JsonValue::from(snapshot.experience));
    out.insert(
        "skill_points".to_string(),
        JsonValue::from(snapshot.skill_points),
    );
    out.insert("cash".to_string(), JsonValue::from(snapshot.cash));
    out.insert(
        "finished_playthrough1".to_string(),
        JsonValue::Bool(snapshot.finished_playthrough1),
    );
    out.insert(
        "play_time".to_string(),
        JsonValue::String(format_play_time(snapshot.total_play_time)),
    );
    out.insert(
        "last_played".to_string(),
        JsonValue::String(snapshot.last_played_date.clone()),
    );
    out.insert(
        "location".to_string(),
        JsonValue::String(snapshot.current_location.clone()),
    );
    out.insert("skills".to_string(), JsonValue::from(snapshot.skill_count));
    out.insert("items".to_string(), JsonValue::from(snapshot.item_count));
    out.insert("weapons".to_string(), JsonValue::from(snapshot.weapon_count));
    out.insert(
        "bank_entries".to_string(),
        JsonValue::from(snapshot.bank_entry_count),
    );
    out.insert(
        "challenges".to_string(),
        JsonValue::from(snapshot.challenge_count),
    );
    out.insert(
        "locations".to_string(),
        JsonValue::from(snapshot.location_count),
    );
    out.insert("quests".to_string(), JsonValue::from(snapshot.quest_count));
    out.insert("echoes".to_string(), JsonValue::from(snapshot.echo_count));
    out.insert(
        "dlc_sections".to_string(),
        JsonValue::Array(
            snapshot
                .dlc_sections
                .iter()
                .map(|s| {
                    let mut entry = JsonMap::new();
                    entry.insert("id".to_string(), JsonValue::String(format!("{:#010x}", s.id)));
                    entry.insert("name".to_string(), JsonValue::String(s.name.clone()));
                    entry.insert("state".to_string(), JsonValue::String(s.state.to_string()));
                    entry.insert("raw_len".to_string(), JsonValue::from(s.raw_len));
                    JsonValue::Object(entry)
                })
                .collect(),
        ),
    );
    out.insert(
        "raw_data_len".to_string(),
        JsonValue::from(snapshot.raw_data_len),
    );
    out
}

fn print_summary(snapshot: &Snapshot) {
    println!("{} ({})", snapshot.character_name, snapshot.class);
    println!(
        "  Level {}  XP {}  Skill points {}  Cash {}",
        snapshot.level, snapshot.experience, snapshot.skill_points, snapshot.cash
    );
    println!(
        "  Platform {} ({}), revision {:#x}",
        snapshot.platform, snapshot.byte_order, snapshot.revision
    );
    println!(
        "  Played {}, last saved {}, at {}",
        format_play_time(snapshot.total_play_time),
        snapshot.last_played_date,
        snapshot.current_location
    );
    println!(
        "  {} skills, {} items, {} weapons, {} bank entries",
        snapshot.skill_count, snapshot.item_count, snapshot.weapon_count, snapshot.bank_entry_count
    );
    println!(
        "  {} challenges, {} locations, {} quests, {} echoes",
        snapshot.challenge_count, snapshot.location_count, snapshot.quest_count, snapshot.echo_count
    );

    if snapshot.dlc_sections.is_empty() {
        println!("  No DLC sections");
    }
    for section in &snapshot.dlc_sections {
        println!(
            "  DLC {:#010x} {:<16} {} ({} raw bytes)",
            section.id, section.name, section.state, section.raw_len
        );
    }
    if snapshot.raw_data_len > 0 {
        println!(
            "  {} bytes of raw data; platform conversion needs --discard-raw",
            snapshot.raw_data_len
        );
    }
}

fn print_layout(layout: &FileLayout) {
    println!("{:<12} {:>10} {:>10} {:>10}", "section", "start", "end", "bytes");
    for section in &layout.sections {
        println!(
            "{:<12} {:>10} {:>10} {:>10}",
            section.id.as_str(),
            section.range.start,
            section.range.end,
            section.range.len()
        );
    }
    println!("{:<12} {:>10} {:>10} {:>10}", "file", 0, layout.file_len, layout.file_len);
}

fn format_play_time(seconds: i32) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}:{:02}", seconds / 3600, (seconds / 60) % 60, seconds % 60)
}
