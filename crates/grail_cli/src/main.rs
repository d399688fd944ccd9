use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use grail_core::core_api::{
    CategoryStats, CompletionSummary, Engine, EngineEvent, GrailStats, ItemCollection,
    RecentFind, ScanOutcome, ScanReport,
};
use grail_core::mode::{GameMode, GrailType};
use grail_core::settings::GrailSettings;
use grail_core::store::GrailStore;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory holding the durable state blobs.
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Raise grail logging to debug.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a save directory once and report what was found.
    Scan {
        /// Save directory; defaults to the stored one.
        dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Scan, then keep rescanning whenever save files change.
    Watch { dir: Option<PathBuf> },
    /// Completion statistics for the stored save directory.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show or clear the recent finds list.
    Recent {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        clear: bool,
    },
    /// Show or clear the ever-found history.
    History {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        clear: bool,
        /// Confirms `--clear`.
        #[arg(long)]
        yes: bool,
    },
    /// Hand-entered items for manual mode.
    Manual {
        #[command(subcommand)]
        action: ManualAction,
    },
    /// Per-item notes.
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
    /// Show or change grail settings.
    Config {
        #[arg(long = "game-mode", value_parser = parse_game_mode)]
        game_mode: Option<GameMode>,
        #[arg(long = "grail-type", value_parser = parse_grail_type)]
        grail_type: Option<GrailType>,
        #[arg(long)]
        runes: Option<bool>,
        #[arg(long)]
        runewords: Option<bool>,
        #[arg(long)]
        warlock: Option<bool>,
        #[arg(long = "persist-found")]
        persist_found: Option<bool>,
        #[arg(long = "recent-count")]
        recent_count: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ManualAction {
    /// List hand-entered items.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Set how many copies of KEY are owned; 0 removes it.
    Set {
        key: String,
        count: usize,
        #[arg(long)]
        eth: bool,
    },
}

#[derive(Debug, Subcommand)]
enum NotesAction {
    List {
        #[arg(long)]
        json: bool,
    },
    Set { item: String, note: String },
}

fn parse_game_mode(value: &str) -> Result<GameMode, String> {
    value.parse()
}

fn parse_grail_type(value: &str) -> Result<GrailType, String> {
    value.parse()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,grail_core=debug,d2_grail=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(data_dir: Option<PathBuf>) -> Result<GrailStore> {
    match data_dir {
        Some(dir) => Ok(GrailStore::new(dir)),
        None => GrailStore::open_default().context("no data directory available"),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = open_store(cli.data_dir)?;
    let mut engine = Engine::with_json_decoder(store);

    match cli.command {
        Command::Scan { dir, json } => {
            let outcome = scan(&mut engine, dir.as_deref()).await?;
            print_scan(&outcome, json)
        }
        Command::Watch { dir } => watch(engine, dir.as_deref()).await,
        Command::Stats { json } => {
            let settings = engine.settings();
            engine.read_on_start().await?;
            let (stats, summary) = engine.stats(&settings)?;
            print_stats(&stats, &summary, json)
        }
        Command::Recent { json, clear } => {
            if clear {
                engine.clear_recent_finds();
            }
            print_recent(engine.recent_finds(), json)
        }
        Command::History { json, clear, yes } => {
            if clear {
                if !yes {
                    bail!("refusing to clear history without --yes");
                }
                engine.clear_history();
            }
            let found: Vec<&str> = engine
                .history()
                .marks()
                .iter()
                .filter(|(_, found)| **found)
                .map(|(key, _)| key.as_str())
                .collect();
            if json {
                print_json(&json!({ "everFound": found }))
            } else {
                println!("{} item(s) ever found", found.len());
                for key in found {
                    println!("  {key}");
                }
                Ok(())
            }
        }
        Command::Manual { action } => {
            engine.load_manual_items();
            match action {
                ManualAction::Set { key, count, eth } => {
                    if eth {
                        engine.set_manual_eth_item(&key, count);
                    } else {
                        engine.set_manual_item(&key, count);
                    }
                    print_collection(engine.snapshot(), false)
                }
                ManualAction::List { json } => print_collection(engine.snapshot(), json),
            }
        }
        Command::Notes { action } => match action {
            NotesAction::Set { item, note } => {
                engine.set_item_note(&item, &note);
                Ok(())
            }
            NotesAction::List { json } => {
                let notes = engine.item_notes();
                if json {
                    print_json(&serde_json::to_value(notes)?)
                } else {
                    for (item, note) in notes {
                        println!("{item}: {note}");
                    }
                    Ok(())
                }
            }
        },
        Command::Config {
            game_mode,
            grail_type,
            runes,
            runewords,
            warlock,
            persist_found,
            recent_count,
            json,
        } => {
            let mut settings = engine.settings();
            let before = settings.clone();
            if let Some(mode) = game_mode {
                settings.game_mode = mode;
            }
            if let Some(kind) = grail_type {
                settings.grail_type = kind;
            }
            if let Some(v) = runes {
                settings.grail_runes = v;
            }
            if let Some(v) = runewords {
                settings.grail_runewords = v;
            }
            if let Some(v) = warlock {
                settings.grail_warlock = v;
            }
            if let Some(v) = persist_found {
                settings.persist_found_on_drop = v;
            }
            if let Some(v) = recent_count {
                settings.overlay_recent_finds_count = v;
            }
            if settings != before {
                engine.store().save_settings(&settings)?;
            }
            print_settings(&settings, json)
        }
    }
}

async fn scan(engine: &mut Engine, dir: Option<&Path>) -> Result<ScanOutcome> {
    let settings = engine.settings();
    let outcome = match dir {
        Some(dir) => engine.scan_directory(dir, &settings, true).await?,
        None => engine.read_on_start().await?,
    };
    Ok(outcome)
}

async fn watch(mut engine: Engine, dir: Option<&Path>) -> Result<()> {
    let mut events = engine.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EngineEvent::NewItemsFound(finds) => {
                    for find in finds {
                        println!("new: {} ({})", find.name, find.category);
                    }
                }
                EngineEvent::FilesFailed(files) => {
                    println!("failed to read: {}", files.join(", "));
                }
                EngineEvent::NoDirectory => println!("no save directory"),
                EngineEvent::HistoryCleared | EngineEvent::ScanCompleted { .. } => {}
            }
        }
    });

    let outcome = scan(&mut engine, dir).await?;
    if matches!(outcome, ScanOutcome::NoDirectory) {
        printer.abort();
        bail!("no save directory to watch");
    }
    info!("watching for save changes, press Ctrl-C to stop");
    engine
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    drop(engine);
    let _ = printer.await;
    Ok(())
}

fn print_json(value: &JsonValue) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering JSON output")?;
    println!("{rendered}");
    Ok(())
}

fn scan_report_json(report: &ScanReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("snapshot".to_string(), collection_json(&report.snapshot));
    out.insert("failedFiles".to_string(), json!(report.failed_files));
    out.insert(
        "newFinds".to_string(),
        JsonValue::Array(report.new_finds.iter().map(recent_find_json).collect()),
    );
    out.insert("hasNewItems".to_string(), json!(report.has_new_items));
    JsonValue::Object(out)
}

fn collection_json(collection: &ItemCollection) -> JsonValue {
    serde_json::to_value(collection).unwrap_or(JsonValue::Null)
}

fn recent_find_json(find: &RecentFind) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("name".to_string(), json!(find.name));
    m.insert("type".to_string(), json!(find.category.as_str()));
    m.insert("timestamp".to_string(), json!(find.timestamp));
    m.insert("ethereal".to_string(), json!(find.ethereal));
    JsonValue::Object(m)
}

fn print_scan(outcome: &ScanOutcome, json: bool) -> Result<()> {
    let report = match outcome {
        ScanOutcome::Completed(report) => report,
        ScanOutcome::NoDirectory => {
            if json {
                return print_json(&json!({ "noDirectory": true }));
            }
            bail!("no readable save directory");
        }
    };
    if json {
        return print_json(&scan_report_json(report));
    }
    for (label, count) in &report.snapshot.per_file_counts {
        match count {
            Some(count) => println!("{label}: {count} item(s)"),
            None => println!("{label}: failed"),
        }
    }
    println!(
        "{} grail item(s), {} ethereal",
        report.snapshot.items.len(),
        report.snapshot.eth_items.len()
    );
    if !report.failed_files.is_empty() {
        println!("failed to read: {}", report.failed_files.join(", "));
    }
    for find in &report.new_finds {
        println!("new: {} ({})", find.name, find.category);
    }
    Ok(())
}

fn print_stats(stats: &GrailStats, summary: &CompletionSummary, json: bool) -> Result<()> {
    if json {
        let mut out = JsonMap::new();
        out.insert("stats".to_string(), serde_json::to_value(stats)?);
        out.insert("summary".to_string(), serde_json::to_value(summary)?);
        return print_json(&JsonValue::Object(out));
    }
    let line = |title: &str, s: &CategoryStats| {
        println!(
            "{title:<18} {:>4} / {:<4} {:>3}%  ({} missing)",
            s.owned, s.exists, s.percent, s.remaining
        );
    };
    line("Unique armor", &stats.normal.armor);
    line("Unique weapons", &stats.normal.weapon);
    line("Unique other", &stats.normal.other);
    line("Sets", &stats.normal.sets);
    line("Total normal", &stats.normal.total);
    line("Total ethereal", &stats.ethereal.total);
    line("Runes", &stats.runes);
    line("Runewords", &stats.runewords);
    line("Counter", &summary.counter);
    if let Some(sub) = &summary.sub_counter {
        line("Ethereal counter", sub);
    }
    line("Grand total", &summary.grand_total);
    Ok(())
}

fn print_recent(finds: &[RecentFind], json: bool) -> Result<()> {
    if json {
        return print_json(&JsonValue::Array(finds.iter().map(recent_find_json).collect()));
    }
    for find in finds {
        let eth = if find.ethereal { " [eth]" } else { "" };
        println!("{} ({}){eth}", find.name, find.category);
    }
    Ok(())
}

fn print_collection(collection: &ItemCollection, json: bool) -> Result<()> {
    if json {
        return print_json(&collection_json(collection));
    }
    for (key, entry) in &collection.items {
        println!("{key}: {}", entry.occurrence_count());
    }
    for (key, entry) in &collection.eth_items {
        println!("{key} [eth]: {}", entry.occurrence_count());
    }
    Ok(())
}

fn print_settings(settings: &GrailSettings, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::to_value(settings)?);
    }
    let dir = settings
        .save_dir
        .as_deref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(none)".to_string());
    println!("save dir:       {dir}");
    println!("game mode:      {}", settings.game_mode);
    println!("grail type:     {}", settings.grail_type);
    println!("runes:          {}", settings.grail_runes);
    println!("runewords:      {}", settings.grail_runewords);
    println!("warlock:        {}", settings.grail_warlock);
    println!("persist found:  {}", settings.persist_found_on_drop);
    println!("recent count:   {}", settings.recent_finds_cap());
    Ok(())
}
