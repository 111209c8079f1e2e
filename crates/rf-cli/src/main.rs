//! rf-choreo: headless project tools
//!
//! Usage:
//!   rf-choreo demo [--guitar] [--out DIR]      - Write a demo project
//!   rf-choreo list [--store DIR]               - List stored projects
//!   rf-choreo info PROJECT                     - Timeline summary
//!   rf-choreo positions PROJECT NODE           - Dump cached positions
//!   rf-choreo simulate PROJECT [--seconds N]   - Headless playback run

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use rf_core::{beat_label, units_to_seconds};
use rf_engine::{EngineConfig, PlaybackOrchestrator};
use rf_event::{COMMAND_QUEUE_CAPACITY, RecordingSink, SinkCommand, queued};
use rf_state::{JsonProjectStore, Project, ProjectStore, example_band, example_guitar};

#[derive(Parser)]
#[command(name = "rf-choreo", about = "Speaker choreography project tools")]
struct Cli {
    /// Engine settings file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a demo project into a store directory
    Demo {
        /// Write the single-speaker guitar demo instead of the band
        #[arg(long)]
        guitar: bool,
        /// Store directory (defaults to the per-user data directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List the projects in a store directory
    List {
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
    /// Print tempo, meter, timeline length and every node's clips and segments
    Info {
        /// Project JSON file
        project: PathBuf,
    },
    /// Print a node's cached positions
    Positions {
        project: PathBuf,
        /// Node name
        node: String,
        /// Print every N units
        #[arg(short, long, default_value_t = 60)]
        every: usize,
    },
    /// Play the project against a recording sink and print the command log
    Simulate {
        project: PathBuf,
        /// Wall time to simulate
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,
        /// Tick period in milliseconds
        #[arg(long, default_value_t = 50)]
        tick_ms: u64,
        /// Directory holding the imported audio (defaults to `assets/` next to the project)
        #[arg(long)]
        assets: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Demo { guitar, out } => write_demo(guitar, out),
        Commands::List { store } => list_projects(store),
        Commands::Info { project } => print_info(&project),
        Commands::Positions { project, node, every } => print_positions(&project, &node, every, config),
        Commands::Simulate {
            project,
            seconds,
            tick_ms,
            assets,
        } => simulate(&project, seconds, tick_ms, assets, config),
    }
}

fn store_at(dir: Option<PathBuf>) -> JsonProjectStore {
    JsonProjectStore::new(dir.unwrap_or_else(JsonProjectStore::default_dir))
}

fn load_project(path: &Path) -> Result<Project> {
    Project::load_from(path).with_context(|| format!("loading project {}", path.display()))
}

fn assets_next_to(path: &Path) -> PathBuf {
    path.parent().unwrap_or_else(|| Path::new(".")).join("assets")
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

fn write_demo(guitar: bool, out: Option<PathBuf>) -> Result<()> {
    let store = store_at(out);
    let project = if guitar { example_guitar()? } else { example_band()? };
    store.save(&project)?;
    println!("{}", store.path_for(project.id).display());
    Ok(())
}

fn list_projects(dir: Option<PathBuf>) -> Result<()> {
    let store = store_at(dir);
    let projects = store.list()?;
    if projects.is_empty() {
        println!("No projects in {}", store.root().display());
        return Ok(());
    }
    for summary in projects {
        println!(
            "{}  {:<24} {:>2} nodes  {}",
            summary.id,
            summary.name,
            summary.node_count,
            summary.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSPECTION
// ═══════════════════════════════════════════════════════════════════════════════

fn print_info(path: &Path) -> Result<()> {
    let project = load_project(path)?;
    let bpm = project.bpm();
    let ts = project.time_signature();
    let end = project.timeline_end();
    let beats = project.number_of_beats();

    println!("{} ({})", project.name, project.id);
    println!("  tempo      {bpm} bpm, {ts}");
    println!(
        "  timeline   {beats} beats ({} .. {}), {end:.0} units, {:.1} s",
        beat_label(0, ts),
        beat_label(beats.saturating_sub(1), ts),
        units_to_seconds(end, bpm)
    );
    if project.solo_active() {
        println!("  solo       active");
    }

    for node in project.nodes() {
        let mut flags = Vec::new();
        if !node.playing {
            flags.push("muted");
        }
        if node.solo {
            flags.push("solo");
        }
        println!();
        println!(
            "  {} [slot {}] volume {:.2} {}",
            node.name,
            node.layout_index,
            node.volume(),
            flags.join(" ")
        );
        for clip in node.clips() {
            println!(
                "    clip     {:<20} {:>7.1} .. {:>7.1}  ({:.1} s)",
                format!("{}.{}", clip.file_name, clip.extension),
                clip.start,
                clip.end(bpm),
                clip.duration_secs()
            );
        }
        for segment in node.segments() {
            println!(
                "    segment  {:<20} {:>7.1} .. {:>7.1}  -> {}",
                segment.kind().name(),
                segment.start(),
                segment.end(),
                segment.end_position()
            );
        }
    }
    Ok(())
}

fn print_positions(path: &Path, node_name: &str, every: usize, config: EngineConfig) -> Result<()> {
    if every == 0 {
        bail!("--every must be at least 1");
    }
    let project = load_project(path)?;
    let Some(node) = project.node_by_name(node_name).map(|n| n.id) else {
        bail!("no node named '{node_name}' in {}", project.name);
    };

    let orch = PlaybackOrchestrator::new(project, RecordingSink::new(), config, assets_next_to(path))?;
    let track = orch
        .cache()
        .track(node)
        .with_context(|| format!("no cached positions for '{node_name}'"))?;

    for (step, cached) in track.steps().iter().enumerate().step_by(every) {
        println!("{step:>6}  {}", cached.position);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATION
// ═══════════════════════════════════════════════════════════════════════════════

fn simulate(path: &Path, seconds: f64, tick_ms: u64, assets: Option<PathBuf>, config: EngineConfig) -> Result<()> {
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("--seconds must be positive");
    }
    if tick_ms == 0 {
        bail!("--tick-ms must be at least 1");
    }
    let project = load_project(path)?;
    let assets = assets.unwrap_or_else(|| assets_next_to(path));

    let (handle, mut processor) = queued(RecordingSink::with_file_checks(), COMMAND_QUEUE_CAPACITY);
    let mut orch = PlaybackOrchestrator::new(project, handle, config, assets)?;
    processor.process();

    // Synthetic wall clock: no sleeping between ticks
    let t0 = Instant::now();
    let period = Duration::from_millis(tick_ms);
    let ticks = (seconds * 1000.0 / tick_ms as f64).ceil() as u32;

    orch.play(t0);
    let mut started = 0;
    let mut recovered = 0;
    for i in 1..=ticks {
        let report = orch.tick(t0 + period * i)?;
        started += report.started;
        recovered += report.recovered;
        processor.process();
        if report.auto_paused {
            log::info!("Reached timeline end at tick {i}");
            break;
        }
    }
    if orch.is_playing() {
        orch.pause();
    }
    processor.process();

    let sink = processor.sink();
    for command in sink.commands() {
        println!("{}", describe(command));
    }
    println!();
    println!(
        "offset {:.1}, {} clip starts by crossing, {} cache recoveries, {} instances live",
        orch.offset(),
        started,
        recovered,
        sink.active_instances().count()
    );
    Ok(())
}

fn describe(command: &SinkCommand) -> String {
    match command {
        SinkCommand::Start {
            event,
            seek_secs: Some(secs),
            ..
        } => format!("start     {event} at {secs:.3} s"),
        SinkCommand::Start { event, .. } => format!("start     {event}"),
        SinkCommand::SetTransform { source, transform } => {
            format!("transform {source} {}", transform.translation())
        }
        SinkCommand::SetGain { source, gain } => format!("gain      {source} {gain:.2}"),
        other => format!("{other:?}"),
    }
}
