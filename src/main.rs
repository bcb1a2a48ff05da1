// Chord Studio - Command-line front end
// Parse progressions, create projects, export MIDI and simulate playback

use chord_studio::audio::engine::EngineEvent;
use chord_studio::messaging::render::RenderEvent;
use chord_studio::project::ProjectLoadOptions;
use chord_studio::sequencer::note_name;
use chord_studio::{
    EngineConfig, ExportScope, Lane, MidiExporter, PatternName, ProjectManager, RecordingEngine,
    Tempo, Transport, create_render_channel, detect_chord, parse_progression,
};
use clap::{Parser, Subcommand};
use ringbuf::traits::Consumer;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Chord progression sequencer and MIDI exporter
#[derive(Parser)]
#[command(name = "chord-studio")]
#[command(about = "Sequence chord progressions and export them as MIDI")]
#[command(version)]
struct Cli {
    /// Engine config file (RON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum LaneArg {
    Chords,
    Melody,
    Drums,
    All,
}

impl LaneArg {
    fn lanes(self) -> Vec<Lane> {
        match self {
            LaneArg::Chords => vec![Lane::Chords],
            LaneArg::Melody => vec![Lane::Melody],
            LaneArg::Drums => vec![Lane::Drums],
            LaneArg::All => Lane::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a progression and show each chord's notes
    Parse {
        /// Bars separated by "|", chords by spaces (e.g. "C Am | F G")
        progression: String,
    },

    /// Export lanes of a project as Standard MIDI Files
    Export {
        /// Project file
        #[arg(short, long)]
        project: PathBuf,

        /// Pattern slot (A1..D4) or "all"
        #[arg(long, default_value = "all")]
        pattern: String,

        /// Lane to export
        #[arg(long, default_value = "all")]
        lane: LaneArg,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run the transport in simulated time and print every trigger
    Play {
        /// Project file
        #[arg(short, long)]
        project: PathBuf,

        /// Number of bars to play
        #[arg(long, default_value = "4")]
        bars: usize,

        /// Seed for random arpeggios and humanization
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Create a project from a progression
    New {
        /// Project name
        #[arg(short, long)]
        name: String,

        /// Bars separated by "|", chords by spaces
        #[arg(long)]
        progression: String,

        /// Tempo in BPM
        #[arg(long)]
        bpm: Option<f64>,

        /// Project file to write
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<Option<EngineConfig>, Box<dyn Error>> {
    match path {
        Some(path) => Ok(Some(EngineConfig::load(path)?)),
        None => Ok(None),
    }
}

fn parse_scope(pattern: &str) -> Result<ExportScope, Box<dyn Error>> {
    if pattern.eq_ignore_ascii_case("all") {
        Ok(ExportScope::AllPatterns)
    } else {
        Ok(ExportScope::Pattern(pattern.to_uppercase().parse::<PatternName>()?))
    }
}

fn cmd_parse(progression: &str) -> Result<(), Box<dyn Error>> {
    let bars = parse_progression(progression)?;
    for bar in &bars {
        println!("Bar {}", bar.bar_num);
        for chord in &bar.chords {
            let recognized = detect_chord(chord.midi_notes())
                .map(|m| format!("{} ({:.0}%)", m.symbol, m.confidence * 100.0))
                .unwrap_or_default();
            println!(
                "  {:<8} {:<20} -> {}",
                chord.symbol,
                chord.note_names().join(" "),
                recognized
            );
        }
    }
    Ok(())
}

fn cmd_export(
    project_path: &Path,
    pattern: &str,
    lane: LaneArg,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    let scope = parse_scope(pattern)?;
    let project =
        ProjectManager::default().load_project(project_path, &ProjectLoadOptions::default())?;
    let song = project.to_song()?;
    let snapshot = song.snapshot();

    std::fs::create_dir_all(out)?;
    let exporter = MidiExporter::new(&project.config);
    for lane in lane.lanes() {
        let path = exporter.export_to_dir(&snapshot, lane, scope, out)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cmd_play(
    project_path: &Path,
    bars: usize,
    seed: Option<u64>,
    config: Option<EngineConfig>,
) -> Result<(), Box<dyn Error>> {
    let project =
        ProjectManager::default().load_project(project_path, &ProjectLoadOptions::default())?;
    let config = config.unwrap_or_else(|| project.config.clone());
    let song = project.to_song()?;
    let end_time = bars as f64 * song.bpm().bar_duration_seconds();

    let (render_tx, mut render_rx) = create_render_channel(config.render_channel_capacity);
    let mut transport =
        Transport::new(song, RecordingEngine::new(), config).with_render_channel(render_tx);
    if let Some(seed) = seed {
        transport = transport.with_seed(seed);
    }

    transport.play(0.0);
    while let Some(time) = transport.next_event_time() {
        if time >= end_time {
            break;
        }
        transport.advance(time);
        while let Some(event) = render_rx.try_pop() {
            if let RenderEvent::PatternChanged { pattern } = event {
                println!("-- pattern {}", pattern);
            }
        }
    }
    transport.stop();

    for event in transport.engine().events() {
        match *event {
            EngineEvent::NoteOn {
                lane,
                pitch,
                velocity,
                time,
            } => println!(
                "{:8.3}s  on   {:<8} {:<4} vel {}",
                time,
                lane,
                note_name(pitch),
                velocity
            ),
            EngineEvent::NoteOff { lane, pitch, time } => {
                println!("{:8.3}s  off  {:<8} {}", time, lane, note_name(pitch))
            }
            EngineEvent::ReleaseAll => println!("          release all"),
        }
    }
    Ok(())
}

fn cmd_new(
    name: String,
    progression: &str,
    bpm: Option<f64>,
    out: &Path,
    config: Option<EngineConfig>,
) -> Result<(), Box<dyn Error>> {
    let manager = ProjectManager::new(config.unwrap_or_default());
    let mut project = manager.create_with_progression(name, parse_progression(progression)?)?;
    if let Some(bpm) = bpm {
        project.metadata.tempo = Tempo::new(bpm)?.bpm();
    }
    chord_studio::project::validate_project_structure(&project)?;
    manager.save_project(&project, out)?;
    println!(
        "Created '{}' with {} bars at {} BPM: {}",
        project.metadata.name,
        project.patterns[&PatternName::A1].bar_count(),
        project.metadata.tempo,
        out.display()
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Parse { progression } => cmd_parse(&progression),
        Commands::Export {
            project,
            pattern,
            lane,
            out,
        } => cmd_export(&project, &pattern, lane, &out),
        Commands::Play {
            project,
            bars,
            seed,
        } => cmd_play(&project, bars, seed, config),
        Commands::New {
            name,
            progression,
            bpm,
            out,
        } => cmd_new(name, &progression, bpm, &out, config),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
