//! Neural MRI replay CLI - Export a saved recording to GIF.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use nmri_replay::{
    animation::{PlaybackEngine, SystemClock, format_time},
    export::{DirectorySink, ExportOptions, SwatchSurface, webm::UnsupportedVideoBackend},
    schema::ReplayConfig,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let want_webm = args.iter().skip(1).any(|a| a == "--webm");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();

    if args.iter().skip(1).any(|a| a == "--example") {
        print_example_config();
        return;
    }

    if positional.is_empty() {
        eprintln!("Usage: {} <recording.json> [out_dir] [--webm]", args[0]);
        eprintln!();
        eprintln!("Export a neural MRI scan recording as an animated GIF.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  recording.json  Recording saved from the scanner");
        eprintln!("  out_dir         Directory to write exports to (default: .)");
        eprintln!("  --webm          Also attempt a WebM export");
        eprintln!();
        eprintln!("Settings are read from <recording>.config.json if present.");
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let recording_path = PathBuf::from(positional[0]);
    let out_dir = positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = load_config(&recording_path);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let mut engine = PlaybackEngine::new(SystemClock::new());
    if let Err(e) = engine.load_path(&recording_path) {
        eprintln!("Error loading recording: {}", e);
        std::process::exit(1);
    }
    let Some(recording) = engine.recording() else {
        eprintln!("No recording loaded");
        std::process::exit(1);
    };

    let mut modes: BTreeMap<&str, usize> = BTreeMap::new();
    for frame in recording.frames() {
        *modes.entry(frame.mode.tag()).or_default() += 1;
    }

    println!("Neural MRI Recording");
    println!("====================");
    println!("Model: {}", recording.model_id());
    if !recording.prompt().is_empty() {
        println!("Prompt: {}", recording.prompt());
    }
    println!("Created: {}", recording.created_at());
    println!(
        "Frames: {} over {}",
        recording.len(),
        format_time(recording.duration_ms())
    );
    for (mode, count) in &modes {
        println!("  {:<6} {}", mode, count);
    }
    println!();

    let mut surface = SwatchSurface::new(config.preview.width, config.preview.height);
    let mut sink = DirectorySink::new(&out_dir);

    println!("Exporting GIF at {} fps...", config.gif_fps);
    let start = Instant::now();
    let mut next_report = 0.1f32;
    let mut options = ExportOptions::gif()
        .with_fps(config.gif_fps)
        .with_scale(config.scale)
        .with_progress(|p| {
            // Print progress every 10%
            if p + f32::EPSILON >= next_report {
                println!("  {:>3.0}%", p * 100.0);
                while next_report <= p + f32::EPSILON {
                    next_report += 0.1;
                }
            }
        });

    match pollster::block_on(engine.export_gif(&mut surface, &mut sink, &mut options)) {
        Ok(artifact) => {
            println!(
                "Wrote {} ({} bytes) in {:.2}s",
                sink.path_for(&artifact).display(),
                artifact.bytes.len(),
                start.elapsed().as_secs_f32()
            );
        }
        Err(e) => {
            eprintln!("GIF export failed: {}", e);
            std::process::exit(1);
        }
    }

    if want_webm {
        println!();
        println!("Exporting WebM at {} fps...", config.webm_fps);
        let mut options = ExportOptions::webm()
            .with_fps(config.webm_fps)
            .with_scale(config.scale);
        let result = pollster::block_on(engine.export_webm(
            &mut surface,
            &mut UnsupportedVideoBackend,
            &config.video,
            &mut sink,
            &mut options,
        ));
        match result {
            Ok(artifact) => println!("Wrote {}", sink.path_for(&artifact).display()),
            Err(e) => eprintln!("WebM export skipped: {}", e),
        }
    }
}

fn load_config(recording_path: &Path) -> ReplayConfig {
    let config_path = recording_path.with_extension("config.json");
    if !config_path.exists() {
        return ReplayConfig::default();
    }
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });
    serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    })
}

fn print_example_config() {
    let config = ReplayConfig::default();

    println!("Example configuration (<recording>.config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
