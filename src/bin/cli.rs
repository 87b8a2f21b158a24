//! Locomotor CLI - run scripted character scenarios headlessly

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use locomotor::config::ControllerConfig;
use locomotor::game::locomotion::Action;
use locomotor::game::FrameReport;
use locomotor::logging;
use locomotor::scenario::Scenario;

#[derive(Parser)]
#[command(name = "locomotor")]
#[command(about = "Third-person character controller simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file and report what the character did
    Simulate {
        /// Path to the scenario TOML
        scenario: PathBuf,
        /// Controller config TOML (defaults when omitted)
        #[arg(short, long, env = "LOCOMOTOR_CONFIG")]
        config: Option<PathBuf>,
        /// Override the scenario's frame rate
        #[arg(long)]
        fps: Option<f32>,
        /// Print one JSON frame report per line instead of a summary
        #[arg(long)]
        json: bool,
        /// Debug logging (capsule swaps, landings, footsteps)
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the default controller config as TOML
    Defaults,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            scenario,
            config,
            fps,
            json,
            verbose,
        } => simulate(&scenario, config.as_deref(), fps, json, verbose),
        Commands::Defaults => print_defaults(),
    }
}

// =============================================================================
// Simulate Command
// =============================================================================

/// Totals printed after a non-JSON run
#[derive(Debug, Default)]
struct RunSummary {
    frames: u64,
    steps: u64,
    capped_frames: u64,
    jumps: u64,
    landings: u64,
    rolls: u64,
    footsteps: u64,
    max_height: f32,
    final_position: [f32; 3],
}

impl RunSummary {
    fn record(&mut self, report: &FrameReport, radius: f32) {
        self.frames += 1;
        self.steps += u64::from(report.steps);
        self.capped_frames += u64::from(report.capped);
        self.footsteps += report.audio.len() as u64;

        let Some(character) = &report.character else {
            return;
        };
        match character.action {
            Some(Action::Jump) => self.jumps += 1,
            Some(Action::Roll) => self.rolls += 1,
            _ => {}
        }
        self.landings += u64::from(character.landed);
        let bottom = character.position.y - character.half_height - radius;
        self.max_height = self.max_height.max(bottom);
        self.final_position = [character.position.x, character.position.y, character.position.z];
    }
}

fn simulate(scenario_path: &Path, config_path: Option<&Path>, fps: Option<f32>, json: bool, verbose: bool) {
    logging::init(verbose);

    let config = match config_path {
        Some(path) => match ControllerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => ControllerConfig::default(),
    };

    let mut scenario = match Scenario::from_file(scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(fps) = fps {
        scenario.fps = fps;
        if let Err(e) = scenario.validate() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    log::info!(
        "[CLI] Running {} ({} frames at {} fps)",
        scenario_path.display(),
        scenario.frame_count(),
        scenario.fps
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let radius = config.capsule.radius;
    let mut summary = RunSummary::default();
    let result = scenario.run(&config, |report| {
        summary.record(report, radius);
        if json {
            match serde_json::to_string(report) {
                Ok(line) => {
                    let _ = writeln!(out, "{}", line);
                }
                Err(e) => log::warn!("[CLI] Failed to encode frame {}: {}", report.frame, e),
            }
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if !json {
        print_summary(&summary);
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Frames:        {}", summary.frames);
    println!("Physics steps: {}", summary.steps);
    if summary.capped_frames > 0 {
        println!("Capped frames: {}", summary.capped_frames);
    }
    println!("Jumps:         {}", summary.jumps);
    println!("Landings:      {}", summary.landings);
    println!("Rolls:         {}", summary.rolls);
    println!("Footsteps:     {}", summary.footsteps);
    println!("Max height:    {:.3}", summary.max_height);
    let [x, y, z] = summary.final_position;
    println!("Final center:  ({:.3}, {:.3}, {:.3})", x, y, z);
}

// =============================================================================
// Defaults Command
// =============================================================================

fn print_defaults() {
    match ControllerConfig::default().to_toml_string() {
        Ok(toml) => print!("{}", toml),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
