use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use evs::core::{compute_k_with, AspectCorrection, CameraModel};
use evs::inspect::summarize;
use evs::scan::ScanConfig;
use evs::synthetic::run_synthetic_scan;
use evs::trajectory::{frame_budget, TrajectoryId};
use serde::Serialize;

/// Synthetic endoscopy video generator.
#[derive(Debug, Parser)]
#[command(author, version, about = "Endoscopy video synthesis with ground-truth camera poses")]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace). `EVS_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit structured JSON logs.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a full scan against the built-in synthetic scene.
    Scan {
        /// JSON scan config.
        #[arg(long)]
        config: PathBuf,
        /// JSON camera model. The endoscope default is used if omitted.
        #[arg(long)]
        camera: Option<PathBuf>,
        /// Override `frame_num` from the config.
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Print the pinhole matrix K of a camera model as JSON.
    Intrinsics {
        #[arg(long)]
        camera: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Aspect::Divide)]
        aspect: Aspect,
    },
    /// Print the default frame count of a trajectory.
    FrameBudget {
        trajectory: TrajectoryId,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// List the trajectory catalog.
    Trajectories,
    /// Write a scan config with defaults filled in.
    WriteConfig {
        out: PathBuf,
        #[arg(long)]
        data_folder: PathBuf,
        #[arg(long)]
        trajectory: Option<TrajectoryId>,
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Summarize a ground-truth trajectory file.
    Inspect { ground_truth: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Aspect {
    Divide,
    Multiply,
}

impl From<Aspect> for AspectCorrection {
    fn from(value: Aspect) -> Self {
        match value {
            Aspect::Divide => AspectCorrection::Divide,
            Aspect::Multiply => AspectCorrection::Multiply,
        }
    }
}

#[derive(Serialize)]
struct ScanSummary<'a> {
    frame_num: usize,
    frame_dir: &'a Path,
    ground_truth: Option<&'a Path>,
    templates_written: bool,
    video: Option<&'a Path>,
    k: [[f64; 3]; 3],
}

#[derive(Serialize)]
struct CatalogEntry {
    name: &'static str,
    arc_length: f64,
    frames: usize,
}

fn load_camera(path: Option<&Path>) -> Result<CameraModel, Box<dyn Error>> {
    match path {
        Some(path) => {
            let data = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        }
        None => Ok(CameraModel::default()),
    }
}

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = args.verbose;
        evs::core::init_tracing(args.json_log);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        evs::core::init_from_env(evs::core::level_from_verbosity(args.verbose))?;
        Ok(())
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    match args.command {
        Command::Scan {
            config,
            camera,
            frames,
        } => {
            let mut config = ScanConfig::load_json(&config)?;
            if frames.is_some() {
                config.frame_num = frames;
            }
            let camera = load_camera(camera.as_deref())?;
            let report = run_synthetic_scan(config, camera)?;
            let summary = ScanSummary {
                frame_num: report.frame_num,
                frame_dir: &report.frame_dir,
                ground_truth: report.ground_truth.as_deref(),
                templates_written: report.templates_written,
                video: report.video.as_deref(),
                k: report.k.to_array(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Intrinsics { camera, aspect } => {
            let camera = load_camera(camera.as_deref())?;
            let k = compute_k_with(&camera, aspect.into())?;
            println!("{}", serde_json::to_string_pretty(&k.to_array())?);
        }
        Command::FrameBudget { trajectory, scale } => {
            println!("{}", frame_budget(trajectory, scale)?);
        }
        Command::Trajectories => {
            let entries = TrajectoryId::ALL
                .iter()
                .map(|&id| {
                    Ok(CatalogEntry {
                        name: id.name(),
                        arc_length: id.arc_length(),
                        frames: frame_budget(id, 1.0)?,
                    })
                })
                .collect::<Result<Vec<_>, evs::trajectory::TrajectoryError>>()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Command::WriteConfig {
            out,
            data_folder,
            trajectory,
            frames,
        } => {
            let mut config = ScanConfig::new(data_folder);
            if let Some(trajectory) = trajectory {
                config.trajectory = trajectory;
            }
            config.frame_num = frames;
            config.validate()?;
            config.write_json(&out)?;
            log::info!("wrote scan config to {}", out.display());
        }
        Command::Inspect { ground_truth } => {
            let summary = summarize(&ground_truth)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
