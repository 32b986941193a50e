//! arucam CLI: detect ArUco markers in a live camera feed and annotate them.

use arucam::aruco::{builtin_names, Dictionary, DICTIONARY_REFERENCE_URL};
use arucam::{FrameLoop, FramePipeline, RunConfig};
use arucam_opencv::{load_augmentation, CameraSource, OpenCvDetector, WindowSink};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "arucam")]
#[command(
    about = "Detect ArUco/AprilTag markers in a live camera feed; draw outlines, ids, poses and an augmented image"
)]
#[command(version)]
struct Cli {
    /// Predefined marker dictionary [default: DICT_ARUCO_ORIGINAL].
    #[arg(long, alias = "arudict", value_name = "NAME")]
    dictionary: Option<String>,

    /// Camera calibration (`.npz` or JSON): the camera matrix first, then the
    /// distortion coefficients. Needs a marker size, from `--marker-size` or `--config`.
    #[arg(long, alias = "calibpath", value_name = "PATH")]
    calibration: Option<PathBuf>,

    /// Marker side length (e.g. millimeters); translations are reported in this unit.
    #[arg(long, alias = "msz", value_name = "LEN")]
    marker_size: Option<f64>,

    /// Image to project onto every detected marker.
    #[arg(long, alias = "imgar", value_name = "PATH")]
    augment: Option<PathBuf>,

    /// Do not draw the marker center dot.
    #[arg(long)]
    no_center: bool,

    /// Do not draw the marker id.
    #[arg(long)]
    no_id: bool,

    /// Base run configuration (JSON); command-line flags override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the supported dictionary names and exit.
    #[arg(long)]
    list_dictionaries: bool,

    /// Log level filter (off, error, warn, info, debug, trace). With the
    /// `tracing` feature, `RUST_LOG` takes precedence when set.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

impl Cli {
    fn run_config(&self) -> CliResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load_json(path)?,
            None => RunConfig::default(),
        };
        if let Some(name) = &self.dictionary {
            config.dictionary = name.clone();
        }
        if self.calibration.is_some() {
            config.calibration = self.calibration.clone();
        }
        if self.marker_size.is_some() {
            config.marker_length = self.marker_size;
        }
        if self.augment.is_some() {
            config.augment_image = self.augment.clone();
        }
        if self.no_center {
            config.overlay.draw_center = false;
        }
        if self.no_id {
            config.overlay.draw_id = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    #[cfg(feature = "tracing")]
    arucam::core::init_tracing(cli.log_level);
    #[cfg(not(feature = "tracing"))]
    arucam::core::init_with_level(cli.log_level)?;

    if cli.list_dictionaries {
        for name in builtin_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = cli.run_config()?;
    let dictionary = match config.dictionary() {
        Ok(dictionary) => dictionary,
        Err(e) => {
            log::debug!("{e}");
            println!(
                "You must inform a valid Aruco dictionary. Please refer to {DICTIONARY_REFERENCE_URL}."
            );
            return Ok(());
        }
    };

    run(&config, dictionary)
}

fn run(config: &RunConfig, dictionary: Dictionary) -> CliResult<()> {
    let pose = config.pose_estimator()?;
    let compositor = match &config.augment_image {
        Some(path) => Some(load_augmentation(path)?),
        None => None,
    };
    let detector = OpenCvDetector::new(dictionary)?;

    let mut pipeline = FramePipeline::new(config.overlay);
    if let Some(pose) = pose {
        pipeline = pipeline.with_pose(pose);
    }
    if let Some(compositor) = compositor {
        pipeline = pipeline.with_compositor(compositor);
    }

    let source = CameraSource::open(config.camera_index)?;
    let sink = WindowSink::open(config.window_title.as_str())?;
    log::info!(
        "detecting {} markers (press any key in the window to quit)",
        dictionary.name
    );

    let mut frame_loop = FrameLoop::new(source, detector, sink, pipeline);
    let summary = frame_loop.run()?;
    log::info!(
        "processed {} frame(s), saw {} marker(s)",
        summary.frames,
        summary.markers
    );
    Ok(())
}
